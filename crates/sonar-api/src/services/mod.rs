//! Application services.

pub mod analyzer;

pub use analyzer::{AnalysisError, AudioAnalyzer};
