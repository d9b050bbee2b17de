//! Request handlers.

pub mod audio;
pub mod health;

pub use audio::*;
pub use health::*;
