//! Key-value stores backing the analysis cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};

/// Byte store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether the store currently accepts commands.
    fn is_connected(&self) -> bool;

    /// Round-trip check against the backend.
    async fn ping(&self) -> CacheResult<()>;

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> CacheResult<()>;

    /// Release backend resources. Later operations report not connected.
    async fn close(&self) {}
}

/// Redis-backed store sharing one multiplexed connection.
pub struct RedisStore {
    client: redis::Client,
    config: CacheConfig,
    conn: RwLock<Option<MultiplexedConnection>>,
    connected: AtomicBool,
}

impl RedisStore {
    /// Create a store. No connection is made until [`RedisStore::connect`].
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            config,
            conn: RwLock::new(None),
            connected: AtomicBool::new(false),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> CacheResult<Self> {
        Self::new(CacheConfig::from_env())
    }

    /// Connect, verify with PING and apply the memory policy.
    ///
    /// A server that refuses `CONFIG SET` (managed Redis) is still usable.
    pub async fn connect(&self) -> CacheResult<()> {
        let timeout = self.config.connect_timeout;
        let handshake = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("PING").query_async::<String>(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        };
        let mut conn = match tokio::time::timeout(timeout, handshake).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(CacheError::connection_failed(e.to_string())),
            Err(_) => {
                return Err(CacheError::connection_failed(format!(
                    "timed out after {:?}",
                    timeout
                )))
            }
        };

        for (name, value) in [
            ("maxmemory", self.config.max_memory.as_str()),
            ("maxmemory-policy", self.config.eviction_policy.as_str()),
        ] {
            let result = redis::cmd("CONFIG")
                .arg("SET")
                .arg(name)
                .arg(value)
                .query_async::<()>(&mut conn)
                .await;
            if let Err(e) = result {
                warn!(setting = name, value, error = %e, "Redis refused CONFIG SET");
            }
        }

        *self.conn.write().await = Some(conn);
        self.connected.store(true, Ordering::SeqCst);
        info!(url = %redact_url(&self.config.redis_url), "Connected to Redis cache");
        Ok(())
    }

    /// Drop the connection.
    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if self.conn.write().await.take().is_some() {
            info!("Closed Redis cache connection");
        }
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or(CacheError::NotConnected)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn close(&self) {
        self.disconnect().await;
    }
}

/// Hide credentials in a Redis URL before logging it.
fn redact_url(url: &str) -> String {
    match url.split_once('@') {
        Some((scheme_and_auth, host)) => {
            let scheme = scheme_and_auth.split("://").next().unwrap_or("redis");
            format!("{}://***@{}", scheme, host)
        }
        None => url.to_string(),
    }
}

/// Process-local store with expiry, for development and tests.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    connected: AtomicBool,
    set_calls: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
            set_calls: AtomicUsize::new(0),
        }
    }

    /// Simulate the backend going away or coming back.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of `set_ex` calls received, successful or not.
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_connected(&self) -> CacheResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CacheError::NotConnected)
        }
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::connection_failed("in-memory store poisoned"))
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_connected()
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check_connected()?;
        let mut entries = self.lock()?;
        let expired = matches!(entries.get(key), Some((_, expires_at)) if *expires_at <= Instant::now());
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_secs: u64) -> CacheResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_connected()?;
        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(
            key.to_string(),
            (value.to_vec(), now + Duration::from_secs(ttl_secs)),
        );
        Ok(())
    }

    async fn close(&self) {
        self.set_connected(false);
    }
}
