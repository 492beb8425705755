use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

/// TTLs by data volatility. Task status changes quickly; analysis results for
/// a given report and query are stable once computed.
pub const TASK_STATUS_TTL_SECS: u64 = 30;
pub const REPORT_LIST_TTL_SECS: u64 = 300;
pub const REPORT_DETAIL_TTL_SECS: u64 = 600;
pub const USER_TTL_SECS: u64 = 600;
pub const ANALYSIS_TTL_SECS: u64 = 1800;

/// Optional Redis-backed cache. Every operation degrades to a no-op when the
/// cache is unconfigured or unreachable; cache failure is never surfaced to
/// callers.
#[derive(Clone)]
pub struct CacheService {
    conn: Option<ConnectionManager>,
}

impl CacheService {
    /// Connect to Redis if a URL was configured. Connection failure logs a
    /// warning and yields a disabled cache rather than an error.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            info!("No REDIS_URL configured, caching disabled");
            return Self { conn: None };
        };

        let conn = match redis::Client::open(url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!("Connected to Redis cache");
                    Some(conn)
                }
                Err(e) => {
                    warn!("Redis not available, caching disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Invalid Redis URL, caching disabled: {}", e);
                None
            }
        };

        Self { conn }
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    pub fn key(prefix: &str, identifier: &str) -> String {
        format!("{}:{}", prefix, identifier)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone()?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Cache deserialization error for key {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cache get error for key {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache serialization error for key {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, ttl_secs).await {
            warn!("Cache set error for key {}: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!("Cache delete error for key {}: {}", key, e);
        }
    }
}
