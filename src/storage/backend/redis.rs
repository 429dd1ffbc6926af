use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, error, trace};

use super::KvBackend;
use crate::errors::{Result, ShortstatError};

/// 原子比较并交换：值一致时才写入
const CAS_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Redis-backed key-value store.
///
/// `ConnectionManager` reconnects on its own after connection errors, so a
/// failed call surfaces as `BackendUnavailable` and the next attempt gets a
/// fresh connection.
pub struct RedisBackend {
    connection: ConnectionManager,
    cas_script: redis::Script,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            ShortstatError::config(format!("Invalid Redis URL '{}': {}", url, e))
        })?;

        let mut connection = client.get_connection_manager().await.map_err(|e| {
            error!(
                "Failed to connect to Redis: {}. Check Redis server status and URL: {}",
                e, url
            );
            ShortstatError::from(e)
        })?;

        // 启动时先 PING 一次，尽早暴露配置错误
        let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        debug!("Redis connection test successful: {}", pong);

        Ok(Self {
            connection,
            cas_script: redis::Script::new(CAS_SCRIPT),
        })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        trace!("Redis GET {} -> {}", key, value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let created: bool = conn.set_nx(key, value).await?;
        trace!("Redis SETNX {} -> {}", key, created);
        Ok(created)
    }

    async fn compare_and_swap(&self, key: &str, expected: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let swapped: i32 = self
            .cas_script
            .key(key)
            .arg(expected)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
