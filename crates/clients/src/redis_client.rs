use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use tracing::info;

use agora_common::define_module_client;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

// INCR and EXPIRE run as one unit; a key left without a TTL gets one on its next hit.
const INCR_IN_WINDOW_LUA: &str = r#"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
"#;

define_module_client! {
    (struct RedisClient, "redis")
    client_type: ConnectionManager,
    env: [],
    setup: async {
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        info!("Redis connection established");
        Ok::<_, anyhow::Error>(manager)
    }
}

impl RedisClient {
    fn connection(&self) -> ConnectionManager {
        self.client.as_ref().clone()
    }

    /// Increments `key` and starts its expiry on the first hit of a window.
    /// Returns the count so far in the current window.
    pub async fn incr_in_window(&self, key: &str, window_secs: u64) -> anyhow::Result<i64> {
        let mut conn = self.connection();
        let ttl = i64::try_from(window_secs).unwrap_or(i64::MAX);

        let count: i64 = Script::new(INCR_IN_WINDOW_LUA)
            .key(key)
            .arg(ttl)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis rate-limit script failed: {}", e))?;
        Ok(count)
    }

    /// Seconds until `key` expires, or a negative Redis TTL code.
    pub async fn ttl(&self, key: &str) -> anyhow::Result<i64> {
        let mut conn = self.connection();
        conn.ttl::<_, i64>(key).await
            .map_err(|e| anyhow::anyhow!("Redis TTL failed: {}", e))
    }
}

// Key builders for type safety
pub mod keys {
    pub fn rate_limit(scope: &str, key: &str) -> String {
        format!("ratelimit:{}:{}", scope, key)
    }
}
