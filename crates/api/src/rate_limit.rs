use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use agora_clients::{keys, RedisClient};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window: Duration,
}

/// Decides whether one more request under `key` fits the current window.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u64,
}

/// Fixed window per key, local to this process.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if !windows.contains_key(key) {
            let span = self.config.window;
            windows.retain(|_, w| now.duration_since(w.started) < span);
        }

        let window = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(window.started) >= self.config.window {
            *window = Window { started: now, count: 0 };
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

/// Fixed window shared by every replica through Redis. Falls back to a
/// local window while Redis is unreachable.
pub struct RedisRateLimiter {
    redis: RedisClient,
    scope: String,
    config: RateLimitConfig,
    fallback: InMemoryRateLimiter,
}

impl RedisRateLimiter {
    pub fn new(redis: RedisClient, scope: &str, config: RateLimitConfig) -> Self {
        Self {
            redis,
            scope: scope.to_string(),
            config,
            fallback: InMemoryRateLimiter::new(config),
        }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, key: &str) -> bool {
        let redis_key = keys::rate_limit(&self.scope, key);
        match self.redis.incr_in_window(&redis_key, self.config.window.as_secs().max(1)).await {
            Ok(count) => u64::try_from(count).map_or(false, |count| count <= self.config.max_requests),
            Err(e) => {
                tracing::warn!(scope = %self.scope, "redis rate-limit fallback: {e}");
                self.fallback.allow(key).await
            }
        }
    }
}
