use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use agora_clients::{PostgresClient, RedisClient};
use agora_common::ModuleClient;
use agora_community::badges::{default_catalog, seed_catalog};
use agora_community::{BadgeEngine, CommunityStore, PgStore};

use crate::env::ApiServerEnv;
use crate::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiter, RedisRateLimiter};

pub struct GlobalState<S> {
    pub engine: Arc<BadgeEngine<S>>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub env: Arc<ApiServerEnv>,
}

impl<S> Clone for GlobalState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            rate_limiter: self.rate_limiter.clone(),
            env: self.env.clone(),
        }
    }
}

impl<S: CommunityStore> GlobalState<S> {
    pub fn new(store: S, rate_limiter: Arc<dyn RateLimiter>, env: ApiServerEnv) -> Self {
        Self {
            engine: Arc::new(BadgeEngine::new(store)),
            rate_limiter,
            env: Arc::new(env),
        }
    }
}

impl GlobalState<PgStore> {
    /// Connects to Postgres (and Redis when configured) and seeds the badge catalog.
    pub async fn from_env() -> Result<Self> {
        let env = ApiServerEnv::require()?;

        let db = PostgresClient::setup_connection().await?;
        let store = PgStore::new(db.get_client().as_ref().clone());

        let seeded = seed_catalog(&store, default_catalog()).await?;
        tracing::info!("[startup] badge catalog seeded, {} new definitions", seeded);

        let config = RateLimitConfig {
            max_requests: env.admin_rate_limit_max,
            window: Duration::from_secs(env.admin_rate_limit_window_secs),
        };
        let rate_limiter: Arc<dyn RateLimiter> = match &env.redis_url {
            Some(_) => {
                let redis = RedisClient::setup_connection().await?;
                Arc::new(RedisRateLimiter::new(redis, "admin", config))
            }
            None => {
                tracing::info!("[startup] REDIS_URL not set, admin rate limit is per process");
                Arc::new(InMemoryRateLimiter::new(config))
            }
        };

        Ok(Self::new(store, rate_limiter, env))
    }
}
