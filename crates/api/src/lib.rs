mod env;
mod global_state;
mod middleware;
mod rate_limit;
mod response;
mod routes;
mod utils;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use agora_community::CommunityStore;

pub use routes::{activity_routes, badge_routes, misc_routes};

pub use env::ApiServerEnv;
pub use global_state::GlobalState;
pub use utils::{extract_bearer_token, setup_tracing};
pub use middleware::{admin_rate_limit, authenticate, AuthenticatedUser};
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiter, RedisRateLimiter};
pub use response::{AppError, AppSuccess};

/// Every route with CORS and request tracing applied.
pub fn app<S: CommunityStore>(state: GlobalState<S>) -> Router {
    Router::new()
        .merge(badge_routes(&state))
        .merge(activity_routes(&state))
        .merge(misc_routes::<S>())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
