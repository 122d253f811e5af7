mod client;
mod env;
mod token;

pub use client::ModuleClient;
pub use env::{EnvVars, env_or};
pub use token::{sign_token, verify_token, TokenClaims, TokenError};

pub fn get_current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Number of whole UTC days since the unix epoch for a unix timestamp (seconds).
pub fn day_index(timestamp: i64) -> i64 {
    timestamp.div_euclid(24 * 60 * 60)
}
