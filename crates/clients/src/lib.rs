mod postgres;
mod redis_client;

pub use postgres::{connect, PostgresClient};
pub use redis_client::{keys, RedisClient};
