//! Badge evaluation: gather a user's stats, find the catalog badges they now
//! qualify for and record each award exactly once.

mod award;
mod catalog;
mod criteria;
mod definition;
mod engine;
mod error;
mod leaderboard;
mod stats;

pub use award::{persist_awards, AwardOutcome, UserBadgeAward};
pub use catalog::{default_catalog, seed_catalog};
pub use criteria::qualifying_badges;
pub use definition::{BadgeDefinition, BadgeTier, StatMetric};
pub use engine::{BadgeCheck, BadgeEngine};
pub use error::BadgeError;
pub use leaderboard::{clamp_limit, rank, tier_weight_sql, LeaderboardEntry, DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};
pub use stats::{activity_streak, aggregate_stats, UserStats};
