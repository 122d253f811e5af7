mod user;
mod forum;
pub mod badges;
pub mod store;

pub use user::{authorize, Permission, User, UserRole};
pub use forum::{Comment, Post, Vote, VoteTarget};

pub use badges::{
    AwardOutcome, BadgeCheck, BadgeDefinition, BadgeEngine, BadgeError, BadgeTier,
    LeaderboardEntry, StatMetric, UserBadgeAward, UserStats,
};
pub use store::{ActivityLog, ActivitySnapshot, ActivityStore, AwardStore, BadgeCatalog, CommunityStore, MemoryStore, PgStore};
