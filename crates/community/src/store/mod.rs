mod memory;
mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::types::Uuid;

use crate::badges::{BadgeDefinition, BadgeError, LeaderboardEntry, UserBadgeAward};
use crate::{Comment, Post, User, Vote, VoteTarget};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Raw activity counts for one user, read at a single point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub post_count: i64,
    pub comment_count: i64,
    /// Upvotes on the user's posts and comments, not counting their own.
    pub upvotes_received: i64,
    pub votes_cast: i64,
    /// Distinct UTC day indexes with a post or comment, newest first.
    pub active_days: Vec<i64>,
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, BadgeError>;
    async fn activity_snapshot(&self, user_id: Uuid) -> Result<ActivitySnapshot, BadgeError>;

    /// Author of the voted-on post or comment, `None` when it does not exist.
    async fn content_author(&self, target: VoteTarget) -> Result<Option<Uuid>, BadgeError>;
}

#[async_trait]
pub trait AwardStore: Send + Sync {
    async fn held_badge_ids(&self, user_id: Uuid) -> Result<HashSet<String>, BadgeError>;

    /// Inserts the award unless the user already holds that badge.
    /// Returns whether a row was inserted; concurrent callers see exactly one `true`.
    async fn insert_award_if_absent(&self, award: UserBadgeAward) -> Result<bool, BadgeError>;

    /// Oldest award first.
    async fn user_awards(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>, BadgeError>;

    /// Users holding at least one badge, ranked, at most `limit` of them.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, BadgeError>;
}

#[async_trait]
pub trait BadgeCatalog: Send + Sync {
    async fn load_catalog(&self) -> Result<Vec<BadgeDefinition>, BadgeError>;
    async fn insert_badge_if_absent(&self, badge: BadgeDefinition) -> Result<bool, BadgeError>;
}

/// Writes that produce the activity badges are computed from.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, BadgeError>;
    async fn create_post(&self, post: Post) -> Result<Post, BadgeError>;

    /// Fails with `NotFound` when the post does not exist.
    async fn create_comment(&self, comment: Comment) -> Result<Comment, BadgeError>;

    /// Records the vote, replacing an earlier vote by the same voter on the
    /// same target. Fails with `NotFound` when the target does not exist.
    async fn cast_vote(&self, vote: Vote) -> Result<Vote, BadgeError>;
}

/// Everything the badge engine and the HTTP layer need from storage.
pub trait CommunityStore: ActivityStore + AwardStore + BadgeCatalog + ActivityLog + 'static {}

impl<T> CommunityStore for T where T: ActivityStore + AwardStore + BadgeCatalog + ActivityLog + 'static {}
