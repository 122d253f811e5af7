use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_database::SqlxObject;

use crate::store::AwardStore;
use crate::User;
use super::{BadgeDefinition, BadgeError};

/// A badge held by a user. At most one row exists per (user, badge).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, SqlxObject)]
#[table_name = "user_badges"]
#[unique_index("user_id", "badge_id")]
pub struct UserBadgeAward {
    pub id: Uuid,

    #[foreign_key(referenced_table = "users", related_rust_type = "User")]
    pub user_id: Uuid,

    #[foreign_key(referenced_table = "badges", related_rust_type = "BadgeDefinition")]
    pub badge_id: String,

    pub awarded_at: i64,

    /// The administrator who granted it; `None` for automatic awards.
    #[foreign_key(referenced_table = "users", related_rust_type = "User")]
    pub awarded_by: Option<Uuid>,
}

impl UserBadgeAward {
    pub fn new(user_id: Uuid, badge_id: String, awarded_at: i64, awarded_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            badge_id,
            awarded_at,
            awarded_by,
        }
    }
}

/// Result of persisting a batch of awards.
#[derive(Debug, Default)]
pub struct AwardOutcome {
    /// Badges this call inserted.
    pub awarded: Vec<BadgeDefinition>,
    /// Badges whose insert failed, with the cause.
    pub failed: Vec<(String, BadgeError)>,
}

impl AwardOutcome {
    pub fn failed_ids(&self) -> Vec<String> {
        self.failed.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Inserts one award per badge. An award that already exists is skipped
/// silently and a failed insert does not stop the others.
pub async fn persist_awards<S>(
    store: &S,
    user_id: Uuid,
    badges: Vec<BadgeDefinition>,
    awarded_at: i64,
) -> AwardOutcome
where
    S: AwardStore + ?Sized,
{
    let inserts = badges.iter().map(|badge| {
        store.insert_award_if_absent(UserBadgeAward::new(user_id, badge.id.clone(), awarded_at, None))
    });
    let results = join_all(inserts).await;

    let mut outcome = AwardOutcome::default();
    for (badge, result) in badges.into_iter().zip(results) {
        match result {
            Ok(true) => {
                tracing::info!("[badges] awarded {} to {}", badge.id, user_id);
                outcome.awarded.push(badge);
            }
            Ok(false) => {
                tracing::debug!("[badges] {} already holds {}", user_id, badge.id);
            }
            Err(e) => {
                tracing::warn!("[badges] failed to award {} to {}: {}", badge.id, user_id, e);
                outcome.failed.push((badge.id, e));
            }
        }
    }
    outcome
}
