use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use tokio::sync::OnceCell;

use agora_common::get_current_timestamp;

use crate::store::CommunityStore;
use super::{
    aggregate_stats, clamp_limit, persist_awards, qualifying_badges,
    BadgeDefinition, BadgeError, LeaderboardEntry, UserBadgeAward, UserStats,
};

/// Result of one evaluation run.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BadgeCheck {
    pub user_stats: UserStats,
    /// Badges newly awarded by this run.
    pub awarded_badges: Vec<BadgeDefinition>,
    /// Badges the user qualified for whose award could not be stored.
    pub failed_badges: Vec<String>,
}

pub struct BadgeEngine<S> {
    store: S,
    catalog: OnceCell<Arc<Vec<BadgeDefinition>>>,
}

impl<S: CommunityStore> BadgeEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            catalog: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loaded on first use and kept for the life of the engine.
    async fn catalog(&self) -> Result<Arc<Vec<BadgeDefinition>>, BadgeError> {
        let catalog = self.catalog.get_or_try_init(|| async {
            let badges = self.store.load_catalog().await?;
            let (valid, invalid): (Vec<_>, Vec<_>) = badges.into_iter().partition(|b| b.validate().is_ok());
            for badge in invalid {
                tracing::warn!("[badges] ignoring invalid badge definition {:?}", badge.id);
            }
            tracing::info!("[badges] catalog loaded with {} badges", valid.len());
            Ok::<_, BadgeError>(Arc::new(valid))
        }).await?;
        Ok(catalog.clone())
    }

    async fn require_user(&self, user_id: Uuid) -> Result<crate::User, BadgeError> {
        if user_id.is_nil() {
            return Err(BadgeError::Validation("user id is required".into()));
        }
        self.store.find_user(user_id).await?
            .ok_or_else(|| BadgeError::not_found("user", user_id))
    }

    /// Evaluates every catalog badge for the user and awards the ones newly met.
    ///
    /// Running it again without new activity awards nothing. When some awards
    /// fail to store, the ones that succeeded are kept and the rest are listed
    /// in `failed_badges`; only when all of them fail is an error returned.
    pub async fn check_and_award_badges(&self, user_id: Uuid) -> Result<BadgeCheck, BadgeError> {
        let user = self.require_user(user_id).await?;
        let now = get_current_timestamp();

        let user_stats = aggregate_stats(&self.store, &user, now).await?;
        let catalog = self.catalog().await?;
        let held = self.store.held_badge_ids(user_id).await?;

        let candidates = qualifying_badges(&user_stats, &catalog, &held);
        if candidates.is_empty() {
            return Ok(BadgeCheck { user_stats, ..Default::default() });
        }

        let mut outcome = persist_awards(&self.store, user_id, candidates, now).await;
        if outcome.awarded.is_empty() && !outcome.failed.is_empty() {
            let (badge_id, error) = outcome.failed.swap_remove(0);
            tracing::error!("[badges] no award for {} could be stored, first failure on {}", user_id, badge_id);
            return Err(error);
        }

        Ok(BadgeCheck {
            user_stats,
            failed_badges: outcome.failed_ids(),
            awarded_badges: outcome.awarded,
        })
    }

    /// Grants a badge by hand, including manual-only ones.
    ///
    /// Returns `Ok(true)` whether the badge was inserted now or already held,
    /// and `Ok(false)` only when the award could not be stored.
    pub async fn award_badge(&self, user_id: Uuid, badge_id: &str, granted_by: Uuid) -> Result<bool, BadgeError> {
        let badge_id = badge_id.trim();
        if badge_id.is_empty() {
            return Err(BadgeError::Validation("badge id is required".into()));
        }
        if granted_by.is_nil() {
            return Err(BadgeError::Validation("granting administrator is required".into()));
        }

        let catalog = self.catalog().await?;
        if !catalog.iter().any(|b| b.id == badge_id) {
            return Err(BadgeError::not_found("badge", badge_id));
        }
        self.require_user(user_id).await?;

        let award = UserBadgeAward::new(user_id, badge_id.to_string(), get_current_timestamp(), Some(granted_by));
        match self.store.insert_award_if_absent(award).await {
            Ok(inserted) => {
                if inserted {
                    tracing::info!("[badges] {} granted {} to {}", granted_by, badge_id, user_id);
                } else {
                    tracing::debug!("[badges] {} already holds {}", user_id, badge_id);
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!("[badges] failed to store manual award of {} to {}: {}", badge_id, user_id, e);
                Ok(false)
            }
        }
    }

    pub async fn get_user_badges(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>, BadgeError> {
        self.require_user(user_id).await?;
        self.store.user_awards(user_id).await
    }

    pub async fn get_all_badges(&self) -> Result<Vec<BadgeDefinition>, BadgeError> {
        Ok(self.catalog().await?.as_ref().clone())
    }

    pub async fn get_badge_leaderboard(&self, limit: Option<i64>) -> Result<Vec<LeaderboardEntry>, BadgeError> {
        self.store.leaderboard(clamp_limit(limit)).await
    }
}
