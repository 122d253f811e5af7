use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use agora_database::SqlxObject;

use super::{BadgeError, UserStats};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    /// Leaderboard points for one badge of this tier.
    pub fn weight(&self) -> i64 {
        match self {
            BadgeTier::Bronze => 1,
            BadgeTier::Silver => 2,
            BadgeTier::Gold => 3,
            BadgeTier::Platinum => 5,
        }
    }
}

/// The statistic a badge's threshold is compared against.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StatMetric {
    PostCount,
    CommentCount,
    UpvotesReceived,
    VotesCast,
    AccountAgeDays,
    ActivityStreakDays,
    /// Only ever granted by an administrator.
    #[default]
    Manual,
}

impl StatMetric {
    pub fn value(&self, stats: &UserStats) -> Option<i64> {
        match self {
            StatMetric::PostCount => Some(stats.post_count),
            StatMetric::CommentCount => Some(stats.comment_count),
            StatMetric::UpvotesReceived => Some(stats.upvotes_received),
            StatMetric::VotesCast => Some(stats.votes_cast),
            StatMetric::AccountAgeDays => Some(stats.account_age_days),
            StatMetric::ActivityStreakDays => Some(stats.activity_streak_days),
            StatMetric::Manual => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, SqlxObject)]
#[table_name = "badges"]
pub struct BadgeDefinition {
    pub id: String,

    pub name: String,
    pub description: String,
    pub tier: BadgeTier,
    pub icon: String,
    pub color: String,

    pub metric: StatMetric,
    pub threshold: i64,

    pub created_at: i64,
    pub updated_at: i64,
}

impl BadgeDefinition {
    pub fn new(id: &str, name: &str, description: &str, tier: BadgeTier, metric: StatMetric, threshold: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            tier,
            metric,
            threshold,
            ..Default::default()
        }
    }

    pub fn with_style(mut self, icon: &str, color: &str) -> Self {
        self.icon = icon.to_string();
        self.color = color.to_string();
        self
    }

    pub fn is_manual(&self) -> bool {
        self.metric == StatMetric::Manual
    }

    /// Whether `stats` meet this badge's threshold. Manual badges never qualify.
    pub fn is_met_by(&self, stats: &UserStats) -> bool {
        self.metric.value(stats).is_some_and(|value| value >= self.threshold)
    }

    pub fn validate(&self) -> Result<(), BadgeError> {
        if self.id.trim().is_empty() {
            return Err(BadgeError::Validation("badge id is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(BadgeError::Validation(format!("badge {} has no name", self.id)));
        }
        if !self.is_manual() && self.threshold < 0 {
            return Err(BadgeError::Validation(format!("badge {} has a negative threshold", self.id)));
        }
        Ok(())
    }
}
