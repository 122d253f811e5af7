use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use strum::IntoEnumIterator;

use super::BadgeTier;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 20;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub username: String,
    pub badge_count: i64,
    /// Sum of the tier weights of every badge held.
    pub score: i64,
}

/// Missing or non-positive limits fall back to the default; large ones are capped.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(limit) if limit > 0 => limit.min(MAX_LEADERBOARD_LIMIT),
        _ => DEFAULT_LEADERBOARD_LIMIT,
    }
}

/// Orders by score, then badge count, then user id, and keeps the top `limit`.
pub fn rank(mut entries: Vec<LeaderboardEntry>, limit: i64) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.score.cmp(&a.score)
            .then_with(|| b.badge_count.cmp(&a.badge_count))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    entries.truncate(usize::try_from(limit).unwrap_or(0));
    entries
}

/// `CASE` expression mapping a tier column to its weight.
pub fn tier_weight_sql(column: &str) -> String {
    let arms = BadgeTier::iter()
        .map(|tier| format!("WHEN '{}' THEN {}", tier, tier.weight()))
        .collect::<Vec<_>>()
        .join(" ");
    format!("CASE {} {} ELSE 0 END", column, arms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u128, badge_count: i64, score: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: Uuid::from_u128(n),
            username: format!("user{}", n),
            badge_count,
            score,
        }
    }

    #[test]
    fn ties_break_on_count_then_id() {
        let ranked = rank(vec![entry(3, 2, 4), entry(1, 1, 4), entry(2, 2, 4), entry(4, 9, 1)], 10);
        let order: Vec<u128> = ranked.iter().map(|e| e.user_id.as_u128()).collect();
        assert_eq!(order, vec![2, 3, 1, 4]);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(clamp_limit(Some(-5)), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(clamp_limit(Some(5000)), MAX_LEADERBOARD_LIMIT);
        assert_eq!(rank(vec![entry(1, 1, 1), entry(2, 1, 1)], 1).len(), 1);
    }

    #[test]
    fn weight_case_covers_every_tier() {
        let sql = tier_weight_sql("b.\"tier\"");
        assert_eq!(
            sql,
            "CASE b.\"tier\" WHEN 'BRONZE' THEN 1 WHEN 'SILVER' THEN 2 WHEN 'GOLD' THEN 3 WHEN 'PLATINUM' THEN 5 ELSE 0 END"
        );
    }
}
