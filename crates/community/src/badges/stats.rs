use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_common::day_index;

use crate::store::ActivityStore;
use crate::User;
use super::BadgeError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Activity counters a badge threshold can be compared against.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: Uuid,
    pub post_count: i64,
    pub comment_count: i64,
    pub upvotes_received: i64,
    pub votes_cast: i64,
    pub account_age_days: i64,
    pub activity_streak_days: i64,
}

/// Consecutive UTC days with activity, counted back from `today`.
///
/// A streak still counts when the latest active day is yesterday, so it does
/// not drop to zero before the user posted anything today.
pub fn activity_streak(active_days: &[i64], today: i64) -> i64 {
    let days: HashSet<i64> = active_days.iter().copied().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&(today - 1)) {
        today - 1
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= 1;
    }
    streak
}

/// Builds the stats for `user` from one activity snapshot taken at `now`.
pub async fn aggregate_stats<S>(store: &S, user: &User, now: i64) -> Result<UserStats, BadgeError>
where
    S: ActivityStore + ?Sized,
{
    let snapshot = store.activity_snapshot(user.id).await?;

    let stats = UserStats {
        user_id: user.id,
        post_count: snapshot.post_count,
        comment_count: snapshot.comment_count,
        upvotes_received: snapshot.upvotes_received,
        votes_cast: snapshot.votes_cast,
        account_age_days: (now - user.created_at).max(0) / SECONDS_PER_DAY,
        activity_streak_days: activity_streak(&snapshot.active_days, day_index(now)),
    };

    tracing::debug!("[badges] stats for {}: {:?}", user.id, stats);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_counts_back_from_today() {
        assert_eq!(activity_streak(&[100, 99, 98, 96], 100), 3);
        assert_eq!(activity_streak(&[100], 100), 1);
    }

    #[test]
    fn streak_survives_until_end_of_next_day() {
        assert_eq!(activity_streak(&[99, 98], 100), 2);
        assert_eq!(activity_streak(&[98, 97], 100), 0);
    }

    #[test]
    fn streak_ignores_order_and_duplicates() {
        assert_eq!(activity_streak(&[98, 100, 99, 100], 100), 3);
        assert_eq!(activity_streak(&[], 100), 0);
    }
}
