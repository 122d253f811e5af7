use std::collections::HashSet;

use super::{BadgeDefinition, UserStats};

/// Catalog badges the user meets but does not hold yet, in catalog order.
///
/// Every threshold crossed is returned, so a user jumping from 0 to 150 posts
/// qualifies for each post-count tier at once.
pub fn qualifying_badges(
    stats: &UserStats,
    catalog: &[BadgeDefinition],
    held: &HashSet<String>,
) -> Vec<BadgeDefinition> {
    catalog.iter()
        .filter(|badge| !held.contains(&badge.id))
        .filter(|badge| badge.is_met_by(stats))
        .cloned()
        .collect()
}
