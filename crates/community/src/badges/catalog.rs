use crate::store::BadgeCatalog;
use super::{BadgeDefinition, BadgeError, BadgeTier, StatMetric};

/// The badges a fresh forum starts with.
pub fn default_catalog() -> Vec<BadgeDefinition> {
    use BadgeTier::*;
    use StatMetric::*;

    vec![
        BadgeDefinition::new("first-post", "First Post", "Published a first post", Bronze, PostCount, 1)
            .with_style("pencil", "#cd7f32"),
        BadgeDefinition::new("prolific-poster", "Prolific Poster", "Published 10 posts", Silver, PostCount, 10)
            .with_style("scroll", "#c0c0c0"),
        BadgeDefinition::new("post-centurion", "Post Centurion", "Published 100 posts", Gold, PostCount, 100)
            .with_style("books", "#ffd700"),
        BadgeDefinition::new("conversationalist", "Conversationalist", "Wrote 25 comments", Bronze, CommentCount, 25)
            .with_style("speech-bubble", "#cd7f32"),
        BadgeDefinition::new("well-liked", "Well Liked", "Received 10 upvotes", Bronze, UpvotesReceived, 10)
            .with_style("thumbs-up", "#cd7f32"),
        BadgeDefinition::new("community-favorite", "Community Favorite", "Received 100 upvotes", Gold, UpvotesReceived, 100)
            .with_style("heart", "#ffd700"),
        BadgeDefinition::new("veteran", "Veteran", "Member for a year", Silver, AccountAgeDays, 365)
            .with_style("shield", "#c0c0c0"),
        BadgeDefinition::new("on-a-roll", "On a Roll", "Active 7 days in a row", Silver, ActivityStreakDays, 7)
            .with_style("flame", "#c0c0c0"),
        BadgeDefinition::new("civic-duty", "Civic Duty", "Cast 50 votes", Bronze, VotesCast, 50)
            .with_style("ballot", "#cd7f32"),
        BadgeDefinition::new("founding-member", "Founding Member", "Granted to the forum's founders", Platinum, Manual, 0)
            .with_style("star", "#e5e4e2"),
    ]
}

/// Inserts every missing definition of `catalog`; existing rows are left alone.
/// Returns how many were inserted.
pub async fn seed_catalog<S>(store: &S, catalog: Vec<BadgeDefinition>) -> Result<usize, BadgeError>
where
    S: BadgeCatalog + ?Sized,
{
    let mut inserted = 0;
    for badge in catalog {
        badge.validate()?;
        let id = badge.id.clone();
        if store.insert_badge_if_absent(badge).await? {
            tracing::info!("[badges] seeded badge {}", id);
            inserted += 1;
        }
    }
    Ok(inserted)
}
