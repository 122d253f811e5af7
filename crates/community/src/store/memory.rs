use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::Uuid;
use tokio::sync::Mutex;

use agora_common::{day_index, get_current_timestamp};

use crate::badges::{rank, BadgeDefinition, BadgeError, LeaderboardEntry, UserBadgeAward};
use crate::{Comment, Post, User, Vote, VoteTarget};
use super::{ActivityLog, ActivitySnapshot, ActivityStore, AwardStore, BadgeCatalog};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    votes: Vec<Vote>,
    badges: BTreeMap<String, BadgeDefinition>,
    awards: Vec<UserBadgeAward>,
    failing_badges: HashSet<String>,
    failing_author_lookups: bool,
}

impl State {
    fn author_of(&self, target: VoteTarget) -> Option<Uuid> {
        match target {
            VoteTarget::Post(id) => self.posts.get(&id).map(|p| p.author_id),
            VoteTarget::Comment(id) => self.comments.get(&id).map(|c| c.author_id),
        }
    }
}

/// Process-local store with the same semantics as `PgStore`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated storage failure: {0}")]
struct SimulatedFailure(String);

fn stamp(created_at: &mut i64, updated_at: &mut i64) {
    if *created_at == 0 {
        *created_at = get_current_timestamp();
    }
    if *updated_at == 0 {
        *updated_at = *created_at;
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later insert of an award for `badge_id` fails with a storage error.
    pub async fn fail_awards_of(&self, badge_id: &str) {
        self.state.lock().await.failing_badges.insert(badge_id.to_string());
    }

    /// Every later `content_author` lookup fails with a storage error.
    pub async fn fail_author_lookups(&self) {
        self.state.lock().await.failing_author_lookups = true;
    }

    /// Number of stored vote rows cast by `voter_id` on `target`.
    pub async fn vote_rows(&self, voter_id: Uuid, target: VoteTarget) -> usize {
        self.state.lock().await.votes.iter()
            .filter(|v| v.voter_id == voter_id && v.target() == Some(target))
            .count()
    }

    /// Number of stored award rows for the pair.
    pub async fn award_rows(&self, user_id: Uuid, badge_id: &str) -> usize {
        self.state.lock().await.awards.iter()
            .filter(|a| a.user_id == user_id && a.badge_id == badge_id)
            .count()
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, BadgeError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn activity_snapshot(&self, user_id: Uuid) -> Result<ActivitySnapshot, BadgeError> {
        let state = self.state.lock().await;

        let posts: Vec<&Post> = state.posts.values().filter(|p| p.author_id == user_id).collect();
        let comments: Vec<&Comment> = state.comments.values().filter(|c| c.author_id == user_id).collect();

        let upvotes_received = state.votes.iter()
            .filter(|v| v.is_upvote() && v.voter_id != user_id)
            .filter(|v| v.target().and_then(|t| state.author_of(t)) == Some(user_id))
            .count();

        let mut active_days: Vec<i64> = posts.iter().map(|p| p.created_at)
            .chain(comments.iter().map(|c| c.created_at))
            .map(day_index)
            .collect();
        active_days.sort_unstable_by(|a, b| b.cmp(a));
        active_days.dedup();

        Ok(ActivitySnapshot {
            post_count: posts.len() as i64,
            comment_count: comments.len() as i64,
            upvotes_received: upvotes_received as i64,
            votes_cast: state.votes.iter().filter(|v| v.voter_id == user_id).count() as i64,
            active_days,
        })
    }

    async fn content_author(&self, target: VoteTarget) -> Result<Option<Uuid>, BadgeError> {
        let state = self.state.lock().await;
        if state.failing_author_lookups {
            return Err(BadgeError::storage(SimulatedFailure("author lookup".into())));
        }
        Ok(state.author_of(target))
    }
}

#[async_trait]
impl AwardStore for MemoryStore {
    async fn held_badge_ids(&self, user_id: Uuid) -> Result<HashSet<String>, BadgeError> {
        Ok(self.state.lock().await.awards.iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.badge_id.clone())
            .collect())
    }

    async fn insert_award_if_absent(&self, award: UserBadgeAward) -> Result<bool, BadgeError> {
        let mut state = self.state.lock().await;
        if state.failing_badges.contains(&award.badge_id) {
            return Err(BadgeError::storage(SimulatedFailure(format!("award of {}", award.badge_id))));
        }
        if !state.users.contains_key(&award.user_id) {
            return Err(BadgeError::not_found("user", award.user_id));
        }
        if !state.badges.contains_key(&award.badge_id) {
            return Err(BadgeError::not_found("badge", &award.badge_id));
        }
        if state.awards.iter().any(|a| a.user_id == award.user_id && a.badge_id == award.badge_id) {
            return Ok(false);
        }
        state.awards.push(award);
        Ok(true)
    }

    async fn user_awards(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>, BadgeError> {
        let mut awards: Vec<UserBadgeAward> = self.state.lock().await.awards.iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        awards.sort_by(|a, b| a.awarded_at.cmp(&b.awarded_at).then_with(|| a.badge_id.cmp(&b.badge_id)));
        Ok(awards)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, BadgeError> {
        let state = self.state.lock().await;

        let mut totals: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for award in &state.awards {
            let weight = state.badges.get(&award.badge_id).map(|b| b.tier.weight()).unwrap_or(0);
            let entry = totals.entry(award.user_id).or_default();
            entry.0 += 1;
            entry.1 += weight;
        }

        let entries = totals.into_iter()
            .filter_map(|(user_id, (badge_count, score))| {
                state.users.get(&user_id).map(|user| LeaderboardEntry {
                    user_id,
                    username: user.username.clone(),
                    badge_count,
                    score,
                })
            })
            .collect();
        Ok(rank(entries, limit))
    }
}

#[async_trait]
impl BadgeCatalog for MemoryStore {
    async fn load_catalog(&self) -> Result<Vec<BadgeDefinition>, BadgeError> {
        Ok(self.state.lock().await.badges.values().cloned().collect())
    }

    async fn insert_badge_if_absent(&self, mut badge: BadgeDefinition) -> Result<bool, BadgeError> {
        let mut state = self.state.lock().await;
        if state.badges.contains_key(&badge.id) {
            return Ok(false);
        }
        stamp(&mut badge.created_at, &mut badge.updated_at);
        state.badges.insert(badge.id.clone(), badge);
        Ok(true)
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn create_user(&self, mut user: User) -> Result<User, BadgeError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(BadgeError::Validation(format!("username {} is taken", user.username)));
        }
        stamp(&mut user.created_at, &mut user.updated_at);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_post(&self, mut post: Post) -> Result<Post, BadgeError> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&post.author_id) {
            return Err(BadgeError::not_found("user", post.author_id));
        }
        stamp(&mut post.created_at, &mut post.updated_at);
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn create_comment(&self, mut comment: Comment) -> Result<Comment, BadgeError> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&comment.author_id) {
            return Err(BadgeError::not_found("user", comment.author_id));
        }
        if !state.posts.contains_key(&comment.post_id) {
            return Err(BadgeError::not_found("post", comment.post_id));
        }
        stamp(&mut comment.created_at, &mut comment.updated_at);
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn cast_vote(&self, mut vote: Vote) -> Result<Vote, BadgeError> {
        let target = vote.target()
            .ok_or_else(|| BadgeError::Validation("a vote targets exactly one post or comment".into()))?;

        let mut state = self.state.lock().await;
        if !state.users.contains_key(&vote.voter_id) {
            return Err(BadgeError::not_found("user", vote.voter_id));
        }
        if state.author_of(target).is_none() {
            return Err(match target {
                VoteTarget::Post(id) => BadgeError::not_found("post", id),
                VoteTarget::Comment(id) => BadgeError::not_found("comment", id),
            });
        }

        if let Some(existing) = state.votes.iter_mut()
            .find(|v| v.voter_id == vote.voter_id && v.target() == Some(target))
        {
            existing.value = vote.value;
            existing.updated_at = get_current_timestamp();
            return Ok(existing.clone());
        }

        stamp(&mut vote.created_at, &mut vote.updated_at);
        state.votes.push(vote.clone());
        Ok(vote)
    }
}
