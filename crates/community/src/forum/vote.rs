use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_database::SqlxObject;

use crate::{Comment, Post, User};

/// What a vote is cast on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoteTarget {
    Post(Uuid),
    Comment(Uuid),
}

/// An up (`+1`) or down (`-1`) vote on exactly one post or comment.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "votes"]
#[unique_index("voter_id", "post_id")]
#[unique_index("voter_id", "comment_id")]
pub struct Vote {
    pub id: Uuid,

    #[foreign_key(referenced_table = "users", related_rust_type = "User")]
    pub voter_id: Uuid,

    #[foreign_key(referenced_table = "posts", related_rust_type = "Post")]
    pub post_id: Option<Uuid>,

    #[foreign_key(referenced_table = "comments", related_rust_type = "Comment")]
    pub comment_id: Option<Uuid>,

    pub value: i16,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Vote {
    pub fn new(voter_id: Uuid, target: VoteTarget, upvote: bool) -> Self {
        let (post_id, comment_id) = match target {
            VoteTarget::Post(id) => (Some(id), None),
            VoteTarget::Comment(id) => (None, Some(id)),
        };
        Self {
            id: Uuid::new_v4(),
            voter_id,
            post_id,
            comment_id,
            value: if upvote { 1 } else { -1 },
            ..Default::default()
        }
    }

    pub fn target(&self) -> Option<VoteTarget> {
        match (self.post_id, self.comment_id) {
            (Some(id), None) => Some(VoteTarget::Post(id)),
            (None, Some(id)) => Some(VoteTarget::Comment(id)),
            _ => None,
        }
    }

    pub fn is_upvote(&self) -> bool {
        self.value > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_database::SqlxSchema;

    #[test]
    fn one_vote_per_voter_and_target() {
        let create = Vote::create_table_sql();
        assert!(create.contains("CONSTRAINT \"uq_votes_voter_id_post_id\" UNIQUE (\"voter_id\", \"post_id\")"));
        assert!(create.contains("CONSTRAINT \"uq_votes_voter_id_comment_id\" UNIQUE (\"voter_id\", \"comment_id\")"));
        assert!(Vote::insert_if_absent_sql().contains("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn target_follows_the_set_column() {
        let post_id = Uuid::new_v4();
        let vote = Vote::new(Uuid::new_v4(), VoteTarget::Post(post_id), false);
        assert_eq!(vote.target(), Some(VoteTarget::Post(post_id)));
        assert!(!vote.is_upvote());

        let orphan = Vote { post_id: None, comment_id: None, ..vote };
        assert_eq!(orphan.target(), None);
    }
}
