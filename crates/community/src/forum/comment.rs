use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_database::SqlxObject;

use crate::{Post, User};

#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "comments"]
pub struct Comment {
    pub id: Uuid,

    #[foreign_key(referenced_table = "posts", related_rust_type = "Post")]
    pub post_id: Uuid,

    #[foreign_key(referenced_table = "users", related_rust_type = "User")]
    pub author_id: Uuid,

    pub body: String,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Comment {
    pub fn new(post_id: Uuid, author_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            body,
            ..Default::default()
        }
    }
}
