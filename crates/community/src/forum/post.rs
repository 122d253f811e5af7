use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_database::SqlxObject;

use crate::User;

#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "posts"]
pub struct Post {
    pub id: Uuid,

    #[foreign_key(referenced_table = "users", related_rust_type = "User")]
    pub author_id: Uuid,

    pub title: String,
    pub body: String,

    #[indexed]
    pub created_at: i64,
    pub updated_at: i64,
}

impl Post {
    pub fn new(author_id: Uuid, title: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            body,
            ..Default::default()
        }
    }
}
