mod role;

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_database::SqlxObject;

pub use role::{authorize, Permission, UserRole};

#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "users"]
pub struct User {
    pub id: Uuid,

    #[unique]
    pub username: String,
    pub role: UserRole,

    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn new(username: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            role,
            ..Default::default()
        }
    }
}
