use thiserror::Error;

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("not authorized: {0}")]
    Authorization(String),
}

impl BadgeError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BadgeError::NotFound { entity, id: id.to_string() }
    }

    pub fn storage<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BadgeError::Storage(Box::new(error))
    }
}

impl From<sqlx::Error> for BadgeError {
    fn from(error: sqlx::Error) -> Self {
        BadgeError::storage(error)
    }
}
