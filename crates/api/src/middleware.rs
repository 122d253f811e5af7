use anyhow::anyhow;
use axum::body::Body;
use axum::extract::{Extension, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use agora_common::{get_current_timestamp, verify_token};
use agora_community::{authorize, ActivityStore, CommunityStore, Permission, UserRole};

use crate::rate_limit::RateLimiter;
use crate::response::AppError;
use crate::utils::extract_bearer_token;
use crate::GlobalState;

/// The caller, attached to the request by `authenticate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        Ok(authorize(self.role, permission)?)
    }
}

pub async fn authenticate<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let token = extract_bearer_token(&req)?;
    let claims = verify_token(
        &token,
        &state.env.secret_salt,
        get_current_timestamp(),
        state.env.auth_token_ttl_secs,
    )?;

    let user_id = Uuid::parse_str(&claims.user_id)
        .map_err(|_| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("malformed token subject")))?;

    let user = state.engine.store().find_user(user_id).await?
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, anyhow!("unknown user")))?;

    req.extensions_mut().insert(AuthenticatedUser { id: user.id, role: user.role });
    Ok(next.run(req).await)
}

/// Must run after `authenticate`; keyed by the caller's id.
pub async fn admin_rate_limit<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    if !state.rate_limiter.allow(&caller.id.to_string()).await {
        tracing::warn!("[rate-limit] admin requests from {} throttled", caller.id);
        return Err(AppError::new(StatusCode::TOO_MANY_REQUESTS, anyhow!("too many requests")));
    }
    Ok(next.run(req).await)
}
