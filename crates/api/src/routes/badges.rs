use anyhow::anyhow;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::{middleware, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Uuid;

use agora_community::{BadgeCheck, CommunityStore, Permission};

use crate::middleware::{admin_rate_limit, authenticate, AuthenticatedUser};
use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

pub fn badge_routes<S: CommunityStore>(state: &GlobalState<S>) -> Router<GlobalState<S>> {
    let auth = middleware::from_fn_with_state(state.clone(), authenticate::<S>);

    Router::new()
        .route("/badges",
            get(list_badges::<S>)
        )
        .route("/badges/leaderboard",
            get(leaderboard::<S>)
        )
        .route("/badges/user/{user_id}",
            get(user_badges::<S>)
        )

        .route("/badges/check",
            post(check_own_badges::<S>)
            .route_layer(auth.clone())
        )
        .route("/badges/check/{user_id}",
            post(check_user_badges::<S>)
            .route_layer(auth.clone())
        )

        .route("/admin/badges/award",
            post(award_badge::<S>)
            .route_layer(middleware::from_fn_with_state(state.clone(), admin_rate_limit::<S>))
            .route_layer(auth)
        )
}

fn check_message(check: &BadgeCheck) -> String {
    let awarded = check.awarded_badges.len();
    let attempted = awarded + check.failed_badges.len();
    if check.failed_badges.is_empty() {
        format!("{} badges awarded", awarded)
    } else {
        format!("{} of {} badges awarded", awarded, attempted)
    }
}

async fn list_badges<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
) -> Result<AppSuccess, AppError> {
    let badges = state.engine.get_all_badges().await?;
    Ok(AppSuccess::new(StatusCode::OK, "badge catalog", json!(badges)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

async fn leaderboard<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<AppSuccess, AppError> {
    let entries = state.engine.get_badge_leaderboard(query.limit).await?;
    Ok(AppSuccess::new(StatusCode::OK, "badge leaderboard", json!(entries)))
}

async fn user_badges<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Path(user_id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    let awards = state.engine.get_user_badges(user_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, "user badges", json!(awards)))
}

async fn check_own_badges<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<AppSuccess, AppError> {
    caller.require(Permission::CheckOwnBadges)?;
    let check = state.engine.check_and_award_badges(caller.id).await?;
    Ok(AppSuccess::new(StatusCode::OK, &check_message(&check), json!(check)))
}

async fn check_user_badges<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> Result<AppSuccess, AppError> {
    if user_id != caller.id {
        caller.require(Permission::CheckAnyBadges)?;
    }
    let check = state.engine.check_and_award_badges(user_id).await?;
    Ok(AppSuccess::new(StatusCode::OK, &check_message(&check), json!(check)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AwardBadgeRequest {
    pub user_id: Uuid,
    pub badge_id: String,
}

async fn award_badge<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(payload): Json<AwardBadgeRequest>,
) -> Result<AppSuccess, AppError> {
    caller.require(Permission::AwardBadges)?;

    let stored = state.engine.award_badge(payload.user_id, &payload.badge_id, caller.id).await?;
    if !stored {
        return Err(AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow!("[/admin/badges/award] award of {} could not be stored", payload.badge_id),
        ));
    }

    Ok(AppSuccess::new(StatusCode::OK, "badge awarded", json!({
        "user_id": payload.user_id,
        "badge_id": payload.badge_id,
    })))
}
