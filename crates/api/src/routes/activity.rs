use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::{middleware, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Uuid;

use agora_community::{
    ActivityLog, ActivityStore, BadgeDefinition, BadgeError, BadgeEngine, Comment, CommunityStore,
    Permission, Post, Vote, VoteTarget,
};

use crate::middleware::{authenticate, AuthenticatedUser};
use crate::response::{AppError, AppSuccess};
use crate::GlobalState;

pub fn activity_routes<S: CommunityStore>(state: &GlobalState<S>) -> Router<GlobalState<S>> {
    let auth = middleware::from_fn_with_state(state.clone(), authenticate::<S>);

    Router::new()
        .route("/posts",
            post(create_post::<S>)
            .route_layer(auth.clone())
        )
        .route("/posts/{post_id}/comments",
            post(create_comment::<S>)
            .route_layer(auth.clone())
        )
        .route("/votes",
            post(cast_vote::<S>)
            .route_layer(auth)
        )
}

/// Runs badge evaluation after an activity write. A failure here never fails
/// the write that triggered it.
async fn evaluate_quietly<S: CommunityStore>(engine: &BadgeEngine<S>, user_id: Uuid) -> Vec<BadgeDefinition> {
    match engine.check_and_award_badges(user_id).await {
        Ok(check) => check.awarded_badges,
        Err(e) => {
            tracing::warn!("[badges] evaluation after activity failed for {}: {}", user_id, e);
            Vec::new()
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<(), BadgeError> {
    if value.trim().is_empty() {
        return Err(BadgeError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
}

async fn create_post<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<AppSuccess, AppError> {
    caller.require(Permission::PublishContent)?;
    require_text("title", &payload.title)?;

    let post = state.engine.store()
        .create_post(Post::new(caller.id, payload.title, payload.body))
        .await?;
    let awarded = evaluate_quietly(&state.engine, caller.id).await;

    Ok(AppSuccess::new(StatusCode::CREATED, "post created", json!({
        "post": post,
        "awarded_badges": awarded,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

async fn create_comment<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<AppSuccess, AppError> {
    caller.require(Permission::PublishContent)?;
    require_text("body", &payload.body)?;

    let comment = state.engine.store()
        .create_comment(Comment::new(post_id, caller.id, payload.body))
        .await?;
    let awarded = evaluate_quietly(&state.engine, caller.id).await;

    Ok(AppSuccess::new(StatusCode::CREATED, "comment created", json!({
        "comment": comment,
        "awarded_badges": awarded,
    })))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub target: VoteTarget,
    pub upvote: bool,
}

async fn cast_vote<S: CommunityStore>(
    State(state): State<GlobalState<S>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<AppSuccess, AppError> {
    caller.require(Permission::PublishContent)?;

    let vote = state.engine.store()
        .cast_vote(Vote::new(caller.id, payload.target, payload.upvote))
        .await?;

    let awarded = evaluate_quietly(&state.engine, caller.id).await;
    // the author may have crossed an upvote threshold
    match state.engine.store().content_author(payload.target).await {
        Ok(Some(author_id)) if author_id != caller.id => {
            evaluate_quietly(&state.engine, author_id).await;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("[badges] author lookup after vote {} failed: {}", vote.id, e);
        }
    }

    Ok(AppSuccess::new(StatusCode::OK, "vote recorded", json!({
        "vote": vote,
        "awarded_badges": awarded,
    })))
}
