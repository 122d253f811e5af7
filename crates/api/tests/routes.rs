use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agora_api::{app, ApiServerEnv, GlobalState, InMemoryRateLimiter, RateLimitConfig};
use agora_common::{get_current_timestamp, sign_token, TokenClaims};
use agora_community::badges::{default_catalog, seed_catalog};
use agora_community::{ActivityLog, MemoryStore, User, UserRole, VoteTarget};

const SECRET: &str = "test-salt";

struct Harness {
    app: Router,
    store: MemoryStore,
    admin: User,
    moderator: User,
    member: User,
}

async fn harness(admin_rate_limit_max: u64) -> Harness {
    let store = MemoryStore::new();
    seed_catalog(&store, default_catalog()).await.unwrap();

    let admin = store.create_user(User::new("root".into(), UserRole::Admin)).await.unwrap();
    let moderator = store.create_user(User::new("mod".into(), UserRole::Moderator)).await.unwrap();
    let member = store.create_user(User::new("ada".into(), UserRole::Member)).await.unwrap();

    let env = ApiServerEnv {
        secret_salt: SECRET.into(),
        redis_url: None,
        port: 0,
        admin_rate_limit_max,
        admin_rate_limit_window_secs: 60,
        auth_token_ttl_secs: 60,
    };
    let limiter = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: admin_rate_limit_max,
        window: Duration::from_secs(60),
    }));

    Harness {
        app: app(GlobalState::new(store.clone(), limiter, env)),
        store,
        admin,
        moderator,
        member,
    }
}

fn token_at(user: &User, timestamp: i64) -> String {
    sign_token(&TokenClaims { user_id: user.id.to_string(), timestamp }, SECRET)
}

async fn send_with_token(app: &Router, method: Method, uri: &str, token: Option<String>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }.unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn send(app: &Router, method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
    let token = user.map(|u| token_at(u, get_current_timestamp()));
    send_with_token(app, method, uri, token, body).await
}

fn badge_ids(value: &Value) -> Vec<String> {
    value.as_array().unwrap().iter()
        .map(|b| b["badge_id"].as_str().or_else(|| b["id"].as_str()).unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let h = harness(10).await;
    let (status, _) = send(&h.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn check_requires_a_valid_token() {
    let h = harness(10).await;

    let (status, _) = send(&h.app, Method::POST, "/badges/check", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = token_at(&h.member, get_current_timestamp() - 3600);
    let (status, body) = send_with_token(&h.app, Method::POST, "/badges/check", Some(expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let forged = sign_token(
        &TokenClaims { user_id: h.member.id.to_string(), timestamp: get_current_timestamp() },
        "other-salt",
    );
    let (status, _) = send_with_token(&h.app, Method::POST, "/badges/check", Some(forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn posting_awards_badges_once() {
    let h = harness(10).await;

    let mut awarded = Vec::new();
    for i in 0..10 {
        let (status, body) = send(
            &h.app, Method::POST, "/posts", Some(&h.member),
            Some(json!({ "title": format!("post {}", i), "body": "hello" })),
        ).await;
        assert_eq!(status, StatusCode::CREATED);
        awarded.extend(badge_ids(&body["data"]["awarded_badges"]));
    }
    assert_eq!(awarded, vec!["first-post".to_string(), "prolific-poster".to_string()]);

    let (status, body) = send(&h.app, Method::POST, "/badges/check", Some(&h.member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "0 badges awarded");
    assert_eq!(body["data"]["user_stats"]["post_count"], 10);
    assert!(body["data"]["awarded_badges"].as_array().unwrap().is_empty());

    let uri = format!("/badges/user/{}", h.member.id);
    let (status, body) = send(&h.app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(badge_ids(&body["data"]).len(), 2);
}

#[tokio::test]
async fn empty_post_title_is_rejected() {
    let h = harness(10).await;
    let (status, body) = send(
        &h.app, Method::POST, "/posts", Some(&h.member),
        Some(json!({ "title": "  ", "body": "hello" })),
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn checking_someone_else_needs_moderator() {
    let h = harness(10).await;
    let uri = format!("/badges/check/{}", h.member.id);

    let (status, _) = send(&h.app, Method::POST, &uri, Some(&h.member), None).await;
    assert_eq!(status, StatusCode::OK);

    let other = format!("/badges/check/{}", h.admin.id);
    let (status, _) = send(&h.app, Method::POST, &other, Some(&h.member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&h.app, Method::POST, &uri, Some(&h.moderator), None).await;
    assert_eq!(status, StatusCode::OK);

    let missing = format!("/badges/check/{}", sqlx::types::Uuid::new_v4());
    let (status, _) = send(&h.app, Method::POST, &missing, Some(&h.moderator), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_award_is_admin_only_and_idempotent() {
    let h = harness(10).await;
    let award = json!({ "user_id": h.member.id, "badge_id": "founding-member" });

    let (status, _) = send(&h.app, Method::POST, "/admin/badges/award", Some(&h.moderator), Some(award.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let (status, body) = send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(award.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["badge_id"], "founding-member");
    }

    let uri = format!("/badges/user/{}", h.member.id);
    let (_, body) = send(&h.app, Method::GET, &uri, None, None).await;
    assert_eq!(badge_ids(&body["data"]), vec!["founding-member".to_string()]);

    let unknown = json!({ "user_id": h.member.id, "badge_id": "no-such-badge" });
    let (status, _) = send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_requests_are_rate_limited() {
    let h = harness(2).await;
    let award = json!({ "user_id": h.member.id, "badge_id": "veteran" });

    for _ in 0..2 {
        let (status, _) = send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(award.clone())).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(award)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn upvotes_award_the_author() {
    let h = harness(10).await;
    let (_, body) = send(
        &h.app, Method::POST, "/posts", Some(&h.member),
        Some(json!({ "title": "hello", "body": "world" })),
    ).await;
    let post_id = body["data"]["post"]["id"].as_str().unwrap().to_string();

    // the author's own vote does not count
    let vote = json!({ "target": { "kind": "post", "id": post_id }, "upvote": true });
    let (status, _) = send(&h.app, Method::POST, "/votes", Some(&h.member), Some(vote)).await;
    assert_eq!(status, StatusCode::OK);

    for i in 0..10 {
        let fan = h.store.create_user(User::new(format!("fan{}", i), UserRole::Member)).await.unwrap();
        let vote = json!({ "target": { "kind": "post", "id": post_id }, "upvote": true });
        let (status, _) = send(&h.app, Method::POST, "/votes", Some(&fan), Some(vote)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/badges/user/{}", h.member.id);
    let (_, body) = send(&h.app, Method::GET, &uri, None, None).await;
    let held = badge_ids(&body["data"]);
    assert!(held.contains(&"well-liked".to_string()));
    assert!(held.contains(&"first-post".to_string()));

    let comment = json!({ "body": "nice" });
    let uri = format!("/posts/{}/comments", post_id);
    let (status, _) = send(&h.app, Method::POST, &uri, Some(&h.moderator), Some(comment)).await;
    assert_eq!(status, StatusCode::CREATED);

    let missing = format!("/posts/{}/comments", sqlx::types::Uuid::new_v4());
    let (status, _) = send(&h.app, Method::POST, &missing, Some(&h.moderator), Some(json!({ "body": "hi" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vote_succeeds_when_author_lookup_fails() {
    let h = harness(10).await;
    let (_, body) = send(
        &h.app, Method::POST, "/posts", Some(&h.member),
        Some(json!({ "title": "hello", "body": "world" })),
    ).await;
    let post_id = body["data"]["post"]["id"].as_str().unwrap().to_string();

    h.store.fail_author_lookups().await;
    let vote = json!({ "target": { "kind": "post", "id": post_id }, "upvote": true });
    let (status, body) = send(&h.app, Method::POST, "/votes", Some(&h.moderator), Some(vote)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "vote recorded");

    let target = VoteTarget::Post(post_id.parse().unwrap());
    assert_eq!(h.store.vote_rows(h.moderator.id, target).await, 1);
}

#[tokio::test]
async fn catalog_and_leaderboard_are_public() {
    let h = harness(10).await;

    let (status, body) = send(&h.app, Method::GET, "/badges", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(badge_ids(&body["data"]).len(), default_catalog().len());

    for badge in ["post-centurion", "first-post"] {
        let award = json!({ "user_id": h.member.id, "badge_id": badge });
        send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(award)).await;
    }
    let award = json!({ "user_id": h.moderator.id, "badge_id": "founding-member" });
    send(&h.app, Method::POST, "/admin/badges/award", Some(&h.admin), Some(award)).await;

    let (status, body) = send(&h.app, Method::GET, "/badges/leaderboard?limit=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["username"], "mod");
    assert_eq!(entries[0]["score"], 5);

    let (_, body) = send(&h.app, Method::GET, "/badges/leaderboard", None, None).await;
    assert_eq!(body["data"][1]["username"], "ada");
    assert_eq!(body["data"][1]["score"], 4);
}
