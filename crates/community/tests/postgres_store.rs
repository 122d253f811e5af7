//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.

use std::sync::Arc;

use agora_community::badges::{default_catalog, seed_catalog};
use agora_community::{
    ActivityLog, BadgeDefinition, BadgeEngine, BadgeError, Comment, PgStore, Post, User, UserBadgeAward, UserRole, Vote,
    VoteTarget,
};
use agora_database::{create_schema, install_timestamp_trigger_fn};
use sqlx::PgPool;
use tokio::sync::OnceCell;

static POOL: OnceCell<PgPool> = OnceCell::const_new();

async fn pool() -> PgPool {
    POOL.get_or_init(|| async {
        dotenv::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("failed to connect");

        install_timestamp_trigger_fn(&pool).await.unwrap();
        create_schema::<User>(&pool).await.unwrap();
        create_schema::<Post>(&pool).await.unwrap();
        create_schema::<Comment>(&pool).await.unwrap();
        create_schema::<Vote>(&pool).await.unwrap();
        create_schema::<BadgeDefinition>(&pool).await.unwrap();
        create_schema::<UserBadgeAward>(&pool).await.unwrap();

        seed_catalog(&PgStore::new(pool.clone()), default_catalog()).await.unwrap();
        pool
    }).await.clone()
}

async fn fresh_user(store: &PgStore, role: UserRole) -> User {
    let username = format!("user-{}", sqlx::types::Uuid::new_v4());
    store.create_user(User::new(username, role)).await.unwrap()
}

#[tokio::test]
#[ignore]
async fn concurrent_checks_insert_one_row() {
    let store = PgStore::new(pool().await);
    let user = fresh_user(&store, UserRole::Member).await;
    for i in 0..10 {
        store.create_post(Post::new(user.id, format!("post {}", i), "body".into())).await.unwrap();
    }

    let engine = Arc::new(BadgeEngine::new(store.clone()));
    let user_id = user.id;
    let handles: Vec<_> = (0..8).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.check_and_award_badges(user_id).await })
    }).collect();

    let mut reported = 0;
    for handle in handles {
        let check = handle.await.unwrap().unwrap();
        reported += check.awarded_badges.iter().filter(|b| b.id == "prolific-poster").count();
    }
    assert_eq!(reported, 1);

    let rows: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "user_badges" WHERE "user_id" = $1 AND "badge_id" = 'prolific-poster'"#,
    )
    .bind(user.id)
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore]
async fn concurrent_repeat_votes_keep_one_row() {
    let store = PgStore::new(pool().await);
    let author = fresh_user(&store, UserRole::Member).await;
    let fan = fresh_user(&store, UserRole::Member).await;
    let post = store.create_post(Post::new(author.id, "hello".into(), "world".into())).await.unwrap();

    let fan_id = fan.id;
    let post_id = post.id;
    let handles: Vec<_> = (0..8).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store.cast_vote(Vote::new(fan_id, VoteTarget::Post(post_id), i % 2 == 0)).await
        })
    }).collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let rows: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "votes" WHERE "voter_id" = $1 AND "post_id" = $2"#)
        .bind(fan.id)
        .bind(post.id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let check = BadgeEngine::new(store.clone()).check_and_award_badges(author.id).await.unwrap();
    assert!(check.user_stats.upvotes_received <= 1);
}

#[tokio::test]
#[ignore]
async fn unknown_comment_author_is_not_found() {
    let store = PgStore::new(pool().await);
    let author = fresh_user(&store, UserRole::Member).await;
    let post = store.create_post(Post::new(author.id, "hello".into(), "world".into())).await.unwrap();

    let stranger = sqlx::types::Uuid::new_v4();
    let err = store.create_comment(Comment::new(post.id, stranger, "hi".into())).await.unwrap_err();
    assert!(matches!(err, BadgeError::NotFound { entity: "user", .. }));

    let err = store.cast_vote(Vote::new(stranger, VoteTarget::Post(post.id), true)).await.unwrap_err();
    assert!(matches!(err, BadgeError::NotFound { entity: "user", .. }));
}

#[tokio::test]
#[ignore]
async fn upvotes_exclude_self_votes_and_leaderboard_scores() {
    let store = PgStore::new(pool().await);
    let author = fresh_user(&store, UserRole::Member).await;
    let fan = fresh_user(&store, UserRole::Member).await;
    let admin = fresh_user(&store, UserRole::Admin).await;

    let post = store.create_post(Post::new(author.id, "hello".into(), "world".into())).await.unwrap();
    store.cast_vote(Vote::new(author.id, VoteTarget::Post(post.id), true)).await.unwrap();
    store.cast_vote(Vote::new(fan.id, VoteTarget::Post(post.id), false)).await.unwrap();
    store.cast_vote(Vote::new(fan.id, VoteTarget::Post(post.id), true)).await.unwrap();

    let engine = BadgeEngine::new(store.clone());
    let check = engine.check_and_award_badges(author.id).await.unwrap();
    assert_eq!(check.user_stats.upvotes_received, 1);
    assert_eq!(check.user_stats.post_count, 1);
    assert_eq!(check.user_stats.activity_streak_days, 1);

    assert!(engine.award_badge(author.id, "founding-member", admin.id).await.unwrap());
    let board = engine.get_badge_leaderboard(Some(100)).await.unwrap();
    let entry = board.iter().find(|e| e.user_id == author.id).unwrap();
    assert_eq!(entry.badge_count, 2);
    assert_eq!(entry.score, 1 + 5);
}
