use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::types::Uuid;
use sqlx::PgPool;

use agora_database::{OrderDirection, QueryCriteria, SqlxCrud, SqlxFilterQuery};

use crate::badges::{tier_weight_sql, BadgeDefinition, BadgeError, LeaderboardEntry, UserBadgeAward};
use crate::{Comment, Post, User, Vote, VoteTarget};
use super::{ActivityLog, ActivitySnapshot, ActivityStore, AwardStore, BadgeCatalog};

const UPVOTES_RECEIVED_SQL: &str = r#"
    SELECT COUNT(*) FROM "votes" v
    LEFT JOIN "posts" p ON p."id" = v."post_id"
    LEFT JOIN "comments" c ON c."id" = v."comment_id"
    WHERE v."value" > 0
      AND v."voter_id" <> $1
      AND (p."author_id" = $1 OR c."author_id" = $1)
"#;

const ACTIVE_DAYS_SQL: &str = r#"
    SELECT DISTINCT activity."created_at" / 86400 AS day FROM (
        SELECT "created_at" FROM "posts" WHERE "author_id" = $1
        UNION ALL
        SELECT "created_at" FROM "comments" WHERE "author_id" = $1
    ) activity
    ORDER BY day DESC
"#;

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed store over the tables created by `init_databases!`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl ActivityStore for PgStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, BadgeError> {
        Ok(User::find_one_by_criteria(QueryCriteria::by_id(user_id), &self.pool).await?)
    }

    async fn activity_snapshot(&self, user_id: Uuid) -> Result<ActivitySnapshot, BadgeError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let post_count = Post::count_by_criteria(
            QueryCriteria::new().add_valued_filter("author_id", "=", user_id),
            &mut *tx,
        ).await?;

        let comment_count = Comment::count_by_criteria(
            QueryCriteria::new().add_valued_filter("author_id", "=", user_id),
            &mut *tx,
        ).await?;

        let votes_cast = Vote::count_by_criteria(
            QueryCriteria::new().add_valued_filter("voter_id", "=", user_id),
            &mut *tx,
        ).await?;

        let upvotes_received = sqlx::query_scalar::<_, i64>(UPVOTES_RECEIVED_SQL)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let active_days = sqlx::query_scalar::<_, i64>(ACTIVE_DAYS_SQL)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ActivitySnapshot {
            post_count,
            comment_count,
            upvotes_received,
            votes_cast,
            active_days,
        })
    }

    async fn content_author(&self, target: VoteTarget) -> Result<Option<Uuid>, BadgeError> {
        let author = match target {
            VoteTarget::Post(id) => Post::find_one_by_criteria(QueryCriteria::by_id(id), &self.pool).await?
                .map(|p| p.author_id),
            VoteTarget::Comment(id) => Comment::find_one_by_criteria(QueryCriteria::by_id(id), &self.pool).await?
                .map(|c| c.author_id),
        };
        Ok(author)
    }
}

#[async_trait]
impl AwardStore for PgStore {
    async fn held_badge_ids(&self, user_id: Uuid) -> Result<HashSet<String>, BadgeError> {
        let awards = UserBadgeAward::find_by_criteria(
            QueryCriteria::new().add_valued_filter("user_id", "=", user_id),
            &self.pool,
        ).await?;
        Ok(awards.into_iter().map(|a| a.badge_id).collect())
    }

    async fn insert_award_if_absent(&self, award: UserBadgeAward) -> Result<bool, BadgeError> {
        Ok(award.create_if_absent(&self.pool).await?.is_some())
    }

    async fn user_awards(&self, user_id: Uuid) -> Result<Vec<UserBadgeAward>, BadgeError> {
        Ok(UserBadgeAward::find_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("user_id", "=", user_id)
                .order_by("awarded_at", OrderDirection::Asc)
                .order_by("badge_id", OrderDirection::Asc),
            &self.pool,
        ).await?)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, BadgeError> {
        let sql = format!(
            r#"SELECT u."id" AS user_id, u."username" AS username,
                      COUNT(ub."id") AS badge_count,
                      COALESCE(SUM({weight}), 0)::BIGINT AS score
               FROM "user_badges" ub
               JOIN "users" u ON u."id" = ub."user_id"
               JOIN "badges" b ON b."id" = ub."badge_id"
               GROUP BY u."id", u."username"
               ORDER BY score DESC, badge_count DESC, u."id" ASC
               LIMIT $1"#,
            weight = tier_weight_sql("b.\"tier\""),
        );

        Ok(sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl BadgeCatalog for PgStore {
    async fn load_catalog(&self) -> Result<Vec<BadgeDefinition>, BadgeError> {
        Ok(BadgeDefinition::find_by_criteria(
            QueryCriteria::new().order_by("id", OrderDirection::Asc),
            &self.pool,
        ).await?)
    }

    async fn insert_badge_if_absent(&self, badge: BadgeDefinition) -> Result<bool, BadgeError> {
        Ok(badge.create_if_absent(&self.pool).await?.is_some())
    }
}

#[async_trait]
impl ActivityLog for PgStore {
    async fn create_user(&self, user: User) -> Result<User, BadgeError> {
        let username = user.username.clone();
        user.create(&self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                BadgeError::Validation(format!("username {} is taken", username))
            } else {
                e.into()
            }
        })
    }

    async fn create_post(&self, post: Post) -> Result<Post, BadgeError> {
        if self.find_user(post.author_id).await?.is_none() {
            return Err(BadgeError::not_found("user", post.author_id));
        }
        Ok(post.create(&self.pool).await?)
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, BadgeError> {
        if self.find_user(comment.author_id).await?.is_none() {
            return Err(BadgeError::not_found("user", comment.author_id));
        }
        if Post::find_one_by_criteria(QueryCriteria::by_id(comment.post_id), &self.pool).await?.is_none() {
            return Err(BadgeError::not_found("post", comment.post_id));
        }
        Ok(comment.create(&self.pool).await?)
    }

    async fn cast_vote(&self, vote: Vote) -> Result<Vote, BadgeError> {
        let target = vote.target()
            .ok_or_else(|| BadgeError::Validation("a vote targets exactly one post or comment".into()))?;

        if self.find_user(vote.voter_id).await?.is_none() {
            return Err(BadgeError::not_found("user", vote.voter_id));
        }

        let mut tx = self.pool.begin().await?;

        let (exists, criteria) = match target {
            VoteTarget::Post(id) => (
                Post::count_by_criteria(QueryCriteria::by_id(id), &mut *tx).await? > 0,
                QueryCriteria::new().add_valued_filter("post_id", "=", id),
            ),
            VoteTarget::Comment(id) => (
                Comment::count_by_criteria(QueryCriteria::by_id(id), &mut *tx).await? > 0,
                QueryCriteria::new().add_valued_filter("comment_id", "=", id),
            ),
        };
        if !exists {
            return Err(match target {
                VoteTarget::Post(id) => BadgeError::not_found("post", id),
                VoteTarget::Comment(id) => BadgeError::not_found("comment", id),
            });
        }

        // a concurrent first vote from the same voter loses the insert on the
        // unique index and falls through to the update
        let voter_id = vote.voter_id;
        let value = vote.value;
        let stored = match vote.create_if_absent(&mut *tx).await? {
            Some(created) => created,
            None => {
                let mut previous = Vote::find_one_by_criteria(
                    criteria.add_valued_filter("voter_id", "=", voter_id),
                    &mut *tx,
                ).await?
                .ok_or_else(|| BadgeError::Validation("vote conflicts with another vote".into()))?;
                previous.value = value;
                previous.update(&mut *tx).await?
            }
        };

        tx.commit().await?;
        Ok(stored)
    }
}
