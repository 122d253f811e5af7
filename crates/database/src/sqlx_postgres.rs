use sqlx::{postgres::PgArguments, Error as SqlxError, Executor, FromRow, PgPool, Postgres};

use crate::QueryCriteria;

/// Table layout of a database object. Implemented by `#[derive(SqlxObject)]`.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug {
    /// The type of the primary key, taken from the struct's `id` field.
    type Id: Send + Sync + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Clone;

    /// The intermediate type that implements FromRow, used for fetching from the database.
    type Row: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str;
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str];

    fn id_column_name() -> &'static str { Self::ID_COLUMN_NAME }
    fn table_name() -> &'static str { Self::TABLE_NAME }
    fn columns() -> &'static [&'static str] { Self::COLUMNS }

    fn get_id_value(&self) -> Self::Id;

    /// Converts a fetched row; fails when a text-encoded column no longer parses.
    fn from_row(row: Self::Row) -> Result<Self, SqlxError>;

    fn create_table_sql() -> String;
    fn drop_table_sql() -> String;
    fn insert_sql() -> String;
    /// Same as `insert_sql` but a row violating any unique constraint is skipped.
    fn insert_if_absent_sql() -> String;
    fn update_by_id_sql() -> String;
    fn trigger_sql() -> String;
}

/// Create, update and delete for a `SqlxSchema` object.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + SqlxFilterQuery + Sized {
    fn bind_insert<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Binds the updatable columns, then the primary key for the WHERE clause.
    fn bind_update<'q>(&self, query: sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> sqlx::query::QueryAs<'q, Postgres, Self::Row, PgArguments>;

    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::insert_sql();
        let row = self.bind_insert(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_one(executor)
            .await?;
        Self::from_row(row)
    }

    /// Inserts unless a unique constraint already holds a matching row.
    /// Returns `None` when the insert was skipped.
    async fn create_if_absent<'e, E>(self, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::insert_if_absent_sql();
        let row = self.bind_insert(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_optional(executor)
            .await?;
        row.map(Self::from_row).transpose()
    }

    async fn update<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = Self::update_by_id_sql();
        let row = self.bind_update(sqlx::query_as::<_, Self::Row>(&sql))
            .fetch_one(executor)
            .await?;
        Self::from_row(row)
    }

    async fn delete<'e, E>(self, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let sql = format!("DELETE FROM \"{}\" WHERE \"{}\" = $1", Self::TABLE_NAME, Self::ID_COLUMN_NAME);
        sqlx::query(&sql)
            .bind(self.get_id_value())
            .execute(executor)
            .await
            .map(|done| done.rows_affected())
    }
}

/// Criteria-driven reads and deletes.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let mut arguments = PgArguments::default();
        let sql = criteria.select_sql(Self::TABLE_NAME, Self::COLUMNS, &mut arguments)?;
        let rows = sqlx::query_as_with::<_, Self::Row, _>(&sql, arguments)
            .fetch_all(executor)
            .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Adds `LIMIT 1` when the criteria carry no limit of their own.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        };
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }

    async fn count_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<i64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let mut arguments = PgArguments::default();
        let sql = criteria.count_sql(Self::TABLE_NAME, &mut arguments)?;
        sqlx::query_scalar_with::<_, i64, _>(&sql, arguments)
            .fetch_one(executor)
            .await
    }

    async fn delete_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
        Self: Send,
    {
        let mut arguments = PgArguments::default();
        let sql = criteria.delete_sql(Self::TABLE_NAME, &mut arguments)?;
        sqlx::query_with(&sql, arguments)
            .execute(executor)
            .await
            .map(|done| done.rows_affected())
    }
}

pub async fn install_timestamp_trigger_fn(pool: &PgPool) -> Result<(), SqlxError> {
    let trigger_func_sql = r#"
    CREATE OR REPLACE FUNCTION set_updated_at_unix_timestamp()
    RETURNS TRIGGER AS $$
    BEGIN NEW.updated_at = floor(extract(epoch from now())); RETURN NEW; END;
    $$ language 'plpgsql';
    "#;
    sqlx::query(trigger_func_sql).execute(pool).await?;
    Ok(())
}

/// Creates the table, its `updated_at` trigger and its indexes. Idempotent.
pub async fn create_schema<T: SqlxSchema>(pool: &PgPool) -> Result<(), SqlxError> {
    sqlx::query(&T::create_table_sql()).execute(pool).await?;

    let trigger_sql = T::trigger_sql();
    for statement in trigger_sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }

    for index_sql in T::INDEXES_SQL {
        sqlx::query(index_sql).execute(pool).await?;
    }

    tracing::debug!("[database] schema ready for '{}'", T::TABLE_NAME);
    Ok(())
}

pub async fn drop_schema<T: SqlxSchema>(pool: &PgPool) -> Result<(), SqlxError> {
    if let Err(e) = sqlx::query(&T::drop_table_sql()).execute(pool).await {
        tracing::warn!("[database] failed to drop table '{}': {:?}", T::TABLE_NAME, e);
    }
    Ok(())
}

/// Declares `connect()`, the process-wide pool for the listed object types.
///
/// Types are created in the order given, so list referenced tables first.
///
/// ```rust,ignore
/// init_databases!(default: [User, Post, Comment]);
///
/// let pool = connect(false, true).await?;
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: tokio::sync::OnceCell<sqlx::PgPool> = tokio::sync::OnceCell::const_new();

        pub async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static sqlx::PgPool> {
            POOL.get_or_try_init(|| async {
                let env = $crate::DatabaseEnv::require()?;
                let pool = sqlx::PgPool::connect(&env.database_url).await?;

                if drop_tables {
                    // DROP ... CASCADE, order does not matter
                    $( $crate::drop_schema::<$default_type>(&pool).await?; )*
                }

                if create_tables {
                    $crate::install_timestamp_trigger_fn(&pool).await?;
                    $( $crate::create_schema::<$default_type>(&pool).await?; )*
                }

                Ok::<_, anyhow::Error>(pool)
            }).await
        }
    };
}
