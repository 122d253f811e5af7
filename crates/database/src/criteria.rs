use sqlx::{postgres::PgArguments, Arguments, Error as SqlxError, Postgres};

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Lets `QueryCriteria` hold values of different types until the query is built.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// A single `"column" <operator> [$n]` condition.
pub struct FilterCondition {
    pub column: &'static str,
    pub operator: &'static str,
    pub value: Option<Box<dyn AsSqlxArg>>,
}

/// Filter, order and paging parameters for the generated `SqlxFilterQuery` methods.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id<V>(id: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        Self::new().add_valued_filter("id", "=", id)
    }

    /// Adds a condition; `None` produces a value-less condition such as `IS NULL`.
    pub fn add_filter<V>(mut self, column: &'static str, operator: &'static str, value: Option<V>) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            operator,
            value: value.map(|v| Box::new(v) as Box<dyn AsSqlxArg>),
        });
        self
    }

    pub fn add_valued_filter<V>(self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.add_filter(column, operator, Some(value))
    }

    pub fn limit(mut self, limit_val: i64) -> Self {
        self.limit = Some(limit_val);
        self
    }

    pub fn offset(mut self, offset_val: i64) -> Self {
        self.offset = Some(offset_val);
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    fn where_clause(&self, arguments: &mut PgArguments, placeholder_idx: &mut usize) -> Result<String, SqlxError> {
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let mut clause = format!("\"{}\" {}", condition.column, condition.operator);
            if let Some(value) = &condition.value {
                value.add_to_args(arguments)?;
                clause.push_str(&format!(" ${}", placeholder_idx));
                *placeholder_idx += 1;
            }
            clauses.push(clause);
        }

        if clauses.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", clauses.join(" AND ")))
        }
    }

    pub fn select_sql(&self, table: &str, columns: &[&str], arguments: &mut PgArguments) -> Result<String, SqlxError> {
        let mut placeholder_idx = 1;
        let select_columns = columns.iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {} FROM \"{}\"", select_columns, table);
        sql.push_str(&self.where_clause(arguments, &mut placeholder_idx)?);

        if !self.order_by.is_empty() {
            let order_clauses = self.order_by.iter()
                .map(|(col, dir)| format!("\"{}\" {}", col, dir.as_sql()))
                .collect::<Vec<_>>();
            sql.push_str(&format!(" ORDER BY {}", order_clauses.join(", ")));
        }

        if let Some(limit_val) = self.limit {
            arguments.add(limit_val).map_err(SqlxError::Encode)?;
            sql.push_str(&format!(" LIMIT ${}", placeholder_idx));
            placeholder_idx += 1;
        }

        if let Some(offset_val) = self.offset {
            arguments.add(offset_val).map_err(SqlxError::Encode)?;
            sql.push_str(&format!(" OFFSET ${}", placeholder_idx));
        }

        Ok(sql)
    }

    pub fn count_sql(&self, table: &str, arguments: &mut PgArguments) -> Result<String, SqlxError> {
        let mut placeholder_idx = 1;
        let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
        sql.push_str(&self.where_clause(arguments, &mut placeholder_idx)?);
        Ok(sql)
    }

    pub fn delete_sql(&self, table: &str, arguments: &mut PgArguments) -> Result<String, SqlxError> {
        let mut placeholder_idx = 1;
        let mut sql = format!("DELETE FROM \"{}\"", table);
        sql.push_str(&self.where_clause(arguments, &mut placeholder_idx)?);
        Ok(sql)
    }
}
