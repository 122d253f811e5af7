mod env;
mod criteria;
mod sqlx_postgres;

pub use env::DatabaseEnv;
pub use criteria::{AsSqlxArg, FilterCondition, OrderDirection, QueryCriteria};
pub use sqlx_postgres::{
    create_schema, drop_schema, install_timestamp_trigger_fn,
    SqlxCrud, SqlxFilterQuery, SqlxSchema,
};

pub use agora_db_macros::SqlxObject;
