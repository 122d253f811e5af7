use sqlx::PgPool;

use agora_common::define_module_client;
use agora_database::init_databases;

init_databases!(
    default: [
        agora_community::User,
        agora_community::Post,
        agora_community::Comment,
        agora_community::Vote,
        agora_community::BadgeDefinition,
        agora_community::UserBadgeAward,
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        let pool = connect(false, true).await?;
        Ok::<_, anyhow::Error>(pool.clone())
    }
}
