use std::env;

use agora_common::EnvVars;

pub struct DatabaseEnv {
    pub database_url: String,
}

impl EnvVars for DatabaseEnv {
    fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "DATABASE_URL" => self.database_url.clone(),
            _ => String::new(),
        }
    }
}

impl DatabaseEnv {
    /// Loads the environment and fails when `DATABASE_URL` is missing.
    pub fn require() -> anyhow::Result<Self> {
        let env = Self::load();
        if env.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL environment variable not set");
        }
        Ok(env)
    }
}
