use agora_common::{env_or, EnvVars};

pub struct ApiServerEnv {
    pub secret_salt: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub admin_rate_limit_max: u64,
    pub admin_rate_limit_window_secs: u64,
    pub auth_token_ttl_secs: i64,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            secret_salt: std::env::var("SECRET_SALT").unwrap_or_default(),
            redis_url: std::env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            port: env_or("PORT", 3033),
            admin_rate_limit_max: env_or("ADMIN_RATE_LIMIT_MAX", 30),
            admin_rate_limit_window_secs: env_or("ADMIN_RATE_LIMIT_WINDOW_SECS", 60),
            auth_token_ttl_secs: env_or("AUTH_TOKEN_TTL_SECS", 60),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "SECRET_SALT" => self.secret_salt.clone(),
            "REDIS_URL" => self.redis_url.clone().unwrap_or_default(),
            "PORT" => self.port.to_string(),
            "ADMIN_RATE_LIMIT_MAX" => self.admin_rate_limit_max.to_string(),
            "ADMIN_RATE_LIMIT_WINDOW_SECS" => self.admin_rate_limit_window_secs.to_string(),
            "AUTH_TOKEN_TTL_SECS" => self.auth_token_ttl_secs.to_string(),
            _ => String::new(),
        }
    }
}

impl ApiServerEnv {
    pub fn require() -> anyhow::Result<Self> {
        let env = Self::load();
        if env.secret_salt.is_empty() {
            anyhow::bail!("SECRET_SALT environment variable not set");
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_read_as_unset() {
        let env = ApiServerEnv {
            secret_salt: "salt".into(),
            redis_url: None,
            port: 3033,
            admin_rate_limit_max: 30,
            admin_rate_limit_window_secs: 60,
            auth_token_ttl_secs: 60,
        };
        assert_eq!(env.get_env_var("PORT"), "3033");
        assert_eq!(env.get_env_var("REDIS_URL"), "");
        assert_eq!(env.get_env_var("NOT_A_SETTING"), "");
    }
}
