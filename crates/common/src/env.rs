use std::str::FromStr;

pub trait EnvVars {
    fn load() -> Self;
    fn get_env_var(&self, key: &str) -> String;
}

/// Reads `key` from the environment and parses it, falling back to `default`
/// when the variable is unset or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("[env] {} has an invalid value {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_and_invalid() {
        assert_eq!(env_or::<u64>("AGORA_TEST_SURELY_UNSET_VAR", 7), 7);

        std::env::set_var("AGORA_TEST_INVALID_NUMBER", "seven");
        assert_eq!(env_or::<u64>("AGORA_TEST_INVALID_NUMBER", 7), 7);

        std::env::set_var("AGORA_TEST_VALID_NUMBER", " 42 ");
        assert_eq!(env_or::<u64>("AGORA_TEST_VALID_NUMBER", 7), 42);
    }
}
