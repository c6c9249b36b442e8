use std::str::FromStr;

use anyhow::{anyhow, Result};

pub trait EnvVars: Sized {
    fn load() -> Result<Self>;
    fn get_env_var(&self, key: &str) -> Option<String>;
}

/// Reads `key`, falling back to `default` when it is unset or blank.
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Parses `key` as `T`. Unset or blank values yield `default`; values that
/// are present but malformed are an error rather than silently replaced.
pub fn env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("[env] {} has an invalid value {:?}: {}", key, value, e)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_blank() {
        std::env::set_var("GACHA_COMMON_TEST_BLANK", "  ");
        assert_eq!(env_or("GACHA_COMMON_TEST_BLANK", "x"), "x");
        assert_eq!(env_or("GACHA_COMMON_TEST_UNSET", "y"), "y");
    }

    #[test]
    fn test_env_parse_or_rejects_garbage() {
        std::env::set_var("GACHA_COMMON_TEST_PORT", "not-a-port");
        assert!(env_parse_or::<u16>("GACHA_COMMON_TEST_PORT", 3033).is_err());

        std::env::set_var("GACHA_COMMON_TEST_PORT_OK", "8080");
        assert_eq!(env_parse_or::<u16>("GACHA_COMMON_TEST_PORT_OK", 3033).unwrap(), 8080);
        assert_eq!(env_parse_or::<u16>("GACHA_COMMON_TEST_PORT_UNSET", 3033).unwrap(), 3033);
    }
}
