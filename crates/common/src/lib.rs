mod client;
mod env;

pub use client::ModuleClient;
pub use env::{EnvVars, env_or, env_parse_or};

/// Seconds since the unix epoch. A clock set before 1970 reads as 0.
pub fn get_current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
