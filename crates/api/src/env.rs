use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use gacha_common::{env_or, env_parse_or, EnvVars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            other => Err(anyhow!("unknown store {:?}, expected memory or postgres", other)),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => f.write_str("memory"),
            StoreKind::Postgres => f.write_str("postgres"),
        }
    }
}

pub struct ApiServerEnv {
    pub port: u16,
    pub store: StoreKind,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            port: env_parse_or("PORT", 3033)?,
            store: env_or("GACHA_STORE", "memory").parse()?,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "PORT" => Some(self.port.to_string()),
            "GACHA_STORE" => Some(self.store.to_string()),
            _ => None,
        }
    }
}
