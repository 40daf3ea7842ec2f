use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::service::PageLimits;

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
    pub page_limits: PageLimits,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_seconds: u64,
    /// Snapshot directory for the in-memory store; unset keeps it volatile.
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let secret = env_or_err("JWT_SECRET")?;
        if secret.len() < 32 {
            return Err(anyhow!("JWT_SECRET must be at least 32 characters long"));
        }

        let page_limits = PageLimits {
            default: env_or_parse("COMMENTS_DEFAULT_LIMIT", "10")?,
            max: env_or_parse("COMMENTS_MAX_LIMIT", "100")?,
        };
        if page_limits.default == 0 || page_limits.default > page_limits.max {
            return Err(anyhow!(
                "COMMENTS_DEFAULT_LIMIT must be between 1 and COMMENTS_MAX_LIMIT ({})",
                page_limits.max
            ));
        }

        Ok(Self {
            bind_addr: env_or_parse("BIND_ADDR", "0.0.0.0:8080")?,
            frontend_url: std::env::var("FRONTEND_URL").ok(),
            enable_hsts: env_flag("ENABLE_HSTS"),
            page_limits,
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_acquire_timeout_seconds: env_or_parse("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            data_dir: std::env::var("QUILL_DATA_DIR").ok().map(PathBuf::from),
        })
    }
}

pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

    fn clear() {
        for k in ["BIND_ADDR", "COMMENTS_DEFAULT_LIMIT", "COMMENTS_MAX_LIMIT", "ENABLE_HSTS", "QUILL_DATA_DIR"] {
            std::env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply() {
        clear();
        std::env::set_var("JWT_SECRET", SECRET);
        let cfg = Settings::from_env().unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.page_limits, PageLimits::default());
        assert!(!cfg.enable_hsts);
        assert!(cfg.data_dir.is_none());
    }

    #[test]
    #[serial]
    fn short_secret_is_rejected() {
        clear();
        std::env::set_var("JWT_SECRET", "short");
        assert!(Settings::from_env().is_err());
        std::env::set_var("JWT_SECRET", SECRET);
    }

    #[test]
    #[serial]
    fn default_limit_above_max_is_rejected() {
        clear();
        std::env::set_var("JWT_SECRET", SECRET);
        std::env::set_var("COMMENTS_DEFAULT_LIMIT", "50");
        std::env::set_var("COMMENTS_MAX_LIMIT", "20");
        assert!(Settings::from_env().is_err());
        clear();
    }
}
