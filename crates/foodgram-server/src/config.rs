use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Secrets that are fine on a laptop and nowhere else.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl_days: i64,
    pub seed_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("FOODGRAM_JWT_SECRET").unwrap_or_else(|| "dev-secret-change-me".into());
        if jwt_secret.is_empty() {
            anyhow::bail!("FOODGRAM_JWT_SECRET must not be empty");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("FOODGRAM_JWT_SECRET is unset or a placeholder; do not run this in production");
        }

        let db_path = lookup("FOODGRAM_DB_PATH").unwrap_or_else(|| "foodgram.db".into());
        let host = lookup("FOODGRAM_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("FOODGRAM_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("FOODGRAM_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {host}:{port}"))?;

        let token_ttl_days: i64 = lookup("FOODGRAM_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("FOODGRAM_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days < 1 {
            anyhow::bail!("FOODGRAM_TOKEN_TTL_DAYS must be at least 1");
        }

        Ok(Self {
            jwt_secret,
            db_path: db_path.into(),
            addr,
            token_ttl_days,
            seed_path: lookup("FOODGRAM_SEED_PATH").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr.port(), 8000);
        assert_eq!(config.db_path, PathBuf::from("foodgram.db"));
        assert_eq!(config.token_ttl_days, 30);
        assert!(config.seed_path.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("FOODGRAM_HOST", "127.0.0.1"),
            ("FOODGRAM_PORT", "9000"),
            ("FOODGRAM_SEED_PATH", "data/seed.json"),
        ])
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.seed_path, Some(PathBuf::from("data/seed.json")));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config(&[("FOODGRAM_PORT", "eighty")]).is_err());
        assert!(config(&[("FOODGRAM_TOKEN_TTL_DAYS", "0")]).is_err());
        assert!(config(&[("FOODGRAM_JWT_SECRET", "")]).is_err());
    }
}
