use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Shared key the kiosk sends in `X-Kiosk-Key`. Kiosk routes are disabled when unset.
    pub kiosk_key: Option<String>,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        fn parsed<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match value {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} has an invalid value: {raw}")),
                None => Ok(default),
            }
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed(lookup("ACCESS_TOKEN_TTL"), "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed(lookup("REFRESH_TOKEN_TTL"), "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed(lookup("RATE_LOGIN_PER_MIN"), "RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed(lookup("RATE_REFRESH_PER_MIN"), "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed(
                lookup("RATE_PROTECTED_PER_MIN"),
                "RATE_PROTECTED_PER_MIN",
                1000,
            )?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            kiosk_key: lookup("KIOSK_KEY").filter(|k| !k.trim().is_empty()),
            run_migrations: parsed(lookup("RUN_MIGRATIONS"), "RUN_MIGRATIONS", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://u:p@localhost/timeclock"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.refresh_token_ttl, 604_800);
        assert_eq!(config.rate_login_per_min, 60);
        assert_eq!(config.api_prefix, "/api");
        assert!(config.kiosk_key.is_none());
        assert!(config.run_migrations);
    }

    #[test]
    fn test_missing_required_value() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_TTL"));
    }

    #[test]
    fn test_blank_kiosk_key_disables_kiosk() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("KIOSK_KEY", "  "));
        pairs.push(("RUN_MIGRATIONS", "false"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.kiosk_key.is_none());
        assert!(!config.run_migrations);
    }
}
