//! Load [`ServerConfig`] from environment variables.

use crate::config::types::*;
use crate::error::ConfigError;
use crate::service::DEFAULT_MAX_ID_GAP;
use std::str::FromStr;

impl ServerConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let master_user_id = var("MASTER_USER_ID").ok_or(ConfigError::Missing("MASTER_USER_ID"))?;
        let master_hashword = var("MASTER_HASHWORD").ok_or(ConfigError::Missing("MASTER_HASHWORD"))?;

        let mut config = ServerConfig::new(master_user_id, master_hashword);
        config.port = parsed(&var, "PORT", DEFAULT_PORT)?;
        config.db_path = var("DB_PATH").map(Into::into);
        config.fresh_limit_ms = parsed(&var, "FRESH_LIMIT_MS", DEFAULT_FRESH_LIMIT_MS)?;
        config.fake_secure = flag(&var, "FAKE_SECURE")?;
        config.fake_authorized = flag(&var, "FAKE_AUTHORIZED")?;
        config.body_limit_bytes = parsed(&var, "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES)?;
        config.max_id_gap = parsed(&var, "MAX_ID_GAP", DEFAULT_MAX_ID_GAP)?;
        if config.max_id_gap < 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_ID_GAP",
                value: config.max_id_gap.to_string(),
            });
        }
        config.trust_proxy = flag(&var, "TRUST_PROXY")?;
        Ok(config)
    }
}

fn parsed<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var: name, value }),
    }
}

fn flag<F>(var: &F, name: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var: name, value: v }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let c = load(&[("MASTER_USER_ID", "master"), ("MASTER_HASHWORD", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA")]).unwrap();
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.fresh_limit_ms, DEFAULT_FRESH_LIMIT_MS);
        assert!(c.db_path.is_none());
        assert!(!c.fake_secure && !c.fake_authorized);
        assert!(!c.trust_proxy);
        assert_eq!(c.max_id_gap, DEFAULT_MAX_ID_GAP);
        assert_eq!(c.store_path("events"), None);
    }

    #[test]
    fn overrides() {
        let c = load(&[
            ("MASTER_USER_ID", "master"),
            ("MASTER_HASHWORD", "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
            ("PORT", "8080"),
            ("DB_PATH", "/tmp/db"),
            ("FRESH_LIMIT_MS", "1000"),
            ("FAKE_SECURE", "true"),
            ("FAKE_AUTHORIZED", "1"),
            ("MAX_ID_GAP", "50"),
            ("TRUST_PROXY", "yes"),
        ])
        .unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.fresh_limit_ms, 1000);
        assert!(c.fake_secure && c.fake_authorized);
        assert_eq!(c.max_id_gap, 50);
        assert!(c.trust_proxy);
        assert_eq!(c.store_path("auth"), Some(PathBuf::from("/tmp/db-auth.json")));
    }

    #[test]
    fn missing_and_invalid() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("MASTER_USER_ID"))));
        let err = load(&[("MASTER_USER_ID", "m"), ("MASTER_HASHWORD", "h"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
        let err = load(&[("MASTER_USER_ID", "m"), ("MASTER_HASHWORD", "h"), ("FAKE_SECURE", "maybe")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for FAKE_SECURE: 'maybe'");
        let err = load(&[("MASTER_USER_ID", "m"), ("MASTER_HASHWORD", "h"), ("MAX_ID_GAP", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "MAX_ID_GAP", .. }));
    }
}
