//! Server settings read from the environment.

use crate::service::{AuthSettings, Secret, DEFAULT_MAX_ID_GAP};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FRESH_LIMIT_MS: i64 = 300_000;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// Base path for the JSON file stores; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub master_user_id: String,
    pub master_hashword: Secret,
    pub fresh_limit_ms: i64,
    /// Treat every request as arriving over TLS.
    pub fake_secure: bool,
    /// Skip the auth check and always resume.
    pub fake_authorized: bool,
    pub body_limit_bytes: usize,
    /// Largest run of missing ids a bulk replace may tombstone.
    pub max_id_gap: i64,
    /// Honour `X-Forwarded-Proto`; only safe behind a proxy that sets it.
    pub trust_proxy: bool,
}

impl ServerConfig {
    /// In-memory config with defaults; used by tests and embedders.
    pub fn new(master_user_id: impl Into<String>, master_hashword: impl Into<String>) -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: None,
            master_user_id: master_user_id.into(),
            master_hashword: Secret::new(master_hashword),
            fresh_limit_ms: DEFAULT_FRESH_LIMIT_MS,
            fake_secure: false,
            fake_authorized: false,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            max_id_gap: DEFAULT_MAX_ID_GAP,
            trust_proxy: false,
        }
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            master_user_id: self.master_user_id.clone(),
            master_hashword: self.master_hashword.clone(),
            fresh_limit_ms: self.fresh_limit_ms,
        }
    }

    /// `<db_path>-<table>.json`, when file storage is configured.
    pub fn store_path(&self, table: &str) -> Option<PathBuf> {
        self.db_path.as_ref().map(|base| {
            let mut name = base.as_os_str().to_os_string();
            name.push(format!("-{}.json", table));
            PathBuf::from(name)
        })
    }
}
