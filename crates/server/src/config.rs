//! Server configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (`FARMSTEAD_ADDR`, default `127.0.0.1:4000`).
    pub addr: SocketAddr,
    /// SQLite database path (`FARMSTEAD_DB`); in-memory when unset.
    pub db_path: Option<PathBuf>,
    /// HS256 signing secret (`FARMSTEAD_JWT_SECRET`).
    pub jwt_secret: String,
    /// Token lifetime in seconds (`FARMSTEAD_TOKEN_TTL_SECS`, default 86400).
    pub token_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            db_path: None,
            jwt_secret: "farmstead-dev-secret".to_string(),
            token_ttl_secs: 86_400,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env::var("FARMSTEAD_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.addr),
            db_path: env::var("FARMSTEAD_DB").ok().map(PathBuf::from),
            jwt_secret: env::var("FARMSTEAD_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_secs: env::var("FARMSTEAD_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_ttl_secs),
        }
    }
}
