//! Configuration module for the catalog backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory cover images are stored in and served from
    pub media_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Allowed browser origin; any origin when unset
    pub cors_origin: Option<String>,
    /// Upload limit for cover images, in bytes
    pub max_cover_bytes: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Problems found while loading, logged once tracing is initialized
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("CATALOG_DB_PATH")
            .unwrap_or_else(|_| "./data/catalog.sqlite".to_string())
            .into();

        let media_dir = env::var("CATALOG_MEDIA_DIR")
            .unwrap_or_else(|_| "./data/media".to_string())
            .into();

        let mut warnings = Vec::new();

        let bind_addr = bind_addr_from(env::var("CATALOG_BIND_ADDR").ok(), &mut warnings);

        let cors_origin = env::var("CATALOG_CORS_ORIGIN")
            .ok()
            .filter(|origin| !origin.trim().is_empty());

        let max_cover_bytes = env::var("CATALOG_MAX_COVER_BYTES")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_COVER_BYTES);

        let log_level = env::var("CATALOG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            media_dir,
            bind_addr,
            cors_origin,
            max_cover_bytes,
            log_level,
            warnings,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

/// Parse a bind address, falling back to the default and recording why.
fn bind_addr_from(raw: Option<String>, warnings: &mut Vec<String>) -> SocketAddr {
    let Some(raw) = raw else {
        return default_bind_addr();
    };
    match raw.trim().parse() {
        Ok(addr) => addr,
        Err(e) => {
            let fallback = default_bind_addr();
            warnings.push(format!(
                "Invalid CATALOG_BIND_ADDR {:?} ({}), using {}",
                raw, e, fallback
            ));
            fallback
        }
    }
}
