//! Server configuration from environment variables

use std::env;
use std::path::PathBuf;

use gather_core::{Error, Result};

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default allowed CORS origin (local frontend dev server)
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Port the HTTP API listens on
    pub http_port: u16,
    /// Port the realtime relay listens on
    pub relay_port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `GATHER_DB` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        let db_path = env::var("GATHER_DB")
            .map(PathBuf::from)
            .map_err(|_| Error::Validation("GATHER_DB must be set".to_string()))?;

        let http_port = parse_port("GATHER_PORT", DEFAULT_HTTP_PORT)?;
        let relay_port = parse_port("GATHER_RELAY_PORT", gather_net::DEFAULT_RELAY_PORT)?;

        let allowed_origins = match env::var("GATHER_ALLOWED_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        };

        Ok(Config {
            db_path,
            http_port,
            relay_port,
            allowed_origins,
        })
    }
}

fn parse_port(var: &str, default: u16) -> Result<u16> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Validation(format!("{var} is not a valid port: {raw}"))),
        Err(_) => Ok(default),
    }
}
