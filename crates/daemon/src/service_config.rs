use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use common::prelude::{ConnectorOptions, VolumeConfig};

use crate::state::AppConfig;

/// Extra room on top of the upload limit for the non-file form fields.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    // volume configuration
    pub volumes: Vec<VolumeConfig>,
    /// volume opened when the client names no target,
    ///  the first registered volume if not set
    pub default_volume: Option<String>,

    // connector configuration
    pub connector: ConnectorOptions,
    /// upper bound on a single command, the request
    ///  fails with 504 once it is exceeded
    pub request_timeout: Duration,
    /// largest request body the server accepts
    pub body_limit: usize,

    // http server configuration
    pub listen_addr: SocketAddr,
    /// serve volumes with a relative url from this server
    pub serve_volumes: bool,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_app_config(app: &AppConfig) -> Result<Self, ConfigError> {
        let log_level = tracing::Level::from_str(&app.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(app.log_level.clone()))?;
        let upload_bytes = parse_byte_size(&app.upload_max_size)?;

        Ok(Self {
            volumes: app.volumes.clone(),
            default_volume: app.default_volume.clone(),
            connector: ConnectorOptions {
                upload_max_size: app.upload_max_size.clone(),
                disabled: app.disabled.clone(),
            },
            request_timeout: Duration::from_secs(app.request_timeout_secs),
            body_limit: upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], app.port)),
            serve_volumes: app.serve_volumes,
            log_level,
            log_dir: app.log_dir.clone(),
        })
    }
}

/// Parse sizes like `512`, `64K`, `32M` or `2G` (binary multiples).
pub fn parse_byte_size(value: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidSize(value.to_string());
    let trimmed = value.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => {
            let multiplier: usize = match unit.to_ascii_uppercase() {
                'K' => 1 << 10,
                'M' => 1 << 20,
                'G' => 1 << 30,
                _ => return Err(invalid()),
            };
            (&trimmed[..idx], multiplier)
        }
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    digits
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("invalid size: {0}")]
    InvalidSize(String),
}
