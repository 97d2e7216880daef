use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use common::prelude::VolumeConfig;

pub const APP_NAME: &str = "elfinder";
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Directory created by `init` to back the default volume
pub const DEFAULT_VOLUME_DIR_NAME: &str = "home";
pub const DEFAULT_VOLUME_ID: &str = "home";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log level for stdout and file logging
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for rolling log files (stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Largest accepted upload, advertised to the client as `uplMaxSize`
    #[serde(default = "default_upload_max_size")]
    pub upload_max_size: String,
    /// Upper bound on a single connector command
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Serve each volume with a relative url from this daemon
    #[serde(default = "default_serve_volumes")]
    pub serve_volumes: bool,
    /// Commands the client should hide
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Volume opened when the client names no target (first volume if unset)
    #[serde(default)]
    pub default_volume: Option<String>,
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeConfig>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_upload_max_size() -> String {
    common::connector::DEFAULT_UPLOAD_MAX_SIZE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_serve_volumes() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            log_dir: None,
            upload_max_size: default_upload_max_size(),
            request_timeout_secs: default_request_timeout_secs(),
            serve_volumes: default_serve_volumes(),
            disabled: Vec::new(),
            default_volume: None,
            volumes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.elfinder)
    pub dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.elfinder)
    pub fn dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory.
    ///
    /// When the config names no volume, a `home` directory is created
    /// inside the state directory and registered as the only volume.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let dir = Self::dir(custom_path)?;

        if dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&dir)?;

        let mut config = config.unwrap_or_default();
        if config.volumes.is_empty() {
            let volume_dir = dir.join(DEFAULT_VOLUME_DIR_NAME);
            fs::create_dir_all(&volume_dir)?;
            config.volumes.push(VolumeConfig::new(
                DEFAULT_VOLUME_ID,
                volume_dir,
                format!("/files/{}/", DEFAULT_VOLUME_ID),
            ));
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let dir = Self::dir(custom_path)?;

        if !dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            dir,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("elfinder directory not initialized. Run 'elfinderd init' first")]
    NotInitialized,

    #[error("elfinder directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("state");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert_eq!(state.config.volumes.len(), 1);
        assert_eq!(state.config.volumes[0].id, DEFAULT_VOLUME_ID);
        assert!(dir.join(DEFAULT_VOLUME_DIR_NAME).is_dir());

        let loaded = AppState::load(Some(dir.clone())).unwrap();
        assert_eq!(loaded.config.port, 8080);
        assert_eq!(loaded.config.volumes, state.config.volumes);
        assert_eq!(loaded.config.upload_max_size, "32M");

        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
        assert!(matches!(
            AppState::load(Some(temp.path().to_path_buf())),
            Err(StateError::MissingFile(_))
        ));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [[volume]]
            id = "Media"
            path = "/srv/media"
            url = "/media/"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.serve_volumes);
        assert_eq!(config.volumes[0].thumbnails_dir, ".tmb");
        assert!(!config.volumes[0].show_hidden);
    }
}
