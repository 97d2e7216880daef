use std::path::PathBuf;

use clap::Args;

use common::prelude::VolumeConfig;
use elfinder_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// HTTP port the daemon listens on
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Existing directory to expose as the first volume
    /// (defaults to a `home` directory inside the config directory)
    #[arg(long)]
    pub volume: Option<PathBuf>,

    /// Id of the volume given with --volume
    #[arg(long, default_value = "home", requires = "volume")]
    pub volume_id: String,

    /// Public url prefix of the volume given with --volume
    #[arg(long, requires = "volume")]
    pub volume_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),

    #[error("volume path could not be resolved: {0}")]
    VolumePath(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            port: self.port,
            ..AppConfig::default()
        };

        if let Some(path) = &self.volume {
            let url = self
                .volume_url
                .clone()
                .unwrap_or_else(|| format!("/files/{}/", self.volume_id));
            config.volumes.push(VolumeConfig::new(
                self.volume_id.clone(),
                std::fs::canonicalize(path)?,
                url,
            ));
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let mut output = format!(
            "Initialized elfinder directory at: {}\n\
             - Config: {}\n\
             - Port: {}",
            state.dir.display(),
            state.config_path.display(),
            state.config.port,
        );
        for volume in &state.config.volumes {
            output.push_str(&format!(
                "\n- Volume '{}': {} (served at {})",
                volume.id,
                volume.path.display(),
                volume.url
            ));
        }

        Ok(output)
    }
}
