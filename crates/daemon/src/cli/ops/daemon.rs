use std::path::PathBuf;

use clap::Args;

use elfinder_daemon::service_config::ConfigError;
use elfinder_daemon::state::AppState;
use elfinder_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the HTTP port (default from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the log level (default from config)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Directory for log files (default from config, stdout only if unset)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Do not serve volume files, only the connector
    #[arg(long)]
    pub no_serve_volumes: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] elfinder_daemon::state::StateError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        let mut config = ServiceConfig::from_app_config(&state.config)?;
        if let Some(port) = self.port {
            config.listen_addr.set_port(port);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.log_dir.is_some() {
            config.log_dir = self.log_dir.clone();
        }
        if self.no_serve_volumes {
            config.serve_volumes = false;
        }

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
