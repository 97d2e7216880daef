use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::prelude::{Connector, RegistryError, VolumeRegistry};

use super::service_config::Config;

/// Main service state, shared by every request handler
#[derive(Clone)]
pub struct State {
    connector: Arc<Connector>,
    request_timeout: Duration,
    shutting_down: Arc<AtomicBool>,
}

impl State {
    pub fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let registry = VolumeRegistry::new(
            config.volumes.clone(),
            config.default_volume.as_deref(),
        )?;

        for volume in registry.list() {
            tracing::info!(
                volume = %volume.id(),
                base_dir = %volume.base_dir().display(),
                url = %volume.url(),
                "serving volume"
            );
        }

        let connector = Connector::with_options(Arc::new(registry), config.connector.clone());

        Ok(Self {
            connector: Arc::new(connector),
            request_timeout: config.request_timeout,
            shutting_down: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn connector(&self) -> &Arc<Connector> {
        &self.connector
    }

    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        self.connector.registry()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Flag the service as draining; readiness checks fail from here on.
    pub fn mark_shutting_down(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("volume setup failed: {0}")]
    Registry(#[from] RegistryError),
}
