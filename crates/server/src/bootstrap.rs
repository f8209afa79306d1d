use std::sync::Arc;

use cartsync_core::config::{AppConfig, ConfigError, LoadOptions};
use cartsync_mcp::assets::FsAssetSource;
use cartsync_store::InMemoryCartStore;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<InMemoryCartStore>,
    pub assets: Arc<FsAssetSource>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState::new(self.store.clone(), self.assets.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    let assets = FsAssetSource::locate(config.assets.dir.as_deref());
    if assets.dir().is_dir() {
        info!(
            event_name = "system.bootstrap.assets_located",
            correlation_id = "bootstrap",
            assets_dir = %assets.dir().display(),
            "widget assets located"
        );
    } else {
        warn!(
            event_name = "system.bootstrap.assets_missing",
            correlation_id = "bootstrap",
            assets_dir = %assets.dir().display(),
            "widget asset directory does not exist; resources/read will fail"
        );
    }

    Application { config, store: Arc::new(InMemoryCartStore::new()), assets: Arc::new(assets) }
}
