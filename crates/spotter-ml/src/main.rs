//! Spotter ML plugin - main entry point.
//!
//! Loads configuration, starts the active-window observer and serves the
//! host until the connection closes.

use std::sync::Arc;

use parking_lot::Mutex;
use spotter_core::{config_path, SpotterConfig};
use spotter_ml::window_history::{self, WindowHistory};
use spotter_ml::{platform, HistoryStore, MlPlugin};
use spotter_plugin_api::Spotter;

// =============================================================================
// Configuration
// =============================================================================

/// Load the config file, falling back to defaults if it cannot be used.
fn load_config() -> SpotterConfig {
    match SpotterConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Ignoring config at {:?}: {}",
                config_path().unwrap_or_default(),
                e
            );
            let mut config = SpotterConfig::default();
            config.apply_env_override(std::env::var(spotter_core::ENDPOINT_ENV_VAR).ok());
            config
        }
    }
}

// =============================================================================
// Main
// =============================================================================

async fn run(config: SpotterConfig) -> Result<(), spotter_plugin_api::SessionError> {
    let store = HistoryStore::new(config.history.resolved_path());
    tracing::info!("History store: {}", store.path().display());

    let windows = Arc::new(Mutex::new(WindowHistory::new(config.history.window_limit)));
    let observer = platform::HAS_WINDOW_OBSERVER.then(|| {
        tokio::spawn(window_history::observe(
            windows.clone(),
            config.history.poll_interval(),
            platform::active_window_title,
        ))
    });

    let spotter = Spotter::new(MlPlugin::new(store, windows), &config);
    let result = spotter.run().await;

    spotter.shutdown();
    if let Some(observer) = observer {
        observer.abort();
    }
    result
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Spotter ML plugin starting...");

    let config = load_config();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Spotter ML plugin stopped");
}
