//! The ML plugin.
//!
//! Every action path the host reports is appended to the history store
//! along with the system uptime and the recently active window titles.
//! Typing `-ml` offers a single option that exports the whole store.

use std::sync::Arc;

use parking_lot::Mutex;
use spotter_plugin_api::{HandlerError, PluginOption, SpotterPlugin};
use sysinfo::System;

use crate::history::{HistoryRecord, HistoryStore};
use crate::platform;
use crate::window_history::WindowHistory;

/// The query that shows the export option.
pub const ML_QUERY: &str = "-ml";

/// Destination for exported history JSON.
pub type Exporter = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

pub struct MlPlugin {
    store: Arc<HistoryStore>,
    windows: Arc<Mutex<WindowHistory>>,
    exporter: Exporter,
}

impl MlPlugin {
    /// Create a plugin exporting through the platform clipboard.
    pub fn new(store: HistoryStore, windows: Arc<Mutex<WindowHistory>>) -> Self {
        Self {
            store: Arc::new(store),
            windows,
            exporter: Arc::new(platform::export_text),
        }
    }

    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }
}

impl SpotterPlugin for MlPlugin {
    fn on_open_spotter(&self) {
        tracing::info!("Spotter opened");
    }

    fn on_global_action_path(&self, action_path: &str) {
        let record = HistoryRecord {
            uptime: System::uptime(),
            active_windows_history: self.windows.lock().snapshot(),
            action_path: action_path.to_string(),
        };

        match self.store.append(record) {
            Ok(count) => tracing::info!("Recorded '{}' ({} records)", action_path, count),
            Err(e) => tracing::error!("Failed to record action path: {}", e),
        }
    }

    fn on_query(&self, query: &str) -> Vec<PluginOption> {
        if query != ML_QUERY {
            return Vec::new();
        }

        // Exported as of this query, like the hint says
        let document = match self.store.load() {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Failed to read history: {}", e);
                return Vec::new();
            }
        };

        let hint = format!("Copy {} recorded actions", document.data.len());
        let document = Arc::new(document);
        let exporter = self.exporter.clone();

        vec![PluginOption::new(ML_QUERY)
            .with_hint(hint)
            .with_action(move || {
                let document = document.clone();
                let exporter = exporter.clone();
                async move {
                    let json = serde_json::to_string(&*document)?;
                    exporter(&json)?;
                    tracing::info!("Exported {} recorded actions", document.data.len());
                    Ok::<bool, HandlerError>(true)
                }
            })]
    }
}
