//! The plugin runtime.
//!
//! [`Spotter`] is the one long-lived instance a plugin process builds at
//! startup. It owns the session, the handler registry and the outbox, and
//! drives the dispatcher for the lifetime of the connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::dispatcher::Dispatcher;
use crate::error::SessionError;
use crate::plugin::SpotterPlugin;
use crate::registry::HandlerRegistry;
use crate::session::{Connection, Outbox, Session, SessionState};
use spotter_core::SpotterConfig;

/// Owns a plugin and its connection to the host.
pub struct Spotter {
    plugin: Arc<dyn SpotterPlugin>,
    registry: Arc<HandlerRegistry>,
    outbox: Outbox,
    session: Session,
    handler_timeout: Option<Duration>,
}

impl Spotter {
    pub fn new(plugin: impl SpotterPlugin, config: &SpotterConfig) -> Self {
        Self::with_outbox(plugin, config, Outbox::new())
    }

    /// Build around an outbox the plugin already holds a clone of, so the
    /// plugin can push suggestions on its own.
    pub fn with_outbox(plugin: impl SpotterPlugin, config: &SpotterConfig, outbox: Outbox) -> Self {
        Self {
            plugin: Arc::new(plugin),
            registry: Arc::new(HandlerRegistry::with_retained_generations(
                config.retained_generations,
            )),
            outbox,
            session: Session::new(config.endpoint.clone(), config.connect_timeout()),
            handler_timeout: config.handler_timeout(),
        }
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Push an action path suggestion to the host. Dropped when not connected.
    pub fn suggest(&self, action_path: impl Into<String>) -> bool {
        self.outbox.suggest(action_path)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect to the host and serve until the connection closes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailed`] if the connection cannot be
    /// established. There is no retry.
    pub async fn run(&self) -> Result<(), SessionError> {
        let connection = self.session.connect().await?;
        self.serve(connection).await;
        Ok(())
    }

    /// Serve an established connection until its inbound side closes.
    pub async fn serve(&self, connection: Connection) {
        let (tx, inbound) = connection.into_parts();
        self.outbox.attach(tx);

        let dispatcher = Dispatcher::new(
            self.plugin.clone(),
            self.registry.clone(),
            self.outbox.clone(),
        )
        .with_handler_timeout(self.handler_timeout);

        tracing::info!("Serving host requests");
        dispatcher.run(inbound).await;

        self.outbox.detach();
        tracing::info!("Host session ended");
    }

    /// Drop every registered handler and close the transport.
    pub fn shutdown(&self) {
        self.registry.flush();
        self.outbox.detach();
        tracing::info!("Spotter shut down");
    }
}
