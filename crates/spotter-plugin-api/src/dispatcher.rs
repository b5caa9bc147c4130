//! Dispatcher
//!
//! The protocol state machine. Each inbound envelope is handled on its own
//! and answered at most once:
//!
//! | Request                | Runs                                  | Response                    |
//! |------------------------|---------------------------------------|-----------------------------|
//! | `onOpenSpotter`        | `on_open_spotter()`                   | none                        |
//! | `mlOnGlobalActionPath` | `on_global_action_path(path)` if any  | none                        |
//! | `onQuery`              | `on_query(query)`                     | mapped options, incomplete  |
//! | `execAction`           | action callback `actionId`            | by outcome                  |
//! | `onOptionQuery`        | query callback `onQueryId`            | by outcome                  |
//!
//! A callback outcome of `bool` answers with no options and
//! `complete = bool`; a list answers with the mapped options and
//! `complete = false`.
//!
//! ## Failure containment
//!
//! Nothing that goes wrong inside one request leaves the host waiting or
//! stops the loop. Unknown handler ids, callback errors, panics and
//! timeouts all answer with an empty, complete response. Undecodable
//! payloads are logged and dropped.
//!
//! ## Concurrency
//!
//! One task runs the loop. Every envelope becomes a future in a
//! `FuturesUnordered`, so a suspended callback does not hold up the next
//! envelope and responses may leave out of request order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;

use crate::codec::JsonCodec;
use crate::error::{HandlerError, HandlerResult};
use crate::plugin::SpotterPlugin;
use crate::registry::{GenerationContext, HandlerRegistry};
use crate::session::Outbox;
use crate::types::OptionOutcome;
use spotter_core::{HostRequest, PluginMessage};

/// Routes host requests to plugin hooks and option callbacks.
pub struct Dispatcher {
    plugin: Arc<dyn SpotterPlugin>,
    registry: Arc<HandlerRegistry>,
    outbox: Outbox,
    handler_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher with no handler timeout.
    pub fn new(
        plugin: Arc<dyn SpotterPlugin>,
        registry: Arc<HandlerRegistry>,
        outbox: Outbox,
    ) -> Self {
        Self {
            plugin,
            registry,
            outbox,
            handler_timeout: None,
        }
    }

    /// Bound how long an option callback may suspend.
    ///
    /// Without a timeout a callback that never resolves leaves its request
    /// unanswered.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    // =========================================================================
    // Event Loop
    // =========================================================================

    /// Serve inbound payloads until the channel closes.
    ///
    /// Requests still in flight when the connection goes away are
    /// abandoned; there is no one left to answer.
    pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<Vec<u8>>) {
        let mut in_flight: FuturesUnordered<BoxFuture<'_, Option<PluginMessage>>> =
            FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;

                Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Some(response) = response {
                        self.outbox.send(&response);
                    }
                }
                payload = inbound.recv() => match payload {
                    Some(bytes) => {
                        if let Some(request) = self.decode(&bytes) {
                            in_flight.push(self.dispatch(request).boxed());
                        }
                    }
                    None => break,
                },
            }
        }

        if !in_flight.is_empty() {
            tracing::warn!(
                "Connection closed with {} requests in flight",
                in_flight.len()
            );
        }
    }

    /// Decode a payload, logging and dropping it if malformed.
    pub fn decode(&self, bytes: &[u8]) -> Option<HostRequest> {
        match JsonCodec::decode(bytes) {
            Ok(request) => Some(request),
            Err(e) => {
                tracing::warn!(
                    "Dropping message ({} bytes): {}",
                    bytes.len(),
                    e
                );
                None
            }
        }
    }

    // =========================================================================
    // Request Handling
    // =========================================================================

    /// Handle one request and produce its response, if it has one.
    ///
    /// Never panics: a panicking hook is logged and, where the host expects
    /// an answer, answered with an empty complete response.
    pub async fn dispatch(&self, request: HostRequest) -> Option<PluginMessage> {
        let id = request.id().to_string();
        let kind = request.kind();
        tracing::debug!("Handling {} '{}'", kind, id);

        match AssertUnwindSafe(self.handle(request)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                tracing::error!("{} hook panicked: {}", kind, panic_message(&panic));
                kind.expects_response().then(|| PluginMessage::empty(id))
            }
        }
    }

    async fn handle(&self, request: HostRequest) -> Option<PluginMessage> {
        match request {
            HostRequest::OpenSpotter { .. } => {
                self.plugin.on_open_spotter();
                None
            }
            HostRequest::GlobalActionPath {
                ml_global_action_path,
                ..
            } => {
                match ml_global_action_path.filter(|path| !path.is_empty()) {
                    Some(action_path) => self.plugin.on_global_action_path(&action_path),
                    None => tracing::debug!("Ignoring empty action path"),
                }
                None
            }
            HostRequest::Query { id, query } => {
                let options = self.plugin.on_query(&query);
                let mapped = self.registry.map_options(GenerationContext::Root, options);
                Some(PluginMessage::options(id, mapped))
            }
            HostRequest::ExecAction { id, action_id } => {
                let action = match self.registry.resolve_action(&action_id) {
                    Ok(action) => action,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        return Some(PluginMessage::empty(id));
                    }
                };
                let result = self.settle(action()).await;
                Some(self.respond(id, GenerationContext::Handler(action_id), result))
            }
            HostRequest::OptionQuery {
                id,
                on_query_id,
                query,
            } => {
                let callback = match self.registry.resolve_query(&on_query_id) {
                    Ok(callback) => callback,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        return Some(PluginMessage::empty(id));
                    }
                };
                let result = self.settle(callback(query)).await;
                Some(self.respond(id, GenerationContext::Handler(on_query_id), result))
            }
        }
    }

    /// Await a callback, converting panics and timeouts into errors.
    async fn settle(
        &self,
        callback: BoxFuture<'static, HandlerResult<OptionOutcome>>,
    ) -> HandlerResult<OptionOutcome> {
        let guarded = AssertUnwindSafe(callback).catch_unwind().map(|result| {
            result.unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&panic))))
        });

        match self.handler_timeout {
            Some(timeout) => tokio::time::timeout(timeout, guarded)
                .await
                .unwrap_or(Err(HandlerError::TimedOut(timeout))),
            None => guarded.await,
        }
    }

    /// Turn a callback result into the response for request `id`.
    fn respond(
        &self,
        id: String,
        context: GenerationContext,
        result: HandlerResult<OptionOutcome>,
    ) -> PluginMessage {
        match result {
            Ok(OptionOutcome::Complete(done)) => PluginMessage::completed(id, done),
            Ok(OptionOutcome::Options(options)) => {
                let mapped = self.registry.map_options(context, options);
                PluginMessage::options(id, mapped)
            }
            Err(e) => {
                tracing::error!("Handler for request '{}' failed: {}", id, e);
                PluginMessage::empty(id)
            }
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
