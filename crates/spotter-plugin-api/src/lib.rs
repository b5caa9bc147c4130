//! Protocol engine for Spotter plugins.
//!
//! This crate connects a plugin process to the Spotter host:
//! - JSON wire codec for host requests and plugin responses
//! - WebSocket transport session with a best-effort outbox
//! - Handler registry mapping option callbacks to handler ids, by generation
//! - Dispatcher routing each host request to a hook or callback
//! - The `SpotterPlugin` trait and the `Spotter` runtime that drives it

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use codec::JsonCodec;
pub use dispatcher::Dispatcher;
pub use error::{
    CodecError, HandlerError, HandlerKind, HandlerResult, RegistryError, SessionError,
};
pub use plugin::SpotterPlugin;
pub use registry::{GenerationContext, GenerationId, HandlerRegistry, DEFAULT_RETAINED_GENERATIONS};
pub use runtime::Spotter;
pub use session::{Connection, LoopbackHost, Outbox, Session, SessionState};
pub use types::{ActionHandler, OptionCallback, OptionOutcome, PluginOption, QueryHandler};

// Re-export spotter_core types for convenience
pub use spotter_core::{HostRequest, MappedOption, PluginMessage, RequestKind, SpotterConfig};
