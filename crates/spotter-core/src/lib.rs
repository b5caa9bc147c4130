//! Core types for Spotter plugins.
//!
//! This crate contains shared data structures used across all Spotter crates:
//! - Wire envelopes exchanged with the host
//! - The wire projection of options (`MappedOption`)
//! - Configuration types
//! - Error types

mod config;
mod envelope;
mod error;
mod option;

pub use config::{
    config_dir, config_path, data_dir, HistoryConfig, SpotterConfig, DEFAULT_ENDPOINT,
    ENDPOINT_ENV_VAR,
};
pub use envelope::{HostRequest, PluginMessage, RequestKind};
pub use error::ConfigError;
pub use option::MappedOption;
