//! Spotter ML plugin.
//!
//! Records the path of every action the user takes in Spotter, together with
//! the applications that were recently active, so the history can be
//! exported for training.

pub mod error;
pub mod history;
pub mod platform;
pub mod plugin;
pub mod window_history;

pub use error::HistoryError;
pub use history::{HistoryDocument, HistoryRecord, HistoryStore};
pub use plugin::{Exporter, MlPlugin, ML_QUERY};
pub use window_history::WindowHistory;
