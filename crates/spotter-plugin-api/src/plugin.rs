//! The plugin surface.
//!
//! Implement [`SpotterPlugin`] and hand it to [`crate::Spotter`]. Every hook
//! has a no-op default, so a plugin only overrides what it needs. Interactive
//! behavior beyond the top-level query lives in the callbacks attached to the
//! returned [`PluginOption`]s.

use crate::types::PluginOption;

/// Hooks invoked by the dispatcher for host requests.
///
/// Hooks run on the dispatcher loop and must not block for long. Slow work
/// belongs in option callbacks, which may suspend.
#[cfg_attr(test, mockall::automock)]
pub trait SpotterPlugin: Send + Sync + 'static {
    /// The host window was opened.
    fn on_open_spotter(&self) {}

    /// The host reported the action path the user took.
    fn on_global_action_path(&self, _action_path: &str) {}

    /// Top-level query. The returned options become a new root result set.
    fn on_query(&self, _query: &str) -> Vec<PluginOption> {
        Vec::new()
    }
}
