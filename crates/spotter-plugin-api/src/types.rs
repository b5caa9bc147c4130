//! Option types built by plugins.
//!
//! A [`PluginOption`] is what plugin code produces: display fields plus at
//! most one local callback. The callback never crosses the wire; the
//! registry swaps it for a handler id when the option is mapped into a
//! [`MappedOption`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::HandlerResult;
use spotter_core::MappedOption;

// =============================================================================
// Callbacks
// =============================================================================

/// Action callback: runs with no arguments.
pub type ActionHandler =
    Arc<dyn Fn() -> BoxFuture<'static, HandlerResult<OptionOutcome>> + Send + Sync>;

/// Query callback: runs with the text typed inside the option.
pub type QueryHandler =
    Arc<dyn Fn(String) -> BoxFuture<'static, HandlerResult<OptionOutcome>> + Send + Sync>;

/// The callback attached to an option.
#[derive(Clone)]
pub enum OptionCallback {
    Action(ActionHandler),
    Query(QueryHandler),
}

impl fmt::Debug for OptionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Action(..)"),
            Self::Query(_) => f.write_str("Query(..)"),
        }
    }
}

/// What an option callback resolved to.
///
/// A boolean closes the interaction (success or failure). A list, even an
/// empty one, is a further set of options to present. The two never mix.
#[derive(Debug, Clone)]
pub enum OptionOutcome {
    Complete(bool),
    Options(Vec<PluginOption>),
}

impl From<bool> for OptionOutcome {
    fn from(done: bool) -> Self {
        Self::Complete(done)
    }
}

impl From<Vec<PluginOption>> for OptionOutcome {
    fn from(options: Vec<PluginOption>) -> Self {
        Self::Options(options)
    }
}

// =============================================================================
// Plugin Option
// =============================================================================

/// A presentable result item, possibly interactive.
#[derive(Clone)]
pub struct PluginOption {
    /// Primary display text.
    pub name: String,

    /// Secondary display text.
    pub hint: Option<String>,

    /// Icon reference.
    pub icon: Option<String>,

    pub is_hovered: Option<bool>,

    /// Sort priority, higher first.
    pub priority: Option<f64>,

    pub important: Option<bool>,

    /// Local callback, if the option is interactive.
    pub callback: Option<OptionCallback>,
}

impl PluginOption {
    /// Create a non-interactive option. Any displayable value becomes the name.
    pub fn new(name: impl fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            hint: None,
            icon: None,
            is_hovered: None,
            priority: None,
            important: None,
            callback: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn hovered(mut self, hovered: bool) -> Self {
        self.is_hovered = Some(hovered);
        self
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = Some(important);
        self
    }

    /// Attach an action callback, replacing any existing callback.
    ///
    /// The callback may resolve to `bool` or `Vec<PluginOption>`.
    pub fn with_action<F, Fut, O>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<O>> + Send + 'static,
        O: Into<OptionOutcome>,
    {
        let handler: ActionHandler = Arc::new(move || {
            action()
                .map(|result| result.map(Into::<OptionOutcome>::into))
                .boxed()
        });
        self.callback = Some(OptionCallback::Action(handler));
        self
    }

    /// Attach a query callback, replacing any existing callback.
    ///
    /// The callback may resolve to `Vec<PluginOption>` or `bool`.
    pub fn with_query<F, Fut, O>(mut self, query: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<O>> + Send + 'static,
        O: Into<OptionOutcome>,
    {
        let handler: QueryHandler = Arc::new(move |text| {
            query(text)
                .map(|result| result.map(Into::<OptionOutcome>::into))
                .boxed()
        });
        self.callback = Some(OptionCallback::Query(handler));
        self
    }

    pub fn has_action(&self) -> bool {
        matches!(self.callback, Some(OptionCallback::Action(_)))
    }

    pub fn has_query(&self) -> bool {
        matches!(self.callback, Some(OptionCallback::Query(_)))
    }

    /// Split into the wire display fields (without ids) and the callback.
    pub fn into_parts(self) -> (MappedOption, Option<OptionCallback>) {
        let mapped = MappedOption {
            name: self.name,
            hint: self.hint,
            icon: self.icon,
            action_id: None,
            on_query_id: None,
            is_hovered: self.is_hovered,
            priority: self.priority,
            important: self.important,
        };
        (mapped, self.callback)
    }
}

impl fmt::Debug for PluginOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOption")
            .field("name", &self.name)
            .field("hint", &self.hint)
            .field("icon", &self.icon)
            .field("priority", &self.priority)
            .field("callback", &self.callback)
            .finish()
    }
}
