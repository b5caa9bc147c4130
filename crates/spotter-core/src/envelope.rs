//! Envelopes exchanged with the host.
//!
//! ## Host → Plugin
//!
//! ```text
//! { id, type, query?, actionId?, onQueryId?, mlGlobalActionPath? }
//! ```
//!
//! `type` selects the [`HostRequest`] variant. Fields a variant does not use
//! are ignored, fields it does use default to empty when absent.
//!
//! ## Plugin → Host
//!
//! ```text
//! { id, options, complete, mlGlobalActionPath? }
//! ```
//!
//! Responses carry the id of the request they answer. The unsolicited
//! suggestion push is sent with an empty id and only `mlGlobalActionPath`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::option::MappedOption;

// =============================================================================
// Host Requests
// =============================================================================

/// A request sent by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostRequest {
    /// Top-level query typed by the user.
    #[serde(rename = "onQuery")]
    Query {
        #[serde(default)]
        id: String,
        #[serde(default)]
        query: String,
    },

    /// Query typed inside an option that carries a query callback.
    #[serde(rename = "onOptionQuery", rename_all = "camelCase")]
    OptionQuery {
        #[serde(default)]
        id: String,
        #[serde(default)]
        on_query_id: String,
        #[serde(default)]
        query: String,
    },

    /// The user ran an option that carries an action callback.
    #[serde(rename = "execAction", rename_all = "camelCase")]
    ExecAction {
        #[serde(default)]
        id: String,
        #[serde(default)]
        action_id: String,
    },

    /// Fire-and-forget notification of the action path the user took.
    #[serde(rename = "mlOnGlobalActionPath", rename_all = "camelCase")]
    GlobalActionPath {
        #[serde(default)]
        id: String,
        #[serde(default)]
        ml_global_action_path: Option<String>,
    },

    /// The host window was opened.
    #[serde(rename = "onOpenSpotter")]
    OpenSpotter {
        #[serde(default)]
        id: String,
    },
}

impl HostRequest {
    /// The request id used to correlate the response.
    pub fn id(&self) -> &str {
        match self {
            Self::Query { id, .. }
            | Self::OptionQuery { id, .. }
            | Self::ExecAction { id, .. }
            | Self::GlobalActionPath { id, .. }
            | Self::OpenSpotter { id } => id,
        }
    }

    /// The request kind, for logging.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Query { .. } => RequestKind::Query,
            Self::OptionQuery { .. } => RequestKind::OptionQuery,
            Self::ExecAction { .. } => RequestKind::ExecAction,
            Self::GlobalActionPath { .. } => RequestKind::GlobalActionPath,
            Self::OpenSpotter { .. } => RequestKind::OpenSpotter,
        }
    }
}

/// Discriminant of [`HostRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Query,
    OptionQuery,
    ExecAction,
    GlobalActionPath,
    OpenSpotter,
}

impl RequestKind {
    /// The wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "onQuery",
            Self::OptionQuery => "onOptionQuery",
            Self::ExecAction => "execAction",
            Self::GlobalActionPath => "mlOnGlobalActionPath",
            Self::OpenSpotter => "onOpenSpotter",
        }
    }

    /// Whether the host waits for a response to this kind.
    pub fn expects_response(&self) -> bool {
        !matches!(self, Self::GlobalActionPath | Self::OpenSpotter)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Plugin Messages
// =============================================================================

/// A message sent by the plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMessage {
    /// Id of the request this answers. Empty for suggestions.
    pub id: String,

    /// Options to present.
    #[serde(default)]
    pub options: Vec<MappedOption>,

    /// Whether the interaction is finished.
    #[serde(default)]
    pub complete: bool,

    /// Suggested action path, set only on suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_global_action_path: Option<String>,
}

impl PluginMessage {
    /// A response presenting further options. Never complete.
    pub fn options(id: impl Into<String>, options: Vec<MappedOption>) -> Self {
        Self {
            id: id.into(),
            options,
            complete: false,
            ml_global_action_path: None,
        }
    }

    /// A response with no options that closes (or keeps open) the interaction.
    pub fn completed(id: impl Into<String>, complete: bool) -> Self {
        Self {
            id: id.into(),
            options: Vec::new(),
            complete,
            ml_global_action_path: None,
        }
    }

    /// The response sent when a request cannot be served.
    ///
    /// From the host's point of view the interaction produced nothing and
    /// is finished.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::completed(id, true)
    }

    /// The unsolicited action path suggestion.
    pub fn suggestion(action_path: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            options: Vec::new(),
            complete: false,
            ml_global_action_path: Some(action_path.into()),
        }
    }

    /// True if this is a suggestion rather than a response.
    pub fn is_suggestion(&self) -> bool {
        self.ml_global_action_path.is_some()
    }
}
