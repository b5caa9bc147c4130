//! Wire form of a presentable option.

use serde::{Deserialize, Serialize};

/// An option as it crosses the wire.
///
/// Callbacks never leave the plugin process. An option carrying an action
/// is sent with `action_id`, one carrying a query with `on_query_id`, and the
/// host refers back to the callback by that id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedOption {
    /// Primary display text.
    pub name: String,

    /// Secondary display text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Icon reference (path or named icon).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Handler id of the attached action callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,

    /// Handler id of the attached query callback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_query_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hovered: Option<bool>,

    /// Sort priority, higher first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<bool>,
}

impl MappedOption {
    /// Create a mapped option with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True if the host can run or query into this option.
    pub fn is_interactive(&self) -> bool {
        self.action_id.is_some() || self.on_query_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_omitted() {
        let option = MappedOption::new("-ml");
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "-ml" }));
        assert!(!option.is_interactive());
    }

    #[test]
    fn test_camel_case_field_names() {
        let option = MappedOption {
            name: "Open".to_string(),
            action_id: Some("abc".to_string()),
            is_hovered: Some(true),
            ..MappedOption::default()
        };

        insta::assert_json_snapshot!(option, @r###"
        {
          "name": "Open",
          "actionId": "abc",
          "isHovered": true
        }
        "###);
    }
}
