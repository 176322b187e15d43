use serde::{Deserialize, Serialize};

/// User preferences persisted next to the chat documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Last character the user chatted with.
    #[serde(default)]
    pub preferred_character: Option<String>,
}
