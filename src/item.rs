//! Result rows produced by providers and shown in the palette.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// A single row in the result list.
///
/// Identity for deduplication is `(title, subtitle)`; everything else is
/// payload. `provider` records which provider produced the row so hooks and
/// execution can be routed back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Primary display text.
    pub title: String,
    /// Secondary display text, often a path or description.
    #[serde(default)]
    pub subtitle: String,
    /// Icon name or path, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// What happens when the row is executed. `None` means display-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Name of the provider that produced this row.
    pub provider: String,
    /// Provider-specific extras, e.g. a window id or a desktop-entry path.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ResultItem {
    pub fn new(title: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: String::new(),
            icon: None,
            action: None,
            provider: provider.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Deduplication key. Two rows with the same key are the same result,
    /// regardless of which provider produced them.
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.clone(), self.subtitle.clone())
    }
}
