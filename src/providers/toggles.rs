//! System toggles: a fixed set of settings flipped by shell one-liners.
//!
//! The `wifi` trigger doubles as a verb namespace, so `wifi scan` reaches
//! this provider with the fragment `scan` and finds the rescan entry the
//! same way `toggle wifi` finds the radio entry.

use std::time::Duration;

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use super::{run_command, Provider, ProviderError};
use crate::action::Action;
use crate::item::ResultItem;

const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SystemToggle {
    pub name: String,
    pub label: String,
    pub icon: String,
    pub command: String,
}

impl SystemToggle {
    fn new(name: &str, label: &str, icon: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            command: command.to_string(),
        }
    }

    fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "wifi",
                "Toggle Wi-Fi",
                "network-wireless",
                "rfkill toggle wifi",
            ),
            Self::new(
                "scan",
                "Wi-Fi scan",
                "network-wireless",
                "nmcli device wifi rescan",
            ),
            Self::new(
                "bluetooth",
                "Toggle Bluetooth",
                "bluetooth",
                "rfkill toggle bluetooth",
            ),
            Self::new(
                "mute",
                "Toggle mute",
                "audio-volume-muted",
                "pactl set-sink-mute @DEFAULT_SINK@ toggle",
            ),
            Self::new(
                "mic",
                "Toggle microphone",
                "microphone-sensitivity-muted",
                "pactl set-source-mute @DEFAULT_SOURCE@ toggle",
            ),
            Self::new(
                "dnd",
                "Toggle do not disturb",
                "notifications-disabled",
                "dunstctl set-paused toggle",
            ),
        ]
    }
}

pub struct TogglesProvider {
    toggles: Vec<SystemToggle>,
}

impl Default for TogglesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TogglesProvider {
    pub fn new() -> Self {
        Self {
            toggles: SystemToggle::defaults(),
        }
    }

    pub fn with_toggles(toggles: Vec<SystemToggle>) -> Self {
        Self { toggles }
    }

    fn to_item(&self, toggle: &SystemToggle) -> ResultItem {
        ResultItem::new(&toggle.label, self.name())
            .with_subtitle(&toggle.command)
            .with_icon(&toggle.icon)
            .with_action(Action::Toggle {
                setting: toggle.name.clone(),
            })
    }
}

#[async_trait]
impl Provider for TogglesProvider {
    fn name(&self) -> &'static str {
        "toggles"
    }

    fn triggers(&self) -> &[&'static str] {
        &["toggle", "wifi"]
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.toggles.iter().map(|t| self.to_item(t)).collect());
        }

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<(&SystemToggle, i64)> = self
            .toggles
            .iter()
            .filter_map(|toggle| {
                let name_score = matcher.fuzzy_match(&toggle.name, query);
                let label_score = matcher.fuzzy_match(&toggle.label, query);
                name_score.max(label_score).map(|score| (toggle, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(scored
            .into_iter()
            .map(|(toggle, _)| self.to_item(toggle))
            .collect())
    }

    fn handles_execution(&self) -> bool {
        true
    }

    async fn execute(&self, item: &ResultItem) -> Result<(), ProviderError> {
        let Some(Action::Toggle { setting }) = &item.action else {
            return Err(ProviderError::Invalid(
                "item carries no toggle action".to_string(),
            ));
        };

        let toggle = self
            .toggles
            .iter()
            .find(|t| &t.name == setting)
            .ok_or_else(|| ProviderError::Invalid(format!("unknown toggle '{setting}'")))?;

        let argv = vec!["sh".to_string(), "-c".to_string(), toggle.command.clone()];
        let output = run_command(&argv, COMMAND_TIMEOUT).await?;
        if !output.status.success() {
            return Err(ProviderError::CommandFailed(format!(
                "'{}' exited with {}",
                toggle.command, output.status
            )));
        }
        debug!("Toggled {}", setting);
        Ok(())
    }
}
