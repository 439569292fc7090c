//! Action model for launchable results.
//!
//! An [`Action`] is an inert, serializable description of what happens when a
//! result is chosen. Variants carry only primitive fields so an action can
//! cross the presentation boundary as JSON without losing information.

use serde::{Deserialize, Serialize};

/// What executing a result does.
///
/// The `type` tag is part of the wire format; [`Action::kind`] returns the
/// same tag for an in-memory value so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Run a shell command as a detached child process.
    Shell {
        /// Full command line, passed to `sh -c`.
        command: String,
    },
    /// Open a file or URL with the desktop opener.
    Open {
        /// Path or URL to open.
        target: String,
    },
    /// Flip a named system setting.
    Toggle {
        /// Setting identifier, e.g. `wifi` or `dark-mode`.
        setting: String,
    },
    /// Schedule a named timer.
    Timer {
        duration_secs: u64,
        label: String,
    },
}

impl Action {
    /// The serde tag for this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Shell { .. } => "shell",
            Action::Open { .. } => "open",
            Action::Toggle { .. } => "toggle",
            Action::Timer { .. } => "timer",
        }
    }

    /// Whether the router can realize this action by spawning a process.
    ///
    /// `Toggle` and `Timer` are only meaningful to the provider that produced
    /// them; the router reports them as unsupported unless that provider
    /// handles execution itself.
    pub fn is_spawnable(&self) -> bool {
        matches!(self, Action::Shell { .. } | Action::Open { .. })
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Shell { command } => write!(f, "shell: {command}"),
            Action::Open { target } => write!(f, "open: {target}"),
            Action::Toggle { setting } => write!(f, "toggle: {setting}"),
            Action::Timer {
                duration_secs,
                label,
            } => write!(f, "timer: {label} ({duration_secs}s)"),
        }
    }
}
