//! Switch between open windows.
//!
//! Lists windows by shelling out to the window manager's listing tool
//! (`wmctrl -l` by default) and activates the chosen window the same way.
//! Both commands are injectable so tests can stand in shell one-liners, and
//! both are bounded by a short timeout: a hung window manager must degrade
//! this provider, not stall the whole pipeline.

use std::time::Duration;

use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use super::{run_command, Provider, ProviderError};
use crate::item::ResultItem;

const COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Metadata key carrying the window id from populate to execute.
pub const WINDOW_ID_KEY: &str = "window_id";

pub struct WindowsProvider {
    list_command: Vec<String>,
    activate_command: Vec<String>,
}

impl Default for WindowsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsProvider {
    pub fn new() -> Self {
        Self {
            list_command: vec!["wmctrl".into(), "-l".into()],
            activate_command: vec!["wmctrl".into(), "-i".into(), "-a".into()],
        }
    }

    /// Override the external commands. The window id is appended to
    /// `activate_command` as its final argument on execution.
    pub fn with_commands(list_command: Vec<String>, activate_command: Vec<String>) -> Self {
        Self {
            list_command,
            activate_command,
        }
    }

    async fn run(&self, argv: &[String]) -> Result<std::process::Output, ProviderError> {
        run_command(argv, COMMAND_TIMEOUT).await
    }
}

#[async_trait]
impl Provider for WindowsProvider {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn triggers(&self) -> &[&'static str] {
        &["focus", "win"]
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let output = self.run(&self.list_command).await?;
        if !output.status.success() {
            return Err(ProviderError::CommandFailed(format!(
                "window list exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut windows: Vec<(String, String)> =
            stdout.lines().filter_map(parse_window_line).collect();

        let query = query.trim();
        if !query.is_empty() {
            let matcher = SkimMatcherV2::default();
            let mut scored: Vec<((String, String), i64)> = windows
                .into_iter()
                .filter_map(|window| {
                    matcher
                        .fuzzy_match(&window.1, query)
                        .map(|score| (window, score))
                })
                .collect();
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            windows = scored.into_iter().map(|(window, _)| window).collect();
        }

        Ok(windows
            .into_iter()
            .map(|(id, title)| {
                ResultItem::new(title, self.name())
                    .with_subtitle("Switch to window")
                    .with_icon("preferences-system-windows")
                    .with_metadata(WINDOW_ID_KEY, id)
            })
            .collect())
    }

    fn handles_execution(&self) -> bool {
        true
    }

    async fn execute(&self, item: &ResultItem) -> Result<(), ProviderError> {
        let id = item
            .metadata
            .get(WINDOW_ID_KEY)
            .ok_or_else(|| ProviderError::Invalid("item carries no window id".to_string()))?;

        let mut argv = self.activate_command.clone();
        argv.push(id.clone());

        let output = self.run(&argv).await?;
        if !output.status.success() {
            return Err(ProviderError::CommandFailed(format!(
                "window activation exited with {}",
                output.status
            )));
        }
        debug!("Activated window {}", id);
        Ok(())
    }
}

/// One `wmctrl -l` line: id, desktop number, host, then the title.
fn parse_window_line(line: &str) -> Option<(String, String)> {
    let mut fields = line.split_whitespace();
    let id = fields.next()?.to_string();
    let _desktop = fields.next()?;
    let _host = fields.next()?;

    let title = fields.collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return None;
    }
    Some((id, title))
}
