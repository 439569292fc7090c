//! Countdown timers.
//!
//! Parses fragments like `5m`, `90s`, `1h30m tea` into a timer action and,
//! on execution, arms a detached task that fires a notification command when
//! the countdown ends. Bare numbers are read as minutes. The notification
//! command is injectable; the default is `notify-send`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{Provider, ProviderError};
use crate::action::Action;
use crate::item::ResultItem;

pub struct TimerProvider {
    notify_command: Vec<String>,
}

impl Default for TimerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerProvider {
    pub fn new() -> Self {
        Self {
            notify_command: vec!["notify-send".into(), "Timer finished".into()],
        }
    }

    /// Override the notification command; the timer label is appended as the
    /// final argument when it fires.
    pub fn with_notify_command(notify_command: Vec<String>) -> Self {
        Self { notify_command }
    }
}

#[async_trait]
impl Provider for TimerProvider {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn triggers(&self) -> &[&'static str] {
        &["timer"]
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let fragment = query.trim();
        if fragment.is_empty() {
            return Ok(Vec::new());
        }

        let mut words = fragment.split_whitespace();
        let duration_word = words.next().unwrap_or_default();
        let Some(duration_secs) = parse_duration(duration_word) else {
            return Ok(Vec::new());
        };

        let label = {
            let rest = words.collect::<Vec<_>>().join(" ");
            if rest.is_empty() {
                format!("{} timer", humanize(duration_secs))
            } else {
                rest
            }
        };

        Ok(vec![ResultItem::new(
            format!("Timer: {}", humanize(duration_secs)),
            self.name(),
        )
        .with_subtitle(&label)
        .with_icon("alarm-clock")
        .with_action(Action::Timer {
            duration_secs,
            label,
        })])
    }

    fn handles_execution(&self) -> bool {
        true
    }

    /// Arm the timer and return immediately; the countdown runs detached.
    async fn execute(&self, item: &ResultItem) -> Result<(), ProviderError> {
        let Some(Action::Timer {
            duration_secs,
            label,
        }) = &item.action
        else {
            return Err(ProviderError::Invalid(
                "item carries no timer action".to_string(),
            ));
        };

        let duration = Duration::from_secs(*duration_secs);
        let label = label.clone();
        let notify = self.notify_command.clone();

        info!("Armed {} timer '{}'", humanize(*duration_secs), label);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let Some((program, args)) = notify.split_first() else {
                return;
            };
            match Command::new(program).args(args).arg(&label).spawn() {
                Ok(_) => debug!("Timer '{}' finished", label),
                Err(e) => warn!("Failed to run timer notification: {}", e),
            }
        });
        Ok(())
    }
}

/// `90s`, `5m`, `1h`, or compounds like `1h30m`; bare numbers are minutes.
fn parse_duration(token: &str) -> Option<u64> {
    if token.is_empty() {
        return None;
    }
    if let Ok(minutes) = token.parse::<u64>() {
        return Some(minutes.saturating_mul(60)).filter(|&secs| secs > 0);
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for ch in token.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value = digits.parse::<u64>().ok()?;
        digits.clear();
        let unit = match ch {
            's' | 'S' => 1,
            'm' | 'M' => 60,
            'h' | 'H' => 3600,
            _ => return None,
        };
        total = total.saturating_add(value.saturating_mul(unit));
    }

    // A trailing digit run has no unit, e.g. `1h30`
    if !digits.is_empty() {
        return None;
    }
    if total == 0 {
        None
    } else {
        Some(total)
    }
}

fn humanize(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}
