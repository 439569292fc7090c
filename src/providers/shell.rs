//! Run the query fragment as a shell command.

use async_trait::async_trait;

use super::{Provider, ProviderError};
use crate::action::Action;
use crate::item::ResultItem;

pub struct ShellProvider;

#[async_trait]
impl Provider for ShellProvider {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn triggers(&self) -> &[&'static str] {
        &["run", "sh"]
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        let command = query.trim();
        if command.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![ResultItem::new(command, self.name())
            .with_subtitle("Run in shell")
            .with_icon("utilities-terminal")
            .with_action(Action::Shell {
                command: command.to_string(),
            })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wraps_fragment_in_shell_action() {
        let provider = ShellProvider;
        let items = provider.populate("ls -la /tmp").await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "ls -la /tmp");
        assert!(matches!(
            items[0].action,
            Some(Action::Shell { ref command }) if command == "ls -la /tmp"
        ));
    }

    #[tokio::test]
    async fn test_empty_fragment_yields_nothing() {
        let provider = ShellProvider;
        assert!(provider.populate("   ").await.unwrap().is_empty());
    }

    #[test]
    fn test_trigger_tokens() {
        let provider = ShellProvider;
        assert_eq!(provider.triggers(), &["run", "sh"]);
    }
}
