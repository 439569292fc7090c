//! Provider trait and the built-in provider set.
//!
//! A provider is a long-lived, named unit that turns a query fragment into
//! result items. Providers claim zero or more trigger tokens; exactly one
//! provider (application search) claims none and serves untriggered queries.

pub mod apps;
pub mod calc;
pub mod mock;
pub mod shell;
pub mod timer;
pub mod toggles;
pub mod windows;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::hooks::Hook;
use crate::item::ResultItem;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("provider does not execute items")]
    Unsupported,
}

/// Core trait for result providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name, used for registry keys and item back-references
    fn name(&self) -> &'static str;

    /// Trigger tokens this provider claims; empty for the default provider
    fn triggers(&self) -> &[&'static str] {
        &[]
    }

    /// Produce result items for a query fragment
    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError>;

    /// Hooks this provider contributes at registration time
    fn hooks(&self) -> Vec<Hook> {
        Vec::new()
    }

    /// Whether this provider executes its own items instead of the router
    fn handles_execution(&self) -> bool {
        false
    }

    /// Execute an item; only called when `handles_execution` is true
    async fn execute(&self, _item: &ResultItem) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported)
    }

    /// Cheap digest of the underlying data set, used for cache invalidation.
    /// Only the default provider returns one.
    fn fingerprint(&self) -> Option<String> {
        None
    }

    /// Refresh the underlying data set (e.g. rescan installed applications)
    async fn rebuild(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// One-time teardown at unregister or shutdown
    fn cleanup(&self) {}
}

/// Run an external command to completion, bounded by `limit`.
///
/// `argv[0]` is the program. Used by providers that shell out for their
/// data; the bound keeps a wedged external tool from stalling a search.
pub(crate) async fn run_command(
    argv: &[String],
    limit: Duration,
) -> Result<std::process::Output, ProviderError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ProviderError::Invalid("empty command line".to_string()))?;

    let output = tokio::time::timeout(
        limit,
        tokio::process::Command::new(program).args(args).output(),
    )
    .await
    .map_err(|_| ProviderError::Timeout(limit))??;
    Ok(output)
}
