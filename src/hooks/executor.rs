//! Bounded asynchronous hook execution.
//!
//! Hook chains triggered from the hot path (a selection, an enter press)
//! run through this executor so a flood of events cannot pile up unbounded
//! work: a semaphore caps concurrent chains, and permit acquisition can be
//! given a timeout that fails the execution instead of waiting forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::hooks::{HookError, HookRegistry};
use crate::item::ResultItem;

pub struct HookExecutor {
    registry: Arc<HookRegistry>,
    semaphore: Arc<Semaphore>,
    acquire_timeout: Option<Duration>,
}

impl HookExecutor {
    /// Wrap `registry` with a concurrency cap of `max_concurrent` chains.
    ///
    /// `acquire_timeout` of `None` waits indefinitely for a slot.
    pub fn new(
        registry: Arc<HookRegistry>,
        max_concurrent: usize,
        acquire_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            acquire_timeout,
        }
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, HookError> {
        let semaphore = self.semaphore.clone();
        match self.acquire_timeout {
            Some(timeout) => tokio::time::timeout(timeout, semaphore.acquire_owned())
                .await
                .map_err(|_| {
                    warn!("Hook executor at capacity, dropping execution");
                    HookError::ExecutorBusy
                })?
                .map_err(|_| HookError::ExecutorClosed),
            None => semaphore
                .acquire_owned()
                .await
                .map_err(|_| HookError::ExecutorClosed),
        }
    }

    /// Run the select chain for `provider`; true if a hook handled it.
    pub async fn run_select(&self, provider: &str, item: &ResultItem) -> Result<bool, HookError> {
        let _permit = self.acquire().await?;
        Ok(self.registry.execute_select_hooks(provider, item))
    }

    /// Run the enter chain for `provider`; true if a hook handled it.
    pub async fn run_enter(&self, provider: &str, text: &str) -> Result<bool, HookError> {
        let _permit = self.acquire().await?;
        Ok(self.registry.execute_enter_hooks(provider, text))
    }

    /// Run the tab chain for `provider`; the first replacement text wins.
    pub async fn run_tab(&self, provider: &str, text: &str) -> Result<Option<String>, HookError> {
        let _permit = self.acquire().await?;
        Ok(self.registry.execute_tab_hooks(provider, text))
    }
}
