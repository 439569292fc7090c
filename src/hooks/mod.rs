//! Priority-ordered hook registry with propagation control.
//!
//! Providers contribute hooks for three events: item selected, enter
//! pressed, and tab completion. Hooks run in ascending priority order
//! (lower runs first). A callback reports two independent booleans:
//! `handled` stops the chain and reports success; `stop_propagation` alone
//! stops the chain without claiming the event. A panicking callback is
//! caught, logged, counted as a failure, and the remaining hooks still run.

pub mod executor;

pub use executor::HookExecutor;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error};

use crate::item::ResultItem;
use crate::metrics;

/// Weight of history in the rolling latency average.
const LATENCY_DECAY: f64 = 0.99;

pub type SelectFn = Arc<dyn Fn(&ResultItem) -> HookOutcome + Send + Sync>;
pub type EnterFn = Arc<dyn Fn(&str) -> HookOutcome + Send + Sync>;
pub type TabFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;
pub type CleanupFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook '{id}' is already registered for provider '{provider}'")]
    DuplicateHookId { provider: String, id: String },

    #[error("hook executor is at capacity")]
    ExecutorBusy,

    #[error("hook executor is shut down")]
    ExecutorClosed,
}

/// What a select/enter callback did with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HookOutcome {
    /// Terminal success: stop iterating and report the event handled.
    pub handled: bool,
    /// Stop iterating without claiming the event.
    pub stop_propagation: bool,
}

impl HookOutcome {
    /// Let the remaining hooks see the event.
    pub fn pass() -> Self {
        Self::default()
    }

    /// Claim the event; no further hooks run.
    pub fn handled() -> Self {
        Self {
            handled: true,
            stop_propagation: false,
        }
    }

    /// Veto the event: no further hooks run, but nothing handled it.
    pub fn stop() -> Self {
        Self {
            handled: false,
            stop_propagation: true,
        }
    }
}

/// One interceptor registered by a provider.
#[derive(Clone)]
pub struct Hook {
    id: String,
    priority: i32,
    select: Option<SelectFn>,
    enter: Option<EnterFn>,
    tab: Option<TabFn>,
    cleanup: Option<CleanupFn>,
}

impl Hook {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            priority,
            select: None,
            enter: None,
            tab: None,
            cleanup: None,
        }
    }

    pub fn on_select(
        mut self,
        f: impl Fn(&ResultItem) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        self.select = Some(Arc::new(f));
        self
    }

    pub fn on_enter(mut self, f: impl Fn(&str) -> HookOutcome + Send + Sync + 'static) -> Self {
        self.enter = Some(Arc::new(f));
        self
    }

    pub fn on_tab(mut self, f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.tab = Some(Arc::new(f));
        self
    }

    pub fn on_cleanup(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cleanup = Some(Arc::new(f));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("select", &self.select.is_some())
            .field("enter", &self.enter.is_some())
            .field("tab", &self.tab.is_some())
            .finish()
    }
}

/// Execution counters shared across all hooks.
#[derive(Debug, Clone, Default)]
pub struct HookStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Exponentially weighted average callback latency in milliseconds.
    pub avg_latency_ms: f64,
}

impl HookStats {
    fn record(&mut self, latency_ms: f64, succeeded: bool) {
        self.total += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        if self.total == 1 {
            self.avg_latency_ms = latency_ms;
        } else {
            self.avg_latency_ms =
                self.avg_latency_ms * LATENCY_DECAY + latency_ms * (1.0 - LATENCY_DECAY);
        }
    }
}

/// Hooks keyed by the provider that owns them.
///
/// Callbacks always run outside the registry lock, so a hook may call back
/// into the registry without deadlocking.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<Hook>>>,
    stats: Mutex<HookStats>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn hooks(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Hook>>> {
        self.hooks.read().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - callbacks run outside
            // this lock, so the map itself is never mid-mutation
            poisoned.into_inner()
        })
    }

    fn hooks_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Hook>>> {
        self.hooks.write().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - callbacks run outside
            // this lock, so the map itself is never mid-mutation
            poisoned.into_inner()
        })
    }

    /// Register a hook for `provider`, keeping the provider's hooks sorted
    /// by ascending priority.
    pub fn register(&self, provider: &str, hook: Hook) -> Result<(), HookError> {
        let mut hooks = self.hooks_mut();
        let list = hooks.entry(provider.to_string()).or_default();

        if list.iter().any(|existing| existing.id == hook.id) {
            return Err(HookError::DuplicateHookId {
                provider: provider.to_string(),
                id: hook.id,
            });
        }

        debug!(
            "Registered hook '{}' (priority {}) for provider '{}'",
            hook.id, hook.priority, provider
        );
        list.push(hook);
        list.sort_by_key(|h| h.priority);
        Ok(())
    }

    /// Remove every hook owned by `provider`, running each cleanup callback.
    pub fn unregister_provider(&self, provider: &str) {
        let removed = self.hooks_mut().remove(provider);

        if let Some(hooks) = removed {
            for hook in &hooks {
                if let Some(cleanup) = &hook.cleanup {
                    if catch_unwind(AssertUnwindSafe(|| cleanup())).is_err() {
                        error!("Hook '{}' panicked during cleanup", hook.id);
                    }
                }
            }
            debug!(
                "Unregistered {} hooks for provider '{}'",
                hooks.len(),
                provider
            );
        }
    }

    /// Remove all hooks for all providers, running cleanups.
    pub fn clear(&self) {
        let providers: Vec<String> = self.hooks().keys().cloned().collect();
        for provider in providers {
            self.unregister_provider(&provider);
        }
    }

    /// A provider's hooks in execution (ascending priority) order.
    pub fn hooks_for(&self, provider: &str) -> Vec<Hook> {
        self.hooks().get(provider).cloned().unwrap_or_default()
    }

    /// Run the select chain for `provider`; true if some hook handled it.
    pub fn execute_select_hooks(&self, provider: &str, item: &ResultItem) -> bool {
        for hook in self.hooks_for(provider) {
            let Some(callback) = &hook.select else {
                continue;
            };
            match self.invoke(&hook.id, || callback(item)) {
                Some(outcome) => {
                    if outcome.handled {
                        return true;
                    }
                    if outcome.stop_propagation {
                        return false;
                    }
                }
                // Panicked: treated as "did not handle", chain continues.
                None => continue,
            }
        }
        false
    }

    /// Run the enter chain for `provider`; true if some hook handled it.
    pub fn execute_enter_hooks(&self, provider: &str, text: &str) -> bool {
        for hook in self.hooks_for(provider) {
            let Some(callback) = &hook.enter else {
                continue;
            };
            match self.invoke(&hook.id, || callback(text)) {
                Some(outcome) => {
                    if outcome.handled {
                        return true;
                    }
                    if outcome.stop_propagation {
                        return false;
                    }
                }
                None => continue,
            }
        }
        false
    }

    /// Run the tab chain for `provider`; the first replacement text wins.
    pub fn execute_tab_hooks(&self, provider: &str, text: &str) -> Option<String> {
        for hook in self.hooks_for(provider) {
            let Some(callback) = &hook.tab else {
                continue;
            };
            if let Some(Some(new_text)) = self.invoke(&hook.id, || callback(text)) {
                return Some(new_text);
            }
        }
        None
    }

    /// Invoke one callback with panic isolation and stats accounting.
    fn invoke<T>(&self, hook_id: &str, f: impl FnOnce() -> T) -> Option<T> {
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(f));
        let elapsed = start.elapsed();

        metrics::HOOK_EXECUTIONS.inc();
        metrics::HOOK_LATENCY.observe(elapsed.as_secs_f64());

        let succeeded = result.is_ok();
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(elapsed.as_secs_f64() * 1000.0, succeeded);

        match result {
            Ok(value) => Some(value),
            Err(_) => {
                metrics::HOOK_FAILURES.inc();
                error!("Hook '{}' panicked during execution", hook_id);
                None
            }
        }
    }

    pub fn stats(&self) -> HookStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
