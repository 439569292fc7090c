//! Scripted provider for tests and benchmarks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{Provider, ProviderError};
use crate::hooks::Hook;
use crate::item::ResultItem;

/// Deterministic provider with configurable items, delays, and failures.
///
/// With no scripted items, `populate` echoes the query back as a single
/// item, which makes results distinguishable per query without setup.
pub struct MockProvider {
    name: &'static str,
    triggers: &'static [&'static str],
    items: RwLock<Vec<ResultItem>>,
    fingerprint: RwLock<Option<String>>,
    delay: Option<Duration>,
    query_delays: RwLock<HashMap<String, Duration>>,
    fail: AtomicBool,
    handles_execution: bool,
    hooks: Mutex<Vec<Hook>>,
    populate_calls: AtomicUsize,
    rebuild_calls: AtomicUsize,
    executed: Mutex<Vec<ResultItem>>,
    cleaned_up: AtomicBool,
}

impl MockProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            triggers: &[],
            items: RwLock::new(Vec::new()),
            fingerprint: RwLock::new(None),
            delay: None,
            query_delays: RwLock::new(HashMap::new()),
            fail: AtomicBool::new(false),
            handles_execution: false,
            hooks: Mutex::new(Vec::new()),
            populate_calls: AtomicUsize::new(0),
            rebuild_calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
            cleaned_up: AtomicBool::new(false),
        }
    }

    pub fn with_triggers(mut self, triggers: &'static [&'static str]) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_items(self, items: Vec<ResultItem>) -> Self {
        *self.items.write().expect("items lock") = items;
        self
    }

    pub fn with_fingerprint(self, fingerprint: impl Into<String>) -> Self {
        *self.fingerprint.write().expect("fingerprint lock") = Some(fingerprint.into());
        self
    }

    /// Delay every populate call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay populate calls for one specific query, overriding the global
    /// delay. Lets a test make an older query finish after a newer one.
    pub fn with_query_delay(self, query: impl Into<String>, delay: Duration) -> Self {
        self.query_delays
            .write()
            .expect("query_delays lock")
            .insert(query.into(), delay);
        self
    }

    pub fn with_hooks(self, hooks: Vec<Hook>) -> Self {
        *self.hooks.lock().expect("hooks lock") = hooks;
        self
    }

    pub fn with_handles_execution(mut self) -> Self {
        self.handles_execution = true;
        self
    }

    pub fn set_items(&self, items: Vec<ResultItem>) {
        *self.items.write().expect("items lock") = items;
    }

    pub fn set_fingerprint(&self, fingerprint: impl Into<String>) {
        *self.fingerprint.write().expect("fingerprint lock") = Some(fingerprint.into());
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn populate_calls(&self) -> usize {
        self.populate_calls.load(Ordering::SeqCst)
    }

    pub fn rebuild_calls(&self) -> usize {
        self.rebuild_calls.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<ResultItem> {
        self.executed.lock().expect("executed lock").clone()
    }

    pub fn was_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn triggers(&self) -> &[&'static str] {
        self.triggers
    }

    async fn populate(&self, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        self.populate_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Invalid("scripted failure".to_string()));
        }

        let delay = self
            .query_delays
            .read()
            .expect("query_delays lock")
            .get(query)
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let items = self.items.read().expect("items lock").clone();
        if items.is_empty() {
            return Ok(vec![ResultItem::new(
                format!("{}: {}", self.name, query),
                self.name,
            )]);
        }
        Ok(items)
    }

    fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().expect("hooks lock").clone()
    }

    fn handles_execution(&self) -> bool {
        self.handles_execution
    }

    async fn execute(&self, item: &ResultItem) -> Result<(), ProviderError> {
        self.executed.lock().expect("executed lock").push(item.clone());
        Ok(())
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint.read().expect("fingerprint lock").clone()
    }

    async fn rebuild(&self) -> Result<(), ProviderError> {
        self.rebuild_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cleanup(&self) {
        self.cleaned_up.store(true, Ordering::SeqCst);
    }
}
