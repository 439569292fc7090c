//! Query routing and the provider registry.
//!
//! The router owns every provider, maps trigger tokens to them, and runs
//! the search path: trigger parse, provider dispatch or cache lookup,
//! dedup, truncation. Provider-specific (triggered) results are never
//! cached; only default-provider results are, keyed by the normalized
//! query plus the provider's data fingerprint.
//!
//! No lock is held across a populate call; the registry lock only guards
//! the maps themselves.

use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::cache::ResultCache;
use crate::config::SearchConfig;
use crate::hooks::HookRegistry;
use crate::item::ResultItem;
use crate::metrics;
use crate::providers::{Provider, ProviderError};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),

    #[error("default provider slot is already taken by '{0}'")]
    DuplicateDefault(String),

    #[error("no provider named '{0}'")]
    UnknownProvider(String),

    #[error("'{0}' has no executable action")]
    UnsupportedAction(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to spawn {kind} action: {source}")]
    Spawn {
        kind: &'static str,
        source: std::io::Error,
    },
}

#[derive(Default)]
struct RouterState {
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Trigger token (lowercase) to provider name.
    triggers: HashMap<String, String>,
    default_provider: Option<String>,
}

pub struct QueryRouter {
    state: RwLock<RouterState>,
    cache: Arc<ResultCache>,
    hooks: Arc<HookRegistry>,
    max_results: usize,
    max_command_results: usize,
}

impl QueryRouter {
    pub fn new(config: &SearchConfig, cache: Arc<ResultCache>, hooks: Arc<HookRegistry>) -> Self {
        Self {
            state: RwLock::new(RouterState::default()),
            cache,
            hooks,
            max_results: config.max_results,
            max_command_results: config.max_command_results,
        }
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, RouterState> {
        self.state.read().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - provider calls happen
            // outside this lock, so the maps are never mid-mutation
            poisoned.into_inner()
        })
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, RouterState> {
        self.state.write().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - provider calls happen
            // outside this lock, so the maps are never mid-mutation
            poisoned.into_inner()
        })
    }

    /// Register a provider and its hooks.
    ///
    /// A provider with no triggers claims the single default slot. A trigger
    /// token colliding with an earlier registration keeps the last one and
    /// logs a warning. Duplicate hook ids are skipped, not fatal.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Result<(), RouterError> {
        let name = provider.name();
        {
            let mut state = self.state_mut();

            if state.providers.contains_key(name) {
                return Err(RouterError::DuplicateProvider(name.to_string()));
            }

            let triggers = provider.triggers();
            if triggers.is_empty() {
                if let Some(existing) = &state.default_provider {
                    return Err(RouterError::DuplicateDefault(existing.clone()));
                }
                state.default_provider = Some(name.to_string());
            }

            for &token in triggers {
                let token = token.to_lowercase();
                if let Some(previous) = state.triggers.insert(token.clone(), name.to_string()) {
                    warn!(
                        "Trigger '{}' moved from provider '{}' to '{}'",
                        token, previous, name
                    );
                }
            }

            state.providers.insert(name.to_string(), provider.clone());
        }

        for hook in provider.hooks() {
            if let Err(e) = self.hooks.register(name, hook) {
                warn!("Skipping hook for provider '{}': {}", name, e);
            }
        }

        debug!(
            "Registered provider '{}' with {} trigger(s)",
            name,
            provider.triggers().len()
        );
        Ok(())
    }

    /// Remove a provider, its triggers, and its hooks; runs its cleanup.
    pub fn unregister(&self, name: &str) -> Result<(), RouterError> {
        let provider = {
            let mut state = self.state_mut();
            let provider = state
                .providers
                .remove(name)
                .ok_or_else(|| RouterError::UnknownProvider(name.to_string()))?;
            state.triggers.retain(|_, owner| owner != name);
            if state.default_provider.as_deref() == Some(name) {
                state.default_provider = None;
            }
            provider
        };

        self.hooks.unregister_provider(name);
        provider.cleanup();
        debug!("Unregistered provider '{}'", name);
        Ok(())
    }

    /// Resolve `text` to a (trigger, provider name, remainder) route.
    ///
    /// Three syntaxes are tried in order: `>token rest`, `token:rest`, and
    /// `token rest` on the first whitespace. The first one whose lowercased
    /// token maps to a registered provider wins. `None` means the caller
    /// should hand the full original text to the default provider.
    pub fn parse_input(&self, text: &str) -> Option<(String, String, String)> {
        let state = self.state();

        if let Some(rest) = text.strip_prefix('>') {
            let rest = rest.trim_start();
            let (token, remainder) = match rest.split_once(char::is_whitespace) {
                Some((token, remainder)) => (token, remainder.trim_start()),
                None => (rest, ""),
            };
            let token = token.to_lowercase();
            if let Some(name) = state.triggers.get(&token) {
                return Some((token, name.clone(), remainder.to_string()));
            }
        }

        if let Some((token, remainder)) = text.split_once(':') {
            let token = token.trim().to_lowercase();
            if let Some(name) = state.triggers.get(&token) {
                return Some((token, name.clone(), remainder.trim_start().to_string()));
            }
        }

        if let Some((token, remainder)) = text.split_once(char::is_whitespace) {
            let token = token.to_lowercase();
            if let Some(name) = state.triggers.get(&token) {
                return Some((token, name.clone(), remainder.trim_start().to_string()));
            }
        }

        None
    }

    /// Run one search: triggered dispatch or the cached default route.
    ///
    /// Provider failures degrade to an empty list; nothing here is fatal.
    pub async fn search(&self, text: &str) -> Vec<ResultItem> {
        let started = Instant::now();
        metrics::SEARCH_REQUESTS.inc();

        let items = match self.parse_input(text) {
            Some((trigger, name, remainder)) => {
                self.triggered_search(&trigger, &name, &remainder).await
            }
            None => self.default_search(text).await,
        };

        metrics::SEARCH_LATENCY.observe(started.elapsed().as_secs_f64());
        metrics::SEARCH_RESULTS.observe(items.len() as f64);
        items
    }

    async fn triggered_search(&self, trigger: &str, name: &str, remainder: &str) -> Vec<ResultItem> {
        let Some(provider) = self.provider(name) else {
            return Vec::new();
        };

        match provider.populate(remainder).await {
            Ok(mut items) => {
                items.truncate(self.max_command_results);
                debug!(
                    trigger = trigger,
                    provider = name,
                    results = items.len(),
                    "Triggered search completed"
                );
                items
            }
            Err(e) => {
                warn!("Provider '{}' failed for trigger '{}': {}", name, trigger, e);
                Vec::new()
            }
        }
    }

    async fn default_search(&self, text: &str) -> Vec<ResultItem> {
        let Some(provider) = self.default_provider() else {
            warn!("No default provider registered");
            return Vec::new();
        };

        let fingerprint = provider.fingerprint().unwrap_or_default();
        if let Some(items) = self.cache.get(text, &fingerprint) {
            return items;
        }

        let started = Instant::now();
        match provider.populate(text).await {
            Ok(items) => {
                let duration = started.elapsed();
                let mut items = dedup_items(items);
                items.truncate(self.max_results);
                self.cache.put(text, fingerprint, items.clone(), duration);
                debug!(
                    query = text,
                    results = items.len(),
                    elapsed_ms = duration.as_millis() as u64,
                    "Default search completed"
                );
                items
            }
            Err(e) => {
                warn!("Default provider '{}' failed: {}", provider.name(), e);
                Vec::new()
            }
        }
    }

    /// Execute a chosen item.
    ///
    /// The owning provider goes first if it executes its own items; otherwise
    /// spawnable actions become detached child processes. Success means the
    /// process started, not that it finished.
    pub async fn execute(&self, item: &ResultItem) -> Result<(), RouterError> {
        if let Some(provider) = self.provider(&item.provider) {
            if provider.handles_execution() {
                debug!("Provider '{}' executes '{}'", item.provider, item.title);
                return provider.execute(item).await.map_err(RouterError::from);
            }
        }

        match &item.action {
            Some(action) if action.is_spawnable() => self.spawn_action(action),
            _ => Err(RouterError::UnsupportedAction(item.title.clone())),
        }
    }

    fn spawn_action(&self, action: &Action) -> Result<(), RouterError> {
        let mut command = match action {
            Action::Shell { command } => {
                let mut c = tokio::process::Command::new("sh");
                c.arg("-c").arg(command);
                c
            }
            Action::Open { target } => {
                let mut c = tokio::process::Command::new("xdg-open");
                c.arg(target);
                c
            }
            other => return Err(RouterError::UnsupportedAction(other.kind().to_string())),
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| {
                info!("Spawned {} action", action.kind());
            })
            .map_err(|source| RouterError::Spawn {
                kind: action.kind(),
                source,
            })
    }

    /// Refresh the default provider's data set and drop every cache entry.
    pub async fn rebuild(&self) -> Result<(), RouterError> {
        let Some(provider) = self.default_provider() else {
            return Ok(());
        };

        provider.rebuild().await?;
        self.cache.invalidate();
        info!(
            "Rebuilt '{}' data and invalidated the result cache",
            provider.name()
        );
        Ok(())
    }

    /// Fingerprint of the default provider's current data set.
    pub fn current_fingerprint(&self) -> String {
        self.default_provider()
            .and_then(|p| p.fingerprint())
            .unwrap_or_default()
    }

    pub fn provider_names(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn default_provider_name(&self) -> Option<String> {
        self.state().default_provider.clone()
    }

    /// Sorted (trigger token, provider name) pairs.
    pub fn trigger_map(&self) -> Vec<(String, String)> {
        let state = self.state();
        let mut pairs: Vec<(String, String)> = state
            .triggers
            .iter()
            .map(|(token, name)| (token.clone(), name.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Tear down every provider: hooks released, cleanup run.
    pub fn shutdown(&self) {
        let providers: Vec<(String, Arc<dyn Provider>)> = {
            let mut state = self.state_mut();
            state.triggers.clear();
            state.default_provider = None;
            state.providers.drain().collect()
        };

        for (name, provider) in providers {
            self.hooks.unregister_provider(&name);
            provider.cleanup();
        }
        info!("Router shut down");
    }

    fn provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.state().providers.get(name).cloned()
    }

    fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        let state = self.state();
        let name = state.default_provider.as_ref()?;
        state.providers.get(name).cloned()
    }
}

/// Drop repeated `(title, subtitle)` rows, keeping first-occurrence order.
fn dedup_items(items: Vec<ResultItem>) -> Vec<ResultItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use std::time::Duration;

    fn test_router() -> QueryRouter {
        let config = SearchConfig::default();
        QueryRouter::new(
            &config,
            Arc::new(ResultCache::new(16, Duration::from_secs(1800))),
            Arc::new(HookRegistry::new()),
        )
    }

    fn items(provider: &str, titles: &[&str]) -> Vec<ResultItem> {
        titles
            .iter()
            .map(|title| ResultItem::new(*title, provider))
            .collect()
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let router = test_router();
        router
            .register(Arc::new(MockProvider::new("twin")))
            .unwrap();

        let err = router
            .register(Arc::new(MockProvider::new("twin")))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateProvider(name) if name == "twin"));
    }

    #[test]
    fn test_register_rejects_second_default() {
        let router = test_router();
        router
            .register(Arc::new(MockProvider::new("first")))
            .unwrap();

        let err = router
            .register(Arc::new(MockProvider::new("second")))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateDefault(name) if name == "first"));
    }

    #[test]
    fn test_trigger_collision_keeps_last_registration() {
        let router = test_router();
        router
            .register(Arc::new(MockProvider::new("old").with_triggers(&["x"])))
            .unwrap();
        router
            .register(Arc::new(MockProvider::new("new").with_triggers(&["x"])))
            .unwrap();

        assert_eq!(
            router.trigger_map(),
            vec![("x".to_string(), "new".to_string())]
        );
    }

    #[test]
    fn test_parse_input_three_syntaxes() {
        let router = test_router();
        router
            .register(Arc::new(MockProvider::new("timer").with_triggers(&["timer"])))
            .unwrap();
        router
            .register(Arc::new(MockProvider::new("toggles").with_triggers(&["wifi"])))
            .unwrap();

        let (trigger, provider, remainder) = router.parse_input(">timer 5m").unwrap();
        assert_eq!((trigger.as_str(), provider.as_str()), ("timer", "timer"));
        assert_eq!(remainder, "5m");

        let (trigger, provider, remainder) = router.parse_input("timer:5m tea").unwrap();
        assert_eq!((trigger.as_str(), provider.as_str()), ("timer", "timer"));
        assert_eq!(remainder, "5m tea");

        let (trigger, provider, remainder) = router.parse_input("wifi scan").unwrap();
        assert_eq!((trigger.as_str(), provider.as_str()), ("wifi", "toggles"));
        assert_eq!(remainder, "scan");

        assert!(router.parse_input("random text").is_none());
    }

    #[test]
    fn test_parse_input_is_case_insensitive() {
        let router = test_router();
        router
            .register(Arc::new(MockProvider::new("timer").with_triggers(&["timer"])))
            .unwrap();

        let (trigger, _, remainder) = router.parse_input("TIMER 5m").unwrap();
        assert_eq!(trigger, "timer");
        assert_eq!(remainder, "5m");
    }

    #[tokio::test]
    async fn test_triggered_search_truncates_to_command_limit() {
        let router = test_router();
        let titles: Vec<String> = (0..40).map(|i| format!("row {i}")).collect();
        let scripted: Vec<ResultItem> = titles
            .iter()
            .map(|t| ResultItem::new(t.clone(), "big"))
            .collect();
        router
            .register(Arc::new(
                MockProvider::new("big")
                    .with_triggers(&["big"])
                    .with_items(scripted),
            ))
            .unwrap();

        let results = router.search("big anything").await;
        assert_eq!(results.len(), SearchConfig::default().max_command_results);
    }

    #[tokio::test]
    async fn test_default_search_dedups_first_occurrence() {
        let router = test_router();
        let mut scripted = items("apps", &["Alpha", "Beta"]);
        scripted.push(ResultItem::new("Alpha", "apps"));
        router
            .register(Arc::new(MockProvider::new("apps").with_items(scripted)))
            .unwrap();

        let results = router.search("whatever").await;
        let titles: Vec<&str> = results.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_default_search_caches_by_fingerprint() {
        let router = test_router();
        let provider = Arc::new(
            MockProvider::new("apps")
                .with_items(items("apps", &["Alpha"]))
                .with_fingerprint("1:Alpha:Alpha"),
        );
        router.register(provider.clone()).unwrap();

        assert_eq!(router.search("alpha").await.len(), 1);
        assert_eq!(router.search("alpha").await.len(), 1);
        assert_eq!(provider.populate_calls(), 1);

        // A fingerprint change turns the cached entry into a miss
        provider.set_fingerprint("2:Alpha:Beta");
        assert_eq!(router.search("alpha").await.len(), 1);
        assert_eq!(provider.populate_calls(), 2);
    }

    #[tokio::test]
    async fn test_triggered_results_are_never_cached() {
        let router = test_router();
        let provider = Arc::new(MockProvider::new("calc").with_triggers(&["calc"]));
        router.register(provider.clone()).unwrap();

        router.search("calc 1+1").await;
        router.search("calc 1+1").await;
        assert_eq!(provider.populate_calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_empty() {
        let router = test_router();
        let provider = Arc::new(MockProvider::new("apps"));
        router.register(provider.clone()).unwrap();

        provider.set_failing(true);
        assert!(router.search("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_default_provider_is_empty() {
        let router = test_router();
        assert!(router.search("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_execute_defers_to_owning_provider() {
        let router = test_router();
        let provider = Arc::new(MockProvider::new("windows").with_handles_execution());
        router.register(provider.clone()).unwrap();

        let item = ResultItem::new("Terminal", "windows");
        router.execute(&item).await.unwrap();

        let executed = provider.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].title, "Terminal");
    }

    #[tokio::test]
    async fn test_execute_spawns_shell_action() {
        let router = test_router();
        let item = ResultItem::new("noop", "gone").with_action(Action::Shell {
            command: "true".to_string(),
        });

        router.execute(&item).await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_rejects_actionless_item() {
        let router = test_router();
        let item = ResultItem::new("inert", "gone");

        let err = router.execute(&item).await.unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedAction(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_unspawnable_action() {
        let router = test_router();
        let item = ResultItem::new("toggle", "gone").with_action(Action::Toggle {
            setting: "wifi".to_string(),
        });

        let err = router.execute(&item).await.unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedAction(_)));
    }

    #[tokio::test]
    async fn test_rebuild_invalidates_cache() {
        let router = test_router();
        let provider = Arc::new(
            MockProvider::new("apps")
                .with_items(items("apps", &["Alpha"]))
                .with_fingerprint("fp"),
        );
        router.register(provider.clone()).unwrap();

        router.search("alpha").await;
        router.search("alpha").await;
        assert_eq!(provider.populate_calls(), 1);

        router.rebuild().await.unwrap();
        assert_eq!(provider.rebuild_calls(), 1);

        router.search("alpha").await;
        assert_eq!(provider.populate_calls(), 2);
    }

    #[tokio::test]
    async fn test_unregister_drops_triggers_and_hooks() {
        let hooks = Arc::new(HookRegistry::new());
        let router = QueryRouter::new(
            &SearchConfig::default(),
            Arc::new(ResultCache::new(16, Duration::from_secs(1800))),
            hooks.clone(),
        );

        let provider = Arc::new(
            MockProvider::new("calc")
                .with_triggers(&["calc"])
                .with_hooks(vec![crate::hooks::Hook::new("calc-select", 10)]),
        );
        router.register(provider.clone()).unwrap();
        assert_eq!(hooks.hooks_for("calc").len(), 1);

        router.unregister("calc").unwrap();
        assert!(router.parse_input("calc 1+1").is_none());
        assert!(hooks.hooks_for("calc").is_empty());
        assert!(provider.was_cleaned_up());
    }

    #[tokio::test]
    async fn test_shutdown_cleans_up_all_providers() {
        let router = test_router();
        let apps = Arc::new(MockProvider::new("apps"));
        let calc = Arc::new(MockProvider::new("calc").with_triggers(&["calc"]));
        router.register(apps.clone()).unwrap();
        router.register(calc.clone()).unwrap();

        router.shutdown();

        assert!(router.provider_names().is_empty());
        assert!(router.trigger_map().is_empty());
        assert!(apps.was_cleaned_up());
        assert!(calc.was_cleaned_up());
    }
}
