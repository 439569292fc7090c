//! Engine facade wiring every component behind the presentation boundary.
//!
//! The presentation layer talks only to this type: keystrokes in via
//! [`Engine::query_changed`], result updates out via [`Engine::take_updates`],
//! and the select/enter/tab events routed back through it. It never touches
//! the router, cache, or hook registry directly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cache::{CacheStats, ResultCache};
use crate::config::Config;
use crate::frecency::UsageTracker;
use crate::hooks::{HookExecutor, HookRegistry, HookStats};
use crate::item::ResultItem;
use crate::providers::apps::AppsProvider;
use crate::providers::calc::CalcProvider;
use crate::providers::shell::ShellProvider;
use crate::providers::timer::TimerProvider;
use crate::providers::toggles::TogglesProvider;
use crate::providers::windows::WindowsProvider;
use crate::providers::Provider;
use crate::router::QueryRouter;
use crate::session::{SessionController, UpdateStream};

pub struct Engine {
    usage: Arc<UsageTracker>,
    cache: Arc<ResultCache>,
    hooks: Arc<HookRegistry>,
    executor: HookExecutor,
    router: Arc<QueryRouter>,
    session: SessionController,
}

impl Engine {
    /// Wire the full pipeline from configuration and register the built-in
    /// providers. Registration failures are logged and skipped; the engine
    /// comes up with whatever providers made it in.
    ///
    /// Must be called inside a tokio runtime; the session loop is spawned
    /// here.
    pub fn new(config: &Config) -> Result<Self> {
        let usage_path = config
            .usage_path()
            .context("Failed to resolve usage history path")?;
        let usage = Arc::new(UsageTracker::load(usage_path));

        let cache = Arc::new(ResultCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.max_age_secs),
        ));

        let hooks = Arc::new(HookRegistry::new());
        let acquire_timeout = match config.hooks.acquire_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let executor =
            HookExecutor::new(hooks.clone(), config.hooks.max_concurrent, acquire_timeout);

        let router = Arc::new(QueryRouter::new(&config.search, cache.clone(), hooks.clone()));

        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(AppsProvider::new(&config.apps, usage.clone())),
            Arc::new(ShellProvider),
            Arc::new(CalcProvider),
            Arc::new(WindowsProvider::new()),
            Arc::new(TogglesProvider::new()),
            Arc::new(TimerProvider::new()),
        ];
        for provider in providers {
            let name = provider.name();
            if let Err(e) = router.register(provider) {
                warn!("Skipping provider '{}': {}", name, e);
            }
        }

        let session = SessionController::new(
            router.clone(),
            Duration::from_millis(config.search.debounce_ms),
        );

        info!(
            "Engine ready with {} provider(s)",
            router.provider_names().len()
        );

        Ok(Self {
            usage,
            cache,
            hooks,
            executor,
            router,
            session,
        })
    }

    /// Feed one keystroke event into the debounced session.
    pub fn query_changed(&self, text: impl Into<String>) {
        self.session.query_changed(text);
    }

    /// Take the session's result stream; single consumer, single call.
    pub fn take_updates(&self) -> Option<UpdateStream> {
        self.session.take_updates()
    }

    /// One-shot search bypassing the debounce. CLI entry point.
    pub async fn search(&self, text: &str) -> Vec<ResultItem> {
        self.router.search(text).await
    }

    /// An item was chosen.
    ///
    /// Select hooks run first through the bounded executor; a hook that
    /// handles the event consumes the selection. Otherwise the router
    /// executes the item's action, and a successful launch is recorded in
    /// the usage tracker.
    pub async fn item_selected(&self, item: &ResultItem) -> Result<()> {
        match self.executor.run_select(&item.provider, item).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => warn!("Select hooks unavailable: {}", e),
        }

        self.router
            .execute(item)
            .await
            .with_context(|| format!("Failed to execute '{}'", item.title))?;
        self.usage.record_launch(&item.title);
        Ok(())
    }

    /// Enter pressed with raw text; the route owner's hooks see it first.
    /// Returns whether a hook handled it.
    pub async fn enter_pressed(&self, text: &str) -> bool {
        let Some(owner) = self.route_owner(text) else {
            return false;
        };
        match self.executor.run_enter(&owner, text).await {
            Ok(handled) => handled,
            Err(e) => {
                warn!("Enter hooks unavailable: {}", e);
                false
            }
        }
    }

    /// Tab pressed with raw text; the first hook completion wins.
    pub async fn tab_pressed(&self, text: &str) -> Option<String> {
        let owner = self.route_owner(text)?;
        match self.executor.run_tab(&owner, text).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Tab hooks unavailable: {}", e);
                None
            }
        }
    }

    /// Rescan the default provider's data and drop all cached results.
    pub async fn rebuild(&self) -> Result<()> {
        self.router
            .rebuild()
            .await
            .context("Failed to rebuild provider data")?;
        Ok(())
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn hook_stats(&self) -> HookStats {
        self.hooks.stats()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.router.provider_names()
    }

    pub fn trigger_map(&self) -> Vec<(String, String)> {
        self.router.trigger_map()
    }

    pub fn current_fingerprint(&self) -> String {
        self.router.current_fingerprint()
    }

    /// Stop accepting queries, flush usage to disk, release every hook and
    /// provider. In-flight background searches are left to go stale.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
        if let Err(e) = self.usage.flush() {
            warn!("Failed to flush usage history: {}", e);
        }
        self.router.shutdown();
        info!("Engine shut down");
    }

    fn route_owner(&self, text: &str) -> Option<String> {
        self.router
            .parse_input(text)
            .map(|(_, name, _)| name)
            .or_else(|| self.router.default_provider_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            history: HistoryConfig {
                file: Some(dir.path().join("usage.json")),
            },
            ..Config::default()
        };
        (config, dir)
    }

    #[tokio::test]
    async fn test_engine_registers_builtin_providers() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        assert_eq!(
            engine.provider_names(),
            vec!["apps", "calc", "shell", "timer", "toggles", "windows"]
        );
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_triggered_query_roundtrip() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        let items = engine.search("calc 2+2").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "4");
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_calc_selection_is_consumed_by_its_hook() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        let items = engine.search("calc 6*7").await;
        engine.item_selected(&items[0]).await.unwrap();

        // Hook-consumed selections are not launches
        assert!(engine.usage().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shell_selection_records_a_launch() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        let items = engine.search("run true").await;
        assert_eq!(items.len(), 1);
        engine.item_selected(&items[0]).await.unwrap();

        assert!(engine.usage().get("true").is_some());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_pipeline_delivers_results() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();
        let mut updates = engine.take_updates().unwrap();

        engine.query_changed("calc 1+1");
        let update = updates.next().await.unwrap();

        assert_eq!(update.query, "calc 1+1");
        assert_eq!(update.items[0].title, "2");
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_persists_usage() {
        let (config, dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        let items = engine.search("run true").await;
        engine.item_selected(&items[0]).await.unwrap();
        engine.shutdown().await;

        let raw = std::fs::read_to_string(dir.path().join("usage.json")).unwrap();
        assert!(raw.contains("\"true\""));
    }

    #[tokio::test]
    async fn test_enter_and_tab_fall_through_without_hooks() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        assert!(!engine.enter_pressed("random text").await);
        assert_eq!(engine.tab_pressed("random text").await, None);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_rebuild_succeeds() {
        let (config, _dir) = test_config();
        let engine = Engine::new(&config).unwrap();

        engine.rebuild().await.unwrap();
        assert!(!engine.current_fingerprint().is_empty());
        engine.shutdown().await;
    }
}
