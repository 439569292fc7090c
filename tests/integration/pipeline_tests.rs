//! End-to-end flows: desktop entries in, routed and ranked rows out,
//! selections recorded, rebuilds picked up by the cache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use launchkit::cache::ResultCache;
use launchkit::config::SearchConfig;
use launchkit::hooks::{Hook, HookExecutor, HookOutcome, HookRegistry};
use launchkit::providers::mock::MockProvider;
use launchkit::router::QueryRouter;
use launchkit::ResultItem;

use crate::helpers::test_harness::{TestHarness, CALCULATOR, FIREFOX, TERMINAL};

fn router_with(cache: Arc<ResultCache>) -> QueryRouter {
    QueryRouter::new(
        &SearchConfig::default(),
        cache,
        Arc::new(HookRegistry::new()),
    )
}

#[tokio::test]
async fn test_desktop_entries_rank_by_match_and_frecency() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.install_app("firefox.desktop", FIREFOX)?;
    harness.install_app("calc.desktop", CALCULATOR)?;
    harness.install_app("terminal.desktop", TERMINAL)?;

    let usage = harness.tracker();
    usage.record_launch("Terminal");
    usage.record_launch("Terminal");

    let router = router_with(Arc::new(ResultCache::new(16, Duration::from_secs(1800))));
    router.register(Arc::new(harness.apps_provider(usage)))?;

    // Empty query: the launched app leads, the rest follow alphabetically.
    let items = router.search("").await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title, "Terminal");
    assert_eq!(items[1].title, "Calculator");
    assert_eq!(items[2].title, "Firefox");

    // Fuzzy query: only matching entries survive.
    let items = router.search("fire").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Firefox");

    Ok(())
}

#[tokio::test]
async fn test_repeat_queries_hit_the_cache_until_rebuild() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.install_app("calc.desktop", CALCULATOR)?;

    let cache = Arc::new(ResultCache::new(16, Duration::from_secs(1800)));
    let router = router_with(cache.clone());
    router.register(Arc::new(harness.apps_provider(harness.tracker())))?;

    let first = router.search("calculator").await;
    assert_eq!(first.len(), 1);
    assert_eq!(cache.stats().misses, 1);

    let second = router.search("calculator").await;
    assert_eq!(second, first);
    assert_eq!(cache.stats().hits, 1);

    // A new desktop entry changes the data set; rebuild drops every cached
    // row so the stale list cannot be served.
    harness.install_app("firefox.desktop", FIREFOX)?;
    router.rebuild().await?;
    assert!(cache.is_empty());

    let third = router.search("calculator").await;
    assert_eq!(third.len(), 1);
    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 1);

    Ok(())
}

#[tokio::test]
async fn test_data_generation_change_bypasses_cached_rows() {
    let provider = Arc::new(MockProvider::new("apps").with_fingerprint("gen-1"));
    let cache = Arc::new(ResultCache::new(16, Duration::from_secs(1800)));
    let router = router_with(cache.clone());
    router.register(provider.clone()).unwrap();

    router.search("files").await;
    router.search("files").await;
    assert_eq!(provider.populate_calls(), 1);

    // Same query against a new generation must reach the provider again,
    // even though the old entry is still sitting in the cache.
    provider.set_fingerprint("gen-2");
    router.search("files").await;

    assert_eq!(provider.populate_calls(), 2);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn test_identical_rows_collapse_across_desktop_files() -> Result<()> {
    let harness = TestHarness::new()?;
    harness.install_app("firefox.desktop", FIREFOX)?;
    harness.install_app("firefox-esr.desktop", FIREFOX)?;

    let router = router_with(Arc::new(ResultCache::new(16, Duration::from_secs(1800))));
    router.register(Arc::new(harness.apps_provider(harness.tracker())))?;

    let items = router.search("firefox").await;
    assert_eq!(items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_provider_hooks_run_in_ascending_priority_order() {
    let registry = Arc::new(HookRegistry::new());
    let router = QueryRouter::new(
        &SearchConfig::default(),
        Arc::new(ResultCache::new(4, Duration::from_secs(60))),
        registry.clone(),
    );

    let order = Arc::new(Mutex::new(Vec::new()));
    let hooks = [10, 5, 15]
        .into_iter()
        .map(|priority| {
            let order = order.clone();
            Hook::new(format!("hook-{priority}"), priority).on_select(move |_| {
                order.lock().unwrap().push(priority);
                HookOutcome::pass()
            })
        })
        .collect();

    router
        .register(Arc::new(
            MockProvider::new("hooked")
                .with_triggers(&["hooked"])
                .with_hooks(hooks),
        ))
        .unwrap();

    let executor = HookExecutor::new(registry, 4, None);
    let handled = executor
        .run_select("hooked", &ResultItem::new("row", "hooked"))
        .await
        .unwrap();

    assert!(!handled);
    assert_eq!(*order.lock().unwrap(), vec![5, 10, 15]);
}

#[tokio::test]
async fn test_enter_and_tab_hooks_reach_the_owning_provider() {
    let registry = Arc::new(HookRegistry::new());
    let router = QueryRouter::new(
        &SearchConfig::default(),
        Arc::new(ResultCache::new(4, Duration::from_secs(60))),
        registry.clone(),
    );

    let hooks = vec![
        Hook::new("start", 5).on_enter(|text| {
            if text.starts_with("t ") {
                HookOutcome::handled()
            } else {
                HookOutcome::pass()
            }
        }),
        Hook::new("complete", 10).on_tab(|text| Some(format!("{text}imer"))),
    ];
    router
        .register(Arc::new(
            MockProvider::new("timers")
                .with_triggers(&["t"])
                .with_hooks(hooks),
        ))
        .unwrap();

    let executor = HookExecutor::new(registry, 4, None);
    assert!(executor.run_enter("timers", "t 5m").await.unwrap());
    assert!(!executor.run_enter("timers", "other").await.unwrap());
    assert_eq!(
        executor.run_tab("timers", "t").await.unwrap(),
        Some("timer".to_string())
    );
}

#[tokio::test]
async fn test_calc_selection_is_absorbed_by_its_hook() -> Result<()> {
    let harness = TestHarness::new()?;
    let engine = harness.engine()?;

    let items = engine.search("= 12*12").await;
    assert_eq!(items[0].title, "144");

    engine.item_selected(&items[0]).await?;
    assert!(engine.usage().is_empty());

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_launch_history_survives_engine_restart() -> Result<()> {
    let harness = TestHarness::new()?;

    {
        let engine = harness.engine()?;
        let items = engine.search("run true").await;
        assert!(!items.is_empty());
        engine.item_selected(&items[0]).await?;
        engine.shutdown().await;
    }

    let engine = harness.engine()?;
    let record = engine.usage().get("true").expect("record should persist");
    assert_eq!(record.launch_count, 1);
    engine.shutdown().await;
    Ok(())
}
