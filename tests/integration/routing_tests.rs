//! End-to-end trigger routing through the public engine surface.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use launchkit::action::Action;
use launchkit::cache::ResultCache;
use launchkit::config::SearchConfig;
use launchkit::hooks::HookRegistry;
use launchkit::providers::mock::MockProvider;
use launchkit::router::QueryRouter;

use crate::helpers::test_harness::TestHarness;

fn mock_router() -> QueryRouter {
    QueryRouter::new(
        &SearchConfig::default(),
        Arc::new(ResultCache::new(16, Duration::from_secs(1800))),
        Arc::new(HookRegistry::new()),
    )
}

#[tokio::test]
async fn test_timer_trigger_splits_token_and_fragment() -> Result<()> {
    let harness = TestHarness::new()?;
    let engine = harness.engine()?;

    let items = engine.search(">timer 5m").await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Timer: 5m");
    assert_eq!(items[0].provider, "timer");
    assert!(matches!(
        items[0].action,
        Some(Action::Timer {
            duration_secs: 300,
            ..
        })
    ));

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_trigger_token_doubles_as_verb_namespace() -> Result<()> {
    let harness = TestHarness::new()?;
    let engine = harness.engine()?;

    // "wifi" routes to the toggles provider, which resolves the "scan"
    // fragment to the rescan entry.
    let items = engine.search("wifi scan").await;

    assert!(!items.is_empty());
    assert_eq!(items[0].title, "Wi-Fi scan");
    assert_eq!(items[0].provider, "toggles");
    assert!(matches!(
        items[0].action,
        Some(Action::Toggle { ref setting }) if setting == "scan"
    ));

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_colon_syntax_routes_like_space_syntax() -> Result<()> {
    let harness = TestHarness::new()?;
    let engine = harness.engine()?;

    let spaced = engine.search("calc 2+2").await;
    let coloned = engine.search("calc:2+2").await;

    assert_eq!(spaced.len(), 1);
    assert_eq!(spaced[0].title, "4");
    assert_eq!(coloned[0].title, spaced[0].title);

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_trigger_matching_is_case_insensitive() -> Result<()> {
    let harness = TestHarness::new()?;
    let engine = harness.engine()?;

    let items = engine.search(">CALC 6*7").await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "42");

    engine.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_text_falls_through_with_full_text() {
    let router = mock_router();
    let default = Arc::new(MockProvider::new("fallback"));
    router.register(default.clone()).unwrap();
    router
        .register(Arc::new(MockProvider::new("timer").with_triggers(&["timer"])))
        .unwrap();

    // No token of "random text" is a trigger, so the default provider sees
    // the original text unchanged.
    let items = router.search("random text").await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "fallback: random text");
}

#[tokio::test]
async fn test_bare_trigger_token_without_fragment_is_not_routed() {
    let router = mock_router();
    let default = Arc::new(MockProvider::new("fallback"));
    router.register(default.clone()).unwrap();
    router
        .register(Arc::new(MockProvider::new("calc").with_triggers(&["calc"])))
        .unwrap();

    // Without whitespace or a colon, "calc" is an ordinary default query.
    let items = router.search("calc").await;
    assert_eq!(items[0].title, "fallback: calc");

    // The ">" prefix promotes the bare token into a route.
    let items = router.search(">calc").await;
    assert_eq!(items[0].provider, "calc");
}

#[tokio::test]
async fn test_unresolvable_prefixed_text_keeps_the_prefix() {
    let router = mock_router();
    let default = Arc::new(MockProvider::new("fallback"));
    router.register(default.clone()).unwrap();

    let items = router.search(">nosuch thing").await;

    assert_eq!(items[0].title, "fallback: >nosuch thing");
}

#[tokio::test]
async fn test_triggered_provider_failure_yields_empty_results() {
    let router = mock_router();
    let provider = Arc::new(MockProvider::new("flaky").with_triggers(&["flaky"]));
    router.register(provider.clone()).unwrap();

    provider.set_failing(true);
    assert!(router.search("flaky anything").await.is_empty());

    provider.set_failing(false);
    assert_eq!(router.search("flaky anything").await.len(), 1);
}
