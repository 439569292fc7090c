//! Debounce and staleness behavior of the session controller, driven on a
//! paused clock so every deadline is exact.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use launchkit::cache::ResultCache;
use launchkit::config::SearchConfig;
use launchkit::hooks::HookRegistry;
use launchkit::providers::mock::MockProvider;
use launchkit::router::QueryRouter;
use launchkit::session::SessionController;

const BASE_DEBOUNCE: Duration = Duration::from_millis(150);

fn session_with_default(provider: Arc<MockProvider>) -> SessionController {
    let router = Arc::new(QueryRouter::new(
        &SearchConfig::default(),
        Arc::new(ResultCache::new(16, Duration::from_secs(1800))),
        Arc::new(HookRegistry::new()),
    ));
    router.register(provider).unwrap();
    SessionController::new(router, BASE_DEBOUNCE)
}

#[tokio::test(start_paused = true)]
async fn test_newer_keystroke_replaces_pending_deadline() {
    let provider = Arc::new(MockProvider::new("apps"));
    let session = session_with_default(provider.clone());
    let mut updates = session.take_updates().unwrap();

    // "f" alone would fire at t=50ms, but "fi" arrives at t=20ms and moves
    // the deadline to t=120ms; only the second query ever runs.
    session.query_changed("f");
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.query_changed("fi");

    let update = updates.next().await.unwrap();
    assert_eq!(update.version, 2);
    assert_eq!(update.query, "fi");
    assert_eq!(provider.populate_calls(), 1);

    let nothing_more = timeout(Duration::from_secs(1), updates.next()).await;
    assert!(nothing_more.is_err());

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_debounce_delay_scales_with_query_length() {
    let provider = Arc::new(MockProvider::new("apps"));
    let session = session_with_default(provider.clone());
    let mut updates = session.take_updates().unwrap();

    // 1 character: 50ms.
    session.query_changed("f");
    assert!(timeout(Duration::from_millis(49), updates.next())
        .await
        .is_err());
    assert!(timeout(Duration::from_millis(5), updates.next())
        .await
        .is_ok());

    // 2-3 characters: 100ms.
    session.query_changed("fir");
    assert!(timeout(Duration::from_millis(99), updates.next())
        .await
        .is_err());
    assert!(timeout(Duration::from_millis(5), updates.next())
        .await
        .is_ok());

    // 4+ characters: the configured base.
    session.query_changed("fire");
    assert!(timeout(Duration::from_millis(149), updates.next())
        .await
        .is_err());
    assert!(timeout(Duration::from_millis(5), updates.next())
        .await
        .is_ok());

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_skips_the_debounce_window() {
    let provider = Arc::new(MockProvider::new("apps"));
    let session = session_with_default(provider.clone());
    let mut updates = session.take_updates().unwrap();

    session.query_changed("");

    // No debounce at all: the update is ready before the clock moves 1ms.
    let update = timeout(Duration::from_millis(1), updates.next())
        .await
        .expect("empty query should fire without debounce")
        .unwrap();
    assert_eq!(update.version, 1);
    assert_eq!(update.query, "");

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_result_never_surfaces() {
    let provider = Arc::new(
        MockProvider::new("apps").with_query_delay("slow query", Duration::from_millis(400)),
    );
    let session = session_with_default(provider.clone());
    let mut updates = session.take_updates().unwrap();

    // v1 starts searching at t=150 and would finish at t=550; v2 supersedes
    // it at t=200 and finishes at t=350.
    session.query_changed("slow query");
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.query_changed("fast");

    let update = updates.next().await.unwrap();
    assert_eq!(update.version, 2);
    assert_eq!(update.query, "fast");

    // The v1 result completes later but is version-stale and dropped.
    let nothing_more = timeout(Duration::from_secs(1), updates.next()).await;
    assert!(nothing_more.is_err());
    assert_eq!(provider.populate_calls(), 2);

    session.shutdown().await;
}
