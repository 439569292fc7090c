//! Result cache behavior through the public surface: fingerprint keying,
//! duration-tiered TTL, and eviction ordering under capacity pressure.

use std::thread::sleep;
use std::time::Duration;

use launchkit::cache::ResultCache;
use launchkit::item::ResultItem;

fn item(title: &str) -> ResultItem {
    ResultItem::new(title, "mock")
}

#[test]
fn test_fingerprint_mismatch_is_always_a_miss() {
    let cache = ResultCache::new(16, Duration::from_secs(1800));
    cache.put(
        "query",
        "3:Alpha:Zulu",
        vec![item("Alpha")],
        Duration::from_millis(5),
    );

    // Same query, different data generation: never served.
    assert!(cache.get("query", "4:Alpha:Extra").is_none());
    assert!(cache.get("query", "3:Alpha:Zulu").is_some());

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_expensive_entries_are_evicted_before_cheap_ones() {
    let cache = ResultCache::new(2, Duration::from_secs(3600));

    // Same age, wildly different production cost.
    cache.put("cheap", "fp", vec![item("a")], Duration::from_millis(10));
    cache.put(
        "expensive",
        "fp",
        vec![item("b")],
        Duration::from_millis(500),
    );

    cache.put("incoming", "fp", vec![item("c")], Duration::from_millis(10));

    assert!(cache.get("cheap", "fp").is_some());
    assert!(cache.get("expensive", "fp").is_none());
    assert!(cache.get("incoming", "fp").is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_slow_results_expire_sooner_than_fast_ones() {
    // Slow production gets a sixth of the max age: 2000ms / 6 = 333ms.
    let cache = ResultCache::new(16, Duration::from_millis(2000));

    cache.put("slow", "fp", vec![item("a")], Duration::from_millis(150));
    cache.put("fast", "fp", vec![item("b")], Duration::from_millis(10));

    sleep(Duration::from_millis(400));

    assert!(cache.get("slow", "fp").is_none());
    assert!(cache.get("fast", "fp").is_some());
}

#[test]
fn test_lru_fallback_keeps_recently_touched_entries() {
    let cache = ResultCache::new(2, Duration::from_secs(3600));

    cache.put("first", "fp", vec![item("a")], Duration::from_millis(10));
    sleep(Duration::from_millis(10));
    cache.put("second", "fp", vec![item("b")], Duration::from_millis(10));
    sleep(Duration::from_millis(10));

    // Touching "first" leaves "second" as the least recently used entry.
    assert!(cache.get("first", "fp").is_some());
    cache.put("third", "fp", vec![item("c")], Duration::from_millis(10));

    assert!(cache.get("first", "fp").is_some());
    assert!(cache.get("second", "fp").is_none());
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_invalidate_empties_the_cache() {
    let cache = ResultCache::new(16, Duration::from_secs(1800));
    cache.put("q1", "fp", vec![item("a")], Duration::from_millis(5));
    cache.put("q2", "fp", vec![item("b")], Duration::from_millis(5));
    assert!(cache.get("q1", "fp").is_some());

    cache.invalidate();

    assert!(cache.is_empty());
    let stats = cache.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}
