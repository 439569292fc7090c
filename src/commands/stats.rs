//! Stats command for displaying engine statistics and metrics

use anyhow::Result;

use crate::engine::Engine;
use crate::metrics::{gather_metrics, MetricSnapshot};
use crate::Config;

/// Run the stats command
///
/// Displays current engine statistics and metrics.
///
/// # Arguments
/// * `prometheus` - If true, output in Prometheus text format
pub async fn run(prometheus: bool) -> Result<()> {
    if prometheus {
        return run_prometheus().await;
    }
    run_human_readable().await
}

/// Run the stats command with human-readable output
async fn run_human_readable() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    // Engine construction scans the app index, which refreshes the
    // indexed-apps gauge before the snapshot is taken
    let engine = Engine::new(&config)?;

    let snapshot = MetricSnapshot::capture();
    let cache = engine.cache_stats();
    let hooks = engine.hook_stats();
    let tracked = engine.usage().len();

    println!("Launchkit Engine Statistics");
    println!("===========================\n");

    println!("Index:");
    println!("  Applications:  {:.0}", snapshot.indexed_apps);
    println!("  Tracked items: {}", tracked);
    println!();

    println!("Search:");
    println!("  Requests:      {:.0}", snapshot.search_requests_total);
    if snapshot.search_requests_total > 0.0 {
        println!("  Avg latency:   {:.3}s", snapshot.search_latency_avg);
        println!("  Avg results:   {:.1}", snapshot.search_results_avg);
    }
    println!("  Stale dropped: {:.0}", snapshot.stale_results_dropped);
    println!();

    println!("Cache:");
    println!("  Entries:       {}", cache.entries);
    println!("  Hits:          {}", cache.hits);
    println!("  Misses:        {}", cache.misses);
    println!("  Evictions:     {}", cache.evictions);
    println!();

    println!("Hooks:");
    println!("  Executions:    {}", hooks.total);
    println!("  Failed:        {}", hooks.failed);
    if hooks.total > 0 {
        println!("  Avg latency:   {:.2}ms", hooks.avg_latency_ms);
    }

    engine.shutdown().await;
    Ok(())
}

/// Run the stats command with Prometheus format output
///
/// Outputs all metrics in Prometheus text exposition format,
/// suitable for scraping by Prometheus or other monitoring tools.
async fn run_prometheus() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    // Constructed for the gauge side effects, same as the readable path
    let engine = Engine::new(&config)?;

    print!("{}", gather_metrics());

    engine.shutdown().await;
    Ok(())
}
