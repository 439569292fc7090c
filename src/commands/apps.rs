use anyhow::Result;

use crate::frecency::UsageTracker;
use crate::Config;

/// Run the apps command
///
/// Prints the highest-scoring items from the usage history, the same
/// ordering the default provider uses for an empty query.
pub async fn run(limit: usize) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let tracker = UsageTracker::load(config.usage_path()?);

    let top = tracker.top(limit);
    if top.is_empty() {
        println!("No launch history yet");
        return Ok(());
    }

    println!("{:<40} {:>8}", "Name", "Score");
    for (name, score) in top {
        println!("{:<40} {:>8.1}", name, score);
    }

    Ok(())
}
