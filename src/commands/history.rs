//! History command for inspecting and editing the launch history

use anyhow::Result;

use crate::frecency::UsageTracker;
use crate::Config;

fn tracker() -> Result<UsageTracker> {
    let config = Config::load().unwrap_or_default();
    Ok(UsageTracker::load(config.usage_path()?))
}

/// Record one launch for `name`, as if it had been selected in the palette.
pub async fn record(name: String) -> Result<()> {
    let tracker = tracker()?;
    tracker.record_launch(&name);

    let count = tracker.get(&name).map(|r| r.launch_count).unwrap_or(1);
    println!("Recorded launch of '{}' ({} total)", name, count);
    Ok(())
}

/// Print the highest-scoring items with their launch counts.
pub async fn top(limit: usize) -> Result<()> {
    let tracker = tracker()?;

    let top = tracker.top(limit);
    if top.is_empty() {
        println!("No launch history yet");
        return Ok(());
    }

    println!("{:<40} {:>8} {:>8}", "Name", "Score", "Count");
    for (name, score) in top {
        let count = tracker.get(&name).map(|r| r.launch_count).unwrap_or(0);
        println!("{:<40} {:>8.1} {:>8}", name, score, count);
    }

    Ok(())
}

/// Remove one item's history, or everything when `name` is `None`.
pub async fn clear(name: Option<String>) -> Result<()> {
    let tracker = tracker()?;

    match name {
        Some(name) => {
            if tracker.remove(&name) {
                println!("Removed history for '{}'", name);
            } else {
                println!("No history for '{}'", name);
            }
        }
        None => {
            let count = tracker.len();
            tracker.clear();
            println!("Cleared history ({} item(s))", count);
        }
    }

    Ok(())
}
