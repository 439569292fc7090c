//! Interactive command: a line-based stand-in for a palette window.

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::engine::Engine;
use crate::Config;

/// Run the interactive command
///
/// Each stdin line is fed to the session controller as if it were the
/// current input-field content, so rapid lines coalesce through the
/// adaptive debounce exactly as keystrokes would. Updates print as they
/// are applied; stale ones never appear. An empty line (or EOF) exits.
pub async fn run() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let engine = Engine::new(&config)?;
    let mut updates = engine
        .take_updates()
        .ok_or_else(|| anyhow!("Update stream already taken"))?;

    println!("Type a query and press enter; an empty line exits.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if !line.trim().is_empty() => {
                        engine.query_changed(line);
                    }
                    _ => break,
                }
            }
            update = updates.next() => {
                let Some(update) = update else {
                    break;
                };
                println!(
                    "-- \"{}\" ({} result(s), v{})",
                    update.query,
                    update.items.len(),
                    update.version
                );
                for (i, item) in update.items.iter().enumerate() {
                    println!("{:>2}. {}  [{}]", i + 1, item.title, item.provider);
                }
                println!();
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
