use anyhow::Result;

use crate::engine::Engine;
use crate::item::ResultItem;
use crate::Config;

/// Run the query command
///
/// Routes `text` exactly as the palette would: a leading trigger token
/// dispatches to its provider, anything else goes to the default provider.
///
/// # Arguments
///
/// * `text` - The query text, trigger syntax included
/// * `limit` - Maximum number of results to print
pub async fn run(text: &str, limit: Option<usize>) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let engine = Engine::new(&config)?;

    let results = engine.search(text).await;

    if results.is_empty() {
        println!("No results for: {}", text);
        engine.shutdown().await;
        return Ok(());
    }

    let shown = limit.unwrap_or(results.len()).min(results.len());
    println!("Found {} result(s) for: \"{}\"\n", results.len(), text);

    for (i, item) in results.iter().take(shown).enumerate() {
        print_item(i + 1, item);
    }

    engine.shutdown().await;
    Ok(())
}

fn print_item(rank: usize, item: &ResultItem) {
    println!("{:>2}. {}  [{}]", rank, item.title, item.provider);
    if !item.subtitle.is_empty() {
        println!("    {}", item.subtitle);
    }
}
