use anyhow::Result;

use crate::engine::Engine;
use crate::Config;

/// Run the providers command
///
/// Lists every registered provider with its trigger tokens; the provider
/// without triggers is the default route for untriggered queries.
pub async fn run() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let engine = Engine::new(&config)?;

    let triggers = engine.trigger_map();

    println!("Registered providers:\n");
    for name in engine.provider_names() {
        let tokens: Vec<&str> = triggers
            .iter()
            .filter(|(_, owner)| owner == &name)
            .map(|(token, _)| token.as_str())
            .collect();

        if tokens.is_empty() {
            println!("  {:<10} (default)", name);
        } else {
            println!("  {:<10} triggers: {}", name, tokens.join(", "));
        }
    }

    engine.shutdown().await;
    Ok(())
}
