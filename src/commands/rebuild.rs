use anyhow::Result;
use std::time::Instant;

use crate::engine::Engine;
use crate::Config;

/// Run the rebuild command
///
/// Rescans the application index and invalidates the result cache.
pub async fn run() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let engine = Engine::new(&config)?;

    let started = Instant::now();
    engine.rebuild().await?;

    println!(
        "Rebuilt application index in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    println!("Fingerprint: {}", engine.current_fingerprint());

    engine.shutdown().await;
    Ok(())
}
