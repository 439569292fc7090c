use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use launchkit::config::Config;
use launchkit::frecency::UsageTracker;
use launchkit::providers::apps::AppsProvider;
use launchkit::Engine;

/// Desktop entries shared across the integration tests.
pub const FIREFOX: &str = "[Desktop Entry]\n\
    Type=Application\n\
    Name=Firefox\n\
    Comment=Web Browser\n\
    Exec=firefox %u\n\
    Icon=firefox\n\
    Keywords=internet;browser;\n";

pub const CALCULATOR: &str = "[Desktop Entry]\n\
    Type=Application\n\
    Name=Calculator\n\
    GenericName=Desktop Calculator\n\
    Exec=gnome-calculator\n";

pub const TERMINAL: &str = "[Desktop Entry]\n\
    Type=Application\n\
    Name=Terminal\n\
    Comment=Terminal Emulator\n\
    Exec=xterm\n";

pub struct TestHarness {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    /// Temp-dir backed setup: the usage file lands inside the temp dir so
    /// tests never touch the real platform data directory.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut config = Config::default();
        config.history.file = Some(temp_dir.path().join("usage.json"));

        Ok(Self { temp_dir, config })
    }

    /// Engine built from the harness config, with the real built-in
    /// providers registered. Must be called inside a tokio runtime.
    pub fn engine(&self) -> Result<Engine> {
        Engine::new(&self.config)
    }

    /// Write a desktop entry into the harness application directory.
    pub fn install_app(&self, file: &str, content: &str) -> Result<PathBuf> {
        let apps_dir = self.apps_dir();
        std::fs::create_dir_all(&apps_dir)?;
        let path = apps_dir.join(file);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.temp_dir.path().join("applications")
    }

    /// Usage tracker persisting into the harness temp dir.
    pub fn tracker(&self) -> Arc<UsageTracker> {
        Arc::new(UsageTracker::load(self.temp_dir.path().join("usage.json")))
    }

    /// Application provider scanning only the harness directory.
    pub fn apps_provider(&self, usage: Arc<UsageTracker>) -> AppsProvider {
        AppsProvider::with_dirs(vec![self.apps_dir()], false, usage)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
