pub mod action;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod frecency;
pub mod hooks;
pub mod item;
pub mod logging;
pub mod metrics;
pub mod providers;
pub mod router;
pub mod session;

pub use action::Action;
pub use config::Config;
pub use engine::Engine;
pub use item::ResultItem;
