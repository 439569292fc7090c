pub mod apps;
pub mod history;
pub mod interactive;
pub mod providers;
pub mod query;
pub mod rebuild;
pub mod stats;
