//! # stickerchart-core
//!
//! Core library for stickerchart - reward charts for kids, with a sticker
//! history that shows who added what and when.
//!
//! This library provides:
//! - Domain types for people, charts, quick actions, and stickers
//! - The history grouper (day, then time-window batch, then stickers)
//! - A reducer-based store for app state
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use stickerchart_core::{Config, Database, HistoryView};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let chart = &db.list_charts().expect("failed to list charts")[0];
//! let mut view = HistoryView::new(chart.id.clone(), config.history, chrono::Utc::now());
//! view.set_events(db.list_stickers(&chart.id).unwrap(), chrono::Utc::now());
//! for day in view.groups_local() {
//!     println!("{} ({} stickers)", day.day, day.total_count);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use history::{Batch, DayGroup, HistoryView, SyncMetadataSource};
pub use store::{reduce, Action, AppState, Effect, Store};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod history;
pub mod logging;
pub mod store;
pub mod types;
