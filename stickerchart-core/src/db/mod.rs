//! Database layer for stickerchart
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - Effect application for the store

pub mod repo;
pub mod schema;

pub use repo::Database;
