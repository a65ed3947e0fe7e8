//! # Canonical Store Module
//!
//! Owns the sync engine's SQLite database and provides repository patterns
//! for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repository patterns for canonical books and platform mappings
//! - Connection pool tuning for concurrent access from passes

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{BookId, CanonicalBook, MappingId, PlatformMapping};
pub use repositories::{
    BookRepository, MappingRepository, SqliteBookRepository, SqliteMappingRepository,
};
