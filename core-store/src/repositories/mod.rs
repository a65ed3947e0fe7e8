//! Repository traits and SQLite implementations
//!
//! Each repository follows the same pattern:
//! - An async trait defining the storage interface
//! - A SQLite implementation backed by the shared connection pool
//!
//! Traits are object safe so engine components can hold them as
//! `Arc<dyn BookRepository>` and tests can substitute mocks.

pub mod book;
pub mod mapping;

pub use book::{BookRepository, SqliteBookRepository};
pub use mapping::{MappingRepository, SqliteMappingRepository};
