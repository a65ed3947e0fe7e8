//! # Hardcover Platform
//!
//! Implements `PlatformAdapter` for the Hardcover GraphQL API.
//!
//! ## Overview
//!
//! This module provides:
//! - Token authentication against api.hardcover.app
//! - Book search and ISBN lookup returning match candidates
//! - Reading progress pushes via the `updateReadingProgress` mutation
//! - Bounded retry with exponential backoff for 429/5xx responses
//!
//! Hardcover is a secondary platform: library enumeration and progress reads
//! report `NotSupported`.

pub mod adapter;
pub mod types;

pub use adapter::{HardcoverAdapter, API_URL};
