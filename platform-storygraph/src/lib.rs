//! # Storygraph Platform
//!
//! Implements `PlatformAdapter` for the Storygraph site.
//!
//! ## Overview
//!
//! This module provides:
//! - Session-cookie authentication (no public API exists)
//! - Book search returning match candidates
//! - Reading progress pushes with the finished flag
//!
//! Storygraph has no ISBN lookup, so `get_by_identifier` reports
//! `NotSupported` and matching always falls through to search.

pub mod adapter;
pub mod types;

pub use adapter::{StorygraphAdapter, SITE_URL};
