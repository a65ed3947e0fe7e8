//! # Platform Adapter Traits
//!
//! Contract between the sync engine and the book platforms it talks to.
//!
//! ## Overview
//!
//! This crate defines the capability surface every platform integration must
//! satisfy. The engine core depends only on these traits; each platform
//! (the canonical audiobook server and the secondary reading trackers) ships
//! a concrete adapter crate implementing them.
//!
//! ## Traits
//!
//! - [`PlatformAdapter`](adapter::PlatformAdapter) - Library enumeration,
//!   progress reads, book search, identifier lookup, progress writes
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport the adapters
//!   run their requests through
//!
//! ## Capability gaps
//!
//! Not every platform supports every call. A platform without an ISBN lookup
//! reports [`PlatformError::NotSupported`](error::PlatformError::NotSupported)
//! rather than an empty result, so callers can tell a missing capability from
//! a lookup that genuinely found nothing.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` bounds so adapters can be shared across
//! async tasks behind `Arc<dyn ...>`.

pub mod adapter;
pub mod error;
pub mod http;
pub mod kind;
pub mod types;

pub use error::{PlatformError, Result};

// Re-export commonly used types
pub use adapter::PlatformAdapter;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use kind::PlatformKind;
pub use types::{Candidate, ItemSummary, LibraryRef, ProgressSnapshot};
