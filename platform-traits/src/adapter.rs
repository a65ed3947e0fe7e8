//! Platform Adapter Contract
//!
//! The uniform capability surface the sync engine consumes from every
//! platform integration.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Candidate, ItemSummary, LibraryRef, ProgressSnapshot};

/// Uniform async contract for one book platform.
///
/// One implementation exists per platform: the canonical audiobook server
/// plus each secondary reading tracker. Calls are fallible independently;
/// a capability the platform lacks raises
/// [`PlatformError::NotSupported`](crate::error::PlatformError::NotSupported)
/// so callers can fall through to another strategy instead of treating the
/// gap as a fault.
///
/// # Example
///
/// ```ignore
/// use platform_traits::{PlatformAdapter, Candidate};
///
/// async fn first_match(adapter: &dyn PlatformAdapter, isbn: &str) -> Option<Candidate> {
///     match adapter.get_by_identifier(isbn).await {
///         Ok(found) => found,
///         Err(e) if e.is_capability_gap() => None,
///         Err(_) => None,
///     }
/// }
/// ```
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// List the user's libraries.
    ///
    /// Canonical platform only; secondary platforms report `NotSupported`.
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>>;

    /// List all items in one library.
    ///
    /// Canonical platform only.
    async fn list_items(&self, library_id: &str) -> Result<Vec<ItemSummary>>;

    /// Fetch the current listening state for one item.
    ///
    /// Returns `Ok(None)` when the platform has no progress recorded for the
    /// item. Canonical platform only.
    async fn get_progress(&self, item_id: &str) -> Result<Option<ProgressSnapshot>>;

    /// Search the platform's catalog.
    ///
    /// Returns up to `limit` candidates in the platform's relevance order.
    async fn search_books(&self, query: &str, limit: u32) -> Result<Vec<Candidate>>;

    /// Look a book up by exact identifier (ISBN).
    ///
    /// Optional capability. Returns `Ok(None)` when the lookup found nothing;
    /// platforms without identifier lookup report `NotSupported`.
    async fn get_by_identifier(&self, isbn: &str) -> Result<Option<Candidate>>;

    /// Push reading progress for a book.
    ///
    /// `percent` is in [0, 100]; `is_finished` is passed through where the
    /// platform models it. Returns `Ok(false)` when the platform accepted the
    /// call but reported the update unsuccessful.
    async fn update_progress(
        &self,
        platform_book_id: &str,
        percent: f64,
        is_finished: bool,
    ) -> Result<bool>;

    /// Verify the stored credential still works
    async fn validate_connection(&self) -> Result<bool>;
}
