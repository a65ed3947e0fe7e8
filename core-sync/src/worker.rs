//! # Sync Worker
//!
//! Pushes one book's listening progress to every secondary platform it is
//! mapped to. Platforms are attempted independently: a fault on one never
//! stops the push to the next, and the outcome records each platform's
//! result separately.
//!
//! After the attempts, the book's last-synced timestamp is stamped even when
//! every push failed. The timestamp records that a sync attempt covered the
//! book, not that progress was delivered. A book with no mappings is left
//! unstamped and reports failure without touching any platform.

use std::sync::Arc;

use core_runtime::events::{EngineEvent, EventBus, PlatformEvent};
use core_store::{BookRepository, CanonicalBook, MappingRepository};
use platform_traits::PlatformKind;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::registry::PlatformRegistry;

/// Result of one platform push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    /// The platform accepted the update
    Synced,
    /// The update was not delivered, with the reason
    Failed(String),
}

/// Result of syncing one book across its mapped platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// True when at least one platform accepted the update
    pub succeeded: bool,
    /// Each attempted platform with its individual result
    pub per_platform: Vec<(PlatformKind, PushStatus)>,
}

/// Pushes canonical progress out to mapped secondary platforms.
pub struct SyncWorker {
    registry: Arc<PlatformRegistry>,
    books: Arc<dyn BookRepository>,
    mappings: Arc<dyn MappingRepository>,
    event_bus: Arc<EventBus>,
}

impl SyncWorker {
    pub fn new(
        registry: Arc<PlatformRegistry>,
        books: Arc<dyn BookRepository>,
        mappings: Arc<dyn MappingRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            books,
            mappings,
            event_bus,
        }
    }

    /// Push the book's current progress to every platform it is mapped to.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if reading mappings or stamping the
    /// last-synced timestamp fails. Platform faults do not error; they are
    /// reported per platform in the outcome.
    #[instrument(skip(self, book), fields(book_id = %book.id, title = %book.title))]
    pub async fn sync_progress(&self, book: &CanonicalBook) -> Result<SyncOutcome> {
        let mappings = self.mappings.find_all_for_book(&book.id).await?;

        if mappings.is_empty() {
            debug!("No platform mappings for book");
            return Ok(SyncOutcome {
                succeeded: false,
                per_platform: Vec::new(),
            });
        }

        let mut per_platform = Vec::with_capacity(mappings.len());

        for mapping in &mappings {
            let status = self.push_to_platform(book, mapping.platform, &mapping.platform_book_id).await;

            if let PushStatus::Failed(ref message) = status {
                warn!(platform = %mapping.platform, error = %message, "Progress push failed");
                self.event_bus
                    .emit(EngineEvent::Platform(PlatformEvent::UpdateFailed {
                        platform: mapping.platform,
                        book_id: book.id.clone(),
                        message: message.clone(),
                    }))
                    .ok();
            }

            per_platform.push((mapping.platform, status));
        }

        // The stamp records the attempt itself, including all-failed runs
        self.books.touch_last_synced(&book.id).await?;

        let succeeded = per_platform
            .iter()
            .any(|(_, status)| *status == PushStatus::Synced);

        Ok(SyncOutcome {
            succeeded,
            per_platform,
        })
    }

    async fn push_to_platform(
        &self,
        book: &CanonicalBook,
        platform: PlatformKind,
        platform_book_id: &str,
    ) -> PushStatus {
        // A percentage cannot be derived without a duration; pushing 0%
        // would clobber real progress on the platform
        if book.total_duration <= 0.0 {
            return PushStatus::Failed("Total duration is 0, cannot derive a percentage".to_string());
        }

        let Some(adapter) = self.registry.get(platform) else {
            return PushStatus::Failed(format!("Platform {platform} is not registered"));
        };

        let percent = (book.progress / book.total_duration * 100.0).clamp(0.0, 100.0);
        let is_finished = book.is_finished != 0;

        match adapter.update_progress(platform_book_id, percent, is_finished).await {
            Ok(true) => {
                info!(%platform, percent = format!("{percent:.1}"), "Progress pushed");
                PushStatus::Synced
            }
            Ok(false) => PushStatus::Failed("Platform rejected the update".to_string()),
            Err(e) => PushStatus::Failed(e.to_string()),
        }
    }
}
