//! # Book Matcher
//!
//! Resolves canonical books to their editions on secondary platforms and
//! persists the results as [`PlatformMapping`] rows.
//!
//! Resolution runs three stages in order, stopping at the first hit:
//!
//! 1. **Existing mapping**: a stored mapping for the (book, platform) pair is
//!    reused as-is. Manual overrides are never revisited.
//! 2. **ISBN lookup**: when the book carries an ISBN and the platform supports
//!    identifier lookup, an exact hit is stored with confidence 1.0.
//! 3. **Title/author search**: candidates from the platform's search are
//!    scored with [`token_set_ratio`] against "title author". The strictly
//!    highest score wins if it clears the acceptance threshold, and the
//!    mapping is stored with `confidence = score / 100`.
//!
//! A book that fails every stage stays unmapped. No record is written for a
//! failed attempt, so the next run retries it from scratch.

use std::sync::Arc;

use core_runtime::events::{EngineEvent, EventBus, MatchEvent, PlatformEvent};
use core_store::{CanonicalBook, MappingRepository, PlatformMapping};
use platform_traits::{Candidate, PlatformKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::registry::PlatformRegistry;
use crate::similarity::token_set_ratio;

/// Result of resolving one (book, platform) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A mapping exists for the pair, stored now or on an earlier run
    Mapped(PlatformMapping),
    /// No candidate cleared the acceptance threshold
    NoMatch,
}

/// Aggregate counts from one batch matching run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Books iterated before the run ended or was cancelled
    pub books_examined: u64,
    /// New mappings created across all platforms
    pub matched: u64,
    /// (book, platform) pairs where no candidate was acceptable
    pub unmatched: u64,
    /// (book, platform) pairs where the platform call faulted
    pub failed: u64,
    /// New mappings per platform, in request order
    pub per_platform: Vec<(PlatformKind, u64)>,
}

/// Resolves canonical books against secondary platform catalogs.
pub struct Matcher {
    registry: Arc<PlatformRegistry>,
    mappings: Arc<dyn MappingRepository>,
    event_bus: Arc<EventBus>,
    candidate_limit: u32,
    accept_threshold: f64,
}

impl Matcher {
    pub fn new(
        registry: Arc<PlatformRegistry>,
        mappings: Arc<dyn MappingRepository>,
        event_bus: Arc<EventBus>,
        candidate_limit: u32,
        accept_threshold: f64,
    ) -> Self {
        Self {
            registry,
            mappings,
            event_bus,
            candidate_limit,
            accept_threshold,
        }
    }

    /// Resolve one book on one platform, persisting any new mapping.
    ///
    /// Returns the stored mapping, existing or newly created, or
    /// [`MatchOutcome::NoMatch`] when no candidate is acceptable.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PlatformNotRegistered` if no adapter is registered
    /// for `platform`, `SyncError::Platform` if a platform call faults (a
    /// missing capability is not a fault), and `SyncError::Store` if reading
    /// or writing mappings fails.
    #[instrument(skip(self, book), fields(book_id = %book.id, platform = %platform))]
    pub async fn resolve(
        &self,
        book: &CanonicalBook,
        platform: PlatformKind,
    ) -> Result<MatchOutcome> {
        if let Some(existing) = self.mappings.find(&book.id, platform).await? {
            debug!(
                confidence = existing.confidence,
                is_manual = existing.is_manual_override(),
                "Reusing stored mapping"
            );
            return Ok(MatchOutcome::Mapped(existing));
        }

        let adapter =
            self.registry
                .get(platform)
                .ok_or_else(|| SyncError::PlatformNotRegistered {
                    platform: platform.as_str().to_string(),
                })?;

        if let Some(isbn) = book.isbn.as_deref() {
            match adapter.get_by_identifier(isbn).await {
                Ok(Some(candidate)) => {
                    let mapping =
                        PlatformMapping::exact(book.id.clone(), platform, candidate.id.clone());
                    self.mappings.insert(&mapping).await?;

                    info!(platform_book_id = %candidate.id, "Matched by ISBN");
                    self.event_bus
                        .emit(EngineEvent::Match(MatchEvent::Resolved {
                            book_id: book.id.clone(),
                            title: book.title.clone(),
                            platform,
                            confidence: 1.0,
                        }))
                        .ok();

                    return Ok(MatchOutcome::Mapped(mapping));
                }
                Ok(None) => {
                    debug!(isbn, "No ISBN hit, falling back to search");
                }
                Err(e) if e.is_capability_gap() => {
                    self.event_bus
                        .emit(EngineEvent::Platform(PlatformEvent::CapabilitySkipped {
                            platform,
                            capability: "ISBN lookup".to_string(),
                        }))
                        .ok();
                }
                Err(e) => return Err(SyncError::Platform(e.to_string())),
            }
        }

        let query = format!("{} {}", book.title, book.author);
        let candidates = match adapter.search_books(&query, self.candidate_limit).await {
            Ok(candidates) => candidates,
            Err(e) if e.is_capability_gap() => {
                self.event_bus
                    .emit(EngineEvent::Platform(PlatformEvent::CapabilitySkipped {
                        platform,
                        capability: "search".to_string(),
                    }))
                    .ok();
                return Ok(MatchOutcome::NoMatch);
            }
            Err(e) => return Err(SyncError::Platform(e.to_string())),
        };

        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in &candidates {
            let score = token_set_ratio(&query, &candidate.search_text());
            debug!(candidate_id = %candidate.id, score, "Scored candidate");

            // Ties keep the earlier candidate; platforms rank their own results
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((candidate, score)) if score >= self.accept_threshold => {
                let confidence = score / 100.0;
                let mapping = PlatformMapping::heuristic(
                    book.id.clone(),
                    platform,
                    candidate.id.clone(),
                    confidence,
                );
                self.mappings.insert(&mapping).await?;

                info!(
                    platform_book_id = %candidate.id,
                    score,
                    "Matched by title/author search"
                );
                self.event_bus
                    .emit(EngineEvent::Match(MatchEvent::Resolved {
                        book_id: book.id.clone(),
                        title: book.title.clone(),
                        platform,
                        confidence,
                    }))
                    .ok();

                Ok(MatchOutcome::Mapped(mapping))
            }
            _ => {
                debug!(
                    candidates = candidates.len(),
                    "No candidate cleared the acceptance threshold"
                );
                self.event_bus
                    .emit(EngineEvent::Match(MatchEvent::Unmatched {
                        book_id: book.id.clone(),
                        title: book.title.clone(),
                    }))
                    .ok();

                Ok(MatchOutcome::NoMatch)
            }
        }
    }

    /// Resolve every book against every requested platform.
    ///
    /// Pairs that already have a mapping are skipped without touching the
    /// platform. Adapter faults are counted per pair and the run continues;
    /// store faults and unregistered platforms abort it. Cancellation is
    /// honored between books, returning the counts accumulated so far.
    #[instrument(skip_all, fields(books = books.len(), platforms = platforms.len()))]
    pub async fn match_all(
        &self,
        books: &[CanonicalBook],
        platforms: &[PlatformKind],
        cancellation: &CancellationToken,
    ) -> Result<MatchReport> {
        let total = books.len() as u64;
        let mut report = MatchReport {
            per_platform: platforms.iter().map(|&p| (p, 0)).collect(),
            ..MatchReport::default()
        };

        for book in books {
            if cancellation.is_cancelled() {
                info!(
                    books_examined = report.books_examined,
                    "Matching run cancelled"
                );
                break;
            }

            report.books_examined += 1;
            self.event_bus
                .emit(EngineEvent::Match(MatchEvent::Progress {
                    current: report.books_examined,
                    total,
                }))
                .ok();

            for (slot, &platform) in platforms.iter().enumerate() {
                // Already mapped on this platform, nothing to do
                if self.mappings.find(&book.id, platform).await?.is_some() {
                    continue;
                }

                match self.resolve(book, platform).await {
                    Ok(MatchOutcome::Mapped(_)) => {
                        report.matched += 1;
                        report.per_platform[slot].1 += 1;
                    }
                    Ok(MatchOutcome::NoMatch) => report.unmatched += 1,
                    Err(e @ (SyncError::Store(_) | SyncError::PlatformNotRegistered { .. })) => {
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(book_id = %book.id, %platform, error = %e, "Match attempt failed");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            books_examined = report.books_examined,
            matched = report.matched,
            unmatched = report.unmatched,
            failed = report.failed,
            "Matching run finished"
        );

        Ok(report)
    }
}
