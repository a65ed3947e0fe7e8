//! # Reconciliation Runner
//!
//! Drives the two reconciliation passes and owns their audit records:
//!
//! - **Progress sync**: pulls libraries and items from the canonical
//!   platform, upserts each book with its current progress, and pushes the
//!   progress to every mapped secondary platform through [`SyncWorker`].
//! - **Matching**: resolves unmapped books against secondary platforms
//!   through [`Matcher`].
//!
//! Each pass runs as one sequential background task under a wall-clock
//! timeout, with at most one active pass per kind. Every item boundary
//! persists the job's counters, so a crash mid-pass leaves a consistent
//! partial state. Cancellation is honored at item boundaries and finalizes
//! the job as completed with the counts accumulated so far.
//!
//! Scheduling stays outside: hosts call [`ReconciliationRunner::run_sync_pass`]
//! and [`ReconciliationRunner::run_matching_pass`] from whatever trigger
//! layer they use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use core_runtime::config::EngineConfig;
use core_runtime::events::{EngineEvent, EventBus, PassEvent, PlatformEvent};
use core_store::{
    BookRepository, MappingRepository, PlatformMapping, SqliteBookRepository,
    SqliteMappingRepository, StoreError,
};
use futures::future::join_all;
use platform_traits::{ItemSummary, PlatformAdapter, PlatformKind};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::job::{JobKind, SyncJob, SyncJobId};
use crate::matcher::Matcher;
use crate::registry::PlatformRegistry;
use crate::repository::{JobRepository, SqliteJobRepository};
use crate::worker::SyncWorker;

// ============================================================================
// Configuration
// ============================================================================

/// Runner tuning knobs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock budget for one pass before it is failed
    pub pass_timeout_secs: u64,
    /// Candidates requested per platform search during matching
    pub candidate_limit: u32,
    /// Minimum similarity score (0-100) an automatic match must reach
    pub accept_threshold: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pass_timeout_secs: 1800,
            candidate_limit: 5,
            accept_threshold: 80.0,
        }
    }
}

impl From<&EngineConfig> for RunnerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            pass_timeout_secs: config.pass_timeout_secs,
            candidate_limit: config.match_candidate_limit,
            accept_threshold: config.match_accept_threshold,
        }
    }
}

/// Store-wide totals reported to hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Books known to the canonical store
    pub total_books: i64,
    /// Books covered by at least one sync attempt
    pub synced_books: i64,
    /// Books never attempted
    pub pending_books: i64,
    /// Mapping counts per secondary platform
    pub mappings_per_platform: Vec<(PlatformKind, i64)>,
}

/// A pass currently running in a background task.
struct ActivePass {
    job_id: SyncJobId,
    cancellation_token: CancellationToken,
}

/// Work carried into a spawned pass task.
enum PassWork {
    Sync,
    Matching(Vec<PlatformKind>),
}

// ============================================================================
// Runner
// ============================================================================

/// Orchestrates reconciliation passes over the canonical store.
pub struct ReconciliationRunner {
    config: RunnerConfig,
    registry: Arc<PlatformRegistry>,
    books: Arc<dyn BookRepository>,
    mappings: Arc<dyn MappingRepository>,
    jobs: Arc<dyn JobRepository>,
    matcher: Arc<Matcher>,
    worker: Arc<SyncWorker>,
    event_bus: Arc<EventBus>,
    active_passes: Arc<Mutex<HashMap<JobKind, ActivePass>>>,
}

impl ReconciliationRunner {
    pub fn new(
        config: RunnerConfig,
        registry: Arc<PlatformRegistry>,
        books: Arc<dyn BookRepository>,
        mappings: Arc<dyn MappingRepository>,
        jobs: Arc<dyn JobRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let matcher = Arc::new(Matcher::new(
            Arc::clone(&registry),
            Arc::clone(&mappings),
            Arc::clone(&event_bus),
            config.candidate_limit,
            config.accept_threshold,
        ));
        let worker = Arc::new(SyncWorker::new(
            Arc::clone(&registry),
            Arc::clone(&books),
            Arc::clone(&mappings),
            Arc::clone(&event_bus),
        ));

        Self {
            config,
            registry,
            books,
            mappings,
            jobs,
            matcher,
            worker,
            event_bus,
            active_passes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build a runner with SQLite repositories over one pool.
    pub fn from_pool(
        config: RunnerConfig,
        registry: Arc<PlatformRegistry>,
        pool: SqlitePool,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let books: Arc<dyn BookRepository> = Arc::new(SqliteBookRepository::new(pool.clone()));
        let mappings: Arc<dyn MappingRepository> =
            Arc::new(SqliteMappingRepository::new(pool.clone()));
        let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool));

        Self::new(config, registry, books, mappings, jobs, event_bus)
    }

    /// Start a progress-sync pass in the background.
    ///
    /// Returns the job id immediately; progress is observable through
    /// [`ReconciliationRunner::job_status`] and the event bus.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PassInProgress` if a progress-sync pass is
    /// already active.
    #[instrument(skip(self))]
    pub async fn run_sync_pass(&self) -> Result<SyncJobId> {
        let (job, token) = self.begin_pass(JobKind::ProgressSync).await?;
        let job_id = job.id;

        let runner = self.clone_for_task();
        tokio::spawn(drive_pass(runner, job, token, PassWork::Sync));

        Ok(job_id)
    }

    /// Start a matching pass in the background.
    ///
    /// An empty `platforms` list means every registered secondary platform.
    /// The canonical platform is the source of truth and is never a match
    /// target.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::PlatformNotRegistered` if a requested platform has
    /// no adapter, and `SyncError::PassInProgress` if a matching pass is
    /// already active.
    #[instrument(skip(self))]
    pub async fn run_matching_pass(&self, platforms: Vec<PlatformKind>) -> Result<SyncJobId> {
        let mut platforms = if platforms.is_empty() {
            self.registry.secondary_kinds()
        } else {
            platforms
        };
        platforms.retain(|kind| !kind.is_canonical());

        for &kind in &platforms {
            if self.registry.get(kind).is_none() {
                return Err(SyncError::PlatformNotRegistered {
                    platform: kind.as_str().to_string(),
                });
            }
        }

        let (job, token) = self.begin_pass(JobKind::Matching).await?;
        let job_id = job.id;

        let runner = self.clone_for_task();
        tokio::spawn(drive_pass(runner, job, token, PassWork::Matching(platforms)));

        Ok(job_id)
    }

    /// Cancel every active pass.
    ///
    /// Each pass stops at its next item boundary and finalizes its job as
    /// completed with the counts accumulated so far.
    pub async fn shutdown(&self) {
        let active = self.active_passes.lock().await;
        for (kind, pass) in active.iter() {
            info!(kind = %kind, job_id = %pass.job_id, "Cancelling active pass");
            pass.cancellation_token.cancel();
        }
    }

    /// Fail any job rows left active by a previous process.
    ///
    /// Call once at host startup, before the first pass. Returns the number
    /// of jobs recovered.
    ///
    /// # Errors
    ///
    /// Returns an error if the store update fails.
    pub async fn recover_abandoned_jobs(&self) -> Result<u64> {
        let recovered = self.jobs.fail_abandoned("Interrupted before completion").await?;
        if recovered > 0 {
            warn!(recovered, "Marked abandoned jobs as failed");
        }
        Ok(recovered)
    }

    /// Look up one job's audit record.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::JobNotFound` if no job has the given id.
    pub async fn job_status(&self, job_id: &SyncJobId) -> Result<SyncJob> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| SyncError::JobNotFound {
                job_id: job_id.as_str(),
            })
    }

    /// Most recent jobs across both kinds, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn recent_jobs(&self, limit: u32) -> Result<Vec<SyncJob>> {
        self.jobs.recent(limit).await
    }

    /// Store-wide sync totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails.
    pub async fn sync_stats(&self) -> Result<SyncStats> {
        let total_books = self.books.count().await?;
        let synced_books = self.books.count_synced().await?;

        let mut mappings_per_platform = Vec::new();
        for kind in self.registry.secondary_kinds() {
            let count = self.mappings.count_for_platform(kind).await?;
            mappings_per_platform.push((kind, count));
        }

        Ok(SyncStats {
            total_books,
            synced_books,
            pending_books: total_books - synced_books,
            mappings_per_platform,
        })
    }

    /// Check credentials against every registered platform concurrently.
    ///
    /// A faulted check reports as unhealthy rather than erroring.
    pub async fn validate_connections(&self) -> Vec<(PlatformKind, bool)> {
        let checks = self.registry.iter().map(|(kind, adapter)| {
            let adapter = Arc::clone(adapter);
            async move {
                let healthy = adapter.validate_connection().await.unwrap_or(false);
                (kind, healthy)
            }
        });

        let results = join_all(checks).await;

        for &(kind, healthy) in &results {
            if healthy {
                info!(platform = %kind, "Platform connection verified");
            } else {
                warn!(platform = %kind, "Platform connection check failed");
            }
            self.event_bus
                .emit(EngineEvent::Platform(PlatformEvent::ConnectionChecked {
                    platform: kind,
                    healthy,
                }))
                .ok();
        }

        results
    }

    /// Pin a host-chosen mapping for a book, replacing any automated match.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the book does not exist, or another
    /// store error if persistence fails.
    pub async fn apply_manual_mapping(
        &self,
        book_id: &str,
        platform: PlatformKind,
        platform_book_id: &str,
    ) -> Result<PlatformMapping> {
        if self.books.find_by_id(book_id).await?.is_none() {
            return Err(SyncError::Store(StoreError::NotFound {
                entity_type: "Book".to_string(),
                id: book_id.to_string(),
            }));
        }

        let mapping = self
            .mappings
            .save_manual(book_id, platform, platform_book_id)
            .await?;
        info!(book_id, platform = %platform, platform_book_id, "Manual mapping pinned");

        Ok(mapping)
    }

    // ========================================================================
    // Pass lifecycle
    // ========================================================================

    /// Guard per-kind exclusivity, create the job record, and register the
    /// pass as active.
    async fn begin_pass(&self, kind: JobKind) -> Result<(SyncJob, CancellationToken)> {
        let mut active = self.active_passes.lock().await;

        if let Some(pass) = active.get(&kind) {
            let still_running = match self.jobs.find_by_id(&pass.job_id).await? {
                Some(job) => job.status.is_active(),
                None => false,
            };
            if still_running {
                return Err(SyncError::PassInProgress {
                    kind: kind.as_str().to_string(),
                });
            }
            // The task finished but has not released its slot yet
            active.remove(&kind);
        }
        // Covers active rows from another runner sharing this store, or
        // leftovers from a crash that recover_abandoned_jobs has not cleared
        if self.jobs.has_active(kind).await? {
            return Err(SyncError::PassInProgress {
                kind: kind.as_str().to_string(),
            });
        }

        let job = SyncJob::new(kind).start()?;
        self.jobs.insert(&job).await?;

        let token = CancellationToken::new();
        active.insert(
            kind,
            ActivePass {
                job_id: job.id,
                cancellation_token: token.clone(),
            },
        );

        info!(job_id = %job.id, kind = %kind, "Pass started");
        self.event_bus
            .emit(EngineEvent::Pass(PassEvent::Started {
                job_id: job.id.as_str(),
                kind: kind.as_str().to_string(),
            }))
            .ok();

        Ok((job, token))
    }

    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            registry: Arc::clone(&self.registry),
            books: Arc::clone(&self.books),
            mappings: Arc::clone(&self.mappings),
            jobs: Arc::clone(&self.jobs),
            matcher: Arc::clone(&self.matcher),
            worker: Arc::clone(&self.worker),
            event_bus: Arc::clone(&self.event_bus),
            active_passes: Arc::clone(&self.active_passes),
        }
    }

    async fn execute_sync_pass(&self, mut job: SyncJob, token: &CancellationToken) -> Result<()> {
        let canonical = self
            .registry
            .get(PlatformKind::Audiobookshelf)
            .ok_or_else(|| SyncError::PlatformNotRegistered {
                platform: PlatformKind::Audiobookshelf.as_str().to_string(),
            })?;

        info!(job_id = %job.id, "Listing canonical libraries");
        let libraries = canonical
            .list_libraries()
            .await
            .map_err(|e| SyncError::Platform(e.to_string()))?;

        if libraries.is_empty() {
            info!(job_id = %job.id, "No libraries on the canonical platform");
            return self.finalize_pass(job, 0, 0, Vec::new(), false).await;
        }

        let mut errors: Vec<String> = Vec::new();
        let mut items: Vec<ItemSummary> = Vec::new();
        for library in &libraries {
            match canonical.list_items(&library.id).await {
                Ok(mut library_items) => {
                    debug!(library = %library.name, items = library_items.len(), "Listed library items");
                    items.append(&mut library_items);
                }
                Err(e) => {
                    // One unreadable library does not sink the pass
                    warn!(library = %library.name, error = %e, "Failed to list library items");
                    errors.push(format!("Library {}: {}", library.name, e));
                }
            }
        }

        let total = items.len() as u64;
        job.update_progress(0, total, 0, 0)?;
        self.jobs.update(&job).await?;

        let mut processed = 0u64;
        let mut synced = 0u64;
        let mut failed = 0u64;
        let mut cancelled = false;

        for item in &items {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.process_item(canonical.as_ref(), item).await {
                Ok(Some(true)) => synced += 1,
                Ok(Some(false)) => failed += 1,
                Ok(None) => {
                    debug!(item_id = %item.id, "No progress on canonical platform, skipping");
                }
                Err(e @ SyncError::Store(_)) => return Err(e),
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "Item failed mid-pass");
                    errors.push(format!("{}: {}", item.title, e));
                    failed += 1;
                }
            }

            processed += 1;
            job.update_progress(processed, total, synced, failed)?;
            self.jobs.update(&job).await?;
            self.event_bus
                .emit(EngineEvent::Pass(PassEvent::Progress {
                    job_id: job.id.as_str(),
                    books_processed: processed,
                    total_books: Some(total),
                    phase: "Syncing progress".to_string(),
                }))
                .ok();
        }

        self.finalize_pass(job, synced, failed, errors, cancelled).await
    }

    /// Pull one item's progress, upsert the book, and push to its platforms.
    ///
    /// `Ok(None)` means the canonical platform has no progress for the item;
    /// nothing is written and the item is skipped.
    async fn process_item(
        &self,
        canonical: &dyn PlatformAdapter,
        item: &ItemSummary,
    ) -> Result<Option<bool>> {
        let snapshot = match canonical.get_progress(&item.id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(None),
            Err(e) => return Err(SyncError::Platform(e.to_string())),
        };

        let book = self.books.upsert_from_source(item, &snapshot).await?;
        let outcome = self.worker.sync_progress(&book).await?;

        Ok(Some(outcome.succeeded))
    }

    async fn execute_matching_pass(
        &self,
        mut job: SyncJob,
        platforms: Vec<PlatformKind>,
        token: &CancellationToken,
    ) -> Result<()> {
        info!(job_id = %job.id, "Loading canonical books");
        let books = self.books.list_all().await?;

        let total = books.len() as u64;
        job.update_progress(0, total, 0, 0)?;
        self.jobs.update(&job).await?;

        let report = self.matcher.match_all(&books, &platforms, token).await?;

        job.update_progress(report.books_examined, total, report.matched, report.failed)?;
        let cancelled = token.is_cancelled();

        self.finalize_pass(job, report.matched, report.failed, Vec::new(), cancelled)
            .await
    }

    /// Complete the job with final counts and announce the result.
    ///
    /// Cancellation also completes the job: the accumulated counts are real
    /// work, and the audit record keeps them.
    async fn finalize_pass(
        &self,
        job: SyncJob,
        synced: u64,
        failed: u64,
        errors: Vec<String>,
        cancelled: bool,
    ) -> Result<()> {
        let job_id = job.id;
        let processed = job.processed_items;

        let mut completed = job.complete(synced, failed)?;
        if !errors.is_empty() {
            completed.error_message = Some(errors.join("; "));
        }
        self.jobs.update(&completed).await?;

        if cancelled {
            info!(job_id = %job_id, processed, synced, failed, "Pass cancelled, counts kept");
            self.event_bus
                .emit(EngineEvent::Pass(PassEvent::Cancelled {
                    job_id: job_id.as_str(),
                    books_processed: processed,
                }))
                .ok();
        } else {
            info!(job_id = %job_id, processed, synced, failed, "Pass completed");
            self.event_bus
                .emit(EngineEvent::Pass(PassEvent::Completed {
                    job_id: job_id.as_str(),
                    books_processed: processed,
                    synced,
                    failed,
                    duration_secs: completed.duration_secs().unwrap_or(0),
                }))
                .ok();
        }

        Ok(())
    }

    /// Mark a job failed after its task errored or timed out.
    async fn fail_pass(&self, job_id: SyncJobId, message: String) {
        match self.jobs.find_by_id(&job_id).await {
            Ok(Some(job)) if job.status.is_active() => {
                let processed = job.processed_items;
                match job.fail(message.clone()) {
                    Ok(failed_job) => {
                        if let Err(e) = self.jobs.update(&failed_job).await {
                            error!(job_id = %job_id, error = %e, "Failed to persist job failure");
                        }
                    }
                    Err(e) => error!(job_id = %job_id, error = %e, "Could not mark job failed"),
                }
                self.event_bus
                    .emit(EngineEvent::Pass(PassEvent::Failed {
                        job_id: job_id.as_str(),
                        message,
                        books_processed: processed,
                    }))
                    .ok();
            }
            Ok(Some(_)) => {}
            Ok(None) => warn!(job_id = %job_id, "Job vanished before failure could be recorded"),
            Err(e) => error!(job_id = %job_id, error = %e, "Failed to load job for failure"),
        }
    }
}

/// Run one pass to completion under the configured timeout, then release the
/// per-kind slot.
async fn drive_pass(
    runner: ReconciliationRunner,
    job: SyncJob,
    token: CancellationToken,
    work: PassWork,
) {
    let kind = job.kind;
    let job_id = job.id;
    let timeout_secs = runner.config.pass_timeout_secs;

    let run = async {
        match work {
            PassWork::Sync => runner.execute_sync_pass(job, &token).await,
            PassWork::Matching(platforms) => {
                runner.execute_matching_pass(job, platforms, &token).await
            }
        }
    };

    match timeout(Duration::from_secs(timeout_secs), run).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(job_id = %job_id, error = %e, "Pass aborted");
            runner.fail_pass(job_id, e.to_string()).await;
        }
        Err(_) => {
            error!(job_id = %job_id, timeout_secs, "Pass timed out");
            runner
                .fail_pass(job_id, format!("Timeout after {timeout_secs} seconds"))
                .await;
        }
    }

    // Only release the slot if it is still ours; begin_pass may have evicted
    // a finished entry and handed the slot to a newer pass
    let mut active = runner.active_passes.lock().await;
    if active.get(&kind).is_some_and(|pass| pass.job_id == job_id) {
        active.remove(&kind);
    }
}

// ============================================================================
// Tests
// ============================================================================
