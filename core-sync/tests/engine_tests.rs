//! Integration tests for the reconciliation engine
//!
//! These tests verify the complete reconciliation workflow including:
//! - Ingesting canonical items, matching them, and pushing progress
//! - Identifier lookup with similarity-search fallback
//! - Manual mapping precedence over automated matching
//! - Partial-failure isolation across secondary platforms
//! - Zero-duration and finished-book handling

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_runtime::events::{EngineEvent, EventBus, PlatformEvent};
use core_store::{
    create_test_pool, BookRepository, MappingRepository, SqliteBookRepository,
    SqliteMappingRepository,
};
use core_sync::{
    JobStatus, PlatformRegistry, ReconciliationRunner, RunnerConfig, SyncJob, SyncJobId,
};
use platform_traits::{
    Candidate, ItemSummary, LibraryRef, PlatformAdapter, PlatformError, PlatformKind,
    ProgressSnapshot,
};
use tokio::sync::Mutex as AsyncMutex;

// ============================================================================
// Fake Platforms
// ============================================================================

/// Canonical platform serving a fixed library of items with known progress.
struct FakeCanonical {
    items: Vec<ItemSummary>,
    progress: HashMap<String, ProgressSnapshot>,
}

impl FakeCanonical {
    fn new(items: Vec<ItemSummary>, progress: Vec<(&str, ProgressSnapshot)>) -> Self {
        Self {
            items,
            progress: progress
                .into_iter()
                .map(|(id, snapshot)| (id.to_string(), snapshot))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl PlatformAdapter for FakeCanonical {
    async fn list_libraries(&self) -> platform_traits::Result<Vec<LibraryRef>> {
        Ok(vec![LibraryRef {
            id: "lib-main".to_string(),
            name: "Audiobooks".to_string(),
        }])
    }

    async fn list_items(&self, _library_id: &str) -> platform_traits::Result<Vec<ItemSummary>> {
        Ok(self.items.clone())
    }

    async fn get_progress(
        &self,
        item_id: &str,
    ) -> platform_traits::Result<Option<ProgressSnapshot>> {
        Ok(self.progress.get(item_id).copied())
    }

    async fn search_books(
        &self,
        _query: &str,
        _limit: u32,
    ) -> platform_traits::Result<Vec<Candidate>> {
        Err(PlatformError::not_supported(
            PlatformKind::Audiobookshelf,
            "search",
        ))
    }

    async fn get_by_identifier(&self, _isbn: &str) -> platform_traits::Result<Option<Candidate>> {
        Err(PlatformError::not_supported(
            PlatformKind::Audiobookshelf,
            "ISBN lookup",
        ))
    }

    async fn update_progress(
        &self,
        _platform_book_id: &str,
        _percent: f64,
        _is_finished: bool,
    ) -> platform_traits::Result<bool> {
        Err(PlatformError::not_supported(
            PlatformKind::Audiobookshelf,
            "progress updates",
        ))
    }

    async fn validate_connection(&self) -> platform_traits::Result<bool> {
        Ok(true)
    }
}

/// Secondary platform with a configurable catalog that records every push.
struct FakeSecondary {
    kind: PlatformKind,
    catalog: Vec<Candidate>,
    isbn_index: HashMap<String, Candidate>,
    isbn_supported: bool,
    fail_updates: bool,
    pushes: Arc<AsyncMutex<Vec<(String, f64, bool)>>>,
    search_calls: Arc<AtomicUsize>,
    identifier_calls: Arc<AtomicUsize>,
}

impl FakeSecondary {
    fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            catalog: Vec::new(),
            isbn_index: HashMap::new(),
            isbn_supported: true,
            fail_updates: false,
            pushes: Arc::new(AsyncMutex::new(Vec::new())),
            search_calls: Arc::new(AtomicUsize::new(0)),
            identifier_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_catalog(mut self, catalog: Vec<Candidate>) -> Self {
        for entry in &catalog {
            if let Some(isbn) = &entry.isbn {
                self.isbn_index.insert(isbn.clone(), entry.clone());
            }
        }
        self.catalog = catalog;
        self
    }

    fn without_isbn_lookup(mut self) -> Self {
        self.isbn_supported = false;
        self
    }

    fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }
}

#[async_trait::async_trait]
impl PlatformAdapter for FakeSecondary {
    async fn list_libraries(&self) -> platform_traits::Result<Vec<LibraryRef>> {
        Err(PlatformError::not_supported(self.kind, "library listing"))
    }

    async fn list_items(&self, _library_id: &str) -> platform_traits::Result<Vec<ItemSummary>> {
        Err(PlatformError::not_supported(self.kind, "item listing"))
    }

    async fn get_progress(
        &self,
        _item_id: &str,
    ) -> platform_traits::Result<Option<ProgressSnapshot>> {
        Err(PlatformError::not_supported(self.kind, "progress reads"))
    }

    async fn search_books(
        &self,
        _query: &str,
        _limit: u32,
    ) -> platform_traits::Result<Vec<Candidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }

    async fn get_by_identifier(&self, isbn: &str) -> platform_traits::Result<Option<Candidate>> {
        if !self.isbn_supported {
            return Err(PlatformError::not_supported(self.kind, "ISBN lookup"));
        }
        self.identifier_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.isbn_index.get(isbn).cloned())
    }

    async fn update_progress(
        &self,
        platform_book_id: &str,
        percent: f64,
        is_finished: bool,
    ) -> platform_traits::Result<bool> {
        if self.fail_updates {
            return Err(PlatformError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        self.pushes
            .lock()
            .await
            .push((platform_book_id.to_string(), percent, is_finished));
        Ok(true)
    }

    async fn validate_connection(&self) -> platform_traits::Result<bool> {
        Ok(true)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Engine {
    runner: ReconciliationRunner,
    books: SqliteBookRepository,
    mappings: SqliteMappingRepository,
    bus: Arc<EventBus>,
}

async fn engine(registry: PlatformRegistry) -> Engine {
    let pool = create_test_pool().await.unwrap();
    let bus = Arc::new(EventBus::new(256));
    let runner = ReconciliationRunner::from_pool(
        RunnerConfig::default(),
        Arc::new(registry),
        pool.clone(),
        bus.clone(),
    );

    Engine {
        runner,
        books: SqliteBookRepository::new(pool.clone()),
        mappings: SqliteMappingRepository::new(pool),
        bus,
    }
}

async fn wait_for_job(runner: &ReconciliationRunner, job_id: &SyncJobId) -> SyncJob {
    for _ in 0..200 {
        let job = runner.job_status(job_id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("Job did not reach a terminal status");
}

fn item(id: &str, title: &str, author: &str, isbn: Option<&str>) -> ItemSummary {
    ItemSummary {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        isbn: isbn.map(str::to_string),
    }
}

fn candidate(id: &str, title: &str, authors: &[&str], isbn: Option<&str>) -> Candidate {
    Candidate {
        id: id.to_string(),
        title: title.to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        isbn: isbn.map(str::to_string),
    }
}

fn listening(progress: f64, total_duration: f64, is_finished: bool) -> ProgressSnapshot {
    ProgressSnapshot {
        progress,
        total_duration,
        is_finished,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_ingest_match_and_push_cycle() {
    let canonical = FakeCanonical::new(
        vec![item("abs-1", "Dune", "Frank Herbert", Some("9780441013593"))],
        vec![("abs-1", listening(1800.0, 3600.0, false))],
    );
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover).with_catalog(vec![candidate(
        "hc-dune",
        "Dune",
        &["Frank Herbert"],
        Some("9780441013593"),
    )]);
    let pushes = hardcover.pushes.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Audiobookshelf, Arc::new(canonical));
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    // First sync pass ingests the item; with no mapping yet the push fails
    let job_id = engine.runner.run_sync_pass().await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.processed_items, 1);
    assert_eq!(job.synced_count, 0);
    assert_eq!(job.failed_count, 1);

    let book = engine
        .books
        .find_by_source_id("abs-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.progress, 1800.0);
    assert!(book.last_synced_at.is_none());

    // The matching pass resolves the book by ISBN
    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.synced_count, 1);

    let mapping = engine
        .mappings
        .find(&book.id, PlatformKind::Hardcover)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.platform_book_id, "hc-dune");
    assert_eq!(mapping.confidence, 1.0);
    assert!(!mapping.is_manual_override());

    // Second sync pass pushes the halfway mark to the mapped platform
    let job_id = engine.runner.run_sync_pass().await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.synced_count, 1);
    assert_eq!(job.failed_count, 0);

    assert_eq!(
        *pushes.lock().await,
        vec![("hc-dune".to_string(), 50.0, false)]
    );

    let book = engine
        .books
        .find_by_source_id("abs-1")
        .await
        .unwrap()
        .unwrap();
    assert!(book.last_synced_at.is_some());

    let stats = engine.runner.sync_stats().await.unwrap();
    assert_eq!(stats.total_books, 1);
    assert_eq!(stats.synced_books, 1);
    assert_eq!(stats.pending_books, 0);
    assert_eq!(
        stats.mappings_per_platform,
        vec![(PlatformKind::Hardcover, 1)]
    );
}

#[tokio::test]
async fn test_heuristic_match_selects_best_candidate() {
    // No ISBN anywhere, so resolution has to go through search
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover).with_catalog(vec![
        candidate("hc-typo", "Dune", &["Frank Hrbrt"], None),
        candidate("hc-best", "Dune", &["Frank Hebert"], None),
    ]);

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", None),
            &listening(600.0, 3600.0, false),
        )
        .await
        .unwrap();

    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);

    let mapping = engine
        .mappings
        .find(&book.id, PlatformKind::Hardcover)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.platform_book_id, "hc-best");
    assert!(mapping.confidence > 0.8);
    assert!(mapping.confidence < 1.0);
}

#[tokio::test]
async fn test_low_confidence_leaves_book_unmatched() {
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover).with_catalog(vec![candidate(
        "hc-junk",
        "Hail Mary",
        &["Tom Clancy"],
        None,
    )]);
    let search_calls = hardcover.search_calls.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Project Hail Mary", "Andy Weir", None),
            &listening(600.0, 3600.0, false),
        )
        .await
        .unwrap();

    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.processed_items, 1);
    assert_eq!(job.synced_count, 0);

    assert!(engine
        .mappings
        .find(&book.id, PlatformKind::Hardcover)
        .await
        .unwrap()
        .is_none());

    // With nothing recorded, the next pass tries the same book again
    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    wait_for_job(&engine.runner, &job_id).await;
    assert_eq!(search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_manual_mapping_survives_matching_pass() {
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover).with_catalog(vec![candidate(
        "hc-auto",
        "Dune",
        &["Frank Herbert"],
        Some("9780441013593"),
    )]);
    let search_calls = hardcover.search_calls.clone();
    let identifier_calls = hardcover.identifier_calls.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", Some("9780441013593")),
            &listening(600.0, 3600.0, false),
        )
        .await
        .unwrap();

    engine
        .runner
        .apply_manual_mapping(&book.id, PlatformKind::Hardcover, "hc-pinned")
        .await
        .unwrap();

    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    wait_for_job(&engine.runner, &job_id).await;

    // The pinned mapping is untouched and the platform was never consulted
    let mapping = engine
        .mappings
        .find(&book.id, PlatformKind::Hardcover)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.platform_book_id, "hc-pinned");
    assert!(mapping.is_manual_override());
    assert_eq!(identifier_calls.load(Ordering::SeqCst), 0);
    assert_eq!(search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_capability_gap_falls_through_to_search() {
    let storygraph = FakeSecondary::new(PlatformKind::Storygraph)
        .with_catalog(vec![candidate(
            "sg-dune",
            "Dune",
            &["Frank Herbert"],
            None,
        )])
        .without_isbn_lookup();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Storygraph, Arc::new(storygraph));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", Some("9780441013593")),
            &listening(600.0, 3600.0, false),
        )
        .await
        .unwrap();

    let mut rx = engine.bus.subscribe();
    let job_id = engine.runner.run_matching_pass(Vec::new()).await.unwrap();
    wait_for_job(&engine.runner, &job_id).await;

    let mapping = engine
        .mappings
        .find(&book.id, PlatformKind::Storygraph)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mapping.platform_book_id, "sg-dune");
    assert!(!mapping.is_manual_override());

    let mut saw_skip = false;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Platform(PlatformEvent::CapabilitySkipped {
            platform,
            capability,
        }) = event
        {
            assert_eq!(platform, PlatformKind::Storygraph);
            assert_eq!(capability, "ISBN lookup");
            saw_skip = true;
        }
    }
    assert!(saw_skip);
}

#[tokio::test]
async fn test_partial_platform_failure_is_isolated() {
    let canonical = FakeCanonical::new(
        vec![item("abs-1", "Dune", "Frank Herbert", None)],
        vec![("abs-1", listening(900.0, 3600.0, false))],
    );
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover);
    let storygraph = FakeSecondary::new(PlatformKind::Storygraph).failing_updates();
    let hc_pushes = hardcover.pushes.clone();
    let sg_pushes = storygraph.pushes.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Audiobookshelf, Arc::new(canonical));
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    registry.register(PlatformKind::Storygraph, Arc::new(storygraph));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", None),
            &listening(900.0, 3600.0, false),
        )
        .await
        .unwrap();
    engine
        .runner
        .apply_manual_mapping(&book.id, PlatformKind::Hardcover, "hc-1")
        .await
        .unwrap();
    engine
        .runner
        .apply_manual_mapping(&book.id, PlatformKind::Storygraph, "sg-1")
        .await
        .unwrap();

    let mut rx = engine.bus.subscribe();
    let job_id = engine.runner.run_sync_pass().await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;

    // One platform down does not fail the book
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.synced_count, 1);
    assert_eq!(job.failed_count, 0);

    assert_eq!(*hc_pushes.lock().await, vec![("hc-1".to_string(), 25.0, false)]);
    assert!(sg_pushes.lock().await.is_empty());

    let book = engine.books.find_by_id(&book.id).await.unwrap().unwrap();
    assert!(book.last_synced_at.is_some());

    let mut saw_update_failed = false;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Platform(PlatformEvent::UpdateFailed { platform, .. }) = event {
            assert_eq!(platform, PlatformKind::Storygraph);
            saw_update_failed = true;
        }
    }
    assert!(saw_update_failed);
}

#[tokio::test]
async fn test_zero_duration_book_never_pushed() {
    let canonical = FakeCanonical::new(
        vec![item("abs-1", "Dune", "Frank Herbert", None)],
        vec![("abs-1", listening(120.0, 0.0, false))],
    );
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover);
    let pushes = hardcover.pushes.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Audiobookshelf, Arc::new(canonical));
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", None),
            &listening(120.0, 0.0, false),
        )
        .await
        .unwrap();
    engine
        .runner
        .apply_manual_mapping(&book.id, PlatformKind::Hardcover, "hc-1")
        .await
        .unwrap();

    let job_id = engine.runner.run_sync_pass().await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.synced_count, 0);
    assert_eq!(job.failed_count, 1);
    assert!(pushes.lock().await.is_empty());

    // The attempt is still recorded against the book
    let book = engine.books.find_by_id(&book.id).await.unwrap().unwrap();
    assert!(book.last_synced_at.is_some());
}

#[tokio::test]
async fn test_finished_book_pushes_completion() {
    let canonical = FakeCanonical::new(
        vec![item("abs-1", "Dune", "Frank Herbert", None)],
        vec![("abs-1", listening(3600.0, 3600.0, true))],
    );
    let hardcover = FakeSecondary::new(PlatformKind::Hardcover);
    let pushes = hardcover.pushes.clone();

    let mut registry = PlatformRegistry::new();
    registry.register(PlatformKind::Audiobookshelf, Arc::new(canonical));
    registry.register(PlatformKind::Hardcover, Arc::new(hardcover));
    let engine = engine(registry).await;

    let book = engine
        .books
        .upsert_from_source(
            &item("abs-1", "Dune", "Frank Herbert", None),
            &listening(3600.0, 3600.0, true),
        )
        .await
        .unwrap();
    engine
        .runner
        .apply_manual_mapping(&book.id, PlatformKind::Hardcover, "hc-1")
        .await
        .unwrap();

    let job_id = engine.runner.run_sync_pass().await.unwrap();
    let job = wait_for_job(&engine.runner, &job_id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.synced_count, 1);
    assert_eq!(*pushes.lock().await, vec![("hc-1".to_string(), 100.0, true)]);
}
