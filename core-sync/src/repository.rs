//! # Sync Job Repository
//!
//! Provides database persistence for pass audit records.
//!
//! ## Overview
//!
//! This repository handles CRUD operations for sync jobs, including:
//! - Creating new sync jobs
//! - Updating counts and status as a pass runs
//! - Job history retrieval
//! - Detecting an active pass of a given kind

use crate::{JobKind, Result, SyncJob, SyncJobId};
use async_trait::async_trait;
use core_store::StoreError;
use sqlx::{FromRow, SqlitePool};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for sync job persistence
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn insert(&self, job: &SyncJob) -> Result<()>;

    /// Update an existing sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job doesn't exist or the database operation fails
    async fn update(&self, job: &SyncJob) -> Result<()>;

    /// Find a sync job by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>>;

    /// Get recent sync jobs across all kinds (most recent first)
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of jobs to return
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn recent(&self, limit: u32) -> Result<Vec<SyncJob>>;

    /// Check if there's an active (pending or running) pass of a kind
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn has_active(&self, kind: JobKind) -> Result<bool>;

    /// Mark every active job as failed with the given message.
    ///
    /// Intended for startup, where an active row can only be a leftover from
    /// a process that died mid-pass. Returns the number of jobs failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn fail_abandoned(&self, message: &str) -> Result<u64>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of JobRepository
pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    /// Create a new SQLite sync job repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a sync job
#[derive(Debug, FromRow)]
struct SyncJobRow {
    id: String,
    kind: String,
    status: String,
    total_items: i64,
    processed_items: i64,
    synced_count: i64,
    failed_count: i64,
    error_message: Option<String>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<SyncJobRow> for SyncJob {
    type Error = crate::SyncError;

    fn try_from(row: SyncJobRow) -> Result<Self> {
        Ok(SyncJob {
            id: SyncJobId::from_string(&row.id)?,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            total_items: row.total_items as u64,
            processed_items: row.processed_items as u64,
            synced_count: row.synced_count as u64,
            failed_count: row.failed_count as u64,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &SyncJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_jobs (
                id, kind, status,
                total_items, processed_items, synced_count, failed_count,
                error_message, started_at, completed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.kind.as_str())
        .bind(job.status.as_str())
        .bind(job.total_items as i64)
        .bind(job.processed_items as i64)
        .bind(job.synced_count as i64)
        .bind(job.failed_count as i64)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(())
    }

    async fn update(&self, job: &SyncJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                status = ?,
                total_items = ?,
                processed_items = ?,
                synced_count = ?,
                failed_count = ?,
                error_message = ?,
                started_at = ?,
                completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(job.total_items as i64)
        .bind(job.processed_items as i64)
        .bind(job.synced_count as i64)
        .bind(job.failed_count as i64)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(crate::SyncError::JobNotFound {
                job_id: job.id.to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>> {
        let row = sqlx::query_as::<_, SyncJobRow>(
            r#"
            SELECT id, kind, status,
                   total_items, processed_items, synced_count, failed_count,
                   error_message, started_at, completed_at, created_at
            FROM sync_jobs
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        row.map(SyncJob::try_from).transpose()
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SyncJob>> {
        let rows = sqlx::query_as::<_, SyncJobRow>(
            r#"
            SELECT id, kind, status,
                   total_items, processed_items, synced_count, failed_count,
                   error_message, started_at, completed_at, created_at
            FROM sync_jobs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        rows.into_iter()
            .map(SyncJob::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn has_active(&self, kind: JobKind) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM sync_jobs
            WHERE kind = ? AND status IN ('pending', 'running')
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(count > 0)
    }

    async fn fail_abandoned(&self, message: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET status = 'failed', error_message = ?, completed_at = ?
            WHERE status IN ('pending', 'running')
            "#,
        )
        .bind(message)
        .bind(crate::job::current_timestamp())
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Tests
// ============================================================================
