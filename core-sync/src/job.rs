//! # Sync Job State Machine
//!
//! Manages the lifecycle of matching and progress sync passes with validated
//! state transitions.
//!
//! ## Overview
//!
//! Every pass the engine runs is recorded as a `SyncJob`: an audit row that
//! tracks status and item counts while the pass executes and survives
//! restarts via database storage.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!     ↓         ↓
//!     └──────→ Failed
//! ```
//!
//! There is no cancelled state. A cancelled pass stops at the next item
//! boundary and completes with the counts accumulated up to that point, so
//! the audit trail records exactly what was done.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{JobKind, SyncJob};
//!
//! // Create a new job for a progress sync pass
//! let job = SyncJob::new(JobKind::ProgressSync);
//!
//! // Start the job
//! let mut job = job.start()?;
//!
//! // Update counts as items are processed
//! job.update_progress(5, 10, 4, 1)?;
//!
//! // Complete the job
//! let job = job.complete(9, 1)?;
//! ```

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncJobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SyncJobId> for Uuid {
    fn from(id: SyncJobId) -> Self {
        id.0
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job has been created but not yet started
    Pending,
    /// Job is currently running
    Running,
    /// Job ran to completion, possibly with per-item failures
    Completed,
    /// Job aborted before reaching the end of its items
    Failed,
}

impl JobStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check if this status represents an active state
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of pass being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Resolve platform mappings for canonical books
    Matching,
    /// Push canonical progress out to mapped platforms
    ProgressSync,
}

impl JobKind {
    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Matching => "matching",
            JobKind::ProgressSync => "progress_sync",
        }
    }
}

impl FromStr for JobKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "matching" => Ok(JobKind::Matching),
            "progress_sync" => Ok(JobKind::ProgressSync),
            _ => Err(SyncError::InvalidKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// A pass audit record with state machine semantics
///
/// Jobs can only be created in `Pending` state and must move through valid
/// transitions; counts only ever grow while the job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    /// Unique identifier for this job
    pub id: SyncJobId,
    /// Kind of pass
    pub kind: JobKind,
    /// Current status
    pub status: JobStatus,
    /// Number of books the pass covers
    pub total_items: u64,
    /// Number of books processed so far
    pub processed_items: u64,
    /// Number of books synced or matched successfully
    pub synced_count: u64,
    /// Number of books that failed
    pub failed_count: u64,
    /// Error message if the pass aborted
    pub error_message: Option<String>,
    /// When the job was created
    pub created_at: i64,
    /// When the job started running
    pub started_at: Option<i64>,
    /// When the job reached a terminal state
    pub completed_at: Option<i64>,
}

impl SyncJob {
    /// Create a new sync job in pending state
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: SyncJobId::new(),
            kind,
            status: JobStatus::Pending,
            total_items: 0,
            processed_items: 0,
            synced_count: 0,
            failed_count: 0,
            error_message: None,
            created_at: current_timestamp(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Start the sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.started_at = Some(current_timestamp());
        Ok(self)
    }

    /// Update item counts while the pass runs
    ///
    /// `processed` is clamped to `total` so the processed count can never
    /// overtake the number of items the pass covers.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Running` state
    pub fn update_progress(
        &mut self,
        processed: u64,
        total: u64,
        synced: u64,
        failed: u64,
    ) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "update_progress".to_string(),
                reason: "Job must be running to update progress".to_string(),
            });
        }

        self.total_items = total;
        self.processed_items = processed.min(total);
        self.synced_count = synced;
        self.failed_count = failed;
        Ok(())
    }

    /// Mark the job as completed with final counts
    ///
    /// This is also the terminal state for a cancelled pass: the runner stops
    /// at an item boundary and records the counts accumulated so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Running` state
    pub fn complete(mut self, synced: u64, failed: u64) -> Result<Self> {
        self.validate_transition(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.completed_at = Some(current_timestamp());
        self.synced_count = synced;
        self.failed_count = failed;
        Ok(self)
    }

    /// Mark the job as failed with an error message
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already in a terminal state
    pub fn fail(mut self, error_message: String) -> Result<Self> {
        self.validate_transition(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.completed_at = Some(current_timestamp());
        self.error_message = Some(error_message);
        Ok(self)
    }

    /// Get the duration of the job in seconds
    ///
    /// Returns None if the job hasn't started or completed yet
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start) as u64),
            _ => None,
        }
    }

    /// Validate a state transition
    fn validate_transition(&self, to: JobStatus) -> Result<()> {
        let valid = match (self.status, to) {
            // From Pending
            (JobStatus::Pending, JobStatus::Running) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,

            // From Running
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,

            // Terminal states cannot transition
            (JobStatus::Completed, _) => false,
            (JobStatus::Failed, _) => false,

            // All other transitions are invalid
            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

/// Get current Unix timestamp
pub(crate) fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before UNIX epoch")
        .as_secs() as i64
}

// ============================================================================
// Tests
// ============================================================================
