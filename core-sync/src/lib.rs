//! # Sync Engine
//!
//! Keeps listening progress aligned across book platforms, with the
//! canonical server as the single source of truth.
//!
//! ## Overview
//!
//! This module owns the reconciliation passes and everything they lean on:
//! - Pulling libraries, items, and progress from the canonical platform
//! - Matching canonical books to secondary-platform catalog entries
//! - Pushing progress percentages to every mapped platform
//! - Recording each pass as an auditable job with live counters
//!
//! ## Components
//!
//! - **Sync Job State Machine** (`job`): Pass audit records with validated state transitions
//! - **Platform Registry** (`registry`): Adapter lookup by platform kind
//! - **Matcher** (`matcher`): Identifier-first book resolution with a similarity fallback
//! - **Sync Worker** (`worker`): Per-book progress push with partial-failure isolation
//! - **Repository** (`repository`): Database persistence for sync jobs
//! - **Reconciliation Runner** (`runner`): Orchestrates passes, exclusivity, and timeouts

pub mod error;
pub mod job;
pub mod matcher;
pub mod registry;
pub mod repository;
pub mod runner;
pub mod similarity;
pub mod worker;

pub use error::{Result, SyncError};
pub use job::{JobKind, JobStatus, SyncJob, SyncJobId};
pub use matcher::{MatchOutcome, MatchReport, Matcher};
pub use registry::PlatformRegistry;
pub use repository::{JobRepository, SqliteJobRepository};
pub use runner::{ReconciliationRunner, RunnerConfig, SyncStats};
pub use similarity::token_set_ratio;
pub use worker::{PushStatus, SyncOutcome, SyncWorker};
