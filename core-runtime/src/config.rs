//! # Engine Configuration Module
//!
//! Provides configuration management for the sync engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an `EngineConfig`
//! instance that holds the canonical server settings, secondary platform
//! credentials, and tuning knobs for matching and reconciliation passes. It
//! enforces fail-fast validation so misconfiguration surfaces at startup rather
//! than mid-pass.
//!
//! ## Required Settings
//!
//! - Canonical server base URL and API token
//! - Database path
//!
//! ## Optional Settings
//!
//! - Hardcover API token (Hardcover sync disabled when absent)
//! - Storygraph session cookie (Storygraph sync disabled when absent)
//! - HTTP and pass timeouts, match tuning knobs (sensible defaults)
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .canonical_base_url("https://abs.example.com")
//!     .canonical_api_token("abs-token")
//!     .database_path("/var/lib/shelfsync/shelfsync.db")
//!     .hardcover_api_token("hc-token")
//!     .build()
//!     .expect("valid configuration");
//!
//! assert!(config.has_hardcover());
//! assert!(!config.has_storygraph());
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all settings and provides actionable error messages:
//!
//! ```should_panic
//! use core_runtime::config::EngineConfig;
//!
//! // This will panic with an actionable error message
//! let config = EngineConfig::builder()
//!     .database_path("/var/lib/shelfsync/shelfsync.db")
//!     .build()
//!     .expect("Should fail - missing canonical server settings");
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default timeout for individual HTTP requests, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default timeout for a whole reconciliation pass, in seconds.
pub const DEFAULT_PASS_TIMEOUT_SECS: u64 = 1800;

/// Default number of search candidates requested per platform.
pub const DEFAULT_MATCH_CANDIDATE_LIMIT: u32 = 5;

/// Default similarity score a candidate must reach to be accepted.
pub const DEFAULT_MATCH_ACCEPT_THRESHOLD: f64 = 80.0;

/// Engine configuration for the sync engine.
///
/// This struct holds all settings required to initialize the engine. Use
/// [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// Base URL of the canonical Audiobookshelf server (no trailing slash)
    pub canonical_base_url: String,

    /// API token for the canonical server
    pub canonical_api_token: String,

    /// Hardcover API token, if Hardcover sync is enabled
    pub hardcover_api_token: Option<String>,

    /// Storygraph session cookie, if Storygraph sync is enabled
    pub storygraph_session_cookie: Option<String>,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Timeout for individual HTTP requests, in seconds
    pub http_timeout_secs: u64,

    /// Timeout for a whole reconciliation pass, in seconds
    pub pass_timeout_secs: u64,

    /// Number of search candidates requested per platform during matching
    pub match_candidate_limit: u32,

    /// Similarity score (0-100) a candidate must reach to be accepted
    pub match_accept_threshold: f64,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("canonical_base_url", &self.canonical_base_url)
            .field("canonical_api_token", &"[REDACTED]")
            .field(
                "hardcover_api_token",
                &self.hardcover_api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "storygraph_session_cookie",
                &self.storygraph_session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_path", &self.database_path)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("pass_timeout_secs", &self.pass_timeout_secs)
            .field("match_candidate_limit", &self.match_candidate_limit)
            .field("match_accept_threshold", &self.match_accept_threshold)
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Checks if Hardcover sync is configured.
    pub fn has_hardcover(&self) -> bool {
        self.hardcover_api_token.is_some()
    }

    /// Checks if Storygraph sync is configured.
    pub fn has_storygraph(&self) -> bool {
        self.storygraph_session_cookie.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// All problems are collected so the caller sees everything at once
    /// rather than fixing settings one by one.
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            return Ok(());
        }

        let message = errors
            .iter()
            .map(|(field, msg)| format!("{}: {}", field, msg))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Config(message))
    }

    /// Returns a map of setting name to problem description for every
    /// invalid setting. Empty when the configuration is valid.
    pub fn validation_errors(&self) -> BTreeMap<&'static str, String> {
        let mut errors = BTreeMap::new();

        if !self.canonical_base_url.starts_with("http://")
            && !self.canonical_base_url.starts_with("https://")
        {
            errors.insert(
                "canonical_base_url",
                "must start with http:// or https://".to_string(),
            );
        }

        if self.canonical_api_token.trim().is_empty() {
            errors.insert("canonical_api_token", "cannot be empty".to_string());
        }

        if let Some(token) = &self.hardcover_api_token {
            if token.trim().is_empty() {
                errors.insert(
                    "hardcover_api_token",
                    "cannot be empty when provided".to_string(),
                );
            }
        }

        if let Some(cookie) = &self.storygraph_session_cookie {
            if cookie.trim().is_empty() {
                errors.insert(
                    "storygraph_session_cookie",
                    "cannot be empty when provided".to_string(),
                );
            }
        }

        if self.database_path.as_os_str().is_empty() {
            errors.insert("database_path", "cannot be empty".to_string());
        }

        if self.http_timeout_secs == 0 || self.http_timeout_secs > 300 {
            errors.insert(
                "http_timeout_secs",
                "must be between 1 and 300 seconds".to_string(),
            );
        }

        if self.pass_timeout_secs == 0 {
            errors.insert(
                "pass_timeout_secs",
                "must be greater than 0 seconds".to_string(),
            );
        }

        if self.match_candidate_limit == 0 || self.match_candidate_limit > 50 {
            errors.insert(
                "match_candidate_limit",
                "must be between 1 and 50".to_string(),
            );
        }

        if self.match_accept_threshold <= 0.0 || self.match_accept_threshold > 100.0 {
            errors.insert(
                "match_accept_threshold",
                "must be greater than 0 and at most 100".to_string(),
            );
        }

        errors
    }
}

/// Builder for constructing [`EngineConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](EngineConfigBuilder::build) to create the final config.
/// The builder validates settings and provides helpful error messages.
#[derive(Default)]
pub struct EngineConfigBuilder {
    canonical_base_url: Option<String>,
    canonical_api_token: Option<String>,
    hardcover_api_token: Option<String>,
    storygraph_session_cookie: Option<String>,
    database_path: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    pass_timeout_secs: Option<u64>,
    match_candidate_limit: Option<u32>,
    match_accept_threshold: Option<f64>,
}

impl EngineConfigBuilder {
    /// Sets the canonical server base URL.
    ///
    /// Trailing slashes are trimmed so adapters can join request paths.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::EngineConfig;
    ///
    /// let builder = EngineConfig::builder()
    ///     .canonical_base_url("https://abs.example.com");
    /// ```
    pub fn canonical_base_url(mut self, url: impl Into<String>) -> Self {
        self.canonical_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Sets the canonical server API token.
    pub fn canonical_api_token(mut self, token: impl Into<String>) -> Self {
        self.canonical_api_token = Some(token.into());
        self
    }

    /// Sets the Hardcover API token, enabling Hardcover sync.
    pub fn hardcover_api_token(mut self, token: impl Into<String>) -> Self {
        self.hardcover_api_token = Some(token.into());
        self
    }

    /// Sets the Storygraph session cookie, enabling Storygraph sync.
    pub fn storygraph_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.storygraph_session_cookie = Some(cookie.into());
        self
    }

    /// Sets the database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::EngineConfig;
    ///
    /// let builder = EngineConfig::builder()
    ///     .database_path("/var/lib/shelfsync/shelfsync.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the timeout for individual HTTP requests.
    ///
    /// Default: 30 seconds
    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = Some(secs);
        self
    }

    /// Sets the timeout for a whole reconciliation pass.
    ///
    /// Default: 1800 seconds (30 minutes)
    pub fn pass_timeout_secs(mut self, secs: u64) -> Self {
        self.pass_timeout_secs = Some(secs);
        self
    }

    /// Sets the number of search candidates requested per platform.
    ///
    /// Default: 5
    pub fn match_candidate_limit(mut self, limit: u32) -> Self {
        self.match_candidate_limit = Some(limit);
        self
    }

    /// Sets the similarity score a candidate must reach to be accepted.
    ///
    /// Default: 80.0
    pub fn match_accept_threshold(mut self, threshold: f64) -> Self {
        self.match_accept_threshold = Some(threshold);
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(EngineConfig)` on success, or an error if:
    /// - Required settings are missing (base URL, API token, database path)
    /// - Configuration values are out of range
    pub fn build(self) -> Result<EngineConfig> {
        let canonical_base_url = self.canonical_base_url.ok_or_else(|| {
            Error::Config(
                "Canonical server base URL is required. Use .canonical_base_url() to set it."
                    .to_string(),
            )
        })?;

        let canonical_api_token = self.canonical_api_token.ok_or_else(|| {
            Error::Config(
                "Canonical server API token is required. Use .canonical_api_token() to set it."
                    .to_string(),
            )
        })?;

        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = EngineConfig {
            canonical_base_url,
            canonical_api_token,
            hardcover_api_token: self.hardcover_api_token,
            storygraph_session_cookie: self.storygraph_session_cookie,
            database_path,
            http_timeout_secs: self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            pass_timeout_secs: self.pass_timeout_secs.unwrap_or(DEFAULT_PASS_TIMEOUT_SECS),
            match_candidate_limit: self
                .match_candidate_limit
                .unwrap_or(DEFAULT_MATCH_CANDIDATE_LIMIT),
            match_accept_threshold: self
                .match_accept_threshold
                .unwrap_or(DEFAULT_MATCH_ACCEPT_THRESHOLD),
        };

        config.validate()?;

        Ok(config)
    }
}
