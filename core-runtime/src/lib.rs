//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Reqwest-backed HTTP client
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, configuration validation, and event
//! broadcasting mechanisms used throughout the engine, and provides the
//! concrete [`http::ReqwestHttpClient`] that platform adapters are wired with.

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod logging;

pub use error::{Error, Result};
