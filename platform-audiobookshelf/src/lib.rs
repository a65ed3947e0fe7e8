//! # Audiobookshelf Platform
//!
//! Implements `PlatformAdapter` for the Audiobookshelf server REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Bearer-token authentication against a self-hosted server
//! - Library and item enumeration with book metadata
//! - Listening progress reads (position, duration, finished flag)
//!
//! Audiobookshelf is the canonical platform: search, identifier lookup, and
//! progress writes report `NotSupported`.

pub mod adapter;
pub mod types;

pub use adapter::AudiobookshelfAdapter;
