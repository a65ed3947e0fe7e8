use thiserror::Error;

use crate::kind::PlatformKind;

/// Errors raised by platform adapter calls.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Authentication failed or the credential is invalid
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Platform API returned an error response
    #[error("Platform API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level failure (connection, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Failed to parse a platform response
    #[error("Failed to parse platform response: {0}")]
    Parse(String),

    /// The platform does not implement this capability.
    ///
    /// Distinct from a transient failure: callers fall through to the next
    /// strategy instead of recording a fault.
    #[error("{platform} does not support {capability}")]
    NotSupported {
        platform: PlatformKind,
        capability: &'static str,
    },
}

impl PlatformError {
    /// Shorthand for the capability-gap variant
    pub fn not_supported(platform: PlatformKind, capability: &'static str) -> Self {
        Self::NotSupported {
            platform,
            capability,
        }
    }

    /// True when this error marks a missing capability rather than a fault
    pub fn is_capability_gap(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
