//! # Platform Registry
//!
//! Holds the platform adapters the engine talks to.
//!
//! Adapters are registered once at startup, before the registry is shared,
//! so lookups and iteration need no locking. Iteration follows registration
//! order, which keeps pass output deterministic.

use platform_traits::{PlatformAdapter, PlatformKind};
use std::sync::Arc;
use tracing::info;

/// Registry of platform adapters, iterated in registration order
#[derive(Default)]
pub struct PlatformRegistry {
    adapters: Vec<(PlatformKind, Arc<dyn PlatformAdapter>)>,
}

impl PlatformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register an adapter, replacing a previous registration of the same kind
    pub fn register(&mut self, kind: PlatformKind, adapter: Arc<dyn PlatformAdapter>) {
        if let Some(entry) = self.adapters.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = adapter;
        } else {
            self.adapters.push((kind, adapter));
        }
        info!("Registered platform adapter: {}", kind);
    }

    /// Look up the adapter for a platform
    pub fn get(&self, kind: PlatformKind) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    /// Registered platform kinds, in registration order
    pub fn kinds(&self) -> Vec<PlatformKind> {
        self.adapters.iter().map(|(kind, _)| *kind).collect()
    }

    /// Registered secondary platforms, in registration order
    pub fn secondary_kinds(&self) -> Vec<PlatformKind> {
        self.adapters
            .iter()
            .filter(|(kind, _)| !kind.is_canonical())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Iterate registered adapters in registration order
    pub fn iter(&self) -> impl Iterator<Item = (PlatformKind, &Arc<dyn PlatformAdapter>)> {
        self.adapters.iter().map(|(kind, adapter)| (*kind, adapter))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
