//! Workspace facade crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (e.g., `platform-audiobookshelf`, `platform-hardcover`,
//! `platform-storygraph`). Host applications can depend on
//! `shelfsync-workspace`, enable the platforms they need, and wire an engine
//! without touching each crate individually.
//!
//! # Example
//!
//! ```ignore
//! use shelfsync_workspace as shelfsync;
//!
//! let config = shelfsync::EngineConfig::builder()
//!     .canonical_base_url("http://abs.local:13378")
//!     .canonical_api_token(token)
//!     .hardcover_api_token(hc_token)
//!     .database_path("/data/shelfsync.db")
//!     .build()?;
//!
//! let registry = shelfsync::build_registry(&config);
//! let db = shelfsync::store::DatabaseConfig::new(&config.database_path);
//! let pool = shelfsync::store::create_pool(db).await?;
//! let bus = Arc::new(shelfsync::EventBus::new(256));
//! let runner = shelfsync::ReconciliationRunner::from_pool(
//!     (&config).into(),
//!     Arc::new(registry),
//!     pool,
//!     bus,
//! );
//! runner.recover_abandoned_jobs().await?;
//! runner.run_sync_pass().await?;
//! ```

pub use core_runtime as runtime;
pub use core_store as store;
pub use core_sync as sync;
pub use platform_traits as traits;

#[cfg(feature = "audiobookshelf")]
pub use platform_audiobookshelf as audiobookshelf;
#[cfg(feature = "hardcover")]
pub use platform_hardcover as hardcover;
#[cfg(feature = "storygraph")]
pub use platform_storygraph as storygraph;

pub use core_runtime::config::EngineConfig;
pub use core_runtime::events::{EngineEvent, EventBus};
pub use core_sync::{PlatformRegistry, ReconciliationRunner, RunnerConfig, SyncStats};
pub use platform_traits::PlatformKind;

#[cfg(any(feature = "audiobookshelf", feature = "hardcover", feature = "storygraph"))]
mod wiring {
    use std::sync::Arc;
    use std::time::Duration;

    use core_runtime::config::EngineConfig;
    use core_runtime::http::ReqwestHttpClient;
    use core_sync::PlatformRegistry;
    use platform_traits::{HttpClient, PlatformKind};

    /// Build a registry with every enabled platform that has credentials.
    ///
    /// The canonical adapter is always registered; Hardcover and Storygraph
    /// join only when their token or cookie is configured, so a host can run
    /// with any subset of secondary platforms.
    pub fn build_registry(config: &EngineConfig) -> PlatformRegistry {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(
            Duration::from_secs(config.http_timeout_secs),
        ));

        let mut registry = PlatformRegistry::new();

        #[cfg(feature = "audiobookshelf")]
        registry.register(
            PlatformKind::Audiobookshelf,
            Arc::new(platform_audiobookshelf::AudiobookshelfAdapter::new(
                Arc::clone(&http_client),
                config.canonical_base_url.clone(),
                config.canonical_api_token.clone(),
            )),
        );

        #[cfg(feature = "hardcover")]
        if let Some(token) = &config.hardcover_api_token {
            registry.register(
                PlatformKind::Hardcover,
                Arc::new(platform_hardcover::HardcoverAdapter::new(
                    Arc::clone(&http_client),
                    token.clone(),
                )),
            );
        }

        #[cfg(feature = "storygraph")]
        if let Some(cookie) = &config.storygraph_session_cookie {
            registry.register(
                PlatformKind::Storygraph,
                Arc::new(platform_storygraph::StorygraphAdapter::new(
                    Arc::clone(&http_client),
                    cookie.clone(),
                )),
            );
        }

        registry
    }
}

#[cfg(any(feature = "audiobookshelf", feature = "hardcover", feature = "storygraph"))]
pub use wiring::build_registry;
