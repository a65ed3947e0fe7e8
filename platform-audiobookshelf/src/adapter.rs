//! Audiobookshelf adapter implementation
//!
//! Implements the `PlatformAdapter` trait against the Audiobookshelf REST
//! API. Audiobookshelf is the canonical side of the engine: it serves
//! libraries, items, and listening progress, and never receives pushes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use platform_traits::{
    Candidate, HttpClient, HttpMethod, HttpRequest, HttpResponse, ItemSummary, LibraryRef,
    PlatformAdapter, PlatformError, PlatformKind, ProgressSnapshot, Result,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::types::{LibrariesResponse, Library, LibraryItem, LibraryItemsResponse, MediaProgress};

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Items requested per library; the server caps page size at this value
const ITEMS_PAGE_LIMIT: u32 = 10000;

/// Audiobookshelf REST adapter
///
/// # Example
///
/// ```ignore
/// use platform_audiobookshelf::AudiobookshelfAdapter;
/// use platform_traits::PlatformAdapter;
///
/// let adapter = AudiobookshelfAdapter::new(http_client, "http://abs.local:13378", token);
/// let libraries = adapter.list_libraries().await?;
/// ```
pub struct AudiobookshelfAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_token: String,
}

impl AudiobookshelfAdapter {
    /// Create a new adapter
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `base_url` - Server address, e.g. `http://localhost:13378`
    /// * `api_token` - API token from the Audiobookshelf account page
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    fn get_request(&self, url: String) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.api_token.as_str())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let response = self.http_client.execute(self.get_request(url)).await?;
        if !response.is_success() {
            return Err(error_for_status(&response));
        }
        response.json()
    }
}

fn error_for_status(response: &HttpResponse) -> PlatformError {
    if response.status == 401 || response.status == 403 {
        PlatformError::Auth("Audiobookshelf rejected the API token".to_string())
    } else {
        PlatformError::Api {
            status: response.status,
            message: response.text().unwrap_or_default(),
        }
    }
}

fn to_library_ref(library: Library) -> LibraryRef {
    LibraryRef {
        id: library.id,
        name: library.name,
    }
}

fn to_item_summary(item: LibraryItem) -> ItemSummary {
    ItemSummary {
        id: item.id,
        title: item.media.metadata.title,
        author: item.media.metadata.author_name,
        isbn: item.media.metadata.isbn.filter(|isbn| !isbn.is_empty()),
    }
}

fn to_snapshot(progress: MediaProgress) -> ProgressSnapshot {
    ProgressSnapshot {
        progress: progress.current_time,
        total_duration: progress.duration,
        is_finished: progress.is_finished,
    }
}

#[async_trait]
impl PlatformAdapter for AudiobookshelfAdapter {
    #[instrument(skip(self))]
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>> {
        let url = format!("{}/api/libraries", self.base_url);
        let response: LibrariesResponse = self.get_json(url).await?;

        info!(libraries = response.libraries.len(), "Listed Audiobookshelf libraries");
        Ok(response
            .libraries
            .into_iter()
            .map(to_library_ref)
            .collect())
    }

    #[instrument(skip(self), fields(library_id = %library_id))]
    async fn list_items(&self, library_id: &str) -> Result<Vec<ItemSummary>> {
        let url = format!(
            "{}/api/libraries/{}/items?limit={}",
            self.base_url,
            urlencoding::encode(library_id),
            ITEMS_PAGE_LIMIT
        );
        let response: LibraryItemsResponse = self.get_json(url).await?;

        info!(items = response.results.len(), "Listed library items");
        Ok(response.results.into_iter().map(to_item_summary).collect())
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn get_progress(&self, item_id: &str) -> Result<Option<ProgressSnapshot>> {
        let url = format!(
            "{}/api/me/progress/{}",
            self.base_url,
            urlencoding::encode(item_id)
        );

        let response = self.http_client.execute(self.get_request(url)).await?;

        // The server answers 404 for items the user has never played
        if response.status == 404 {
            debug!("No progress recorded for item");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(error_for_status(&response));
        }

        let progress: MediaProgress = response.json()?;
        Ok(Some(to_snapshot(progress)))
    }

    async fn search_books(&self, _query: &str, _limit: u32) -> Result<Vec<Candidate>> {
        Err(PlatformError::not_supported(
            PlatformKind::Audiobookshelf,
            "search",
        ))
    }

    async fn get_by_identifier(&self, _isbn: &str) -> Result<Option<Candidate>> {
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
    ) -> Result<bool> {
        Err(PlatformError::not_supported(
            PlatformKind::Audiobookshelf,
            "progress updates",
        ))
    }

    #[instrument(skip(self))]
    async fn validate_connection(&self) -> Result<bool> {
        let url = format!("{}/api/me", self.base_url);
        let response = self.http_client.execute(self.get_request(url)).await?;

        Ok(response.status == 200)
    }
}
