//! Storygraph adapter implementation
//!
//! Implements the `PlatformAdapter` trait against the session-backed JSON
//! endpoints of the Storygraph site. There is no public API; the adapter
//! authenticates with the `_storygraph_session` cookie a user extracts from
//! their browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use platform_traits::{
    Candidate, HttpClient, HttpMethod, HttpRequest, ItemSummary, LibraryRef, PlatformAdapter,
    PlatformError, PlatformKind, ProgressSnapshot, Result,
};
use tracing::{info, instrument};

use crate::types::StorygraphBook;

/// Storygraph site address
pub const SITE_URL: &str = "https://app.thestorygraph.com";

/// Session cookie name
const SESSION_COOKIE: &str = "_storygraph_session";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Storygraph session-cookie adapter
///
/// Secondary platform with the narrowest capability surface: search and
/// progress writes only. There is no ISBN lookup, so identifier resolution
/// always falls through to search.
pub struct StorygraphAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    session_cookie: String,
}

impl StorygraphAdapter {
    /// Create a new adapter
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `session_cookie` - `_storygraph_session` cookie value
    pub fn new(http_client: Arc<dyn HttpClient>, session_cookie: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: SITE_URL.to_string(),
            session_cookie: session_cookie.into(),
        }
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .header(
                "Cookie",
                format!("{}={}", SESSION_COOKIE, self.session_cookie),
            )
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }
}

fn check_session(status: u16) -> Result<()> {
    if status == 401 || status == 403 {
        return Err(PlatformError::Auth(
            "Storygraph session cookie is invalid or expired".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl PlatformAdapter for StorygraphAdapter {
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>> {
        Err(PlatformError::not_supported(
            PlatformKind::Storygraph,
            "library listing",
        ))
    }

    async fn list_items(&self, _library_id: &str) -> Result<Vec<ItemSummary>> {
        Err(PlatformError::not_supported(
            PlatformKind::Storygraph,
            "item listing",
        ))
    }

    async fn get_progress(&self, _item_id: &str) -> Result<Option<ProgressSnapshot>> {
        Err(PlatformError::not_supported(
            PlatformKind::Storygraph,
            "progress reads",
        ))
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn search_books(&self, query: &str, limit: u32) -> Result<Vec<Candidate>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/search.json?search_term={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Get, url))
            .await?;

        check_session(response.status)?;
        if !response.is_success() {
            return Err(PlatformError::Api {
                status: response.status,
                message: response.text().unwrap_or_default(),
            });
        }

        // The endpoint has no limit parameter; trim client side
        let mut books: Vec<StorygraphBook> = response.json()?;
        books.truncate(limit as usize);

        info!(candidates = books.len(), "Storygraph search finished");
        Ok(books.into_iter().map(Candidate::from).collect())
    }

    async fn get_by_identifier(&self, _isbn: &str) -> Result<Option<Candidate>> {
        Err(PlatformError::not_supported(
            PlatformKind::Storygraph,
            "ISBN lookup",
        ))
    }

    #[instrument(skip(self), fields(book_id = %platform_book_id, percent = %percent))]
    async fn update_progress(
        &self,
        platform_book_id: &str,
        percent: f64,
        is_finished: bool,
    ) -> Result<bool> {
        let url = format!(
            "{}/books/{}/progress",
            self.base_url,
            urlencoding::encode(platform_book_id)
        );

        let mut request = self
            .request(HttpMethod::Post, url)
            .header("Content-Type", "application/x-www-form-urlencoded");
        request.body = Some(format!("progress={}&finished={}", percent, is_finished).into_bytes());

        let response = self.http_client.execute(request).await?;
        check_session(response.status)?;

        // Form endpoints answer 302 on success, 422 when the row is rejected
        match response.status {
            status if (200..300).contains(&status) || status == 302 => {
                info!("Storygraph accepted the progress update");
                Ok(true)
            }
            422 => Ok(false),
            status => Err(PlatformError::Api {
                status,
                message: response.text().unwrap_or_default(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn validate_connection(&self) -> Result<bool> {
        let url = format!("{}/profile", self.base_url);
        let response = self
            .http_client
            .execute(self.request(HttpMethod::Get, url))
            .await?;

        // An expired session redirects to the sign-in page
        Ok(response.status == 200)
    }
}
