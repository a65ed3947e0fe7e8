//! Hardcover adapter implementation
//!
//! Implements the `PlatformAdapter` trait over the Hardcover GraphQL API.
//! Hardcover is a secondary platform: it receives progress pushes and serves
//! search and ISBN lookups, but has no libraries of its own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use platform_traits::{
    Candidate, HttpClient, HttpMethod, HttpRequest, ItemSummary, LibraryRef, PlatformAdapter,
    PlatformError, PlatformKind, ProgressSnapshot, Result, RetryPolicy,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::types::{
    BookByIsbnData, GraphqlRequest, GraphqlResponse, MeData, SearchData, UpdateProgressData,
};

/// Hardcover GraphQL endpoint
pub const API_URL: &str = "https://api.hardcover.app/v1/graphql";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SEARCH_QUERY: &str = r"
    query SearchBooks($query: String!, $limit: Int!) {
        search(query: $query, limit: $limit) {
            books {
                id
                title
                authors {
                    name
                }
                isbn13
            }
        }
    }
";

const BOOK_BY_ISBN_QUERY: &str = r"
    query GetBookByIsbn($isbn: String!) {
        bookByIsbn(isbn: $isbn) {
            id
            title
            authors {
                name
            }
            isbn13
        }
    }
";

const UPDATE_PROGRESS_MUTATION: &str = r"
    mutation UpdateProgress($bookId: ID!, $progressPercent: Float!) {
        updateReadingProgress(bookId: $bookId, progressPercent: $progressPercent) {
            success
        }
    }
";

const ME_QUERY: &str = "query { me { id } }";

/// Hardcover GraphQL adapter
///
/// Transient 429 and 5xx responses are retried with bounded exponential
/// backoff before an error surfaces to the engine.
pub struct HardcoverAdapter {
    http_client: Arc<dyn HttpClient>,
    api_url: String,
    api_token: String,
}

impl HardcoverAdapter {
    /// Create a new adapter
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `api_token` - API token from hardcover.app/account/api
    pub fn new(http_client: Arc<dyn HttpClient>, api_token: impl Into<String>) -> Self {
        Self {
            http_client,
            api_url: API_URL.to_string(),
            api_token: api_token.into(),
        }
    }

    /// Execute one GraphQL operation and unwrap its `data` payload.
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let request = HttpRequest::new(HttpMethod::Post, self.api_url.clone())
            .bearer_token(self.api_token.as_str())
            .json(&GraphqlRequest { query, variables })?
            .timeout(REQUEST_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::default())
            .await?;

        if response.status == 401 || response.status == 403 {
            return Err(PlatformError::Auth(
                "Hardcover rejected the API token".to_string(),
            ));
        }
        if !response.is_success() {
            return Err(PlatformError::Api {
                status: response.status,
                message: response.text().unwrap_or_default(),
            });
        }

        let envelope: GraphqlResponse<T> = response.json()?;
        if let Some(error) = envelope.errors.first() {
            debug!(message = %error.message, "GraphQL operation returned errors");
            return Err(PlatformError::Api {
                status: response.status,
                message: error.message.clone(),
            });
        }

        envelope
            .data
            .ok_or_else(|| PlatformError::Parse("GraphQL response carried no data".to_string()))
    }
}

#[async_trait]
impl PlatformAdapter for HardcoverAdapter {
    async fn list_libraries(&self) -> Result<Vec<LibraryRef>> {
        Err(PlatformError::not_supported(
            PlatformKind::Hardcover,
            "library listing",
        ))
    }

    async fn list_items(&self, _library_id: &str) -> Result<Vec<ItemSummary>> {
        Err(PlatformError::not_supported(
            PlatformKind::Hardcover,
            "item listing",
        ))
    }

    async fn get_progress(&self, _item_id: &str) -> Result<Option<ProgressSnapshot>> {
        Err(PlatformError::not_supported(
            PlatformKind::Hardcover,
            "progress reads",
        ))
    }

    #[instrument(skip(self), fields(query = %query))]
    async fn search_books(&self, query: &str, limit: u32) -> Result<Vec<Candidate>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let data: SearchData = self
            .graphql(SEARCH_QUERY, json!({"query": query, "limit": limit}))
            .await?;

        let candidates: Vec<Candidate> = data
            .search
            .books
            .into_iter()
            .map(Candidate::from)
            .collect();
        info!(candidates = candidates.len(), "Hardcover search finished");

        Ok(candidates)
    }

    #[instrument(skip(self), fields(isbn = %isbn))]
    async fn get_by_identifier(&self, isbn: &str) -> Result<Option<Candidate>> {
        let data: BookByIsbnData = self
            .graphql(BOOK_BY_ISBN_QUERY, json!({"isbn": isbn}))
            .await?;

        Ok(data.book_by_isbn.map(Candidate::from))
    }

    #[instrument(skip(self), fields(book_id = %platform_book_id, percent = %percent))]
    async fn update_progress(
        &self,
        platform_book_id: &str,
        percent: f64,
        _is_finished: bool,
    ) -> Result<bool> {
        // The mutation has no finished flag; 100 percent conveys completion
        let data: UpdateProgressData = self
            .graphql(
                UPDATE_PROGRESS_MUTATION,
                json!({"bookId": platform_book_id, "progressPercent": percent}),
            )
            .await?;

        let accepted = data
            .update_reading_progress
            .map(|result| result.success)
            .unwrap_or(false);
        if accepted {
            info!("Hardcover accepted the progress update");
        }

        Ok(accepted)
    }

    #[instrument(skip(self))]
    async fn validate_connection(&self) -> Result<bool> {
        let data: MeData = self.graphql(ME_QUERY, json!({})).await?;
        Ok(data.me.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Client {}

        #[async_trait]
        impl HttpClient for Client {
            async fn execute(&self, request: HttpRequest) -> Result<platform_traits::HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> Result<platform_traits::HttpResponse>;
        }
    }

    fn adapter(mock: MockClient) -> HardcoverAdapter {
        HardcoverAdapter::new(Arc::new(mock), "test_token")
    }

    fn json_response(status: u16, body: &str) -> platform_traits::HttpResponse {
        platform_traits::HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn request_body(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_search_books_maps_candidates() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|request, _| {
                let body = request_body(&request);
                assert!(body["query"].as_str().unwrap().contains("SearchBooks"));
                assert_eq!(body["variables"]["query"], "Dune Frank Herbert");
                assert_eq!(body["variables"]["limit"], 5);

                Ok(json_response(
                    200,
                    r#"{"data": {"search": {"books": [
                        {
                            "id": 441013,
                            "title": "Dune",
                            "authors": [{"name": "Frank Herbert"}],
                            "isbn13": "9780441013593"
                        }
                    ]}}}"#,
                ))
            });

        let candidates = adapter(mock)
            .search_books("Dune Frank Herbert", 5)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "441013");
        assert_eq!(candidates[0].authors, vec!["Frank Herbert"]);
        assert_eq!(candidates[0].isbn.as_deref(), Some("9780441013593"));
    }

    #[tokio::test]
    async fn test_search_blank_query_short_circuits() {
        // No expectation set: reaching the transport would panic
        let candidates = adapter(MockClient::new())
            .search_books("   ", 5)
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_identifier_found() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|request, _| {
                let body = request_body(&request);
                assert_eq!(body["variables"]["isbn"], "9780441013593");

                Ok(json_response(
                    200,
                    r#"{"data": {"bookByIsbn": {
                        "id": "441013",
                        "title": "Dune",
                        "authors": [{"name": "Frank Herbert"}],
                        "isbn13": "9780441013593"
                    }}}"#,
                ))
            });

        let candidate = adapter(mock)
            .get_by_identifier("9780441013593")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(candidate.id, "441013");
        assert_eq!(candidate.title, "Dune");
    }

    #[tokio::test]
    async fn test_get_by_identifier_miss_is_none() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|_, _| Ok(json_response(200, r#"{"data": {"bookByIsbn": null}}"#)));

        let candidate = adapter(mock).get_by_identifier("9999999999999").await.unwrap();

        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_update_progress_sends_percent_only() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|request, _| {
                let body = request_body(&request);
                assert_eq!(body["variables"]["bookId"], "441013");
                assert_eq!(body["variables"]["progressPercent"], 50.0);
                // The finished flag never crosses the wire
                assert!(body["variables"].get("isFinished").is_none());

                Ok(json_response(
                    200,
                    r#"{"data": {"updateReadingProgress": {"success": true}}}"#,
                ))
            });

        let accepted = adapter(mock)
            .update_progress("441013", 50.0, true)
            .await
            .unwrap();

        assert!(accepted);
    }

    #[tokio::test]
    async fn test_update_progress_rejection_is_false() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry().times(1).returning(|_, _| {
            Ok(json_response(
                200,
                r#"{"data": {"updateReadingProgress": {"success": false}}}"#,
            ))
        });

        let accepted = adapter(mock)
            .update_progress("441013", 50.0, false)
            .await
            .unwrap();

        assert!(!accepted);
    }

    #[tokio::test]
    async fn test_graphql_errors_surface_as_api_error() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry().times(1).returning(|_, _| {
            Ok(json_response(
                200,
                r#"{"errors": [{"message": "query depth exceeded"}]}"#,
            ))
        });

        let result = adapter(mock).search_books("Dune", 5).await;

        assert!(matches!(
            result,
            Err(PlatformError::Api { status: 200, ref message }) if message == "query depth exceeded"
        ));
    }

    #[tokio::test]
    async fn test_rejected_token_maps_to_auth_error() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|_, _| Ok(json_response(401, "Unauthorized")));

        let result = adapter(mock).validate_connection().await;

        assert!(matches!(result, Err(PlatformError::Auth(_))));
    }

    #[tokio::test]
    async fn test_validate_connection() {
        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|_, _| Ok(json_response(200, r#"{"data": {"me": {"id": 7}}}"#)));
        assert!(adapter(mock).validate_connection().await.unwrap());

        let mut mock = MockClient::new();
        mock.expect_execute_with_retry()
            .times(1)
            .returning(|_, _| Ok(json_response(200, r#"{"data": {"me": null}}"#)));
        assert!(!adapter(mock).validate_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_canonical_operations_not_supported() {
        let adapter = adapter(MockClient::new());

        assert!(adapter.list_libraries().await.unwrap_err().is_capability_gap());
        assert!(adapter.list_items("lib").await.unwrap_err().is_capability_gap());
        assert!(adapter.get_progress("item").await.unwrap_err().is_capability_gap());
    }
}
