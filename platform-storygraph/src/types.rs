//! Storygraph response types
//!
//! Payloads for the session-backed JSON endpoints the site itself uses.

use platform_traits::Candidate;
use serde::Deserialize;

/// One row of a `search.json` response
#[derive(Debug, Clone, Deserialize)]
pub struct StorygraphBook {
    /// Book slug used in site URLs
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub author: Option<String>,

    /// Canonical page URL
    #[serde(default)]
    pub url: Option<String>,
}

impl From<StorygraphBook> for Candidate {
    fn from(book: StorygraphBook) -> Self {
        Candidate {
            id: book.id,
            title: book.title,
            authors: book.author.into_iter().collect(),
            // Storygraph search rows carry no identifiers
            isbn: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search_row() {
        let json = r#"{
            "id": "dune-frank-herbert",
            "title": "Dune",
            "author": "Frank Herbert",
            "url": "/books/dune-frank-herbert"
        }"#;

        let book: StorygraphBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.id, "dune-frank-herbert");
        assert_eq!(book.author.as_deref(), Some("Frank Herbert"));
    }

    #[test]
    fn test_book_to_candidate() {
        let book = StorygraphBook {
            id: "dune-frank-herbert".to_string(),
            title: "Dune".to_string(),
            author: None,
            url: None,
        };

        let candidate = Candidate::from(book);
        assert!(candidate.authors.is_empty());
        assert!(candidate.isbn.is_none());
    }
}
