//! Hardcover GraphQL types
//!
//! Request envelope and response payloads for the Hardcover API.

use platform_traits::Candidate;
use serde::{Deserialize, Deserializer, Serialize};

/// GraphQL request envelope
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,

    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// One entry of a GraphQL `errors` payload
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

/// Book resource returned by `search` and `bookByIsbn`
#[derive(Debug, Clone, Deserialize)]
pub struct HardcoverBook {
    /// Book ID; the API serves numeric IDs, older records string ones
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub authors: Vec<HardcoverAuthor>,

    #[serde(default)]
    pub isbn13: Option<String>,
}

/// Author entry nested in a book resource
#[derive(Debug, Clone, Deserialize)]
pub struct HardcoverAuthor {
    pub name: String,
}

impl From<HardcoverBook> for Candidate {
    fn from(book: HardcoverBook) -> Self {
        Candidate {
            id: book.id,
            title: book.title,
            authors: book.authors.into_iter().map(|author| author.name).collect(),
            isbn: book.isbn13.filter(|isbn| !isbn.is_empty()),
        }
    }
}

/// `search` query payload
#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchResults,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub books: Vec<HardcoverBook>,
}

/// `bookByIsbn` query payload
#[derive(Debug, Deserialize)]
pub struct BookByIsbnData {
    #[serde(rename = "bookByIsbn")]
    pub book_by_isbn: Option<HardcoverBook>,
}

/// `updateReadingProgress` mutation payload
#[derive(Debug, Deserialize)]
pub struct UpdateProgressData {
    #[serde(rename = "updateReadingProgress")]
    pub update_reading_progress: Option<UpdateResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateResult {
    #[serde(default)]
    pub success: bool,
}

/// `me` query payload
#[derive(Debug, Deserialize)]
pub struct MeData {
    pub me: Option<Me>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(value) => value,
        Raw::Number(value) => value.to_string(),
    })
}
