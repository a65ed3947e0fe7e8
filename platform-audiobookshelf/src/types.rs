//! Audiobookshelf API response types
//!
//! Data structures for deserializing Audiobookshelf server responses.

use serde::{Deserialize, Serialize};

/// `GET /api/libraries` response
#[derive(Debug, Deserialize)]
pub struct LibrariesResponse {
    pub libraries: Vec<Library>,
}

/// Library resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Library ID
    pub id: String,

    /// Display name
    pub name: String,

    /// Media kind served by the library ("book" or "podcast")
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
}

/// `GET /api/libraries/{id}/items` response
#[derive(Debug, Deserialize)]
pub struct LibraryItemsResponse {
    pub results: Vec<LibraryItem>,

    /// Total matching items on the server
    #[serde(default)]
    pub total: u64,
}

/// Library item resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Item ID
    pub id: String,

    /// Media payload with metadata and duration
    #[serde(default)]
    pub media: Media,
}

/// Media payload of a library item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub metadata: MediaMetadata,

    /// Audio duration in seconds
    #[serde(default)]
    pub duration: f64,
}

/// Book metadata nested under `media.metadata`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author_name: String,

    #[serde(default)]
    pub isbn: Option<String>,
}

/// `GET /api/me/progress/{itemId}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProgress {
    /// Progress record ID
    pub id: String,

    /// Library item the record belongs to
    #[serde(default)]
    pub library_item_id: String,

    /// Total duration in seconds
    #[serde(default)]
    pub duration: f64,

    /// Current playback position in seconds
    #[serde(default)]
    pub current_time: f64,

    /// Fraction listened, 0.0 to 1.0
    #[serde(default)]
    pub progress: f64,

    /// Whether the server marks the item finished
    #[serde(default)]
    pub is_finished: bool,

    /// Last update, Unix milliseconds
    #[serde(default)]
    pub last_update: i64,
}
