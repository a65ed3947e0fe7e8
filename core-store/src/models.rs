//! Persistent entities for the sync engine: canonical books and their
//! per-platform mappings.
//!
//! `CanonicalBook` mirrors one item of the canonical library and carries the
//! listening state observed on the last pull. `PlatformMapping` associates a
//! canonical book with its identifier on one secondary platform, together
//! with the confidence of that association.

use platform_traits::PlatformKind;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a canonical book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct BookId(pub Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a platform mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct MappingId(pub Uuid);

impl MappingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MappingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Entities
// =============================================================================

/// One entry per item in the canonical source library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CanonicalBook {
    /// Unique identifier
    pub id: String,
    /// Stable item id on the canonical platform
    pub source_id: String,
    /// Book title
    pub title: String,
    /// Book author
    pub author: String,
    /// ISBN when the canonical platform knows one
    pub isbn: Option<String>,
    /// Current listening position, in the same unit as `total_duration`
    pub progress: f64,
    /// Total duration reported by the canonical platform
    pub total_duration: f64,
    /// Finished flag - SQLite stores as 0 or 1
    pub is_finished: i64,
    /// When listening was first observed
    pub started_at: Option<i64>,
    /// When the finished flag was first observed
    pub finished_at: Option<i64>,
    /// When a sync attempt last covered this book
    pub last_synced_at: Option<i64>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl CanonicalBook {
    /// Create a new canonical book as first observed during a library pull
    pub fn new(source_id: String, title: String, author: String, isbn: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: BookId::new().to_string(),
            source_id,
            title,
            author,
            isbn,
            progress: 0.0,
            total_duration: 0.0,
            is_finished: 0,
            started_at: None,
            finished_at: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the listening state reported by the canonical platform
    ///
    /// `started_at` is stamped the first time a nonzero position is seen and
    /// `finished_at` the first time the finished flag is seen; both are kept
    /// on subsequent updates.
    pub fn apply_progress(&mut self, progress: f64, total_duration: f64, is_finished: bool) {
        let now = chrono::Utc::now().timestamp();

        self.progress = progress;
        self.total_duration = total_duration;
        self.is_finished = i64::from(is_finished);

        if self.started_at.is_none() && progress > 0.0 {
            self.started_at = Some(now);
        }
        if self.finished_at.is_none() && is_finished {
            self.finished_at = Some(now);
        }

        self.updated_at = now;
    }

    /// Validate book data
    pub fn validate(&self) -> Result<(), String> {
        if self.source_id.trim().is_empty() {
            return Err("Book source_id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Book title cannot be empty".to_string());
        }

        if self.total_duration < 0.0 {
            return Err("Total duration cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Association between a canonical book and its id on one secondary platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMapping {
    /// Unique identifier
    pub id: String,
    /// Owning canonical book
    pub book_id: String,
    /// Secondary platform this mapping targets
    pub platform: PlatformKind,
    /// Book id in the platform's own identifier space
    pub platform_book_id: String,
    /// Match confidence in [0.0, 1.0]; 1.0 for exact-identifier and manual matches
    pub confidence: f64,
    /// Manual override flag - SQLite stores as 0 or 1
    pub is_manual: i64,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl PlatformMapping {
    /// Create a mapping produced by an exact identifier (ISBN) lookup
    pub fn exact(book_id: String, platform: PlatformKind, platform_book_id: String) -> Self {
        Self::build(book_id, platform, platform_book_id, 1.0, false)
    }

    /// Create a mapping produced by heuristic title/author scoring
    pub fn heuristic(
        book_id: String,
        platform: PlatformKind,
        platform_book_id: String,
        confidence: f64,
    ) -> Self {
        Self::build(book_id, platform, platform_book_id, confidence, false)
    }

    /// Create a manual-override mapping supplied by the host
    pub fn manual(book_id: String, platform: PlatformKind, platform_book_id: String) -> Self {
        Self::build(book_id, platform, platform_book_id, 1.0, true)
    }

    fn build(
        book_id: String,
        platform: PlatformKind,
        platform_book_id: String,
        confidence: f64,
        is_manual: bool,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: MappingId::new().to_string(),
            book_id,
            platform,
            platform_book_id,
            confidence,
            is_manual: i64::from(is_manual),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this mapping was pinned by the host rather than the matcher
    pub fn is_manual_override(&self) -> bool {
        self.is_manual != 0
    }

    /// Validate mapping data
    pub fn validate(&self) -> Result<(), String> {
        if self.book_id.trim().is_empty() {
            return Err("Mapping book_id cannot be empty".to_string());
        }

        if self.platform_book_id.trim().is_empty() {
            return Err("Mapping platform_book_id cannot be empty".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Mapping confidence {} is out of valid range",
                self.confidence
            ));
        }

        if self.is_manual != 0 && self.confidence != 1.0 {
            return Err("Manual mappings must have confidence 1.0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_id_new() {
        let id1 = BookId::new();
        let id2 = BookId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_book_id_from_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = BookId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
    }

    #[test]
    fn test_book_id_from_string_invalid() {
        assert!(BookId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_mapping_id_display() {
        let id = MappingId::default();
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn test_canonical_book_new() {
        let book = CanonicalBook::new(
            "item-1".to_string(),
            "Dune".to_string(),
            "Frank Herbert".to_string(),
            Some("9780441013593".to_string()),
        );

        assert_eq!(book.source_id, "item-1");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.progress, 0.0);
        assert_eq!(book.total_duration, 0.0);
        assert_eq!(book.is_finished, 0);
        assert!(book.started_at.is_none());
        assert!(book.finished_at.is_none());
        assert!(book.last_synced_at.is_none());
    }

    #[test]
    fn test_canonical_book_apply_progress() {
        let mut book = CanonicalBook::new(
            "item-1".to_string(),
            "Dune".to_string(),
            "Frank Herbert".to_string(),
            None,
        );

        book.apply_progress(50.0, 100.0, false);

        assert_eq!(book.progress, 50.0);
        assert_eq!(book.total_duration, 100.0);
        assert_eq!(book.is_finished, 0);
        assert!(book.started_at.is_some());
        assert!(book.finished_at.is_none());
    }

    #[test]
    fn test_canonical_book_apply_progress_keeps_started_at() {
        let mut book = CanonicalBook::new(
            "item-1".to_string(),
            "Dune".to_string(),
            "Frank Herbert".to_string(),
            None,
        );

        book.apply_progress(10.0, 100.0, false);
        let first_started = book.started_at;

        book.apply_progress(90.0, 100.0, true);

        assert_eq!(book.started_at, first_started);
        assert_eq!(book.is_finished, 1);
        assert!(book.finished_at.is_some());
    }

    #[test]
    fn test_canonical_book_zero_progress_not_started() {
        let mut book = CanonicalBook::new(
            "item-1".to_string(),
            "Dune".to_string(),
            "Frank Herbert".to_string(),
            None,
        );

        book.apply_progress(0.0, 100.0, false);
        assert!(book.started_at.is_none());
    }

    #[test]
    fn test_canonical_book_validate() {
        let book = CanonicalBook::new(
            "item-1".to_string(),
            "Dune".to_string(),
            "Frank Herbert".to_string(),
            None,
        );
        assert!(book.validate().is_ok());

        let mut invalid = book.clone();
        invalid.title = "  ".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = book.clone();
        invalid.source_id = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = book;
        invalid.total_duration = -1.0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_platform_mapping_exact() {
        let mapping = PlatformMapping::exact(
            "book-1".to_string(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );

        assert_eq!(mapping.confidence, 1.0);
        assert!(!mapping.is_manual_override());
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_platform_mapping_heuristic() {
        let mapping = PlatformMapping::heuristic(
            "book-1".to_string(),
            PlatformKind::Storygraph,
            "sg-7".to_string(),
            0.92,
        );

        assert_eq!(mapping.confidence, 0.92);
        assert!(!mapping.is_manual_override());
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_platform_mapping_manual() {
        let mapping = PlatformMapping::manual(
            "book-1".to_string(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );

        assert_eq!(mapping.confidence, 1.0);
        assert!(mapping.is_manual_override());
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_platform_mapping_validate_confidence_range() {
        let mut mapping = PlatformMapping::heuristic(
            "book-1".to_string(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
            1.2,
        );
        assert!(mapping.validate().is_err());

        mapping.confidence = -0.1;
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_platform_mapping_validate_manual_confidence() {
        let mut mapping = PlatformMapping::manual(
            "book-1".to_string(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );
        mapping.confidence = 0.8;
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_platform_mapping_validate_empty_ids() {
        let mapping = PlatformMapping::exact(
            String::new(),
            PlatformKind::Hardcover,
            "hc-42".to_string(),
        );
        assert!(mapping.validate().is_err());

        let mapping = PlatformMapping::exact(
            "book-1".to_string(),
            PlatformKind::Hardcover,
            String::new(),
        );
        assert!(mapping.validate().is_err());
    }
}
