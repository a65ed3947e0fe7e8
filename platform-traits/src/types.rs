//! Wire types shared between the engine and platform adapters.

use serde::{Deserialize, Serialize};

/// A library on the canonical platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRef {
    /// Platform-native library id
    pub id: String,
    /// Display name
    pub name: String,
}

/// One item as enumerated from a canonical library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Platform-native item id
    pub id: String,
    pub title: String,
    pub author: String,
    /// ISBN when the source metadata carries one
    pub isbn: Option<String>,
}

/// Listening state for one item, as reported by the canonical platform.
///
/// `progress` and `total_duration` share a single unit (seconds for
/// audio sources); percentage derivation divides one by the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Current position
    pub progress: f64,
    /// Total length, zero when the source does not know it
    pub total_duration: f64,
    pub is_finished: bool,
}

/// A search or lookup result from a secondary platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Platform-native book id
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
}

impl Candidate {
    /// Text used for similarity comparison: title followed by all authors
    pub fn search_text(&self) -> String {
        if self.authors.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.authors.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_search_text() {
        let candidate = Candidate {
            id: "42".to_string(),
            title: "Dune".to_string(),
            authors: vec!["Frank Herbert".to_string()],
            isbn: Some("9780441013593".to_string()),
        };
        assert_eq!(candidate.search_text(), "Dune Frank Herbert");
    }

    #[test]
    fn test_candidate_search_text_no_authors() {
        let candidate = Candidate {
            id: "42".to_string(),
            title: "Dune".to_string(),
            authors: vec![],
            isbn: None,
        };
        assert_eq!(candidate.search_text(), "Dune");
    }

    #[test]
    fn test_progress_snapshot_serialization() {
        let snapshot = ProgressSnapshot {
            progress: 1800.0,
            total_duration: 3600.0,
            is_finished: false,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let deserialized: ProgressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, deserialized);
    }
}
