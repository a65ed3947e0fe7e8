use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported book platforms.
///
/// The closed set of platforms the engine can talk to. One platform is the
/// canonical source of listening progress; the rest receive mirrored
/// progress through resolved mappings.
///
/// # Examples
///
/// ```
/// use platform_traits::PlatformKind;
///
/// let platform = PlatformKind::Hardcover;
/// assert_eq!(platform.display_name(), "Hardcover");
/// assert!(!platform.is_canonical());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    /// Audiobookshelf server, the canonical progress source
    Audiobookshelf,
    /// Hardcover reading tracker
    Hardcover,
    /// The StoryGraph reading tracker
    Storygraph,
}

impl PlatformKind {
    /// Get the human-readable display name for this platform
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_traits::PlatformKind;
    ///
    /// assert_eq!(PlatformKind::Audiobookshelf.display_name(), "Audiobookshelf");
    /// assert_eq!(PlatformKind::Storygraph.display_name(), "Storygraph");
    /// ```
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::Audiobookshelf => "Audiobookshelf",
            PlatformKind::Hardcover => "Hardcover",
            PlatformKind::Storygraph => "Storygraph",
        }
    }

    /// Get the platform identifier string
    ///
    /// Used for persistence and logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_traits::PlatformKind;
    ///
    /// assert_eq!(PlatformKind::Hardcover.as_str(), "hardcover");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Audiobookshelf => "audiobookshelf",
            PlatformKind::Hardcover => "hardcover",
            PlatformKind::Storygraph => "storygraph",
        }
    }

    /// Parse a platform kind from a string identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use platform_traits::PlatformKind;
    ///
    /// assert_eq!(PlatformKind::parse("hardcover"), Some(PlatformKind::Hardcover));
    /// assert_eq!(PlatformKind::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "audiobookshelf" | "abs" => Some(PlatformKind::Audiobookshelf),
            "hardcover" | "hardcovers" => Some(PlatformKind::Hardcover),
            "storygraph" | "the_storygraph" => Some(PlatformKind::Storygraph),
            _ => None,
        }
    }

    /// Whether this platform is the canonical progress source
    pub fn is_canonical(&self) -> bool {
        matches!(self, PlatformKind::Audiobookshelf)
    }

    /// The secondary platforms, in registration order
    pub fn secondary() -> [PlatformKind; 2] {
        [PlatformKind::Hardcover, PlatformKind::Storygraph]
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(PlatformKind::Audiobookshelf.display_name(), "Audiobookshelf");
        assert_eq!(PlatformKind::Hardcover.display_name(), "Hardcover");
        assert_eq!(PlatformKind::Storygraph.display_name(), "Storygraph");
    }

    #[test]
    fn test_as_str() {
        assert_eq!(PlatformKind::Audiobookshelf.as_str(), "audiobookshelf");
        assert_eq!(PlatformKind::Hardcover.as_str(), "hardcover");
        assert_eq!(PlatformKind::Storygraph.as_str(), "storygraph");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            PlatformKind::parse("audiobookshelf"),
            Some(PlatformKind::Audiobookshelf)
        );
        assert_eq!(PlatformKind::parse("abs"), Some(PlatformKind::Audiobookshelf));
        assert_eq!(PlatformKind::parse("hardcover"), Some(PlatformKind::Hardcover));
        assert_eq!(
            PlatformKind::parse("hardcovers"),
            Some(PlatformKind::Hardcover)
        );
        assert_eq!(
            PlatformKind::parse("Storygraph"),
            Some(PlatformKind::Storygraph)
        );
        assert_eq!(PlatformKind::parse("invalid"), None);
    }

    #[test]
    fn test_round_trip_through_as_str() {
        for kind in [
            PlatformKind::Audiobookshelf,
            PlatformKind::Hardcover,
            PlatformKind::Storygraph,
        ] {
            assert_eq!(PlatformKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_is_canonical() {
        assert!(PlatformKind::Audiobookshelf.is_canonical());
        assert!(!PlatformKind::Hardcover.is_canonical());
        assert!(!PlatformKind::Storygraph.is_canonical());
    }

    #[test]
    fn test_secondary_excludes_canonical() {
        let secondary = PlatformKind::secondary();
        assert!(!secondary.iter().any(|p| p.is_canonical()));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PlatformKind::Hardcover), "Hardcover");
    }

    #[test]
    fn test_serialization() {
        let platform = PlatformKind::Storygraph;
        let json = serde_json::to_string(&platform).unwrap();
        let deserialized: PlatformKind = serde_json::from_str(&json).unwrap();
        assert_eq!(platform, deserialized);
    }
}
