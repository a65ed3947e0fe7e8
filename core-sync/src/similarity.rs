//! # Token-Set Similarity Scoring
//!
//! Scores how well two "title author" strings describe the same book.
//!
//! ## Overview
//!
//! Both sides are tokenized (lowercased, split on non-alphanumeric runs,
//! deduplicated, sorted), then compared through three reconstructed strings:
//! the shared tokens alone, and the shared tokens extended with each side's
//! remainder. The best normalized Levenshtein ratio among the three pairs is
//! the score, on a 0-100 scale.
//!
//! Token order and punctuation never affect the score, so "Herbert, Frank -
//! Dune" and "Dune Frank Herbert" are a perfect match. When one side's
//! tokens are a subset of the other's the score is 100, which is the
//! behavior wanted for subtitle and edition-suffix noise.

use std::collections::BTreeSet;
use strsim::normalized_levenshtein;

/// Score two strings for token-set similarity, in [0.0, 100.0]
///
/// Returns 0.0 when either side has no tokens.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let common: Vec<&str> = tokens_a
        .intersection(&tokens_b)
        .map(String::as_str)
        .collect();
    let only_a: Vec<&str> = tokens_a
        .difference(&tokens_b)
        .map(String::as_str)
        .collect();
    let only_b: Vec<&str> = tokens_b
        .difference(&tokens_a)
        .map(String::as_str)
        .collect();

    let base = common.join(" ");
    let full_a = join_sections(&common, &only_a);
    let full_b = join_sections(&common, &only_b);

    let best = [
        normalized_levenshtein(&base, &full_a),
        normalized_levenshtein(&base, &full_b),
        normalized_levenshtein(&full_a, &full_b),
    ]
    .into_iter()
    .fold(0.0_f64, f64::max);

    best * 100.0
}

/// Lowercased unique tokens in sorted order
fn tokenize(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn join_sections(common: &[&str], rest: &[&str]) -> String {
    let mut parts = Vec::with_capacity(common.len() + rest.len());
    parts.extend_from_slice(common);
    parts.extend_from_slice(rest);
    parts.join(" ")
}
