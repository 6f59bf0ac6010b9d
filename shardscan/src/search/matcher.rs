use crate::errors::{SearchError, SearchResult};

/// Brute-force exact matcher over raw bytes.
///
/// Every start position is tried and overlapping occurrences are all
/// reported, so `"aa"` in `"aaaa"` matches at 0, 1 and 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatcher {
    pattern: Vec<u8>,
}

impl PatternMatcher {
    /// Creates a matcher for a non-empty pattern
    pub fn new(pattern: impl Into<Vec<u8>>) -> SearchResult<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    /// Number of start positions a haystack of `len` bytes offers
    pub fn candidates(&self, len: usize) -> usize {
        (len + 1).saturating_sub(self.pattern.len())
    }

    /// Whether the pattern occurs at `pos`
    pub fn is_match_at(&self, haystack: &[u8], pos: usize) -> bool {
        haystack
            .get(pos..pos + self.pattern.len())
            .is_some_and(|window| window == self.pattern.as_slice())
    }

    /// Finds every occurrence in `haystack`, returned as `offset + local index`
    /// in ascending order.
    pub fn find_matches(&self, haystack: &[u8], offset: usize) -> Vec<usize> {
        (0..self.candidates(haystack.len()))
            .filter(|&pos| self.is_match_at(haystack, pos))
            .map(|pos| pos + offset)
            .collect()
    }
}
