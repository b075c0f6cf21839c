//! Repository pattern matching
//!
//! Grammar: `*` matches any run of characters, including none and including
//! `/`. Every other character matches only itself. Matching is case-sensitive
//! and anchored at both ends, so `github.com/org/*` matches every repository
//! under `org` but never `github.com/organization/repo`.

use crate::config::CredentialEntry;

const WILDCARD: u8 = b'*';

/// Whether `pattern` matches the whole of `target`
pub fn pattern_matches(pattern: &str, target: &str) -> bool {
    let pattern = pattern.as_bytes();
    let target = target.as_bytes();

    let mut p = 0;
    let mut t = 0;
    // Position of the last `*` seen and the target position it currently covers up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < target.len() {
        if p < pattern.len() && pattern[p] == WILDCARD {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == target[t] {
            p += 1;
            t += 1;
        } else if let Some((star, covered)) = backtrack {
            // Let the last `*` swallow one more byte and retry
            p = star + 1;
            t = covered + 1;
            backtrack = Some((star, covered + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&b| b == WILDCARD)
}

impl CredentialEntry {
    /// Whether any of this entry's patterns matches `target`
    pub fn matches(&self, target: &str) -> bool {
        self.patterns.iter().any(|p| pattern_matches(p, target))
    }
}
