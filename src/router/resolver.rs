//! Priority-based credential resolution

use super::RouterError;
use crate::config::CredentialEntry;
use std::cmp::Ordering;

/// Resolves a target repository to the credential entries that apply to it
#[derive(Debug, Clone, Copy)]
pub struct CredentialResolver<'a> {
    entries: &'a [CredentialEntry],
}

impl<'a> CredentialResolver<'a> {
    /// Create a resolver over a set of entries
    pub fn new(entries: &'a [CredentialEntry]) -> Self {
        Self { entries }
    }

    /// Every matching entry, best first.
    ///
    /// Ordered by priority descending, then name ascending. The caller's
    /// slice is left untouched.
    pub fn resolve(&self, target: &str) -> Vec<&'a CredentialEntry> {
        by_priority(self.entries.iter().filter(|e| e.matches(target)))
    }

    /// The single best entry for `target`
    pub fn best(&self, target: &str) -> Result<&'a CredentialEntry, RouterError> {
        self.resolve(target)
            .into_iter()
            .next()
            .ok_or_else(|| RouterError::NoMatch(target.to_string()))
    }
}

/// Collect entries ordered by priority descending, then name ascending.
///
/// The sort is stable, so entries sharing both priority and name keep their
/// input order.
pub fn by_priority<'a>(
    entries: impl Iterator<Item = &'a CredentialEntry>,
) -> Vec<&'a CredentialEntry> {
    let mut ordered: Vec<_> = entries.collect();
    ordered.sort_by(|a, b| compare(a, b));
    ordered
}

fn compare(a: &CredentialEntry, b: &CredentialEntry) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.name.cmp(&b.name))
}
