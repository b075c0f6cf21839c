//! Credential routing
//!
//! Handles:
//! - Matching repository identifiers against entry patterns
//! - Ordering matching entries by priority with a deterministic tie-break

mod matcher;
mod resolver;

pub use matcher::pattern_matches;
pub use resolver::{by_priority, CredentialResolver};

use thiserror::Error;

/// Routing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("no credential entry matches '{0}'")]
    NoMatch(String),
}
