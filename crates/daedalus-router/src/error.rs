//! Route registration errors.

use http::Method;
use thiserror::Error;

/// A path pattern that cannot be placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A `*name` segment appears before the end of the pattern.
    #[error("wildcard must be the last segment in `{0}`")]
    WildcardNotLast(String),

    /// `:` / `{}` / `*` with no name.
    #[error("parameter without a name in `{0}`")]
    EmptyName(String),

    /// Two patterns place differently named parameters at the same depth.
    #[error("`{pattern}` names parameter `{name}` where `{existing}` is already registered")]
    ConflictingName {
        /// Pattern being inserted
        pattern: String,
        /// Segment already in the tree
        existing: String,
        /// Name requested by the new pattern
        name: String,
    },

    /// The verb is already registered for this exact pattern.
    #[error("{method} {pattern} is already registered")]
    Duplicate {
        /// Verb
        method: Method,
        /// Path pattern
        pattern: String,
    },
}
