//! Errors raised while building and editing box models.

use crate::box_item::ValueType;

/// Result type for box model construction
pub type BuildResult<T> = Result<T, ConstructionError>;

/// The AST handed to a box model build has a shape the editor cannot represent.
/// Fatal to that build attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("Unsupported filter shape: {context} cannot hold a {found} node")]
    UnsupportedShape { context: &'static str, found: &'static str },

    #[error("Expected a filter part or a negated filter part, found {found}")]
    NotALeaf { found: &'static str },

    #[error("Cannot classify the values of filter '{filter}'")]
    UnclassifiedValue { filter: String },
}

impl ConstructionError {
    pub fn unsupported(context: &'static str, found: &'static str) -> Self {
        Self::UnsupportedShape { context, found }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("Filter '{filter}' holds {expected:?} values")]
    ValueTypeMismatch { filter: String, expected: ValueType },
}
