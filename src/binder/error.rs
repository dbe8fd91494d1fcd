//! Error taxonomy for initializer lowering
//!
//! Every error is attached to the smallest enclosing semantic node as an
//! `Invalid` wrapper; lowering never aborts on a single error. Formatting
//! and display of diagnostics is the job of an external collaborator — this
//! engine only records the site and the details.

use crate::syntax::Span;
use thiserror::Error;

/// Errors reported while resolving and lowering an initializer expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LowerError {
    /// Member, indexer, or `Add` overload not found on the receiver type
    #[error("'{type_name}' does not contain a definition for '{member}'")]
    MemberResolution {
        /// Receiver type name
        type_name: String,
        /// Member that failed to resolve
        member: String,
        /// Location of the member reference
        span: Span,
    },

    /// Constructor or `Add` call arity mismatch
    #[error("no overload of '{method}' on '{type_name}' takes {actual} argument(s)")]
    ArgumentCount {
        /// Receiver type name
        type_name: String,
        /// Method or `.ctor`
        method: String,
        /// Number of arguments supplied
        actual: usize,
        /// Location of the call
        span: Span,
    },

    /// Left-hand side of an initializer entry is not a field, property, or indexer
    #[error("the left-hand side of an initializer entry must be a field, property, or indexer")]
    AssignmentTarget {
        /// Location of the offending target
        span: Span,
    },

    /// Collection-initializer syntax used on a type without `IEnumerable` support
    #[error("'{type_name}' does not implement 'IEnumerable'; collection initializer is not allowed")]
    CollectionInterface {
        /// The non-collection type
        type_name: String,
        /// Location of the element
        span: Span,
    },
}

impl LowerError {
    /// Source location this error is associated with.
    pub fn span(&self) -> Span {
        match self {
            LowerError::MemberResolution { span, .. }
            | LowerError::ArgumentCount { span, .. }
            | LowerError::AssignmentTarget { span }
            | LowerError::CollectionInterface { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LowerError::MemberResolution {
            type_name: "C".to_string(),
            member: "MissingField".to_string(),
            span: Span::ZERO,
        };
        assert_eq!(
            err.to_string(),
            "'C' does not contain a definition for 'MissingField'"
        );

        let err = LowerError::ArgumentCount {
            type_name: "C".to_string(),
            method: ".ctor".to_string(),
            actual: 3,
            span: Span::ZERO,
        };
        assert_eq!(
            err.to_string(),
            "no overload of '.ctor' on 'C' takes 3 argument(s)"
        );
    }
}
