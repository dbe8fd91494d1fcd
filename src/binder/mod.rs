//! Binder interface
//!
//! The symbol binder and overload resolution are external collaborators:
//! the engine consumes them through the narrow [`Binder`] trait and never
//! performs name lookup or applicability checks itself. [`TypeCatalog`] is
//! the in-memory implementation used by the test suite.

mod catalog;
mod error;
pub mod types;

pub use catalog::{ParamSpec, TypeCatalog};
pub use error::LowerError;
pub use types::{TypeId, TypeInfo, TypeKind};

use crate::syntax::{ConstValue, Span};

/// A resolved member reference on a receiver type.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberRef {
    /// Instance field
    Field {
        /// Field name
        name: String,
        /// Field type
        ty: TypeId,
    },
    /// Instance property
    Property {
        /// Property name
        name: String,
        /// Property type
        ty: TypeId,
        /// Whether a getter is accessible (required for nested initializers)
        has_getter: bool,
    },
    /// Late-bound member on a `dynamic` receiver
    Dynamic {
        /// Member name
        name: String,
    },
}

/// One parameter of a chosen overload.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    /// Parameter name
    pub name: String,
    /// Parameter type; for a `params` parameter, the *element* type
    pub ty: TypeId,
    /// Default value, when the parameter is optional
    pub default: Option<ConstValue>,
    /// True for a trailing `params` array parameter
    pub is_params: bool,
}

/// The overload selected for a constructor, `Add` method, or indexer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChosenOverload {
    /// Declaring type
    pub owner: TypeId,
    /// `.ctor`, `Add`, or `this[]`
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<ParamInfo>,
    /// Return type (`System.Void` for `Add`, the element type for indexers)
    pub ret: TypeId,
}

/// The candidate set an overload is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadSet {
    /// Constructors of a type
    Constructors(TypeId),
    /// Applicable `Add` methods of a collection type
    AddMethods(TypeId),
    /// Indexers of a type
    Indexers(TypeId),
}

/// Kind of an implicit conversion between two types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// Same type; no conversion node is emitted
    Identity,
    /// Widening numeric conversion
    ImplicitNumeric,
    /// Reference conversion (derived to base, null literal, dynamic)
    ImplicitReference,
    /// Value type to `System.Object`
    Boxing,
}

impl ConversionKind {
    /// Display name used by the renderer.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionKind::Identity => "Identity",
            ConversionKind::ImplicitNumeric => "ImplicitNumeric",
            ConversionKind::ImplicitReference => "ImplicitReference",
            ConversionKind::Boxing => "Boxing",
        }
    }
}

/// Narrow interface to the external binder collaborator.
///
/// All methods are pure lookups; the engine never caches across calls, so a
/// single binder instance may serve concurrent lowering calls.
pub trait Binder {
    /// Look up a type by source name.
    fn lookup_type(&self, name: &str) -> Option<TypeId>;

    /// Metadata for a type handle.
    fn type_info(&self, ty: TypeId) -> &TypeInfo;

    /// Type of a local or parameter in scope, if the binder knows it.
    fn local_type(&self, name: &str) -> Option<TypeId>;

    /// Resolve a named member on a receiver type.
    fn resolve_member(&self, receiver: TypeId, name: &str, span: Span)
        -> Result<MemberRef, LowerError>;

    /// Resolve the applicable overload for the given argument types.
    fn resolve_overload(
        &self,
        set: OverloadSet,
        args: &[TypeId],
        span: Span,
    ) -> Result<ChosenOverload, LowerError>;

    /// The implicit conversion from one type to another, if any.
    fn resolve_conversion(&self, from: TypeId, to: TypeId) -> Option<ConversionKind>;

    /// The array type with the given element type, if the binder has one.
    /// Used when packing excess arguments into a `params` array.
    fn lookup_array(&self, elem: TypeId) -> Option<TypeId>;
}
