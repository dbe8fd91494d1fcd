//! Type handles and type metadata
//!
//! Types are identified by `TypeId` handles into a type table owned by the
//! binder. A fixed set of well-known builtin types occupies the low ids so
//! the engine can refer to them without a table lookup.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Handle into the binder's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Create a type id from a raw index.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw index of this type id.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// `System.Object`
pub const OBJECT: TypeId = TypeId(0);
/// `System.Void`
pub const VOID: TypeId = TypeId(1);
/// `System.Boolean`
pub const BOOL: TypeId = TypeId(2);
/// `System.Int32`
pub const INT32: TypeId = TypeId(3);
/// `System.Int64`
pub const INT64: TypeId = TypeId(4);
/// `System.Double`
pub const DOUBLE: TypeId = TypeId(5);
/// `System.String`
pub const STRING: TypeId = TypeId(6);
/// The `dynamic` type (late-bound)
pub const DYNAMIC: TypeId = TypeId(7);
/// The type of the `null` literal
pub const NULL: TypeId = TypeId(8);
/// The error type, standing in for failed resolution
pub const ERROR: TypeId = TypeId(9);

/// Classification of a type, driving conversion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Value type (struct-like); converts to `System.Object` by boxing
    Value,
    /// Reference type
    Class,
    /// The late-bound `dynamic` type
    Dynamic,
    /// `System.Void`
    Void,
    /// The null-literal type
    Null,
    /// Array type
    Array,
    /// Error placeholder
    Error,
}

/// Metadata for one entry in the type table.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Display name, e.g. `System.Int32` or `F`
    pub name: String,
    /// Classification
    pub kind: TypeKind,
    /// Base class, for implicit reference conversions
    pub base: Option<TypeId>,
    /// Whether collection-initializer syntax is allowed (`IEnumerable` support)
    pub is_enumerable: bool,
    /// Element type, for array types
    pub element: Option<TypeId>,
}

impl TypeInfo {
    /// Metadata for a named type with the given kind.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            is_enumerable: false,
            element: None,
        }
    }

    /// True for the `dynamic` type.
    pub fn is_dynamic(&self) -> bool {
        self.kind == TypeKind::Dynamic
    }
}

/// The builtin types, in `TypeId` order.
pub(crate) fn builtin_infos() -> Vec<TypeInfo> {
    vec![
        TypeInfo::new("System.Object", TypeKind::Class),
        TypeInfo::new("System.Void", TypeKind::Void),
        TypeInfo::new("System.Boolean", TypeKind::Value),
        TypeInfo::new("System.Int32", TypeKind::Value),
        TypeInfo::new("System.Int64", TypeKind::Value),
        TypeInfo::new("System.Double", TypeKind::Value),
        TypeInfo::new("System.String", TypeKind::Class),
        TypeInfo::new("dynamic", TypeKind::Dynamic),
        TypeInfo::new("null", TypeKind::Null),
        TypeInfo::new("?", TypeKind::Error),
    ]
}

/// Well-known type names, for `lookup_type` on builtins.
pub(crate) static WELL_KNOWN: Lazy<FxHashMap<&'static str, TypeId>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("object", OBJECT);
    map.insert("System.Object", OBJECT);
    map.insert("void", VOID);
    map.insert("bool", BOOL);
    map.insert("System.Boolean", BOOL);
    map.insert("int", INT32);
    map.insert("System.Int32", INT32);
    map.insert("long", INT64);
    map.insert("System.Int64", INT64);
    map.insert("double", DOUBLE);
    map.insert("System.Double", DOUBLE);
    map.insert("string", STRING);
    map.insert("System.String", STRING);
    map.insert("dynamic", DYNAMIC);
    map
});
