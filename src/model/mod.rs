//! Resolved initializer model
//!
//! The output of the resolution pass: a tree of [`InitializerNode`]s under a
//! root [`CreationNode`], with every member reference, overload, and
//! implicit conversion made explicit. Initializer-entry kinds are a closed
//! tagged variant, matched exhaustively by the planner and both builders.
//!
//! Node ids are assigned in pre-order during resolution and key the capture
//! plan's decisions.

mod resolve;

pub use resolve::Resolver;

use crate::binder::types::{self, TypeId};
use crate::binder::{ChosenOverload, ConversionKind};
use crate::syntax::{ConstValue, Pattern, Span};

/// Identity of one resolved node, unique within one lowering call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A resolved object-creation expression with its initializer entries.
#[derive(Debug, Clone)]
pub struct CreationNode {
    /// Node identity
    pub id: NodeId,
    /// Created type (the error type when resolution failed)
    pub ty: TypeId,
    /// Chosen constructor; `None` when constructor resolution failed
    pub ctor: Option<ChosenOverload>,
    /// Arguments after parameter mapping (explicit, defaulted, params-packed)
    pub args: Vec<ResolvedArg>,
    /// Initializer entries in source order; empty when there is no list
    pub entries: Vec<InitializerNode>,
    /// True when the creation itself failed to resolve
    pub is_invalid: bool,
    /// Regenerated source text
    pub syntax: String,
    /// Source location
    pub span: Span,
}

impl CreationNode {
    /// Whether the creation carries a non-empty initializer list.
    pub fn has_initializer(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// How an argument was matched to its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Written at the call site
    Explicit,
    /// Synthesized from the parameter's default value
    DefaultValue,
    /// Packed into a `params` array
    ParamArray,
}

/// One argument of a resolved constructor, `Add`, or indexer call.
#[derive(Debug, Clone)]
pub struct ResolvedArg {
    /// Argument kind
    pub kind: ArgKind,
    /// Matched parameter name, when the overload resolved
    pub param: Option<String>,
    /// Argument value
    pub value: ValueExpr,
}

impl ResolvedArg {
    /// An explicit argument without parameter information.
    pub fn bare(value: ValueExpr) -> Self {
        Self { kind: ArgKind::Explicit, param: None, value }
    }
}

/// A resolved value expression.
#[derive(Debug, Clone)]
pub struct ValueExpr {
    /// Node identity
    pub id: NodeId,
    /// Resolved type
    pub ty: TypeId,
    /// Compile-time constant, when known
    pub constant: Option<ConstValue>,
    /// True when this value or a descendant failed to resolve
    pub is_invalid: bool,
    /// Regenerated source text
    pub syntax: String,
    /// Source location
    pub span: Span,
    /// Value kind
    pub kind: ValueKind,
}

impl ValueExpr {
    /// Whether this value is a compile-time constant (always inlined).
    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }
}

/// Kinds of resolved value expressions.
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// Literal constant
    Literal(ConstValue),
    /// Local or parameter reference
    Local(String),
    /// Explicit implicit-conversion node
    Convert {
        /// Conversion kind (never `Identity`)
        kind: ConversionKind,
        /// Converted operand
        operand: Box<ValueExpr>,
    },
    /// Ternary conditional
    Conditional {
        /// Condition
        cond: Box<ValueExpr>,
        /// Arm when true
        when_true: Box<ValueExpr>,
        /// Arm when false
        when_false: Box<ValueExpr>,
    },
    /// Null-coalescing
    Coalesce {
        /// Value operand
        value: Box<ValueExpr>,
        /// Fallback operand
        when_null: Box<ValueExpr>,
    },
    /// Pattern switch expression
    Switch {
        /// Scrutinee
        scrutinee: Box<ValueExpr>,
        /// Arms in source order
        arms: Vec<ArmNode>,
    },
    /// Nested object creation
    Creation(Box<CreationNode>),
    /// Materialized `params` array
    ParamsArray {
        /// Packed elements
        elements: Vec<ValueExpr>,
    },
    /// Unresolved value; children were still resolved
    Invalid(Vec<ValueExpr>),
}

/// A resolved switch arm.
#[derive(Debug, Clone)]
pub struct ArmNode {
    /// Pattern tested against the scrutinee
    pub pattern: Pattern,
    /// Arm result, converted to the switch result type
    pub value: ValueExpr,
}

/// The resolved target member of an initializer entry.
///
/// Polymorphic over the capability set `{HasStaticTarget,
/// RequiresReceiverCapture, IsIndexed}`.
#[derive(Debug, Clone)]
pub enum MemberTarget {
    /// Instance field
    Field {
        /// Declaring type
        owner: TypeId,
        /// Field name
        name: String,
        /// Field type
        ty: TypeId,
    },
    /// Instance property
    Property {
        /// Declaring type
        owner: TypeId,
        /// Property name
        name: String,
        /// Property type
        ty: TypeId,
        /// Whether a getter is accessible
        has_getter: bool,
    },
    /// Indexer
    Indexer {
        /// The chosen indexer overload; `ret` is the element type
        overload: ChosenOverload,
    },
    /// Late-bound member on a `dynamic` receiver
    DynamicMember {
        /// Member name
        name: String,
    },
    /// Late-bound indexer on a `dynamic` receiver
    DynamicIndexer,
    /// Member resolution failed
    Unresolved {
        /// The name as written
        name: String,
    },
}

impl MemberTarget {
    /// True when the member resolved to a known symbol.
    pub fn has_static_target(&self) -> bool {
        matches!(
            self,
            MemberTarget::Field { .. }
                | MemberTarget::Property { .. }
                | MemberTarget::Indexer { .. }
        )
    }

    /// True when reading through this member in a nested initializer
    /// requires capturing the receiver-side access.
    pub fn requires_receiver_capture(&self) -> bool {
        !matches!(self, MemberTarget::Unresolved { .. })
    }

    /// True for indexed targets.
    pub fn is_indexed(&self) -> bool {
        matches!(self, MemberTarget::Indexer { .. } | MemberTarget::DynamicIndexer)
    }

    /// The type a value assigned through this member must have.
    pub fn value_type(&self) -> TypeId {
        match self {
            MemberTarget::Field { ty, .. } | MemberTarget::Property { ty, .. } => *ty,
            MemberTarget::Indexer { overload } => overload.ret,
            MemberTarget::DynamicMember { .. } | MemberTarget::DynamicIndexer => {
                types::DYNAMIC
            }
            MemberTarget::Unresolved { .. } => types::ERROR,
        }
    }

    /// The member name, when it has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            MemberTarget::Field { name, .. }
            | MemberTarget::Property { name, .. }
            | MemberTarget::DynamicMember { name }
            | MemberTarget::Unresolved { name } => Some(name),
            MemberTarget::Indexer { .. } | MemberTarget::DynamicIndexer => None,
        }
    }
}

/// One resolved initializer entry.
#[derive(Debug, Clone)]
pub struct InitializerNode {
    /// Node identity
    pub id: NodeId,
    /// Entry kind
    pub kind: InitKind,
    /// True when this entry or a descendant failed to resolve
    pub is_invalid: bool,
    /// Regenerated source text
    pub syntax: String,
    /// Source location
    pub span: Span,
}

/// Closed variant over initializer-entry kinds.
#[derive(Debug, Clone)]
pub enum InitKind {
    /// `Member = value`
    SimpleAssignment {
        /// Target member
        target: MemberTarget,
        /// Right-hand side
        value: ValueExpr,
    },
    /// `Member = { entries }` — nested list read through the member's getter
    MemberInitializer {
        /// Target member
        target: MemberTarget,
        /// Nested entries
        entries: Vec<InitializerNode>,
    },
    /// Bare element `e` or keyed shorthand `{ k, v }`, dispatched to `Add`
    CollectionElementAdd {
        /// How the `Add` call dispatches
        dispatch: AddDispatch,
        /// Mapped arguments
        args: Vec<ResolvedArg>,
    },
    /// `[indices] = value` or `[indices] = { entries }`
    IndexerElementAdd {
        /// The indexer target
        target: MemberTarget,
        /// Index arguments in source order
        indices: Vec<ValueExpr>,
        /// Assigned value or nested entries
        value: IndexedValue,
    },
}

/// Right-hand side of an indexer initializer entry.
#[derive(Debug, Clone)]
pub enum IndexedValue {
    /// Plain assigned value
    Value(ValueExpr),
    /// Nested initializer list read through the indexer
    Nested(Vec<InitializerNode>),
}

/// How a collection element's `Add` call dispatches.
#[derive(Debug, Clone)]
pub enum AddDispatch {
    /// Statically resolved overload
    Static(ChosenOverload),
    /// Late-bound call (receiver or an argument is `dynamic`)
    Dynamic,
    /// Resolution failed; arguments were still resolved
    Unresolved,
}
