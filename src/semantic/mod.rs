//! Semantic operation tree
//!
//! [`Operation`] is the closed node set shared by the operation-tree output
//! and the flow graph's block statements. Every implicit piece of the source
//! — receivers, conversions, defaulted arguments, params arrays, flow
//! captures — is an explicit node here, so the renderer never consults the
//! binder.

mod builder;

pub use builder::{build, OpBuilder};

use crate::binder::ConversionKind;
use crate::flow::CaptureId;
use crate::model::ArgKind;
use crate::syntax::ConstValue;

/// One node of the semantic tree or of a basic-block statement list.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Display name of the node's type, when it has one.
    pub ty: Option<String>,
    /// Compile-time constant, when known.
    pub constant: Option<ConstValue>,
    /// True when this node failed to resolve. Ancestors report invalid
    /// descendants through [`Operation::is_invalid`].
    pub invalid: bool,
    /// Source text the node was lowered from.
    pub syntax: String,
    /// Node kind and children.
    pub kind: OpKind,
}

/// The closed operation node set.
#[derive(Debug, Clone)]
pub enum OpKind {
    /// `new T(args) { … }`
    ObjectCreation {
        /// Constructor display name, when resolution succeeded.
        ctor: Option<String>,
        /// Mapped arguments, each an [`OpKind::Argument`].
        args: Vec<Operation>,
        /// The initializer list, when present.
        initializer: Option<Box<Operation>>,
    },
    /// Brace-enclosed initializer list.
    ObjectOrCollectionInitializer {
        /// One operation per entry, in syntax order.
        entries: Vec<Operation>,
    },
    /// `target = value`
    SimpleAssignment {
        /// Assignment target reference.
        left: Box<Operation>,
        /// Assigned value.
        right: Box<Operation>,
    },
    /// `Member = { … }` — nested list read through the member.
    MemberInitializer {
        /// The member or element access serving as nested receiver.
        member: Box<Operation>,
        /// The nested initializer list.
        initializer: Box<Operation>,
    },
    /// Instance field reference.
    FieldReference {
        /// `Owner.Name` display.
        field: String,
        /// Receiver, absent in flow-graph statements where the receiver
        /// is folded into the reference's parent.
        instance: Option<Box<Operation>>,
    },
    /// Instance property reference.
    PropertyReference {
        /// `Owner.Name` display.
        property: String,
        /// Receiver.
        instance: Option<Box<Operation>>,
    },
    /// Indexer element reference.
    IndexerReference {
        /// `Owner.this[]` display.
        indexer: String,
        /// Receiver.
        instance: Option<Box<Operation>>,
        /// Index arguments in source order.
        args: Vec<Operation>,
    },
    /// Late-bound member access on a `dynamic` receiver.
    DynamicMemberReference {
        /// Member name as written.
        member: String,
        /// Receiver.
        instance: Option<Box<Operation>>,
    },
    /// Late-bound indexer access on a `dynamic` receiver.
    DynamicIndexerAccess {
        /// Receiver.
        instance: Box<Operation>,
        /// Index arguments in source order.
        args: Vec<Operation>,
    },
    /// Resolved instance-method invocation (collection `Add`).
    Invocation {
        /// `Owner.Name` display.
        method: String,
        /// Receiver.
        instance: Box<Operation>,
        /// Mapped arguments.
        args: Vec<Operation>,
    },
    /// Late-bound invocation carrying only the member name.
    DynamicInvocation {
        /// Member name as written.
        member: String,
        /// Receiver.
        instance: Box<Operation>,
        /// Arguments in source order, unmapped.
        args: Vec<Operation>,
    },
    /// One matched argument of a call.
    Argument {
        /// How the argument was matched.
        arg_kind: ArgKind,
        /// Matched parameter name.
        param: Option<String>,
        /// Argument value.
        value: Box<Operation>,
    },
    /// Materialized `params` array.
    ArrayCreation {
        /// Packed elements.
        elements: Vec<Operation>,
    },
    /// Implicit conversion made explicit.
    Conversion {
        /// Conversion kind.
        conv: ConversionKind,
        /// Converted operand.
        operand: Box<Operation>,
    },
    /// Constant literal.
    Literal,
    /// Local or parameter read.
    LocalReference {
        /// Local name.
        name: String,
    },
    /// The implicit receiver of an initializer entry.
    InstanceReference,
    /// `cond ? a : b`
    Conditional {
        /// Condition.
        cond: Box<Operation>,
        /// Arm when true.
        when_true: Box<Operation>,
        /// Arm when false.
        when_false: Box<Operation>,
    },
    /// `value ?? fallback`
    Coalesce {
        /// Value operand.
        value: Box<Operation>,
        /// Fallback operand.
        when_null: Box<Operation>,
    },
    /// `scrutinee switch { … }`
    SwitchExpression {
        /// Scrutinee.
        scrutinee: Box<Operation>,
        /// Arms, each an [`OpKind::SwitchExpressionArm`].
        arms: Vec<Operation>,
    },
    /// One arm of a switch expression.
    SwitchExpressionArm {
        /// Arm pattern.
        pattern: Box<Operation>,
        /// Arm result.
        value: Box<Operation>,
    },
    /// Constant pattern `c`.
    ConstantPattern {
        /// The pattern's constant.
        value: Box<Operation>,
    },
    /// Discard pattern `_`.
    DiscardPattern,
    /// Null test synthesized for `??` lowering.
    IsNull {
        /// Tested operand.
        operand: Box<Operation>,
    },
    /// Pattern test synthesized for switch-expression lowering.
    ConstantPatternTest {
        /// The tested value (a capture reference).
        value: Box<Operation>,
        /// The pattern constant.
        pattern: Box<Operation>,
    },
    /// Evaluation of a value into a capture slot.
    FlowCapture {
        /// Assigned capture id.
        id: CaptureId,
        /// Captured value.
        value: Box<Operation>,
    },
    /// Read of a previously captured value.
    FlowCaptureReference {
        /// Referenced capture id.
        id: CaptureId,
    },
    /// Thrown no-match failure of an exhausted switch expression.
    MatchFailure,
    /// Statement wrapper around an expression in a block.
    ExpressionStatement {
        /// The wrapped expression.
        expr: Box<Operation>,
    },
    /// Unresolved node; children were still lowered.
    Invalid {
        /// Best-effort children.
        children: Vec<Operation>,
    },
}

impl Operation {
    /// True when this node or any descendant failed to resolve.
    pub fn is_invalid(&self) -> bool {
        self.invalid || self.children().iter().any(|c| c.is_invalid())
    }

    /// Direct children, in evaluation/display order.
    pub fn children(&self) -> Vec<&Operation> {
        match &self.kind {
            OpKind::ObjectCreation { args, initializer, .. } => {
                let mut out: Vec<&Operation> = args.iter().collect();
                if let Some(init) = initializer {
                    out.push(init);
                }
                out
            }
            OpKind::ObjectOrCollectionInitializer { entries } => entries.iter().collect(),
            OpKind::SimpleAssignment { left, right } => vec![left, right],
            OpKind::MemberInitializer { member, initializer } => vec![member, initializer],
            OpKind::FieldReference { instance, .. }
            | OpKind::PropertyReference { instance, .. }
            | OpKind::DynamicMemberReference { instance, .. } => {
                instance.iter().map(|i| i.as_ref()).collect()
            }
            OpKind::IndexerReference { instance, args, .. } => {
                let mut out: Vec<&Operation> =
                    instance.iter().map(|i| i.as_ref()).collect();
                out.extend(args.iter());
                out
            }
            OpKind::DynamicIndexerAccess { instance, args } => {
                let mut out = vec![instance.as_ref()];
                out.extend(args.iter());
                out
            }
            OpKind::Invocation { instance, args, .. }
            | OpKind::DynamicInvocation { instance, args, .. } => {
                let mut out = vec![instance.as_ref()];
                out.extend(args.iter());
                out
            }
            OpKind::Argument { value, .. } => vec![value],
            OpKind::ArrayCreation { elements } => elements.iter().collect(),
            OpKind::Conversion { operand, .. } => vec![operand],
            OpKind::Conditional { cond, when_true, when_false } => {
                vec![cond, when_true, when_false]
            }
            OpKind::Coalesce { value, when_null } => vec![value, when_null],
            OpKind::SwitchExpression { scrutinee, arms } => {
                let mut out = vec![scrutinee.as_ref()];
                out.extend(arms.iter());
                out
            }
            OpKind::SwitchExpressionArm { pattern, value } => vec![pattern, value],
            OpKind::ConstantPattern { value } => vec![value],
            OpKind::IsNull { operand } => vec![operand],
            OpKind::ConstantPatternTest { value, pattern } => vec![value, pattern],
            OpKind::FlowCapture { value, .. } => vec![value],
            OpKind::ExpressionStatement { expr } => vec![expr],
            OpKind::Invalid { children } => children.iter().collect(),
            OpKind::Literal
            | OpKind::LocalReference { .. }
            | OpKind::InstanceReference
            | OpKind::DiscardPattern
            | OpKind::FlowCaptureReference { .. }
            | OpKind::MatchFailure => Vec::new(),
        }
    }

    /// A read of capture `id` with the given display type and source text.
    pub fn capture_ref(id: CaptureId, ty: impl Into<String>, syntax: impl Into<String>) -> Self {
        Operation {
            ty: Some(ty.into()),
            constant: None,
            invalid: false,
            syntax: syntax.into(),
            kind: OpKind::FlowCaptureReference { id },
        }
    }

    /// A capture of `value` into slot `id`.
    pub fn capture(id: CaptureId, value: Operation) -> Self {
        Operation {
            ty: None,
            constant: None,
            invalid: false,
            syntax: value.syntax.clone(),
            kind: OpKind::FlowCapture { id, value: Box::new(value) },
        }
    }
}
