//! Semantic tree construction
//!
//! [`OpBuilder`] turns resolved model nodes into [`Operation`] trees. The
//! flow builder uses the same builder with a substitution table: node ids
//! it has already materialized as flow captures are swapped for capture
//! references, so block statements and the standalone semantic tree share
//! one construction path.

use rustc_hash::FxHashMap;

use super::{OpKind, Operation};
use crate::binder::types::{self, TypeId};
use crate::binder::{Binder, ChosenOverload};
use crate::model::{
    AddDispatch, CreationNode, IndexedValue, InitKind, InitializerNode, MemberTarget,
    NodeId, ResolvedArg, ValueExpr, ValueKind,
};
use crate::syntax::{ConstValue, Pattern};

/// Build the full semantic operation tree for a resolved creation.
pub fn build(root: &CreationNode, binder: &dyn Binder) -> Operation {
    OpBuilder::new(binder).creation(root)
}

/// Operation-tree factory over the resolved model.
pub struct OpBuilder<'a> {
    binder: &'a dyn Binder,
    subst: FxHashMap<NodeId, Operation>,
}

impl<'a> OpBuilder<'a> {
    /// A builder with an empty substitution table.
    pub fn new(binder: &'a dyn Binder) -> Self {
        Self { binder, subst: FxHashMap::default() }
    }

    /// Replace every later build of node `id` with `op` (a capture
    /// reference). Ids are unique per lowering call, so substitutions are
    /// never removed.
    pub fn substitute(&mut self, id: NodeId, op: Operation) {
        self.subst.insert(id, op);
    }

    /// Display name of a type handle.
    pub fn type_name(&self, ty: TypeId) -> String {
        self.binder.type_info(ty).name.clone()
    }

    /// The implicit receiver reference used inside initializer lists.
    pub fn instance_ref(&self, ty: TypeId, syntax: &str) -> Operation {
        Operation {
            ty: Some(self.type_name(ty)),
            constant: None,
            invalid: false,
            syntax: syntax.to_string(),
            kind: OpKind::InstanceReference,
        }
    }

    /// Full creation node, including its initializer list.
    pub fn creation(&self, node: &CreationNode) -> Operation {
        let mut op = self.creation_shell(node);
        if node.has_initializer() {
            let receiver = self.instance_ref(node.ty, &node.syntax);
            let init = self.initializer_list(node.ty, &receiver, &node.entries);
            if let OpKind::ObjectCreation { initializer, .. } = &mut op.kind {
                *initializer = Some(Box::new(init));
            }
        }
        op
    }

    /// Creation without its initializer list — the form captured as the
    /// receiver in the flow graph, where entries become block statements.
    pub fn creation_shell(&self, node: &CreationNode) -> Operation {
        let args: Vec<Operation> = node.args.iter().map(|a| self.argument(a)).collect();
        Operation {
            ty: Some(self.type_name(node.ty)),
            constant: None,
            invalid: node.is_invalid,
            syntax: node.syntax.clone(),
            kind: OpKind::ObjectCreation {
                ctor: node.ctor.as_ref().map(|c| self.ctor_display(c)),
                args,
                initializer: None,
            },
        }
    }

    /// The brace list of an initializer, entries built against `receiver`.
    pub fn initializer_list(
        &self,
        ty: TypeId,
        receiver: &Operation,
        entries: &[InitializerNode],
    ) -> Operation {
        let ops: Vec<Operation> =
            entries.iter().map(|e| self.entry(receiver, e)).collect();
        Operation {
            ty: Some(self.type_name(ty)),
            constant: None,
            invalid: false,
            syntax: braces(entries),
            kind: OpKind::ObjectOrCollectionInitializer { entries: ops },
        }
    }

    /// One initializer entry, with its receiver-side access reading
    /// through `receiver`.
    pub fn entry(&self, receiver: &Operation, entry: &InitializerNode) -> Operation {
        match &entry.kind {
            InitKind::SimpleAssignment { target, value } => {
                let left = self.member_ref(target, receiver.clone());
                let right = self.value(value);
                Operation {
                    ty: Some(self.target_type_name(target)),
                    constant: None,
                    invalid: entry.is_invalid,
                    syntax: entry.syntax.clone(),
                    kind: OpKind::SimpleAssignment {
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                }
            }
            InitKind::MemberInitializer { target, entries } => {
                let member = self.member_ref(target, receiver.clone());
                let nested_ty = target.value_type();
                let nested_receiver = self.instance_ref(nested_ty, &entry.syntax);
                let init = self.initializer_list(nested_ty, &nested_receiver, entries);
                Operation {
                    ty: Some(self.target_type_name(target)),
                    constant: None,
                    invalid: entry.is_invalid,
                    syntax: entry.syntax.clone(),
                    kind: OpKind::MemberInitializer {
                        member: Box::new(member),
                        initializer: Box::new(init),
                    },
                }
            }
            InitKind::CollectionElementAdd { dispatch, args } => {
                self.element_add(receiver, entry, dispatch, args)
            }
            InitKind::IndexerElementAdd { target, indices, value } => {
                let access = self.element_access(target, receiver.clone(), indices, entry);
                match value {
                    IndexedValue::Value(v) => Operation {
                        ty: Some(self.target_type_name(target)),
                        constant: None,
                        invalid: entry.is_invalid,
                        syntax: entry.syntax.clone(),
                        kind: OpKind::SimpleAssignment {
                            left: Box::new(access),
                            right: Box::new(self.value(v)),
                        },
                    },
                    IndexedValue::Nested(nested) => {
                        let nested_ty = target.value_type();
                        let nested_receiver = self.instance_ref(nested_ty, &entry.syntax);
                        let init =
                            self.initializer_list(nested_ty, &nested_receiver, nested);
                        Operation {
                            ty: Some(self.target_type_name(target)),
                            constant: None,
                            invalid: entry.is_invalid,
                            syntax: entry.syntax.clone(),
                            kind: OpKind::MemberInitializer {
                                member: Box::new(access),
                                initializer: Box::new(init),
                            },
                        }
                    }
                }
            }
        }
    }

    fn element_add(
        &self,
        receiver: &Operation,
        entry: &InitializerNode,
        dispatch: &AddDispatch,
        args: &[ResolvedArg],
    ) -> Operation {
        match dispatch {
            AddDispatch::Static(chosen) => {
                let mapped: Vec<Operation> =
                    args.iter().map(|a| self.argument(a)).collect();
                Operation {
                    ty: Some(self.type_name(chosen.ret)),
                    constant: None,
                    invalid: entry.is_invalid,
                    syntax: entry.syntax.clone(),
                    kind: OpKind::Invocation {
                        method: format!("{}.Add", self.type_name(chosen.owner)),
                        instance: Box::new(receiver.clone()),
                        args: mapped,
                    },
                }
            }
            AddDispatch::Dynamic => {
                let values: Vec<Operation> =
                    args.iter().map(|a| self.value(&a.value)).collect();
                Operation {
                    ty: Some(self.type_name(types::DYNAMIC)),
                    constant: None,
                    invalid: entry.is_invalid,
                    syntax: entry.syntax.clone(),
                    kind: OpKind::DynamicInvocation {
                        member: "Add".to_string(),
                        instance: Box::new(receiver.clone()),
                        args: values,
                    },
                }
            }
            AddDispatch::Unresolved => {
                let children: Vec<Operation> =
                    args.iter().map(|a| self.value(&a.value)).collect();
                Operation {
                    ty: None,
                    constant: None,
                    invalid: true,
                    syntax: entry.syntax.clone(),
                    kind: OpKind::Invalid { children },
                }
            }
        }
    }

    /// The receiver-side element access of an indexer entry.
    pub fn element_access(
        &self,
        target: &MemberTarget,
        receiver: Operation,
        indices: &[ValueExpr],
        entry: &InitializerNode,
    ) -> Operation {
        let index_ops: Vec<Operation> = indices.iter().map(|i| self.value(i)).collect();
        let syntax = format!(
            "[{}]",
            indices.iter().map(|i| i.syntax.clone()).collect::<Vec<_>>().join(", ")
        );
        match target {
            MemberTarget::Indexer { overload } => Operation {
                ty: Some(self.type_name(overload.ret)),
                constant: None,
                invalid: false,
                syntax,
                kind: OpKind::IndexerReference {
                    indexer: format!("{}.this[]", self.type_name(overload.owner)),
                    instance: Some(Box::new(receiver)),
                    args: index_ops,
                },
            },
            MemberTarget::DynamicIndexer => Operation {
                ty: Some(self.type_name(types::DYNAMIC)),
                constant: None,
                invalid: false,
                syntax,
                kind: OpKind::DynamicIndexerAccess {
                    instance: Box::new(receiver),
                    args: index_ops,
                },
            },
            _ => Operation {
                ty: None,
                constant: None,
                invalid: true,
                syntax: entry.syntax.clone(),
                kind: OpKind::Invalid { children: index_ops },
            },
        }
    }

    /// A member reference reading through `receiver`.
    pub fn member_ref(&self, target: &MemberTarget, receiver: Operation) -> Operation {
        match target {
            MemberTarget::Field { owner, name, ty } => Operation {
                ty: Some(self.type_name(*ty)),
                constant: None,
                invalid: false,
                syntax: name.clone(),
                kind: OpKind::FieldReference {
                    field: format!("{}.{}", self.type_name(*owner), name),
                    instance: Some(Box::new(receiver)),
                },
            },
            MemberTarget::Property { owner, name, ty, .. } => Operation {
                ty: Some(self.type_name(*ty)),
                constant: None,
                invalid: false,
                syntax: name.clone(),
                kind: OpKind::PropertyReference {
                    property: format!("{}.{}", self.type_name(*owner), name),
                    instance: Some(Box::new(receiver)),
                },
            },
            MemberTarget::Indexer { overload } => Operation {
                ty: Some(self.type_name(overload.ret)),
                constant: None,
                invalid: false,
                syntax: "this[]".to_string(),
                kind: OpKind::IndexerReference {
                    indexer: format!("{}.this[]", self.type_name(overload.owner)),
                    instance: Some(Box::new(receiver)),
                    args: Vec::new(),
                },
            },
            MemberTarget::DynamicMember { name } => Operation {
                ty: Some(self.type_name(types::DYNAMIC)),
                constant: None,
                invalid: false,
                syntax: name.clone(),
                kind: OpKind::DynamicMemberReference {
                    member: name.clone(),
                    instance: Some(Box::new(receiver)),
                },
            },
            MemberTarget::DynamicIndexer | MemberTarget::Unresolved { .. } => Operation {
                ty: None,
                constant: None,
                invalid: true,
                syntax: target.name().unwrap_or("this[]").to_string(),
                kind: OpKind::Invalid { children: Vec::new() },
            },
        }
    }

    /// One mapped argument node.
    pub fn argument(&self, arg: &ResolvedArg) -> Operation {
        let value = self.value(&arg.value);
        Operation {
            ty: None,
            constant: None,
            invalid: arg.value.is_invalid,
            syntax: arg.value.syntax.clone(),
            kind: OpKind::Argument {
                arg_kind: arg.kind,
                param: arg.param.clone(),
                value: Box::new(value),
            },
        }
    }

    /// A value expression, honoring the substitution table.
    pub fn value(&self, v: &ValueExpr) -> Operation {
        if let Some(op) = self.subst.get(&v.id) {
            return op.clone();
        }
        let ty = Some(self.type_name(v.ty));
        match &v.kind {
            ValueKind::Literal(c) => Operation {
                ty,
                constant: Some(c.clone()),
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::Literal,
            },
            ValueKind::Local(name) => Operation {
                ty,
                constant: None,
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::LocalReference { name: name.clone() },
            },
            ValueKind::Convert { kind, operand } => Operation {
                ty,
                constant: v.constant.clone(),
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::Conversion {
                    conv: *kind,
                    operand: Box::new(self.value(operand)),
                },
            },
            ValueKind::Conditional { cond, when_true, when_false } => Operation {
                ty,
                constant: None,
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::Conditional {
                    cond: Box::new(self.value(cond)),
                    when_true: Box::new(self.value(when_true)),
                    when_false: Box::new(self.value(when_false)),
                },
            },
            ValueKind::Coalesce { value, when_null } => Operation {
                ty,
                constant: None,
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::Coalesce {
                    value: Box::new(self.value(value)),
                    when_null: Box::new(self.value(when_null)),
                },
            },
            ValueKind::Switch { scrutinee, arms } => {
                let arm_ops: Vec<Operation> = arms
                    .iter()
                    .map(|arm| {
                        let pattern = self.pattern(&arm.pattern);
                        let value = self.value(&arm.value);
                        Operation {
                            ty: None,
                            constant: None,
                            invalid: arm.value.is_invalid,
                            syntax: format!("{} => {}", arm.pattern, arm.value.syntax),
                            kind: OpKind::SwitchExpressionArm {
                                pattern: Box::new(pattern),
                                value: Box::new(value),
                            },
                        }
                    })
                    .collect();
                Operation {
                    ty,
                    constant: None,
                    invalid: v.is_invalid,
                    syntax: v.syntax.clone(),
                    kind: OpKind::SwitchExpression {
                        scrutinee: Box::new(self.value(scrutinee)),
                        arms: arm_ops,
                    },
                }
            }
            ValueKind::Creation(node) => self.creation(node),
            ValueKind::ParamsArray { elements } => Operation {
                ty,
                constant: None,
                invalid: v.is_invalid,
                syntax: v.syntax.clone(),
                kind: OpKind::ArrayCreation {
                    elements: elements.iter().map(|e| self.value(e)).collect(),
                },
            },
            ValueKind::Invalid(children) => Operation {
                ty: None,
                constant: None,
                invalid: true,
                syntax: v.syntax.clone(),
                kind: OpKind::Invalid {
                    children: children.iter().map(|c| self.value(c)).collect(),
                },
            },
        }
    }

    /// A switch-arm pattern node.
    pub fn pattern(&self, pattern: &Pattern) -> Operation {
        match pattern {
            Pattern::Constant(c) => {
                let lit = Operation {
                    ty: Some(self.type_name(constant_type(c))),
                    constant: Some(c.clone()),
                    invalid: false,
                    syntax: c.source_text(),
                    kind: OpKind::Literal,
                };
                Operation {
                    ty: Some(self.type_name(constant_type(c))),
                    constant: None,
                    invalid: false,
                    syntax: c.source_text(),
                    kind: OpKind::ConstantPattern { value: Box::new(lit) },
                }
            }
            Pattern::Discard => Operation {
                ty: None,
                constant: None,
                invalid: false,
                syntax: "_".to_string(),
                kind: OpKind::DiscardPattern,
            },
        }
    }

    fn target_type_name(&self, target: &MemberTarget) -> String {
        self.type_name(target.value_type())
    }

    /// Constructor display, e.g. `K..ctor(x, y)`.
    fn ctor_display(&self, ctor: &ChosenOverload) -> String {
        format!(
            "{}..ctor({})",
            self.type_name(ctor.owner),
            ctor.params.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
        )
    }
}

fn braces(entries: &[InitializerNode]) -> String {
    if entries.is_empty() {
        return "{ }".to_string();
    }
    format!(
        "{{ {} }}",
        entries.iter().map(|e| e.syntax.clone()).collect::<Vec<_>>().join(", ")
    )
}

fn constant_type(c: &ConstValue) -> TypeId {
    match c {
        ConstValue::Int(_) => types::INT32,
        ConstValue::Double(_) => types::DOUBLE,
        ConstValue::Bool(_) => types::BOOL,
        ConstValue::Str(_) => types::STRING,
        ConstValue::Null => types::NULL,
    }
}
