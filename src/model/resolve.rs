//! Resolution pass
//!
//! Drives the binder over the syntax tree, producing the resolved model.
//! Resolution never aborts: every failure is recorded in the diagnostic
//! sink, the failing node is marked invalid, and its children are still
//! resolved so downstream stages keep their best-effort shape.

use super::{
    AddDispatch, ArgKind, ArmNode, CreationNode, IndexedValue, InitKind, InitializerNode,
    MemberTarget, NodeId, ResolvedArg, ValueExpr, ValueKind,
};
use crate::binder::types::{self, TypeId};
use crate::binder::{
    Binder, ChosenOverload, ConversionKind, LowerError, MemberRef, OverloadSet,
};
use crate::syntax::{
    AssignTarget, ConstValue, Entry, Expr, InitializerStatement, Span,
};

/// Resolves initializer syntax against a [`Binder`].
pub struct Resolver<'a> {
    binder: &'a dyn Binder,
    diagnostics: &'a mut Vec<LowerError>,
    next_id: u32,
}

impl<'a> Resolver<'a> {
    /// Create a resolver writing diagnostics into `sink`.
    pub fn new(binder: &'a dyn Binder, sink: &'a mut Vec<LowerError>) -> Self {
        Self { binder, diagnostics: sink, next_id: 0 }
    }

    /// Resolve a statement-level initializer expression.
    pub fn resolve_statement(&mut self, stmt: &InitializerStatement) -> CreationNode {
        let expected = stmt
            .local_ty
            .as_deref()
            .and_then(|name| self.binder.lookup_type(name));
        match &stmt.expr {
            Expr::New { type_name, args, initializer, span } => self.resolve_creation(
                type_name.as_deref(),
                args,
                initializer.as_ref().map(|l| l.entries.as_slice()).unwrap_or(&[]),
                *span,
                stmt.expr.to_string(),
                expected,
            ),
            other => {
                // The entry point only lowers creation expressions; anything
                // else is a degenerate invalid creation wrapping the value.
                let value = self.resolve_value(other, None);
                CreationNode {
                    id: self.fresh(),
                    ty: types::ERROR,
                    ctor: None,
                    args: vec![ResolvedArg::bare(value)],
                    entries: Vec::new(),
                    is_invalid: true,
                    syntax: other.to_string(),
                    span: other.span(),
                }
            }
        }
    }

    fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn resolve_creation(
        &mut self,
        type_name: Option<&str>,
        args: &[Expr],
        entries: &[Entry],
        span: Span,
        syntax: String,
        expected: Option<TypeId>,
    ) -> CreationNode {
        let id = self.fresh();
        let mut is_invalid = false;

        let ty = match type_name {
            Some(name) => match self.binder.lookup_type(name) {
                Some(ty) => ty,
                None => {
                    self.diagnostics.push(LowerError::MemberResolution {
                        type_name: "<global namespace>".to_string(),
                        member: name.to_string(),
                        span,
                    });
                    is_invalid = true;
                    types::ERROR
                }
            },
            None => expected.unwrap_or(types::ERROR),
        };

        let raw: Vec<ValueExpr> =
            args.iter().map(|a| self.resolve_value(a, None)).collect();
        let arg_tys: Vec<TypeId> = raw.iter().map(|a| a.ty).collect();

        let (ctor, mapped_args) = if ty == types::ERROR {
            (None, raw.into_iter().map(ResolvedArg::bare).collect())
        } else {
            match self.binder.resolve_overload(
                OverloadSet::Constructors(ty),
                &arg_tys,
                span,
            ) {
                Ok(chosen) => {
                    let mapped = self.map_arguments(&chosen, raw, &syntax);
                    (Some(chosen), mapped)
                }
                Err(err) => {
                    self.diagnostics.push(err);
                    is_invalid = true;
                    (None, raw.into_iter().map(ResolvedArg::bare).collect())
                }
            }
        };

        let resolved_entries: Vec<InitializerNode> =
            entries.iter().map(|e| self.resolve_entry(ty, e)).collect();

        CreationNode {
            id,
            ty,
            ctor,
            args: mapped_args,
            entries: resolved_entries,
            is_invalid,
            syntax,
            span,
        }
    }

    /// Map explicit arguments onto the chosen overload's parameters,
    /// synthesizing default values and packing `params` arrays.
    fn map_arguments(
        &mut self,
        chosen: &ChosenOverload,
        raw: Vec<ValueExpr>,
        call_syntax: &str,
    ) -> Vec<ResolvedArg> {
        let has_params = chosen.params.last().map(|p| p.is_params).unwrap_or(false);
        let fixed = if has_params {
            chosen.params.len() - 1
        } else {
            chosen.params.len()
        };

        let mut out = Vec::with_capacity(chosen.params.len());
        let mut raw = raw.into_iter();

        for param in &chosen.params[..fixed] {
            match raw.next() {
                Some(value) => {
                    let value = self.convert(value, param.ty);
                    out.push(ResolvedArg {
                        kind: ArgKind::Explicit,
                        param: Some(param.name.clone()),
                        value,
                    });
                }
                None => {
                    let default = param
                        .default
                        .clone()
                        .expect("binder chose an overload with a missing non-optional argument");
                    let value = self.synth_literal(default, param.ty);
                    out.push(ResolvedArg {
                        kind: ArgKind::DefaultValue,
                        param: Some(param.name.clone()),
                        value,
                    });
                }
            }
        }

        if has_params {
            let param = &chosen.params[fixed];
            let elements: Vec<ValueExpr> = raw
                .map(|v| self.convert(v, param.ty))
                .collect();
            let array_ty = self
                .binder
                .lookup_array(param.ty)
                .unwrap_or(types::ERROR);
            out.push(ResolvedArg {
                kind: ArgKind::ParamArray,
                param: Some(param.name.clone()),
                value: ValueExpr {
                    id: self.fresh(),
                    ty: array_ty,
                    constant: None,
                    is_invalid: false,
                    syntax: call_syntax.to_string(),
                    span: Span::ZERO,
                    kind: ValueKind::ParamsArray { elements },
                },
            });
        }
        out
    }

    fn synth_literal(&mut self, value: ConstValue, ty: TypeId) -> ValueExpr {
        ValueExpr {
            id: self.fresh(),
            ty,
            constant: Some(value.clone()),
            is_invalid: false,
            syntax: value.source_text(),
            span: Span::ZERO,
            kind: ValueKind::Literal(value),
        }
    }

    fn resolve_entry(&mut self, receiver: TypeId, entry: &Entry) -> InitializerNode {
        let id = self.fresh();
        let syntax = entry.to_string();
        let span = entry.span();
        let (kind, is_invalid) = match entry {
            Entry::Assign { target, value, span } => {
                self.resolve_assign(receiver, target, value, *span)
            }
            Entry::AssignNested { member, entries, span } => {
                self.resolve_assign_nested(receiver, member, entries, *span)
            }
            Entry::Add { args, span } => self.resolve_add(receiver, args, *span),
            Entry::Index { indices, value, span } => {
                let (target, idx, invalid) =
                    self.resolve_indexer_target(receiver, indices, *span);
                let expected = target.value_type();
                let value = self.resolve_value(value, non_error(expected));
                let invalid = invalid || value.is_invalid;
                (
                    InitKind::IndexerElementAdd {
                        target,
                        indices: idx,
                        value: IndexedValue::Value(value),
                    },
                    invalid,
                )
            }
            Entry::IndexNested { indices, entries, span } => {
                let (target, idx, invalid) =
                    self.resolve_indexer_target(receiver, indices, *span);
                let nested_receiver = target.value_type();
                let nested: Vec<InitializerNode> = entries
                    .iter()
                    .map(|e| self.resolve_entry(nested_receiver, e))
                    .collect();
                let invalid = invalid || nested.iter().any(|n| n.is_invalid);
                (
                    InitKind::IndexerElementAdd {
                        target,
                        indices: idx,
                        value: IndexedValue::Nested(nested),
                    },
                    invalid,
                )
            }
        };
        InitializerNode { id, kind, is_invalid, syntax, span }
    }

    fn resolve_assign(
        &mut self,
        receiver: TypeId,
        target: &AssignTarget,
        value: &Expr,
        span: Span,
    ) -> (InitKind, bool) {
        let name = match target {
            AssignTarget::Member(name) => name.clone(),
            AssignTarget::Expr(e) => {
                self.diagnostics.push(LowerError::AssignmentTarget { span });
                let value = self.resolve_value(value, None);
                return (
                    InitKind::SimpleAssignment {
                        target: MemberTarget::Unresolved { name: e.to_string() },
                        value,
                    },
                    true,
                );
            }
        };
        let (target, invalid) = self.resolve_member_target(receiver, &name, span);
        let expected = target.value_type();
        let value = self.resolve_value(value, non_error(expected));
        let invalid = invalid || value.is_invalid;
        (InitKind::SimpleAssignment { target, value }, invalid)
    }

    fn resolve_assign_nested(
        &mut self,
        receiver: TypeId,
        member: &str,
        entries: &[Entry],
        span: Span,
    ) -> (InitKind, bool) {
        let (target, mut invalid) = self.resolve_member_target(receiver, member, span);
        // A nested list reads through the member; a set-only property has
        // nothing to read.
        if let MemberTarget::Property { has_getter: false, name, owner, .. } = &target {
            self.diagnostics.push(LowerError::MemberResolution {
                type_name: self.binder.type_info(*owner).name.clone(),
                member: format!("{}.get", name),
                span,
            });
            invalid = true;
        }
        let nested_receiver = target.value_type();
        let nested: Vec<InitializerNode> = entries
            .iter()
            .map(|e| self.resolve_entry(nested_receiver, e))
            .collect();
        let invalid = invalid || nested.iter().any(|n| n.is_invalid);
        (InitKind::MemberInitializer { target, entries: nested }, invalid)
    }

    fn resolve_member_target(
        &mut self,
        receiver: TypeId,
        name: &str,
        span: Span,
    ) -> (MemberTarget, bool) {
        if receiver == types::ERROR {
            // The receiver already failed to resolve; avoid cascading.
            return (MemberTarget::Unresolved { name: name.to_string() }, true);
        }
        match self.binder.resolve_member(receiver, name, span) {
            Ok(MemberRef::Field { name, ty }) => {
                (MemberTarget::Field { owner: receiver, name, ty }, false)
            }
            Ok(MemberRef::Property { name, ty, has_getter }) => (
                MemberTarget::Property { owner: receiver, name, ty, has_getter },
                false,
            ),
            Ok(MemberRef::Dynamic { name }) => (MemberTarget::DynamicMember { name }, false),
            Err(err) => {
                self.diagnostics.push(err);
                (MemberTarget::Unresolved { name: name.to_string() }, true)
            }
        }
    }

    fn resolve_add(
        &mut self,
        receiver: TypeId,
        args: &[Expr],
        span: Span,
    ) -> (InitKind, bool) {
        let raw: Vec<ValueExpr> =
            args.iter().map(|a| self.resolve_value(a, None)).collect();

        if receiver == types::ERROR {
            return (
                InitKind::CollectionElementAdd {
                    dispatch: AddDispatch::Unresolved,
                    args: raw.into_iter().map(ResolvedArg::bare).collect(),
                },
                true,
            );
        }

        let info = self.binder.type_info(receiver);
        if info.is_dynamic() || raw.iter().any(|a| a.ty == types::DYNAMIC) {
            return (
                InitKind::CollectionElementAdd {
                    dispatch: AddDispatch::Dynamic,
                    args: raw.into_iter().map(ResolvedArg::bare).collect(),
                },
                false,
            );
        }
        if !info.is_enumerable {
            self.diagnostics.push(LowerError::CollectionInterface {
                type_name: info.name.clone(),
                span,
            });
            return (
                InitKind::CollectionElementAdd {
                    dispatch: AddDispatch::Unresolved,
                    args: raw.into_iter().map(ResolvedArg::bare).collect(),
                },
                true,
            );
        }

        let arg_tys: Vec<TypeId> = raw.iter().map(|a| a.ty).collect();
        match self
            .binder
            .resolve_overload(OverloadSet::AddMethods(receiver), &arg_tys, span)
        {
            Ok(chosen) => {
                let call_syntax = raw
                    .iter()
                    .map(|a| a.syntax.clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                let args = self.map_arguments(&chosen, raw, &call_syntax);
                let invalid = args.iter().any(|a| a.value.is_invalid);
                (
                    InitKind::CollectionElementAdd {
                        dispatch: AddDispatch::Static(chosen),
                        args,
                    },
                    invalid,
                )
            }
            Err(err) => {
                self.diagnostics.push(err);
                (
                    InitKind::CollectionElementAdd {
                        dispatch: AddDispatch::Unresolved,
                        args: raw.into_iter().map(ResolvedArg::bare).collect(),
                    },
                    true,
                )
            }
        }
    }

    fn resolve_indexer_target(
        &mut self,
        receiver: TypeId,
        indices: &[Expr],
        span: Span,
    ) -> (MemberTarget, Vec<ValueExpr>, bool) {
        let raw: Vec<ValueExpr> =
            indices.iter().map(|i| self.resolve_value(i, None)).collect();

        if receiver == types::ERROR {
            return (
                MemberTarget::Unresolved { name: "this[]".to_string() },
                raw,
                true,
            );
        }
        if self.binder.type_info(receiver).is_dynamic() {
            return (MemberTarget::DynamicIndexer, raw, false);
        }

        let idx_tys: Vec<TypeId> = raw.iter().map(|i| i.ty).collect();
        match self
            .binder
            .resolve_overload(OverloadSet::Indexers(receiver), &idx_tys, span)
        {
            Ok(overload) => {
                let converted: Vec<ValueExpr> = raw
                    .into_iter()
                    .zip(overload.params.iter())
                    .map(|(v, p)| self.convert(v, p.ty))
                    .collect();
                (MemberTarget::Indexer { overload }, converted, false)
            }
            Err(err) => {
                self.diagnostics.push(err);
                (
                    MemberTarget::Unresolved { name: "this[]".to_string() },
                    raw,
                    true,
                )
            }
        }
    }

    fn resolve_value(&mut self, expr: &Expr, expected: Option<TypeId>) -> ValueExpr {
        let id = self.fresh();
        let syntax = expr.to_string();
        let span = expr.span();
        let value = match expr {
            Expr::Literal { value, .. } => ValueExpr {
                id,
                ty: literal_type(value),
                constant: Some(value.clone()),
                is_invalid: false,
                syntax,
                span,
                kind: ValueKind::Literal(value.clone()),
            },
            Expr::Local { name, .. } => {
                let ty = self.binder.local_type(name).unwrap_or(types::ERROR);
                ValueExpr {
                    id,
                    ty,
                    constant: None,
                    is_invalid: false,
                    syntax,
                    span,
                    kind: ValueKind::Local(name.clone()),
                }
            }
            Expr::Conditional { cond, when_true, when_false, .. } => {
                let cond = self.resolve_value(cond, None);
                let t = self.resolve_value(when_true, None);
                let f = self.resolve_value(when_false, None);
                let result = expected.unwrap_or_else(|| self.common_type(t.ty, f.ty));
                let t = self.convert(t, result);
                let f = self.convert(f, result);
                ValueExpr {
                    id,
                    ty: result,
                    constant: None,
                    is_invalid: cond.is_invalid || t.is_invalid || f.is_invalid,
                    syntax,
                    span,
                    kind: ValueKind::Conditional {
                        cond: Box::new(cond),
                        when_true: Box::new(t),
                        when_false: Box::new(f),
                    },
                }
            }
            Expr::Coalesce { value, when_null, .. } => {
                let v = self.resolve_value(value, None);
                let w = self.resolve_value(when_null, None);
                let result = expected.unwrap_or_else(|| self.common_type(v.ty, w.ty));
                let w = self.convert(w, result);
                ValueExpr {
                    id,
                    ty: result,
                    constant: None,
                    is_invalid: v.is_invalid || w.is_invalid,
                    syntax,
                    span,
                    kind: ValueKind::Coalesce {
                        value: Box::new(v),
                        when_null: Box::new(w),
                    },
                }
            }
            Expr::Switch { scrutinee, arms, .. } => {
                let scrutinee = self.resolve_value(scrutinee, None);
                let resolved: Vec<ValueExpr> = arms
                    .iter()
                    .map(|a| self.resolve_value(&a.value, None))
                    .collect();
                let result = expected.unwrap_or_else(|| {
                    let mut tys = resolved.iter().map(|v| v.ty);
                    let first = tys.next().unwrap_or(types::ERROR);
                    tys.fold(first, |acc, t| self.common_type(acc, t))
                });
                let mut invalid = scrutinee.is_invalid;
                let arm_nodes: Vec<ArmNode> = arms
                    .iter()
                    .zip(resolved)
                    .map(|(arm, v)| {
                        let v = self.convert(v, result);
                        invalid = invalid || v.is_invalid;
                        ArmNode { pattern: arm.pattern.clone(), value: v }
                    })
                    .collect();
                ValueExpr {
                    id,
                    ty: result,
                    constant: None,
                    is_invalid: invalid,
                    syntax,
                    span,
                    kind: ValueKind::Switch {
                        scrutinee: Box::new(scrutinee),
                        arms: arm_nodes,
                    },
                }
            }
            Expr::New { type_name, args, initializer, span } => {
                let creation = self.resolve_creation(
                    type_name.as_deref(),
                    args,
                    initializer.as_ref().map(|l| l.entries.as_slice()).unwrap_or(&[]),
                    *span,
                    syntax.clone(),
                    expected,
                );
                let ty = creation.ty;
                let is_invalid = creation.is_invalid
                    || creation.entries.iter().any(|e| e.is_invalid);
                ValueExpr {
                    id,
                    ty,
                    constant: None,
                    is_invalid,
                    syntax,
                    span: *span,
                    kind: ValueKind::Creation(Box::new(creation)),
                }
            }
        };
        match expected {
            Some(to) => self.convert(value, to),
            None => value,
        }
    }

    /// Wrap a value in an explicit conversion node when the context type
    /// differs. Unconvertible pairs are left alone — type checking beyond
    /// what resolution needs is out of scope.
    fn convert(&mut self, value: ValueExpr, to: TypeId) -> ValueExpr {
        if value.ty == to || to == types::ERROR || value.ty == types::ERROR {
            return value;
        }
        match self.binder.resolve_conversion(value.ty, to) {
            None | Some(ConversionKind::Identity) => value,
            Some(kind) => ValueExpr {
                id: self.fresh(),
                ty: to,
                constant: value.constant.clone(),
                is_invalid: value.is_invalid,
                syntax: value.syntax.clone(),
                span: value.span,
                kind: ValueKind::Convert { kind, operand: Box::new(value) },
            },
        }
    }

    fn common_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == types::NULL {
            return b;
        }
        if b == types::NULL {
            return a;
        }
        if self.binder.resolve_conversion(a, b).is_some() {
            return b;
        }
        if self.binder.resolve_conversion(b, a).is_some() {
            return a;
        }
        a
    }
}

fn non_error(ty: TypeId) -> Option<TypeId> {
    if ty == types::ERROR {
        None
    } else {
        Some(ty)
    }
}

fn literal_type(value: &ConstValue) -> TypeId {
    match value {
        ConstValue::Int(_) => types::INT32,
        ConstValue::Double(_) => types::DOUBLE,
        ConstValue::Bool(_) => types::BOOL,
        ConstValue::Str(_) => types::STRING,
        ConstValue::Null => types::NULL,
    }
}
