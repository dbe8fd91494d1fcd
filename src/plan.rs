//! Evaluation-order planner
//!
//! Walks the resolved model and decides, per node, whether its value is
//! inlined at each use, captured into a temporary, or lowered as a branch.
//! The planner only decides; materializing captures and blocks is the flow
//! builder's job. Planning is best-effort over invalid nodes so error
//! recovery keeps the rest of the initializer lowering.

use rustc_hash::FxHashMap;

use crate::model::{
    CreationNode, IndexedValue, InitKind, InitializerNode, NodeId, ResolvedArg, ValueExpr,
    ValueKind,
};

/// How the flow builder treats one resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Evaluate in place at the point of use.
    Inline,
    /// Evaluate once into a flow capture; later uses read the capture.
    Capture,
    /// Lower as a multi-block branch whose arms write one reserved capture.
    Branch,
}

/// The planner's output: a decision per node id, defaulting to `Inline`.
#[derive(Debug, Default)]
pub struct CapturePlan {
    decisions: FxHashMap<NodeId, Decision>,
}

impl CapturePlan {
    /// The decision for a node; nodes the planner never marked are inlined.
    pub fn decision(&self, id: NodeId) -> Decision {
        self.decisions.get(&id).copied().unwrap_or(Decision::Inline)
    }

    fn mark(&mut self, id: NodeId, decision: Decision) {
        self.decisions.insert(id, decision);
    }
}

/// Produce the capture plan for a resolved creation.
pub fn plan(root: &CreationNode) -> CapturePlan {
    let mut plan = CapturePlan::default();
    plan_creation(&mut plan, root);
    plan
}

fn plan_creation(plan: &mut CapturePlan, node: &CreationNode) {
    // Rule (a): the created instance is the receiver of every entry in its
    // initializer list and must be constructed exactly once.
    if node.has_initializer() {
        plan.mark(node.id, Decision::Capture);
    }
    plan_arg_list(plan, &node.args);
    for entry in &node.entries {
        plan_entry(plan, entry);
    }
}

fn plan_entry(plan: &mut CapturePlan, entry: &InitializerNode) {
    match &entry.kind {
        InitKind::SimpleAssignment { value, .. } => plan_value(plan, value),
        InitKind::MemberInitializer { entries, .. } => {
            // Rule (c): the member's getter read is the receiver of the
            // nested list and is captured once.
            plan.mark(entry.id, Decision::Capture);
            for nested in entries {
                plan_entry(plan, nested);
            }
        }
        InitKind::CollectionElementAdd { args, .. } => plan_arg_list(plan, args),
        InitKind::IndexerElementAdd { indices, value, .. } => match value {
            IndexedValue::Value(v) => {
                // Indices then the value form one left-to-right list;
                // the pre-branch rule applies across it.
                let list: Vec<&ValueExpr> =
                    indices.iter().chain(std::iter::once(v)).collect();
                plan_value_list(plan, &list);
            }
            IndexedValue::Nested(entries) => {
                // Rule (c): the element read (indices included) is
                // evaluated once into a capture; nested entries read
                // through it.
                plan.mark(entry.id, Decision::Capture);
                let list: Vec<&ValueExpr> = indices.iter().collect();
                plan_value_list(plan, &list);
                for nested in entries {
                    plan_entry(plan, nested);
                }
            }
        },
    }
}

fn plan_arg_list(plan: &mut CapturePlan, args: &[ResolvedArg]) {
    let values: Vec<&ValueExpr> = args.iter().map(|a| &a.value).collect();
    plan_value_list(plan, &values);
}

/// Plan a left-to-right evaluation list: rule (b) captures every
/// non-constant value that precedes a branching sibling, so the siblings'
/// once-only order survives the branch's block split. Values after the
/// last branching sibling are never hoisted.
fn plan_value_list(plan: &mut CapturePlan, values: &[&ValueExpr]) {
    let last_branch = values.iter().rposition(|v| branches(v));
    for (i, value) in values.iter().enumerate() {
        let before_branch = matches!(last_branch, Some(b) if i < b);
        if before_branch && !value.is_constant() && !branches(value) {
            plan.mark(value.id, Decision::Capture);
        }
        plan_value(plan, value);
    }
}

fn plan_value(plan: &mut CapturePlan, value: &ValueExpr) {
    // Constants are always inlined, even when reused.
    if value.is_constant() {
        return;
    }
    match &value.kind {
        ValueKind::Literal(_) | ValueKind::Local(_) => {}
        ValueKind::Convert { operand, .. } => {
            if branches(value) {
                plan.mark(value.id, Decision::Branch);
            }
            plan_value(plan, operand);
        }
        ValueKind::Conditional { cond, when_true, when_false } => {
            plan.mark(value.id, Decision::Branch);
            plan_value(plan, cond);
            plan_value(plan, when_true);
            plan_value(plan, when_false);
        }
        ValueKind::Coalesce { value: v, when_null } => {
            plan.mark(value.id, Decision::Branch);
            plan_value(plan, v);
            plan_value(plan, when_null);
        }
        ValueKind::Switch { scrutinee, arms } => {
            plan.mark(value.id, Decision::Branch);
            plan_value(plan, scrutinee);
            for arm in arms {
                plan_value(plan, &arm.value);
            }
        }
        ValueKind::Creation(creation) => plan_creation(plan, creation),
        ValueKind::ParamsArray { elements } => {
            let list: Vec<&ValueExpr> = elements.iter().collect();
            plan_value_list(plan, &list);
        }
        ValueKind::Invalid(children) => {
            for child in children {
                plan_value(plan, child);
            }
        }
    }
}

/// Whether evaluating this value splits control flow, seen through any
/// conversion wrappers.
fn branches(value: &ValueExpr) -> bool {
    match &value.kind {
        ValueKind::Conditional { .. }
        | ValueKind::Coalesce { .. }
        | ValueKind::Switch { .. } => true,
        ValueKind::Convert { operand, .. } => branches(operand),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::types::INT32;
    use crate::binder::{LowerError, TypeCatalog};
    use crate::model::Resolver;
    use crate::syntax::{Entry, Expr, InitializerStatement};

    fn plan_for(cat: &TypeCatalog, expr: Expr) -> (CreationNode, CapturePlan) {
        let stmt = InitializerStatement::expression(expr);
        let mut sink: Vec<LowerError> = Vec::new();
        let node = Resolver::new(cat, &mut sink).resolve_statement(&stmt);
        let plan = plan(&node);
        (node, plan)
    }

    fn field_catalog() -> TypeCatalog {
        let mut cat = TypeCatalog::new();
        let f = cat.declare_class("F");
        cat.add_field(f, "A", INT32);
        cat.add_field(f, "B", INT32);
        cat.declare_local("b", crate::binder::types::BOOL);
        cat.declare_local("x", INT32);
        cat.declare_local("y", INT32);
        cat
    }

    #[test]
    fn test_receiver_captured_when_initializer_present() {
        let cat = field_catalog();
        let (node, plan) =
            plan_for(&cat, Expr::new_init("F", vec![], vec![Entry::assign("A", Expr::int(2))]));
        assert_eq!(plan.decision(node.id), Decision::Capture);
    }

    #[test]
    fn test_receiver_inlined_without_initializer() {
        let cat = field_catalog();
        let (node, plan) = plan_for(&cat, Expr::new_obj("F", vec![]));
        assert_eq!(plan.decision(node.id), Decision::Inline);
    }

    #[test]
    fn test_branching_value_marked_branch() {
        let cat = field_catalog();
        let (node, plan) = plan_for(
            &cat,
            Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign(
                    "A",
                    Expr::ternary(Expr::local("b"), Expr::int(1), Expr::int(2)),
                )],
            ),
        );
        let value = match &node.entries[0].kind {
            InitKind::SimpleAssignment { value, .. } => value,
            other => panic!("unexpected entry kind: {:?}", other),
        };
        assert_eq!(plan.decision(value.id), Decision::Branch);
    }

    #[test]
    fn test_argument_before_branch_captured_later_not_hoisted() {
        let mut cat = field_catalog();
        let c = cat.declare_class("C");
        cat.add_add_method(
            c,
            vec![
                crate::binder::ParamSpec::new("a", INT32),
                crate::binder::ParamSpec::new("b", INT32),
                crate::binder::ParamSpec::new("c", INT32),
            ],
        );
        let (node, plan) = plan_for(
            &cat,
            Expr::new_init(
                "C",
                vec![],
                vec![Entry::add_many(vec![
                    Expr::local("x"),
                    Expr::ternary(Expr::local("b"), Expr::int(1), Expr::int(2)),
                    Expr::local("y"),
                ])],
            ),
        );
        let args = match &node.entries[0].kind {
            InitKind::CollectionElementAdd { args, .. } => args,
            other => panic!("unexpected entry kind: {:?}", other),
        };
        assert_eq!(plan.decision(args[0].value.id), Decision::Capture);
        assert_eq!(plan.decision(args[1].value.id), Decision::Branch);
        assert_eq!(plan.decision(args[2].value.id), Decision::Inline);
    }

    #[test]
    fn test_constant_before_branch_stays_inline() {
        let mut cat = field_catalog();
        let c = cat.declare_class("C");
        cat.add_add_method(
            c,
            vec![
                crate::binder::ParamSpec::new("a", INT32),
                crate::binder::ParamSpec::new("b", INT32),
            ],
        );
        let (node, plan) = plan_for(
            &cat,
            Expr::new_init(
                "C",
                vec![],
                vec![Entry::add_many(vec![
                    Expr::int(7),
                    Expr::ternary(Expr::local("b"), Expr::int(1), Expr::int(2)),
                ])],
            ),
        );
        let args = match &node.entries[0].kind {
            InitKind::CollectionElementAdd { args, .. } => args,
            other => panic!("unexpected entry kind: {:?}", other),
        };
        assert_eq!(plan.decision(args[0].value.id), Decision::Inline);
    }

    #[test]
    fn test_nested_member_initializer_receiver_captured() {
        use crate::binder::Binder as _;
        let mut cat = field_catalog();
        let f = cat.lookup_type("F").unwrap();
        let g = cat.declare_class("G");
        cat.add_field(g, "Inner", INT32);
        cat.add_property(f, "X", g);
        let (node, plan) = plan_for(
            &cat,
            Expr::new_init(
                "F",
                vec![],
                vec![Entry::assign_nested("X", vec![Entry::assign("Inner", Expr::int(1))])],
            ),
        );
        assert_eq!(plan.decision(node.entries[0].id), Decision::Capture);
    }
}
