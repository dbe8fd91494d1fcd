//! Flow-graph construction
//!
//! A single-threaded recursive walk over the resolved model, consuming the
//! capture plan. Linear entries append to the current block; branching
//! values split into arm blocks that write one reserved capture id and
//! merge; nested initializer lists capture their receiver in a child
//! region. Regions close only after the statement consuming their captures
//! has been emitted, so every capture reference stays inside the region
//! that owns its id.

use super::block::{
    BasicBlock, BlockId, BlockKind, ConditionalBranch, FallThrough, JumpSense,
};
use super::region::{CaptureId, CaptureTable, RegionId};
use super::FlowGraph;
use crate::binder::types;
use crate::binder::{Binder, ConversionKind};
use crate::model::{
    CreationNode, IndexedValue, InitKind, InitializerNode, ValueExpr, ValueKind,
};
use crate::plan::{CapturePlan, Decision};
use crate::semantic::{OpBuilder, OpKind, Operation};
use crate::syntax::Pattern;

/// Builds the flow graph for one lowered initializer expression.
pub struct FlowBuilder<'a> {
    ops: OpBuilder<'a>,
    plan: &'a CapturePlan,
    binder: &'a dyn Binder,
    table: CaptureTable,
    blocks: Vec<BasicBlock>,
    current: BlockId,
    /// When set, the next statement starts a fresh block in the innermost
    /// open region (a region boundary was just crossed).
    pending: bool,
    /// Regions opened while lowering the current consuming statement,
    /// closed innermost-first after that statement is emitted.
    stmt_regions: Vec<RegionId>,
}

impl<'a> FlowBuilder<'a> {
    /// Lower a resolved creation into a flow graph. `target_local` is the
    /// declared result local as `(type display, name)`, when the statement
    /// has one.
    pub fn build(
        root: &CreationNode,
        plan: &'a CapturePlan,
        binder: &'a dyn Binder,
        target_local: Option<(String, String)>,
    ) -> FlowGraph {
        let mut b = FlowBuilder {
            ops: OpBuilder::new(binder),
            plan,
            binder,
            table: CaptureTable::new(),
            blocks: Vec::new(),
            current: BlockId(0),
            pending: false,
            stmt_regions: Vec::new(),
        };

        let entry = b.new_block(BlockKind::Entry, None);
        b.current = entry;

        let root_region = b.table.open_region();
        if let Some((ty, name)) = &target_local {
            b.table.declare_local(root_region, ty.clone(), name.clone());
        }
        b.pending = true;

        let result = b.lower_root(root);

        let final_stmt = match &target_local {
            Some((ty, name)) => Operation {
                ty: Some(ty.clone()),
                constant: None,
                invalid: false,
                syntax: format!("{} = {}", name, root.syntax),
                kind: OpKind::SimpleAssignment {
                    left: Box::new(Operation {
                        ty: Some(ty.clone()),
                        constant: None,
                        invalid: false,
                        syntax: name.clone(),
                        kind: OpKind::LocalReference { name: name.clone() },
                    }),
                    right: Box::new(result),
                },
            },
            None => Operation {
                ty: None,
                constant: None,
                invalid: false,
                syntax: root.syntax.clone(),
                kind: OpKind::ExpressionStatement { expr: Box::new(result) },
            },
        };
        b.push_stmt(final_stmt);
        b.table.close_region(root_region);

        let exit = b.new_block(BlockKind::Exit, None);
        b.link(b.current, exit);

        FlowGraph { blocks: b.blocks, regions: b.table.into_regions() }
    }

    fn lower_root(&mut self, root: &CreationNode) -> Operation {
        for arg in &root.args {
            self.lower_operand(&arg.value);
        }
        if self.plan.decision(root.id) != Decision::Capture {
            return self.ops.creation(root);
        }
        let shell = self.ops.creation_shell(root);
        let id = self.table.capture();
        self.push_stmt(Operation::capture(id, shell));
        let receiver =
            Operation::capture_ref(id, self.ops.type_name(root.ty), root.syntax.clone());
        for entry in &root.entries {
            self.lower_entry(&receiver, entry);
        }
        receiver
    }

    // ---- blocks and regions ----

    fn new_block(&mut self, kind: BlockKind, region: Option<RegionId>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id, kind, region));
        id
    }

    fn link(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.index()].fall_through = Some(FallThrough::Regular(to));
    }

    /// Materialize the pending fresh block, if a region boundary was
    /// crossed since the last statement.
    fn ensure_block(&mut self) {
        if self.pending {
            let region = self.table.current();
            let id = self.new_block(BlockKind::Block, region);
            self.link(self.current, id);
            self.current = id;
            self.pending = false;
        }
    }

    fn push_stmt(&mut self, op: Operation) {
        self.ensure_block();
        self.blocks[self.current.index()].statements.push(op);
    }

    fn open_stmt_region(&mut self) -> RegionId {
        let region = self.table.open_region();
        self.stmt_regions.push(region);
        self.pending = true;
        region
    }

    fn close_stmt_regions(&mut self, mark: usize) {
        while self.stmt_regions.len() > mark {
            let region = self.stmt_regions.pop().expect("stmt region stack underflow");
            self.table.close_region(region);
            self.pending = true;
        }
    }

    // ---- entries ----

    fn lower_entry(&mut self, receiver: &Operation, entry: &InitializerNode) {
        match &entry.kind {
            InitKind::MemberInitializer { target, entries } => {
                let region = self.table.open_region();
                self.pending = true;
                let access = self.ops.member_ref(target, receiver.clone());
                let id = self.table.capture();
                self.push_stmt(Operation::capture(id, access));
                let nested = Operation::capture_ref(
                    id,
                    self.ops.type_name(target.value_type()),
                    target.name().unwrap_or(&entry.syntax).to_string(),
                );
                for child in entries {
                    self.lower_entry(&nested, child);
                }
                self.table.close_region(region);
                self.pending = true;
            }
            InitKind::IndexerElementAdd { target, indices, value: IndexedValue::Nested(entries) } => {
                let region = self.table.open_region();
                self.pending = true;
                for index in indices {
                    self.lower_operand(index);
                }
                let access =
                    self.ops.element_access(target, receiver.clone(), indices, entry);
                let id = self.table.capture();
                self.push_stmt(Operation::capture(id, access));
                let nested = Operation::capture_ref(
                    id,
                    self.ops.type_name(target.value_type()),
                    entry.syntax.clone(),
                );
                for child in entries {
                    self.lower_entry(&nested, child);
                }
                self.table.close_region(region);
                self.pending = true;
            }
            _ => {
                let mark = self.stmt_regions.len();
                if self.entry_needs_region(entry) {
                    self.open_stmt_region();
                }
                for value in top_values(entry) {
                    self.lower_operand(value);
                }
                let stmt = self.ops.entry(receiver, entry);
                self.push_stmt(stmt);
                self.close_stmt_regions(mark);
            }
        }
    }

    /// Whether any of the entry's directly evaluated values needs a
    /// capture or branch, and so a region scoped to this statement.
    fn entry_needs_region(&self, entry: &InitializerNode) -> bool {
        top_values(entry)
            .iter()
            .any(|v| self.plan.decision(v.id) != Decision::Inline)
    }

    // ---- values ----

    /// Lower one value in evaluation order. Captured and branching values
    /// emit statements/blocks and register a capture-reference
    /// substitution; inline values are side-effect free and rebuilt by the
    /// consuming statement.
    fn lower_operand(&mut self, v: &ValueExpr) -> Operation {
        match self.plan.decision(v.id) {
            Decision::Branch => self.lower_branch(v),
            Decision::Capture => {
                let op = self.lower_inline(v);
                let id = self.table.capture();
                self.push_stmt(Operation::capture(id, op));
                let r = Operation::capture_ref(
                    id,
                    self.ops.type_name(v.ty),
                    v.syntax.clone(),
                );
                self.ops.substitute(v.id, r.clone());
                r
            }
            Decision::Inline => self.lower_inline(v),
        }
    }

    fn lower_inline(&mut self, v: &ValueExpr) -> Operation {
        match &v.kind {
            ValueKind::Creation(node) => {
                if self.plan.decision(node.id) == Decision::Capture {
                    let r = self.lower_nested_creation(node);
                    self.ops.substitute(v.id, r.clone());
                    r
                } else {
                    for arg in &node.args {
                        self.lower_operand(&arg.value);
                    }
                    self.ops.creation(node)
                }
            }
            ValueKind::Convert { kind, operand } => {
                let inner = self.lower_operand(operand);
                Operation {
                    ty: Some(self.ops.type_name(v.ty)),
                    constant: v.constant.clone(),
                    invalid: v.is_invalid,
                    syntax: v.syntax.clone(),
                    kind: OpKind::Conversion { conv: *kind, operand: Box::new(inner) },
                }
            }
            ValueKind::ParamsArray { elements } => {
                for element in elements {
                    self.lower_operand(element);
                }
                self.ops.value(v)
            }
            ValueKind::Invalid(children) => {
                for child in children {
                    self.lower_operand(child);
                }
                self.ops.value(v)
            }
            _ => self.ops.value(v),
        }
    }

    /// A nested creation with an initializer list: its own region, a
    /// receiver capture, then every nested entry. The region stays open
    /// until the statement consuming the returned reference is emitted.
    fn lower_nested_creation(&mut self, node: &CreationNode) -> Operation {
        self.open_stmt_region();
        for arg in &node.args {
            self.lower_operand(&arg.value);
        }
        let shell = self.ops.creation_shell(node);
        let id = self.table.capture();
        self.push_stmt(Operation::capture(id, shell));
        let receiver =
            Operation::capture_ref(id, self.ops.type_name(node.ty), node.syntax.clone());
        for entry in &node.entries {
            self.lower_entry(&receiver, entry);
        }
        receiver
    }

    // ---- branches ----

    fn lower_branch(&mut self, v: &ValueExpr) -> Operation {
        let r = match &v.kind {
            ValueKind::Conditional { cond, when_true, when_false } => {
                self.lower_conditional(v, cond, when_true, when_false, None)
            }
            ValueKind::Coalesce { value, when_null } => {
                self.lower_coalesce(v, value, when_null, None)
            }
            ValueKind::Switch { scrutinee, arms } => {
                self.lower_switch(v, scrutinee, arms, None)
            }
            ValueKind::Convert { kind, operand } => {
                let conv = Some((*kind, self.ops.type_name(v.ty)));
                match &operand.kind {
                    ValueKind::Conditional { cond, when_true, when_false } => {
                        self.lower_conditional(v, cond, when_true, when_false, conv)
                    }
                    ValueKind::Coalesce { value, when_null } => {
                        self.lower_coalesce(v, value, when_null, conv)
                    }
                    ValueKind::Switch { scrutinee, arms } => {
                        self.lower_switch(v, scrutinee, arms, conv)
                    }
                    _ => self.lower_inline(v),
                }
            }
            _ => self.lower_inline(v),
        };
        self.ops.substitute(v.id, r.clone());
        r
    }

    /// Capture one branch arm's result into the reserved id, closing any
    /// regions the arm itself opened before control leaves it.
    fn lower_arm(
        &mut self,
        id: CaptureId,
        arm: &ValueExpr,
        conv: &Option<(ConversionKind, String)>,
    ) {
        let mark = self.stmt_regions.len();
        let op = self.lower_operand(arm);
        let op = wrap_conv(op, conv);
        self.push_stmt(Operation::capture(id, op));
        self.close_stmt_regions(mark);
    }

    fn lower_conditional(
        &mut self,
        v: &ValueExpr,
        cond: &ValueExpr,
        when_true: &ValueExpr,
        when_false: &ValueExpr,
        conv: Option<(ConversionKind, String)>,
    ) -> Operation {
        let cond_op = self.lower_operand(cond);
        self.ensure_block();
        let decision = self.current;
        let id = self.table.reserve();

        let true_block = self.new_block(BlockKind::Block, self.table.current());
        self.link(decision, true_block);
        self.current = true_block;
        self.pending = false;
        self.lower_arm(id, when_true, &conv);
        let true_end = self.current;

        let false_block = self.new_block(BlockKind::Block, self.table.current());
        self.blocks[decision.index()].branch = Some(ConditionalBranch {
            sense: JumpSense::IfFalse,
            condition: cond_op,
            target: false_block,
        });
        self.current = false_block;
        self.pending = false;
        self.lower_arm(id, when_false, &conv);
        let false_end = self.current;

        let merge = self.new_block(BlockKind::Block, self.table.current());
        self.link(true_end, merge);
        self.link(false_end, merge);
        self.current = merge;
        self.pending = false;

        Operation::capture_ref(id, self.result_ty(v, &conv), v.syntax.clone())
    }

    fn lower_coalesce(
        &mut self,
        v: &ValueExpr,
        value: &ValueExpr,
        when_null: &ValueExpr,
        conv: Option<(ConversionKind, String)>,
    ) -> Operation {
        let value_op = self.lower_operand(value);
        let vid = self.table.capture();
        self.push_stmt(Operation::capture(vid, value_op));
        self.ensure_block();
        let decision = self.current;
        let id = self.table.reserve();

        let value_ty = self.ops.type_name(value.ty);
        let value_ref =
            Operation::capture_ref(vid, value_ty.clone(), value.syntax.clone());
        let is_null = Operation {
            ty: Some(self.ops.type_name(types::BOOL)),
            constant: None,
            invalid: false,
            syntax: value.syntax.clone(),
            kind: OpKind::IsNull { operand: Box::new(value_ref.clone()) },
        };

        // Not-null arm: recapture the value reference, converted to the
        // result type when the sides differ.
        let not_null = self.new_block(BlockKind::Block, self.table.current());
        self.link(decision, not_null);
        self.current = not_null;
        self.pending = false;
        let recapture = match self.binder.resolve_conversion(value.ty, v.ty) {
            Some(kind) if kind != ConversionKind::Identity => Operation {
                ty: Some(self.ops.type_name(v.ty)),
                constant: None,
                invalid: false,
                syntax: value.syntax.clone(),
                kind: OpKind::Conversion { conv: kind, operand: Box::new(value_ref) },
            },
            _ => value_ref,
        };
        let recapture = wrap_conv(recapture, &conv);
        self.push_stmt(Operation::capture(id, recapture));
        let not_null_end = self.current;

        let null_block = self.new_block(BlockKind::Block, self.table.current());
        self.blocks[decision.index()].branch = Some(ConditionalBranch {
            sense: JumpSense::IfTrue,
            condition: is_null,
            target: null_block,
        });
        self.current = null_block;
        self.pending = false;
        self.lower_arm(id, when_null, &conv);
        let null_end = self.current;

        let merge = self.new_block(BlockKind::Block, self.table.current());
        self.link(not_null_end, merge);
        self.link(null_end, merge);
        self.current = merge;
        self.pending = false;

        Operation::capture_ref(id, self.result_ty(v, &conv), v.syntax.clone())
    }

    fn lower_switch(
        &mut self,
        v: &ValueExpr,
        scrutinee: &ValueExpr,
        arms: &[crate::model::ArmNode],
        conv: Option<(ConversionKind, String)>,
    ) -> Operation {
        let scrutinee_op = self.lower_operand(scrutinee);
        let sid = self.table.capture();
        self.push_stmt(Operation::capture(sid, scrutinee_op));
        let id = self.table.reserve();
        let scrutinee_ty = self.ops.type_name(scrutinee.ty);
        let bool_ty = self.ops.type_name(types::BOOL);

        let mut arm_ends = Vec::new();
        let mut has_discard = false;
        for arm in arms {
            match &arm.pattern {
                Pattern::Constant(_) => {
                    self.ensure_block();
                    let decision = self.current;
                    let test = Operation {
                        ty: Some(bool_ty.clone()),
                        constant: None,
                        invalid: false,
                        syntax: format!("{} => {}", arm.pattern, arm.value.syntax),
                        kind: OpKind::ConstantPatternTest {
                            value: Box::new(Operation::capture_ref(
                                sid,
                                scrutinee_ty.clone(),
                                scrutinee.syntax.clone(),
                            )),
                            pattern: Box::new(self.ops.pattern(&arm.pattern)),
                        },
                    };
                    let result = self.new_block(BlockKind::Block, self.table.current());
                    self.link(decision, result);
                    self.current = result;
                    self.pending = false;
                    self.lower_arm(id, &arm.value, &conv);
                    arm_ends.push(self.current);

                    let next = self.new_block(BlockKind::Block, self.table.current());
                    self.blocks[decision.index()].branch = Some(ConditionalBranch {
                        sense: JumpSense::IfFalse,
                        condition: test,
                        target: next,
                    });
                    self.current = next;
                    self.pending = false;
                }
                Pattern::Discard => {
                    self.ensure_block();
                    self.lower_arm(id, &arm.value, &conv);
                    arm_ends.push(self.current);
                    has_discard = true;
                    break;
                }
            }
        }

        if !has_discard {
            // No arm matched: control leaves the graph by throwing.
            self.ensure_block();
            let failure = Operation {
                ty: None,
                constant: None,
                invalid: false,
                syntax: v.syntax.clone(),
                kind: OpKind::MatchFailure,
            };
            self.blocks[self.current.index()].fall_through =
                Some(FallThrough::Throw(Box::new(failure)));
        }

        let merge = self.new_block(BlockKind::Block, self.table.current());
        for end in arm_ends {
            self.link(end, merge);
        }
        self.current = merge;
        self.pending = false;

        Operation::capture_ref(id, self.result_ty(v, &conv), v.syntax.clone())
    }

    fn result_ty(&self, v: &ValueExpr, conv: &Option<(ConversionKind, String)>) -> String {
        match conv {
            Some((_, ty)) => ty.clone(),
            None => self.ops.type_name(v.ty),
        }
    }
}

fn wrap_conv(op: Operation, conv: &Option<(ConversionKind, String)>) -> Operation {
    match conv {
        Some((kind, ty)) => Operation {
            ty: Some(ty.clone()),
            constant: None,
            invalid: false,
            syntax: op.syntax.clone(),
            kind: OpKind::Conversion { conv: *kind, operand: Box::new(op) },
        },
        None => op,
    }
}

fn top_values(entry: &InitializerNode) -> Vec<&ValueExpr> {
    match &entry.kind {
        InitKind::SimpleAssignment { value, .. } => vec![value],
        InitKind::CollectionElementAdd { args, .. } => {
            args.iter().map(|a| &a.value).collect()
        }
        InitKind::IndexerElementAdd { indices, value: IndexedValue::Value(v), .. } => {
            indices.iter().chain(std::iter::once(v)).collect()
        }
        InitKind::MemberInitializer { .. }
        | InitKind::IndexerElementAdd { value: IndexedValue::Nested(_), .. } => Vec::new(),
    }
}
