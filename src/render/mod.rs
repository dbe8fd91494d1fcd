//! Text rendering
//!
//! Renders operation trees and flow graphs into the textual forms the test
//! suite asserts against. The grammar is fixed: two-space nesting for
//! operation nodes, four-space nesting per region level in graphs, one
//! blank line after every statement and between blocks.

use std::fmt::Write;

use crate::flow::{BasicBlock, BlockKind, FallThrough, FlowGraph, JumpSense, RegionId};
use crate::model::ArgKind;
use crate::semantic::{OpKind, Operation};

/// Render a semantic operation tree.
pub fn render_operation_tree(op: &Operation) -> String {
    let mut out = String::new();
    write_op(&mut out, op, 0);
    out
}

fn pad(n: usize) -> String {
    " ".repeat(n)
}

fn write_line(out: &mut String, indent: usize, text: &str) {
    let _ = writeln!(out, "{}{}", pad(indent), text);
}

fn write_op(out: &mut String, op: &Operation, indent: usize) {
    write_line(out, indent, &header(op));
    write_children(out, op, indent);
}

/// A labeled child group: the label sits one level under the node, the
/// children one level under the label.
fn labeled(out: &mut String, indent: usize, label: &str, children: &[&Operation]) {
    write_line(out, indent + 2, label);
    for child in children {
        write_op(out, child, indent + 4);
    }
}

fn write_children(out: &mut String, op: &Operation, indent: usize) {
    match &op.kind {
        OpKind::ObjectCreation { args, initializer, .. } => {
            let arg_refs: Vec<&Operation> = args.iter().collect();
            labeled(out, indent, &format!("Arguments({}):", args.len()), &arg_refs);
            if let Some(init) = initializer {
                labeled(out, indent, "Initializer:", &[init]);
            }
        }
        OpKind::ObjectOrCollectionInitializer { entries } => {
            let refs: Vec<&Operation> = entries.iter().collect();
            labeled(out, indent, &format!("Initializers({}):", entries.len()), &refs);
        }
        OpKind::SimpleAssignment { left, right } => {
            labeled(out, indent, "Left:", &[left]);
            labeled(out, indent, "Right:", &[right]);
        }
        OpKind::MemberInitializer { member, initializer } => {
            labeled(out, indent, "InitializedMember:", &[member]);
            labeled(out, indent, "Initializer:", &[initializer]);
        }
        OpKind::FieldReference { instance, .. }
        | OpKind::PropertyReference { instance, .. }
        | OpKind::DynamicMemberReference { instance, .. } => {
            if let Some(instance) = instance {
                labeled(out, indent, "Instance:", &[instance]);
            }
        }
        OpKind::IndexerReference { instance, args, .. } => {
            if let Some(instance) = instance {
                labeled(out, indent, "Instance:", &[instance]);
            }
            if !args.is_empty() {
                let refs: Vec<&Operation> = args.iter().collect();
                labeled(out, indent, &format!("Indices({}):", args.len()), &refs);
            }
        }
        OpKind::DynamicIndexerAccess { instance, args } => {
            labeled(out, indent, "Instance:", &[instance]);
            let refs: Vec<&Operation> = args.iter().collect();
            labeled(out, indent, &format!("Indices({}):", args.len()), &refs);
        }
        OpKind::Invocation { instance, args, .. } => {
            labeled(out, indent, "Instance:", &[instance]);
            let refs: Vec<&Operation> = args.iter().collect();
            labeled(out, indent, &format!("Arguments({}):", args.len()), &refs);
        }
        OpKind::DynamicInvocation { instance, args, .. } => {
            labeled(out, indent, "Instance:", &[instance]);
            let refs: Vec<&Operation> = args.iter().collect();
            labeled(out, indent, &format!("Arguments({}):", args.len()), &refs);
        }
        OpKind::Argument { value, .. } => {
            write_op(out, value, indent + 2);
        }
        OpKind::ArrayCreation { elements } => {
            let refs: Vec<&Operation> = elements.iter().collect();
            labeled(out, indent, &format!("Elements({}):", elements.len()), &refs);
        }
        OpKind::Conversion { operand, .. } => {
            labeled(out, indent, "Operand:", &[operand]);
        }
        OpKind::Conditional { cond, when_true, when_false } => {
            labeled(out, indent, "Condition:", &[cond]);
            labeled(out, indent, "WhenTrue:", &[when_true]);
            labeled(out, indent, "WhenFalse:", &[when_false]);
        }
        OpKind::Coalesce { value, when_null } => {
            labeled(out, indent, "Expression:", &[value]);
            labeled(out, indent, "WhenNull:", &[when_null]);
        }
        OpKind::SwitchExpression { scrutinee, arms } => {
            labeled(out, indent, "Value:", &[scrutinee]);
            let refs: Vec<&Operation> = arms.iter().collect();
            labeled(out, indent, &format!("Arms({}):", arms.len()), &refs);
        }
        OpKind::SwitchExpressionArm { pattern, value } => {
            labeled(out, indent, "Pattern:", &[pattern]);
            labeled(out, indent, "Value:", &[value]);
        }
        OpKind::ConstantPattern { value } => {
            labeled(out, indent, "Value:", &[value]);
        }
        OpKind::IsNull { operand } => {
            labeled(out, indent, "Operand:", &[operand]);
        }
        OpKind::ConstantPatternTest { value, pattern } => {
            labeled(out, indent, "Value:", &[value]);
            labeled(out, indent, "Pattern:", &[pattern]);
        }
        OpKind::FlowCapture { value, .. } => {
            labeled(out, indent, "Value:", &[value]);
        }
        OpKind::ExpressionStatement { expr } => {
            labeled(out, indent, "Expression:", &[expr]);
        }
        OpKind::Invalid { children } => {
            if !children.is_empty() {
                let refs: Vec<&Operation> = children.iter().collect();
                labeled(out, indent, &format!("Children({}):", children.len()), &refs);
            }
        }
        OpKind::Literal
        | OpKind::LocalReference { .. }
        | OpKind::InstanceReference
        | OpKind::DiscardPattern
        | OpKind::FlowCaptureReference { .. }
        | OpKind::MatchFailure => {}
    }
}

fn header(op: &Operation) -> String {
    let name = match &op.kind {
        OpKind::ObjectCreation { ctor, .. } => match ctor {
            Some(c) => format!("ObjectCreation (Constructor: {})", c),
            None => "ObjectCreation".to_string(),
        },
        OpKind::ObjectOrCollectionInitializer { .. } => {
            "ObjectOrCollectionInitializer".to_string()
        }
        OpKind::SimpleAssignment { .. } => "SimpleAssignment".to_string(),
        OpKind::MemberInitializer { .. } => "MemberInitializer".to_string(),
        OpKind::FieldReference { field, .. } => {
            format!("FieldReference (Field: {})", field)
        }
        OpKind::PropertyReference { property, .. } => {
            format!("PropertyReference (Property: {})", property)
        }
        OpKind::IndexerReference { indexer, .. } => {
            format!("IndexerReference (Indexer: {})", indexer)
        }
        OpKind::DynamicMemberReference { member, .. } => {
            format!("DynamicMemberReference (Member: {})", member)
        }
        OpKind::DynamicIndexerAccess { .. } => "DynamicIndexerAccess".to_string(),
        OpKind::Invocation { method, .. } => format!("Invocation (Method: {})", method),
        OpKind::DynamicInvocation { member, .. } => {
            format!("DynamicInvocation (Member: {})", member)
        }
        OpKind::Argument { arg_kind, param, .. } => {
            let kind = match arg_kind {
                ArgKind::Explicit => "Explicit",
                ArgKind::DefaultValue => "DefaultValue",
                ArgKind::ParamArray => "ParamArray",
            };
            match param {
                Some(p) => format!("Argument ({}, Parameter: {})", kind, p),
                None => format!("Argument ({})", kind),
            }
        }
        OpKind::ArrayCreation { .. } => "ArrayCreation".to_string(),
        OpKind::Conversion { conv, .. } => {
            format!("Conversion (ConversionKind: {})", conv.as_str())
        }
        OpKind::Literal => "Literal".to_string(),
        OpKind::LocalReference { name } => format!("LocalReference: {}", name),
        OpKind::InstanceReference => "InstanceReference".to_string(),
        OpKind::Conditional { .. } => "Conditional".to_string(),
        OpKind::Coalesce { .. } => "Coalesce".to_string(),
        OpKind::SwitchExpression { .. } => "SwitchExpression".to_string(),
        OpKind::SwitchExpressionArm { .. } => "SwitchExpressionArm".to_string(),
        OpKind::ConstantPattern { .. } => "ConstantPattern".to_string(),
        OpKind::DiscardPattern => "DiscardPattern".to_string(),
        OpKind::IsNull { .. } => "IsNull".to_string(),
        OpKind::ConstantPatternTest { .. } => "ConstantPatternTest".to_string(),
        OpKind::FlowCapture { id, .. } => format!("FlowCapture: {}", id.0),
        OpKind::FlowCaptureReference { id } => {
            format!("FlowCaptureReference: {}", id.0)
        }
        OpKind::MatchFailure => "MatchFailure".to_string(),
        OpKind::ExpressionStatement { .. } => "ExpressionStatement".to_string(),
        OpKind::Invalid { .. } => "Invalid".to_string(),
    };

    // FlowCapture carries no type group, matching its result-less nature.
    if matches!(op.kind, OpKind::FlowCapture { .. }) {
        return format!("{} (Syntax: '{}')", name, op.syntax);
    }

    let mut attrs = format!("Type: {}", op.ty.as_deref().unwrap_or("null"));
    if let Some(c) = &op.constant {
        let _ = write!(attrs, ", Constant: {}", c.tree_text());
    }
    if op.is_invalid() {
        attrs.push_str(", IsInvalid");
    }
    format!("{} ({}) (Syntax: '{}')", name, attrs, op.syntax)
}

/// Render a flow graph in the block/region grammar.
pub fn render_flow_graph(graph: &FlowGraph) -> String {
    let mut out = String::new();
    let mut prev_chain: Vec<RegionId> = Vec::new();
    let count = graph.blocks.len();

    for (i, block) in graph.blocks.iter().enumerate() {
        let chain = graph.region_chain(block);
        let common = prev_chain
            .iter()
            .zip(chain.iter())
            .take_while(|(a, b)| a == b)
            .count();

        for depth in (common..prev_chain.len()).rev() {
            write_line(&mut out, 4 * depth, "}");
        }
        for (depth, region) in chain.iter().enumerate().skip(common) {
            write_line(&mut out, 4 * depth, &format!(".locals {{{}}}", region_name(*region)));
            write_line(&mut out, 4 * depth, "{");
            let r = &graph.regions[region.index()];
            let inner = 4 * (depth + 1);
            if !r.locals.is_empty() {
                let locals = r
                    .locals
                    .iter()
                    .map(|(ty, name)| format!("{} {}", ty, name))
                    .collect::<Vec<_>>()
                    .join(", ");
                write_line(&mut out, inner, &format!("Locals: [{}]", locals));
            }
            if !r.captures.is_empty() {
                let ids = r
                    .captures
                    .iter()
                    .map(|c| c.0.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write_line(&mut out, inner, &format!("CaptureIds: [{}]", ids));
            }
        }

        write_block(&mut out, graph, block, 4 * chain.len());
        if i + 1 < count {
            out.push('\n');
        }
        prev_chain = chain;
    }
    out
}

fn region_name(id: RegionId) -> String {
    format!("R{}", id.0 + 1)
}

fn block_name(block: &BasicBlock) -> String {
    format!("Block[B{}]", block.id.0)
}

fn write_block(out: &mut String, graph: &FlowGraph, block: &BasicBlock, indent: usize) {
    let kind = match block.kind {
        BlockKind::Entry => "Entry",
        BlockKind::Block => "Block",
        BlockKind::Exit => "Exit",
    };
    write_line(out, indent, &format!("{} - {}", block_name(block), kind));

    if block.kind != BlockKind::Entry {
        let preds = graph
            .predecessors(block.id)
            .iter()
            .map(|p| format!("B{}", p.0))
            .collect::<Vec<_>>()
            .join(", ");
        write_line(out, indent + 4, &format!("Predecessors: [{}]", preds));
    }

    write_line(out, indent + 4, &format!("Statements ({})", block.statements.len()));
    for stmt in &block.statements {
        write_op(out, stmt, indent + 8);
        out.push('\n');
    }

    if let Some(branch) = &block.branch {
        let sense = match branch.sense {
            JumpSense::IfFalse => "False",
            JumpSense::IfTrue => "True",
        };
        let target = &graph.blocks[branch.target.index()];
        write_line(
            out,
            indent + 4,
            &format!("Jump if {} (Regular) to Block[B{}]", sense, branch.target.0),
        );
        annotate_edge(out, graph, block, target, indent + 8);
        write_op(out, &branch.condition, indent + 8);
        out.push('\n');
    }

    match &block.fall_through {
        Some(FallThrough::Regular(next)) => {
            let target = &graph.blocks[next.index()];
            write_line(out, indent + 4, &format!("Next (Regular) Block[B{}]", next.0));
            annotate_edge(out, graph, block, target, indent + 8);
        }
        Some(FallThrough::Throw(op)) => {
            write_line(out, indent + 4, "Next (Throw) Block[null]");
            write_op(out, op, indent + 8);
        }
        None => {}
    }
}

/// `Leaving:`/`Entering:` annotations for an edge, from the region chains
/// of its endpoints.
fn annotate_edge(
    out: &mut String,
    graph: &FlowGraph,
    from: &BasicBlock,
    to: &BasicBlock,
    indent: usize,
) {
    let from_chain = graph.region_chain(from);
    let to_chain = graph.region_chain(to);
    let common = from_chain
        .iter()
        .zip(to_chain.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if from_chain.len() > common {
        let leaving = from_chain[common..]
            .iter()
            .rev()
            .map(|r| format!("{{{}}}", region_name(*r)))
            .collect::<Vec<_>>()
            .join(" ");
        write_line(out, indent, &format!("Leaving: {}", leaving));
    }
    if to_chain.len() > common {
        let entering = to_chain[common..]
            .iter()
            .map(|r| format!("{{{}}}", region_name(*r)))
            .collect::<Vec<_>>()
            .join(" ");
        write_line(out, indent, &format!("Entering: {}", entering));
    }
}
