//! Basic blocks
//!
//! Blocks hold an ordered statement list, at most one conditional branch,
//! and a fall-through successor. Predecessors are derived by the graph,
//! never stored here.

use super::region::RegionId;
use crate::semantic::Operation;

/// Index of a block within its graph; renders as `B{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Block classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// The unique entry block `B0`.
    Entry,
    /// An ordinary block.
    Block,
    /// The unique exit block.
    Exit,
}

/// Condition polarity of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpSense {
    /// Taken when the condition is false.
    IfFalse,
    /// Taken when the condition is true.
    IfTrue,
}

/// A conditional jump out of a block; the fall-through covers the other
/// polarity.
#[derive(Debug, Clone)]
pub struct ConditionalBranch {
    /// Condition polarity.
    pub sense: JumpSense,
    /// The evaluated condition.
    pub condition: Operation,
    /// Taken successor.
    pub target: BlockId,
}

/// The non-branch successor of a block.
#[derive(Debug, Clone)]
pub enum FallThrough {
    /// Unconditional continuation.
    Regular(BlockId),
    /// Control leaves the graph by throwing the given value.
    Throw(Box<Operation>),
}

/// One basic block.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Block identity.
    pub id: BlockId,
    /// Block classification.
    pub kind: BlockKind,
    /// Innermost region the block belongs to; `None` for entry/exit.
    pub region: Option<RegionId>,
    /// Statements in execution order.
    pub statements: Vec<Operation>,
    /// Conditional branch, evaluated after the statements.
    pub branch: Option<ConditionalBranch>,
    /// Fall-through successor; `None` only on the exit block.
    pub fall_through: Option<FallThrough>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId, kind: BlockKind, region: Option<RegionId>) -> Self {
        Self { id, kind, region, statements: Vec::new(), branch: None, fall_through: None }
    }

    /// Successor block ids, branch target first.
    pub fn successors(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        if let Some(branch) = &self.branch {
            out.push(branch.target);
        }
        if let Some(FallThrough::Regular(next)) = &self.fall_through {
            out.push(*next);
        }
        out
    }
}
