//! Control-flow graph
//!
//! One graph per lowered initializer expression: an entry block, an exit
//! block, the lowered statement blocks between them, and the region arena
//! that scopes flow captures and declared locals.

mod block;
mod builder;
mod region;

pub use block::{BasicBlock, BlockId, BlockKind, ConditionalBranch, FallThrough, JumpSense};
pub use builder::FlowBuilder;
pub use region::{CaptureId, CaptureTable, Region, RegionId};

/// The lowered control-flow graph of one initializer expression.
#[derive(Debug)]
pub struct FlowGraph {
    /// Blocks in id order; `B0` is the entry, the last block is the exit.
    pub blocks: Vec<BasicBlock>,
    /// Region arena; indices are [`RegionId`]s.
    pub regions: Vec<Region>,
}

impl FlowGraph {
    /// The entry block.
    pub fn entry(&self) -> &BasicBlock {
        &self.blocks[0]
    }

    /// The exit block.
    pub fn exit(&self) -> &BasicBlock {
        self.blocks.last().expect("graph has no blocks")
    }

    /// Predecessors of a block, derived from successor edges, in id order.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.successors().contains(&id))
            .map(|b| b.id)
            .collect()
    }

    /// The chain of regions containing a block, outermost first.
    pub fn region_chain(&self, block: &BasicBlock) -> Vec<RegionId> {
        let mut chain = Vec::new();
        let mut current = block.region;
        while let Some(id) = current {
            chain.push(id);
            current = self.regions[id.index()].parent;
        }
        chain.reverse();
        chain
    }
}
