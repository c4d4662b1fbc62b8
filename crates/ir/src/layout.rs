//! Block and instruction ordering of a function body.
//!
//! The order kept here is the order every pass observes; diagnostics are
//! emitted in layout order.

use rustc_hash::FxHashMap;

use crate::{dfg::BlockId, inst::InstId};

#[derive(Debug, Default)]
pub struct Layout {
    block_order: Vec<BlockId>,
    inst_order: FxHashMap<BlockId, Vec<InstId>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_block(&mut self, block: BlockId) {
        debug_assert!(!self.block_order.contains(&block));
        self.block_order.push(block);
        self.inst_order.entry(block).or_default();
    }

    pub fn append_inst(&mut self, block: BlockId, inst: InstId) {
        self.inst_order.entry(block).or_default().push(inst);
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.block_order.first().copied()
    }

    pub fn iter_block(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.block_order.iter().copied()
    }

    pub fn iter_inst(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        self.inst_order
            .get(&block)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    pub fn block_count(&self) -> usize {
        self.block_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block_order.is_empty()
    }
}
