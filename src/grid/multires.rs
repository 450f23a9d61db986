//! Per-tree sparse multi-resolution grid

use std::collections::HashMap;

use super::element::GridElement;

/// Sparse map from packed local index to grid element, one per depth
pub type SparseLevel = HashMap<u64, GridElement>;

/// The sparse multi-resolution grid of one tree: one level per depth in
/// `0..=max_depth`, keyed by packed intra-tree coordinates.
#[derive(Clone, Debug)]
pub struct MultiResGrid {
    levels: Vec<SparseLevel>,
}

impl MultiResGrid {
    pub fn new(max_depth: usize) -> Self {
        Self {
            levels: vec![SparseLevel::new(); max_depth + 1],
        }
    }

    pub fn level(&self, depth: usize) -> &SparseLevel {
        &self.levels[depth]
    }

    pub fn level_mut(&mut self, depth: usize) -> &mut SparseLevel {
        &mut self.levels[depth]
    }

    pub fn get(&self, depth: usize, index: u64) -> Option<&GridElement> {
        self.levels[depth].get(&index)
    }

    /// Split borrows of a parent level and its child level
    pub fn parent_child_mut(&mut self, depth: usize) -> (&mut SparseLevel, &SparseLevel) {
        let (lower, upper) = self.levels.split_at_mut(depth);
        (&mut lower[depth - 1], &upper[0])
    }

    /// Total number of stored elements over all depths
    pub fn n_elements(&self) -> usize {
        self.levels.iter().map(|l| l.len()).sum()
    }
}
