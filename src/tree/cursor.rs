//! Non-oriented cursor over one hyper tree

use super::grid::HyperTree;

/// Mutable depth-first cursor used while materializing a tree
pub struct TreeCursor<'a> {
    tree: &'a mut HyperTree,
    stack: Vec<u32>,
}

impl<'a> TreeCursor<'a> {
    /// New cursor positioned at the root
    pub fn new(tree: &'a mut HyperTree) -> Self {
        Self {
            tree,
            stack: vec![0],
        }
    }

    pub fn level(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn vertex_id(&self) -> u32 {
        *self.stack.last().expect("cursor stack never empty")
    }

    pub fn global_index(&self) -> usize {
        self.tree.global_index_from_local(self.vertex_id())
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.is_leaf(self.vertex_id())
    }

    pub fn n_children(&self) -> usize {
        self.tree.n_children()
    }

    /// Turn the current leaf into an internal node
    pub fn subdivide_leaf(&mut self) {
        let vertex = self.vertex_id();
        self.tree.subdivide_leaf(vertex);
    }

    /// Descend into child `i` (x-fastest canonical order)
    pub fn to_child(&mut self, i: usize) {
        let child = self.tree.child(self.vertex_id(), i);
        self.stack.push(child);
    }

    pub fn to_parent(&mut self) {
        debug_assert!(self.stack.len() > 1);
        self.stack.pop();
    }
}
