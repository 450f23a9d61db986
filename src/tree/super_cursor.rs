//! Von-Neumann super-cursor over the assembled grid.
//!
//! Exposes the current node and its six axial neighbors at the same depth.
//! A neighbor region whose tree is not refined that deep resolves to the
//! leaf covering it; a region outside the lattice has no cursor.

use super::grid::HyperTreeGrid;

/// Offsets of the seven cursors; index 3 is the center
const STENCIL: [[i64; 3]; 7] = [
    [0, 0, -1],
    [0, -1, 0],
    [-1, 0, 0],
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
];

/// Cursor index of the center node
pub const CENTER_CURSOR: usize = 3;

/// Read-only cursor walking one tree while tracking axial neighbors
pub struct VonNeumannSuperCursor<'a> {
    grid: &'a HyperTreeGrid,
    tree_id: usize,
    tree_coords: [usize; 3],
    stack: Vec<(u32, [usize; 3])>,
}

impl<'a> VonNeumannSuperCursor<'a> {
    /// New cursor at the root of tree `tree_id`
    pub fn new(grid: &'a HyperTreeGrid, tree_id: usize) -> Self {
        Self {
            grid,
            tree_id,
            tree_coords: grid.tree_coords(tree_id),
            stack: vec![(0, [0, 0, 0])],
        }
    }

    pub fn n_cursors(&self) -> usize {
        STENCIL.len()
    }

    pub fn level(&self) -> usize {
        self.stack.len() - 1
    }

    fn position(&self) -> (u32, [usize; 3]) {
        *self.stack.last().expect("cursor stack never empty")
    }

    pub fn is_leaf(&self) -> bool {
        let (vertex, _) = self.position();
        self.grid.tree(self.tree_id).is_leaf(vertex)
    }

    pub fn n_children(&self) -> usize {
        self.grid.tree(self.tree_id).n_children()
    }

    /// Descend the center into child `i` (x-fastest canonical order)
    pub fn to_child(&mut self, i: usize) {
        let bf = self.grid.branch_factor();
        let (vertex, local) = self.position();
        let child = self.grid.tree(self.tree_id).child(vertex, i);
        let digits = [i % bf, (i / bf) % bf, i / (bf * bf)];
        let child_local = [
            local[0] * bf + digits[0],
            local[1] * bf + digits[1],
            local[2] * bf + digits[2],
        ];
        self.stack.push((child, child_local));
    }

    pub fn to_parent(&mut self) {
        debug_assert!(self.stack.len() > 1);
        self.stack.pop();
    }

    /// Global node index under cursor `cursor`, or None outside the lattice
    pub fn global_node_index(&self, cursor: usize) -> Option<usize> {
        let (vertex, local) = self.position();
        if cursor == CENTER_CURSOR {
            return Some(self.grid.tree(self.tree_id).global_index_from_local(vertex));
        }

        let depth = self.level();
        let bf = self.grid.branch_factor();
        let r = bf.pow(depth as u32) as i64;
        let cell_dims = self.grid.cell_dims();
        let offset = STENCIL[cursor];

        let mut neighbor_tree = [0usize; 3];
        let mut neighbor_local = [0usize; 3];
        for axis in 0..3 {
            let g = (self.tree_coords[axis] as i64) * r + local[axis] as i64 + offset[axis];
            if g < 0 || g >= cell_dims[axis] as i64 * r {
                return None;
            }
            neighbor_tree[axis] = (g / r) as usize;
            neighbor_local[axis] = (g % r) as usize;
        }

        let tree = self.grid.tree(self.grid.tree_index(
            neighbor_tree[0],
            neighbor_tree[1],
            neighbor_tree[2],
        ));
        let (neighbor_vertex, _) = tree.node_at(neighbor_local, depth);
        Some(tree.global_index_from_local(neighbor_vertex))
    }

    /// Mask bit of cursor `cursor`; regions outside the lattice read masked
    pub fn is_masked(&self, cursor: usize) -> bool {
        self.global_node_index(cursor)
            .map_or(true, |id| self.grid.is_masked(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::grid::HyperTree;

    /// 2x1x1 lattice of depth-1 trees over branch factor 2.
    fn two_tree_grid() -> HyperTreeGrid {
        let mut grid = HyperTreeGrid::new([3, 2, 2], 2);
        let mut offset = 0;
        for _ in 0..2 {
            let mut tree = HyperTree::new(2);
            tree.set_global_index_start(offset);
            tree.subdivide_leaf(0);
            offset += tree.n_vertices();
            grid.push_tree(tree);
        }
        grid
    }

    #[test]
    fn test_neighbors_within_tree() {
        let grid = two_tree_grid();
        let mut cursor = VonNeumannSuperCursor::new(&grid, 0);
        cursor.to_child(0); // local (0, 0, 0) at depth 1

        // Center is vertex 1 of tree 0.
        assert_eq!(cursor.global_node_index(CENTER_CURSOR), Some(1));
        // +x neighbor is local (1, 0, 0) = child 1 = vertex 2.
        assert_eq!(cursor.global_node_index(4), Some(2));
        // -x, -y, -z fall off the lattice.
        assert_eq!(cursor.global_node_index(2), None);
        assert_eq!(cursor.global_node_index(1), None);
        assert_eq!(cursor.global_node_index(0), None);
    }

    #[test]
    fn test_neighbor_across_trees() {
        let grid = two_tree_grid();
        let mut cursor = VonNeumannSuperCursor::new(&grid, 0);
        cursor.to_child(1); // local (1, 0, 0) at depth 1

        // +x neighbor crosses into tree 1, local (0, 0, 0) = vertex 1,
        // global 9 + 1.
        assert_eq!(cursor.global_node_index(4), Some(10));
    }

    #[test]
    fn test_coarser_neighbor_resolves_to_leaf() {
        let mut grid = HyperTreeGrid::new([3, 2, 2], 2);
        let mut left = HyperTree::new(2);
        left.subdivide_leaf(0);
        grid.push_tree(left);
        let mut right = HyperTree::new(2);
        right.set_global_index_start(9);
        grid.push_tree(right); // stays a single leaf
        let cursor = {
            let mut c = VonNeumannSuperCursor::new(&grid, 0);
            c.to_child(1);
            c
        };
        // The +x neighbor region lies in the unrefined tree 1: its root.
        assert_eq!(cursor.global_node_index(4), Some(9));
    }
}
