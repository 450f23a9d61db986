//! Hyper tree grid container.
//!
//! One flat node arena per tree (root at index 0, children of a subdivided
//! node stored consecutively), a coarse rectilinear lattice of trees with
//! uniform coordinate arrays, per-node output arrays, and the leaf mask.

use crate::math::Aabb;

use super::bitarray::BitArray;
use super::data::{CountArray, ScalarArray};

/// Sentinel for "no node"
pub const INVALID_INDEX: u32 = u32::MAX;

/// One node of a hyper tree
#[derive(Clone, Copy, Debug)]
pub struct TreeNode {
    /// Parent vertex, INVALID_INDEX for the root
    pub parent: u32,
    /// First of `branch_factor³` consecutive children, INVALID_INDEX for leaves
    pub first_child: u32,
}

impl TreeNode {
    pub fn leaf(parent: u32) -> Self {
        Self {
            parent,
            first_child: INVALID_INDEX,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.first_child == INVALID_INDEX
    }
}

/// One adaptive tree rooted at a coarse lattice cell
#[derive(Clone, Debug)]
pub struct HyperTree {
    branch_factor: usize,
    global_index_start: usize,
    nodes: Vec<TreeNode>,
}

impl HyperTree {
    pub fn new(branch_factor: usize) -> Self {
        Self {
            branch_factor,
            global_index_start: 0,
            nodes: vec![TreeNode::leaf(INVALID_INDEX)],
        }
    }

    pub fn branch_factor(&self) -> usize {
        self.branch_factor
    }

    /// Children per subdivided node (`branch_factor³`)
    pub fn n_children(&self) -> usize {
        self.branch_factor * self.branch_factor * self.branch_factor
    }

    pub fn n_vertices(&self) -> usize {
        self.nodes.len()
    }

    pub fn set_global_index_start(&mut self, start: usize) {
        self.global_index_start = start;
    }

    pub fn global_index_start(&self) -> usize {
        self.global_index_start
    }

    /// Global node index of a local vertex
    pub fn global_index_from_local(&self, vertex: u32) -> usize {
        self.global_index_start + vertex as usize
    }

    pub fn node(&self, vertex: u32) -> &TreeNode {
        &self.nodes[vertex as usize]
    }

    pub fn is_leaf(&self, vertex: u32) -> bool {
        self.nodes[vertex as usize].is_leaf()
    }

    /// Append `branch_factor³` children to a leaf; returns the first child
    pub fn subdivide_leaf(&mut self, vertex: u32) -> u32 {
        debug_assert!(self.is_leaf(vertex));
        let first = self.nodes.len() as u32;
        self.nodes[vertex as usize].first_child = first;
        for _ in 0..self.n_children() {
            self.nodes.push(TreeNode::leaf(vertex));
        }
        first
    }

    /// Child `i` of a subdivided node (x-fastest canonical order)
    pub fn child(&self, vertex: u32, i: usize) -> u32 {
        debug_assert!(i < self.n_children());
        self.nodes[vertex as usize].first_child + i as u32
    }

    pub fn parent(&self, vertex: u32) -> Option<u32> {
        let p = self.nodes[vertex as usize].parent;
        (p != INVALID_INDEX).then_some(p)
    }

    /// Descend from the root toward intra-tree coordinates `local` at
    /// `depth`, stopping at the deepest existing node; returns the vertex
    /// and the depth actually reached.
    pub fn node_at(&self, local: [usize; 3], depth: usize) -> (u32, usize) {
        let bf = self.branch_factor;
        let mut vertex = 0u32;
        for level in 0..depth {
            if self.is_leaf(vertex) {
                return (vertex, level);
            }
            let shift = bf.pow((depth - 1 - level) as u32);
            let ci = (local[0] / shift) % bf;
            let cj = (local[1] / shift) % bf;
            let ck = (local[2] / shift) % bf;
            let child = ci + cj * bf + ck * bf * bf;
            vertex = self.child(vertex, child);
        }
        (vertex, depth)
    }
}

/// The assembled output: trees, lattice geometry, leaf data, and mask
#[derive(Debug)]
pub struct HyperTreeGrid {
    dimensions: [usize; 3],
    cell_dims: [usize; 3],
    branch_factor: usize,
    x_coordinates: Vec<f64>,
    y_coordinates: Vec<f64>,
    z_coordinates: Vec<f64>,
    trees: Vec<HyperTree>,
    mask: BitArray,
    measure: Option<ScalarArray>,
    display: Option<ScalarArray>,
    n_leaves: CountArray,
    n_points: CountArray,
}

impl HyperTreeGrid {
    pub fn new(dimensions: [usize; 3], branch_factor: usize) -> Self {
        Self {
            dimensions,
            cell_dims: [
                dimensions[0].saturating_sub(1),
                dimensions[1].saturating_sub(1),
                dimensions[2].saturating_sub(1),
            ],
            branch_factor,
            x_coordinates: Vec::new(),
            y_coordinates: Vec::new(),
            z_coordinates: Vec::new(),
            trees: Vec::new(),
            mask: BitArray::new(),
            measure: None,
            display: None,
            n_leaves: CountArray::new("Number of leaves"),
            n_points: CountArray::new("Number of points"),
        }
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn cell_dims(&self) -> [usize; 3] {
        self.cell_dims
    }

    pub fn branch_factor(&self) -> usize {
        self.branch_factor
    }

    /// Uniform vertex coordinates spanning `bounds` per axis
    pub fn set_uniform_coordinates(&mut self, bounds: &Aabb) {
        for axis in 0..3 {
            let n = self.dimensions[axis];
            let step = if n > 1 {
                (bounds.max[axis] - bounds.min[axis]) / (n - 1) as f64
            } else {
                0.0
            };
            let coords = (0..n).map(|i| bounds.min[axis] + step * i as f64).collect();
            match axis {
                0 => self.x_coordinates = coords,
                1 => self.y_coordinates = coords,
                _ => self.z_coordinates = coords,
            }
        }
    }

    pub fn x_coordinates(&self) -> &[f64] {
        &self.x_coordinates
    }

    pub fn y_coordinates(&self) -> &[f64] {
        &self.y_coordinates
    }

    pub fn z_coordinates(&self) -> &[f64] {
        &self.z_coordinates
    }

    /// Pack lattice coordinates into a tree index
    pub fn tree_index(&self, i: usize, j: usize, k: usize) -> usize {
        k + j * self.cell_dims[2] + i * self.cell_dims[1] * self.cell_dims[2]
    }

    /// Inverse of [`HyperTreeGrid::tree_index`]
    pub fn tree_coords(&self, index: usize) -> [usize; 3] {
        [
            index / (self.cell_dims[1] * self.cell_dims[2]),
            (index / self.cell_dims[2]) % self.cell_dims[1],
            index % self.cell_dims[2],
        ]
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn tree(&self, index: usize) -> &HyperTree {
        &self.trees[index]
    }

    pub fn push_tree(&mut self, tree: HyperTree) {
        self.trees.push(tree);
    }

    /// Total vertex count over all trees
    pub fn n_vertices(&self) -> usize {
        self.trees.iter().map(|t| t.n_vertices()).sum()
    }

    pub fn mask(&self) -> &BitArray {
        &self.mask
    }

    pub fn is_masked(&self, global_index: usize) -> bool {
        self.mask.get(global_index)
    }

    pub fn measure(&self) -> Option<&ScalarArray> {
        self.measure.as_ref()
    }

    pub fn display(&self) -> Option<&ScalarArray> {
        self.display.as_ref()
    }

    pub fn n_leaves_array(&self) -> &CountArray {
        &self.n_leaves
    }

    pub fn n_points_array(&self) -> &CountArray {
        &self.n_points
    }

    /// Mutable access for the materializer and extrapolator
    pub(crate) fn outputs_mut(
        &mut self,
    ) -> (
        &mut Vec<HyperTree>,
        &mut BitArray,
        &mut Option<ScalarArray>,
        &mut Option<ScalarArray>,
        &mut CountArray,
        &mut CountArray,
    ) {
        (
            &mut self.trees,
            &mut self.mask,
            &mut self.measure,
            &mut self.display,
            &mut self.n_leaves,
            &mut self.n_points,
        )
    }

    pub(crate) fn set_measure_array(&mut self, array: ScalarArray) {
        self.measure = Some(array);
    }

    pub(crate) fn set_display_array(&mut self, array: ScalarArray) {
        self.display = Some(array);
    }

    pub(crate) fn measure_mut(&mut self) -> Option<&mut ScalarArray> {
        self.measure.as_mut()
    }

    pub(crate) fn display_mut(&mut self) -> Option<&mut ScalarArray> {
        self.display.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DVec3;

    #[test]
    fn test_subdivide() {
        let mut tree = HyperTree::new(2);
        assert_eq!(tree.n_vertices(), 1);
        assert!(tree.is_leaf(0));
        let first = tree.subdivide_leaf(0);
        assert_eq!(first, 1);
        assert_eq!(tree.n_vertices(), 9);
        assert!(!tree.is_leaf(0));
        assert_eq!(tree.child(0, 7), 8);
        assert_eq!(tree.parent(3), Some(0));
        assert_eq!(tree.parent(0), None);
    }

    #[test]
    fn test_node_at_descends() {
        let mut tree = HyperTree::new(2);
        tree.subdivide_leaf(0);
        // Subdivide child (1, 0, 0) = child index 1.
        let v = tree.child(0, 1);
        tree.subdivide_leaf(v);

        // Coordinates (2, 0, 0) at depth 2 live under child (1, 0, 0).
        let (vertex, depth) = tree.node_at([2, 0, 0], 2);
        assert_eq!(depth, 2);
        assert_eq!(tree.parent(vertex), Some(v));

        // Coordinates under an unsubdivided child stop at depth 1.
        let (vertex, depth) = tree.node_at([0, 2, 0], 2);
        assert_eq!(depth, 1);
        assert_eq!(vertex, tree.child(0, 2));
    }

    #[test]
    fn test_uniform_coordinates() {
        let mut grid = HyperTreeGrid::new([3, 2, 2], 2);
        grid.set_uniform_coordinates(&Aabb::new(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0)));
        assert_eq!(grid.x_coordinates(), &[0.0, 1.0, 2.0]);
        assert_eq!(grid.y_coordinates(), &[0.0, 1.0]);
        assert_eq!(grid.cell_dims(), [2, 1, 1]);
    }
}
