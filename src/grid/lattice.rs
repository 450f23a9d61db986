//! Coarse lattice and multi-resolution coordinate algebra.
//!
//! The input bounds are tiled by `cell_dims` trees per axis; inside a tree,
//! depth `d` refines each axis into `branch_factor^d` slots. All index
//! packing used by the sparse grids and the output container lives here.

use crate::core::types::DVec3;
use crate::math::Aabb;

/// Geometry and indexing of the coarse lattice of trees
#[derive(Clone, Debug)]
pub struct Lattice {
    bounds: Aabb,
    cell_dims: [usize; 3],
    branch_factor: usize,
    max_depth: usize,
    resolution_per_tree: Vec<usize>,
}

impl Lattice {
    pub fn new(
        bounds: Aabb,
        cell_dims: [usize; 3],
        branch_factor: usize,
        max_depth: usize,
    ) -> Self {
        let mut resolution_per_tree = vec![1usize; max_depth + 1];
        for depth in 1..=max_depth {
            resolution_per_tree[depth] = resolution_per_tree[depth - 1] * branch_factor;
        }
        Self {
            bounds,
            cell_dims,
            branch_factor,
            max_depth,
            resolution_per_tree,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn cell_dims(&self) -> [usize; 3] {
        self.cell_dims
    }

    pub fn branch_factor(&self) -> usize {
        self.branch_factor
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of coarse lattice cells (trees)
    pub fn n_trees(&self) -> usize {
        self.cell_dims[0] * self.cell_dims[1] * self.cell_dims[2]
    }

    /// Children per non-leaf node (`branch_factor³`)
    pub fn n_children(&self) -> usize {
        self.branch_factor * self.branch_factor * self.branch_factor
    }

    /// Intra-tree resolution per axis at `depth`
    pub fn resolution(&self, depth: usize) -> usize {
        self.resolution_per_tree[depth]
    }

    /// Intra-tree resolution at the finest depth
    pub fn max_resolution(&self) -> usize {
        self.resolution_per_tree[self.max_depth]
    }

    /// Pack lattice coordinates into a tree index
    pub fn tree_index(&self, i: usize, j: usize, k: usize) -> usize {
        k + j * self.cell_dims[2] + i * self.cell_dims[1] * self.cell_dims[2]
    }

    /// Inverse of [`Lattice::tree_index`]
    pub fn tree_coords(&self, index: usize) -> [usize; 3] {
        [
            index / (self.cell_dims[1] * self.cell_dims[2]),
            (index / self.cell_dims[2]) % self.cell_dims[1],
            index % self.cell_dims[2],
        ]
    }

    /// Pack intra-tree coordinates at `depth` into a local index
    pub fn local_index(&self, local: [usize; 3], depth: usize) -> u64 {
        let r = self.resolution_per_tree[depth] as u64;
        local[2] as u64 + local[1] as u64 * r + local[0] as u64 * r * r
    }

    /// Inverse of [`Lattice::local_index`]
    pub fn local_coords(&self, index: u64, depth: usize) -> [usize; 3] {
        let r = self.resolution_per_tree[depth] as u64;
        [
            (index / (r * r)) as usize,
            ((index / r) % r) as usize,
            (index % r) as usize,
        ]
    }

    fn axis_min(&self, axis: usize) -> f64 {
        self.bounds.min[axis]
    }

    fn axis_extent(&self, axis: usize) -> f64 {
        self.bounds.max[axis] - self.bounds.min[axis]
    }

    fn axis_cell(&self, axis: usize, x: f64, slots: usize, shrink: bool) -> usize {
        let extent = self.axis_extent(axis);
        if extent <= 0.0 {
            return 0;
        }
        let t = (x - self.axis_min(axis)) / extent * slots as f64;
        let t = if shrink { t * (1.0 - f64::EPSILON) } else { t };
        (t as usize).min(slots - 1)
    }

    /// Global finest-resolution cell containing a point.
    ///
    /// The upper domain boundary maps into the last cell.
    pub fn finest_cell_of_point(&self, p: DVec3) -> [usize; 3] {
        let r = self.max_resolution();
        [
            self.axis_cell(0, p.x, self.cell_dims[0] * r, true),
            self.axis_cell(1, p.y, self.cell_dims[1] * r, true),
            self.axis_cell(2, p.z, self.cell_dims[2] * r, true),
        ]
    }

    /// Split global depth-`depth` coordinates into (tree index, local coords)
    pub fn split_global(&self, global: [usize; 3], depth: usize) -> (usize, [usize; 3]) {
        let r = self.resolution_per_tree[depth];
        let tree = self.tree_index(global[0] / r, global[1] / r, global[2] / r);
        (tree, [global[0] % r, global[1] % r, global[2] % r])
    }

    /// Inclusive global cell index range covered by `cb` at `depth`
    pub fn cell_range_at_depth(&self, cb: &Aabb, depth: usize) -> [(usize, usize); 3] {
        let r = self.resolution_per_tree[depth];
        let mut range = [(0usize, 0usize); 3];
        for axis in 0..3 {
            let slots = self.cell_dims[axis] * r;
            let lo = self.axis_cell(axis, cb.min[axis], slots, false);
            let hi = self.axis_cell(axis, cb.max[axis], slots, true);
            range[axis] = (lo, hi.max(lo));
        }
        range
    }

    /// Inclusive lattice cell range covered by `cb`
    pub fn tree_range(&self, cb: &Aabb) -> [(usize, usize); 3] {
        self.cell_range_at_depth(cb, 0)
    }

    /// Box of the node at (tree, local, depth)
    pub fn node_bounds(&self, tree: [usize; 3], local: [usize; 3], depth: usize) -> Aabb {
        let r = self.resolution_per_tree[depth];
        let mut min = DVec3::ZERO;
        let mut max = DVec3::ZERO;
        for axis in 0..3 {
            let slots = (self.cell_dims[axis] * r) as f64;
            let g = (tree[axis] * r + local[axis]) as f64;
            let extent = self.axis_extent(axis);
            min[axis] = self.axis_min(axis) + g / slots * extent;
            max[axis] = self.axis_min(axis) + (g + 1.0) / slots * extent;
        }
        Aabb::new(min, max)
    }

    /// Center of the node at (tree, local, depth)
    pub fn node_center(&self, tree: [usize; 3], local: [usize; 3], depth: usize) -> DVec3 {
        let r = self.resolution_per_tree[depth];
        let mut center = DVec3::ZERO;
        for axis in 0..3 {
            let slots = (self.cell_dims[axis] * r) as f64;
            let g = (tree[axis] * r + local[axis]) as f64;
            center[axis] = self.axis_min(axis) + (g + 0.5) / slots * self.axis_extent(axis);
        }
        center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> Lattice {
        Lattice::new(
            Aabb::new(DVec3::ZERO, DVec3::splat(2.0)),
            [2, 2, 2],
            2,
            2,
        )
    }

    #[test]
    fn test_resolutions() {
        let l = lattice();
        assert_eq!(l.resolution(0), 1);
        assert_eq!(l.resolution(1), 2);
        assert_eq!(l.max_resolution(), 4);
        assert_eq!(l.n_children(), 8);
        assert_eq!(l.n_trees(), 8);
    }

    #[test]
    fn test_tree_index_roundtrip() {
        let l = lattice();
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    let idx = l.tree_index(i, j, k);
                    assert_eq!(l.tree_coords(idx), [i, j, k]);
                }
            }
        }
    }

    #[test]
    fn test_local_index_roundtrip() {
        let l = lattice();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    let idx = l.local_index([i, j, k], 2);
                    assert_eq!(l.local_coords(idx, 2), [i, j, k]);
                }
            }
        }
    }

    #[test]
    fn test_point_mapping() {
        let l = lattice();
        // Domain [0, 2]^3, 8 finest cells per axis: cell width 0.25.
        assert_eq!(l.finest_cell_of_point(DVec3::splat(0.1)), [0, 0, 0]);
        assert_eq!(l.finest_cell_of_point(DVec3::splat(1.99)), [7, 7, 7]);
        // The upper boundary maps into the last cell.
        assert_eq!(l.finest_cell_of_point(DVec3::splat(2.0)), [7, 7, 7]);
    }

    #[test]
    fn test_split_global() {
        let l = lattice();
        let (tree, local) = l.split_global([5, 2, 7], 2);
        assert_eq!(tree, l.tree_index(1, 0, 1));
        assert_eq!(local, [1, 2, 3]);
    }

    #[test]
    fn test_node_bounds() {
        let l = lattice();
        let b = l.node_bounds([0, 0, 0], [0, 0, 0], 0);
        assert_eq!(b.min, DVec3::ZERO);
        assert_eq!(b.max, DVec3::ONE);
        let c = l.node_bounds([1, 1, 1], [1, 1, 1], 1);
        assert_eq!(c.min, DVec3::splat(1.5));
        assert_eq!(c.max, DVec3::splat(2.0));
    }
}
