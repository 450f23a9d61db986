//! Gap and geometry analysis over the multi-resolution grids.
//!
//! Walks every input cell through the grid positions its bounds overlap.
//! Where a position is absent from the sparse map, the box center is
//! tested against the cell: in extrapolation mode an empty marker element
//! is created for later filling; in no-empty-cells mode the parent is
//! forbidden to subdivide, so geometry never hides behind a masked leaf.

use crate::data::{Cell, DataSet};
use crate::math::Aabb;

use super::element::GridElement;
use super::lattice::Lattice;
use super::multires::MultiResGrid;

pub struct GapAnalyzer<'a> {
    lattice: &'a Lattice,
}

impl<'a> GapAnalyzer<'a> {
    pub fn new(lattice: &'a Lattice) -> Self {
        Self { lattice }
    }

    /// Run the pass over every input cell.
    ///
    /// `mark_empty` selects extrapolation mode (create empty markers)
    /// over no-empty-cells mode (clear `can_subdivide`).
    pub fn analyze(&self, grids: &mut [MultiResGrid], dataset: &DataSet, mark_empty: bool) {
        for ci in 0..dataset.n_cells() {
            let cell = dataset.cell(ci);
            let cb = cell.bounds();
            let range = self.lattice.tree_range(&cb);
            for i in range[0].0..=range[0].1 {
                for j in range[1].0..=range[1].1 {
                    for k in range[2].0..=range[2].1 {
                        let tree = self.lattice.tree_index(i, j, k);
                        self.visit(
                            &mut grids[tree],
                            cell,
                            &cb,
                            [i, j, k],
                            0,
                            [0, 0, 0],
                            mark_empty,
                        );
                    }
                }
            }
        }
    }

    /// Returns whether the cell's geometry reaches this grid position.
    fn visit(
        &self,
        grid: &mut MultiResGrid,
        cell: &Cell,
        cb: &Aabb,
        tree: [usize; 3],
        depth: usize,
        local: [usize; 3],
        mark_empty: bool,
    ) -> bool {
        debug_assert!(depth <= self.lattice.max_depth());
        let index = self.lattice.local_index(local, depth);

        let state = grid
            .get(depth, index)
            .map(|e| (e.can_subdivide, e.n_unmasked_children, e.children_fully_populated));

        let (can_subdivide, n_unmasked, fully_populated) = match state {
            None => {
                let center = self.lattice.node_center(tree, local, depth);
                let inside = cell.evaluate_position(center);
                if mark_empty && inside {
                    grid.level_mut(depth).insert(index, GridElement::default());
                }
                return inside;
            }
            Some(s) => s,
        };

        if depth == self.lattice.max_depth()
            || !can_subdivide
            || (n_unmasked == self.lattice.n_children() && fully_populated)
        {
            return true;
        }

        let bf = self.lattice.branch_factor();
        let mut allowed = true;
        for ii in 0..bf {
            for jj in 0..bf {
                for kk in 0..bf {
                    let child = [
                        local[0] * bf + ii,
                        local[1] * bf + jj,
                        local[2] * bf + kk,
                    ];
                    let child_bounds = self.lattice.node_bounds(tree, child, depth + 1);
                    if !child_bounds.intersects(cb) {
                        continue;
                    }
                    let reached = self.visit(grid, cell, cb, tree, depth + 1, child, mark_empty);
                    if !mark_empty {
                        allowed &= reached;
                    }
                }
            }
        }
        if !mark_empty && !allowed {
            if let Some(entry) = grid.level_mut(depth).get_mut(&index) {
                entry.can_subdivide = false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DVec3;
    use crate::data::{DataSet, FieldAssociation, ScalarAttribute};
    use crate::grid::builder::GridBuilder;
    use crate::measure::{Measurement, MeasurementSet};

    /// One tree, depth 1: points populate seven octants, a voxel cell
    /// covers the whole domain including the empty octant.
    fn sparse_setup() -> (Lattice, Vec<MultiResGrid>, DataSet) {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let lattice = Lattice::new(bounds, [1, 1, 1], 2, 1);
        let measures = MeasurementSet::new(Some(Measurement::ArithmeticMean), None);
        let mut builder = GridBuilder::new(&lattice, &measures, 1);

        // Octant (1, 1, 1) stays empty.
        let mut points = Vec::new();
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    if (i, j, k) == (1, 1, 1) {
                        continue;
                    }
                    points.push(DVec3::new(
                        0.25 + 0.5 * i as f64,
                        0.25 + 0.5 * j as f64,
                        0.25 + 0.5 * k as f64,
                    ));
                }
            }
        }
        let n = points.len();
        let dataset = DataSet::from_points(points);
        let attribute = ScalarAttribute::new("v", FieldAssociation::Points, vec![1.0; n]);
        let grids = builder.build(&dataset, &attribute);

        let geometry =
            DataSet::from_cells(vec![Cell::Voxel(bounds)]).with_bounds(bounds);
        (lattice, grids, geometry)
    }

    #[test]
    fn test_mark_empty_creates_marker() {
        let (lattice, mut grids, geometry) = sparse_setup();
        assert_eq!(grids[0].level(1).len(), 7);

        GapAnalyzer::new(&lattice).analyze(&mut grids, &geometry, true);

        let index = lattice.local_index([1, 1, 1], 1);
        let marker = grids[0].get(1, index).expect("marker created");
        assert!(!marker.has_data());
        assert_eq!(grids[0].level(1).len(), 8);
    }

    #[test]
    fn test_no_empty_cells_forbids_subdivision() {
        let (lattice, mut grids, _) = sparse_setup();
        assert!(grids[0].get(0, 0).unwrap().can_subdivide);

        // The cell's bounds overlap the empty octant but its geometry does
        // not reach the octant center, so a masked leaf would appear there
        // if the root were subdivided.
        let geometry = DataSet::from_cells(vec![Cell::Voxel(Aabb::new(
            DVec3::ZERO,
            DVec3::splat(0.6),
        ))])
        .with_bounds(Aabb::new(DVec3::ZERO, DVec3::ONE));
        GapAnalyzer::new(&lattice).analyze(&mut grids, &geometry, false);

        assert!(!grids[0].get(0, 0).unwrap().can_subdivide);
        assert_eq!(grids[0].level(1).len(), 7, "no markers in this mode");
    }

    #[test]
    fn test_geometry_through_empty_child_keeps_subdivision() {
        let (lattice, mut grids, geometry) = sparse_setup();

        // The whole-domain voxel passes through the empty octant's center,
        // so the data octants still justify subdividing the root.
        GapAnalyzer::new(&lattice).analyze(&mut grids, &geometry, false);

        assert!(grids[0].get(0, 0).unwrap().can_subdivide);
    }
}
