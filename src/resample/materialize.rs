//! Top-down tree materialization.
//!
//! Walks every coarse lattice cell, emitting one adaptive tree from its
//! multi-resolution grid: parents before children, measurement values and
//! subtree counts per node, and a mask bit wherever the sparse grid had no
//! entry.

use crate::grid::{GridElement, Lattice, MultiResGrid};
use crate::measure::MeasurementSet;
use crate::tree::{BitArray, CountArray, HyperTree, HyperTreeGrid, ScalarArray, TreeCursor};

pub(crate) struct Materializer<'a> {
    lattice: &'a Lattice,
    measures: &'a MeasurementSet,
    min: f64,
    max: f64,
    in_range: bool,
}

struct LeafOutputs<'a> {
    mask: &'a mut BitArray,
    measure: Option<&'a mut ScalarArray>,
    display: Option<&'a mut ScalarArray>,
    n_leaves: &'a mut CountArray,
    n_points: &'a mut CountArray,
}

impl<'a> Materializer<'a> {
    pub fn new(
        lattice: &'a Lattice,
        measures: &'a MeasurementSet,
        min: f64,
        max: f64,
        in_range: bool,
    ) -> Self {
        Self {
            lattice,
            measures,
            min,
            max,
            in_range,
        }
    }

    /// Emit every tree into `output`, assigning consecutive global indices
    pub fn generate(&self, output: &mut HyperTreeGrid, grids: &[MultiResGrid]) {
        let (trees, mask, measure, display, n_leaves, n_points) = output.outputs_mut();
        let mut out = LeafOutputs {
            mask,
            measure: measure.as_mut(),
            display: display.as_mut(),
            n_leaves,
            n_points,
        };

        let cell_dims = self.lattice.cell_dims();
        let mut offset = 0usize;
        for i in 0..cell_dims[0] {
            for j in 0..cell_dims[1] {
                for k in 0..cell_dims[2] {
                    let grid = &grids[self.lattice.tree_index(i, j, k)];
                    let mut tree = HyperTree::new(self.lattice.branch_factor());
                    tree.set_global_index_start(offset);
                    {
                        let mut cursor = TreeCursor::new(&mut tree);
                        self.subdivide_leaves(&mut cursor, grid, [0, 0, 0], &mut out);
                    }
                    offset += tree.n_vertices();
                    trees.push(tree);
                }
            }
        }
    }

    fn subdivide_leaves(
        &self,
        cursor: &mut TreeCursor,
        grid: &MultiResGrid,
        local: [usize; 3],
        out: &mut LeafOutputs,
    ) {
        let depth = cursor.level();
        let index = cursor.global_index();
        let entry = grid.get(depth, self.lattice.local_index(local, depth));

        // Entries without accumulated data (and absent entries) emit NaN;
        // a configured measurement that is absent from the entry reads 0.
        let (value, display_value) = match entry {
            Some(e) if e.has_data() => (
                self.measures
                    .measure_primary(&e.accumulators, e.n_points, e.weight)
                    .unwrap_or(0.0),
                self.measures
                    .measure_display(&e.accumulators, e.n_points, e.weight)
                    .unwrap_or(0.0),
            ),
            _ => (f64::NAN, f64::NAN),
        };

        if let Some(array) = out.measure.as_mut() {
            array.insert(index, value);
        }
        if let Some(array) = out.display.as_mut() {
            array.insert(index, display_value);
        }
        out.n_leaves.insert(index, entry.map_or(0, |e| e.n_leaves));
        out.n_points.insert(index, entry.map_or(0, |e| e.n_points));
        out.mask.set(index, entry.is_none());

        if !self.should_subdivide(depth, entry, value) {
            return;
        }

        cursor.subdivide_leaf();
        let bf = self.lattice.branch_factor();
        for child in 0..cursor.n_children() {
            let (ii, jj, kk) = (child % bf, (child / bf) % bf, child / (bf * bf));
            cursor.to_child(child);
            self.subdivide_leaves(
                cursor,
                grid,
                [local[0] * bf + ii, local[1] * bf + jj, local[2] * bf + kk],
                out,
            );
            cursor.to_parent();
        }
    }

    /// Subdivision gate: depth limit, data presence, a defined value,
    /// more than one populated leaf below, propagation consent, and the
    /// configured range predicate.
    fn should_subdivide(&self, depth: usize, entry: Option<&GridElement>, value: f64) -> bool {
        if depth >= self.lattice.max_depth() {
            return false;
        }
        let entry = match entry {
            Some(e) => e,
            None => return false,
        };
        if value.is_nan() || entry.n_leaves <= 1 || !entry.can_subdivide {
            return false;
        }
        self.range_allows(value)
    }

    fn range_allows(&self, value: f64) -> bool {
        if self.measures.primary().is_none() {
            return true;
        }
        let within = value > self.min && value < self.max;
        if self.in_range {
            within
        } else {
            !within
        }
    }
}
