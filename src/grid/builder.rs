//! Seeding and bottom-up propagation of the multi-resolution grids

use std::collections::hash_map::Entry;

use crate::core::types::DVec3;
use crate::data::{Cell, DataSet, FieldAssociation, ScalarAttribute};
use crate::geometry::{polyhedron_box_volume, voxel_box_volume, SNAP_TOLERANCE};
use crate::math::Aabb;
use crate::measure::MeasurementSet;

use super::element::GridElement;
use super::lattice::Lattice;
use super::multires::MultiResGrid;

/// Builds one sparse multi-resolution grid per lattice cell from the input
/// samples, then propagates aggregates bottom-up.
pub struct GridBuilder<'a> {
    lattice: &'a Lattice,
    measures: &'a MeasurementSet,
    min_points: i64,
    snap_tolerance: f64,
    scratch: Vec<DVec3>,
}

impl<'a> GridBuilder<'a> {
    pub fn new(lattice: &'a Lattice, measures: &'a MeasurementSet, min_points: i64) -> Self {
        Self {
            lattice,
            measures,
            min_points,
            snap_tolerance: SNAP_TOLERANCE,
            scratch: Vec::new(),
        }
    }

    /// Override the geometry kernel's box snap tolerance
    pub fn with_snap_tolerance(mut self, tolerance: f64) -> Self {
        self.snap_tolerance = tolerance;
        self
    }

    /// Seed the grids from the input and propagate every level upward
    pub fn build(&mut self, dataset: &DataSet, attribute: &ScalarAttribute) -> Vec<MultiResGrid> {
        let mut grids: Vec<MultiResGrid> = (0..self.lattice.n_trees())
            .map(|_| MultiResGrid::new(self.lattice.max_depth()))
            .collect();

        match attribute.association() {
            FieldAssociation::Points => self.seed_points(&mut grids, dataset, attribute),
            FieldAssociation::Cells => self.seed_cells(&mut grids, dataset, attribute),
        }
        self.propagate(&mut grids);
        grids
    }

    /// Each point lands in its finest-resolution cell with unit weight
    fn seed_points(
        &self,
        grids: &mut [MultiResGrid],
        dataset: &DataSet,
        attribute: &ScalarAttribute,
    ) {
        let depth = self.lattice.max_depth();
        for i in 0..dataset.n_points() {
            let global = self.lattice.finest_cell_of_point(dataset.point(i));
            let (tree, local) = self.lattice.split_global(global, depth);
            let index = self.lattice.local_index(local, depth);
            let value = attribute.value(i);
            match grids[tree].level_mut(depth).entry(index) {
                Entry::Occupied(entry) => entry.into_mut().absorb(value, 1.0),
                Entry::Vacant(entry) => {
                    entry.insert(GridElement::seed(self.measures.prototypes(), value, 1.0));
                }
            }
        }
    }

    /// Each cell is placed at its shallowest multi-cell depth and weighted
    /// by intersected volume over every box it overlaps.
    fn seed_cells(
        &mut self,
        grids: &mut [MultiResGrid],
        dataset: &DataSet,
        attribute: &ScalarAttribute,
    ) {
        self.scratch.reserve(dataset.max_cell_points());
        let volume_unit = 1.0;

        for ci in 0..dataset.n_cells() {
            let cell = dataset.cell(ci);
            let value = attribute.value(ci);
            let cb = cell.bounds();
            let depth = self.placement_depth(&cb);
            let r = self.lattice.resolution(depth);
            let range = self.lattice.cell_range_at_depth(&cb, depth);

            for gi in range[0].0..=range[0].1 {
                for gj in range[1].0..=range[1].1 {
                    for gk in range[2].0..=range[2].1 {
                        let tree_coords = [gi / r, gj / r, gk / r];
                        let local = [gi % r, gj % r, gk % r];
                        let bounds = self.lattice.node_bounds(tree_coords, local, depth);

                        let volume = match cell {
                            Cell::Voxel(vb) => voxel_box_volume(&bounds, vb, volume_unit),
                            Cell::Polyhedron(poly) => polyhedron_box_volume(
                                &bounds,
                                poly,
                                self.snap_tolerance,
                                &mut self.scratch,
                            ),
                        };
                        let volume = match volume {
                            Some(v) => v,
                            None => continue,
                        };

                        let tree =
                            self.lattice
                                .tree_index(tree_coords[0], tree_coords[1], tree_coords[2]);
                        let index = self.lattice.local_index(local, depth);
                        match grids[tree].level_mut(depth).entry(index) {
                            Entry::Occupied(entry) => entry.into_mut().absorb(value, volume),
                            Entry::Vacant(entry) => {
                                entry.insert(GridElement::seed(
                                    self.measures.prototypes(),
                                    value,
                                    volume,
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Shallowest depth at which the cell's bounds span at least two cells
    /// in every axis, capped at the maximum depth.
    fn placement_depth(&self, cb: &Aabb) -> usize {
        let mut depth = 0;
        loop {
            let range = self.lattice.cell_range_at_depth(cb, depth);
            if range.iter().all(|(lo, hi)| lo < hi) || depth == self.lattice.max_depth() {
                return depth;
            }
            depth += 1;
        }
    }

    /// Merge every level into its parent, deepest first.
    ///
    /// A parent's `can_subdivide` is the AND over its children of the
    /// per-child predicate (enough points, measurable); its
    /// `children_fully_populated` holds when every child subtree is
    /// complete.
    fn propagate(&self, grids: &mut [MultiResGrid]) {
        let bf = self.lattice.branch_factor();
        let n_children = self.lattice.n_children();

        for grid in grids.iter_mut() {
            for depth in (1..=self.lattice.max_depth()).rev() {
                let (parent_level, child_level) = grid.parent_child_mut(depth);
                for (&index, child) in child_level.iter() {
                    let c = self.lattice.local_coords(index, depth);
                    let parent_index = self
                        .lattice
                        .local_index([c[0] / bf, c[1] / bf, c[2] / bf], depth - 1);

                    let child_supports_subdivision = child.n_points >= self.min_points
                        && self.measures.can_measure(child.n_points, child.weight);
                    let child_complete = child.children_fully_populated
                        && child.n_unmasked_children == n_children;

                    match parent_level.entry(parent_index) {
                        Entry::Vacant(entry) => {
                            entry.insert(GridElement {
                                n_leaves: child.n_leaves,
                                n_points: child.n_points,
                                weight: child.weight,
                                n_unmasked_children: 1,
                                children_fully_populated: child_complete,
                                can_subdivide: child_supports_subdivision,
                                accumulators: child.accumulators.clone(),
                            });
                        }
                        Entry::Occupied(entry) => {
                            let parent = entry.into_mut();
                            parent.n_leaves += child.n_leaves;
                            parent.n_points += child.n_points;
                            parent.weight += child.weight;
                            parent.children_fully_populated &= child_complete;
                            parent.n_unmasked_children += 1;
                            parent.can_subdivide &= child_supports_subdivision;
                            for (pa, ca) in
                                parent.accumulators.iter_mut().zip(&child.accumulators)
                            {
                                pa.merge(ca);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Polyhedron;
    use crate::measure::Measurement;

    fn mean_set() -> MeasurementSet {
        MeasurementSet::new(Some(Measurement::ArithmeticMean), None)
    }

    #[test]
    fn test_point_seeding_and_propagation() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let lattice = Lattice::new(bounds, [1, 1, 1], 2, 2);
        let measures = mean_set();
        let mut builder = GridBuilder::new(&lattice, &measures, 1);

        let points = vec![
            DVec3::splat(0.1),
            DVec3::splat(0.15),
            DVec3::splat(0.9),
        ];
        let dataset = DataSet::from_points(points);
        let attribute = ScalarAttribute::new(
            "v",
            FieldAssociation::Points,
            vec![1.0, 3.0, 5.0],
        );
        let grids = builder.build(&dataset, &attribute);

        // Two points share one finest cell; one sits alone.
        assert_eq!(grids[0].level(2).len(), 2);
        let root = grids[0].get(0, 0).unwrap();
        assert_eq!(root.n_points, 3);
        assert_eq!(root.n_leaves, 2);
        assert_eq!(root.weight, 3.0);
        assert_eq!(root.accumulators[0].value(), 9.0);
        assert!(root.can_subdivide);
    }

    #[test]
    fn test_small_cell_placed_at_max_depth() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let lattice = Lattice::new(bounds, [1, 1, 1], 2, 3);
        let measures = mean_set();
        let builder = GridBuilder::new(&lattice, &measures, 1);

        let tiny = Aabb::new(DVec3::splat(0.4), DVec3::splat(0.45));
        assert_eq!(builder.placement_depth(&tiny), 3);

        let wide = Aabb::new(DVec3::splat(0.1), DVec3::splat(0.9));
        assert_eq!(builder.placement_depth(&wide), 1);
    }

    #[test]
    fn test_voxel_cell_weight_conservation() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let lattice = Lattice::new(bounds, [2, 2, 2], 2, 1);
        let measures = mean_set();
        let mut builder = GridBuilder::new(&lattice, &measures, 1);

        let dataset = DataSet::from_cells(vec![Cell::Voxel(Aabb::new(
            DVec3::ZERO,
            DVec3::ONE,
        ))])
        .with_bounds(bounds);
        let attribute = ScalarAttribute::new("v", FieldAssociation::Cells, vec![7.0]);
        let grids = builder.build(&dataset, &attribute);

        let total: f64 = grids
            .iter()
            .map(|g| g.level(1).values().map(|e| e.weight).sum::<f64>())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polyhedron_cell_weight_conservation() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let lattice = Lattice::new(bounds, [2, 2, 2], 2, 1);
        let measures = mean_set();
        let mut builder = GridBuilder::new(&lattice, &measures, 1);

        let cube = Polyhedron::axis_aligned_box(Aabb::new(
            DVec3::splat(0.25),
            DVec3::splat(1.25),
        ));
        let dataset = DataSet::from_cells(vec![Cell::Polyhedron(cube)]).with_bounds(bounds);
        let attribute = ScalarAttribute::new("v", FieldAssociation::Cells, vec![1.0]);
        let grids = builder.build(&dataset, &attribute);

        let total: f64 = grids
            .iter()
            .map(|g| {
                (0..=1)
                    .map(|d| g.level(d).values().map(|e| e.weight).sum::<f64>())
                    .sum::<f64>()
            })
            .sum();
        assert!((total - 1.0).abs() < 1e-6, "total weight {total}");
    }
}
