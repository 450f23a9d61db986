//! End-to-end resampling scenarios over the public API.

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use treesample::grid::Lattice;
use treesample::math::Aabb;
use treesample::resample::extrapolate_gaps;
use treesample::{
    Cell, DataSet, FieldAssociation, HyperTreeGrid, Measurement, Polyhedron, ResampleConfig,
    Resampler, ScalarAttribute,
};

struct LeafInfo {
    global: usize,
    depth: usize,
    tree_coords: [usize; 3],
    local: [usize; 3],
}

/// Depth-first walk collecting every leaf with its intra-tree coordinates
fn collect_leaves(grid: &HyperTreeGrid) -> Vec<LeafInfo> {
    let mut leaves = Vec::new();
    for t in 0..grid.n_trees() {
        let tree = grid.tree(t);
        let tree_coords = grid.tree_coords(t);
        let bf = tree.branch_factor();
        let mut stack = vec![(0u32, 0usize, [0usize; 3])];
        while let Some((vertex, depth, local)) = stack.pop() {
            if tree.is_leaf(vertex) {
                leaves.push(LeafInfo {
                    global: tree.global_index_from_local(vertex),
                    depth,
                    tree_coords,
                    local,
                });
                continue;
            }
            for child in 0..tree.n_children() {
                let (ii, jj, kk) = (child % bf, (child / bf) % bf, child / (bf * bf));
                stack.push((
                    tree.child(vertex, child),
                    depth + 1,
                    [local[0] * bf + ii, local[1] * bf + jj, local[2] * bf + kk],
                ));
            }
        }
    }
    leaves
}

/// Global indices of every internal (subdivided) node
fn collect_internal(grid: &HyperTreeGrid) -> Vec<(usize, Vec<usize>)> {
    let mut internal = Vec::new();
    for t in 0..grid.n_trees() {
        let tree = grid.tree(t);
        let mut stack = vec![0u32];
        while let Some(vertex) = stack.pop() {
            if tree.is_leaf(vertex) {
                continue;
            }
            let children: Vec<u32> = (0..tree.n_children())
                .map(|c| tree.child(vertex, c))
                .collect();
            internal.push((
                tree.global_index_from_local(vertex),
                children
                    .iter()
                    .map(|&c| tree.global_index_from_local(c))
                    .collect(),
            ));
            stack.extend(children);
        }
    }
    internal
}

#[test]
fn s1_trivial_point_input() {
    let mut config = ResampleConfig::default();
    config.dimensions = [2, 2, 2];
    config.max_depth = 0;
    config.measurement = Some(Measurement::ArithmeticMean);
    let resampler = Resampler::new(config).unwrap();

    let mut points = Vec::new();
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                points.push(DVec3::new(i as f64, j as f64, k as f64));
            }
        }
    }
    let dataset = DataSet::from_points(points);
    let attribute = ScalarAttribute::new("rho", FieldAssociation::Points, vec![1.0; 8]);

    let output = resampler.resample(&dataset, &attribute).unwrap();

    assert_eq!(output.n_trees(), 1);
    assert_eq!(output.n_vertices(), 1);
    let measure = output.measure().unwrap();
    assert_eq!(measure.name(), "rho_measure");
    assert_eq!(measure.get(0), 1.0);
    assert_eq!(output.n_points_array().get(0), 8);
    assert_eq!(output.n_leaves_array().get(0), 1);
    assert!(!output.is_masked(0));
}

#[test]
fn s2_split_by_range() {
    let mut config = ResampleConfig::default();
    config.dimensions = [2, 2, 2];
    config.max_depth = 3;
    config.measurement = Some(Measurement::ArithmeticMean);
    config.min = 0.4;
    config.max = 1.0;
    config.in_range = true;
    let resampler = Resampler::new(config).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let points: Vec<DVec3> = (0..1000)
        .map(|_| DVec3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let values: Vec<f64> = points.iter().map(|p| p.x).collect();
    let dataset = DataSet::from_points(points);
    let attribute = ScalarAttribute::new("x", FieldAssociation::Points, values);

    let output = resampler.resample(&dataset, &attribute).unwrap();
    let measure = output.measure().unwrap();

    // Range gating: only nodes whose mean falls in (0.4, 1.0) subdivided.
    let internal = collect_internal(&output);
    assert!(!internal.is_empty());
    for (global, _) in &internal {
        let value = measure.get(*global);
        assert!(
            value > 0.4 && value < 1.0,
            "subdivided node {global} has out-of-range mean {value}"
        );
    }

    let leaves = collect_leaves(&output);

    // Depth limit.
    assert!(leaves.iter().all(|l| l.depth <= 3));
    // Low-x octant stays coarse: its root mean is far below the range.
    assert!(leaves.iter().any(|l| l.depth < 3));

    // Count conservation over leaves.
    let total: i64 = leaves
        .iter()
        .map(|l| output.n_points_array().get(l.global))
        .sum();
    assert_eq!(total, 1000);

    // Mask/emptiness equivalence (pure point input, no markers).
    for leaf in &leaves {
        let empty = output.n_points_array().get(leaf.global) == 0;
        assert_eq!(output.is_masked(leaf.global), empty);
    }

    // Monotone aggregation: each internal node's count is the sum over its
    // direct children (absent regions count zero).
    for (global, children) in &internal {
        let sum: i64 = children
            .iter()
            .map(|&c| output.n_points_array().get(c))
            .sum();
        assert_eq!(output.n_points_array().get(*global), sum);
    }
}

#[test]
fn s3_single_voxel_cell() {
    let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
    let mut config = ResampleConfig::default();
    config.dimensions = [3, 3, 3];
    config.max_depth = 1;
    config.measurement = Some(Measurement::ArithmeticMean);
    let resampler = Resampler::new(config).unwrap();

    let dataset = DataSet::from_cells(vec![Cell::Voxel(Aabb::new(DVec3::ZERO, DVec3::ONE))])
        .with_bounds(bounds);
    let attribute = ScalarAttribute::new("q", FieldAssociation::Cells, vec![7.0]);

    let output = resampler.resample(&dataset, &attribute).unwrap();
    assert_eq!(output.n_trees(), 8);

    let leaves = collect_leaves(&output);
    let measure = output.measure().unwrap();

    let mut populated = 0;
    let mut masked = 0;
    for leaf in &leaves {
        if output.is_masked(leaf.global) {
            masked += 1;
        } else {
            populated += 1;
            assert_eq!(leaf.tree_coords, [0, 0, 0]);
            assert_eq!(leaf.depth, 1);
            assert!((measure.get(leaf.global) - 7.0).abs() < 1e-12);
        }
    }
    // The cell's octant refines into 8 leaves of value 7; the seven other
    // trees stay single masked roots.
    assert_eq!(populated, 8);
    assert_eq!(masked, 7);
}

#[test]
fn s4_no_empty_cells_prevents_holes() {
    let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
    let mut config = ResampleConfig::default();
    config.dimensions = [3, 3, 3];
    config.max_depth = 3;
    config.measurement = Some(Measurement::ArithmeticMean);
    config.no_empty_cells = true;
    let resampler = Resampler::new(config).unwrap();

    // A thin tetrahedron crossing several boxes of the finest grid.
    let tet = Polyhedron::tetrahedron(
        DVec3::new(0.05, 0.05, 0.05),
        DVec3::new(0.9, 0.1, 0.1),
        DVec3::new(0.1, 0.9, 0.1),
        DVec3::new(0.1, 0.1, 0.35),
    );
    let cell = Cell::Polyhedron(tet.clone());
    let dataset = DataSet::from_cells(vec![cell]).with_bounds(bounds);
    let attribute = ScalarAttribute::new("q", FieldAssociation::Cells, vec![1.0]);

    let output = resampler.resample(&dataset, &attribute).unwrap();
    let lattice = Lattice::new(bounds, output.cell_dims(), 2, 3);

    for leaf in collect_leaves(&output) {
        if !output.is_masked(leaf.global) {
            continue;
        }
        let center = lattice.node_center(leaf.tree_coords, leaf.local, leaf.depth);
        assert!(
            !tet.contains(center),
            "masked leaf at depth {} pierced by geometry",
            leaf.depth
        );
    }
}

#[test]
fn s5_extrapolation_fills_gap() {
    let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
    let mut config = ResampleConfig::default();
    config.dimensions = [2, 2, 2];
    config.branch_factor = 3;
    config.max_depth = 1;
    config.measurement = Some(Measurement::ArithmeticMean);
    config.extrapolate = true;
    let resampler = Resampler::new(config).unwrap();

    // One point at the center of every finest cell except the middle one;
    // the six axial neighbors of the gap carry 1..=6.
    let mut points = Vec::new();
    let mut values = Vec::new();
    let neighbor_values = [
        ([0usize, 1, 1], 1.0),
        ([2, 1, 1], 2.0),
        ([1, 0, 1], 3.0),
        ([1, 2, 1], 4.0),
        ([1, 1, 0], 5.0),
        ([1, 1, 2], 6.0),
    ];
    for i in 0..3usize {
        for j in 0..3usize {
            for k in 0..3usize {
                if [i, j, k] == [1, 1, 1] {
                    continue;
                }
                points.push(DVec3::new(
                    (i as f64 + 0.5) / 3.0,
                    (j as f64 + 0.5) / 3.0,
                    (k as f64 + 0.5) / 3.0,
                ));
                let value = neighbor_values
                    .iter()
                    .find(|(c, _)| *c == [i, j, k])
                    .map(|(_, v)| *v)
                    .unwrap_or(10.0);
                values.push(value);
            }
        }
    }
    let dataset = DataSet::from_points(points).with_bounds(bounds);
    let attribute = ScalarAttribute::new("rho", FieldAssociation::Points, values);

    let mut output = resampler.resample(&dataset, &attribute).unwrap();

    // Root plus 27 children; the gap is child (1, 1, 1) = vertex 14.
    assert_eq!(output.n_vertices(), 28);
    let gap = 14;
    assert!(output.is_masked(gap));
    let filled = output.measure().unwrap().get(gap);
    assert!((filled - 3.5).abs() < 1e-12, "gap filled with {filled}");

    // Extrapolation is a fixed point.
    let snapshot: Vec<f64> = output.measure().unwrap().values().to_vec();
    extrapolate_gaps(&mut output);
    assert_eq!(output.measure().unwrap().values(), snapshot.as_slice());
}

#[test]
fn s6_dual_measurement_deduplication() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let points: Vec<DVec3> = (0..256)
        .map(|_| DVec3::new(rng.gen(), rng.gen(), rng.gen()))
        .collect();
    let values: Vec<f64> = points.iter().map(|p| 1.0 + p.x + p.y).collect();
    let dataset = DataSet::from_points(points);
    let attribute = ScalarAttribute::new("rho", FieldAssociation::Points, values);

    let mut dual = ResampleConfig::default();
    dual.dimensions = [2, 2, 2];
    dual.max_depth = 2;
    dual.measurement = Some(Measurement::ArithmeticMean);
    dual.display_measurement = Some(Measurement::StandardDeviation);
    let dual_output = Resampler::new(dual)
        .unwrap()
        .resample(&dataset, &attribute)
        .unwrap();

    let mut solo = ResampleConfig::default();
    solo.dimensions = [2, 2, 2];
    solo.max_depth = 2;
    solo.measurement = Some(Measurement::StandardDeviation);
    let solo_output = Resampler::new(solo)
        .unwrap()
        .resample(&dataset, &attribute)
        .unwrap();

    // Both outputs are present under their configured names.
    let display = dual_output.display().unwrap();
    assert_eq!(dual_output.measure().unwrap().name(), "rho_measure");
    assert_eq!(display.name(), "rho");

    // The shared-accumulator display values match the isolated run.
    let isolated = solo_output.measure().unwrap();
    assert_eq!(display.len(), isolated.len());
    for i in 0..display.len() {
        let a = display.get(i);
        let b = isolated.get(i);
        assert!(
            (a.is_nan() && b.is_nan()) || (a - b).abs() < 1e-12,
            "node {i}: display {a} vs isolated {b}"
        );
    }
}

#[test]
fn min_points_gates_refinement() {
    let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
    // Eight points in one octant, one in another: with a ten-point
    // threshold no hypothetical child qualifies, so the root stays a leaf.
    let mut points: Vec<DVec3> = (0..8)
        .map(|i| DVec3::new(0.05 + 0.01 * i as f64, 0.1, 0.1))
        .collect();
    points.push(DVec3::splat(0.9));
    let n = points.len();
    let dataset = DataSet::from_points(points).with_bounds(bounds);
    let attribute = ScalarAttribute::new("rho", FieldAssociation::Points, vec![1.0; n]);

    let mut config = ResampleConfig::default();
    config.dimensions = [2, 2, 2];
    config.max_depth = 1;
    config.measurement = Some(Measurement::ArithmeticMean);
    config.min_points_per_subtree = 10;
    let strict = Resampler::new(config.clone()).unwrap();
    let output = strict.resample(&dataset, &attribute).unwrap();
    assert_eq!(output.n_vertices(), 1);

    config.min_points_per_subtree = 1;
    let relaxed = Resampler::new(config).unwrap();
    let output = relaxed.resample(&dataset, &attribute).unwrap();
    assert_eq!(output.n_vertices(), 9);
}

#[test]
fn regular_grid_roundtrip() {
    let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
    let mut config = ResampleConfig::default();
    config.dimensions = [3, 3, 3];
    config.max_depth = 1;
    config.measurement = Some(Measurement::ArithmeticMean);
    let resampler = Resampler::new(config).unwrap();

    // One point at the center of each of the 4x4x4 finest boxes, valued by
    // its lattice rank.
    let mut points = Vec::new();
    let mut values = Vec::new();
    for i in 0..4usize {
        for j in 0..4usize {
            for k in 0..4usize {
                points.push(DVec3::new(
                    (i as f64 + 0.5) / 2.0,
                    (j as f64 + 0.5) / 2.0,
                    (k as f64 + 0.5) / 2.0,
                ));
                values.push((i + j * 4 + k * 16) as f64);
            }
        }
    }
    let dataset = DataSet::from_points(points).with_bounds(bounds);
    let attribute = ScalarAttribute::new("rank", FieldAssociation::Points, values);

    let output = resampler.resample(&dataset, &attribute).unwrap();
    let leaves = collect_leaves(&output);
    assert_eq!(leaves.len(), 64);

    let measure = output.measure().unwrap();
    for leaf in &leaves {
        assert_eq!(leaf.depth, 1);
        let i = leaf.tree_coords[0] * 2 + leaf.local[0];
        let j = leaf.tree_coords[1] * 2 + leaf.local[1];
        let k = leaf.tree_coords[2] * 2 + leaf.local[2];
        let expected = (i + j * 4 + k * 16) as f64;
        assert!(!output.is_masked(leaf.global));
        assert_eq!(measure.get(leaf.global), expected);
        assert_eq!(output.n_points_array().get(leaf.global), 1);
    }
}
