//! Box to cell intersection volumes.
//!
//! The voxel case is a clamp-and-multiply. The general polyhedron case
//! integrates the divergence of f(x, y, z) = xyz over the intersection,
//! so that 6·Vol is the sum of signed corner contributions from three
//! sources: box vertices interior to the polyhedron, polyhedron face
//! perimeters clipped against the box, and face-plane piercings of the
//! twelve box edges.

use crate::core::types::DVec3;
use crate::data::Polyhedron;
use crate::math::polygon::{point_in_polygon, polygon_normal};
use crate::math::{nearly_equal, Aabb};

/// Default inflation applied to box bounds wherever a polyhedron vertex
/// lies on a box face, so the vertex is not counted both inside and on.
pub const SNAP_TOLERANCE: f64 = 1e-2;

/// Tolerance below which two piercing coordinates on the same box edge
/// are treated as the same intersection.
const DEDUP_TOLERANCE: f64 = 1e-6;

const AXES: [DVec3; 3] = [DVec3::X, DVec3::Y, DVec3::Z];

/// Volume of the intersection of `bounds` with an axis-aligned voxel.
///
/// Returns `None` when any clamped edge falls below the representable
/// threshold `∛(f64::MIN_POSITIVE) / volume_unit`.
pub fn voxel_box_volume(bounds: &Aabb, voxel: &Aabb, volume_unit: f64) -> Option<f64> {
    let x = bounds.max.x.min(voxel.max.x) - bounds.min.x.max(voxel.min.x);
    let y = bounds.max.y.min(voxel.max.y) - bounds.min.y.max(voxel.min.y);
    let z = bounds.max.z.min(voxel.max.z) - bounds.min.z.max(voxel.min.z);
    let min_edge = f64::MIN_POSITIVE.cbrt();
    let normalization = volume_unit.min(1.0);
    let threshold = min_edge / normalization;
    if x >= threshold && y >= threshold && z >= threshold {
        Some(x * y * z / volume_unit)
    } else {
        None
    }
}

/// Volume of the intersection of `bounds` with a general polyhedron.
///
/// `scratch` holds face vertices between calls to avoid reallocation.
/// Returns `None` for an empty or degenerate intersection; a computed
/// volume exceeding the box volume is reported and dropped.
pub fn polyhedron_box_volume(
    bounds: &Aabb,
    cell: &Polyhedron,
    snap_tolerance: f64,
    scratch: &mut Vec<DVec3>,
) -> Option<f64> {
    // Bounds as (xmin, xmax, ymin, ymax, zmin, zmax); plane id 2a + s
    // addresses the min (s = 0) or max (s = 1) plane of axis a.
    let mut b = [
        bounds.min.x,
        bounds.max.x,
        bounds.min.y,
        bounds.max.y,
        bounds.min.z,
        bounds.max.z,
    ];
    snap_bounds_to_vertices(&mut b, cell, snap_tolerance);

    let mut box_volume = 0.0;
    let mut volume = 0.0;

    // Box vertices interior to the polyhedron. Sign alternates over the
    // eight corners: xor of the x/y bits, negated on the upper z slab.
    for vid in 0..8usize {
        let corner = DVec3::new(
            b[vid & 1],
            b[2 + ((vid & 2) >> 1)],
            b[4 + ((vid & 4) >> 2)],
        );
        if cell.contains(corner) {
            let mut sign = if ((vid & 1) != 0) != ((vid & 2) != 0) {
                6.0
            } else {
                -6.0
            };
            if vid & 4 != 0 {
                sign = -sign;
            }
            box_volume += sign * corner.x * corner.y * corner.z;
        }
    }

    // Per box edge (3 axes x 4 edges), piercing coordinates already
    // accounted for, deduplicated within DEDUP_TOLERANCE.
    let mut seen: [Vec<f64>; 12] = Default::default();

    for f in 0..cell.n_faces() {
        cell.gather_face(f, scratch);
        if scratch.len() <= 2 {
            continue;
        }
        let normal = polygon_normal(scratch);
        if normal == DVec3::ZERO {
            continue;
        }

        // Face perimeter: endpoint terms for vertices strictly inside the
        // box, plus corrective terms where an edge crosses a box plane.
        let n_pts = scratch.len();
        for e in 0..n_pts {
            let p1 = scratch[e];
            let p2 = scratch[(e + 1) % n_pts];
            if nearly_equal(p1.x, p2.x) && nearly_equal(p1.y, p2.y) && nearly_equal(p1.z, p2.z) {
                continue;
            }
            let tangent = (p2 - p1).normalize();
            let edge_normal = normal.cross(tangent);

            let p1_inside = strictly_inside(&b, p1);
            let p2_inside = strictly_inside(&b, p2);
            if p1_inside {
                box_volume += p1.dot(tangent) * p1.dot(edge_normal) * p1.dot(normal);
            }
            if p2_inside {
                box_volume -= p2.dot(tangent) * p2.dot(edge_normal) * p2.dot(normal);
            }

            if p1_inside && p2_inside {
                continue;
            }
            let clip = match intersect_line_box(&b, p1, p2) {
                Some(clip) => clip,
                None => continue,
            };
            if nearly_equal(clip.t1, clip.t2) {
                continue;
            }
            if clip.t1 >= 0.0 && clip.t1 + f64::EPSILON <= 1.0 {
                let axis = clip.plane1 / 2;
                let x1 = clip.x1;
                let edge_box = AXES[axis].cross(normal).normalize_or_zero();
                let edge_normal_box = normal.cross(edge_box);
                box_volume += x1.dot(tangent) * x1.dot(edge_normal) * x1.dot(normal);
                box_volume -= x1.dot(edge_box) * x1.dot(edge_normal_box) * x1.dot(normal);
                let edge_on_box = AXES[axis].cross(edge_box);
                volume += x1.dot(edge_box) * x1[axis] * x1.dot(edge_on_box);
            }
            if clip.t2 >= f64::MIN_POSITIVE && clip.t2 <= 1.0 {
                let axis = clip.plane2 / 2;
                let x2 = clip.x2;
                let edge_box = AXES[axis].cross(normal).normalize_or_zero();
                let edge_normal_box = normal.cross(edge_box);
                box_volume -= x2.dot(tangent) * x2.dot(edge_normal) * x2.dot(normal);
                box_volume += x2.dot(edge_box) * x2.dot(edge_normal_box) * x2.dot(normal);
                let edge_on_box = AXES[axis].cross(edge_box);
                volume -= x2.dot(edge_box) * x2[axis] * x2.dot(edge_on_box);
            }
        }

        // Face plane against the twelve box edges. The four edges
        // orthogonal to `dim` are visited in cyclic order, mutating the
        // fixed coordinates one at a time.
        let d = -normal.dot(scratch[0]);
        for dim in 0..3 {
            let a1 = (dim + 1) % 3;
            let a2 = (dim + 2) % 3;
            let edge_box1 = normal.cross(AXES[a1]).normalize_or_zero();
            let edge_box2 = normal.cross(AXES[a2]).normalize_or_zero();
            let edge_normal_box1 = edge_box1.cross(normal);
            let edge_normal_box2 = edge_box2.cross(normal);
            let edge_on_box1 = edge_box1.cross(AXES[a1]);
            let edge_on_box2 = edge_box2.cross(AXES[a2]);

            let mut p = DVec3::ZERO;

            // Edge at (a1 lo, a2 lo)
            p[a1] = b[2 * a1];
            p[a2] = b[2 * a2];
            solve_on_plane(&mut p, dim, normal, d);
            if accept_piercing(&seen[dim * 4], &b, dim, p, scratch, normal) {
                volume += sgn(normal[dim] > 0.0)
                    * p.dot(edge_box1) * p.dot(edge_normal_box1) * p.dot(normal);
                volume -= sgn(edge_box1[a2] > 0.0)
                    * p.dot(edge_box1) * p[a1] * p.dot(edge_on_box1);
                volume += sgn(normal[dim] < 0.0)
                    * p.dot(edge_box2) * p.dot(edge_normal_box2) * p.dot(normal);
                volume -= sgn(edge_box2[a1] > 0.0)
                    * p.dot(edge_box2) * p[a2] * p.dot(edge_on_box2);
                volume += 2.0 * sgn(normal[dim] > 0.0) * p.x * p.y * p.z;
            }
            seen[dim * 4].push(p[dim]);

            // Edge at (a1 hi, a2 lo)
            p[a1] = b[2 * a1 + 1];
            solve_on_plane(&mut p, dim, normal, d);
            if accept_piercing(&seen[dim * 4 + 1], &b, dim, p, scratch, normal) {
                volume += sgn(normal[dim] < 0.0)
                    * p.dot(edge_box1) * p.dot(edge_normal_box1) * p.dot(normal);
                volume += sgn(edge_box1[a2] > 0.0)
                    * p.dot(edge_box1) * p[a1] * p.dot(edge_on_box1);
                volume += sgn(normal[dim] > 0.0)
                    * p.dot(edge_box2) * p.dot(edge_normal_box2) * p.dot(normal);
                volume -= sgn(edge_box2[a1] < 0.0)
                    * p.dot(edge_box2) * p[a2] * p.dot(edge_on_box2);
                volume -= 2.0 * sgn(normal[dim] > 0.0) * p.x * p.y * p.z;
            }
            seen[dim * 4 + 1].push(p[dim]);

            // Edge at (a1 hi, a2 hi)
            p[a2] = b[2 * a2 + 1];
            solve_on_plane(&mut p, dim, normal, d);
            if accept_piercing(&seen[dim * 4 + 2], &b, dim, p, scratch, normal) {
                volume += sgn(normal[dim] > 0.0)
                    * p.dot(edge_box1) * p.dot(edge_normal_box1) * p.dot(normal);
                volume += sgn(edge_box1[a2] < 0.0)
                    * p.dot(edge_box1) * p[a1] * p.dot(edge_on_box1);
                volume += sgn(normal[dim] < 0.0)
                    * p.dot(edge_box2) * p.dot(edge_normal_box2) * p.dot(normal);
                volume += sgn(edge_box2[a1] < 0.0)
                    * p.dot(edge_box2) * p[a2] * p.dot(edge_on_box2);
                volume += 2.0 * sgn(normal[dim] > 0.0) * p.x * p.y * p.z;
            }
            seen[dim * 4 + 2].push(p[dim]);

            // Edge at (a1 lo, a2 hi)
            p[a1] = b[2 * a1];
            solve_on_plane(&mut p, dim, normal, d);
            if accept_piercing(&seen[dim * 4 + 3], &b, dim, p, scratch, normal) {
                volume += sgn(normal[dim] < 0.0)
                    * p.dot(edge_box1) * p.dot(edge_normal_box1) * p.dot(normal);
                volume -= sgn(edge_box1[a2] < 0.0)
                    * p.dot(edge_box1) * p[a1] * p.dot(edge_on_box1);
                volume += sgn(normal[dim] > 0.0)
                    * p.dot(edge_box2) * p.dot(edge_normal_box2) * p.dot(normal);
                volume += sgn(edge_box2[a1] > 0.0)
                    * p.dot(edge_box2) * p[a2] * p.dot(edge_on_box2);
                volume -= 2.0 * sgn(normal[dim] > 0.0) * p.x * p.y * p.z;
            }
            seen[dim * 4 + 3].push(p[dim]);
        }
    }

    if cell.is_inside_out() {
        volume = -volume;
    }
    volume += box_volume;
    volume /= 6.0;

    let box_vol = (b[1] - b[0]) * (b[3] - b[2]) * (b[5] - b[4]);
    if volume.abs() > box_vol {
        log::warn!(
            "intersected volume {volume} exceeds box volume {box_vol}; dropping contribution"
        );
        return None;
    }
    if volume >= f64::EPSILON {
        Some(volume)
    } else {
        None
    }
}

fn sgn(positive: bool) -> f64 {
    if positive {
        1.0
    } else {
        -1.0
    }
}

/// Inflate box bounds wherever a cell vertex lies on a box face, repeated
/// until stable, so the vertex classifies as interior rather than on.
fn snap_bounds_to_vertices(b: &mut [f64; 6], cell: &Polyhedron, tol: f64) {
    loop {
        let mut changed = false;
        for &p in cell.points() {
            for axis in 0..3usize {
                let a1 = (axis + 1) % 3;
                let a2 = (axis + 2) % 3;
                let on_face = p[a1] <= b[2 * a1 + 1] + tol
                    && p[a1] >= b[2 * a1] - tol
                    && p[a2] <= b[2 * a2 + 1] + tol
                    && p[a2] >= b[2 * a2] - tol;
                if !on_face {
                    continue;
                }
                if (p[axis] - b[2 * axis]).abs() < tol {
                    b[2 * axis] -= tol;
                    changed = true;
                }
                if (p[axis] - b[2 * axis + 1]).abs() < tol {
                    b[2 * axis + 1] += tol;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

fn strictly_inside(b: &[f64; 6], p: DVec3) -> bool {
    (0..3).all(|axis| {
        p[axis] > b[2 * axis]
            && !nearly_equal(p[axis], b[2 * axis])
            && p[axis] < b[2 * axis + 1]
            && !nearly_equal(p[axis], b[2 * axis + 1])
    })
}

/// Solve the face-plane equation for `p[dim]` given the two fixed
/// coordinates; a plane parallel to `dim` yields infinity, which every
/// in-range check rejects.
fn solve_on_plane(p: &mut DVec3, dim: usize, normal: DVec3, d: f64) {
    let a1 = (dim + 1) % 3;
    let a2 = (dim + 2) % 3;
    p[dim] = if normal[dim].abs() >= f64::EPSILON {
        -(d + p[a1] * normal[a1] + p[a2] * normal[a2]) / normal[dim]
    } else {
        f64::INFINITY
    };
}

fn accept_piercing(
    seen: &[f64],
    b: &[f64; 6],
    dim: usize,
    p: DVec3,
    face: &[DVec3],
    normal: DVec3,
) -> bool {
    let duplicate = seen
        .iter()
        .any(|&x| (x - p[dim]).abs() <= DEDUP_TOLERANCE);
    if duplicate {
        return false;
    }
    let in_range = (p[dim] >= b[2 * dim] && p[dim] <= b[2 * dim + 1])
        || (nearly_equal(p[dim], b[2 * dim]) && nearly_equal(p[dim], b[2 * dim + 1]));
    in_range && point_in_polygon(p, face, normal)
}

struct LineBoxClip {
    t1: f64,
    t2: f64,
    x1: DVec3,
    x2: DVec3,
    plane1: usize,
    plane2: usize,
}

/// Clip the infinite line through `p1`, `p2` against the box; parameters
/// are relative to the segment (t = 0 at p1, t = 1 at p2) and plane ids
/// are 2·axis + side.
fn intersect_line_box(b: &[f64; 6], p1: DVec3, p2: DVec3) -> Option<LineBoxClip> {
    let dir = p2 - p1;
    let mut t1 = f64::NEG_INFINITY;
    let mut t2 = f64::INFINITY;
    let mut plane1 = usize::MAX;
    let mut plane2 = usize::MAX;

    for axis in 0..3usize {
        let d = dir[axis];
        let lo = b[2 * axis];
        let hi = b[2 * axis + 1];
        if d.abs() < f64::EPSILON {
            if p1[axis] < lo || p1[axis] > hi {
                return None;
            }
            continue;
        }
        let (t_near, t_far, near_plane, far_plane) = if d > 0.0 {
            ((lo - p1[axis]) / d, (hi - p1[axis]) / d, 2 * axis, 2 * axis + 1)
        } else {
            ((hi - p1[axis]) / d, (lo - p1[axis]) / d, 2 * axis + 1, 2 * axis)
        };
        if t_near > t1 {
            t1 = t_near;
            plane1 = near_plane;
        }
        if t_far < t2 {
            t2 = t_far;
            plane2 = far_plane;
        }
    }

    if t1 > t2 || plane1 == usize::MAX || plane2 == usize::MAX {
        return None;
    }
    Some(LineBoxClip {
        t1,
        t2,
        x1: p1 + dir * t1,
        x2: p1 + dir * t2,
        plane1,
        plane2,
    })
}
