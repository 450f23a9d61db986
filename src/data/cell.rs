//! 3D input cells

use crate::core::types::DVec3;
use crate::math::polygon::{point_in_polygon, polygon_normal};
use crate::math::Aabb;

/// A general polyhedron with planar faces.
///
/// Faces index into `points` and wind counter-clockwise when seen from
/// outside; set `inside_out` when the winding is reversed.
#[derive(Clone, Debug)]
pub struct Polyhedron {
    points: Vec<DVec3>,
    faces: Vec<Vec<usize>>,
    inside_out: bool,
}

impl Polyhedron {
    /// Create a polyhedron from points and faces (outward winding)
    pub fn new(points: Vec<DVec3>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            points,
            faces,
            inside_out: false,
        }
    }

    /// Create a polyhedron with reversed face winding
    pub fn new_inside_out(points: Vec<DVec3>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            points,
            faces,
            inside_out: true,
        }
    }

    /// Axis-aligned hexahedron covering `bounds`
    pub fn axis_aligned_box(bounds: Aabb) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let points = vec![
            DVec3::new(lo.x, lo.y, lo.z),
            DVec3::new(hi.x, lo.y, lo.z),
            DVec3::new(hi.x, hi.y, lo.z),
            DVec3::new(lo.x, hi.y, lo.z),
            DVec3::new(lo.x, lo.y, hi.z),
            DVec3::new(hi.x, lo.y, hi.z),
            DVec3::new(hi.x, hi.y, hi.z),
            DVec3::new(lo.x, hi.y, hi.z),
        ];
        let faces = vec![
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
            vec![0, 1, 5, 4], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        Self::new(points, faces)
    }

    /// Tetrahedron over four vertices (a, b, c seen counter-clockwise from d)
    pub fn tetrahedron(a: DVec3, b: DVec3, c: DVec3, d: DVec3) -> Self {
        let points = vec![a, b, c, d];
        let faces = vec![vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![2, 0, 3]];
        Self::new(points, faces)
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn point(&self, i: usize) -> DVec3 {
        self.points[i]
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Point indices of face `f`
    pub fn face(&self, f: usize) -> &[usize] {
        &self.faces[f]
    }

    pub fn is_inside_out(&self) -> bool {
        self.inside_out
    }

    /// Bounding box of the vertices
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::new(DVec3::INFINITY, DVec3::NEG_INFINITY);
        for &p in &self.points {
            aabb.expand(p);
        }
        aabb
    }

    /// Unit normal of face `f` as wound (Newell's method).
    ///
    /// Points outward unless the polyhedron is inside-out.
    pub fn face_normal(&self, f: usize, scratch: &mut Vec<DVec3>) -> DVec3 {
        self.gather_face(f, scratch);
        polygon_normal(scratch)
    }

    /// Copy the vertices of face `f` into `scratch`
    pub fn gather_face(&self, f: usize, scratch: &mut Vec<DVec3>) {
        scratch.clear();
        scratch.extend(self.faces[f].iter().map(|&i| self.points[i]));
    }

    /// Even-odd containment test by ray casting along +x.
    ///
    /// Boundary points are classified arbitrarily.
    pub fn contains(&self, x: DVec3) -> bool {
        if !self.bounds().contains_point(x) {
            return self.inside_out;
        }
        let mut crossings = 0usize;
        let mut scratch = Vec::new();
        for f in 0..self.faces.len() {
            self.gather_face(f, &mut scratch);
            let normal = polygon_normal(&scratch);
            if normal.x.abs() < f64::EPSILON {
                continue;
            }
            let d = -normal.dot(scratch[0]);
            let t = -(normal.dot(x) + d) / normal.x;
            if t <= 0.0 {
                continue;
            }
            let q = x + DVec3::X * t;
            if point_in_polygon(q, &scratch, normal) {
                crossings += 1;
            }
        }
        let inside = crossings % 2 == 1;
        if self.inside_out {
            !inside
        } else {
            inside
        }
    }
}

/// A 3D input cell
#[derive(Clone, Debug)]
pub enum Cell {
    /// Axis-aligned voxel
    Voxel(Aabb),
    /// General polyhedron with planar faces
    Polyhedron(Polyhedron),
}

impl Cell {
    /// Bounding box of the cell
    pub fn bounds(&self) -> Aabb {
        match self {
            Cell::Voxel(b) => *b,
            Cell::Polyhedron(p) => p.bounds(),
        }
    }

    /// Number of defining vertices
    pub fn n_points(&self) -> usize {
        match self {
            Cell::Voxel(_) => 8,
            Cell::Polyhedron(p) => p.n_points(),
        }
    }

    /// Whether `x` lies inside the cell's geometry
    pub fn evaluate_position(&self, x: DVec3) -> bool {
        match self {
            Cell::Voxel(b) => b.contains_point(x),
            Cell::Polyhedron(p) => p.contains(x),
        }
    }
}
