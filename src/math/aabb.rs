//! Axis-aligned bounding box

use crate::core::types::DVec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Create AABB from the six bounds (xmin, xmax, ymin, ymax, zmin, zmax)
    pub fn from_bounds(bounds: [f64; 6]) -> Self {
        Self {
            min: DVec3::new(bounds[0], bounds[2], bounds[4]),
            max: DVec3::new(bounds[1], bounds[3], bounds[5]),
        }
    }

    /// Get center point
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Get size (max - min)
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Volume of the box (zero for degenerate boxes)
    pub fn volume(&self) -> f64 {
        let s = self.size();
        (s.x * s.y * s.z).max(0.0)
    }

    /// Check if point is inside AABB (boundary included)
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Check if two AABBs intersect (boundary contact counts)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Return merged AABB containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Get the (i, j, k) sub-box of a `factor`-ary refinement of this box.
    ///
    /// Each axis is split into `factor` equal slabs; indices must be in
    /// `0..factor`.
    pub fn child(&self, factor: usize, i: usize, j: usize, k: usize) -> Aabb {
        let step = self.size() / factor as f64;
        let lo = self.min + DVec3::new(i as f64, j as f64, k as f64) * step;
        Aabb::new(lo, lo + step)
    }
}
