//! Planar polygon helpers

use crate::core::types::DVec3;

/// Unit normal of a planar polygon (Newell's method).
///
/// Returns the zero vector for degenerate polygons.
pub fn polygon_normal(points: &[DVec3]) -> DVec3 {
    let mut n = DVec3::ZERO;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        n += p.cross(q);
    }
    n.normalize_or_zero()
}

/// Point-in-polygon test for a point lying in the polygon's plane.
///
/// Projects along the dominant axis of `normal` and runs an even-odd
/// crossing count in 2D.
pub fn point_in_polygon(p: DVec3, points: &[DVec3], normal: DVec3) -> bool {
    if points.len() < 3 {
        return false;
    }

    // Drop the dominant axis of the normal to get a 2D projection.
    let drop = if normal.x.abs() >= normal.y.abs() && normal.x.abs() >= normal.z.abs() {
        0
    } else if normal.y.abs() >= normal.z.abs() {
        1
    } else {
        2
    };
    let (u, v) = ((drop + 1) % 3, (drop + 2) % 3);

    let px = p[u];
    let py = p[v];
    let mut inside = false;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let (ax, ay) = (a[u], a[v]);
        let (bx, by) = (b[u], b[v]);
        if (ay > py) != (by > py) {
            let t = (py - ay) / (by - ay);
            if px < ax + t * (bx - ax) {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_of_square() {
        let square = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let n = polygon_normal(&square);
        assert!((n - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_point_in_square() {
        let square = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let n = polygon_normal(&square);
        assert!(point_in_polygon(DVec3::new(0.5, 0.5, 0.0), &square, n));
        assert!(!point_in_polygon(DVec3::new(1.5, 0.5, 0.0), &square, n));
    }
}
