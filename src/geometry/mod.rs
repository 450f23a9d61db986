//! Volumetric intersection between axis-aligned boxes and input cells

pub mod intersect;

pub use intersect::{polyhedron_box_volume, voxel_box_volume, SNAP_TOLERANCE};
