//! Treesample - adaptive hyper tree grid resampling
//!
//! Tiles the bounding box of an input dataset with a coarse lattice of
//! trees, aggregates a scalar attribute of the input into a sparse
//! multi-resolution grid, and materializes one adaptive tree per lattice
//! cell whose leaves carry measured statistics of the samples below them.

pub mod core;
pub mod math;
pub mod data;
pub mod measure;
pub mod geometry;
pub mod grid;
pub mod tree;
pub mod resample;

pub use crate::data::{Cell, DataSet, FieldAssociation, Polyhedron, ScalarAttribute};
pub use crate::measure::Measurement;
pub use crate::resample::{ResampleConfig, Resampler};
pub use crate::tree::HyperTreeGrid;
