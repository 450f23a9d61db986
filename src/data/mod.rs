//! Input data model: cells, datasets, and scalar attributes

pub mod cell;
pub mod dataset;
pub mod field;

pub use cell::{Cell, Polyhedron};
pub use dataset::DataSet;
pub use field::{FieldAssociation, ScalarAttribute};
