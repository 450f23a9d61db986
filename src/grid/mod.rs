//! Sparse multi-resolution aggregation grids

pub mod lattice;
pub mod element;
pub mod multires;
pub mod builder;
pub mod gaps;

pub use builder::GridBuilder;
pub use element::GridElement;
pub use gaps::GapAnalyzer;
pub use lattice::Lattice;
pub use multires::MultiResGrid;
