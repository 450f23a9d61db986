//! Output hyper tree grid container

pub mod bitarray;
pub mod data;
pub mod grid;
pub mod cursor;
pub mod super_cursor;

pub use bitarray::BitArray;
pub use cursor::TreeCursor;
pub use data::{CountArray, ScalarArray};
pub use grid::{HyperTree, HyperTreeGrid, TreeNode, INVALID_INDEX};
pub use super_cursor::VonNeumannSuperCursor;
