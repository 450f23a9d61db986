//! Accumulators and measurements over resampled data

pub mod accumulator;
pub mod measurement;
pub mod set;

pub use accumulator::{Accumulator, AccumulatorKind};
pub use measurement::Measurement;
pub use set::MeasurementSet;
