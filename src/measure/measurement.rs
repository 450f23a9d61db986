//! Derived scalar measurements over accumulated statistics

use serde::{Deserialize, Serialize};

use super::accumulator::{Accumulator, AccumulatorKind};

/// A scalar statistic derived from accumulators and the (count, weight)
/// summary of a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measurement {
    ArithmeticMean,
    GeometricMean,
    HarmonicMean,
    StandardDeviation,
    Min,
    Max,
}

impl Measurement {
    /// Accumulators this measurement needs, in slot order
    pub fn required_accumulators(&self) -> &'static [AccumulatorKind] {
        match self {
            Measurement::ArithmeticMean => &[AccumulatorKind::Sum],
            Measurement::GeometricMean => &[AccumulatorKind::LogSum],
            Measurement::HarmonicMean => &[AccumulatorKind::InverseSum],
            Measurement::StandardDeviation => {
                &[AccumulatorKind::Sum, AccumulatorKind::SquaredSum]
            }
            Measurement::Min => &[AccumulatorKind::Min],
            Measurement::Max => &[AccumulatorKind::Max],
        }
    }

    /// Whether the statistic is defined on this many samples and weight
    pub fn can_measure(&self, n_points: i64, weight: f64) -> bool {
        let min_points = match self {
            Measurement::StandardDeviation => 2,
            _ => 1,
        };
        n_points >= min_points && weight > 0.0
    }

    /// Compute the statistic from accumulators in `required_accumulators`
    /// slot order.
    pub fn measure(&self, accumulators: &[Accumulator], _n_points: i64, weight: f64) -> f64 {
        match self {
            Measurement::ArithmeticMean => accumulators[0].value() / weight,
            Measurement::GeometricMean => (accumulators[0].value() / weight).exp(),
            Measurement::HarmonicMean => weight / accumulators[0].value(),
            Measurement::StandardDeviation => {
                let mean = accumulators[0].value() / weight;
                let raw = accumulators[1].value() / weight - mean * mean;
                raw.max(0.0).sqrt()
            }
            Measurement::Min | Measurement::Max => accumulators[0].value(),
        }
    }
}
