//! Aggregated state at one (tree, depth, local) grid position

use crate::measure::Accumulator;

/// Aggregate state of one node of the sparse multi-resolution grid.
///
/// Created either by seeding input samples, by bottom-up propagation, or
/// as an empty marker placed where geometry passes through an otherwise
/// sample-free region (`Default`).
#[derive(Clone, Debug, Default)]
pub struct GridElement {
    /// Finest-level cells under this node that received at least one sample
    pub n_leaves: i64,
    /// Input samples contributing to this subtree
    pub n_points: i64,
    /// Accumulated weight (1 per point, intersected volume per cell)
    pub weight: f64,
    /// Direct children present in the sparse map
    pub n_unmasked_children: usize,
    /// Whether the entire subtree below is free of masked leaves
    pub children_fully_populated: bool,
    /// Whether every hypothetical child supports further subdivision
    pub can_subdivide: bool,
    /// One accumulator per distinct statistic of the configured measurements
    pub accumulators: Vec<Accumulator>,
}

impl GridElement {
    /// Seed a new element with a single weighted sample
    pub fn seed(prototypes: &[Accumulator], sample: f64, weight: f64) -> Self {
        let mut accumulators = prototypes.to_vec();
        for acc in &mut accumulators {
            acc.add(sample, weight);
        }
        Self {
            n_leaves: 1,
            n_points: 1,
            weight,
            n_unmasked_children: 0,
            children_fully_populated: true,
            can_subdivide: true,
            accumulators,
        }
    }

    /// Fold one more weighted sample into an existing element
    pub fn absorb(&mut self, sample: f64, weight: f64) {
        for acc in &mut self.accumulators {
            acc.add(sample, weight);
        }
        self.n_points += 1;
        self.weight += weight;
    }

    /// Whether any sample data reached this element (markers carry none)
    pub fn has_data(&self) -> bool {
        !self.accumulators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Accumulator, AccumulatorKind};

    #[test]
    fn test_seed_and_absorb() {
        let protos = [Accumulator::new(AccumulatorKind::Sum)];
        let mut e = GridElement::seed(&protos, 2.0, 1.0);
        assert_eq!(e.n_points, 1);
        assert_eq!(e.weight, 1.0);
        e.absorb(4.0, 1.0);
        assert_eq!(e.n_points, 2);
        assert_eq!(e.weight, 2.0);
        assert_eq!(e.accumulators[0].value(), 6.0);
    }

    #[test]
    fn test_marker_has_no_data() {
        let marker = GridElement::default();
        assert!(!marker.has_data());
        assert!(!marker.can_subdivide);
        assert_eq!(marker.n_leaves, 0);
    }
}
