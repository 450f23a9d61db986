//! Deduplicating façade over the configured measurements

use super::accumulator::Accumulator;
use super::measurement::Measurement;

/// The primary and display measurements plus the deduplicated union of the
/// accumulators they need.
///
/// When both measurements are configured their accumulator requirements are
/// merged so each distinct statistic is updated once per sample; the display
/// measurement reads its slots back through an index map.
#[derive(Clone, Debug)]
pub struct MeasurementSet {
    primary: Option<Measurement>,
    display: Option<Measurement>,
    prototypes: Vec<Accumulator>,
    display_slots: Vec<usize>,
}

impl MeasurementSet {
    pub fn new(primary: Option<Measurement>, display: Option<Measurement>) -> Self {
        let mut prototypes: Vec<Accumulator> = primary
            .map(|m| {
                m.required_accumulators()
                    .iter()
                    .map(|&k| Accumulator::new(k))
                    .collect()
            })
            .unwrap_or_default();

        let mut display_slots = Vec::new();
        if let Some(display) = display {
            for &kind in display.required_accumulators() {
                let candidate = Accumulator::new(kind);
                match prototypes
                    .iter()
                    .position(|p| p.has_same_parameters(&candidate))
                {
                    Some(slot) => display_slots.push(slot),
                    None => {
                        display_slots.push(prototypes.len());
                        prototypes.push(candidate);
                    }
                }
            }
        }

        Self {
            primary,
            display,
            prototypes,
            display_slots,
        }
    }

    pub fn primary(&self) -> Option<Measurement> {
        self.primary
    }

    pub fn display(&self) -> Option<Measurement> {
        self.display
    }

    /// Prototype accumulators for the union of both measurements
    pub fn prototypes(&self) -> &[Accumulator] {
        &self.prototypes
    }

    /// Union slot index for each display accumulator slot
    pub fn display_slots(&self) -> &[usize] {
        &self.display_slots
    }

    /// Fresh accumulator instances cloned from the prototypes
    pub fn new_instances(&self) -> Vec<Accumulator> {
        self.prototypes.clone()
    }

    /// Whether every configured measurement is defined on this data
    pub fn can_measure(&self, n_points: i64, weight: f64) -> bool {
        self.primary
            .map_or(true, |m| m.can_measure(n_points, weight))
            && self
                .display
                .map_or(true, |m| m.can_measure(n_points, weight))
    }

    /// Primary measurement over union-ordered accumulators
    pub fn measure_primary(
        &self,
        accumulators: &[Accumulator],
        n_points: i64,
        weight: f64,
    ) -> Option<f64> {
        self.primary.map(|m| {
            let n = m.required_accumulators().len();
            m.measure(&accumulators[..n], n_points, weight)
        })
    }

    /// Display measurement over union-ordered accumulators
    pub fn measure_display(
        &self,
        accumulators: &[Accumulator],
        n_points: i64,
        weight: f64,
    ) -> Option<f64> {
        self.display.map(|m| {
            let slots: Vec<Accumulator> = self
                .display_slots
                .iter()
                .map(|&i| accumulators[i])
                .collect();
            m.measure(&slots, n_points, weight)
        })
    }
}
