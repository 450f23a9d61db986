//! The resampling pipeline: configuration, orchestration, materialization,
//! and gap extrapolation.

pub mod config;
pub mod materialize;
pub mod extrapolate;

pub use config::ResampleConfig;
pub use extrapolate::extrapolate_gaps;

use crate::core::types::Result;
use crate::data::{DataSet, FieldAssociation, ScalarAttribute};
use crate::grid::{GapAnalyzer, GridBuilder, Lattice, MultiResGrid};
use crate::measure::MeasurementSet;
use crate::tree::{HyperTreeGrid, ScalarArray};

use materialize::Materializer;

/// Resamples datasets onto adaptive hyper tree grids.
///
/// Construct with a validated [`ResampleConfig`], then call
/// [`Resampler::resample`] per dataset. The builder is stateless across
/// runs apart from the configuration itself.
pub struct Resampler {
    config: ResampleConfig,
    min_cache: f64,
    max_cache: f64,
    progress: Option<Box<dyn Fn(f64)>>,
}

impl Resampler {
    pub fn new(config: ResampleConfig) -> Result<Self> {
        config.validate()?;
        let min_cache = config.min;
        let max_cache = config.max;
        Ok(Self {
            config,
            min_cache,
            max_cache,
            progress: None,
        })
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ResampleConfig {
        &mut self.config
    }

    /// Observe monotone progress in [0, 1] at the pipeline's callouts
    pub fn set_progress_callback(&mut self, callback: impl Fn(f64) + 'static) {
        self.progress = Some(Box::new(callback));
    }

    /// Disable the lower range bound (stashing it) or restore the tighter
    /// of the stashed and current values.
    pub fn set_min_enabled(&mut self, enabled: bool) {
        if !enabled {
            if self.config.min == f64::NEG_INFINITY {
                return;
            }
            self.min_cache = self.config.min;
            self.config.min = f64::NEG_INFINITY;
        } else {
            self.config.min = self.min_cache.max(self.config.min);
        }
    }

    /// Disable the upper range bound (stashing it) or restore the tighter
    /// of the stashed and current values.
    pub fn set_max_enabled(&mut self, enabled: bool) {
        if !enabled {
            if self.config.max == f64::INFINITY {
                return;
            }
            self.max_cache = self.config.max;
            self.config.max = f64::INFINITY;
        } else {
            self.config.max = self.max_cache.min(self.config.max);
        }
    }

    fn report(&self, progress: f64) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    /// Resample `attribute` over `dataset` into a new hyper tree grid
    pub fn resample(
        &self,
        dataset: &DataSet,
        attribute: &ScalarAttribute,
    ) -> Result<HyperTreeGrid> {
        self.report(0.0);
        let cfg = &self.config;
        let mut output = HyperTreeGrid::new(cfg.dimensions, cfg.branch_factor);

        let n_samples = match attribute.association() {
            FieldAssociation::Points => dataset.n_points(),
            FieldAssociation::Cells => dataset.n_cells(),
        };
        if n_samples == 0 {
            log::debug!("no data to resample");
            self.report(1.0);
            return Ok(output);
        }

        let bounds = dataset.bounds();
        output.set_uniform_coordinates(&bounds);
        let lattice = Lattice::new(bounds, output.cell_dims(), cfg.branch_factor, cfg.max_depth);
        let measures = MeasurementSet::new(cfg.measurement, cfg.display_measurement);

        if measures.primary().is_some() {
            output.set_measure_array(ScalarArray::new(format!("{}_measure", attribute.name())));
        }
        if measures.display().is_some() {
            output.set_display_array(ScalarArray::new(attribute.name()));
        }

        let mut grids: Vec<MultiResGrid> = if attribute.matches(dataset) {
            GridBuilder::new(&lattice, &measures, cfg.min_points_per_subtree)
                .build(dataset, attribute)
        } else {
            log::warn!(
                "attribute '{}' carries {} values for {} associated elements; skipping aggregation",
                attribute.name(),
                attribute.len(),
                n_samples
            );
            (0..lattice.n_trees())
                .map(|_| MultiResGrid::new(cfg.max_depth))
                .collect()
        };
        self.report(0.5);

        let mark_empty =
            cfg.extrapolate && attribute.association() == FieldAssociation::Points;
        if cfg.no_empty_cells || mark_empty {
            GapAnalyzer::new(&lattice).analyze(&mut grids, dataset, mark_empty);
        }

        Materializer::new(&lattice, &measures, cfg.min, cfg.max, cfg.in_range)
            .generate(&mut output, &grids);
        drop(grids);

        if mark_empty {
            extrapolate_gaps(&mut output);
        }

        self.report(1.0);
        Ok(output)
    }
}
