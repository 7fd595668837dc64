use crate::binning::{BinningSummary, SpatialBinner};
use crate::bounds::BoundingBox;
use crate::config::CouplingConfig;
use crate::entity::EntityStore;
use crate::error::Result;
use crate::quadrature::{
    generate_quadrature, EstimationMode, LoadSummary, QuadratureBuffer, QuadratureCountEstimator,
    QuadraturePointGenerator, QuadratureSummary,
};

/// Outcome of one neighbor-list rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildSummary {
    pub bin_counts: [usize; 3],
    pub total_bins: usize,
    pub binning: BinningSummary,
    pub load: LoadSummary,
}

/// Ties binning and load estimation together for a coupled simulation.
///
/// The driver calls [`CoupledIndex::rebuild`] once per neighbor-list rebuild;
/// between rebuilds, bin memberships and load weights are read-only.
pub struct CoupledIndex {
    config: CouplingConfig,
    binner: SpatialBinner,
    estimator: QuadratureCountEstimator,
}

impl CoupledIndex {
    /// Validates `config` against the entity container.
    pub fn new(config: CouplingConfig, store: &EntityStore) -> Result<Self> {
        let estimator = QuadratureCountEstimator::new(&config, store)?;
        let binner = SpatialBinner::new(config.bin_size);
        Ok(Self { config, binner, estimator })
    }

    pub fn config(&self) -> &CouplingConfig {
        &self.config
    }

    pub fn binner(&self) -> &SpatialBinner {
        &self.binner
    }

    pub fn estimator(&self) -> &QuadratureCountEstimator {
        &self.estimator
    }

    /// Rebuilds the bin grid, bins every entity and refreshes local load weights.
    pub fn rebuild(
        &mut self,
        store: &mut EntityStore,
        sub_domain: &BoundingBox<3>,
        mode: EstimationMode,
    ) -> Result<RebuildSummary> {
        let grid = self.binner.setup_bins(sub_domain, self.config.interaction_range())?;
        let bin_counts = grid.counts;
        let total_bins = grid.total;

        let binning = self.binner.bin_atoms(store)?;
        let load = self.estimator.estimate(store, mode)?;

        log::debug!(
            "rebuild: {:?} bins, {} entities ({} elements), {} crossing, {:?} load total {} max {}",
            bin_counts,
            binning.entities,
            binning.elements,
            binning.crossing,
            load.mode,
            load.total,
            load.max
        );

        Ok(RebuildSummary { bin_counts, total_bins, binning, load })
    }

    /// Hands the surface layout of every local element to `generator`.
    pub fn generate_quadrature<G: QuadraturePointGenerator>(
        &self,
        store: &EntityStore,
        generator: &mut G,
        buffer: &mut QuadratureBuffer,
    ) -> Result<QuadratureSummary> {
        generate_quadrature(store, self.estimator.geometry(), self.estimator.rank(), generator, buffer)
    }

    /// Bytes held by the binner.
    pub fn memory_usage(&self) -> usize {
        self.binner.memory_usage()
    }
}
