use crate::config::{CouplingConfig, InteractionModel};
use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::error::{CacError, Result};
use crate::quadrature::geometry::GeometryEstimator;

/// Accumulated interaction counters of one entity from the last neighbor pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionCounts {
    pub inner: u64,
    pub outer: u64,
    pub additional: u64,
}

impl InteractionCounts {
    pub fn new(inner: u64, outer: u64, additional: u64) -> Self {
        Self { inner, outer, additional }
    }

    /// Replaces zero channels by 1.
    ///
    /// A zero only appears when entities were lost between passes, and the
    /// balancer needs a nonzero weight rather than an exact one.
    pub fn sanitized(self) -> Self {
        let fix = |v: u64| if v == 0 { 1 } else { v };
        Self {
            inner: fix(self.inner),
            outer: fix(self.outer),
            additional: fix(self.additional),
        }
    }
}

/// Interaction counters gathered for every local entity during a neighbor pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborStatistics {
    counts: Vec<InteractionCounts>,
}

impl NeighborStatistics {
    pub fn new(counts: Vec<InteractionCounts>) -> Self {
        Self { counts }
    }

    /// Number of local entities the statistics were gathered for.
    pub fn entity_count(&self) -> usize {
        self.counts.len()
    }

    pub fn get(&self, id: EntityId) -> Option<InteractionCounts> {
        self.counts.get(id.0).copied()
    }
}

/// How load weights are produced for one rebuild.
///
/// Observed statistics are moved in and consumed by the estimation pass, so a
/// following rebuild falls back to prediction unless fresh statistics arrive.
#[derive(Clone, Debug, PartialEq)]
pub enum EstimationMode {
    /// Analytic weights from element geometry.
    Predictive,
    /// Weights from the previous neighbor pass.
    Observed(NeighborStatistics),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeKind {
    Predictive,
    Observed,
}

impl EstimationMode {
    /// Observed mode if statistics exist and match the current local count.
    pub fn select(stats: Option<NeighborStatistics>, local_count: usize) -> Self {
        match stats {
            Some(stats) if stats.entity_count() == local_count => EstimationMode::Observed(stats),
            _ => EstimationMode::Predictive,
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            EstimationMode::Predictive => ModeKind::Predictive,
            EstimationMode::Observed(_) => ModeKind::Observed,
        }
    }
}

/// Result of one estimation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadSummary {
    pub mode: ModeKind,
    pub entities: usize,
    pub total: u64,
    pub max: u64,
}

/// Quadrature points of an element with `rank` points per axis in its core and
/// `bands` surface layers per axis, at full density on faces, edges and corners.
pub fn predicted_weight(rank: u32, bands: [u32; 3], poly_count: u32) -> u64 {
    let r = rank as u64;
    let [n1, n2, n3] = bands.map(u64::from);
    // Saturates instead of wrapping for very finely scaled elements.
    let r2 = r.saturating_mul(r);
    let face = (n1 + n2 + n3).saturating_mul(2).saturating_mul(r2);
    let edge = n1
        .saturating_mul(n2)
        .saturating_add(n2.saturating_mul(n3))
        .saturating_add(n1.saturating_mul(n3))
        .saturating_mul(4)
        .saturating_mul(r);
    let corner = n1.saturating_mul(n2).saturating_mul(n3).saturating_mul(8);
    let per_copy = r2
        .saturating_mul(r)
        .saturating_add(face)
        .saturating_add(edge)
        .saturating_add(corner);
    per_copy.saturating_mul(poly_count as u64)
}

/// Weight from observed counters. Zero channels count as 1.
pub fn observed_weight(counts: InteractionCounts, outer_only: bool, outer_scale: u64, additional_scale: u64) -> u64 {
    let c = counts.sanitized();
    if outer_only {
        c.outer
    } else {
        c.inner
            .saturating_add(c.outer)
            .saturating_add(outer_scale.saturating_mul(c.outer))
            .saturating_add(additional_scale.saturating_mul(c.additional))
    }
}

/// Produces the per-entity load weights used for sizing and load balancing.
#[derive(Clone, Debug)]
pub struct QuadratureCountEstimator {
    geometry: GeometryEstimator,
    rank: u32,
    interaction: InteractionModel,
    outer_shell_only: bool,
    outer_shell_scale: u64,
    additional_shell_scale: u64,
}

impl QuadratureCountEstimator {
    /// Fails unless the container supports the coupled particle/element model.
    pub fn new(config: &CouplingConfig, store: &EntityStore) -> Result<Self> {
        if !store.is_coupled() {
            return Err(CacError::CoupledModelRequired);
        }
        config.validate()?;
        Ok(Self {
            geometry: GeometryEstimator::new(config.cutoff, config.one_layer),
            rank: config.quadrature_rank,
            interaction: config.interaction,
            outer_shell_only: config.outer_shell_only,
            outer_shell_scale: config.outer_shell_scale,
            additional_shell_scale: config.additional_shell_scale,
        })
    }

    pub fn geometry(&self) -> &GeometryEstimator {
        &self.geometry
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Analytic weight of a single entity.
    pub fn predict(&self, entity: &Entity<'_>) -> u64 {
        match entity.kind {
            EntityKind::Particle => 1,
            EntityKind::Element(family) => {
                let layout = self.geometry.surface_layout(family, entity.copy_nodes(0), entity.scale);
                predicted_weight(self.rank, layout.band_counts, entity.poly_count)
            }
        }
    }

    /// Writes a load weight to every local entity of `store`.
    pub fn estimate(&self, store: &mut EntityStore, mode: EstimationMode) -> Result<LoadSummary> {
        if !store.is_coupled() {
            return Err(CacError::CoupledModelRequired);
        }
        let local_count = store.local_count();
        let mode = match mode {
            EstimationMode::Observed(stats) if stats.entity_count() != local_count => {
                log::debug!(
                    "neighbor statistics cover {} entities but {} are local; predicting instead",
                    stats.entity_count(),
                    local_count
                );
                EstimationMode::Predictive
            }
            mode => mode,
        };

        let mut weights = Vec::with_capacity(local_count);
        for entity in store.locals() {
            if let EntityKind::Element(family) = entity.kind {
                if !self.interaction.supports(family) {
                    return Err(CacError::UnsupportedCombination { model: self.interaction, family });
                }
            }
            let weight = match &mode {
                EstimationMode::Predictive => self.predict(&entity),
                EstimationMode::Observed(stats) => {
                    let counts = stats.get(entity.id).unwrap_or_default();
                    observed_weight(
                        counts,
                        self.outer_shell_only,
                        self.outer_shell_scale,
                        self.additional_shell_scale,
                    )
                }
            };
            weights.push(weight.max(1));
        }

        let mut summary = LoadSummary { mode: mode.kind(), entities: local_count, total: 0, max: 0 };
        for (i, w) in weights.into_iter().enumerate() {
            store.set_load_weight(EntityId(i), w);
            summary.total = summary.total.saturating_add(w);
            summary.max = summary.max.max(w);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{hex8_nodes, ElementFamily, Ownership};

    #[test]
    fn test_predicted_weight_core_only() {
        for rank in 1..5 {
            let r = rank as u64;
            assert_eq!(predicted_weight(rank, [0, 0, 0], 1), r * r * r);
            assert_eq!(predicted_weight(rank, [0, 0, 0], 3), 3 * r * r * r);
        }
    }

    #[test]
    fn test_predicted_weight_single_face_band() {
        assert_eq!(predicted_weight(2, [1, 0, 0], 1), 16);
        assert_eq!(predicted_weight(2, [1, 0, 0], 2), 32);
    }

    #[test]
    fn test_predicted_weight_full_shell() {
        // (r + 2n)^3 when all bands are equal.
        assert_eq!(predicted_weight(2, [1, 1, 1], 1), 64);
        assert_eq!(predicted_weight(3, [2, 2, 2], 1), 343);
    }

    #[test]
    fn test_predicted_weight_saturates() {
        let n = 1 << 21;
        assert_eq!(predicted_weight(2, [n, n, n], 1), u64::MAX);
        assert_eq!(predicted_weight(u32::MAX, [0, 0, 0], u32::MAX), u64::MAX);
        assert_eq!(observed_weight(InteractionCounts::new(u64::MAX, 5, 0), false, 0, 0), u64::MAX);
    }

    #[test]
    fn test_huge_scale_element_saturates() {
        let mut store = EntityStore::new();
        let scale = 1 << 22;
        store
            .push_element(ElementFamily::Hex8, [scale; 3], 1, &hex8_nodes([0.0; 3], [1.0; 3]), Ownership::Local)
            .unwrap();
        store
            .push_element(ElementFamily::Hex8, [scale; 3], 1, &hex8_nodes([0.0; 3], [1.0; 3]), Ownership::Local)
            .unwrap();

        // Cutoff covers the whole element: 2^21 bands per axis.
        let est = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap();
        let summary = est.estimate(&mut store, EstimationMode::Predictive).unwrap();
        assert_eq!(store.load_weights(), &[u64::MAX, u64::MAX]);
        assert_eq!(summary.total, u64::MAX);
        assert_eq!(summary.max, u64::MAX);
    }

    #[test]
    fn test_observed_zero_substitution() {
        let counts = InteractionCounts::new(0, 5, 3);
        assert_eq!(observed_weight(counts, false, 0, 0), 6);
        assert_eq!(observed_weight(counts, true, 0, 0), 5);
        assert_eq!(observed_weight(InteractionCounts::default(), false, 0, 0), 2);
        assert_eq!(observed_weight(InteractionCounts::default(), true, 0, 0), 1);
    }

    #[test]
    fn test_observed_scaling_constants() {
        let counts = InteractionCounts::new(4, 5, 3);
        assert_eq!(observed_weight(counts, false, 1, 2), 4 + 5 + 5 + 6);
    }

    #[test]
    fn test_mode_selection() {
        let stats = NeighborStatistics::new(vec![InteractionCounts::new(1, 2, 3); 4]);
        assert_eq!(EstimationMode::select(None, 4).kind(), ModeKind::Predictive);
        assert_eq!(EstimationMode::select(Some(stats.clone()), 5).kind(), ModeKind::Predictive);
        assert_eq!(EstimationMode::select(Some(stats), 4).kind(), ModeKind::Observed);
    }

    #[test]
    fn test_requires_coupled_store() {
        let store = EntityStore::atomistic_only();
        let err = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap_err();
        assert_eq!(err, CacError::CoupledModelRequired);
    }

    #[test]
    fn test_estimate_writes_weights() {
        let mut store = EntityStore::new();
        store.push_particle([1.0; 3], Ownership::Local).unwrap();
        store
            .push_element(ElementFamily::Hex8, [8, 8, 8], 2, &[hex8_nodes([0.0; 3], [32.0; 3]); 2].concat(), Ownership::Local)
            .unwrap();
        store.push_particle([40.0; 3], Ownership::Ghost).unwrap();

        let est = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap();
        let summary = est.estimate(&mut store, EstimationMode::Predictive).unwrap();

        // One band per axis at rank 2: (2 + 2)^3 = 64 per copy.
        assert_eq!(store.load_weights(), &[1, 128]);
        assert_eq!(summary, LoadSummary { mode: ModeKind::Predictive, entities: 2, total: 129, max: 128 });

        let stats = NeighborStatistics::new(vec![InteractionCounts::new(0, 0, 0), InteractionCounts::new(10, 7, 0)]);
        let summary = est.estimate(&mut store, EstimationMode::Observed(stats)).unwrap();
        assert_eq!(store.load_weights(), &[2, 17]);
        assert_eq!(summary.mode, ModeKind::Observed);
    }

    #[test]
    fn test_mismatched_statistics_fall_back() {
        let mut store = EntityStore::new();
        store.push_particle([1.0; 3], Ownership::Local).unwrap();
        let est = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap();
        let stats = NeighborStatistics::new(vec![InteractionCounts::new(9, 9, 9); 3]);
        let summary = est.estimate(&mut store, EstimationMode::Observed(stats)).unwrap();
        assert_eq!(summary.mode, ModeKind::Predictive);
        assert_eq!(store.load_weights(), &[1]);
    }
}
