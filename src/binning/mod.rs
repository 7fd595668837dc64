//! Uniform spatial binning of particles and finite elements.

mod grid;
mod overlap;

pub use grid::BinGrid;
pub use grid::MAX_BIN_COUNT;
pub use overlap::OverlapRecords;

use crate::bounds::BoundingBox;
use crate::entity::{EntityId, EntityKind, EntityStore};
use crate::error::{CacError, Result};

/// Elements overlapping more bins than this trigger a warning.
pub const LARGE_OVERLAP_WARNING: usize = 1 << 16;

/// Counts from one binning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinningSummary {
    pub entities: usize,
    pub particles: usize,
    pub elements: usize,
    /// Sum of bins overlapped over all entities.
    pub memberships: usize,
    /// Largest number of bins a single entity overlaps.
    pub max_overlap: usize,
    /// Entities straddling the sub-domain boundary.
    pub crossing: usize,
}

/// Maps every local and ghost entity to the bins its footprint overlaps.
///
/// Particles land in exactly one bin. Elements land in every bin their
/// bounding box intersects, and each element remembers those bins in its
/// overlap record. Storage is reused across rebuilds and only grows.
#[derive(Clone, Debug, Default)]
pub struct SpatialBinner {
    bin_size: Option<f64>,
    grid: Option<BinGrid>,
    bins: Vec<Vec<EntityId>>,
    records: OverlapRecords,
    crossing: Vec<EntityId>,
}

impl SpatialBinner {
    /// Creates a binner. `bin_size` overrides the default of half the interaction range.
    pub fn new(bin_size: Option<f64>) -> Self {
        Self { bin_size, ..Self::default() }
    }

    /// Lays out the bin grid for the current sub-domain.
    pub fn setup_bins(&mut self, sub_domain: &BoundingBox<3>, range: f64) -> Result<&BinGrid> {
        let grid = BinGrid::new(sub_domain, range, self.bin_size)?;
        Ok(self.grid.insert(grid))
    }

    pub fn grid(&self) -> Option<&BinGrid> {
        self.grid.as_ref()
    }

    /// Rebuilds bin memberships and overlap records for every entity in `store`.
    pub fn bin_atoms(&mut self, store: &EntityStore) -> Result<BinningSummary> {
        let grid = self
            .grid
            .as_ref()
            .ok_or_else(|| CacError::InvalidConfig("bins must be set up before binning".into()))?;

        self.bins.iter_mut().for_each(|bin| bin.clear());
        if self.bins.len() != grid.total {
            self.bins.resize_with(grid.total, Vec::new);
        }
        self.records.prepare(store.len());
        self.crossing.clear();

        let mut summary = BinningSummary { entities: store.len(), ..BinningSummary::default() };

        for entity in store.iter() {
            let id = entity.id;
            let slot = id.index();
            match entity.kind {
                EntityKind::Particle => {
                    let bin = grid.coord2bin(&entity.nodes[0], id)?;
                    self.records.reserve(slot, 1);
                    self.records.push(slot, bin);
                    self.bins[bin].push(id);
                    summary.particles += 1;
                    summary.memberships += 1;
                    summary.max_overlap = summary.max_overlap.max(1);
                }
                EntityKind::Element(_) => {
                    let footprint = entity.footprint();
                    let mut lo = [0usize; 3];
                    let mut hi = [0usize; 3];
                    for axis in 0..3 {
                        let (first, last) = grid
                            .axis_span(axis, footprint.min[axis], footprint.max[axis])
                            .ok_or(CacError::BinIndexOutOfRange { id, axis })?;
                        lo[axis] = first;
                        hi[axis] = last;
                    }

                    let overlap = (hi[0] - lo[0] + 1) * (hi[1] - lo[1] + 1) * (hi[2] - lo[2] + 1);
                    if overlap > LARGE_OVERLAP_WARNING {
                        log::warn!(
                            "element {} overlaps {} bins; bin limits are very large, simulation may be unstable",
                            slot,
                            overlap
                        );
                    }

                    self.records.reserve(slot, overlap);
                    for z in lo[2]..=hi[2] {
                        for y in lo[1]..=hi[1] {
                            for x in lo[0]..=hi[0] {
                                let bin = grid.bin_index([x, y, z]);
                                self.records.push(slot, bin);
                                self.bins[bin].push(id);
                            }
                        }
                    }

                    if grid.sub_domain.intersects(&footprint) && !grid.sub_domain.contains_box(&footprint) {
                        self.crossing.push(id);
                    }
                    summary.elements += 1;
                    summary.memberships += overlap;
                    summary.max_overlap = summary.max_overlap.max(overlap);
                }
            }
        }

        summary.crossing = self.crossing.len();
        Ok(summary)
    }

    /// Entities in bin `bin`, in store order.
    pub fn bin_members(&self, bin: usize) -> &[EntityId] {
        self.bins.get(bin).map_or(&[], |b| b.as_slice())
    }

    pub fn bins(&self) -> &[Vec<EntityId>] {
        &self.bins
    }

    /// Bins overlapped by `id` in the last pass.
    pub fn entity_bins(&self, id: EntityId) -> &[usize] {
        self.records.get(id.index())
    }

    /// High-water mark of bins reserved for `id`; never decreases within a run.
    pub fn overlap_capacity(&self, id: EntityId) -> usize {
        self.records.capacity(id.index())
    }

    pub fn records(&self) -> &OverlapRecords {
        &self.records
    }

    /// Entities whose footprint straddles the sub-domain boundary.
    pub fn crossing(&self) -> &[EntityId] {
        &self.crossing
    }

    /// Collects into `out` every other entity sharing the stencil around any bin `id` overlaps.
    pub fn candidates(&self, id: EntityId, out: &mut Vec<EntityId>) {
        out.clear();
        let Some(grid) = &self.grid else {
            return;
        };
        for &bin in self.entity_bins(id) {
            let c = grid.bin_coords(bin);
            for &offset in &grid.stencil {
                if let Some(neighbor) = grid.offset_bin(c, offset) {
                    out.extend(self.bins[neighbor].iter().copied().filter(|&j| j != id));
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    /// Bytes held by bin lists and overlap records.
    pub fn memory_usage(&self) -> usize {
        let bins: usize = self
            .bins
            .iter()
            .map(|b| b.capacity() * std::mem::size_of::<EntityId>())
            .sum();
        bins + self.bins.capacity() * std::mem::size_of::<Vec<EntityId>>()
            + self.records.memory_usage()
            + self.crossing.capacity() * std::mem::size_of::<EntityId>()
    }
}
