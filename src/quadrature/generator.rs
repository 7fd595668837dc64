use crate::entity::{ElementFamily, EntityId, EntityKind, EntityStore};
use crate::error::{CacError, Result};
use crate::quadrature::count::predicted_weight;
use crate::quadrature::geometry::{GeometryEstimator, SurfaceLayout};

/// Everything a quadrature generator needs to know about one element.
#[derive(Clone, Copy, Debug)]
pub struct QuadratureRequest<'a> {
    pub id: EntityId,
    pub family: ElementFamily,
    /// All nodal positions, copy-major.
    pub nodes: &'a [[f64; 3]],
    pub scale: [u32; 3],
    pub poly_count: u32,
    pub layout: SurfaceLayout,
    /// Quadrature points per axis in the interior core.
    pub rank: u32,
}

impl QuadratureRequest<'_> {
    /// Upper bound on the points the request should produce, for reserving storage.
    pub fn expected_points(&self) -> usize {
        predicted_weight(self.rank, self.layout.band_counts, self.poly_count) as usize
    }
}

/// Flat storage of quadrature points for many elements.
#[derive(Clone, Debug, Default)]
pub struct QuadratureBuffer {
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
    offsets: Vec<usize>,
    owners: Vec<EntityId>,
}

impl QuadratureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.weights.clear();
        self.offsets.clear();
        self.owners.clear();
    }

    /// Number of elements with an entry in the buffer.
    pub fn element_count(&self) -> usize {
        self.owners.len()
    }

    /// Points and weights emitted for `id`.
    pub fn element(&self, id: EntityId) -> Option<(&[[f64; 3]], &[f64])> {
        let slot = self.owners.iter().position(|&o| o == id)?;
        let start = self.offsets[slot];
        let end = self.offsets.get(slot + 1).copied().unwrap_or(self.points.len());
        Some((&self.points[start..end], &self.weights[start..end]))
    }
}

/// Emits literal quadrature coordinates and weights for one element.
///
/// Implementations append to `out.points` and `out.weights`, one weight per point.
pub trait QuadraturePointGenerator {
    fn generate(&mut self, request: &QuadratureRequest<'_>, out: &mut QuadratureBuffer) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuadratureSummary {
    pub elements: usize,
    pub points: usize,
    /// Largest point count of a single element, used to size per-point scratch.
    pub max_per_element: usize,
}

/// Runs `generator` over every local element of `store`, replacing the contents of `buffer`.
pub fn generate_quadrature<G: QuadraturePointGenerator>(
    store: &EntityStore,
    geometry: &GeometryEstimator,
    rank: u32,
    generator: &mut G,
    buffer: &mut QuadratureBuffer,
) -> Result<QuadratureSummary> {
    buffer.clear();
    let mut summary = QuadratureSummary::default();

    for entity in store.locals() {
        let EntityKind::Element(family) = entity.kind else {
            continue;
        };
        let request = QuadratureRequest {
            id: entity.id,
            family,
            nodes: entity.nodes,
            scale: entity.scale,
            poly_count: entity.poly_count,
            layout: geometry.surface_layout(family, entity.copy_nodes(0), entity.scale),
            rank,
        };

        let start = buffer.points.len();
        buffer.offsets.push(start);
        buffer.owners.push(entity.id);
        buffer.points.reserve(request.expected_points());
        generator.generate(&request, buffer)?;

        let points = buffer.points.len() - start;
        let weights = buffer.weights.len() - start;
        if points != weights {
            return Err(CacError::GeneratorMismatch { id: entity.id, points, weights });
        }
        summary.elements += 1;
        summary.points += points;
        summary.max_per_element = summary.max_per_element.max(points);
    }

    Ok(summary)
}
