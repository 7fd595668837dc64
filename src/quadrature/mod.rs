//! Quadrature load estimation for coupled elements.
//!
//! [`GeometryEstimator`] turns an element's shape and the interaction cutoff
//! into surface bands, [`QuadratureCountEstimator`] turns bands (or observed
//! neighbor counters) into load weights, and [`generate_quadrature`] hands
//! bands to an external [`QuadraturePointGenerator`].

pub mod count;
pub mod generator;
pub mod geometry;

pub use count::observed_weight;
pub use count::predicted_weight;
pub use count::EstimationMode;
pub use count::InteractionCounts;
pub use count::LoadSummary;
pub use count::ModeKind;
pub use count::NeighborStatistics;
pub use count::QuadratureCountEstimator;
pub use generator::generate_quadrature;
pub use generator::QuadratureBuffer;
pub use generator::QuadraturePointGenerator;
pub use generator::QuadratureRequest;
pub use generator::QuadratureSummary;
pub use geometry::GeometryEstimator;
pub use geometry::SurfaceLayout;
