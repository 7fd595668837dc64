//! # cacbin
//!
//! `cacbin` is the indexing core of a coupled atomistic-continuum simulation, usable from Rust
//! and compiled to WebAssembly (WASM). It places point particles and finite elements into a
//! uniform spatial bin grid and estimates how many quadrature points each element needs.
//!
//! ## Features
//!
//! - **Spatial Binning**: One uniform grid for entities of very different size. Particles land in
//!   a single bin, elements in every bin their bounding box overlaps.
//! - **Surface Bands**: Closed-form subdivision of an element into interior core and
//!   near-surface quadrature bands from the interaction cutoff.
//! - **Load Weights**: Predicted from geometry before the first neighbor pass, observed from
//!   interaction counters afterwards, and never zero.
//! - **WASM-first**: `wasm-bindgen` bindings for driving rebuilds from JavaScript and TypeScript.
//!
//! ## Main Interface
//!
//! The primary entry point is the [`CoupledIndex`] struct, which owns the [`SpatialBinner`] and
//! the [`QuadratureCountEstimator`] and runs one rebuild over an [`EntityStore`].

mod bounds;
mod error;
pub mod binning;
pub mod config;
pub mod entity;
pub mod quadrature;
mod rebuild;
mod wasm;

pub use binning::BinGrid;
pub use binning::BinningSummary;
pub use binning::SpatialBinner;
pub use bounds::BoundingBox;
pub use config::CouplingConfig;
pub use config::InteractionModel;
pub use entity::hex8_nodes;
pub use entity::ElementFamily;
pub use entity::Entity;
pub use entity::EntityId;
pub use entity::EntityKind;
pub use entity::EntityStore;
pub use entity::Ownership;
pub use error::CacError;
pub use error::Result;
pub use quadrature::EstimationMode;
pub use quadrature::GeometryEstimator;
pub use quadrature::InteractionCounts;
pub use quadrature::LoadSummary;
pub use quadrature::ModeKind;
pub use quadrature::NeighborStatistics;
pub use quadrature::QuadratureBuffer;
pub use quadrature::QuadratureCountEstimator;
pub use quadrature::QuadraturePointGenerator;
pub use quadrature::QuadratureRequest;
pub use quadrature::SurfaceLayout;
pub use rebuild::CoupledIndex;
pub use rebuild::RebuildSummary;
pub use wasm::CoupledSystem3D;
