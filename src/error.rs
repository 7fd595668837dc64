//! Error types for cacbin.
//!
//! Every variant except the data-loss case (which is recovered silently and
//! never surfaces) is fatal for the current rebuild. The surrounding driver
//! decides whether to abort the run or retry on the next rebuild.

use crate::entity::{ElementFamily, EntityId};
use crate::config::InteractionModel;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CacError {
    #[error("quadrature counting requires an entity container with coupled particle/element support")]
    CoupledModelRequired,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("interaction model {model:?} does not support element family {family:?}")]
    UnsupportedCombination {
        model: InteractionModel,
        family: ElementFamily,
    },

    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    #[error("element {id:?} has a zero-length local axis {axis}")]
    DegenerateAxis { id: Option<EntityId>, axis: usize },

    #[error("cannot use neighbor bins: sub-domain extent {extent} along axis {axis} is smaller than interaction range {range}")]
    DegenerateDomain { axis: usize, extent: f64, range: f64 },

    #[error("domain too large for neighbor bins ({requested} bins requested)")]
    TooManyBins { requested: u128 },

    #[error("excessive or negative bin index for entity {id:?} along axis {axis}")]
    BinIndexOutOfRange { id: EntityId, axis: usize },

    #[error("quadrature generator wrote {points} points but {weights} weights for entity {id:?}")]
    GeneratorMismatch {
        id: EntityId,
        points: usize,
        weights: usize,
    },
}

pub type Result<T> = std::result::Result<T, CacError>;
