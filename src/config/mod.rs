//! Process-wide settings for binning and quadrature counting.

use crate::entity::ElementFamily;
use crate::error::{CacError, Result};
use serde::Deserialize;

/// Weight of the outer channel added on top of `inner + outer` in observed mode.
pub const OUTER_SHELL_SCALE: u64 = 0;
/// Weight of the additional-shell channel in observed mode.
pub const ADDITIONAL_SHELL_SCALE: u64 = 0;

/// Interaction family of the active potential.
///
/// Replaces per-potential virtual dispatch: the set of supported
/// (interaction, element family) pairs is fixed here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionModel {
    /// Plain pair potential; only the primary cutoff matters.
    #[default]
    Pairwise,
    /// Embedded-atom style: densities are gathered from an additional shell.
    EmbeddedAtom,
    /// Bond-order style (Tersoff-like) with neighbors-of-neighbors.
    ManyBody,
}

impl InteractionModel {
    /// Maximum distance at which two entities interact.
    pub fn interaction_range(self, cutoff: f64, additional_cutoff: f64) -> f64 {
        match self {
            InteractionModel::Pairwise => cutoff,
            InteractionModel::EmbeddedAtom | InteractionModel::ManyBody => cutoff + additional_cutoff,
        }
    }

    pub fn supports(self, family: ElementFamily) -> bool {
        match (self, family) {
            (InteractionModel::Pairwise, ElementFamily::Hex8) => true,
            (InteractionModel::EmbeddedAtom, ElementFamily::Hex8) => true,
            (InteractionModel::ManyBody, ElementFamily::Hex8) => true,
        }
    }
}

/// Coupling configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CouplingConfig {
    /// Global interaction cutoff (force cutoff plus skin).
    pub cutoff: f64,
    /// Quadrature points per local axis in an element's interior core.
    #[serde(default = "default_quadrature_rank")]
    pub quadrature_rank: u32,
    /// Force a single unit-cell surface band on every axis.
    #[serde(default)]
    pub one_layer: bool,
    /// Observed mode counts only the outer interaction channel.
    #[serde(default)]
    pub outer_shell_only: bool,
    #[serde(default)]
    pub interaction: InteractionModel,
    /// Extra range of the additional shell for many-body models.
    #[serde(default)]
    pub additional_cutoff: f64,
    /// User bin size; defaults to half the interaction range.
    #[serde(default)]
    pub bin_size: Option<f64>,
    #[serde(default = "default_outer_shell_scale")]
    pub outer_shell_scale: u64,
    #[serde(default = "default_additional_shell_scale")]
    pub additional_shell_scale: u64,
}

fn default_quadrature_rank() -> u32 {
    2
}
fn default_outer_shell_scale() -> u64 {
    OUTER_SHELL_SCALE
}
fn default_additional_shell_scale() -> u64 {
    ADDITIONAL_SHELL_SCALE
}

impl CouplingConfig {
    pub fn new(cutoff: f64) -> Self {
        Self {
            cutoff,
            quadrature_rank: default_quadrature_rank(),
            one_layer: false,
            outer_shell_only: false,
            interaction: InteractionModel::default(),
            additional_cutoff: 0.0,
            bin_size: None,
            outer_shell_scale: OUTER_SHELL_SCALE,
            additional_shell_scale: ADDITIONAL_SHELL_SCALE,
        }
    }

    /// Range used to size the bin grid and its ghost layers.
    pub fn interaction_range(&self) -> f64 {
        self.interaction.interaction_range(self.cutoff, self.additional_cutoff)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(CacError::InvalidConfig(format!("cutoff must be positive, got {}", self.cutoff)));
        }
        if self.quadrature_rank == 0 {
            return Err(CacError::InvalidConfig("quadrature rank must be at least 1".into()));
        }
        if !(self.additional_cutoff.is_finite() && self.additional_cutoff >= 0.0) {
            return Err(CacError::InvalidConfig(format!(
                "additional cutoff must be non-negative, got {}",
                self.additional_cutoff
            )));
        }
        if let Some(size) = self.bin_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(CacError::InvalidConfig(format!("bin size must be positive, got {}", size)));
            }
        }
        Ok(())
    }
}
