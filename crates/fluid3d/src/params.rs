//! Construction parameters for a simulation.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DIFFUSION, DEFAULT_DT, DEFAULT_RESOLUTION, DEFAULT_VISCOSITY, DEFAULT_WORLD_SCALE,
};
use crate::error::{FluidError, Result};

/// Parameters fixed for the lifetime of a simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidParams {
    /// Cells per side (`N`). Must be greater than 2.
    #[serde(default = "default_resolution")]
    pub resolution: usize,

    /// World units per cell, for presentation only
    #[serde(default = "default_world_scale")]
    pub world_scale: f32,

    /// Density diffusion constant
    #[serde(default = "default_diffusion")]
    pub diffusion: f32,

    /// Kinematic viscosity applied to each velocity component
    #[serde(default = "default_viscosity")]
    pub viscosity: f32,

    /// Timestep per `step()`
    #[serde(default = "default_dt")]
    pub dt: f32,
}

fn default_resolution() -> usize {
    DEFAULT_RESOLUTION
}

fn default_world_scale() -> f32 {
    DEFAULT_WORLD_SCALE
}

fn default_diffusion() -> f32 {
    DEFAULT_DIFFUSION
}

fn default_viscosity() -> f32 {
    DEFAULT_VISCOSITY
}

fn default_dt() -> f32 {
    DEFAULT_DT
}

impl Default for FluidParams {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            world_scale: default_world_scale(),
            diffusion: default_diffusion(),
            viscosity: default_viscosity(),
            dt: default_dt(),
        }
    }
}

impl FluidParams {
    pub fn validate(&self) -> Result<()> {
        if self.resolution <= 2 {
            return Err(FluidError::InvalidResolution(self.resolution));
        }
        // Lattice clamps coordinates as i32
        if self.resolution > i32::MAX as usize {
            return Err(FluidError::InvalidResolution(self.resolution));
        }
        if !(self.world_scale.is_finite() && self.world_scale > 0.0) {
            return Err(FluidError::InvalidParameter {
                name: "world_scale",
                value: self.world_scale,
            });
        }
        if !(self.diffusion.is_finite() && self.diffusion >= 0.0) {
            return Err(FluidError::InvalidParameter {
                name: "diffusion",
                value: self.diffusion,
            });
        }
        if !(self.viscosity.is_finite() && self.viscosity >= 0.0) {
            return Err(FluidError::InvalidParameter {
                name: "viscosity",
                value: self.viscosity,
            });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(FluidError::InvalidParameter {
                name: "dt",
                value: self.dt,
            });
        }
        Ok(())
    }
}
