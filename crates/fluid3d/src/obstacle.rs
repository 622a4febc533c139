//! Obstacles: a collision shape placed in the grid by position and scale.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, Result};
use crate::geometry::{Aabb, CollisionShape};

/// Handle returned when an obstacle is added to a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obstacle#{}", self.0)
    }
}

/// A static shape embedded in the lattice.
///
/// `position` is in grid coordinates. A grid point `p` maps into the shape's
/// local frame as `(p - position) / scale`.
#[derive(Clone, Debug)]
pub struct Obstacle {
    pub(crate) id: ObstacleId,
    pub(crate) position: Vec3,
    pub(crate) scale: Vec3,
    pub(crate) enabled: bool,
    shape: Arc<dyn CollisionShape>,
}

impl Obstacle {
    /// Enabled obstacle at the origin with unit scale.
    pub fn new<S: CollisionShape + 'static>(shape: S) -> Self {
        Self::from_shared(Arc::new(shape))
    }

    /// Same as [`Obstacle::new`], sharing an existing shape (e.g. one mesh
    /// placed several times).
    pub fn from_shared(shape: Arc<dyn CollisionShape>) -> Self {
        Self {
            id: ObstacleId(0),
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            enabled: true,
            shape,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Assigned by the simulation on add. `ObstacleId(0)` until then.
    pub fn id(&self) -> ObstacleId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn shape(&self) -> &dyn CollisionShape {
        self.shape.as_ref()
    }

    /// Check the transform can be inverted.
    pub fn validate(&self) -> Result<()> {
        validate_position(self.position)?;
        validate_scale(self.scale)
    }

    /// Map a grid-space box into the shape's local frame.
    #[inline]
    pub fn cell_to_local(&self, cell: &Aabb) -> Aabb {
        Aabb::from_corners(
            (cell.min - self.position) / self.scale,
            (cell.max - self.position) / self.scale,
        )
    }

    /// Factor converting a local-frame volume into grid units.
    #[inline]
    pub fn volume_scale(&self) -> f32 {
        (self.scale.x * self.scale.y * self.scale.z).abs()
    }

    /// Bounds of the placed shape in grid coordinates.
    pub fn grid_aabb(&self) -> Aabb {
        let local = self.shape.local_aabb();
        Aabb::from_corners(
            self.position + local.min * self.scale,
            self.position + local.max * self.scale,
        )
    }
}

pub(crate) fn validate_position(position: Vec3) -> Result<()> {
    if position.is_finite() {
        Ok(())
    } else {
        Err(FluidError::NonFinitePosition(position))
    }
}

pub(crate) fn validate_scale(scale: Vec3) -> Result<()> {
    if scale.is_finite() && scale.cmpne(Vec3::ZERO).all() {
        Ok(())
    } else {
        Err(FluidError::InvalidScale(scale))
    }
}
