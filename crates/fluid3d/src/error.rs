//! Errors surfaced by construction and obstacle management.
//!
//! The per-tick pipeline never fails; only building a simulation, building a
//! mesh shape, or changing the obstacle set can return one of these.

use crate::obstacle::ObstacleId;

#[derive(Debug, thiserror::Error)]
pub enum FluidError {
    #[error("grid resolution must be greater than 2, got {0}")]
    InvalidResolution(usize),

    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("mesh has no vertex data")]
    MissingVertices,

    #[error("mesh has no triangle data")]
    MissingTriangles,

    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    TriangleIndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("mesh vertex {0} is not finite")]
    NonFiniteVertex(usize),

    #[error("obstacle scale must be finite and non-zero on every axis, got {0:?}")]
    InvalidScale(glam::Vec3),

    #[error("obstacle position must be finite, got {0:?}")]
    NonFinitePosition(glam::Vec3),

    #[error("unknown {0}")]
    UnknownObstacle(ObstacleId),

    #[error("voxelization was produced by a different simulation")]
    ForeignVoxelization,

    #[error("classification covers {actual} cells, grid has {expected}")]
    ClassificationSizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, FluidError>;
