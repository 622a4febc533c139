//! Tuned solver constants and default parameters.

// =============================================================================
// SOLVER
// =============================================================================

/// Relaxation sweeps per linear solve. Fixed, convergence is never checked.
pub const RELAX_ITERATIONS: usize = 4;

/// Weight applied to the sum of three axis neighbours at a domain corner.
pub const CORNER_WEIGHT: f32 = 1.0 / 3.0;

/// Weight applied to the sum of two face neighbours along a domain edge.
pub const EDGE_WEIGHT: f32 = 0.5;

/// Central difference half-step used by divergence and gradient.
pub const CENTRAL_DIFF: f32 = 0.5;

/// Lower clamp of a back-traced advection source coordinate.
pub const ADVECT_MIN: f32 = 0.5;

/// Distance below `N` of the upper advection clamp.
pub const ADVECT_MARGIN: f32 = 0.5;

// =============================================================================
// VOXELIZER
// =============================================================================

/// Samples per axis when a shape estimates its overlap with a cell by
/// point sampling (`OVERLAP_SAMPLES³` points per cell).
pub const OVERLAP_SAMPLES: usize = 4;

/// Volume of one lattice cell in simulation units.
pub const CELL_VOLUME: f32 = 1.0;

// =============================================================================
// DEFAULTS
// =============================================================================

pub const DEFAULT_RESOLUTION: usize = 32;
pub const DEFAULT_WORLD_SCALE: f32 = 1.0;
pub const DEFAULT_DIFFUSION: f32 = 0.0;
pub const DEFAULT_VISCOSITY: f32 = 1e-6;
pub const DEFAULT_DT: f32 = 0.1;
