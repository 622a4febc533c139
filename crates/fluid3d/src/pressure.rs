//! Pressure projection for the collocated stable-fluids grid.
//!
//! Removes the divergent part of a velocity field: compute the divergence,
//! relax the pressure Poisson equation, subtract the pressure gradient.
//! Cut cells scale both the divergence and the correction by their fluid
//! fraction. Solid cells carry no divergence, no pressure and no velocity.

use rayon::prelude::*;

use crate::boundary::set_boundaries;
use crate::constants::CENTRAL_DIFF;
use crate::grid::{CellType, Classification, FieldKind};
use crate::lattice::Lattice;
use crate::relax::lin_solve;

/// Velocity components being projected.
pub struct Velocity<'a> {
    pub x: &'a mut [f32],
    pub y: &'a mut [f32],
    pub z: &'a mut [f32],
}

/// Weight applied to divergence and gradient terms of a cell.
#[inline]
fn flux_weight(kind: CellType, fraction: f32) -> Option<f32> {
    match kind {
        CellType::Solid => None,
        CellType::CutCell => Some(fraction),
        CellType::Fluid | CellType::Undefined => Some(1.0),
    }
}

/// Compute `div = -0.5 * (Δvx + Δvy + Δvz) / N` and zero `p` on the interior.
pub fn compute_divergence(
    vx: &[f32],
    vy: &[f32],
    vz: &[f32],
    div: &mut [f32],
    p: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let n = lattice.n();
    let slab = lattice.slab_len();
    let inv_n = 1.0 / n as f32;
    let types = classification.cell_type();
    let fractions = classification.fluid_fraction();

    div.par_chunks_mut(slab)
        .zip(p.par_chunks_mut(slab))
        .enumerate()
        .for_each(|(z, (div_plane, p_plane))| {
            if z == 0 || z == n - 1 {
                return;
            }
            for y in 1..n - 1 {
                for x in 1..n - 1 {
                    let idx = lattice.index(x, y, z);
                    let local = x + y * n;
                    p_plane[local] = 0.0;

                    div_plane[local] = match flux_weight(types[idx], fractions[idx]) {
                        None => 0.0,
                        Some(weight) => {
                            let sum = vx[idx + 1] - vx[idx - 1] + vy[idx + n] - vy[idx - n]
                                + vz[idx + slab]
                                - vz[idx - slab];
                            -CENTRAL_DIFF * weight * sum * inv_n
                        }
                    };
                }
            }
        });
}

/// Subtract `0.5 * Δp * N` from each velocity component on the interior.
pub fn apply_pressure_gradient(
    velocity: &mut Velocity<'_>,
    p: &[f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let n = lattice.n();
    let slab = lattice.slab_len();
    let scale = CENTRAL_DIFF * n as f32;
    let types = classification.cell_type();
    let fractions = classification.fluid_fraction();

    velocity
        .x
        .par_chunks_mut(slab)
        .zip(velocity.y.par_chunks_mut(slab))
        .zip(velocity.z.par_chunks_mut(slab))
        .enumerate()
        .for_each(|(z, ((vx, vy), vz))| {
            if z == 0 || z == n - 1 {
                return;
            }
            for y in 1..n - 1 {
                for x in 1..n - 1 {
                    let idx = lattice.index(x, y, z);
                    let local = x + y * n;

                    match flux_weight(types[idx], fractions[idx]) {
                        None => {
                            vx[local] = 0.0;
                            vy[local] = 0.0;
                            vz[local] = 0.0;
                        }
                        Some(weight) => {
                            let s = scale * weight;
                            vx[local] -= s * (p[idx + 1] - p[idx - 1]);
                            vy[local] -= s * (p[idx + n] - p[idx - n]);
                            vz[local] -= s * (p[idx + slab] - p[idx - slab]);
                        }
                    }
                }
            }
        });
}

/// Project `velocity` onto an approximately divergence-free field.
///
/// `p` and `div` are caller-owned scratch fields; both are overwritten.
pub fn project(
    velocity: &mut Velocity<'_>,
    p: &mut [f32],
    div: &mut [f32],
    scratch: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    // 1. Divergence, pressure reset
    compute_divergence(velocity.x, velocity.y, velocity.z, div, p, lattice, classification);

    // 2. Walls and solids on both scalars
    set_boundaries(FieldKind::Density, div, lattice, classification);
    set_boundaries(FieldKind::Density, p, lattice, classification);

    // 3. Poisson solve
    lin_solve(FieldKind::Density, p, div, 1.0, 6.0, scratch, lattice, classification);

    // 4. Gradient subtraction
    apply_pressure_gradient(velocity, p, lattice, classification);

    // 5. Walls and solids on velocity
    set_boundaries(FieldKind::Vx, velocity.x, lattice, classification);
    set_boundaries(FieldKind::Vy, velocity.y, lattice, classification);
    set_boundaries(FieldKind::Vz, velocity.z, lattice, classification);
}
