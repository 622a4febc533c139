//! Semi-Lagrangian advection with trilinear sampling.

use glam::Vec3;
use rayon::prelude::*;

use crate::boundary::set_boundaries;
use crate::constants::{ADVECT_MARGIN, ADVECT_MIN};
use crate::grid::{CellType, Classification, FieldKind};
use crate::lattice::Lattice;

/// Velocity field used to trace cells backward.
#[derive(Clone, Copy)]
pub struct Flow<'a> {
    pub x: &'a [f32],
    pub y: &'a [f32],
    pub z: &'a [f32],
}

/// Trilinear interpolation of `field` at grid coordinate `pos`.
///
/// The eight lattice points around `pos` are read through clamped indexing,
/// so a point on the last cell blends with itself instead of reading past
/// the edge.
#[inline]
pub fn sample_trilinear(field: &[f32], lattice: Lattice, pos: Vec3) -> f32 {
    let base = pos.floor();
    let frac = pos - base;
    let (i0, j0, k0) = (base.x as i32, base.y as i32, base.z as i32);
    let (i1, j1, k1) = (i0 + 1, j0 + 1, k0 + 1);

    let (s1, t1, u1) = (frac.x, frac.y, frac.z);
    let (s0, t0, u0) = (1.0 - s1, 1.0 - t1, 1.0 - u1);

    let at = |i, j, k| field[lattice.cell_index(i, j, k)];

    s0 * (t0 * (u0 * at(i0, j0, k0) + u1 * at(i0, j0, k1))
        + t1 * (u0 * at(i0, j1, k0) + u1 * at(i0, j1, k1)))
        + s1 * (t0 * (u0 * at(i1, j0, k0) + u1 * at(i1, j0, k1))
            + t1 * (u0 * at(i1, j1, k0) + u1 * at(i1, j1, k1)))
}

/// Advect `d0` along `flow` for one timestep, writing interior cells of `d`.
///
/// Each interior cell is traced back by `dt * (N-2) * v` and the source is
/// clamped to `[0.5, N-0.5]` on every axis. Solid cells are not sampled:
/// velocity kinds become zero and scalars keep the value already in `d`.
#[allow(clippy::too_many_arguments)]
pub fn advect(
    kind: FieldKind,
    d: &mut [f32],
    d0: &[f32],
    flow: Flow<'_>,
    dt: f32,
    lattice: Lattice,
    classification: &Classification,
) {
    let n = lattice.n();
    let slab = lattice.slab_len();
    let dt0 = dt * (n - 2) as f32;
    let lo = Vec3::splat(ADVECT_MIN);
    let hi = Vec3::splat(n as f32 - ADVECT_MARGIN);
    let types = classification.cell_type();

    d.par_chunks_mut(slab).enumerate().for_each(|(z, plane)| {
        if z == 0 || z == n - 1 {
            return;
        }
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                let idx = lattice.index(x, y, z);
                let local = x + y * n;

                if types[idx] == CellType::Solid {
                    if kind.is_velocity() {
                        plane[local] = 0.0;
                    }
                    continue;
                }

                let v = Vec3::new(flow.x[idx], flow.y[idx], flow.z[idx]);
                let source = (Vec3::new(x as f32, y as f32, z as f32) - dt0 * v).clamp(lo, hi);
                plane[local] = sample_trilinear(d0, lattice, source);
            }
        }
    });

    set_boundaries(kind, d, lattice, classification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_at_lattice_point() {
        let lattice = Lattice::new(4);
        let field: Vec<f32> = (0..lattice.len()).map(|i| i as f32).collect();
        let idx = lattice.index(1, 2, 3);
        assert_eq!(sample_trilinear(&field, lattice, Vec3::new(1.0, 2.0, 3.0)), field[idx]);
    }

    #[test]
    fn test_sample_midpoint() {
        let lattice = Lattice::new(4);
        let mut field = vec![0.0; lattice.len()];
        field[lattice.index(1, 1, 1)] = 8.0;
        // Centre of the cube spanning (1,1,1)..(2,2,2) weights each corner 1/8.
        let v = sample_trilinear(&field, lattice, Vec3::splat(1.5));
        assert!((v - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_past_edge_aliases() {
        let lattice = Lattice::new(4);
        let field = vec![3.0; lattice.len()];
        let v = sample_trilinear(&field, lattice, Vec3::splat(3.5));
        assert!((v - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_velocity_is_identity() {
        let lattice = Lattice::new(6);
        let class = Classification::all_fluid(lattice.len());
        let d0: Vec<f32> = (0..lattice.len()).map(|i| (i % 11) as f32).collect();
        let zero = vec![0.0; lattice.len()];
        let mut d = vec![0.0; lattice.len()];

        let flow = Flow { x: &zero, y: &zero, z: &zero };
        advect(FieldKind::Density, &mut d, &d0, flow, 0.1, lattice, &class);

        for z in 1..5 {
            for y in 1..5 {
                for x in 1..5 {
                    let idx = lattice.index(x, y, z);
                    assert!((d[idx] - d0[idx]).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_uniform_flow_shifts_field() {
        let lattice = Lattice::new(10);
        let class = Classification::all_fluid(lattice.len());
        let mut d0 = vec![0.0; lattice.len()];
        d0[lattice.index(4, 5, 5)] = 1.0;

        // dt * (N-2) * vx = 1 cell per step
        let vx = vec![1.25; lattice.len()];
        let zero = vec![0.0; lattice.len()];
        let mut d = vec![0.0; lattice.len()];

        let flow = Flow { x: &vx, y: &zero, z: &zero };
        advect(FieldKind::Density, &mut d, &d0, flow, 0.1, lattice, &class);

        assert!((d[lattice.index(5, 5, 5)] - 1.0).abs() < 1e-5);
        assert!(d[lattice.index(4, 5, 5)].abs() < 1e-5);
    }

    #[test]
    fn test_solid_cells_skip_sampling() {
        let lattice = Lattice::new(6);
        let mut types = vec![CellType::Fluid; lattice.len()];
        let mut fractions = vec![1.0; lattice.len()];
        let solid = lattice.index(2, 2, 2);
        types[solid] = CellType::Solid;
        fractions[solid] = 0.0;
        let class = Classification::from_parts(types, fractions);

        let d0 = vec![4.0; lattice.len()];
        let zero = vec![0.0; lattice.len()];
        let flow = Flow { x: &zero, y: &zero, z: &zero };

        let mut vel = vec![9.0; lattice.len()];
        advect(FieldKind::Vx, &mut vel, &d0, flow, 0.1, lattice, &class);
        assert_eq!(vel[solid], 0.0);
        assert_eq!(vel[lattice.index(3, 2, 2)], 4.0);
    }
}
