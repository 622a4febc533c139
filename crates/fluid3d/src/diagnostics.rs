//! Read-only statistics over a field store.
//!
//! Nothing here runs inside `step()`. Callers use these to watch for mass
//! loss, blow-up, or residual divergence.

use crate::grid::{CellType, FluidGrid};
use crate::lattice::Lattice;

/// Visit every interior cell index (`1..=N-2` on each axis).
fn for_each_interior(lattice: Lattice, mut f: impl FnMut(usize)) {
    let n = lattice.n();
    for z in 1..n - 1 {
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                f(lattice.index(x, y, z));
            }
        }
    }
}

/// Sum of density over interior cells. Wall cells mirror their neighbours
/// and are excluded so they are not counted twice.
pub fn total_density(grid: &FluidGrid) -> f32 {
    let density = grid.density();
    let mut sum = 0.0f64;
    for_each_interior(grid.lattice(), |idx| sum += density[idx] as f64);
    sum as f32
}

/// Volume-averaged kinetic energy over interior cells: `0.5 * <|v|²>`.
pub fn kinetic_energy(grid: &FluidGrid) -> f32 {
    let (vx, vy, vz) = (grid.vx(), grid.vy(), grid.vz());
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for_each_interior(grid.lattice(), |idx| {
        let v2 = vx[idx] * vx[idx] + vy[idx] * vy[idx] + vz[idx] * vz[idx];
        sum += v2 as f64;
        count += 1;
    });
    if count > 0 {
        (0.5 * sum / count as f64) as f32
    } else {
        0.0
    }
}

/// Largest central-difference divergence magnitude over non-solid interior
/// cells, in the same units the projection step uses.
pub fn max_divergence(grid: &FluidGrid) -> f32 {
    let lattice = grid.lattice();
    let n = lattice.n();
    let slab = lattice.slab_len();
    let types = grid.classification().cell_type();
    let (vx, vy, vz) = (grid.vx(), grid.vy(), grid.vz());

    let mut max = 0.0f32;
    for_each_interior(lattice, |idx| {
        if types[idx] == CellType::Solid {
            return;
        }
        let div = 0.5
            * (vx[idx + 1] - vx[idx - 1] + vy[idx + n] - vy[idx - n] + vz[idx + slab]
                - vz[idx - slab])
            / n as f32;
        max = max.max(div.abs());
    });
    max
}

/// Number of NaN or infinite entries across density and velocity.
pub fn non_finite_count(grid: &FluidGrid) -> usize {
    [grid.density(), grid.vx(), grid.vy(), grid.vz()]
        .iter()
        .map(|field| field.iter().filter(|v| !v.is_finite()).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_total_density_skips_walls() {
        let mut grid = FluidGrid::new(6);
        grid.add_density(Vec3::new(2.0, 2.0, 2.0), 3.0);
        grid.add_density(Vec3::new(0.0, 2.0, 2.0), 100.0);
        assert!((total_density(&grid) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_kinetic_energy() {
        let mut grid = FluidGrid::new(4);
        // 2³ interior cells, one moving at |v| = 2
        grid.add_velocity(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 2.0, 0.0));
        assert!((kinetic_energy(&grid) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_count() {
        let mut grid = FluidGrid::new(4);
        assert_eq!(non_finite_count(&grid), 0);
        grid.vx_mut()[5] = f32::NAN;
        grid.density_mut()[7] = f32::INFINITY;
        assert_eq!(non_finite_count(&grid), 2);
    }

    #[test]
    fn test_max_divergence_of_still_fluid() {
        let grid = FluidGrid::new(8);
        assert_eq!(max_divergence(&grid), 0.0);
    }
}
