//! Implicit diffusion of one field.

use crate::grid::{Classification, FieldKind};
use crate::lattice::Lattice;
use crate::relax::lin_solve;

/// Relaxation coefficients `(a, c)` for diffusing with constant `diff` over `dt`.
///
/// `a = dt * diff * (N-2)³`, `c = 1 + 6a`.
#[inline]
pub fn diffusion_coefficients(n: usize, diff: f32, dt: f32) -> (f32, f32) {
    let interior = (n - 2) as f32;
    let a = dt * diff * interior * interior * interior;
    (a, 1.0 + 6.0 * a)
}

/// Diffuse `x0` into `x`.
#[allow(clippy::too_many_arguments)]
pub fn diffuse(
    kind: FieldKind,
    x: &mut [f32],
    x0: &[f32],
    diff: f32,
    dt: f32,
    scratch: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let (a, c) = diffusion_coefficients(lattice.n(), diff, dt);
    lin_solve(kind, x, x0, a, c, scratch, lattice, classification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients() {
        let (a, c) = diffusion_coefficients(24, 1e-6, 0.1);
        let expected = 0.1 * 1e-6 * 22.0f32.powi(3);
        assert!((a - expected).abs() < 1e-9);
        assert!((c - (1.0 + 6.0 * expected)).abs() < 1e-6);

        assert_eq!(diffusion_coefficients(24, 0.0, 0.1), (0.0, 1.0));
    }

    #[test]
    fn test_zero_diffusion_copies_interior() {
        let lattice = Lattice::new(6);
        let class = Classification::all_fluid(lattice.len());
        let mut x0 = vec![0.0; lattice.len()];
        x0[lattice.index(2, 3, 2)] = 9.0;
        let mut x = vec![0.0; lattice.len()];
        let mut scratch = vec![0.0; lattice.len()];

        diffuse(FieldKind::Density, &mut x, &x0, 0.0, 0.1, &mut scratch, lattice, &class);

        assert_eq!(x[lattice.index(2, 3, 2)], 9.0);
        assert_eq!(x[lattice.index(3, 3, 2)], 0.0);
    }

    #[test]
    fn test_diffusion_lowers_peak() {
        let lattice = Lattice::new(10);
        let class = Classification::all_fluid(lattice.len());
        let centre = lattice.index(5, 5, 5);
        let mut x0 = vec![0.0; lattice.len()];
        x0[centre] = 1.0;
        let mut x = vec![0.0; lattice.len()];
        let mut scratch = vec![0.0; lattice.len()];

        diffuse(FieldKind::Density, &mut x, &x0, 0.001, 0.1, &mut scratch, lattice, &class);

        assert!(x[centre] < 1.0);
        assert!(x[lattice.index(6, 5, 5)] > 0.0);
    }
}
