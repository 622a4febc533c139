//! Fixed-iteration Jacobi relaxation on the 6-neighbour stencil.
//!
//! Solves `x = (x0 + a * Σ neighbours(x)) / c` over the interior cells.
//! Each sweep reads a frozen copy of `x` and writes `x`, so z-slabs are
//! updated in parallel without any cell seeing a neighbour from the same
//! sweep. Walls and solid cells are left to [`set_boundaries`] after every
//! sweep.

use rayon::prelude::*;

use crate::boundary::set_boundaries;
use crate::constants::RELAX_ITERATIONS;
use crate::grid::{Classification, FieldKind};
use crate::lattice::Lattice;

/// Run [`RELAX_ITERATIONS`] Jacobi sweeps of the implicit system.
///
/// `scratch` must be the same length as `x`; its contents are overwritten.
#[allow(clippy::too_many_arguments)]
pub fn lin_solve(
    kind: FieldKind,
    x: &mut [f32],
    x0: &[f32],
    a: f32,
    c: f32,
    scratch: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let c_recip = 1.0 / c;
    let n = lattice.n();
    let slab = lattice.slab_len();

    for _ in 0..RELAX_ITERATIONS {
        // Copy current values to scratch (source for this sweep)
        scratch.copy_from_slice(x);
        let src: &[f32] = scratch;

        x.par_chunks_mut(slab).enumerate().for_each(|(z, plane)| {
            if z == 0 || z == n - 1 {
                return;
            }
            for y in 1..n - 1 {
                for i in 1..n - 1 {
                    let idx = lattice.index(i, y, z);
                    let neighbours = src[idx - 1]
                        + src[idx + 1]
                        + src[idx - n]
                        + src[idx + n]
                        + src[idx - slab]
                        + src[idx + slab];
                    plane[i + y * n] = (x0[idx] + a * neighbours) * c_recip;
                }
            }
        });

        set_boundaries(kind, x, lattice, classification);
    }
}
