//! Domain-wall and solid-cell conditions for a single field.
//!
//! Order of a pass:
//! 1. Solid cells: velocity is zeroed, scalars take the mean of their
//!    non-solid axis neighbours (zero when there are none).
//! 2. Faces copy the adjacent interior cell. The velocity component normal
//!    to a face is negated instead.
//! 3. Edges take the mean of their two face neighbours.
//! 4. Corners take the mean of their three axis neighbours.
//!
//! Solid cells on the walls keep the value from step 1.

use crate::constants::{CORNER_WEIGHT, EDGE_WEIGHT};
use crate::grid::{Classification, FieldKind};
use crate::lattice::Lattice;

/// Apply wall and solid conditions to `field` in place.
pub fn set_boundaries(
    kind: FieldKind,
    field: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    debug_assert_eq!(field.len(), lattice.len());

    apply_solid_cells(kind, field, lattice, classification);
    apply_faces(kind, field, lattice, classification);
    apply_edges(field, lattice, classification);
    apply_corners(field, lattice, classification);
}

/// Step 1: no-slip velocity and neighbour-averaged scalars inside obstacles.
fn apply_solid_cells(
    kind: FieldKind,
    field: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let solid = classification.solid_cells();
    if solid.is_empty() {
        return;
    }

    if kind.is_velocity() {
        for &idx in solid {
            field[idx] = 0.0;
        }
        return;
    }

    // Reads only non-solid cells, so the write order does not matter.
    let n = lattice.n() as i32;
    for &idx in solid {
        let (x, y, z) = lattice.coords(idx);
        let (x, y, z) = (x as i32, y as i32, z as i32);

        let mut sum = 0.0;
        let mut count = 0u32;
        for (dx, dy, dz) in NEIGHBOURS {
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if nx < 0 || ny < 0 || nz < 0 || nx >= n || ny >= n || nz >= n {
                continue;
            }
            let nidx = lattice.cell_index(nx, ny, nz);
            if !classification.is_solid(nidx) {
                sum += field[nidx];
                count += 1;
            }
        }

        field[idx] = if count > 0 { sum / count as f32 } else { 0.0 };
    }
}

const NEIGHBOURS: [(i32, i32, i32); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// Step 2: the six faces, excluding their edges and corners.
fn apply_faces(
    kind: FieldKind,
    field: &mut [f32],
    lattice: Lattice,
    classification: &Classification,
) {
    let n = lattice.n();
    let hi = n - 1;
    let normal = kind.normal_axis();

    for axis in 0..3 {
        let sign = if normal == Some(axis) { -1.0 } else { 1.0 };

        for b in 1..hi {
            for a in 1..hi {
                // (wall cell, interior neighbour) at the low then high face
                for (wall, inner) in [(0, 1), (hi, hi - 1)] {
                    let (w_idx, i_idx) = match axis {
                        0 => (lattice.index(wall, a, b), lattice.index(inner, a, b)),
                        1 => (lattice.index(a, wall, b), lattice.index(a, inner, b)),
                        _ => (lattice.index(a, b, wall), lattice.index(a, b, inner)),
                    };
                    if classification.is_solid(w_idx) {
                        continue;
                    }
                    field[w_idx] = sign * field[i_idx];
                }
            }
        }
    }
}

/// Step 3: the twelve edges, excluding corners.
fn apply_edges(field: &mut [f32], lattice: Lattice, classification: &Classification) {
    let hi = lattice.n() - 1;

    for t in 1..hi {
        for (u, su) in [(0, 1), (hi, hi - 1)] {
            for (v, sv) in [(0, 1), (hi, hi - 1)] {
                // Edge along x: (t, u, v), neighbours (t, su, v) and (t, u, sv)
                let edges = [
                    (
                        lattice.index(t, u, v),
                        lattice.index(t, su, v),
                        lattice.index(t, u, sv),
                    ),
                    (
                        lattice.index(u, t, v),
                        lattice.index(su, t, v),
                        lattice.index(u, t, sv),
                    ),
                    (
                        lattice.index(u, v, t),
                        lattice.index(su, v, t),
                        lattice.index(u, sv, t),
                    ),
                ];
                for (idx, p, q) in edges {
                    if classification.is_solid(idx) {
                        continue;
                    }
                    field[idx] = EDGE_WEIGHT * (field[p] + field[q]);
                }
            }
        }
    }
}

/// Step 4: the eight corners.
fn apply_corners(field: &mut [f32], lattice: Lattice, classification: &Classification) {
    let hi = lattice.n() - 1;

    for (x, sx) in [(0, 1), (hi, hi - 1)] {
        for (y, sy) in [(0, 1), (hi, hi - 1)] {
            for (z, sz) in [(0, 1), (hi, hi - 1)] {
                let idx = lattice.index(x, y, z);
                if classification.is_solid(idx) {
                    continue;
                }
                field[idx] = CORNER_WEIGHT
                    * (field[lattice.index(sx, y, z)]
                        + field[lattice.index(x, sy, z)]
                        + field[lattice.index(x, y, sz)]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellType;

    fn ramp(lattice: Lattice) -> Vec<f32> {
        (0..lattice.len()).map(|i| i as f32 * 0.01 + 1.0).collect()
    }

    #[test]
    fn test_faces_copy_scalars() {
        let lattice = Lattice::new(6);
        let class = Classification::all_fluid(lattice.len());
        let mut field = ramp(lattice);

        set_boundaries(FieldKind::Density, &mut field, lattice, &class);

        for a in 1..5 {
            for b in 1..5 {
                assert_eq!(field[lattice.index(0, a, b)], field[lattice.index(1, a, b)]);
                assert_eq!(field[lattice.index(a, 5, b)], field[lattice.index(a, 4, b)]);
                assert_eq!(field[lattice.index(a, b, 0)], field[lattice.index(a, b, 1)]);
            }
        }
    }

    #[test]
    fn test_normal_velocity_negated() {
        let lattice = Lattice::new(6);
        let class = Classification::all_fluid(lattice.len());
        let mut vx = ramp(lattice);

        set_boundaries(FieldKind::Vx, &mut vx, lattice, &class);

        for a in 1..5 {
            for b in 1..5 {
                // x walls negate, y/z walls copy
                assert_eq!(vx[lattice.index(0, a, b)], -vx[lattice.index(1, a, b)]);
                assert_eq!(vx[lattice.index(5, a, b)], -vx[lattice.index(4, a, b)]);
                assert_eq!(vx[lattice.index(a, 0, b)], vx[lattice.index(a, 1, b)]);
                assert_eq!(vx[lattice.index(a, b, 5)], vx[lattice.index(a, b, 4)]);
            }
        }
    }

    #[test]
    fn test_edges_and_corners_average() {
        let lattice = Lattice::new(5);
        let class = Classification::all_fluid(lattice.len());
        let mut field = ramp(lattice);

        set_boundaries(FieldKind::Density, &mut field, lattice, &class);

        let edge = field[lattice.index(2, 0, 0)];
        let expected = 0.5 * (field[lattice.index(2, 1, 0)] + field[lattice.index(2, 0, 1)]);
        assert!((edge - expected).abs() < 1e-6);

        let corner = field[lattice.index(4, 4, 0)];
        let expected = (field[lattice.index(3, 4, 0)]
            + field[lattice.index(4, 3, 0)]
            + field[lattice.index(4, 4, 1)])
            / 3.0;
        assert!((corner - expected).abs() < 1e-5);
    }

    #[test]
    fn test_uniform_scalar_is_fixed_point() {
        let lattice = Lattice::new(6);
        let class = Classification::all_fluid(lattice.len());
        let mut field = vec![2.5; lattice.len()];

        set_boundaries(FieldKind::Density, &mut field, lattice, &class);

        for &v in &field {
            assert!((v - 2.5).abs() < 1e-6, "uniform field changed: {}", v);
        }
    }

    fn with_solid(lattice: Lattice, solid: &[usize]) -> Classification {
        let mut types = vec![CellType::Fluid; lattice.len()];
        let mut fractions = vec![1.0; lattice.len()];
        for &idx in solid {
            types[idx] = CellType::Solid;
            fractions[idx] = 0.0;
        }
        Classification::from_parts(types, fractions)
    }

    #[test]
    fn test_solid_velocity_zeroed() {
        let lattice = Lattice::new(6);
        let solid = [lattice.index(2, 2, 2), lattice.index(0, 3, 3)];
        let class = with_solid(lattice, &solid);
        let mut vy = vec![3.0; lattice.len()];

        set_boundaries(FieldKind::Vy, &mut vy, lattice, &class);

        for idx in solid {
            assert_eq!(vy[idx], 0.0);
        }
    }

    #[test]
    fn test_solid_scalar_averages_fluid_neighbours() {
        let lattice = Lattice::new(6);
        let centre = lattice.index(2, 2, 2);
        // Block the -x neighbour too, so only five cells contribute.
        let class = with_solid(lattice, &[centre, lattice.index(1, 2, 2)]);
        let mut field = vec![0.0; lattice.len()];
        field[centre] = 100.0;
        field[lattice.index(3, 2, 2)] = 5.0;
        field[lattice.index(2, 3, 2)] = 5.0;

        set_boundaries(FieldKind::Density, &mut field, lattice, &class);

        assert!((field[centre] - 2.0).abs() < 1e-6, "got {}", field[centre]);
    }

    #[test]
    fn test_enclosed_solid_scalar_is_zero() {
        let lattice = Lattice::new(5);
        let all: Vec<usize> = (0..lattice.len()).collect();
        let class = with_solid(lattice, &all);
        let mut field = vec![7.0; lattice.len()];

        set_boundaries(FieldKind::Density, &mut field, lattice, &class);

        assert!(field.iter().all(|&v| v == 0.0));
    }
}
