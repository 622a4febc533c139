//! Obstacle voxelization: classify every cell as Fluid, Solid or CutCell.
//!
//! A cell is the unit box `[x, x+1] × [y, y+1] × [z, z+1]`. For every enabled
//! obstacle the box is mapped into the shape's local frame and tested:
//! - swallowed by the shape: Solid
//! - touched by the shape: the covered volume is added to the cell's total
//!
//! The fluid fraction is `clamp(1 - covered / cell_volume, 0, 1)`; 1 means
//! Fluid, 0 means Solid, anything between is a CutCell.
//!
//! [`classify`] is a pure function of the lattice size and the obstacle list,
//! so it can run on a snapshot off the simulation thread and be installed
//! between ticks.

use rayon::prelude::*;

use crate::constants::CELL_VOLUME;
use crate::geometry::Aabb;
use crate::grid::{CellType, Classification};
use crate::lattice::Lattice;
use crate::obstacle::Obstacle;

/// Classify every cell of `lattice` against the enabled `obstacles`.
pub fn classify(lattice: Lattice, obstacles: &[Obstacle]) -> Classification {
    let enabled: Vec<&Obstacle> = obstacles.iter().filter(|o| o.is_enabled()).collect();

    // Nothing to test against
    if enabled.is_empty() {
        return Classification::all_fluid(lattice.len());
    }

    let bounds: Vec<Aabb> = enabled.iter().map(|o| o.grid_aabb()).collect();

    let mut cell_type = vec![CellType::Undefined; lattice.len()];
    let mut fluid_fraction = vec![0.0f32; lattice.len()];

    cell_type
        .par_iter_mut()
        .zip(fluid_fraction.par_iter_mut())
        .enumerate()
        .for_each(|(idx, (kind, fraction))| {
            let (x, y, z) = lattice.coords(idx);
            let (k, f) = classify_cell(&Aabb::unit_cell(x, y, z), &enabled, &bounds);
            *kind = k;
            *fraction = f;
        });

    debug_assert!(!cell_type.contains(&CellType::Undefined));

    Classification::from_parts(cell_type, fluid_fraction)
}

/// Snapshot of everything [`classify`] needs, detached from the simulation
/// so it can be sent to another thread.
#[derive(Clone, Debug)]
pub struct VoxelJob {
    pub(crate) lattice: Lattice,
    pub(crate) obstacles: Vec<Obstacle>,
    pub(crate) generation: u64,
    pub(crate) owner: u64,
}

impl VoxelJob {
    pub fn run(self) -> Voxelization {
        Voxelization {
            classification: classify(self.lattice, &self.obstacles),
            generation: self.generation,
            owner: self.owner,
        }
    }
}

/// Output of a [`VoxelJob`], tagged with the simulation that issued it and
/// the obstacle-set generation it saw.
#[derive(Clone, Debug)]
pub struct Voxelization {
    pub(crate) classification: Classification,
    pub(crate) generation: u64,
    pub(crate) owner: u64,
}

impl Voxelization {
    pub fn classification(&self) -> &Classification {
        &self.classification
    }
}

/// Classification and fluid fraction of one cell.
fn classify_cell(cell: &Aabb, obstacles: &[&Obstacle], bounds: &[Aabb]) -> (CellType, f32) {
    let mut covered = 0.0f32;

    for (obstacle, grid_bounds) in obstacles.iter().zip(bounds) {
        if !grid_bounds.intersects(cell) {
            continue;
        }

        let local = obstacle.cell_to_local(cell);
        let shape = obstacle.shape();

        if shape.contains_aabb(&local) {
            return (CellType::Solid, 0.0);
        }
        if shape.intersects_aabb(&local) {
            covered += shape.overlap_volume(&local) * obstacle.volume_scale() / CELL_VOLUME;
        }
    }

    let fluid = (1.0 - covered).clamp(0.0, 1.0);
    if fluid >= 1.0 {
        (CellType::Fluid, 1.0)
    } else if fluid <= 0.0 {
        (CellType::Solid, 0.0)
    } else {
        (CellType::CutCell, fluid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Cuboid, Sphere};
    use glam::Vec3;

    #[test]
    fn test_no_obstacles_all_fluid() {
        let lattice = Lattice::new(6);
        let class = classify(lattice, &[]);
        assert_eq!(class.count(CellType::Fluid), lattice.len());
        assert!(class.fluid_fraction().iter().all(|&f| f == 1.0));
    }

    #[test]
    fn test_disabled_obstacle_ignored() {
        let lattice = Lattice::new(6);
        let obstacle = Obstacle::new(Cuboid::new(Vec3::splat(10.0))).with_enabled(false);
        let class = classify(lattice, &[obstacle]);
        assert_eq!(class.count(CellType::Fluid), lattice.len());
    }

    #[test]
    fn test_aligned_box_is_solid() {
        let lattice = Lattice::new(8);
        // Covers cells 2..=4 on every axis
        let obstacle = Obstacle::new(Cuboid::new(Vec3::splat(1.5))).with_position(Vec3::splat(3.5));
        let class = classify(lattice, &[obstacle]);

        for idx in 0..lattice.len() {
            let (x, y, z) = lattice.coords(idx);
            let inside = (2..=4).contains(&x) && (2..=4).contains(&y) && (2..=4).contains(&z);
            let expected = if inside { CellType::Solid } else { CellType::Fluid };
            assert_eq!(class.cell_type()[idx], expected, "cell ({}, {}, {})", x, y, z);
        }
        assert_eq!(class.solid_cells().len(), 27);
    }

    #[test]
    fn test_half_covered_cells_are_cut() {
        let lattice = Lattice::new(8);
        // x in [2, 4.5]: cell 4 is half covered
        let obstacle = Obstacle::new(Cuboid::new(Vec3::new(1.25, 10.0, 10.0)))
            .with_position(Vec3::new(3.25, 4.0, 4.0));
        let class = classify(lattice, &[obstacle]);

        let cut = lattice.index(4, 3, 3);
        assert_eq!(class.cell_type()[cut], CellType::CutCell);
        assert!((class.fluid_fraction()[cut] - 0.5).abs() < 1e-5);
        assert_eq!(class.cell_type()[lattice.index(3, 3, 3)], CellType::Solid);
        assert_eq!(class.cell_type()[lattice.index(5, 3, 3)], CellType::Fluid);
    }

    #[test]
    fn test_overlapping_obstacles_sum_to_solid() {
        let lattice = Lattice::new(6);
        // Two slabs each covering half of x in [2, 3]
        let left = Obstacle::new(Cuboid::new(Vec3::new(0.25, 10.0, 10.0)))
            .with_position(Vec3::new(2.25, 3.0, 3.0));
        let right = Obstacle::new(Cuboid::new(Vec3::new(0.25, 10.0, 10.0)))
            .with_position(Vec3::new(2.75, 3.0, 3.0));
        let class = classify(lattice, &[left, right]);

        assert_eq!(class.cell_type()[lattice.index(2, 3, 3)], CellType::Solid);
        assert_eq!(class.fluid_fraction()[lattice.index(2, 3, 3)], 0.0);
    }

    #[test]
    fn test_scaled_sphere_has_cut_shell() {
        let lattice = Lattice::new(16);
        let obstacle = Obstacle::new(Sphere::new(1.0))
            .with_position(Vec3::splat(8.0))
            .with_scale(Vec3::splat(4.0));
        let class = classify(lattice, &[obstacle]);

        assert_eq!(class.cell_type()[lattice.index(8, 8, 8)], CellType::Solid);
        assert_eq!(class.cell_type()[lattice.index(1, 1, 1)], CellType::Fluid);
        assert!(class.count(CellType::CutCell) > 0);
        assert_eq!(class.count(CellType::Undefined), 0);

        for (&kind, &fraction) in class.cell_type().iter().zip(class.fluid_fraction()) {
            match kind {
                CellType::CutCell => assert!(fraction > 0.0 && fraction < 1.0),
                CellType::Fluid => assert_eq!(fraction, 1.0),
                CellType::Solid => assert_eq!(fraction, 0.0),
                CellType::Undefined => unreachable!(),
            }
        }
    }
}
