//! Field store for the cubic stable-fluids lattice.
//!
//! All quantities are cell-centred and stored as one flat `Vec` per field,
//! indexed through [`Lattice`]. The classification (cell types and fluid
//! fractions) is produced by the voxelizer and only replaced between ticks.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

/// Cell classification produced by voxelization.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Fully inside an obstacle (no-slip wall)
    Solid,
    /// Unobstructed fluid
    #[default]
    Fluid,
    /// Partially covered by obstacle geometry
    CutCell,
    /// Not yet classified. Only seen inside a voxelization pass.
    Undefined,
}

/// Which quantity a field holds. Selects the wall rule in
/// [`crate::boundary::set_boundaries`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldKind {
    Vx,
    Vy,
    Vz,
    /// Density, and any other cell-centred scalar (pressure, divergence).
    Density,
}

impl FieldKind {
    /// Axis (0 = x, 1 = y, 2 = z) whose walls negate this field.
    #[inline]
    pub fn normal_axis(self) -> Option<usize> {
        match self {
            FieldKind::Vx => Some(0),
            FieldKind::Vy => Some(1),
            FieldKind::Vz => Some(2),
            FieldKind::Density => None,
        }
    }

    #[inline]
    pub fn is_velocity(self) -> bool {
        self.normal_axis().is_some()
    }
}

/// Per-cell classification plus the cached fluid fraction of every cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    cell_type: Vec<CellType>,
    fluid_fraction: Vec<f32>,
    /// Indices of every Solid cell, for the boundary pass.
    solid_cells: Vec<usize>,
}

impl Classification {
    /// Every cell Fluid with fraction 1.
    pub fn all_fluid(cell_count: usize) -> Self {
        Self {
            cell_type: vec![CellType::Fluid; cell_count],
            fluid_fraction: vec![1.0; cell_count],
            solid_cells: Vec::new(),
        }
    }

    pub(crate) fn from_parts(cell_type: Vec<CellType>, fluid_fraction: Vec<f32>) -> Self {
        debug_assert_eq!(cell_type.len(), fluid_fraction.len());
        let solid_cells = cell_type
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == CellType::Solid)
            .map(|(idx, _)| idx)
            .collect();
        Self {
            cell_type,
            fluid_fraction,
            solid_cells,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cell_type.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cell_type.is_empty()
    }

    pub fn cell_type(&self) -> &[CellType] {
        &self.cell_type
    }

    pub fn fluid_fraction(&self) -> &[f32] {
        &self.fluid_fraction
    }

    pub fn solid_cells(&self) -> &[usize] {
        &self.solid_cells
    }

    #[inline]
    pub fn is_solid(&self, idx: usize) -> bool {
        self.cell_type[idx] == CellType::Solid
    }

    /// Number of cells of the given type.
    pub fn count(&self, kind: CellType) -> usize {
        self.cell_type.iter().filter(|&&t| t == kind).count()
    }
}

/// Dense field storage over an `N³` lattice.
#[derive(Clone, Debug)]
pub struct FluidGrid {
    lattice: Lattice,

    /// Density scratch (diffusion output, advection source)
    pub(crate) s: Vec<f32>,
    pub(crate) density: Vec<f32>,

    pub(crate) vx: Vec<f32>,
    pub(crate) vy: Vec<f32>,
    pub(crate) vz: Vec<f32>,

    /// Previous-step velocity (diffusion output, advection source)
    pub(crate) vx0: Vec<f32>,
    pub(crate) vy0: Vec<f32>,
    pub(crate) vz0: Vec<f32>,

    /// Jacobi double buffer for the relaxer
    pub(crate) scratch: Vec<f32>,

    pub(crate) classification: Classification,
}

impl FluidGrid {
    /// Allocate every field for an `n³` lattice, all zero and all Fluid.
    pub fn new(n: usize) -> Self {
        let lattice = Lattice::new(n);
        let cell_count = lattice.len();

        Self {
            lattice,
            s: vec![0.0; cell_count],
            density: vec![0.0; cell_count],
            vx: vec![0.0; cell_count],
            vy: vec![0.0; cell_count],
            vz: vec![0.0; cell_count],
            vx0: vec![0.0; cell_count],
            vy0: vec![0.0; cell_count],
            vz0: vec![0.0; cell_count],
            scratch: vec![0.0; cell_count],
            classification: Classification::all_fluid(cell_count),
        }
    }

    #[inline]
    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    /// Side length `N`.
    #[inline]
    pub fn n(&self) -> usize {
        self.lattice.n()
    }

    /// Zero every physical field. Classification is left alone.
    pub fn reset(&mut self) {
        for field in [
            &mut self.s,
            &mut self.density,
            &mut self.vx,
            &mut self.vy,
            &mut self.vz,
            &mut self.vx0,
            &mut self.vy0,
            &mut self.vz0,
            &mut self.scratch,
        ] {
            field.fill(0.0);
        }
    }

    // ========== Sources ==========

    /// Add `amount` to the density of the cell containing `position`.
    pub fn add_density(&mut self, position: Vec3, amount: f32) {
        let idx = self.lattice.index_of(position);
        self.density[idx] += amount;
    }

    /// Add `amount` to the velocity of the cell containing `position`.
    pub fn add_velocity(&mut self, position: Vec3, amount: Vec3) {
        let idx = self.lattice.index_of(position);
        self.vx[idx] += amount.x;
        self.vy[idx] += amount.y;
        self.vz[idx] += amount.z;
    }

    // ========== Point queries ==========

    pub fn density_at(&self, position: Vec3) -> f32 {
        self.density[self.lattice.index_of(position)]
    }

    pub fn velocity_at(&self, position: Vec3) -> Vec3 {
        let idx = self.lattice.index_of(position);
        Vec3::new(self.vx[idx], self.vy[idx], self.vz[idx])
    }

    pub fn cell_type_at(&self, position: Vec3) -> CellType {
        self.classification.cell_type[self.lattice.index_of(position)]
    }

    pub fn fluid_fraction_at(&self, position: Vec3) -> f32 {
        self.classification.fluid_fraction[self.lattice.index_of(position)]
    }

    // ========== Field accessors ==========

    pub fn density(&self) -> &[f32] {
        &self.density
    }

    pub fn density_mut(&mut self) -> &mut [f32] {
        &mut self.density
    }

    pub fn vx(&self) -> &[f32] {
        &self.vx
    }

    pub fn vx_mut(&mut self) -> &mut [f32] {
        &mut self.vx
    }

    pub fn vy(&self) -> &[f32] {
        &self.vy
    }

    pub fn vy_mut(&mut self) -> &mut [f32] {
        &mut self.vy
    }

    pub fn vz(&self) -> &[f32] {
        &self.vz
    }

    pub fn vz_mut(&mut self) -> &mut [f32] {
        &mut self.vz
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub(crate) fn set_classification(&mut self, classification: Classification) {
        debug_assert_eq!(classification.len(), self.lattice.len());
        self.classification = classification;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_zero_and_fluid() {
        let grid = FluidGrid::new(6);
        assert_eq!(grid.density().len(), 216);
        assert!(grid.density().iter().all(|&d| d == 0.0));
        assert_eq!(grid.classification().count(CellType::Fluid), 216);
        assert!(grid.classification().solid_cells().is_empty());
    }

    #[test]
    fn test_sources_accumulate() {
        let mut grid = FluidGrid::new(8);
        let p = Vec3::new(3.2, 4.7, 5.0);
        grid.add_density(p, 2.0);
        grid.add_density(p, 3.0);
        grid.add_velocity(p, Vec3::new(1.0, -2.0, 0.5));
        grid.add_velocity(p, Vec3::new(1.0, 0.0, 0.0));

        assert_eq!(grid.density_at(Vec3::new(3.0, 4.0, 5.0)), 5.0);
        assert_eq!(grid.velocity_at(Vec3::new(3.9, 4.1, 5.5)), Vec3::new(2.0, -2.0, 0.5));
    }

    #[test]
    fn test_out_of_range_source_lands_on_boundary() {
        let mut grid = FluidGrid::new(8);
        grid.add_density(Vec3::new(-10.0, 3.0, 100.0), 1.0);
        let idx = grid.lattice().index(0, 3, 7);
        assert_eq!(grid.density()[idx], 1.0);
    }

    #[test]
    fn test_reset_keeps_classification() {
        let mut grid = FluidGrid::new(4);
        let mut types = vec![CellType::Fluid; 64];
        types[21] = CellType::Solid;
        let mut fractions = vec![1.0; 64];
        fractions[21] = 0.0;
        grid.set_classification(Classification::from_parts(types, fractions));
        grid.add_density(Vec3::splat(1.0), 4.0);

        grid.reset();

        assert!(grid.density().iter().all(|&d| d == 0.0));
        assert_eq!(grid.classification().solid_cells(), &[21]);
    }

    #[test]
    fn test_field_kind_axes() {
        assert_eq!(FieldKind::Vx.normal_axis(), Some(0));
        assert_eq!(FieldKind::Vz.normal_axis(), Some(2));
        assert!(!FieldKind::Density.is_velocity());
    }
}
