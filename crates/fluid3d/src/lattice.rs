//! Flattened indexing over a cubic `N×N×N` lattice.
//!
//! Every lookup that takes signed or floating coordinates clamps each axis to
//! `[0, N-1]` first, so out-of-range queries alias to the nearest boundary
//! cell instead of failing. Advection's trilinear stencil relies on this.

use glam::Vec3;

/// Index space of one cubic grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lattice {
    n: usize,
}

impl Lattice {
    /// Lattice of side `n`. Callers validate `n > 2` (see `FluidParams::validate`).
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Side length `N`.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of cells, `N³`.
    #[inline]
    pub fn len(&self) -> usize {
        self.n * self.n * self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    // ========== Index functions ==========

    /// Unclamped index for coordinates already known to be in range.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.n && y < self.n && z < self.n);
        x + y * self.n + z * self.n * self.n
    }

    /// Clamped index: each coordinate is clamped to `[0, N-1]`.
    #[inline]
    pub fn cell_index(&self, x: i32, y: i32, z: i32) -> usize {
        let max = self.n as i32 - 1;
        let x = x.clamp(0, max) as usize;
        let y = y.clamp(0, max) as usize;
        let z = z.clamp(0, max) as usize;
        x + y * self.n + z * self.n * self.n
    }

    /// Index of the cell containing `pos` (grid coordinates).
    ///
    /// Coordinates are floored, then clamped. NaN maps to 0 and infinities
    /// saturate to the nearest face.
    #[inline]
    pub fn index_of(&self, pos: Vec3) -> usize {
        let cell = pos.floor();
        self.cell_index(cell.x as i32, cell.y as i32, cell.z as i32)
    }

    /// Inverse of [`Lattice::index`].
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let x = idx % self.n;
        let y = (idx / self.n) % self.n;
        let z = idx / (self.n * self.n);
        (x, y, z)
    }

    /// Lower corner of the cell at `idx`, in grid coordinates.
    #[inline]
    pub fn position_of(&self, idx: usize) -> Vec3 {
        let (x, y, z) = self.coords(idx);
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// True if `(x, y, z)` lies strictly inside the walls (`1..=N-2` on every axis).
    #[inline]
    pub fn is_interior(&self, x: usize, y: usize, z: usize) -> bool {
        let hi = self.n - 1;
        x > 0 && x < hi && y > 0 && y < hi && z > 0 && z < hi
    }

    /// Number of cells in one z-slab, `N²`. Parallel sweeps chunk by this.
    #[inline]
    pub fn slab_len(&self) -> usize {
        self.n * self.n
    }
}
