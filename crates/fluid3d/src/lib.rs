//! 3D Stable Fluids
//!
//! A cubic-grid incompressible fluid solver in the style of Stam's "stable
//! fluids": implicit diffusion, pressure projection and semi-Lagrangian
//! advection of a density field and a velocity field, with static obstacles
//! voxelized into solid and cut cells.
//!
//! # Example
//!
//! ```
//! use fluid3d::diagnostics::total_density;
//! use fluid3d::{CellType, Cuboid, Obstacle, StableFluid3D, Vec3};
//!
//! let mut sim = StableFluid3D::new(16, 1.0, 0.0, 1e-6, 0.1).unwrap();
//!
//! // A block in the middle of the tank
//! sim.add_obstacle(
//!     Obstacle::new(Cuboid::new(Vec3::splat(2.0))).with_position(Vec3::splat(8.0)),
//! )
//! .unwrap();
//! sim.voxelize_all();
//!
//! sim.add_density(Vec3::new(2.0, 8.0, 8.0), 50.0);
//! sim.add_velocity(Vec3::new(2.0, 8.0, 8.0), Vec3::new(4.0, 0.0, 0.0));
//! sim.step();
//!
//! assert_eq!(sim.cell_type_at(Vec3::splat(8.0)), CellType::Solid);
//! assert!(total_density(sim.grid()) > 0.0);
//! ```

pub mod advection;
pub mod boundary;
pub mod constants;
pub mod diagnostics;
pub mod diffusion;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod lattice;
pub mod obstacle;
pub mod params;
pub mod pressure;
pub mod profiler;
pub mod relax;
pub mod serde_utils;
pub mod voxelize;

pub use error::{FluidError, Result};
pub use geometry::{Aabb, CollisionShape, Cuboid, Sphere, TriMesh};
pub use glam::Vec3;
pub use grid::{CellType, Classification, FieldKind, FluidGrid};
pub use lattice::Lattice;
pub use obstacle::{Obstacle, ObstacleId};
pub use params::FluidParams;
pub use profiler::{Stage, StepProfiler};
pub use voxelize::{VoxelJob, Voxelization};

use std::sync::atomic::{AtomicU64, Ordering};

use advection::{advect, Flow};
use diffusion::diffuse;
use pressure::{project, Velocity};

/// Source of per-simulation ids for tagging voxel jobs.
static NEXT_SIM_ID: AtomicU64 = AtomicU64::new(1);

/// 3D stable-fluids simulation.
pub struct StableFluid3D {
    /// Unique per instance; voxel jobs carry it back to their owner
    id: u64,
    params: FluidParams,
    grid: FluidGrid,

    obstacles: Vec<Obstacle>,
    next_obstacle_id: u32,
    /// Bumped on every obstacle-set change
    obstacle_generation: u64,
    /// Generation the installed classification was built from
    voxelized_generation: u64,
    stale_warned: bool,

    profiler: StepProfiler,

    /// Completed `step()` calls
    pub frame: u64,
}

impl StableFluid3D {
    /// Create a simulation with an `resolution³` lattice.
    pub fn new(
        resolution: usize,
        world_scale: f32,
        diffusion: f32,
        viscosity: f32,
        dt: f32,
    ) -> Result<Self> {
        Self::from_params(&FluidParams {
            resolution,
            world_scale,
            diffusion,
            viscosity,
            dt,
        })
    }

    pub fn from_params(params: &FluidParams) -> Result<Self> {
        params.validate()?;

        let mut sim = Self {
            id: NEXT_SIM_ID.fetch_add(1, Ordering::Relaxed),
            params: params.clone(),
            grid: FluidGrid::new(params.resolution),
            obstacles: Vec::new(),
            next_obstacle_id: 1,
            obstacle_generation: 0,
            voxelized_generation: 0,
            stale_warned: false,
            profiler: StepProfiler::new(),
            frame: 0,
        };
        sim.voxelize_all();

        log::info!(
            "stable fluid: {n}³ cells, diffusion={}, viscosity={}, dt={}",
            params.diffusion,
            params.viscosity,
            params.dt,
            n = params.resolution,
        );
        Ok(sim)
    }

    // ========== Accessors ==========

    pub fn params(&self) -> &FluidParams {
        &self.params
    }

    pub fn grid(&self) -> &FluidGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut FluidGrid {
        &mut self.grid
    }

    pub fn lattice(&self) -> Lattice {
        self.grid.lattice()
    }

    pub fn resolution(&self) -> usize {
        self.grid.n()
    }

    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut StepProfiler {
        &mut self.profiler
    }

    /// Grid coordinates of a world-space point.
    pub fn world_to_grid(&self, world: Vec3) -> Vec3 {
        world / self.params.world_scale
    }

    /// World-space position of a grid coordinate.
    pub fn grid_to_world(&self, grid: Vec3) -> Vec3 {
        grid * self.params.world_scale
    }

    // ========== Sources and queries ==========

    /// Add density at the cell containing `position` (grid coordinates).
    pub fn add_density(&mut self, position: Vec3, amount: f32) {
        self.grid.add_density(position, amount);
    }

    /// Add velocity at the cell containing `position` (grid coordinates).
    pub fn add_velocity(&mut self, position: Vec3, amount: Vec3) {
        self.grid.add_velocity(position, amount);
    }

    pub fn density_at(&self, position: Vec3) -> f32 {
        self.grid.density_at(position)
    }

    pub fn velocity_at(&self, position: Vec3) -> Vec3 {
        self.grid.velocity_at(position)
    }

    /// Classification of the cell containing `position`.
    pub fn cell_type_at(&self, position: Vec3) -> CellType {
        self.grid.cell_type_at(position)
    }

    pub fn fluid_fraction_at(&self, position: Vec3) -> f32 {
        self.grid.fluid_fraction_at(position)
    }

    // ========== Simulation ==========

    /// Advance one timestep.
    ///
    /// Runs on the installed classification even if obstacles changed since
    /// the last voxelization.
    pub fn step(&mut self) {
        if self.needs_voxelization() && !self.stale_warned {
            log::warn!(
                "stepping with a stale classification (obstacle generation {} > {}); call voxelize_all()",
                self.obstacle_generation,
                self.voxelized_generation
            );
            self.stale_warned = true;
        }

        let Self {
            params,
            grid,
            profiler,
            ..
        } = self;
        let step_start = profiler.start();

        let lattice = grid.lattice();
        let (dt, visc, diff) = (params.dt, params.viscosity, params.diffusion);
        let FluidGrid {
            s,
            density,
            vx,
            vy,
            vz,
            vx0,
            vy0,
            vz0,
            scratch,
            classification,
            ..
        } = grid;
        let class = &*classification;

        // 1. Viscous diffusion into the previous-step buffers
        let t = profiler.start();
        diffuse(FieldKind::Vx, vx0, vx, visc, dt, scratch, lattice, class);
        diffuse(FieldKind::Vy, vy0, vy, visc, dt, scratch, lattice, class);
        diffuse(FieldKind::Vz, vz0, vz, visc, dt, scratch, lattice, class);
        profiler.finish(Stage::Diffuse, t);

        // 2. Project the diffused velocity (vx, vy as pressure/divergence scratch)
        let t = profiler.start();
        project(
            &mut Velocity {
                x: &mut vx0[..],
                y: &mut vy0[..],
                z: &mut vz0[..],
            },
            vx,
            vy,
            scratch,
            lattice,
            class,
        );
        profiler.finish(Stage::Project, t);

        // 3. Self-advect velocity
        let t = profiler.start();
        {
            let flow = Flow {
                x: &vx0[..],
                y: &vy0[..],
                z: &vz0[..],
            };
            advect(FieldKind::Vx, vx, vx0, flow, dt, lattice, class);
            advect(FieldKind::Vy, vy, vy0, flow, dt, lattice, class);
            advect(FieldKind::Vz, vz, vz0, flow, dt, lattice, class);
        }
        profiler.finish(Stage::Advect, t);

        // 4. Project again (vx0, vy0 as scratch)
        let t = profiler.start();
        project(
            &mut Velocity {
                x: &mut vx[..],
                y: &mut vy[..],
                z: &mut vz[..],
            },
            vx0,
            vy0,
            scratch,
            lattice,
            class,
        );
        profiler.finish(Stage::Project, t);

        // 5. Diffuse density
        let t = profiler.start();
        diffuse(FieldKind::Density, s, density, diff, dt, scratch, lattice, class);
        profiler.finish(Stage::Diffuse, t);

        // 6. Advect density along the projected velocity
        let t = profiler.start();
        let flow = Flow {
            x: &vx[..],
            y: &vy[..],
            z: &vz[..],
        };
        advect(FieldKind::Density, density, s, flow, dt, lattice, class);
        profiler.finish(Stage::Advect, t);

        profiler.finish(Stage::Step, step_start);
        self.frame += 1;
    }

    /// Zero every physical field and re-run voxelization.
    ///
    /// Classification depends only on the obstacle set, so it is unchanged
    /// unless obstacles changed since the last pass.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.frame = 0;
        self.voxelize_all();
    }

    // ========== Obstacles ==========

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.id == id)
    }

    /// Add an obstacle and return its handle. The classification is stale
    /// until the next [`StableFluid3D::voxelize_all`].
    pub fn add_obstacle(&mut self, mut obstacle: Obstacle) -> Result<ObstacleId> {
        obstacle.validate()?;

        let id = ObstacleId(self.next_obstacle_id);
        self.next_obstacle_id += 1;
        obstacle.id = id;

        log::debug!(
            "add {} at {:?} scale {:?} (enabled={})",
            id,
            obstacle.position,
            obstacle.scale,
            obstacle.enabled
        );
        self.obstacles.push(obstacle);
        self.mark_obstacles_changed();
        Ok(id)
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let pos = self.obstacles.iter().position(|o| o.id == id)?;
        let removed = self.obstacles.remove(pos);
        log::debug!("remove {}", id);
        self.mark_obstacles_changed();
        Some(removed)
    }

    pub fn clear_obstacles(&mut self) {
        if self.obstacles.is_empty() {
            return;
        }
        self.obstacles.clear();
        self.mark_obstacles_changed();
    }

    pub fn set_obstacle_position(&mut self, id: ObstacleId, position: Vec3) -> Result<()> {
        obstacle::validate_position(position)?;
        let obstacle = self.obstacle_entry(id)?;
        if obstacle.position != position {
            obstacle.position = position;
            self.mark_obstacles_changed();
        }
        Ok(())
    }

    pub fn set_obstacle_scale(&mut self, id: ObstacleId, scale: Vec3) -> Result<()> {
        obstacle::validate_scale(scale)?;
        let obstacle = self.obstacle_entry(id)?;
        if obstacle.scale != scale {
            obstacle.scale = scale;
            self.mark_obstacles_changed();
        }
        Ok(())
    }

    pub fn set_obstacle_enabled(&mut self, id: ObstacleId, enabled: bool) -> Result<()> {
        let obstacle = self.obstacle_entry(id)?;
        if obstacle.enabled != enabled {
            obstacle.enabled = enabled;
            self.mark_obstacles_changed();
        }
        Ok(())
    }

    fn obstacle_entry(&mut self, id: ObstacleId) -> Result<&mut Obstacle> {
        self.obstacles
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(FluidError::UnknownObstacle(id))
    }

    fn mark_obstacles_changed(&mut self) {
        self.obstacle_generation += 1;
    }

    // ========== Voxelization ==========

    /// True if obstacles changed since the installed classification was built.
    pub fn needs_voxelization(&self) -> bool {
        self.obstacle_generation != self.voxelized_generation
    }

    /// Reclassify every cell against the current obstacles, on this thread.
    pub fn voxelize_all(&mut self) {
        let start = self.profiler.start();
        let result = self.voxel_job().run();
        self.profiler.finish(Stage::Voxelize, start);
        self.apply_voxelization(result);
    }

    /// Run [`StableFluid3D::voxelize_all`] only if obstacles changed.
    pub fn voxelize_if_needed(&mut self) -> bool {
        if self.needs_voxelization() {
            self.voxelize_all();
            true
        } else {
            false
        }
    }

    /// Snapshot the obstacle set for voxelizing off this thread.
    pub fn voxel_job(&self) -> VoxelJob {
        VoxelJob {
            lattice: self.grid.lattice(),
            obstacles: self.obstacles.clone(),
            generation: self.obstacle_generation,
            owner: self.id,
        }
    }

    /// Install the result of a [`VoxelJob`] between steps.
    ///
    /// Returns `Ok(true)` if the result reflects the current obstacle set.
    /// An older result is still installed but leaves
    /// [`StableFluid3D::needs_voxelization`] set.
    ///
    /// Results must come from this simulation's own [`StableFluid3D::voxel_job`];
    /// anything else is rejected with [`FluidError::ForeignVoxelization`].
    pub fn install_voxelization(&mut self, result: Voxelization) -> Result<bool> {
        let expected = self.grid.lattice().len();
        let actual = result.classification.len();
        if actual != expected {
            return Err(FluidError::ClassificationSizeMismatch { expected, actual });
        }
        if result.owner != self.id {
            return Err(FluidError::ForeignVoxelization);
        }
        if result.generation < self.voxelized_generation {
            log::debug!(
                "ignoring voxelization from generation {} (have {})",
                result.generation,
                self.voxelized_generation
            );
            return Ok(false);
        }
        self.apply_voxelization(result);
        Ok(!self.needs_voxelization())
    }

    fn apply_voxelization(&mut self, result: Voxelization) {
        let class = &result.classification;
        log::debug!(
            "voxelized {} obstacles: fluid={} cut={} solid={}",
            self.obstacles.iter().filter(|o| o.enabled).count(),
            class.count(CellType::Fluid),
            class.count(CellType::CutCell),
            class.count(CellType::Solid),
        );

        self.voxelized_generation = result.generation;
        self.stale_warned = false;
        self.grid.set_classification(result.classification);
    }
}
