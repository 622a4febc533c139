//! Smoke plume rising past a sphere
//!
//! Injects density and upward velocity near the floor of the tank, runs the
//! solver, and prints mass, energy and divergence every few frames followed
//! by the per-stage timing summary.
//!
//! Obstacles are voxelized on a worker thread while the first frames run.
//!
//! Run with: RUST_LOG=debug cargo run --example plume -p fluid3d --release

use std::thread::{self, JoinHandle};

use fluid3d::diagnostics::{kinetic_energy, max_divergence, non_finite_count, total_density};
use fluid3d::voxelize::Voxelization;
use fluid3d::{CellType, Cuboid, FluidParams, Obstacle, Sphere, StableFluid3D, Vec3};

/// Join the voxelizer thread, logging a panic instead of dropping it.
fn join_voxelizer(worker: JoinHandle<Voxelization>) -> Option<Voxelization> {
    match worker.join() {
        Ok(result) => Some(result),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("voxelizer thread panicked, obstacles not installed: {}", reason);
            None
        }
    }
}

fn main() -> fluid3d::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let params = FluidParams {
        resolution: 40,
        diffusion: 1e-5,
        viscosity: 1e-6,
        dt: 0.1,
        ..Default::default()
    };
    let n = params.resolution as f32;
    let mut sim = StableFluid3D::from_params(&params)?;

    sim.add_obstacle(
        Obstacle::new(Sphere::new(1.0))
            .with_position(Vec3::new(n * 0.5, n * 0.55, n * 0.5))
            .with_scale(Vec3::splat(n * 0.15)),
    )?;
    // Thin lip on one side of the plume
    sim.add_obstacle(
        Obstacle::new(Cuboid::new(Vec3::new(3.0, 0.5, 6.0)))
            .with_position(Vec3::new(n * 0.3, n * 0.3, n * 0.5)),
    )?;

    let job = sim.voxel_job();
    let worker = thread::spawn(move || job.run());

    let source = Vec3::new(n * 0.5, 3.0, n * 0.5);
    let total_frames = 200;

    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>8}",
        "Frame", "Density", "Energy", "MaxDiv", "NaN"
    );

    let mut worker = Some(worker);
    for frame in 0..total_frames {
        // Install the classification as soon as it is ready
        if worker.as_ref().is_some_and(|w| w.is_finished()) {
            if let Some(result) = worker.take().and_then(join_voxelizer) {
                let current = sim.install_voxelization(result)?;
                log::info!(
                    "frame {}: installed obstacles ({} solid cells, current={})",
                    frame,
                    sim.grid().classification().count(CellType::Solid),
                    current
                );
            }
        }

        if frame < 120 {
            for dx in -1..=1 {
                for dz in -1..=1 {
                    let p = source + Vec3::new(dx as f32, 0.0, dz as f32);
                    sim.add_density(p, 8.0);
                    sim.add_velocity(p, Vec3::new(0.0, 3.0, 0.0));
                }
            }
        }

        sim.step();

        if frame % 20 == 0 || frame == total_frames - 1 {
            let grid = sim.grid();
            println!(
                "{:>6} {:>12.3} {:>12.6} {:>12.6} {:>8}",
                sim.frame,
                total_density(grid),
                kinetic_energy(grid),
                max_divergence(grid),
                non_finite_count(grid)
            );
        }
    }

    // Worker finished after the loop ended
    if let Some(result) = worker.and_then(join_voxelizer) {
        sim.install_voxelization(result)?;
    }

    println!("\nStage timings:");
    print!("{}", sim.profiler().format_summary());
    println!("Recent step mean: {:.3}ms", sim.profiler().recent_step_ms());

    Ok(())
}
