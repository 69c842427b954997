use std::{error::Error, fs::File};

use glam::UVec3;
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use log::info;
use wisp_io::{write_density_text, SmokeDataEncoder};
use wisp_smoke::{GridShape, Obstacle, SmokeParams, SmokeSimulation};

use crate::RunArgs;

/// The oscillating cube used by the default scene: edge `n/8`, a little off the -X wall and
/// centered in height and depth. On a 32-cell grid this is the cube at (2, 14, 14) with edge 4.
fn default_obstacle(n: u32, spacing: f64) -> Result<Obstacle, Box<dyn Error>> {
    let min = UVec3::new(n / 16, n * 7 / 16, n * 7 / 16);
    let edge = (n / 8).max(1);

    Ok(Obstacle::cube(min, edge, spacing)?)
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let shape = GridShape::cubic(args.grid, args.cell_size)?;
    let obstacle = if args.no_obstacle {
        None
    } else {
        Some(default_obstacle(args.grid, args.cell_size)?)
    };

    let params = SmokeParams::default()
        .with_source(args.source.into())
        .with_backtrace(args.backtrace.into())
        .with_solver(args.solver.into());
    let mut sim = SmokeSimulation::new(shape, obstacle, params)?;

    let dt = args.dt.unwrap_or(1.0 / args.fps.max(1) as f64);
    info!(
        "{}³ cells of size {}, {:?} source, {:?} backtrace, {} solver, dt = {dt}",
        args.grid,
        args.cell_size,
        args.source,
        args.backtrace,
        sim.solver_name()
    );
    if let Some(o) = sim.domain().obstacle() {
        info!("obstacle spans cells {} to {}", o.min(), o.max());
    }

    let mut encoder = SmokeDataEncoder::new(args.output.clone(), args.frames, args.fps)?;
    encoder.encode_metadata(&sim)?;
    info!("recording {} frames to {}", args.frames, encoder.path().display());

    let bar_template = "Running Simulation {spinner:.green} [{elapsed}] [{bar:50.white/white}] {pos}/{len} ({eta})";
    let style = ProgressStyle::with_template(bar_template)?
        .progress_chars("=> ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress = ProgressBar::new(args.frames).with_style(style);

    let mut unconverged = 0;
    for _ in (0..args.frames).progress_with(progress) {
        sim.step_frame(dt);
        if sim.last_solve().is_some_and(|r| !r.is_converged()) {
            unconverged += 1;
        }

        encoder.encode_frame(&sim)?;
    }

    info!(
        "wrote {} frames, {unconverged} with an unconverged pressure solve, {} tracers at the end",
        encoder.frames_written(),
        sim.tracers().len()
    );

    if let Some(path) = args.density_dump {
        write_density_text(&sim, File::create(&path)?)?;
        info!("final density written to {}", path.display());
    }

    Ok(())
}
