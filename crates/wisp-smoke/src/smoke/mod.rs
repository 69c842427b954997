use glam::DVec3;
use log::{debug, warn};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::Domain;
use crate::grid::{GridShape, MacFields};
use crate::linalg::{PressureSolver, SolveReport, SolverConfig, SolverKind};
use crate::obstacle::{Motion, Obstacle};
use crate::SmokeError;

pub use advect::{advect_scalar, advect_velocity, Backtrace};
pub use forces::{add_buoyancy, Vorticity};
pub use project::{build_rhs, divergence, max_divergence, open_wall_faces, subtract_pressure_gradient};
pub use source::{inject, Jet, SourceKind, SourcePattern};
pub use tracers::Tracers;

mod advect;
mod forces;
mod project;
mod source;
mod tracers;

/// Divergence above which a projected field is reported in debug builds.
pub const DIVERGENCE_WARNING: f64 = 0.02;

/// Which frames a recurring event runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Never,
    /// Frames that are a multiple of `n`.
    Every(u64),
    /// Frames before `n`.
    Until(u64),
}

impl Schedule {
    #[inline]
    pub fn is_due(self, frame: u64) -> bool {
        match self {
            Schedule::Never => false,
            Schedule::Every(n) => n > 0 && frame % n == 0,
            Schedule::Until(n) => frame < n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmokeParams {
    /// Density of the surrounding air.
    pub air_density: f64,
    /// How strongly smoke density pulls velocity down.
    pub buoyancy_alpha: f64,
    /// How strongly heat pushes velocity up.
    pub buoyancy_beta: f64,
    pub ambient_temperature: f64,
    /// Temperature every cell starts at after a reset.
    pub initial_temperature: f64,
    pub vorticity_epsilon: f64,
    pub source: SourceKind,
    pub backtrace: Backtrace,
    pub solver: SolverKind,
    pub solver_config: SolverConfig,
    pub obstacle_schedule: Schedule,
    pub source_schedule: Schedule,
    /// Tracers spawned in each source cell per injection.
    pub particles_per_cell: usize,
    pub seed: u64,
}

impl Default for SmokeParams {
    fn default() -> Self {
        Self {
            air_density: 1.0,
            buoyancy_alpha: 0.08,
            buoyancy_beta: 0.37,
            ambient_temperature: 0.0,
            initial_temperature: 0.0,
            vorticity_epsilon: 0.10,
            source: SourceKind::default(),
            backtrace: Backtrace::default(),
            solver: SolverKind::default(),
            solver_config: SolverConfig::default(),
            obstacle_schedule: Schedule::Every(1),
            source_schedule: Schedule::Every(1),
            particles_per_cell: 10,
            seed: 0x5eed_f00d,
        }
    }
}

impl SmokeParams {
    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = backtrace;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    pub fn with_obstacle_schedule(mut self, schedule: Schedule) -> Self {
        self.obstacle_schedule = schedule;
        self
    }

    pub fn with_source_schedule(mut self, schedule: Schedule) -> Self {
        self.source_schedule = schedule;
        self
    }

    pub fn with_particles_per_cell(mut self, particles_per_cell: usize) -> Self {
        self.particles_per_cell = particles_per_cell;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Smoke on a MAC grid with an oscillating solid obstacle.
///
/// Each phase reads the committed `state`, writes every sample it owns into `target` and then
/// swaps the two, so no field is read and written in the same sweep.
pub struct SmokeSimulation {
    params: SmokeParams,
    domain: Domain,
    state: MacFields,
    target: MacFields,
    rhs: Array3<f64>,
    vorticity: Vorticity,
    solver: Box<dyn PressureSolver>,
    tracers: Tracers,
    rng: StdRng,
    frame: u64,
    last_solve: Option<SolveReport>,
}

impl SmokeSimulation {
    pub fn new(shape: GridShape, obstacle: Option<Obstacle>, params: SmokeParams) -> Result<Self, SmokeError> {
        let domain = Domain::new(shape, obstacle)?;
        let solver = params.solver.build(&domain, params.solver_config);

        let mut sim = Self {
            params,
            state: MacFields::new(&shape),
            target: MacFields::new(&shape),
            rhs: Array3::zeros(shape.dim()),
            vorticity: Vorticity::new(&shape),
            solver,
            tracers: Tracers::default(),
            rng: StdRng::seed_from_u64(params.seed),
            frame: 0,
            last_solve: None,
            domain,
        };

        sim.reset();
        Ok(sim)
    }

    /// Clears every field and tracer, and puts the obstacle back at its starting position.
    pub fn reset(&mut self) {
        self.domain.reset();
        self.solver.rebuild(&self.domain);

        self.state.reset(self.params.initial_temperature);
        self.target.reset(self.params.initial_temperature);
        self.rhs.fill(0.0);
        self.tracers.clear();
        self.rng = StdRng::seed_from_u64(self.params.seed);
        self.frame = 0;
        self.last_solve = None;
    }

    /// Selects the source pattern, backtrace scheme and pressure backend, then resets.
    pub fn configure(&mut self, source: SourceKind, backtrace: Backtrace, solver: SolverKind) {
        self.params.source = source;
        self.params.backtrace = backtrace;

        if self.params.solver != solver {
            self.params.solver = solver;
            self.solver = solver.build(&self.domain, self.params.solver_config);
        }

        self.reset();
    }

    /// Advances the simulation by one frame.
    pub fn step_frame(&mut self, dt: f64) {
        if self.params.obstacle_schedule.is_due(self.frame) {
            self.advance_obstacle();
        }
        if self.params.source_schedule.is_due(self.frame) {
            self.inject_sources();
        }

        self.apply_buoyancy();
        self.apply_vorticity_confinement(dt);
        self.project(dt);
        self.advect_velocity(dt);
        self.advect_temperature(dt);
        self.advect_density(dt);
        self.advect_tracers(dt);

        self.frame += 1;
    }

    /// Moves the obstacle one step and reassembles the pressure system around it.
    pub fn advance_obstacle(&mut self) -> Option<Motion> {
        let motion = self.domain.advance_obstacle()?;

        match motion {
            Motion::Advanced => {
                self.solver.rebuild(&self.domain);
                debug!(
                    "obstacle moved to {:?}, rebuilt {} operator",
                    self.domain.obstacle().map(|o| o.min()),
                    self.solver.name(),
                );
            }
            Motion::Reversed => debug!("obstacle reversed direction on frame {}", self.frame),
        }

        Some(motion)
    }

    /// Writes the configured source pattern straight into the live state.
    pub fn inject_sources(&mut self) {
        let pattern = self.params.source.pattern(self.domain.shape());
        inject(
            &self.domain,
            &pattern,
            &mut self.state,
            &mut self.tracers,
            self.params.particles_per_cell,
            &mut self.rng,
        );
    }

    pub fn apply_buoyancy(&mut self) {
        let p = &self.params;
        add_buoyancy(
            &self.domain,
            p.buoyancy_alpha,
            p.buoyancy_beta,
            p.ambient_temperature,
            &self.state,
            &mut self.target.v,
        );
        std::mem::swap(&mut self.state.v, &mut self.target.v);
    }

    pub fn apply_vorticity_confinement(&mut self, dt: f64) {
        self.vorticity.confine(
            &self.domain,
            self.params.vorticity_epsilon,
            dt,
            &self.state,
            &mut self.target,
        );
        self.state.swap_velocity(&mut self.target);
    }

    /// Solves for pressure and makes the velocity field divergence free.
    ///
    /// A solve that runs out of iterations is logged and its best estimate is used anyway.
    pub fn project(&mut self, dt: f64) -> SolveReport {
        let rho = self.params.air_density;

        build_rhs(&self.domain, &self.state, dt, rho, &mut self.rhs);
        let report = self
            .solver
            .solve(&self.domain, &self.rhs, self.target.pressure.data_mut());

        if report.is_converged() {
            debug!(
                "{} solve converged in {} iterations (residual {:.3e})",
                self.solver.name(),
                report.iterations,
                report.residual,
            );
        } else {
            warn!(
                "{} solve stopped with {:?} after {} iterations (residual {:.3e})",
                self.solver.name(),
                report.status,
                report.iterations,
                report.residual,
            );
        }

        std::mem::swap(&mut self.state.pressure, &mut self.target.pressure);
        subtract_pressure_gradient(&self.domain, dt, rho, &self.state, &mut self.target);
        self.state.swap_velocity(&mut self.target);

        if cfg!(debug_assertions) {
            let walls = open_wall_faces(&self.domain, &self.state);
            if walls > 0 {
                warn!("{walls} wall faces carry velocity after projection");
            }

            let div = max_divergence(&self.domain, &self.state);
            if div > DIVERGENCE_WARNING {
                warn!("divergence {div:.4} after projection on frame {}", self.frame);
            }
        }

        self.last_solve = Some(report);
        report
    }

    pub fn advect_velocity(&mut self, dt: f64) {
        advect_velocity(&self.domain, self.params.backtrace, dt, &self.state, &mut self.target);
        self.state.swap_velocity(&mut self.target);
    }

    pub fn advect_temperature(&mut self, dt: f64) {
        advect_scalar(
            &self.domain,
            self.params.backtrace,
            dt,
            &self.state,
            &self.state.temperature,
            &mut self.target.temperature,
        );
        std::mem::swap(&mut self.state.temperature, &mut self.target.temperature);
    }

    pub fn advect_density(&mut self, dt: f64) {
        advect_scalar(
            &self.domain,
            self.params.backtrace,
            dt,
            &self.state,
            &self.state.density,
            &mut self.target.density,
        );
        std::mem::swap(&mut self.state.density, &mut self.target.density);
    }

    pub fn advect_tracers(&mut self, dt: f64) {
        self.tracers.advect(&self.domain, &self.state, dt);
    }

    #[inline]
    pub fn params(&self) -> &SmokeParams {
        &self.params
    }

    #[inline]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        self.domain.shape()
    }

    /// The committed field state.
    #[inline]
    pub fn fields(&self) -> &MacFields {
        &self.state
    }

    /// Mutable access to the committed state, for seeding initial conditions.
    #[inline]
    pub fn fields_mut(&mut self) -> &mut MacFields {
        &mut self.state
    }

    #[inline]
    pub fn tracers(&self) -> &Tracers {
        &self.tracers
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn last_solve(&self) -> Option<SolveReport> {
        self.last_solve
    }

    #[inline]
    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    #[inline]
    pub fn velocity(&self, pos: DVec3) -> DVec3 {
        self.state.velocity(pos)
    }

    #[inline]
    pub fn density(&self, pos: DVec3) -> f64 {
        self.state.density.sample(pos)
    }

    #[inline]
    pub fn temperature(&self, pos: DVec3) -> f64 {
        self.state.temperature.sample(pos)
    }

    /// Largest divergence over the fluid cells of the committed velocity.
    pub fn max_divergence(&self) -> f64 {
        max_divergence(&self.domain, &self.state)
    }
}
