use thiserror::Error;

pub mod domain;
pub mod grid;
pub mod linalg;
pub mod obstacle;
pub mod smoke;

pub use domain::Domain;
pub use grid::{Axis, GridShape, MacFields, StaggeredField};
pub use linalg::{Preconditioning, PressureSolver, SolveReport, SolveStatus, SolverConfig, SolverKind};
pub use obstacle::{Motion, Obstacle};
pub use smoke::{Backtrace, Schedule, SmokeParams, SmokeSimulation, SourceKind, Tracers};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SmokeError {
    #[error("grid must have at least one cell along every axis, got {0}x{1}x{2}")]
    EmptyGrid(u32, u32, u32),
    #[error("cell size must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("obstacle cells {min:?}..={max:?} do not fit inside a {dims:?} grid")]
    ObstacleOutOfBounds {
        min: [u32; 3],
        max: [u32; 3],
        dims: [u32; 3],
    },
    #[error("obstacle edge length must be at least one cell")]
    EmptyObstacle,
    #[error("obstacle of edge {edge} starting at {min:?} runs past the cell index range")]
    ObstacleOverflow { min: [u32; 3], edge: u32 },
}
