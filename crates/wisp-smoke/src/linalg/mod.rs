//! Pressure Poisson solvers.
//!
//! The pressure projection only needs something that implements [`PressureSolver`]; two
//! backends are provided:
//!
//! - [`PcgSolver`]: matrix-free conjugate gradient over the implicit 7-point
//!   [`StencilOperator`], optionally preconditioned with [`IncompleteCholesky`].
//! - [`SparseCgSolver`]: assembles the same operator into a [`CsrMatrix`] over compacted fluid
//!   unknowns and runs Jacobi-preconditioned conjugate gradient.

use ndarray::{Array3, Zip};

use crate::domain::Domain;

pub use csr::{CellIndex, CsrMatrix};
pub use pcg::PcgSolver;
pub use precon::{IncompleteCholesky, Preconditioning};
pub use sparse::SparseCgSolver;
pub use stencil::{Stencil, StencilOperator};

pub mod csr;
pub mod pcg;
pub mod precon;
pub mod sparse;
pub mod stencil;

/// Controls shared by every conjugate gradient backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Iteration cap. Reaching it is reported, never fatal.
    pub max_iterations: usize,
    /// Convergence threshold on the largest absolute residual.
    pub tolerance: f64,
    /// Modification parameter of the incomplete Cholesky factorization.
    pub mic_tau: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-6,
            mic_tau: 0.97,
        }
    }
}

impl SolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_mic_tau(mut self, mic_tau: f64) -> Self {
        self.mic_tau = mic_tau;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Converged,
    MaxIterationsReached,
    /// The search direction collapsed before the residual met the tolerance.
    Stagnated,
}

/// Outcome of one pressure solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub iterations: usize,
    /// Largest absolute residual of the returned solution.
    pub residual: f64,
}

impl SolveReport {
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// A backend that solves the pressure Poisson system `A p = d` over the fluid cells.
pub trait PressureSolver {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Reassembles the operator and any preconditioner for the current obstacle placement.
    fn rebuild(&mut self, domain: &Domain);

    /// Solves for `pressure`, starting from zero.
    ///
    /// Solid cells come back as exactly zero. When the iteration cap is hit the best estimate is
    /// still written to `pressure`.
    fn solve(&mut self, domain: &Domain, rhs: &Array3<f64>, pressure: &mut Array3<f64>) -> SolveReport;
}

/// Which [`PressureSolver`] backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    Pcg { preconditioner: Preconditioning },
    Sparse,
}

impl Default for SolverKind {
    fn default() -> Self {
        Self::Pcg {
            preconditioner: Preconditioning::ModifiedIncompleteCholesky,
        }
    }
}

impl SolverKind {
    /// Creates the backend and assembles it for `domain`.
    pub fn build(self, domain: &Domain, config: SolverConfig) -> Box<dyn PressureSolver> {
        let mut solver: Box<dyn PressureSolver> = match self {
            SolverKind::Pcg { preconditioner } => {
                Box::new(PcgSolver::new(domain.shape(), config, preconditioner))
            }
            SolverKind::Sparse => Box::new(SparseCgSolver::new(config)),
        };

        solver.rebuild(domain);
        solver
    }
}

#[inline]
pub(crate) fn dot(a: &Array3<f64>, b: &Array3<f64>) -> f64 {
    Zip::from(a).and(b).fold(0.0, |acc, &x, &y| acc + x * y)
}

#[inline]
pub(crate) fn max_abs<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values.into_iter().fold(0.0, |m, v| m.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    #[test]
    fn reductions() {
        let a = Array3::from_shape_vec((1, 1, 3), vec![1.0, -4.0, 2.0]).unwrap();
        let b = Array3::from_shape_vec((1, 1, 3), vec![2.0, 1.0, 0.5]).unwrap();
        assert_eq!(dot(&a, &b), -1.0);
        assert_eq!(max_abs(&a), 4.0);
    }

    #[test]
    fn default_controls() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, 500);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.mic_tau, 0.97);
    }
}
