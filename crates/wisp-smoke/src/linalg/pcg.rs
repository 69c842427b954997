use ndarray::{azip, Array3};

use super::precon::{IncompleteCholesky, Preconditioning};
use super::stencil::StencilOperator;
use super::{dot, max_abs, PressureSolver, SolveReport, SolveStatus, SolverConfig};
use crate::domain::Domain;
use crate::grid::GridShape;

/// Matrix-free preconditioned conjugate gradient on the implicit 7-point operator.
///
/// Every buffer is sized once from the grid shape and reused across frames.
#[derive(Debug, Clone)]
pub struct PcgSolver {
    config: SolverConfig,
    operator: StencilOperator,
    preconditioner: Option<IncompleteCholesky>,
    /// Residual.
    r: Array3<f64>,
    /// Preconditioned residual, reused for `A s`.
    z: Array3<f64>,
    /// Search direction.
    s: Array3<f64>,
}

impl PcgSolver {
    pub fn new(shape: &GridShape, config: SolverConfig, preconditioning: Preconditioning) -> Self {
        let preconditioner = match preconditioning {
            Preconditioning::None => None,
            Preconditioning::ModifiedIncompleteCholesky => {
                Some(IncompleteCholesky::new(shape.dim(), config.mic_tau))
            }
        };

        Self {
            config,
            operator: StencilOperator::new(shape),
            preconditioner,
            r: Array3::zeros(shape.dim()),
            z: Array3::zeros(shape.dim()),
            s: Array3::zeros(shape.dim()),
        }
    }

    #[inline]
    pub fn operator(&self) -> &StencilOperator {
        &self.operator
    }

    #[inline]
    pub fn preconditioner(&self) -> Option<&IncompleteCholesky> {
        self.preconditioner.as_ref()
    }

    fn precondition(
        operator: &StencilOperator,
        preconditioner: Option<&IncompleteCholesky>,
        r: &Array3<f64>,
        z: &mut Array3<f64>,
    ) {
        match preconditioner {
            Some(ic) => ic.apply(operator, r, z),
            None => z.assign(r),
        }
    }
}

impl PressureSolver for PcgSolver {
    fn name(&self) -> &'static str {
        match self.preconditioner {
            Some(_) => "pcg",
            None => "cg",
        }
    }

    fn rebuild(&mut self, domain: &Domain) {
        self.operator.build(domain);
        if let Some(ic) = &mut self.preconditioner {
            ic.build(&self.operator);
        }
    }

    fn solve(&mut self, _domain: &Domain, rhs: &Array3<f64>, pressure: &mut Array3<f64>) -> SolveReport {
        let Self {
            config,
            operator,
            preconditioner,
            r,
            z,
            s,
        } = self;
        let preconditioner = preconditioner.as_ref();

        pressure.fill(0.0);
        azip!((r in &mut *r, &d in rhs, &fluid in operator.fluid_mask()) {
            *r = if fluid { d } else { 0.0 };
        });

        let mut residual = max_abs(r.iter());
        if residual <= config.tolerance {
            return SolveReport {
                status: SolveStatus::Converged,
                iterations: 0,
                residual,
            };
        }

        Self::precondition(operator, preconditioner, r, z);
        s.assign(&*z);
        let mut sigma = dot(z, r);

        for iteration in 1..=config.max_iterations {
            operator.apply(s, z);

            let denom = dot(z, s);
            if denom == 0.0 || !denom.is_finite() {
                return SolveReport {
                    status: SolveStatus::Stagnated,
                    iterations: iteration - 1,
                    residual,
                };
            }

            let alpha = sigma / denom;
            pressure.scaled_add(alpha, &*s);
            r.scaled_add(-alpha, &*z);

            residual = max_abs(r.iter());
            if residual <= config.tolerance {
                return SolveReport {
                    status: SolveStatus::Converged,
                    iterations: iteration,
                    residual,
                };
            }

            Self::precondition(operator, preconditioner, r, z);
            let sigma_new = dot(z, r);
            let beta = sigma_new / sigma;
            azip!((s in &mut *s, &z in &*z) *s = z + beta * *s);
            sigma = sigma_new;
        }

        SolveReport {
            status: SolveStatus::MaxIterationsReached,
            iterations: config.max_iterations,
            residual,
        }
    }
}
