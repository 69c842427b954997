use ndarray::{azip, Array1, Array3};

use super::csr::{CellIndex, CsrMatrix};
use super::{max_abs, PressureSolver, SolveReport, SolveStatus, SolverConfig};
use crate::domain::Domain;

/// Conjugate gradient over an assembled [`CsrMatrix`] with a Jacobi preconditioner.
///
/// Only fluid cells are unknowns; solid cells never enter the system.
#[derive(Debug, Clone, Default)]
pub struct SparseCgSolver {
    config: SolverConfig,
    index: CellIndex,
    matrix: CsrMatrix,
    inv_diag: Array1<f64>,
    x: Array1<f64>,
    r: Array1<f64>,
    z: Array1<f64>,
    p: Array1<f64>,
    ap: Array1<f64>,
}

impl SparseCgSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    #[inline]
    pub fn index(&self) -> &CellIndex {
        &self.index
    }

    #[inline]
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    fn resize(&mut self, n: usize) {
        if self.x.len() != n {
            self.inv_diag = Array1::zeros(n);
            self.x = Array1::zeros(n);
            self.r = Array1::zeros(n);
            self.z = Array1::zeros(n);
            self.p = Array1::zeros(n);
            self.ap = Array1::zeros(n);
        }
    }

    fn scatter(&self, pressure: &mut Array3<f64>) {
        pressure.fill(0.0);
        for (row, &cell) in self.index.cells().iter().enumerate() {
            pressure[cell] = self.x[row];
        }
    }
}

impl PressureSolver for SparseCgSolver {
    fn name(&self) -> &'static str {
        "sparse"
    }

    fn rebuild(&mut self, domain: &Domain) {
        self.index.build(domain);
        self.matrix.assemble(&self.index);
        self.resize(self.index.len());

        self.matrix.diagonal_into(&mut self.inv_diag);
        self.inv_diag.mapv_inplace(|d| if d != 0.0 { d.recip() } else { 1.0 });
    }

    fn solve(&mut self, _domain: &Domain, rhs: &Array3<f64>, pressure: &mut Array3<f64>) -> SolveReport {
        let Self {
            config,
            index,
            matrix,
            inv_diag,
            x,
            r,
            z,
            p,
            ap,
        } = self;

        x.fill(0.0);
        for (row, &cell) in index.cells().iter().enumerate() {
            r[row] = rhs[cell];
        }

        let mut residual = max_abs(r.iter());
        let mut report = SolveReport {
            status: SolveStatus::MaxIterationsReached,
            iterations: config.max_iterations,
            residual,
        };

        if residual <= config.tolerance {
            report.status = SolveStatus::Converged;
            report.iterations = 0;
        } else {
            azip!((z in &mut *z, &r in &*r, &d in &*inv_diag) *z = r * d);
            p.assign(&*z);
            let mut rz = r.dot(&*z);

            for iteration in 1..=config.max_iterations {
                matrix.mul_vec(p, ap);

                let pap = p.dot(&*ap);
                if pap == 0.0 || !pap.is_finite() {
                    report.status = SolveStatus::Stagnated;
                    report.iterations = iteration - 1;
                    break;
                }

                let alpha = rz / pap;
                x.scaled_add(alpha, &*p);
                r.scaled_add(-alpha, &*ap);

                residual = max_abs(r.iter());
                report.residual = residual;
                if residual <= config.tolerance {
                    report.status = SolveStatus::Converged;
                    report.iterations = iteration;
                    break;
                }

                azip!((z in &mut *z, &r in &*r, &d in &*inv_diag) *z = r * d);
                let rz_new = r.dot(&*z);
                let beta = rz_new / rz;
                azip!((p in &mut *p, &z in &*z) *p = z + beta * *p);
                rz = rz_new;
            }
        }

        self.scatter(pressure);
        report
    }
}
