use ndarray::Array3;

use super::stencil::{neighbor, Stencil, StencilOperator};
use crate::grid::Axis;

/// Guards the reciprocal square root against a zero pivot.
const PIVOT_EPSILON: f64 = 1e-30;

/// Fall back to the unmodified diagonal when the pivot drops below this fraction of it.
const PIVOT_SAFETY: f64 = 0.25;

/// Preconditioner applied inside [`PcgSolver`](super::PcgSolver).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preconditioning {
    /// Plain conjugate gradient, `z = r`.
    None,
    #[default]
    ModifiedIncompleteCholesky,
}

/// Modified incomplete Cholesky factor of a [`StencilOperator`], MIC(0).
///
/// Stores one scalar per cell, `1 / sqrt(e)` of the pivot `e`; the off-diagonal part of the
/// factor is the operator itself.
#[derive(Debug, Clone)]
pub struct IncompleteCholesky {
    precon: Array3<f64>,
    tau: f64,
}

impl IncompleteCholesky {
    pub fn new(dim: (usize, usize, usize), tau: f64) -> Self {
        Self {
            precon: Array3::zeros(dim),
            tau,
        }
    }

    pub fn from_operator(operator: &StencilOperator, tau: f64) -> Self {
        let mut ic = Self::new(operator.dim(), tau);
        ic.build(operator);
        ic
    }

    #[inline]
    pub fn tau(&self) -> f64 {
        self.tau
    }

    #[inline]
    pub fn values(&self) -> &Array3<f64> {
        &self.precon
    }

    /// Recomputes the factor in one forward sweep over the cells.
    pub fn build(&mut self, operator: &StencilOperator) {
        let dim = operator.dim();
        self.precon.fill(0.0);

        for ((i, j, k), stencil) in operator_rows(operator) {
            if !operator.is_fluid(i, j, k) {
                continue;
            }

            let mut e = stencil.diag;

            for axis in Axis::ALL {
                let Some(nb) = neighbor(axis, -1, (i, j, k), dim) else {
                    continue;
                };

                let p = self.precon[nb];
                let plus = operator.stencil(nb.0, nb.1, nb.2).plus;
                let off = plus[axis.index()];
                let rest: f64 = axis.others().iter().map(|other| plus[other.index()]).sum();

                e -= (off * p).powi(2) + self.tau * off * rest * p * p;
            }

            if e < PIVOT_SAFETY * stencil.diag {
                e = stencil.diag;
            }

            self.precon[(i, j, k)] = 1.0 / (e + PIVOT_EPSILON).sqrt();
        }
    }

    /// `z = M⁻¹ r` by a forward then a backward triangular sweep. Solid cells come out as zero.
    pub fn apply(&self, operator: &StencilOperator, r: &Array3<f64>, z: &mut Array3<f64>) {
        let dim = operator.dim();
        let (nx, ny, nz) = dim;
        z.fill(0.0);

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    if !operator.is_fluid(i, j, k) {
                        continue;
                    }

                    let mut t = r[(i, j, k)];
                    for axis in Axis::ALL {
                        if let Some(nb) = neighbor(axis, -1, (i, j, k), dim) {
                            let off = operator.stencil(nb.0, nb.1, nb.2).plus[axis.index()];
                            t -= off * self.precon[nb] * z[nb];
                        }
                    }

                    z[(i, j, k)] = t * self.precon[(i, j, k)];
                }
            }
        }

        for k in (0..nz).rev() {
            for j in (0..ny).rev() {
                for i in (0..nx).rev() {
                    if !operator.is_fluid(i, j, k) {
                        continue;
                    }

                    let p = self.precon[(i, j, k)];
                    let mut t = z[(i, j, k)];
                    for axis in Axis::ALL {
                        if let Some(nb) = neighbor(axis, 1, (i, j, k), dim) {
                            t -= operator.plus(axis, i, j, k) * p * z[nb];
                        }
                    }

                    z[(i, j, k)] = t * p;
                }
            }
        }
    }
}

/// Rows of the operator in natural order (`i` fastest).
fn operator_rows(
    operator: &StencilOperator,
) -> impl Iterator<Item = ((usize, usize, usize), &Stencil)> + '_ {
    let (nx, ny, nz) = operator.dim();
    (0..nz).flat_map(move |k| {
        (0..ny).flat_map(move |j| {
            (0..nx).map(move |i| ((i, j, k), operator.stencil(i, j, k)))
        })
    })
}
