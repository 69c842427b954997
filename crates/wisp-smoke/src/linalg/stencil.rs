use ndarray::Array3;

use crate::domain::Domain;
use crate::grid::{Axis, GridShape};

/// One row of the 7-point pressure operator.
///
/// Only the coupling to the positive neighbor on each axis is stored. The coupling to the
/// negative neighbor is that neighbor's `plus` entry on the same axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stencil {
    pub diag: f64,
    pub plus: [f64; 3],
}

/// The discrete negative Laplacian over fluid cells with solid and wall Neumann boundaries.
#[derive(Debug, Clone)]
pub struct StencilOperator {
    rows: Array3<Stencil>,
    fluid: Array3<bool>,
}

impl StencilOperator {
    pub fn new(shape: &GridShape) -> Self {
        Self {
            rows: Array3::default(shape.dim()),
            fluid: Array3::from_elem(shape.dim(), true),
        }
    }

    /// Builds a fresh operator for `domain`.
    pub fn from_domain(domain: &Domain) -> Self {
        let mut operator = Self::new(domain.shape());
        operator.build(domain);
        operator
    }

    /// Reassembles every row in place.
    pub fn build(&mut self, domain: &Domain) {
        self.rows.fill(Stencil::default());

        for (i, j, k) in domain.shape().cells() {
            let c = [i as isize, j as isize, k as isize];

            if !domain.is_fluid(c[0], c[1], c[2]) {
                self.fluid[(i, j, k)] = false;
                self.rows[(i, j, k)].diag = 1.0;
                continue;
            }

            self.fluid[(i, j, k)] = true;
            let row = &mut self.rows[(i, j, k)];

            for axis in Axis::ALL {
                let s = axis.step();
                let a = axis.index();

                if domain.is_fluid(c[0] - s[0], c[1] - s[1], c[2] - s[2]) {
                    row.diag += 1.0;
                }

                if domain.is_fluid(c[0] + s[0], c[1] + s[1], c[2] + s[2]) {
                    row.diag += 1.0;
                    row.plus[a] = -1.0;
                }
            }
        }
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.rows.dim()
    }

    #[inline]
    pub fn is_fluid(&self, i: usize, j: usize, k: usize) -> bool {
        self.fluid[(i, j, k)]
    }

    #[inline]
    pub fn fluid_mask(&self) -> &Array3<bool> {
        &self.fluid
    }

    #[inline]
    pub fn stencil(&self, i: usize, j: usize, k: usize) -> &Stencil {
        &self.rows[(i, j, k)]
    }

    #[inline]
    pub fn diag(&self, i: usize, j: usize, k: usize) -> f64 {
        self.rows[(i, j, k)].diag
    }

    /// Coefficient between `(i, j, k)` and its positive neighbor along `axis`.
    #[inline]
    pub fn plus(&self, axis: Axis, i: usize, j: usize, k: usize) -> f64 {
        self.rows[(i, j, k)].plus[axis.index()]
    }

    /// Coefficient between `(i, j, k)` and its negative neighbor along `axis`, read from that
    /// neighbor's row.
    #[inline]
    pub fn minus(&self, axis: Axis, i: usize, j: usize, k: usize) -> f64 {
        match neighbor(axis, -1, (i, j, k), self.dim()) {
            Some(nb) => self.rows[nb].plus[axis.index()],
            None => 0.0,
        }
    }

    /// `y = A x`. Solid rows are the identity.
    pub fn apply(&self, x: &Array3<f64>, y: &mut Array3<f64>) {
        let dim = self.dim();

        for ((i, j, k), row) in self.rows.indexed_iter() {
            if !self.fluid[(i, j, k)] {
                y[(i, j, k)] = x[(i, j, k)];
                continue;
            }

            let mut sum = row.diag * x[(i, j, k)];
            for axis in Axis::ALL {
                if let Some(nb) = neighbor(axis, 1, (i, j, k), dim) {
                    sum += row.plus[axis.index()] * x[nb];
                }
                if let Some(nb) = neighbor(axis, -1, (i, j, k), dim) {
                    sum += self.rows[nb].plus[axis.index()] * x[nb];
                }
            }

            y[(i, j, k)] = sum;
        }
    }
}

/// The neighbor of `cell` one step along `axis` in direction `dir`, if it is on the grid.
#[inline]
pub(crate) fn neighbor(
    axis: Axis,
    dir: isize,
    cell: (usize, usize, usize),
    dim: (usize, usize, usize),
) -> Option<(usize, usize, usize)> {
    let (i, j, k) = cell;
    let (nx, ny, nz) = dim;

    match (axis, dir > 0) {
        (Axis::X, true) => (i + 1 < nx).then(|| (i + 1, j, k)),
        (Axis::X, false) => i.checked_sub(1).map(|i| (i, j, k)),
        (Axis::Y, true) => (j + 1 < ny).then(|| (i, j + 1, k)),
        (Axis::Y, false) => j.checked_sub(1).map(|j| (i, j, k)),
        (Axis::Z, true) => (k + 1 < nz).then(|| (i, j, k + 1)),
        (Axis::Z, false) => k.checked_sub(1).map(|k| (i, j, k)),
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::obstacle::Obstacle;

    fn domain() -> Domain {
        let shape = GridShape::cubic(4, 1.0).unwrap();
        let obstacle = Obstacle::cube(UVec3::new(1, 1, 1), 1, 1.0).unwrap();
        Domain::new(shape, Some(obstacle)).unwrap()
    }

    #[test]
    fn counts_fluid_neighbors() {
        let op = StencilOperator::from_domain(&domain());

        assert_eq!(op.diag(0, 0, 0), 3.0);
        assert_eq!(op.plus(Axis::X, 0, 0, 0), -1.0);
        // (1, 1, 0) lost its +z neighbor to the obstacle.
        assert_eq!(op.diag(1, 1, 0), 4.0);
        assert_eq!(op.plus(Axis::Z, 1, 1, 0), 0.0);
        assert_eq!(op.plus(Axis::Y, 1, 0, 0), -1.0);
        assert_eq!(op.plus(Axis::X, 3, 0, 0), 0.0);
    }

    #[test]
    fn solid_rows_are_identity() {
        let op = StencilOperator::from_domain(&domain());
        assert!(!op.is_fluid(1, 1, 1));
        assert_eq!(op.stencil(1, 1, 1), &Stencil { diag: 1.0, plus: [0.0; 3] });
        assert_eq!(op.minus(Axis::X, 2, 1, 1), 0.0);
    }

    #[test]
    fn rows_sum_to_zero() {
        let d = domain();
        let op = StencilOperator::from_domain(&d);
        let ones = Array3::from_elem(op.dim(), 1.0);
        let mut y = Array3::zeros(op.dim());
        op.apply(&ones, &mut y);

        for (i, j, k) in d.shape().cells() {
            let expected = if op.is_fluid(i, j, k) { 0.0 } else { 1.0 };
            assert_eq!(y[(i, j, k)], expected);
        }
    }

    #[test]
    fn rebuild_clears_the_previous_obstacle() {
        let mut d = domain();
        let mut op = StencilOperator::from_domain(&d);
        d.advance_obstacle();
        op.build(&d);

        assert!(op.is_fluid(1, 1, 1));
        assert_eq!(op.diag(1, 1, 1), 5.0);
        assert_eq!(op.plus(Axis::X, 1, 1, 1), 0.0);
        assert!(!op.is_fluid(2, 1, 1));
    }
}
