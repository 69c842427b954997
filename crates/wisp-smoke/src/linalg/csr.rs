use ndarray::{Array1, Array3};

use crate::domain::Domain;
use crate::grid::Axis;

/// Bijection between fluid cells and compacted unknown indices.
///
/// Unknowns are numbered in natural cell order, so the map is monotone.
#[derive(Debug, Clone, Default)]
pub struct CellIndex {
    index: Array3<Option<usize>>,
    cells: Vec<(usize, usize, usize)>,
}

impl CellIndex {
    pub fn new(domain: &Domain) -> Self {
        let mut index = Self::default();
        index.build(domain);
        index
    }

    pub fn build(&mut self, domain: &Domain) {
        let shape = domain.shape();
        if self.index.dim() != shape.dim() {
            self.index = Array3::from_elem(shape.dim(), None);
        }

        self.cells.clear();
        for (i, j, k) in shape.cells() {
            if domain.is_solid(i, j, k) {
                self.index[(i, j, k)] = None;
            } else {
                self.index[(i, j, k)] = Some(self.cells.len());
                self.cells.push((i, j, k));
            }
        }
    }

    /// Number of unknowns.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, i: isize, j: isize, k: isize) -> Option<usize> {
        if i < 0 || j < 0 || k < 0 {
            return None;
        }
        self.index.get((i as usize, j as usize, k as usize)).copied().flatten()
    }

    #[inline]
    pub fn cell(&self, row: usize) -> (usize, usize, usize) {
        self.cells[row]
    }

    #[inline]
    pub fn cells(&self) -> &[(usize, usize, usize)] {
        &self.cells
    }
}

/// Compressed sparse row matrix with sorted column indices per row.
#[derive(Debug, Clone, Default)]
pub struct CsrMatrix {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assembles the pressure operator over the unknowns of `index`.
    pub fn pressure_operator(index: &CellIndex) -> Self {
        let mut matrix = Self::default();
        matrix.assemble(index);
        matrix
    }

    /// Refills the matrix with the pressure operator over `index`, keeping its allocations.
    ///
    /// Each row couples a fluid cell to its fluid axis neighbors with `-1`, and carries the
    /// neighbor count on the diagonal.
    pub fn assemble(&mut self, index: &CellIndex) {
        self.row_ptr.clear();
        self.col_idx.clear();
        self.values.clear();
        self.row_ptr.push(0);

        for (row, &(i, j, k)) in index.cells().iter().enumerate() {
            let c = [i as isize, j as isize, k as isize];
            let start = self.col_idx.len();

            // Reversed so lower neighbors come out in increasing column order.
            for axis in Axis::ALL.into_iter().rev() {
                let s = axis.step();
                if let Some(col) = index.get(c[0] - s[0], c[1] - s[1], c[2] - s[2]) {
                    self.col_idx.push(col);
                    self.values.push(-1.0);
                }
            }

            let diag = self.col_idx.len();
            self.col_idx.push(row);
            self.values.push(0.0);

            for axis in Axis::ALL {
                let s = axis.step();
                if let Some(col) = index.get(c[0] + s[0], c[1] + s[1], c[2] + s[2]) {
                    self.col_idx.push(col);
                    self.values.push(-1.0);
                }
            }

            self.values[diag] = (self.col_idx.len() - start - 1) as f64;
            self.row_ptr.push(self.col_idx.len());
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_ptr.len().saturating_sub(1)
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of one row.
    #[inline]
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (cols, values) = self.row(row);
        match cols.binary_search(&col) {
            Ok(idx) => values[idx],
            Err(_) => 0.0,
        }
    }

    pub fn diagonal(&self) -> Array1<f64> {
        (0..self.n_rows()).map(|row| self.get(row, row)).collect()
    }

    /// Writes the diagonal into `out`, which must hold one entry per row.
    pub fn diagonal_into(&self, out: &mut Array1<f64>) {
        for (row, d) in out.iter_mut().enumerate() {
            *d = self.get(row, row);
        }
    }

    /// `y = A x`.
    pub fn mul_vec(&self, x: &Array1<f64>, y: &mut Array1<f64>) {
        for (row, out) in y.iter_mut().enumerate() {
            let (cols, values) = self.row(row);
            *out = cols.iter().zip(values).map(|(&col, &v)| v * x[col]).sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::grid::GridShape;
    use crate::obstacle::Obstacle;

    fn domain() -> Domain {
        let shape = GridShape::cubic(3, 1.0).unwrap();
        let obstacle = Obstacle::cube(UVec3::new(1, 1, 1), 1, 1.0).unwrap();
        Domain::new(shape, Some(obstacle)).unwrap()
    }

    #[test]
    fn index_skips_solid_cells() {
        let index = CellIndex::new(&domain());
        assert_eq!(index.len(), 26);
        assert_eq!(index.get(0, 0, 0), Some(0));
        assert_eq!(index.get(1, 1, 1), None);
        assert_eq!(index.get(2, 1, 1), Some(13));
        assert_eq!(index.get(-1, 0, 0), None);
        assert_eq!(index.get(3, 0, 0), None);
        assert_eq!(index.cell(13), (2, 1, 1));
    }

    #[test]
    fn assembles_a_symmetric_operator() {
        let index = CellIndex::new(&domain());
        let a = CsrMatrix::pressure_operator(&index);

        assert_eq!(a.n_rows(), 26);
        for row in 0..a.n_rows() {
            let (cols, values) = a.row(row);
            assert!(cols.windows(2).all(|w| w[0] < w[1]));

            let sum: f64 = values.iter().sum();
            assert_eq!(sum, 0.0);

            for &col in cols {
                assert_eq!(a.get(row, col), a.get(col, row));
            }
        }

        // Face-center cell (1, 0, 1) is next to the solid center.
        let row = index.get(1, 0, 1).unwrap();
        assert_eq!(a.get(row, row), 4.0);
    }

    #[test]
    fn reassembly_reuses_storage() {
        let mut domain = domain();
        let full = CellIndex::new(&Domain::new(*domain.shape(), None).unwrap());
        let mut a = CsrMatrix::pressure_operator(&full);
        let storage = (a.row_ptr.as_ptr(), a.col_idx.as_ptr(), a.values.as_ptr());

        domain.advance_obstacle();
        let index = CellIndex::new(&domain);
        a.assemble(&index);

        assert_eq!((a.row_ptr.as_ptr(), a.col_idx.as_ptr(), a.values.as_ptr()), storage);
        assert_eq!(a.n_rows(), 26);
        let fresh = CsrMatrix::pressure_operator(&index);
        assert_eq!((&a.row_ptr, &a.col_idx, &a.values), (&fresh.row_ptr, &fresh.col_idx, &fresh.values));
    }

    #[test]
    fn multiplies() {
        let index = CellIndex::new(&domain());
        let a = CsrMatrix::pressure_operator(&index);
        let x = Array1::from_elem(index.len(), 2.0);
        let mut y = Array1::zeros(index.len());
        a.mul_vec(&x, &mut y);
        assert!(y.iter().all(|&v| v == 0.0));
        assert_eq!(a.diagonal()[0], 3.0);
    }
}
