use std::ops::{Index, IndexMut};

use glam::DVec3;
use ndarray::{Array3, ArrayView3};

use super::{Axis, GridShape};

/// A scalar quantity sampled on one lattice of a staggered grid.
///
/// Cell-centered fields have one sample per cell; face-centered fields have one extra sample
/// along their own axis. `offset` is where sample `(0, 0, 0)` sits, in cells, relative to the
/// domain origin.
#[derive(Debug, Clone)]
pub struct StaggeredField {
    data: Array3<f64>,
    offset: DVec3,
    inv_spacing: f64,
}

impl StaggeredField {
    pub fn cell_centered(shape: &GridShape) -> Self {
        Self {
            data: Array3::zeros(shape.dim()),
            offset: DVec3::splat(0.5),
            inv_spacing: shape.inv_spacing,
        }
    }

    pub fn face_centered(shape: &GridShape, axis: Axis) -> Self {
        Self {
            data: Array3::zeros(shape.face_dim(axis)),
            offset: DVec3::splat(0.5) - 0.5 * axis.unit(),
            inv_spacing: shape.inv_spacing,
        }
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Reads a sample, treating anything past the lattice as a zero ghost value.
    #[inline]
    pub fn at(&self, i: isize, j: isize, k: isize) -> f64 {
        if i < 0 || j < 0 || k < 0 {
            return 0.0;
        }

        self.data.get((i as usize, j as usize, k as usize)).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize, j: usize, k: usize) -> Option<&mut f64> {
        self.data.get_mut((i, j, k))
    }

    #[inline]
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    #[inline]
    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    #[inline]
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    /// Trilinear interpolation at a world position.
    ///
    /// The continuous sample index is clamped into `[0, n - 1]` on every axis first, so points
    /// beyond the outermost samples take the edge value.
    pub fn sample(&self, pos: DVec3) -> f64 {
        let (nx, ny, nz) = self.data.dim();
        let last = DVec3::new(nx as f64, ny as f64, nz as f64) - 1.0;

        let p = (pos * self.inv_spacing - self.offset).clamp(DVec3::ZERO, last);
        let base = p.floor().min((last - 1.0).max(DVec3::ZERO));
        let delta = p - base;

        let i0 = base.x as usize;
        let j0 = base.y as usize;
        let k0 = base.z as usize;
        let i1 = (i0 + 1).min(nx - 1);
        let j1 = (j0 + 1).min(ny - 1);
        let k1 = (k0 + 1).min(nz - 1);

        let g = &self.data;
        trilerp_norm(
            g[(i0, j0, k0)],
            g[(i0, j0, k1)],
            g[(i0, j1, k0)],
            g[(i0, j1, k1)],
            g[(i1, j0, k0)],
            g[(i1, j0, k1)],
            g[(i1, j1, k0)],
            g[(i1, j1, k1)],
            delta,
        )
    }
}

impl Index<(usize, usize, usize)> for StaggeredField {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize, usize)) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize, usize)> for StaggeredField {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize, usize)) -> &mut f64 {
        &mut self.data[index]
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn trilerp_norm(v000: f64, v001: f64, v010: f64, v011: f64, v100: f64, v101: f64, v110: f64, v111: f64, p: DVec3) -> f64 {
    let v00 = v000 + p.x * (v100 - v000);
    let v01 = v001 + p.x * (v101 - v001);
    let v10 = v010 + p.x * (v110 - v010);
    let v11 = v011 + p.x * (v111 - v011);

    let v0 = v00 + p.y * (v10 - v00);
    let v1 = v01 + p.y * (v11 - v01);

    v0 + p.z * (v1 - v0)
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;

    fn shape() -> GridShape {
        GridShape::new(UVec3::new(4, 3, 2), 0.5).unwrap()
    }

    #[test]
    fn samples_reproduce_stored_values_at_sample_points() {
        let shape = shape();
        let mut field = StaggeredField::cell_centered(&shape);
        for (i, j, k) in shape.cells() {
            field[(i, j, k)] = (i + 10 * j + 100 * k) as f64;
        }

        for (i, j, k) in shape.cells() {
            let value = field.sample(shape.cell_center(i, j, k));
            assert!((value - field[(i, j, k)]).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_fields_interpolate_exactly() {
        let shape = shape();
        let mut u = StaggeredField::face_centered(&shape, Axis::X);
        for (i, j, k) in shape.faces(Axis::X) {
            u[(i, j, k)] = shape.face_position(Axis::X, i, j, k).x * 2.0;
        }

        let p = DVec3::new(1.3, 0.6, 0.4);
        assert!((u.sample(p) - 2.6).abs() < 1e-12);
    }

    #[test]
    fn clamps_outside_the_lattice() {
        let shape = shape();
        let mut d = StaggeredField::cell_centered(&shape);
        d[(0, 0, 0)] = 3.0;

        assert_eq!(d.sample(DVec3::new(-1.0, -1.0, -1.0)), 3.0);
        assert_eq!(d.sample(DVec3::new(0.0, 0.1, 0.2)), 3.0);
        assert_eq!(d.sample(DVec3::new(10.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn ghost_reads_are_zero() {
        let shape = shape();
        let mut d = StaggeredField::cell_centered(&shape);
        d.fill(1.0);

        assert_eq!(d.at(-1, 0, 0), 0.0);
        assert_eq!(d.at(4, 0, 0), 0.0);
        assert_eq!(d.at(0, 3, 0), 0.0);
        assert_eq!(d.at(3, 2, 1), 1.0);
    }
}
