use glam::{DVec3, UVec3};

use crate::SmokeError;

pub use field::StaggeredField;

mod field;

/// One of the three grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Index offset of the positive neighbor along this axis.
    #[inline]
    pub fn step(self) -> [isize; 3] {
        match self {
            Axis::X => [1, 0, 0],
            Axis::Y => [0, 1, 0],
            Axis::Z => [0, 0, 1],
        }
    }

    #[inline]
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    /// The other two axes, in increasing order.
    #[inline]
    pub fn others(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

/// Extents and cell size of a uniform grid of cubic cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridShape {
    /// Size of the grid, in cells.
    pub grid_size: UVec3,
    /// Number of cells in the X direction.
    pub nx: usize,
    /// Number of cells in the Y direction.
    pub ny: usize,
    /// Number of cells in the Z direction.
    pub nz: usize,
    /// Cell size.
    pub spacing: f64,
    /// 1.0 / spacing
    pub inv_spacing: f64,
}

impl GridShape {
    pub fn new(grid_size: UVec3, spacing: f64) -> Result<Self, SmokeError> {
        if grid_size.min_element() == 0 {
            return Err(SmokeError::EmptyGrid(grid_size.x, grid_size.y, grid_size.z));
        }

        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(SmokeError::InvalidSpacing(spacing));
        }

        Ok(Self {
            grid_size,
            nx: grid_size.x as usize,
            ny: grid_size.y as usize,
            nz: grid_size.z as usize,
            spacing,
            inv_spacing: spacing.recip(),
        })
    }

    pub fn cubic(n: u32, spacing: f64) -> Result<Self, SmokeError> {
        Self::new(UVec3::splat(n), spacing)
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    #[inline]
    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.nx,
            Axis::Y => self.ny,
            Axis::Z => self.nz,
        }
    }

    /// Dimensions of the face lattice normal to `axis`.
    #[inline]
    pub fn face_dim(&self, axis: Axis) -> (usize, usize, usize) {
        match axis {
            Axis::X => (self.nx + 1, self.ny, self.nz),
            Axis::Y => (self.nx, self.ny + 1, self.nz),
            Axis::Z => (self.nx, self.ny, self.nz + 1),
        }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// World-space extents of the domain.
    #[inline]
    pub fn size(&self) -> DVec3 {
        self.grid_size.as_dvec3() * self.spacing
    }

    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> DVec3 {
        (DVec3::new(i as f64, j as f64, k as f64) + 0.5) * self.spacing
    }

    #[inline]
    pub fn face_position(&self, axis: Axis, i: usize, j: usize, k: usize) -> DVec3 {
        self.cell_center(i, j, k) - 0.5 * self.spacing * axis.unit()
    }

    #[inline]
    pub fn contains_cell(&self, i: isize, j: isize, k: isize) -> bool {
        i >= 0
            && j >= 0
            && k >= 0
            && (i as usize) < self.nx
            && (j as usize) < self.ny
            && (k as usize) < self.nz
    }

    /// Every cell in natural order: `i` fastest, then `j`, then `k`.
    pub fn cells(&self) -> impl DoubleEndedIterator<Item = (usize, usize, usize)> + '_ {
        (0..self.nz).flat_map(move |k| {
            (0..self.ny).flat_map(move |j| (0..self.nx).map(move |i| (i, j, k)))
        })
    }

    /// Every face normal to `axis`, `i` fastest.
    pub fn faces(&self, axis: Axis) -> impl Iterator<Item = (usize, usize, usize)> {
        let (fx, fy, fz) = self.face_dim(axis);
        (0..fz).flat_map(move |k| (0..fy).flat_map(move |j| (0..fx).map(move |i| (i, j, k))))
    }
}

/// The complete per-frame state of the smoke on a MAC grid.
#[derive(Debug, Clone)]
pub struct MacFields {
    /// Grid velocities in the X direction.
    pub u: StaggeredField,
    /// Grid velocities in the Y direction.
    pub v: StaggeredField,
    /// Grid velocities in the Z direction.
    pub w: StaggeredField,
    /// Smoke density.
    pub density: StaggeredField,
    pub temperature: StaggeredField,
    pub pressure: StaggeredField,
}

impl MacFields {
    pub fn new(shape: &GridShape) -> Self {
        Self {
            u: StaggeredField::face_centered(shape, Axis::X),
            v: StaggeredField::face_centered(shape, Axis::Y),
            w: StaggeredField::face_centered(shape, Axis::Z),
            density: StaggeredField::cell_centered(shape),
            temperature: StaggeredField::cell_centered(shape),
            pressure: StaggeredField::cell_centered(shape),
        }
    }

    pub fn reset(&mut self, temperature: f64) {
        self.u.fill(0.0);
        self.v.fill(0.0);
        self.w.fill(0.0);
        self.density.fill(0.0);
        self.pressure.fill(0.0);
        self.temperature.fill(temperature);
    }

    #[inline]
    pub fn face(&self, axis: Axis) -> &StaggeredField {
        match axis {
            Axis::X => &self.u,
            Axis::Y => &self.v,
            Axis::Z => &self.w,
        }
    }

    #[inline]
    pub fn face_mut(&mut self, axis: Axis) -> &mut StaggeredField {
        match axis {
            Axis::X => &mut self.u,
            Axis::Y => &mut self.v,
            Axis::Z => &mut self.w,
        }
    }

    /// Exchanges the three velocity components with `other`.
    #[inline]
    pub fn swap_velocity(&mut self, other: &mut MacFields) {
        std::mem::swap(&mut self.u, &mut other.u);
        std::mem::swap(&mut self.v, &mut other.v);
        std::mem::swap(&mut self.w, &mut other.w);
    }

    /// Interpolated velocity vector at a world position.
    #[inline]
    pub fn velocity(&self, pos: DVec3) -> DVec3 {
        DVec3::new(self.u.sample(pos), self.v.sample(pos), self.w.sample(pos))
    }
}
