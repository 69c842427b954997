use glam::DVec3;
use ndarray::Array3;

use crate::domain::Domain;
use crate::grid::{Axis, GridShape, MacFields, StaggeredField};

/// Guards the normalization of the vorticity magnitude gradient.
const GRADIENT_EPSILON: f64 = 1e-10;

/// Adds thermal buoyancy to the vertical velocity of `state`, writing the result to `v_out`.
///
/// Hot smoke rises and dense smoke sinks. The force is added as is, without a time step factor.
pub fn add_buoyancy(
    domain: &Domain,
    alpha: f64,
    beta: f64,
    ambient: f64,
    state: &MacFields,
    v_out: &mut StaggeredField,
) {
    let shape = domain.shape();

    for (i, j, k) in shape.faces(Axis::Y) {
        v_out[(i, j, k)] = if domain.is_open_face(Axis::Y, i, j, k) {
            let pos = shape.face_position(Axis::Y, i, j, k);
            let density = state.density.sample(pos);
            let temperature = state.temperature.sample(pos);

            state.v[(i, j, k)] - alpha * density + beta * (temperature - ambient)
        } else {
            0.0
        };
    }
}

/// Scratch space for vorticity confinement, sized once per grid.
#[derive(Debug, Clone)]
pub struct Vorticity {
    omega: Array3<DVec3>,
    magnitude: Array3<f64>,
    force: Array3<DVec3>,
}

impl Vorticity {
    pub fn new(shape: &GridShape) -> Self {
        Self {
            omega: Array3::from_elem(shape.dim(), DVec3::ZERO),
            magnitude: Array3::zeros(shape.dim()),
            force: Array3::from_elem(shape.dim(), DVec3::ZERO),
        }
    }

    /// Cell-centered vorticity from the last call to [`Vorticity::confine`].
    #[inline]
    pub fn omega(&self) -> &Array3<DVec3> {
        &self.omega
    }

    /// Cell-centered confinement force from the last call to [`Vorticity::confine`].
    #[inline]
    pub fn force(&self) -> &Array3<DVec3> {
        &self.force
    }

    /// Computes the confinement force from `state` and writes `state + dt * force` into the
    /// velocity components of `target`.
    pub fn confine(&mut self, domain: &Domain, epsilon: f64, dt: f64, state: &MacFields, target: &mut MacFields) {
        let shape = domain.shape();
        let h = shape.spacing;

        for (i, j, k) in shape.cells() {
            if domain.is_solid(i, j, k) {
                self.omega[(i, j, k)] = DVec3::ZERO;
                self.magnitude[(i, j, k)] = 0.0;
                continue;
            }

            let c = shape.cell_center(i, j, k);
            let dx = DVec3::new(h, 0.0, 0.0);
            let dy = DVec3::new(0.0, h, 0.0);
            let dz = DVec3::new(0.0, 0.0, h);

            let omega = DVec3::new(
                state.w.sample(c + dy) - state.w.sample(c - dy) - state.v.sample(c + dz)
                    + state.v.sample(c - dz),
                state.u.sample(c + dz) - state.u.sample(c - dz) - state.w.sample(c + dx)
                    + state.w.sample(c - dx),
                state.v.sample(c + dx) - state.v.sample(c - dx) - state.u.sample(c + dy)
                    + state.u.sample(c - dy),
            ) / (2.0 * h);

            self.omega[(i, j, k)] = omega;
            self.magnitude[(i, j, k)] = omega.length();
        }

        let (nx, ny, nz) = shape.dim();
        let m = &self.magnitude;

        for (i, j, k) in shape.cells() {
            if domain.is_solid(i, j, k) {
                self.force[(i, j, k)] = DVec3::ZERO;
                continue;
            }

            let gradient = DVec3::new(
                m[(clamp_up(i, nx), j, k)] - m[(i.saturating_sub(1), j, k)],
                m[(i, clamp_up(j, ny), k)] - m[(i, j.saturating_sub(1), k)],
                m[(i, j, clamp_up(k, nz))] - m[(i, j, k.saturating_sub(1))],
            ) / (2.0 * h);

            let n = gradient / (gradient.length() + GRADIENT_EPSILON);
            self.force[(i, j, k)] = epsilon * h * n.cross(self.omega[(i, j, k)]);
        }

        for axis in Axis::ALL {
            let a = axis.index();
            let source = state.face(axis);
            let out = target.face_mut(axis);

            for (i, j, k) in shape.faces(axis) {
                out[(i, j, k)] = if domain.is_open_face(axis, i, j, k) {
                    let mut below = [i, j, k];
                    below[a] -= 1;
                    let f = 0.5 * (self.force[(i, j, k)][a] + self.force[(below[0], below[1], below[2])][a]);
                    source[(i, j, k)] + dt * f
                } else {
                    0.0
                };
            }
        }
    }
}

#[inline]
fn clamp_up(i: usize, n: usize) -> usize {
    (i + 1).min(n - 1)
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::obstacle::Obstacle;

    fn domain() -> Domain {
        let shape = GridShape::cubic(6, 0.5).unwrap();
        let obstacle = Obstacle::cube(UVec3::new(3, 3, 3), 2, 0.5).unwrap();
        Domain::new(shape, Some(obstacle)).unwrap()
    }

    #[test]
    fn hot_smoke_rises() {
        let d = domain();
        let mut fields = MacFields::new(d.shape());
        fields.temperature.fill(1.0);
        fields.density.fill(1.0);

        let mut v = StaggeredField::face_centered(d.shape(), Axis::Y);
        add_buoyancy(&d, 0.08, 0.37, 0.0, &fields, &mut v);

        assert!((v[(1, 1, 1)] - 0.29).abs() < 1e-12);
        assert_eq!(v[(1, 0, 1)], 0.0);
        assert_eq!(v[(1, 6, 1)], 0.0);
        assert_eq!(v[(3, 3, 3)], 0.0);
        assert_eq!(v[(3, 4, 3)], 0.0);
    }

    #[test]
    fn still_air_feels_no_confinement() {
        let d = domain();
        let fields = MacFields::new(d.shape());
        let mut target = MacFields::new(d.shape());
        target.u.fill(1.0);

        let mut vorticity = Vorticity::new(d.shape());
        vorticity.confine(&d, 0.1, 0.1, &fields, &mut target);

        assert!(vorticity.omega().iter().all(|w| *w == DVec3::ZERO));
        assert!(target.u.data().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn measures_solid_body_rotation() {
        let shape = GridShape::cubic(8, 1.0).unwrap();
        let d = Domain::new(shape, None).unwrap();
        let mut fields = MacFields::new(&shape);

        // u = -y, v = x rotates about z with vorticity 2.
        for (i, j, k) in shape.faces(Axis::X) {
            fields.u[(i, j, k)] = -shape.face_position(Axis::X, i, j, k).y;
        }
        for (i, j, k) in shape.faces(Axis::Y) {
            fields.v[(i, j, k)] = shape.face_position(Axis::Y, i, j, k).x;
        }

        let mut target = MacFields::new(&shape);
        let mut vorticity = Vorticity::new(&shape);
        vorticity.confine(&d, 0.1, 0.1, &fields, &mut target);

        let omega = vorticity.omega()[(4, 4, 4)];
        assert!((omega.z - 2.0).abs() < 1e-9);
        assert!(omega.x.abs() < 1e-9 && omega.y.abs() < 1e-9);
    }
}
