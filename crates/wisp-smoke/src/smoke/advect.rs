use glam::DVec3;

use crate::domain::Domain;
use crate::grid::{Axis, MacFields, StaggeredField};

/// Integration scheme used to trace sample points backwards through the velocity field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backtrace {
    Euler,
    /// Midpoint method.
    #[default]
    Rk2,
}

impl Backtrace {
    /// Where the material now at `pos` was `dt` ago, clipped into the fluid.
    pub fn trace(self, domain: &Domain, fields: &MacFields, pos: DVec3, dt: f64) -> DVec3 {
        match self {
            Backtrace::Euler => domain.clip(pos - dt * fields.velocity(pos), pos),
            Backtrace::Rk2 => {
                let mid = domain.clip(pos - 0.5 * dt * fields.velocity(pos), pos);
                domain.clip(pos - dt * fields.velocity(mid), pos)
            }
        }
    }
}

/// Semi-Lagrangian advection of the three velocity components of `state` into `target`.
///
/// Faces that cannot carry flow are written as zero.
pub fn advect_velocity(domain: &Domain, backtrace: Backtrace, dt: f64, state: &MacFields, target: &mut MacFields) {
    let shape = domain.shape();

    for axis in Axis::ALL {
        let source = state.face(axis);
        let out = target.face_mut(axis);

        for (i, j, k) in shape.faces(axis) {
            out[(i, j, k)] = if domain.is_open_face(axis, i, j, k) {
                let pos = shape.face_position(axis, i, j, k);
                source.sample(backtrace.trace(domain, state, pos, dt))
            } else {
                0.0
            };
        }
    }
}

/// Semi-Lagrangian advection of a cell-centered scalar. Solid cells become zero.
pub fn advect_scalar(
    domain: &Domain,
    backtrace: Backtrace,
    dt: f64,
    state: &MacFields,
    source: &StaggeredField,
    target: &mut StaggeredField,
) {
    let shape = domain.shape();

    for (i, j, k) in shape.cells() {
        target[(i, j, k)] = if domain.is_solid(i, j, k) {
            0.0
        } else {
            let pos = shape.cell_center(i, j, k);
            source.sample(backtrace.trace(domain, state, pos, dt))
        };
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec3;

    use super::*;
    use crate::grid::GridShape;
    use crate::obstacle::Obstacle;

    fn uniform_flow(shape: &GridShape, speed: f64) -> MacFields {
        let mut fields = MacFields::new(shape);
        fields.u.fill(speed);
        fields
    }

    #[test]
    fn backtrace_steps_against_the_flow() {
        let shape = GridShape::cubic(8, 1.0).unwrap();
        let domain = Domain::new(shape, None).unwrap();
        let fields = uniform_flow(&shape, 1.0);
        let pos = DVec3::new(4.0, 4.0, 4.0);

        for scheme in [Backtrace::Euler, Backtrace::Rk2] {
            let old = scheme.trace(&domain, &fields, pos, 0.5);
            assert!((old - DVec3::new(3.5, 4.0, 4.0)).length() < 1e-12);
        }
    }

    #[test]
    fn backtrace_stops_at_the_wall() {
        let shape = GridShape::cubic(4, 1.0).unwrap();
        let domain = Domain::new(shape, None).unwrap();
        let fields = uniform_flow(&shape, 10.0);

        let old = Backtrace::Rk2.trace(&domain, &fields, DVec3::new(1.0, 2.0, 2.0), 1.0);
        assert_eq!(old.x, 0.0);
    }

    #[test]
    fn uniform_scalar_is_preserved() {
        let shape = GridShape::cubic(6, 0.5).unwrap();
        let obstacle = Obstacle::cube(UVec3::new(2, 2, 2), 2, 0.5).unwrap();
        let domain = Domain::new(shape, Some(obstacle)).unwrap();
        let mut fields = uniform_flow(&shape, 0.7);
        fields.density.fill(0.4);

        let mut out = StaggeredField::cell_centered(&shape);
        advect_scalar(&domain, Backtrace::Rk2, 0.1, &fields, &fields.density, &mut out);

        for (i, j, k) in shape.cells() {
            let expected = if domain.is_solid(i, j, k) { 0.0 } else { 0.4 };
            assert!((out[(i, j, k)] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn closed_faces_are_written_as_zero() {
        let shape = GridShape::cubic(6, 0.5).unwrap();
        let obstacle = Obstacle::cube(UVec3::new(2, 2, 2), 2, 0.5).unwrap();
        let domain = Domain::new(shape, Some(obstacle)).unwrap();
        let fields = uniform_flow(&shape, 1.0);

        let mut target = MacFields::new(&shape);
        target.u.fill(9.0);
        advect_velocity(&domain, Backtrace::Rk2, 0.1, &fields, &mut target);

        assert_eq!(target.u[(0, 1, 1)], 0.0);
        assert_eq!(target.u[(6, 1, 1)], 0.0);
        assert_eq!(target.u[(2, 2, 2)], 0.0);
        assert_eq!(target.u[(3, 3, 3)], 0.0);
        assert!((target.u[(1, 1, 1)] - 1.0).abs() < 1e-12);
    }
}
