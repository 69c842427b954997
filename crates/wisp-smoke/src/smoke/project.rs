use ndarray::Array3;

use crate::domain::Domain;
use crate::grid::{Axis, MacFields};

/// Net outflow of cell `(i, j, k)` divided by the cell size.
#[inline]
pub fn divergence(fields: &MacFields, spacing: f64, i: usize, j: usize, k: usize) -> f64 {
    let (u, v, w) = (&fields.u, &fields.v, &fields.w);

    (u[(i + 1, j, k)] - u[(i, j, k)] + v[(i, j + 1, k)] - v[(i, j, k)] + w[(i, j, k + 1)]
        - w[(i, j, k)])
        / spacing
}

/// Right hand side of the pressure system: the negative divergence of each fluid cell scaled
/// by `h * rho / dt`. Solid cells get zero.
///
/// Faces that cannot carry flow count as zero flux, so the domain walls and the obstacle
/// surface act as closed neighbors.
pub fn build_rhs(domain: &Domain, fields: &MacFields, dt: f64, air_density: f64, rhs: &mut Array3<f64>) {
    let shape = domain.shape();
    let scale = shape.spacing * air_density / dt;

    let flux = |axis: Axis, i: usize, j: usize, k: usize| {
        if domain.is_open_face(axis, i, j, k) {
            fields.face(axis)[(i, j, k)]
        } else {
            0.0
        }
    };

    for (i, j, k) in shape.cells() {
        rhs[(i, j, k)] = if domain.is_solid(i, j, k) {
            0.0
        } else {
            let d = flux(Axis::X, i, j, k) - flux(Axis::X, i + 1, j, k) + flux(Axis::Y, i, j, k)
                - flux(Axis::Y, i, j + 1, k)
                + flux(Axis::Z, i, j, k)
                - flux(Axis::Z, i, j, k + 1);
            d * scale
        };
    }
}

/// Subtracts the gradient of `state.pressure` from the velocity of `state`, writing into
/// `target`.
///
/// Wall faces and faces on or inside the obstacle are written as exactly zero.
pub fn subtract_pressure_gradient(domain: &Domain, dt: f64, air_density: f64, state: &MacFields, target: &mut MacFields) {
    let shape = domain.shape();
    let scale = dt / (shape.spacing * air_density);
    let pressure = &state.pressure;

    for axis in Axis::ALL {
        let a = axis.index();
        let source = state.face(axis);
        let out = target.face_mut(axis);

        for (i, j, k) in shape.faces(axis) {
            out[(i, j, k)] = if domain.is_open_face(axis, i, j, k) {
                let mut below = [i, j, k];
                below[a] -= 1;
                let gradient = pressure[(i, j, k)] - pressure[(below[0], below[1], below[2])];
                source[(i, j, k)] - scale * gradient
            } else {
                0.0
            };
        }
    }
}

/// Largest divergence magnitude over the fluid cells.
pub fn max_divergence(domain: &Domain, fields: &MacFields) -> f64 {
    let shape = domain.shape();
    shape
        .cells()
        .filter(|&(i, j, k)| !domain.is_solid(i, j, k))
        .map(|(i, j, k)| divergence(fields, shape.spacing, i, j, k).abs())
        .fold(0.0, f64::max)
}

/// Number of wall faces that carry a non-zero velocity.
pub fn open_wall_faces(domain: &Domain, fields: &MacFields) -> usize {
    let shape = domain.shape();
    Axis::ALL
        .into_iter()
        .map(|axis| {
            let field = fields.face(axis);
            shape
                .faces(axis)
                .filter(|&(i, j, k)| domain.is_wall_face(axis, i, j, k) && field[(i, j, k)] != 0.0)
                .count()
        })
        .sum()
}
