use glam::DVec3;

use crate::domain::Domain;
use crate::grid::MacFields;

/// Passive marker particles carried along by the flow, for visualization.
#[derive(Debug, Clone, Default)]
pub struct Tracers {
    positions: Vec<DVec3>,
    /// Velocity each tracer moved with on its last step.
    velocities: Vec<DVec3>,
}

impl Tracers {
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn push(&mut self, position: DVec3) {
        self.positions.push(position);
        self.velocities.push(DVec3::ZERO);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.velocities.clear();
    }

    #[inline]
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &[DVec3] {
        &self.velocities
    }

    /// `(position, velocity)` of every tracer.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (DVec3, DVec3)> + '_ {
        self.positions.iter().copied().zip(self.velocities.iter().copied())
    }

    /// Moves every tracer with the average of the velocity where it is and the velocity where a
    /// plain Euler step would take it.
    pub fn advect(&mut self, domain: &Domain, fields: &MacFields, dt: f64) {
        for (pos, vel) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            let start = *pos;
            let v0 = fields.velocity(start);
            let predicted = domain.clip(start + dt * v0, start);
            let v1 = fields.velocity(predicted);
            let average = 0.5 * (v0 + v1);

            *pos = domain.clip(start + dt * average, start);
            *vel = average;
        }
    }
}
