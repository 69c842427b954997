use glam::UVec3;

use super::Obstacle;

/// Result of one scripted obstacle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// The cube moved one cell along its axis.
    Advanced,
    /// The cube hit the edge of the grid and turned around without moving.
    Reversed,
}

impl Obstacle {
    /// Moves the cube one cell along its axis, turning around at the domain edge.
    ///
    /// `extent` is the number of cells along the motion axis. The frame on which the cube turns
    /// around leaves it in place.
    pub fn advance(&mut self, extent: u32) -> Motion {
        let a = self.axis.index();

        if self.forward && self.max[a] + 1 >= extent {
            self.forward = false;
            return Motion::Reversed;
        }

        if !self.forward && self.min[a] == 0 {
            self.forward = true;
            return Motion::Reversed;
        }

        let mut step = UVec3::ZERO;
        step[a] = 1;

        if self.forward {
            self.min += step;
            self.max += step;
        } else {
            self.min -= step;
            self.max -= step;
        }

        self.update_bounds();
        Motion::Advanced
    }
}
