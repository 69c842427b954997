use glam::DVec3;

use crate::grid::{Axis, GridShape};
use crate::obstacle::{Motion, Obstacle};
use crate::SmokeError;

/// The simulation box together with the solid obstacle embedded in it.
///
/// Answers every "is this cell/face part of the fluid" question asked by the solver phases.
#[derive(Debug, Clone)]
pub struct Domain {
    shape: GridShape,
    obstacle: Option<Obstacle>,
    /// Obstacle placement restored on reset.
    initial: Option<Obstacle>,
}

impl Domain {
    pub fn new(shape: GridShape, obstacle: Option<Obstacle>) -> Result<Self, SmokeError> {
        if let Some(o) = &obstacle {
            if o.max().cmpge(shape.grid_size).any() {
                return Err(SmokeError::ObstacleOutOfBounds {
                    min: o.min().to_array(),
                    max: o.max().to_array(),
                    dims: shape.grid_size.to_array(),
                });
            }
        }

        Ok(Self {
            shape,
            obstacle,
            initial: obstacle,
        })
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn obstacle(&self) -> Option<&Obstacle> {
        self.obstacle.as_ref()
    }

    /// Puts the obstacle back where it started.
    pub fn reset(&mut self) {
        self.obstacle = self.initial;
    }

    /// Steps the obstacle's scripted oscillation, if there is an obstacle.
    pub fn advance_obstacle(&mut self) -> Option<Motion> {
        let shape = self.shape;
        self.obstacle
            .as_mut()
            .map(|o| o.advance(shape.extent(o.axis()) as u32))
    }

    #[inline]
    pub fn is_solid(&self, i: usize, j: usize, k: usize) -> bool {
        self.obstacle
            .is_some_and(|o| o.contains(i as isize, j as isize, k as isize))
    }

    /// Whether `(i, j, k)` is a cell of the grid that is not solid.
    #[inline]
    pub fn is_fluid(&self, i: isize, j: isize, k: isize) -> bool {
        self.shape.contains_cell(i, j, k) && !self.obstacle.is_some_and(|o| o.contains(i, j, k))
    }

    /// Whether the face lies on one of the six domain walls.
    #[inline]
    pub fn is_wall_face(&self, axis: Axis, i: usize, j: usize, k: usize) -> bool {
        let idx = [i, j, k][axis.index()];
        idx == 0 || idx == self.shape.extent(axis)
    }

    #[inline]
    pub fn is_obstacle_face(&self, axis: Axis, i: usize, j: usize, k: usize) -> bool {
        self.obstacle.is_some_and(|o| o.is_boundary_face(axis, i, j, k))
    }

    /// Whether a velocity sample may carry flow: not on a wall, and not on or inside the
    /// obstacle.
    #[inline]
    pub fn is_open_face(&self, axis: Axis, i: usize, j: usize, k: usize) -> bool {
        if self.is_wall_face(axis, i, j, k) {
            return false;
        }

        match &self.obstacle {
            Some(o) => !o.is_boundary_face(axis, i, j, k) && !o.is_interior_face(axis, i, j, k),
            None => true,
        }
    }

    /// Clips `p` into the fluid region along the segment from the known-good point `inside`.
    ///
    /// Any coordinate that escapes the domain box pulls the whole segment back so it ends on the
    /// wall it crossed. The result is then pushed out of the obstacle's bounding box and finally
    /// clamped into `[0, size]`.
    pub fn clip(&self, p: DVec3, inside: DVec3) -> DVec3 {
        let size = self.shape.size();
        let mut clipped = p;

        for a in 0..3 {
            let plane = if clipped[a] < 0.0 {
                0.0
            } else if clipped[a] > size[a] {
                size[a]
            } else {
                continue;
            };

            let delta = clipped - inside;
            if delta[a] != 0.0 {
                let t = ((plane - inside[a]) / delta[a]).clamp(0.0, 1.0);
                clipped = inside + delta * t;
            }
            clipped[a] = plane;
        }

        if let Some(o) = &self.obstacle {
            clipped = o.clip(clipped, inside);
        }

        clipped.clamp(DVec3::ZERO, size)
    }
}
