use glam::{DVec3, UVec3};

use crate::grid::Axis;
use crate::SmokeError;

pub use motion::Motion;

mod motion;

/// A solid axis-aligned cube embedded in the grid.
///
/// Occupies the inclusive cell range `min..=max` on every axis. The cube oscillates back and
/// forth along `axis` as it is advanced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    min: UVec3,
    max: UVec3,
    /// World-space lower corner, `min * h`.
    min_pos: DVec3,
    /// World-space upper corner, `(max + 1) * h`.
    max_pos: DVec3,
    spacing: f64,
    axis: Axis,
    forward: bool,
}

impl Obstacle {
    /// A cube of `edge` cells whose lowest cell is `min`, moving along X.
    pub fn cube(min: UVec3, edge: u32, spacing: f64) -> Result<Self, SmokeError> {
        if edge == 0 {
            return Err(SmokeError::EmptyObstacle);
        }

        // One past the far corner must also fit, since face queries look at `max + 1`.
        if min.to_array().iter().any(|c| c.checked_add(edge).is_none()) {
            return Err(SmokeError::ObstacleOverflow {
                min: min.to_array(),
                edge,
            });
        }

        let max = min + UVec3::splat(edge - 1);
        let mut obstacle = Self {
            min,
            max,
            min_pos: DVec3::ZERO,
            max_pos: DVec3::ZERO,
            spacing,
            axis: Axis::X,
            forward: true,
        };
        obstacle.update_bounds();
        Ok(obstacle)
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    #[inline]
    pub fn min(&self) -> UVec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> UVec3 {
        self.max
    }

    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Whether the next move goes towards the upper end of the axis.
    #[inline]
    pub fn is_moving_forward(&self) -> bool {
        self.forward
    }

    /// World-space bounding box.
    #[inline]
    pub fn bounds(&self) -> (DVec3, DVec3) {
        (self.min_pos, self.max_pos)
    }

    fn update_bounds(&mut self) {
        self.min_pos = self.min.as_dvec3() * self.spacing;
        self.max_pos = (self.max + 1).as_dvec3() * self.spacing;
    }

    #[inline]
    fn spans(&self, axis: Axis, index: isize) -> bool {
        let a = axis.index();
        index >= self.min[a] as isize && index <= self.max[a] as isize
    }

    /// Whether cell `(i, j, k)` is solid.
    #[inline]
    pub fn contains(&self, i: isize, j: isize, k: isize) -> bool {
        self.spans(Axis::X, i) && self.spans(Axis::Y, j) && self.spans(Axis::Z, k)
    }

    /// Whether a world position lies strictly inside the bounding box.
    #[inline]
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpgt(self.min_pos).all() && p.cmplt(self.max_pos).all()
    }

    #[inline]
    fn spans_others(&self, axis: Axis, idx: [usize; 3]) -> bool {
        axis.others().iter().all(|&other| self.spans(other, idx[other.index()] as isize))
    }

    /// Whether the face normal to `axis` at `(i, j, k)` lies on the surface of the cube.
    pub fn is_boundary_face(&self, axis: Axis, i: usize, j: usize, k: usize) -> bool {
        let idx = [i, j, k];
        let a = axis.index();
        let on_surface = idx[a] as u32 == self.min[a] || idx[a] as u32 == self.max[a] + 1;

        on_surface && self.spans_others(axis, idx)
    }

    /// Whether the face normal to `axis` at `(i, j, k)` separates two solid cells.
    pub fn is_interior_face(&self, axis: Axis, i: usize, j: usize, k: usize) -> bool {
        let idx = [i, j, k];
        let a = axis.index();
        let inside = idx[a] as u32 > self.min[a] && idx[a] as u32 <= self.max[a];

        inside && self.spans_others(axis, idx)
    }

    /// Clips the segment from `inside` to `p` so that it stops at the surface of the cube.
    ///
    /// `p` is returned unchanged when it is not strictly inside the box. Otherwise the result is
    /// where the segment enters the box. When `inside` is itself within the box the point is
    /// pushed to the nearest face instead, picking the face on each axis by which half of the
    /// box it falls in.
    pub fn clip(&self, p: DVec3, inside: DVec3) -> DVec3 {
        if !self.contains_point(p) {
            return p;
        }

        let delta = p - inside;
        let mut entry: Option<(f64, usize, f64)> = None;

        for a in 0..3 {
            let plane = if inside[a] <= self.min_pos[a] && delta[a] > 0.0 {
                self.min_pos[a]
            } else if inside[a] >= self.max_pos[a] && delta[a] < 0.0 {
                self.max_pos[a]
            } else {
                continue;
            };

            let t = (plane - inside[a]) / delta[a];
            if entry.map_or(true, |(best, _, _)| t > best) {
                entry = Some((t, a, plane));
            }
        }

        if let Some((t, a, plane)) = entry {
            let mut clipped = inside + delta * t.clamp(0.0, 1.0);
            clipped[a] = plane;
            return clipped;
        }

        let mut clipped = p;
        let mut nearest: Option<(f64, usize, f64)> = None;

        for a in 0..3 {
            let plane = if 2.0 * p[a] < self.min_pos[a] + self.max_pos[a] {
                self.min_pos[a]
            } else {
                self.max_pos[a]
            };

            let depth = (p[a] - plane).abs();
            if nearest.map_or(true, |(best, _, _)| depth < best) {
                nearest = Some((depth, a, plane));
            }
        }

        if let Some((_, a, plane)) = nearest {
            clipped[a] = plane;
        }

        clipped
    }
}
