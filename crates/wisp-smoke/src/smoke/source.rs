use std::ops::Range;

use glam::DVec3;
use rand::Rng;

use crate::domain::Domain;
use crate::grid::{Axis, GridShape, MacFields};

use super::tracers::Tracers;

/// Where smoke enters the domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// A narrow injector near one corner of the floor.
    Single,
    /// A square injector centered on the floor, placed according to the grid size.
    #[default]
    CubeCenter,
    /// Two jets on opposite X walls blowing at each other.
    TwoSource,
}

/// A velocity sample forced to a fixed value while injecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jet {
    /// Cell whose injection drives this jet.
    pub source: (usize, usize, usize),
    pub axis: Axis,
    pub face: (usize, usize, usize),
    pub velocity: f64,
}

/// The cells and faces touched by one injection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePattern {
    pub cells: Vec<(usize, usize, usize)>,
    pub jets: Vec<Jet>,
    pub spawns_tracers: bool,
}

impl SourcePattern {
    fn push_box(&mut self, shape: &GridShape, xs: Range<usize>, ys: Range<usize>, zs: Range<usize>) {
        for k in zs.start..zs.end.min(shape.nz) {
            for j in ys.start..ys.end.min(shape.ny) {
                for i in xs.start..xs.end.min(shape.nx) {
                    self.cells.push((i, j, k));
                }
            }
        }
    }

    fn jet(&mut self, source: (usize, usize, usize), axis: Axis, face: (usize, usize, usize), velocity: f64) {
        self.jets.push(Jet { source, axis, face, velocity });
    }
}

impl SourceKind {
    /// Lays the pattern out on a grid of `shape`.
    pub fn pattern(self, shape: &GridShape) -> SourcePattern {
        let mut pattern = SourcePattern {
            spawns_tracers: true,
            ..Default::default()
        };

        match self {
            SourceKind::Single => {
                pattern.push_box(shape, 6..12, 0..5, 0..1);
                for n in 0..pattern.cells.len() {
                    let (i, j, k) = pattern.cells[n];
                    pattern.jet((i, j, k), Axis::Y, (i, j + 1, k), 2.0);
                    pattern.jet((i, j, k), Axis::Y, (i, j + 2, k), 2.0);
                }
            }
            SourceKind::CubeCenter => {
                match shape.nx {
                    3 => {
                        pattern.push_box(shape, 0..1, 0..1, 1..2);
                        pattern.jet((0, 0, 1), Axis::Y, (0, 1, 1), 1.0);
                        pattern.spawns_tracers = false;
                        return pattern;
                    }
                    16 => pattern.push_box(shape, 5..13, 0..2, 5..13),
                    32 => pattern.push_box(shape, 12..20, 0..1, 12..20),
                    64 => pattern.push_box(shape, 20..42, 0..2, 26..38),
                    _ => {
                        let xs = centered(shape.nx);
                        let zs = centered(shape.nz);
                        pattern.push_box(shape, xs, 0..1, zs);
                    }
                }

                for n in 0..pattern.cells.len() {
                    let (i, j, k) = pattern.cells[n];
                    pattern.jet((i, j, k), Axis::Y, (i, j + 1, k), 5.0);
                }
            }
            SourceKind::TwoSource => {
                let (ys, zs) = match shape.nx {
                    32 => (5..7, 15..17),
                    64 => (10..15, 30..35),
                    _ => (scaled(5..7, shape.ny), scaled(15..17, shape.nz)),
                };

                let right = shape.nx.saturating_sub(2);
                pattern.push_box(shape, 0..2, ys.clone(), zs.clone());
                let left_count = pattern.cells.len();
                pattern.push_box(shape, right..shape.nx, ys, zs);

                for n in 0..pattern.cells.len() {
                    let (i, j, k) = pattern.cells[n];
                    let velocity = if n < left_count { 5.0 } else { -5.0 };
                    pattern.jet((i, j, k), Axis::X, (i, j + 1, k), velocity);
                }
            }
        }

        pattern
    }
}

/// A footprint a quarter of the extent wide, centered on the axis.
fn centered(n: usize) -> Range<usize> {
    let width = (n / 4).max(1);
    let start = (n - width) / 2;
    start..start + width
}

/// Rescales a range laid out for a 32-cell axis to an axis of `n` cells.
fn scaled(range: Range<usize>, n: usize) -> Range<usize> {
    let start = range.start * n / 32;
    let end = (range.end * n / 32).max(start + 1);
    start..end
}

/// Writes a source pattern into the live state and spawns its tracers.
///
/// Solid cells are skipped along with their jets. Jets whose face falls outside the lattice are ignored.
pub fn inject<R: Rng + ?Sized>(
    domain: &Domain,
    pattern: &SourcePattern,
    fields: &mut MacFields,
    tracers: &mut Tracers,
    particles_per_cell: usize,
    rng: &mut R,
) {
    let shape = domain.shape();
    let half = 0.5 * shape.spacing;

    for &(i, j, k) in &pattern.cells {
        if domain.is_solid(i, j, k) {
            continue;
        }

        fields.density[(i, j, k)] = 1.0;
        fields.temperature[(i, j, k)] = 1.0;

        if pattern.spawns_tracers {
            let center = shape.cell_center(i, j, k);
            for _ in 0..particles_per_cell {
                let jitter = DVec3::new(
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                );
                tracers.push(center + jitter);
            }
        }
    }

    for jet in &pattern.jets {
        let (si, sj, sk) = jet.source;
        if domain.is_solid(si, sj, sk) {
            continue;
        }

        let (i, j, k) = jet.face;
        if let Some(value) = fields.face_mut(jet.axis).get_mut(i, j, k) {
            *value = jet.velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn shape(n: u32) -> GridShape {
        GridShape::cubic(n, 0.5).unwrap()
    }

    #[test]
    fn cube_center_placement_depends_on_grid_size() {
        let p = SourceKind::CubeCenter.pattern(&shape(32));
        assert_eq!(p.cells.len(), 64);
        assert!(p.cells.iter().all(|&(i, j, k)| (12..20).contains(&i) && j == 0 && (12..20).contains(&k)));
        assert!(p.jets.iter().all(|jet| jet.axis == Axis::Y && jet.velocity == 5.0));

        assert_eq!(SourceKind::CubeCenter.pattern(&shape(64)).cells.len(), 22 * 2 * 12);
        assert_eq!(SourceKind::CubeCenter.pattern(&shape(16)).cells.len(), 8 * 2 * 8);

        let generic = SourceKind::CubeCenter.pattern(&shape(8));
        assert_eq!(generic.cells, vec![(3, 0, 3), (4, 0, 3), (3, 0, 4), (4, 0, 4)]);
    }

    #[test]
    fn tiny_grid_uses_a_single_cell() {
        let p = SourceKind::CubeCenter.pattern(&shape(3));
        assert_eq!(p.cells, vec![(0, 0, 1)]);
        assert_eq!(p.jets, vec![Jet { source: (0, 0, 1), axis: Axis::Y, face: (0, 1, 1), velocity: 1.0 }]);
        assert!(!p.spawns_tracers);
    }

    #[test]
    fn two_sources_blow_at_each_other() {
        let p = SourceKind::TwoSource.pattern(&shape(32));
        assert_eq!(p.cells.len(), 16);
        for (cell, jet) in p.cells.iter().zip(&p.jets) {
            assert_eq!(jet.axis, Axis::X);
            assert_eq!(jet.velocity, if cell.0 < 2 { 5.0 } else { -5.0 });
        }
    }

    #[test]
    fn single_source_is_clipped_to_small_grids() {
        let p = SourceKind::Single.pattern(&shape(8));
        assert_eq!(p.cells.len(), 2 * 5);
        assert_eq!(p.jets.len(), 2 * p.cells.len());
    }

    #[test]
    fn inject_writes_fields_and_tracers() {
        let shape = shape(16);
        let domain = Domain::new(shape, None).unwrap();
        let pattern = SourceKind::CubeCenter.pattern(&shape);
        let mut fields = MacFields::new(&shape);
        let mut tracers = Tracers::default();
        let mut rng = StdRng::seed_from_u64(7);

        inject(&domain, &pattern, &mut fields, &mut tracers, 3, &mut rng);

        assert_eq!(fields.density[(5, 1, 5)], 1.0);
        assert_eq!(fields.temperature[(12, 0, 12)], 1.0);
        assert_eq!(fields.v[(5, 2, 5)], 5.0);
        assert_eq!(fields.density[(4, 0, 5)], 0.0);
        assert_eq!(tracers.len(), 3 * pattern.cells.len());

        for (pos, _) in tracers.iter() {
            assert!(pos.cmpge(DVec3::new(2.5, 0.0, 2.5)).all());
            assert!(pos.cmple(DVec3::new(6.5, 1.0, 6.5)).all());
        }
    }

    #[test]
    fn solid_source_cells_drive_no_jets() {
        let shape = shape(16);
        let obstacle = crate::obstacle::Obstacle::cube(glam::UVec3::new(5, 0, 5), 2, 0.5).unwrap();
        let domain = Domain::new(shape, Some(obstacle)).unwrap();
        let pattern = SourceKind::CubeCenter.pattern(&shape);
        let mut fields = MacFields::new(&shape);
        let mut tracers = Tracers::default();
        let mut rng = StdRng::seed_from_u64(7);

        inject(&domain, &pattern, &mut fields, &mut tracers, 1, &mut rng);

        assert_eq!(fields.density[(5, 0, 5)], 0.0);
        assert_eq!(fields.v[(5, 1, 5)], 0.0);
        assert_eq!(fields.v[(5, 2, 5)], 0.0);
        assert_eq!(fields.v[(7, 1, 7)], 5.0);
        assert_eq!(tracers.len(), pattern.cells.len() - 8);
    }
}
