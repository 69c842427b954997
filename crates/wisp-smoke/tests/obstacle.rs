use glam::{DVec3, UVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wisp_smoke::linalg::{IncompleteCholesky, StencilOperator};
use wisp_smoke::{Axis, Domain, GridShape, Motion, Obstacle};

fn domain(min: UVec3, edge: u32) -> Domain {
    let shape = GridShape::new(UVec3::new(12, 10, 8), 0.5).unwrap();
    let obstacle = Obstacle::cube(min, edge, 0.5).unwrap();
    Domain::new(shape, Some(obstacle)).unwrap()
}

#[test]
fn oscillation_reverses_once_over_eight_steps() {
    let shape = GridShape::new(UVec3::new(8, 8, 8), 1.0).unwrap();
    let obstacle = Obstacle::cube(UVec3::ZERO, 4, 1.0).unwrap();
    let mut domain = Domain::new(shape, Some(obstacle)).unwrap();

    let mut reversals = 0;
    for _ in 0..8 {
        if domain.advance_obstacle() == Some(Motion::Reversed) {
            reversals += 1;
            assert_eq!(domain.obstacle().unwrap().max().x, 7);
        }

        let o = domain.obstacle().unwrap();
        assert!(o.max().x <= 7);
    }

    assert_eq!(reversals, 1);
    assert_eq!(domain.obstacle().unwrap().min().x, 1);
}

#[test]
fn oscillation_follows_the_configured_axis() {
    let shape = GridShape::cubic(6, 1.0).unwrap();
    let obstacle = Obstacle::cube(UVec3::new(1, 1, 1), 2, 1.0).unwrap().with_axis(Axis::Y);
    let mut domain = Domain::new(shape, Some(obstacle)).unwrap();

    domain.advance_obstacle();
    let o = domain.obstacle().unwrap();
    assert_eq!(o.min(), UVec3::new(1, 2, 1));
}

#[test]
fn clip_always_lands_in_the_fluid() {
    let mut rng = StdRng::seed_from_u64(42);

    for (min, edge) in [(UVec3::new(3, 2, 2), 4), (UVec3::new(0, 0, 0), 3), (UVec3::new(8, 6, 4), 4)] {
        let domain = domain(min, edge);
        let size = domain.shape().size();
        let obstacle = *domain.obstacle().unwrap();

        for _ in 0..2000 {
            let inside = loop {
                let p = DVec3::new(rng.gen_range(0.0..=size.x), rng.gen_range(0.0..=size.y), rng.gen_range(0.0..=size.z));
                if !obstacle.contains_point(p) {
                    break p;
                }
            };
            let p = DVec3::new(
                rng.gen_range(-size.x..2.0 * size.x),
                rng.gen_range(-size.y..2.0 * size.y),
                rng.gen_range(-size.z..2.0 * size.z),
            );

            let clipped = domain.clip(p, inside);
            assert!(clipped.cmpge(DVec3::ZERO).all() && clipped.cmple(size).all(), "{p} from {inside} -> {clipped}");
            assert!(!obstacle.contains_point(clipped), "{p} from {inside} -> {clipped}");
        }
    }
}

#[test]
fn operator_is_symmetric() {
    let domain = domain(UVec3::new(3, 2, 2), 4);
    let operator = StencilOperator::from_domain(&domain);

    for (i, j, k) in domain.shape().cells() {
        for axis in Axis::ALL {
            let s = axis.step();
            let (ni, nj, nk) = (i as isize + s[0], j as isize + s[1], k as isize + s[2]);
            if !domain.shape().contains_cell(ni, nj, nk) {
                assert_eq!(operator.plus(axis, i, j, k), 0.0);
                continue;
            }

            let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
            let forward = operator.plus(axis, i, j, k);
            let backward = operator.minus(axis, ni, nj, nk);
            assert_eq!(forward, backward);

            let coupled = domain.is_fluid(i as isize, j as isize, k as isize)
                && domain.is_fluid(ni as isize, nj as isize, nk as isize);
            assert_eq!(forward, if coupled { -1.0 } else { 0.0 });
        }
    }
}

#[test]
fn preconditioner_rebuild_is_idempotent() {
    let mut domain = domain(UVec3::new(3, 2, 2), 4);
    let mut operator = StencilOperator::from_domain(&domain);
    let mut ic = IncompleteCholesky::from_operator(&operator, 0.97);
    let first = ic.values().clone();

    ic.build(&operator);
    assert_eq!(ic.values(), &first);

    // Moving away and back again restores the same factor.
    domain.advance_obstacle();
    operator.build(&domain);
    ic.build(&operator);
    assert_ne!(ic.values(), &first);

    domain.reset();
    operator.build(&domain);
    ic.build(&operator);
    assert_eq!(ic.values(), &first);
}
