//! Shared fixtures for tests: seeded random point clouds and brute-force oracles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::r#type::KDPoint;

/// `n` points uniformly distributed in the unit cube, reproducible from `seed`.
pub(crate) fn random_points<const D: usize>(n: usize, seed: u64) -> Vec<[f64; D]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| std::array::from_fn(|_| rng.gen::<f64>()))
        .collect()
}

/// `n` points on an integer lattice in `[0, side)^D`, so many share coordinates and distances.
pub(crate) fn lattice_points<const D: usize>(n: usize, side: u32, seed: u64) -> Vec<[f64; D]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| std::array::from_fn(|_| rng.gen_range(0..side) as f64))
        .collect()
}

/// Insertion indices of every point strictly within `radius` of `query`, ascending.
pub(crate) fn brute_force_within<P: KDPoint>(points: &[P], query: &P, radius: P::Num) -> Vec<u32> {
    let radius_squared = radius * radius;
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| query.distance_squared(p) < radius_squared)
        .map(|(i, _)| i as u32)
        .collect()
}

/// Squared distances from `query` to every point, ascending.
pub(crate) fn brute_force_distances<P: KDPoint>(points: &[P], query: &P) -> Vec<P::Num> {
    let mut distances: Vec<P::Num> = points.iter().map(|p| query.distance_squared(p)).collect();
    distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
    distances
}
