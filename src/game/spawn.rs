//! Spawn point selection
//!
//! Fixed candidates are tried in random order; when every candidate is
//! covered, random points inside the map are sampled; the map origin is the
//! last resort.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::constants::{map, player, spawn};
use crate::game::geometry::Geometry;
use crate::util::vec3::Vec3;

/// Where a spawn position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSource {
    Candidate,
    Sampled,
    Fallback,
}

/// Pick an unobstructed spawn position
pub fn select_spawn<R: Rng + ?Sized>(geometry: &Geometry, rng: &mut R) -> Vec3 {
    select_spawn_with_source(geometry, rng).0
}

/// Pick an unobstructed spawn position and report which stage produced it
pub fn select_spawn_with_source<R: Rng + ?Sized>(
    geometry: &Geometry,
    rng: &mut R,
) -> (Vec3, SpawnSource) {
    let clearance = player::RADIUS + spawn::CLEARANCE;

    let mut candidates = geometry.spawn_points().to_vec();
    candidates.shuffle(rng);

    if let Some(point) = candidates
        .iter()
        .find(|p| !geometry.is_blocked(p.x, p.z, clearance))
    {
        return (point.position(), SpawnSource::Candidate);
    }

    let limit = map::HALF_SIZE - spawn::SAMPLE_INSET;
    for _ in 0..spawn::SAMPLE_ATTEMPTS {
        let x = rng.gen_range(-limit..limit);
        let z = rng.gen_range(-limit..limit);
        if !geometry.is_blocked(x, z, clearance) {
            return (Vec3::new(x, 0.0, z), SpawnSource::Sampled);
        }
    }

    tracing::warn!("No unobstructed spawn found, falling back to map origin");
    (Vec3::ZERO, SpawnSource::Fallback)
}
