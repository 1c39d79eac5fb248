//! Static world geometry
//!
//! Obstacles and spawn candidates are built once at startup and shared
//! read-only by movement validation, combat and spawn selection.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;

/// Horizontal rectangle on the x/z plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Footprint {
    /// Grow the rectangle by `margin` on every side
    #[inline]
    pub fn inflate(&self, margin: f32) -> Self {
        Self {
            min_x: self.min_x - margin,
            max_x: self.max_x + margin,
            min_z: self.min_z - margin,
            max_z: self.max_z + margin,
        }
    }

    /// Strict containment: points on an edge are outside
    #[inline]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x > self.min_x && x < self.max_x && z > self.min_z && z < self.max_z
    }
}

/// Immutable axis-aligned box standing on the ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticObstacle {
    /// Center x
    pub x: f32,
    /// Center z
    pub z: f32,
    /// Full extent along x
    pub w: f32,
    /// Full extent along z
    pub d: f32,
    /// Height of the top face
    pub h: f32,
}

impl StaticObstacle {
    pub const fn new(x: f32, z: f32, w: f32, d: f32, h: f32) -> Self {
        Self { x, z, w, d, h }
    }

    pub fn footprint(&self) -> Footprint {
        Footprint {
            min_x: self.x - self.w / 2.0,
            max_x: self.x + self.w / 2.0,
            min_z: self.z - self.d / 2.0,
            max_z: self.z + self.d / 2.0,
        }
    }

    /// Minimum corner of the collider box
    pub fn min_corner(&self) -> Vec3 {
        Vec3::new(self.x - self.w / 2.0, 0.0, self.z - self.d / 2.0)
    }

    /// Maximum corner of the collider box
    pub fn max_corner(&self) -> Vec3 {
        Vec3::new(self.x + self.w / 2.0, self.h, self.z + self.d / 2.0)
    }
}

/// Fixed spawn candidate on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub z: f32,
}

impl SpawnPoint {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, 0.0, self.z)
    }
}

const ARENA_OBSTACLES: [StaticObstacle; 6] = [
    StaticObstacle::new(-9.0, -7.0, 4.5, 4.5, 2.6),
    StaticObstacle::new(8.5, -8.0, 3.8, 5.2, 2.9),
    StaticObstacle::new(-7.0, 8.0, 5.4, 2.6, 2.2),
    StaticObstacle::new(8.0, 8.0, 4.4, 3.0, 2.0),
    StaticObstacle::new(0.0, 0.0, 6.2, 2.4, 1.9),
    StaticObstacle::new(0.0, -12.0, 8.5, 2.0, 1.7),
];

const ARENA_SPAWN_POINTS: [SpawnPoint; 6] = [
    SpawnPoint::new(-15.0, -15.0),
    SpawnPoint::new(15.0, 15.0),
    SpawnPoint::new(-15.0, 15.0),
    SpawnPoint::new(15.0, -15.0),
    SpawnPoint::new(0.0, 15.0),
    SpawnPoint::new(0.0, -15.0),
];

/// The geometry store: obstacles plus spawn candidates
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    obstacles: Vec<StaticObstacle>,
    spawn_points: Vec<SpawnPoint>,
}

impl Geometry {
    pub fn new(obstacles: Vec<StaticObstacle>, spawn_points: Vec<SpawnPoint>) -> Self {
        Self {
            obstacles,
            spawn_points,
        }
    }

    /// The default arena map
    pub fn arena() -> Self {
        Self::new(ARENA_OBSTACLES.to_vec(), ARENA_SPAWN_POINTS.to_vec())
    }

    pub fn obstacles(&self) -> &[StaticObstacle] {
        &self.obstacles
    }

    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    /// Whether a body of `radius` at (x, z) would overlap any obstacle footprint
    pub fn is_blocked(&self, x: f32, z: f32, radius: f32) -> bool {
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.footprint().inflate(radius).contains(x, z))
    }
}
