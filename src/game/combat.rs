//! Hit-scan combat resolution
//!
//! A shot is an instantaneous ray from the shooter's eye. The nearest
//! obstacle entry and the nearest living player hit sphere along the ray are
//! computed independently; the player is hit only if strictly closer than
//! every obstacle and within range.

use std::time::Instant;

use tracing::{debug, info};

use crate::game::constants::{combat, player};
use crate::game::error::Rejection;
use crate::game::geometry::Geometry;
use crate::game::registry::{PlayerId, PlayerRegistry};
use crate::util::vec3::Vec3;

/// A confirmed hit
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub target_id: PlayerId,
    pub target_name: String,
    /// Target health after damage
    pub health: u8,
    /// This hit took the target from alive to dead
    pub killed: bool,
    pub distance: f32,
}

/// Result of a resolved shot
#[derive(Debug, Clone, PartialEq)]
pub struct ShotOutcome {
    pub shooter_id: PlayerId,
    pub shooter_name: String,
    pub origin: Vec3,
    /// Normalized aim direction
    pub direction: Vec3,
    pub hit: Option<Hit>,
}

/// Normalize an aim vector, rejecting non-finite or near-zero input
pub fn normalize_aim(direction: Vec3) -> Result<Vec3, Rejection> {
    if !direction.is_finite() {
        return Err(Rejection::NonFinite);
    }
    let (normalized, length) = direction.normalize_with_length();
    if !length.is_finite() {
        return Err(Rejection::NonFinite);
    }
    if length < combat::MIN_AIM_LENGTH {
        return Err(Rejection::AimTooShort(length));
    }
    Ok(normalized)
}

/// Entry distance of a ray into an axis-aligned box (slab method)
///
/// A ray starting inside the box reports its exit distance.
pub fn ray_aabb_distance(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin.axis(axis);
        let d = direction.axis(axis);
        let (lo, hi) = (min.axis(axis), max.axis(axis));

        if d.abs() < combat::SLAB_EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let mut t1 = (lo - o) / d;
        let mut t2 = (hi - o) / d;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

/// Distance along a normalized ray to a sphere surface
pub fn ray_sphere_distance(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_sq() - radius * radius;
    let h = b * b - c;
    if h < 0.0 {
        return None;
    }

    let sqrt_h = h.sqrt();
    let near = -b - sqrt_h;
    let far = -b + sqrt_h;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Closest obstacle along the ray, or the shot range if none is closer
pub fn nearest_obstacle_distance(geometry: &Geometry, origin: Vec3, direction: Vec3) -> f32 {
    geometry
        .obstacles()
        .iter()
        .filter_map(|o| ray_aabb_distance(origin, direction, o.min_corner(), o.max_corner()))
        .fold(combat::SHOT_RANGE, f32::min)
}

/// Closest living player other than the shooter whose hit sphere the ray meets
///
/// Equal distances keep the earlier-joined player.
pub fn nearest_target(
    registry: &PlayerRegistry,
    shooter_id: PlayerId,
    origin: Vec3,
    direction: Vec3,
) -> Option<(PlayerId, f32)> {
    let mut nearest: Option<(PlayerId, f32)> = None;

    for candidate in registry.iter() {
        if candidate.id == shooter_id || !candidate.is_alive() {
            continue;
        }

        let center = candidate.position + Vec3::UP * player::HITBOX_CENTER_HEIGHT;
        if let Some(dist) = ray_sphere_distance(origin, direction, center, player::HITBOX_RADIUS) {
            if nearest.map_or(true, |(_, best)| dist < best) {
                nearest = Some((candidate.id, dist));
            }
        }
    }

    nearest
}

/// Obstacles win ties: a target level with a wall is behind it
#[inline]
pub fn is_confirmed_hit(target_distance: f32, obstacle_distance: f32) -> bool {
    target_distance <= combat::SHOT_RANGE && target_distance < obstacle_distance
}

/// Resolve a shot from `shooter_id` aimed along `direction`
///
/// The cooldown is consumed before the aim is validated, so a malformed
/// request still costs the shooter a shot slot.
pub fn resolve_shot(
    registry: &mut PlayerRegistry,
    geometry: &Geometry,
    shooter_id: PlayerId,
    direction: Vec3,
    now: Instant,
) -> Result<ShotOutcome, Rejection> {
    let shooter = registry.get_mut(shooter_id).ok_or(Rejection::NotJoined)?;
    if !shooter.is_alive() {
        return Err(Rejection::PlayerDead);
    }

    if let Some(last) = shooter.last_shot_at {
        let elapsed = now.saturating_duration_since(last);
        if elapsed < combat::SHOT_COOLDOWN {
            return Err(Rejection::Cooldown(combat::SHOT_COOLDOWN - elapsed));
        }
    }
    shooter.last_shot_at = Some(now);

    let direction = normalize_aim(direction)?;
    let origin = shooter.position + Vec3::UP * player::EYE_HEIGHT;
    let shooter_name = shooter.name.clone();

    let obstacle_distance = nearest_obstacle_distance(geometry, origin, direction);
    let target = nearest_target(registry, shooter_id, origin, direction);

    let hit = match target {
        Some((target_id, distance)) if is_confirmed_hit(distance, obstacle_distance) => {
            registry.get_mut(target_id).map(|target| {
                let killed = target.apply_damage(combat::SHOT_DAMAGE);
                if killed {
                    info!("{} killed {}", shooter_name, target.name);
                }
                Hit {
                    target_id,
                    target_name: target.name.clone(),
                    health: target.health,
                    killed,
                    distance,
                }
            })
        }
        Some((target_id, distance)) => {
            debug!(
                "Shot at {} blocked: target {:.3}, obstacle {:.3}",
                target_id, distance, obstacle_distance
            );
            None
        }
        None => None,
    };

    Ok(ShotOutcome {
        shooter_id,
        shooter_name,
        origin,
        direction,
        hit,
    })
}
