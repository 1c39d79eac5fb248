//! Movement validation and collision resolution
//!
//! Client-reported positions are untrusted: they are clamped to the map,
//! clamped vertically and pushed out of obstacle footprints before being
//! committed.

use tracing::trace;

use crate::game::constants::{collision, map, map_edge, player};
use crate::game::error::Rejection;
use crate::game::geometry::{Footprint, Geometry};
use crate::game::registry::{PlayerId, PlayerRegistry, PlayerState};
use crate::util::vec3::Vec3;

/// Face of an inflated footprint a point was pushed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Left,
    Right,
    Near,
    Far,
}

/// Push a point that lies strictly inside `fp` onto its nearest face
///
/// Ties resolve in the order left, right, near, far.
fn push_out(fp: &Footprint, x: f32, z: f32) -> (f32, f32, Face) {
    let d_left = (x - fp.min_x).abs();
    let d_right = (fp.max_x - x).abs();
    let d_near = (z - fp.min_z).abs();
    let d_far = (fp.max_z - z).abs();

    let nearest = d_left.min(d_right).min(d_near).min(d_far);

    if nearest == d_left {
        (fp.min_x, z, Face::Left)
    } else if nearest == d_right {
        (fp.max_x, z, Face::Right)
    } else if nearest == d_near {
        (x, fp.min_z, Face::Near)
    } else {
        (x, fp.max_z, Face::Far)
    }
}

/// Clamp to the map and push out of every obstacle the player is low enough
/// to collide with
///
/// At most [`collision::MAX_PASSES`] passes run; a point wedged in a concave
/// corner between two boxes may keep a small residual overlap.
pub fn resolve_horizontal(geometry: &Geometry, x: f32, z: f32, y: f32) -> (f32, f32) {
    let edge = map_edge(player::RADIUS);
    let mut x = x.clamp(-edge, edge);
    let mut z = z.clamp(-edge, edge);

    for pass in 0..collision::MAX_PASSES {
        let mut corrected = false;

        for obstacle in geometry.obstacles() {
            if y > obstacle.h + collision::STEP_TOLERANCE {
                continue;
            }

            let fp = obstacle.footprint().inflate(player::RADIUS);
            if fp.contains(x, z) {
                let (nx, nz, face) = push_out(&fp, x, z);
                trace!("Pass {}: pushed ({}, {}) to {:?} face", pass, x, z, face);
                x = nx;
                z = nz;
                corrected = true;
            }
        }

        if !corrected {
            break;
        }
    }

    (x, z)
}

/// Validate and correct a reported position
pub fn sanitize_position(geometry: &Geometry, reported: Vec3) -> Result<Vec3, Rejection> {
    if !reported.is_finite() {
        return Err(Rejection::NonFinite);
    }

    let y = reported.y.clamp(0.0, map::MAX_HEIGHT);
    let (x, z) = resolve_horizontal(geometry, reported.x, reported.z, y);
    Ok(Vec3::new(x, y, z))
}

/// Apply a movement report from `player_id`
///
/// The yaw is only updated when it is finite; a bad yaw does not void an
/// otherwise valid position.
pub fn apply_move<'a>(
    registry: &'a mut PlayerRegistry,
    geometry: &Geometry,
    player_id: PlayerId,
    position: Vec3,
    rotation: f32,
) -> Result<&'a PlayerState, Rejection> {
    let player = registry.get_mut(player_id).ok_or(Rejection::NotJoined)?;
    if !player.is_alive() {
        return Err(Rejection::PlayerDead);
    }

    player.position = sanitize_position(geometry, position)?;
    if rotation.is_finite() {
        player.rotation = rotation;
    }
    Ok(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::{SpawnPoint, StaticObstacle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    const EPSILON: f32 = 1e-5;

    fn single_box() -> Geometry {
        // Inflated footprint spans (-1.38, 1.38) on both axes
        Geometry::new(
            vec![StaticObstacle::new(0.0, 0.0, 2.0, 2.0, 2.0)],
            vec![SpawnPoint::new(10.0, 10.0)],
        )
    }

    fn joined(geometry: &Geometry) -> (PlayerRegistry, PlayerId) {
        let mut registry = PlayerRegistry::new();
        let mut rng = StdRng::seed_from_u64(4);
        let id = Uuid::new_v4();
        registry.join(id, "Mover", geometry, &mut rng).unwrap();
        (registry, id)
    }

    #[test]
    fn test_push_out_tie_order() {
        let fp = Footprint {
            min_x: -1.0,
            max_x: 1.0,
            min_z: -1.0,
            max_z: 1.0,
        };
        // Center is equidistant from all faces: left wins
        assert_eq!(push_out(&fp, 0.0, 0.0), (-1.0, 0.0, Face::Left));
        assert_eq!(push_out(&fp, 0.0, 0.5), (0.0, 1.0, Face::Far));
        assert_eq!(push_out(&fp, 0.9, 0.0), (1.0, 0.0, Face::Right));
        // Equidistant from near and far only: near wins
        let wide = Footprint {
            min_x: -5.0,
            max_x: 5.0,
            min_z: -1.0,
            max_z: 1.0,
        };
        assert_eq!(push_out(&wide, 0.0, 0.0), (0.0, -1.0, Face::Near));
    }

    #[test]
    fn test_enter_from_east_snaps_to_east_face() {
        let geometry = single_box();
        let (x, z) = resolve_horizontal(&geometry, 1.3, 0.1, 0.0);
        assert!((x - 1.38).abs() < EPSILON);
        assert_eq!(z, 0.1);
    }

    #[test]
    fn test_enter_from_each_side() {
        let geometry = single_box();

        let (x, _) = resolve_horizontal(&geometry, -1.3, 0.2, 0.0);
        assert!((x + 1.38).abs() < EPSILON);

        let (_, z) = resolve_horizontal(&geometry, 0.2, -1.3, 0.0);
        assert!((z + 1.38).abs() < EPSILON);

        let (_, z) = resolve_horizontal(&geometry, 0.2, 1.3, 0.0);
        assert!((z - 1.38).abs() < EPSILON);
    }

    #[test]
    fn test_standing_on_top_not_pushed() {
        let geometry = single_box();
        // Top at 2.0, tolerance 0.25
        assert_eq!(resolve_horizontal(&geometry, 0.5, 0.5, 2.3), (0.5, 0.5));

        let (x, _) = resolve_horizontal(&geometry, 0.5, 0.5, 2.2);
        assert!((x - 1.38).abs() < EPSILON);
    }

    #[test]
    fn test_outside_point_unchanged() {
        let geometry = single_box();
        assert_eq!(resolve_horizontal(&geometry, 5.0, -3.0, 0.0), (5.0, -3.0));
        // Exactly on the inflated edge counts as outside
        assert_eq!(resolve_horizontal(&geometry, 1.38, 0.0, 0.0).0, 1.38);
    }

    #[test]
    fn test_map_bounds_clamped() {
        let geometry = Geometry::default();
        let edge = map_edge(player::RADIUS);
        assert_eq!(resolve_horizontal(&geometry, 100.0, -100.0, 0.0), (edge, -edge));
    }

    #[test]
    fn test_arena_positions_stay_in_bounds_and_outside_obstacles() {
        let geometry = Geometry::arena();
        let edge = map_edge(player::RADIUS);
        let mut rng = StdRng::seed_from_u64(77);

        for _ in 0..2000 {
            use rand::Rng;
            let x: f32 = rng.gen_range(-30.0..30.0);
            let z: f32 = rng.gen_range(-30.0..30.0);
            let (rx, rz) = resolve_horizontal(&geometry, x, z, 0.0);

            assert!(rx >= -edge && rx <= edge);
            assert!(rz >= -edge && rz <= edge);
            // Arena boxes are far enough apart that no concave corners exist
            assert!(!geometry.is_blocked(rx, rz, player::RADIUS));
        }
    }

    #[test]
    fn test_sanitize_rejects_non_finite() {
        let geometry = single_box();
        for bad in [
            Vec3::new(f32::NAN, 0.0, 5.0),
            Vec3::new(5.0, f32::INFINITY, 5.0),
            Vec3::new(5.0, 0.0, f32::NEG_INFINITY),
        ] {
            assert_eq!(sanitize_position(&geometry, bad), Err(Rejection::NonFinite));
        }
    }

    #[test]
    fn test_sanitize_clamps_height() {
        let geometry = single_box();
        assert_eq!(
            sanitize_position(&geometry, Vec3::new(5.0, 50.0, 5.0)).unwrap().y,
            map::MAX_HEIGHT
        );
        assert_eq!(
            sanitize_position(&geometry, Vec3::new(5.0, -2.0, 5.0)).unwrap().y,
            0.0
        );
    }

    #[test]
    fn test_apply_move_commits() {
        let geometry = single_box();
        let (mut registry, id) = joined(&geometry);

        let player = apply_move(&mut registry, &geometry, id, Vec3::new(1.3, 0.0, 0.1), 0.7).unwrap();
        assert!((player.position.x - 1.38).abs() < EPSILON);
        assert_eq!(player.rotation, 0.7);
    }

    #[test]
    fn test_apply_move_keeps_yaw_on_bad_rotation() {
        let geometry = single_box();
        let (mut registry, id) = joined(&geometry);
        apply_move(&mut registry, &geometry, id, Vec3::new(4.0, 0.0, 4.0), 1.0).unwrap();

        let player = apply_move(&mut registry, &geometry, id, Vec3::new(5.0, 0.0, 4.0), f32::NAN).unwrap();
        assert_eq!(player.rotation, 1.0);
        assert_eq!(player.position.x, 5.0);
    }

    #[test]
    fn test_apply_move_rejects_without_state_change() {
        let geometry = single_box();
        let (mut registry, id) = joined(&geometry);
        let before = registry.get(id).unwrap().position;

        let result = apply_move(&mut registry, &geometry, id, Vec3::new(f32::NAN, 0.0, 0.0), 2.0);
        assert_eq!(result.unwrap_err(), Rejection::NonFinite);
        let player = registry.get(id).unwrap();
        assert_eq!(player.position, before);
        assert_eq!(player.rotation, 0.0);
    }

    #[test]
    fn test_apply_move_dead_or_unknown() {
        let geometry = single_box();
        let (mut registry, id) = joined(&geometry);

        let result = apply_move(&mut registry, &geometry, Uuid::new_v4(), Vec3::ZERO, 0.0);
        assert_eq!(result.unwrap_err(), Rejection::NotJoined);

        registry.get_mut(id).unwrap().health = 0;
        let result = apply_move(&mut registry, &geometry, id, Vec3::new(5.0, 0.0, 5.0), 0.0);
        assert_eq!(result.unwrap_err(), Rejection::PlayerDead);
    }
}
