//! Player registry
//!
//! Single owner of every connected player's state. Other components read and
//! mutate players only through the registry they are handed.

use std::time::Instant;

use hashbrown::HashMap;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::game::constants::player::{MAX_HEALTH, MAX_NAME_CHARS};
use crate::game::error::JoinError;
use crate::game::geometry::Geometry;
use crate::game::respawn::{RespawnTask, TaskId};
use crate::game::spawn::select_spawn;
use crate::util::vec3::Vec3;

/// Unique player identifier, allocated per connection
pub type PlayerId = Uuid;

/// Authoritative state of one connected player
#[derive(Debug)]
pub struct PlayerState {
    pub id: PlayerId,
    /// Display name (trimmed, at most 20 characters)
    pub name: String,
    /// CSS color string shown by clients
    pub color: String,
    /// Feet position in world space
    pub position: Vec3,
    /// Yaw (radians)
    pub rotation: f32,
    /// 0 means dead
    pub health: u8,
    /// Time of the last resolved shot
    pub last_shot_at: Option<Instant>,
    /// Pending revive, present only while dead
    respawn_task: Option<RespawnTask>,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String, color: String, position: Vec3) -> Self {
        Self {
            id,
            name,
            color,
            position,
            rotation: 0.0,
            health: MAX_HEALTH,
            last_shot_at: None,
            respawn_task: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn has_pending_respawn(&self) -> bool {
        self.respawn_task.is_some()
    }

    pub fn pending_respawn_id(&self) -> Option<TaskId> {
        self.respawn_task.as_ref().map(RespawnTask::id)
    }

    pub(crate) fn set_respawn_task(&mut self, task: RespawnTask) {
        self.respawn_task = Some(task);
    }

    pub(crate) fn clear_respawn_task(&mut self) {
        self.respawn_task = None;
    }

    /// Subtract damage, floored at zero; returns true if this hit killed
    pub fn apply_damage(&mut self, amount: u8) -> bool {
        let was_alive = self.is_alive();
        self.health = self.health.saturating_sub(amount);
        was_alive && !self.is_alive()
    }
}

/// Normalize a requested display name
///
/// Control characters are removed, surrounding whitespace trimmed and the
/// result truncated to [`MAX_NAME_CHARS`] characters.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let truncated: String = cleaned.trim().chars().take(MAX_NAME_CHARS).collect();
    truncated.trim_end().to_string()
}

/// Random display color with fixed saturation and lightness
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let hue: u16 = rng.gen_range(0..360);
    format!("hsl({} 65% 55%)", hue)
}

/// Connected players, iterated in join order
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, PlayerState>,
    order: Vec<PlayerId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a player for connection `id`
    ///
    /// Fails if the name is empty after sanitizing, if another connected
    /// player has the same name ignoring case, or if `id` already joined.
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        raw_name: &str,
        geometry: &Geometry,
        rng: &mut R,
    ) -> Result<&PlayerState, JoinError> {
        if self.players.contains_key(&id) {
            return Err(JoinError::AlreadyJoined);
        }

        let name = sanitize_name(raw_name);
        if name.is_empty() {
            return Err(JoinError::NameEmpty);
        }
        if self.is_name_taken(&name) {
            return Err(JoinError::NameTaken);
        }

        let color = random_color(rng);
        let position = select_spawn(geometry, rng);
        info!("Player {} ({}) joined", name, id);

        self.order.push(id);
        Ok(self
            .players
            .entry(id)
            .or_insert(PlayerState::new(id, name, color, position)))
    }

    /// Remove a player, cancelling any pending respawn
    pub fn leave(&mut self, id: PlayerId) -> Option<PlayerState> {
        let mut player = self.players.remove(&id)?;
        self.order.retain(|other| *other != id);

        if let Some(task) = player.respawn_task.take() {
            task.cancel();
        }

        info!("Player {} ({}) left", player.name, id);
        Some(player)
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        let normalized = name.trim().to_lowercase();
        self.players
            .values()
            .any(|p| p.name.to_lowercase() == normalized)
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    /// Players in join order
    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }
}
