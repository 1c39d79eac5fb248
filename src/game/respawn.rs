//! Respawn scheduling
//!
//! A dead player owns exactly one pending [`RespawnTask`]. Timers never touch
//! game state directly: a [`Scheduler`] arranges for a due notice to reach
//! the session later, so revives are serialized with every other event. A
//! due notice whose task id no longer matches the player's stored task
//! (cancelled, or the player left) is ignored.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::game::constants::spawn::RESPAWN_DELAY;
use crate::game::geometry::Geometry;
use crate::game::registry::{PlayerId, PlayerRegistry, PlayerState};
use crate::game::spawn::select_spawn;

/// Identifier of a scheduled respawn
pub type TaskId = u64;

/// Handle to a pending revive
#[derive(Debug)]
pub struct RespawnTask {
    id: TaskId,
    abort: Option<AbortHandle>,
}

impl RespawnTask {
    pub fn new(id: TaskId, abort: Option<AbortHandle>) -> Self {
        Self { id, abort }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Stop the timer; its due event will never be delivered
    pub fn cancel(self) {
        if let Some(abort) = self.abort {
            abort.abort();
        }
    }
}

/// Source of delayed revive events
pub trait Scheduler: Send {
    fn schedule(&mut self, player_id: PlayerId, delay: Duration) -> RespawnTask;
}

/// A respawn request captured by [`RecordingScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRespawn {
    pub player_id: PlayerId,
    pub task_id: TaskId,
    pub delay: Duration,
}

/// Scheduler that records requests instead of arming timers
///
/// Used by tests and benchmarks; fire a recorded request by handing it to
/// the session as a due event.
#[derive(Debug, Clone, Default)]
pub struct RecordingScheduler {
    scheduled: Arc<Mutex<Vec<ScheduledRespawn>>>,
    next_id: TaskId,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything scheduled so far, shared across clones
    pub fn scheduled(&self) -> Vec<ScheduledRespawn> {
        self.scheduled.lock().clone()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&mut self, player_id: PlayerId, delay: Duration) -> RespawnTask {
        self.next_id += 1;
        self.scheduled.lock().push(ScheduledRespawn {
            player_id,
            task_id: self.next_id,
            delay,
        });
        RespawnTask::new(self.next_id, None)
    }
}

/// Enter the dead state's timer, unless a revive is already pending
///
/// Returns true when a new task was scheduled.
pub fn schedule_respawn(
    registry: &mut PlayerRegistry,
    scheduler: &mut dyn Scheduler,
    player_id: PlayerId,
) -> bool {
    let Some(player) = registry.get_mut(player_id) else {
        return false;
    };
    if player.is_alive() || player.has_pending_respawn() {
        return false;
    }

    let task = scheduler.schedule(player_id, RESPAWN_DELAY);
    debug!("Respawn task {} scheduled for {}", task.id(), player_id);
    player.set_respawn_task(task);
    true
}

/// Complete a due respawn task: new spawn, full health, rotation reset
///
/// Returns the revived player, or `None` when the task is stale.
pub fn revive<'a, R: Rng + ?Sized>(
    registry: &'a mut PlayerRegistry,
    geometry: &Geometry,
    rng: &mut R,
    player_id: PlayerId,
    task_id: TaskId,
) -> Option<&'a PlayerState> {
    let player = registry.get_mut(player_id)?;
    if player.pending_respawn_id() != Some(task_id) {
        debug!("Ignoring stale respawn task {} for {}", task_id, player_id);
        return None;
    }

    player.clear_respawn_task();
    player.position = select_spawn(geometry, rng);
    player.rotation = 0.0;
    player.health = crate::game::constants::player::MAX_HEALTH;

    info!("Player {} ({}) respawned", player.name, player.id);
    Some(player)
}
