//! Tokio-backed respawn timers
//!
//! Each scheduled revive is a sleeping task that posts
//! [`SessionEvent::RespawnDue`] into the session channel when it wakes.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::game::registry::PlayerId;
use crate::game::respawn::{RespawnTask, Scheduler, TaskId};
use crate::net::game_session::SessionEvent;

/// Production scheduler backed by tokio timers
pub struct TokioScheduler {
    events: UnboundedSender<SessionEvent>,
    next_id: TaskId,
}

impl TokioScheduler {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self { events, next_id: 1 }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, player_id: PlayerId, delay: Duration) -> RespawnTask {
        let task_id = self.next_id;
        self.next_id += 1;

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events
                .send(SessionEvent::RespawnDue { player_id, task_id })
                .is_err()
            {
                debug!("Session closed before respawn of {} fired", player_id);
            }
        });

        RespawnTask::new(task_id, Some(handle.abort_handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::spawn::RESPAWN_DELAY;
    use tokio::sync::mpsc::unbounded_channel;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_posts_due_event() {
        let (tx, mut rx) = unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let id = Uuid::new_v4();

        let task = scheduler.schedule(id, RESPAWN_DELAY);
        let expected = task.id();

        match rx.recv().await {
            Some(SessionEvent::RespawnDue { player_id, task_id }) => {
                assert_eq!(player_id, id);
                assert_eq!(task_id, expected);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_ids_are_unique() {
        let (tx, _rx) = unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let first = scheduler.schedule(Uuid::new_v4(), RESPAWN_DELAY);
        let second = scheduler.schedule(Uuid::new_v4(), RESPAWN_DELAY);
        assert_ne!(first.id(), second.id());
        first.cancel();
        second.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let (tx, mut rx) = unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let task = scheduler.schedule(Uuid::new_v4(), RESPAWN_DELAY);
        task.cancel();
        drop(scheduler);

        // Sender side is gone once the aborted task is dropped
        assert!(rx.recv().await.is_none());
    }
}
