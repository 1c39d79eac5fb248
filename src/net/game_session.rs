//! Game session - the single owner of all mutable game state
//!
//! Every input (client messages, connection changes, respawn timers) arrives
//! as a [`SessionEvent`] on one channel and is handled to completion before
//! the next. Handlers return the messages to send; the actor dispatches them
//! after the handler has returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tokio::sync::mpsc::{Sender, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::chat::{kill_notice, sanitize_chat, unix_millis};
use crate::game::combat::resolve_shot;
use crate::game::constants::chat::SYSTEM_NAME;
use crate::game::error::Rejection;
use crate::game::geometry::Geometry;
use crate::game::movement::apply_move;
use crate::game::registry::{PlayerId, PlayerRegistry};
use crate::game::respawn::{revive, schedule_respawn, Scheduler, TaskId};
use crate::metrics::Metrics;
use crate::net::broadcast::{Broadcaster, ConnectionId, Outbound, OutboundBatch, Payload};
use crate::net::protocol::{ChatSender, ClientMessage, PlayerSnapshot, ServerMessage};
use crate::util::vec3::Vec3;

/// How often the actor logs a status line
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Everything the session reacts to
#[derive(Debug)]
pub enum SessionEvent {
    /// A transport connection opened; `outbox` feeds its writer task
    Connected {
        conn_id: ConnectionId,
        outbox: Sender<Payload>,
    },
    /// A decoded client message
    Message {
        conn_id: ConnectionId,
        message: ClientMessage,
    },
    /// The connection closed, for any reason
    Disconnected { conn_id: ConnectionId },
    /// A respawn timer expired
    RespawnDue { player_id: PlayerId, task_id: TaskId },
}

/// Authoritative game state plus the services that mutate it
pub struct GameSession {
    registry: PlayerRegistry,
    geometry: Geometry,
    rng: StdRng,
    scheduler: Box<dyn Scheduler>,
    metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(
        geometry: Geometry,
        rng: StdRng,
        scheduler: Box<dyn Scheduler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        info!(
            "Game session created with {} obstacles and {} spawn points",
            geometry.obstacles().len(),
            geometry.spawn_points().len()
        );

        Self {
            registry: PlayerRegistry::new(),
            geometry,
            rng,
            scheduler,
            metrics,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Apply one event and dispatch the resulting messages
    pub fn handle_event(&mut self, event: SessionEvent, broadcaster: &mut Broadcaster) {
        let started = Instant::now();

        let batch = match event {
            SessionEvent::Connected { conn_id, outbox } => {
                debug!("Connection {} registered with session", conn_id);
                broadcaster.register(conn_id, outbox);
                OutboundBatch::new()
            }
            SessionEvent::Message { conn_id, message } => {
                self.handle_message(conn_id, message, started)
            }
            SessionEvent::Disconnected { conn_id } => {
                broadcaster.unregister(conn_id);
                self.handle_disconnect(conn_id)
            }
            SessionEvent::RespawnDue { player_id, task_id } => {
                self.handle_respawn_due(player_id, task_id)
            }
        };

        broadcaster.dispatch(batch);
        self.metrics.record_event_time(started.elapsed());
    }

    /// Route a client message to its handler
    ///
    /// Rejected input is logged and dropped; the sender gets no reply.
    pub fn handle_message(
        &mut self,
        conn_id: ConnectionId,
        message: ClientMessage,
        now: Instant,
    ) -> OutboundBatch {
        let result = match message {
            ClientMessage::Join { name } => Ok(self.handle_join(conn_id, &name)),
            ClientMessage::PlayerMoved { position, rotation } => {
                self.handle_move(conn_id, position, rotation)
            }
            ClientMessage::Shoot { direction } => self.handle_shoot(conn_id, direction, now),
            ClientMessage::Chat { message } => self.handle_chat(conn_id, &message),
            ClientMessage::Ping { timestamp } => Ok(self.handle_ping(conn_id, timestamp)),
        };

        let batch = match result {
            Ok(batch) => batch,
            Err(rejection) => {
                debug!(
                    "Dropped message from {} [{}]: {}",
                    conn_id,
                    rejection.kind(),
                    rejection
                );
                Metrics::incr(&self.metrics.messages_dropped);
                OutboundBatch::new()
            }
        };

        self.refresh_gauges();
        batch
    }

    fn handle_join(&mut self, conn_id: ConnectionId, name: &str) -> OutboundBatch {
        let mut batch = OutboundBatch::new();

        let joined = match self
            .registry
            .join(conn_id, name, &self.geometry, &mut self.rng)
        {
            Ok(player) => PlayerSnapshot::from_player(player),
            Err(e) => {
                debug!("Join from {} refused: {}", conn_id, e);
                batch.push(Outbound::to(
                    conn_id,
                    ServerMessage::JoinError {
                        message: e.to_string(),
                    },
                ));
                return batch;
            }
        };

        let players = self
            .registry
            .iter()
            .map(PlayerSnapshot::from_player)
            .collect();

        batch.push(Outbound::to(
            conn_id,
            ServerMessage::JoinSuccess {
                id: conn_id,
                players,
            },
        ));
        batch.push(Outbound::all_except(
            conn_id,
            ServerMessage::PlayerJoined(joined),
        ));
        batch
    }

    fn handle_move(
        &mut self,
        conn_id: ConnectionId,
        position: Vec3,
        rotation: f32,
    ) -> Result<OutboundBatch, Rejection> {
        let player = apply_move(&mut self.registry, &self.geometry, conn_id, position, rotation)?;

        let mut batch = OutboundBatch::new();
        batch.push(Outbound::all_except(
            conn_id,
            ServerMessage::PlayerMoved {
                id: player.id,
                position: player.position,
                rotation: player.rotation,
            },
        ));
        Ok(batch)
    }

    fn handle_shoot(
        &mut self,
        conn_id: ConnectionId,
        direction: Vec3,
        now: Instant,
    ) -> Result<OutboundBatch, Rejection> {
        let outcome = resolve_shot(&mut self.registry, &self.geometry, conn_id, direction, now)?;
        Metrics::incr(&self.metrics.shots_resolved);

        let mut batch = OutboundBatch::new();

        if let Some(hit) = &outcome.hit {
            Metrics::incr(&self.metrics.hits);
            batch.push(Outbound::all(ServerMessage::PlayerHealth {
                id: hit.target_id,
                health: hit.health,
            }));

            if hit.killed {
                Metrics::incr(&self.metrics.kills);
                batch.push(Outbound::all(system_chat(kill_notice(
                    &outcome.shooter_name,
                    &hit.target_name,
                ))));
                schedule_respawn(&mut self.registry, self.scheduler.as_mut(), hit.target_id);
            }
        }

        batch.push(Outbound::all(ServerMessage::ShotFired {
            from_id: outcome.shooter_id,
            origin: outcome.origin,
            direction: outcome.direction,
            hit_id: outcome.hit.as_ref().map(|hit| hit.target_id),
        }));
        Ok(batch)
    }

    fn handle_chat(
        &mut self,
        conn_id: ConnectionId,
        message: &str,
    ) -> Result<OutboundBatch, Rejection> {
        let player = self.registry.get(conn_id).ok_or(Rejection::NotJoined)?;
        let text = sanitize_chat(message).ok_or(Rejection::EmptyChat)?;

        let mut batch = OutboundBatch::new();
        batch.push(Outbound::all(ServerMessage::Chat {
            sender: ChatSender::Player(player.id),
            name: player.name.clone(),
            message: text,
            time: unix_millis(),
        }));
        Ok(batch)
    }

    fn handle_ping(&self, conn_id: ConnectionId, timestamp: u64) -> OutboundBatch {
        let mut batch = OutboundBatch::new();
        batch.push(Outbound::to(
            conn_id,
            ServerMessage::Pong {
                client_timestamp: timestamp,
                server_timestamp: unix_millis(),
            },
        ));
        batch
    }

    /// Remove the connection's player, if it joined
    pub fn handle_disconnect(&mut self, conn_id: ConnectionId) -> OutboundBatch {
        let mut batch = OutboundBatch::new();

        if self.registry.leave(conn_id).is_some() {
            batch.push(Outbound::all_except(
                conn_id,
                ServerMessage::PlayerLeft { id: conn_id },
            ));
        } else {
            debug!("Connection {} closed without joining", conn_id);
        }

        self.refresh_gauges();
        batch
    }

    /// Revive a player whose timer fired; stale timers produce nothing
    pub fn handle_respawn_due(&mut self, player_id: PlayerId, task_id: TaskId) -> OutboundBatch {
        let mut batch = OutboundBatch::new();

        let Some(player) = revive(
            &mut self.registry,
            &self.geometry,
            &mut self.rng,
            player_id,
            task_id,
        ) else {
            return batch;
        };

        batch.push(Outbound::all(ServerMessage::PlayerRespawned {
            id: player.id,
            position: player.position,
            rotation: player.rotation,
            health: player.health,
        }));
        batch.push(Outbound::all(ServerMessage::PlayerHealth {
            id: player.id,
            health: player.health,
        }));

        Metrics::incr(&self.metrics.respawns);
        self.refresh_gauges();
        batch
    }

    fn refresh_gauges(&self) {
        use std::sync::atomic::Ordering;
        self.metrics
            .players_active
            .store(self.registry.len() as u64, Ordering::Relaxed);
        self.metrics
            .players_alive
            .store(self.registry.alive_count() as u64, Ordering::Relaxed);
    }
}

fn system_chat(message: String) -> ServerMessage {
    ServerMessage::Chat {
        sender: ChatSender::System,
        name: SYSTEM_NAME.to_string(),
        message,
        time: unix_millis(),
    }
}

/// Start the session actor
///
/// The actor owns `session` and runs until every event sender is dropped.
pub fn start_session_actor(
    mut session: GameSession,
    mut events: UnboundedReceiver<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut broadcaster = Broadcaster::new(session.metrics.clone());
        let mut status = interval(STATUS_INTERVAL);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let start = Instant::now();

        info!("Session actor started");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => session.handle_event(event, &mut broadcaster),
                    None => break,
                },
                _ = status.tick() => {
                    info!(
                        "Session: {}s, {} connections, {} players ({} alive)",
                        start.elapsed().as_secs(),
                        broadcaster.len(),
                        session.registry.len(),
                        session.registry.alive_count()
                    );
                }
            }
        }

        info!("Session actor stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::net::OUTBOX_CAPACITY;
    use crate::game::constants::{combat, player, spawn};
    use crate::game::geometry::{SpawnPoint, StaticObstacle};
    use crate::game::respawn::RecordingScheduler;
    use crate::net::broadcast::Recipient;
    use crate::net::protocol::decode;
    use rand::SeedableRng;
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc::{channel, unbounded_channel};
    use uuid::Uuid;

    struct Harness {
        session: GameSession,
        scheduler: RecordingScheduler,
        metrics: Arc<Metrics>,
    }

    fn harness(geometry: Geometry) -> Harness {
        let scheduler = RecordingScheduler::new();
        let metrics = Arc::new(Metrics::new());
        let session = GameSession::new(
            geometry,
            StdRng::seed_from_u64(42),
            Box::new(scheduler.clone()),
            metrics.clone(),
        );
        Harness {
            session,
            scheduler,
            metrics,
        }
    }

    fn open_arena() -> Geometry {
        Geometry::new(vec![], vec![SpawnPoint::new(10.0, 10.0)])
    }

    fn join(session: &mut GameSession, name: &str) -> PlayerId {
        let id = Uuid::new_v4();
        let batch = session.handle_message(
            id,
            ClientMessage::Join {
                name: name.to_string(),
            },
            Instant::now(),
        );
        assert!(matches!(
            batch[0].message,
            ServerMessage::JoinSuccess { .. }
        ));
        id
    }

    fn place(session: &mut GameSession, id: PlayerId, position: Vec3) {
        session.registry.get_mut(id).unwrap().position = position;
    }

    /// Shooter at the origin aiming down -z at a target 5 units away
    fn duel(h: &mut Harness) -> (PlayerId, PlayerId) {
        let shooter = join(&mut h.session, "Alice");
        let target = join(&mut h.session, "Bob");
        place(&mut h.session, shooter, Vec3::ZERO);
        place(&mut h.session, target, Vec3::new(0.0, 0.0, -5.0));
        (shooter, target)
    }

    fn shoot(session: &mut GameSession, id: PlayerId, now: Instant) -> OutboundBatch {
        session.handle_message(
            id,
            ClientMessage::Shoot {
                direction: Vec3::new(0.0, 0.0, -1.0),
            },
            now,
        )
    }

    #[test]
    fn test_join_success_and_announcement() {
        let mut h = harness(Geometry::arena());
        let a = join(&mut h.session, "Alice");

        let b = Uuid::new_v4();
        let batch = h.session.handle_message(
            b,
            ClientMessage::Join {
                name: "Bob".to_string(),
            },
            Instant::now(),
        );

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].recipient, Recipient::One(b));
        match &batch[0].message {
            ServerMessage::JoinSuccess { id, players } => {
                assert_eq!(*id, b);
                let ids: Vec<_> = players.iter().map(|p| p.id).collect();
                assert_eq!(ids, vec![a, b]);
                assert!(players.iter().all(|p| p.health == player::MAX_HEALTH));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert_eq!(batch[1].recipient, Recipient::AllExcept(b));
        assert!(matches!(&batch[1].message, ServerMessage::PlayerJoined(s) if s.name == "Bob"));
        assert_eq!(h.metrics.players_active.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_join_name_clash_case_insensitive() {
        let mut h = harness(Geometry::arena());
        join(&mut h.session, "Alex");

        let other = Uuid::new_v4();
        let batch = h.session.handle_message(
            other,
            ClientMessage::Join {
                name: "alex".to_string(),
            },
            Instant::now(),
        );

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, Recipient::One(other));
        assert!(matches!(&batch[0].message, ServerMessage::JoinError { message } if message.contains("taken")));
        assert_eq!(h.session.registry().len(), 1);
    }

    #[test]
    fn test_move_broadcasts_corrected_position() {
        let mut h = harness(Geometry::new(
            vec![StaticObstacle::new(0.0, 0.0, 2.0, 2.0, 2.0)],
            vec![SpawnPoint::new(10.0, 10.0)],
        ));
        let id = join(&mut h.session, "Mover");

        let batch = h.session.handle_message(
            id,
            ClientMessage::PlayerMoved {
                position: Vec3::new(1.3, 0.0, 0.1),
                rotation: 0.5,
            },
            Instant::now(),
        );

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, Recipient::AllExcept(id));
        match &batch[0].message {
            ServerMessage::PlayerMoved { id: moved, position, rotation } => {
                assert_eq!(*moved, id);
                assert!((position.x - 1.38).abs() < 1e-5);
                assert_eq!(*rotation, 0.5);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_rejected_input_is_silent() {
        let mut h = harness(open_arena());
        let stranger = Uuid::new_v4();

        let batch = h.session.handle_message(
            stranger,
            ClientMessage::PlayerMoved {
                position: Vec3::ZERO,
                rotation: 0.0,
            },
            Instant::now(),
        );
        assert!(batch.is_empty());

        let id = join(&mut h.session, "Mover");
        let batch = h.session.handle_message(
            id,
            ClientMessage::PlayerMoved {
                position: Vec3::new(f32::NAN, 0.0, 0.0),
                rotation: 0.0,
            },
            Instant::now(),
        );
        assert!(batch.is_empty());
        assert_eq!(h.metrics.messages_dropped.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_hit_reduces_health() {
        let mut h = harness(open_arena());
        let (shooter, target) = duel(&mut h);

        let batch = shoot(&mut h.session, shooter, Instant::now());

        assert_eq!(batch.len(), 2);
        assert!(matches!(
            batch[0].message,
            ServerMessage::PlayerHealth { id, health: 66 } if id == target
        ));
        match &batch[1].message {
            ServerMessage::ShotFired { from_id, origin, direction, hit_id } => {
                assert_eq!(*from_id, shooter);
                assert_eq!(*origin, Vec3::new(0.0, player::EYE_HEIGHT, 0.0));
                assert_eq!(*direction, Vec3::new(0.0, 0.0, -1.0));
                assert_eq!(*hit_id, Some(target));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert!(batch.iter().all(|o| o.recipient == Recipient::All));
    }

    #[test]
    fn test_shot_during_cooldown_is_dropped() {
        let mut h = harness(open_arena());
        let (shooter, target) = duel(&mut h);
        let t0 = Instant::now();

        assert!(!shoot(&mut h.session, shooter, t0).is_empty());
        assert!(shoot(&mut h.session, shooter, t0 + Duration::from_millis(100)).is_empty());
        assert_eq!(h.session.registry().get(target).unwrap().health, 66);
        assert_eq!(h.metrics.shots_resolved.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_kill_announces_and_respawns_once() {
        let mut h = harness(open_arena());
        let (shooter, target) = duel(&mut h);
        let t0 = Instant::now();

        shoot(&mut h.session, shooter, t0);
        shoot(&mut h.session, shooter, t0 + combat::SHOT_COOLDOWN);
        let batch = shoot(&mut h.session, shooter, t0 + combat::SHOT_COOLDOWN * 2);

        assert_eq!(batch.len(), 3);
        assert!(matches!(batch[0].message, ServerMessage::PlayerHealth { health: 0, .. }));
        match &batch[1].message {
            ServerMessage::Chat { sender, name, message, .. } => {
                assert_eq!(*sender, ChatSender::System);
                assert_eq!(name, SYSTEM_NAME);
                assert_eq!(message, "Alice defeated Bob");
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert!(matches!(batch[2].message, ServerMessage::ShotFired { hit_id: Some(id), .. } if id == target));

        // Dead target is no longer hittable
        let batch = shoot(&mut h.session, shooter, t0 + combat::SHOT_COOLDOWN * 3);
        assert_eq!(batch.len(), 1);
        assert!(matches!(batch[0].message, ServerMessage::ShotFired { hit_id: None, .. }));

        let scheduled = h.scheduler.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].player_id, target);
        assert_eq!(scheduled[0].delay, spawn::RESPAWN_DELAY);

        let batch = h.session.handle_respawn_due(target, scheduled[0].task_id);
        assert_eq!(batch.len(), 2);
        assert!(matches!(
            batch[0].message,
            ServerMessage::PlayerRespawned { id, rotation, health: 100, .. } if id == target && rotation == 0.0
        ));
        assert!(matches!(batch[1].message, ServerMessage::PlayerHealth { health: 100, .. }));

        // A repeated due event does nothing
        assert!(h
            .session
            .handle_respawn_due(target, scheduled[0].task_id)
            .is_empty());
        assert_eq!(h.metrics.kills.load(Ordering::Relaxed), 1);
        assert_eq!(h.metrics.respawns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_dead_player_cannot_act() {
        let mut h = harness(open_arena());
        let (shooter, target) = duel(&mut h);
        h.session.registry.get_mut(target).unwrap().health = 0;

        assert!(shoot(&mut h.session, target, Instant::now()).is_empty());
        let batch = h.session.handle_message(
            target,
            ClientMessage::PlayerMoved {
                position: Vec3::new(3.0, 0.0, 3.0),
                rotation: 0.0,
            },
            Instant::now(),
        );
        assert!(batch.is_empty());
        assert!(h.session.registry().get(shooter).unwrap().is_alive());
    }

    #[test]
    fn test_disconnect_while_dead_ignores_timer() {
        let mut h = harness(open_arena());
        let (shooter, target) = duel(&mut h);
        let t0 = Instant::now();
        for i in 0..3 {
            shoot(&mut h.session, shooter, t0 + combat::SHOT_COOLDOWN * i);
        }
        let task_id = h.scheduler.scheduled()[0].task_id;

        let batch = h.session.handle_disconnect(target);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, Recipient::AllExcept(target));
        assert!(matches!(batch[0].message, ServerMessage::PlayerLeft { id } if id == target));

        assert!(h.session.handle_respawn_due(target, task_id).is_empty());
        assert!(!h.session.registry().contains(target));
    }

    #[test]
    fn test_disconnect_before_join_is_silent() {
        let mut h = harness(open_arena());
        assert!(h.session.handle_disconnect(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_chat() {
        let mut h = harness(open_arena());

        let stranger = Uuid::new_v4();
        let batch = h.session.handle_message(
            stranger,
            ClientMessage::Chat {
                message: "hello".to_string(),
            },
            Instant::now(),
        );
        assert!(batch.is_empty());

        let id = join(&mut h.session, "Talker");
        let batch = h.session.handle_message(
            id,
            ClientMessage::Chat {
                message: "  hello there  ".to_string(),
            },
            Instant::now(),
        );
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, Recipient::All);
        match &batch[0].message {
            ServerMessage::Chat { sender, name, message, time } => {
                assert_eq!(*sender, ChatSender::Player(id));
                assert_eq!(name, "Talker");
                assert_eq!(message, "hello there");
                assert!(*time > 0);
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        let batch = h.session.handle_message(
            id,
            ClientMessage::Chat {
                message: " \n ".to_string(),
            },
            Instant::now(),
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn test_ping_replies_to_sender() {
        let mut h = harness(open_arena());
        let conn = Uuid::new_v4();

        let batch = h
            .session
            .handle_message(conn, ClientMessage::Ping { timestamp: 77 }, Instant::now());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].recipient, Recipient::One(conn));
        assert!(matches!(
            batch[0].message,
            ServerMessage::Pong { client_timestamp: 77, .. }
        ));
    }

    #[tokio::test]
    async fn test_actor_routes_events_to_outboxes() {
        let h = harness(open_arena());
        let (tx, rx) = unbounded_channel();
        let actor = start_session_actor(h.session, rx);

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (out_a, mut in_a) = channel(OUTBOX_CAPACITY);
        let (out_b, mut in_b) = channel(OUTBOX_CAPACITY);
        tx.send(SessionEvent::Connected { conn_id: a, outbox: out_a }).unwrap();
        tx.send(SessionEvent::Connected { conn_id: b, outbox: out_b }).unwrap();
        tx.send(SessionEvent::Message {
            conn_id: a,
            message: ClientMessage::Join {
                name: "Alice".to_string(),
            },
        })
        .unwrap();

        let payload = in_a.recv().await.unwrap();
        assert!(matches!(
            decode::<ServerMessage>(&payload).unwrap(),
            ServerMessage::JoinSuccess { id, .. } if id == a
        ));

        // Unjoined connections still see joins of others
        let payload = in_b.recv().await.unwrap();
        assert!(matches!(
            decode::<ServerMessage>(&payload).unwrap(),
            ServerMessage::PlayerJoined(s) if s.id == a
        ));

        tx.send(SessionEvent::Disconnected { conn_id: a }).unwrap();
        let payload = in_b.recv().await.unwrap();
        assert!(matches!(
            decode::<ServerMessage>(&payload).unwrap(),
            ServerMessage::PlayerLeft { id } if id == a
        ));

        drop(tx);
        actor.await.unwrap();
        assert!(in_a.recv().await.is_none());
    }
}
