use serde::{Deserialize, Serialize};

use crate::game::constants::net::MAX_MESSAGE_SIZE;
use crate::game::registry::{PlayerId, PlayerState};
use crate::util::vec3::Vec3;

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request to join with a display name
    Join { name: String },
    /// Movement report (~15 Hz)
    PlayerMoved { position: Vec3, rotation: f32 },
    /// Fire along an aim direction (need not be normalized)
    Shoot { direction: Vec3 },
    /// Chat line
    Chat { message: String },
    /// Ping for latency measurement
    Ping { timestamp: u64 },
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Join accepted; `players` includes the new player
    JoinSuccess {
        id: PlayerId,
        players: Vec<PlayerSnapshot>,
    },
    /// Join rejected; the connection stays open for a retry
    JoinError { message: String },
    /// Another player joined
    PlayerJoined(PlayerSnapshot),
    /// Another player moved
    PlayerMoved {
        id: PlayerId,
        position: Vec3,
        rotation: f32,
    },
    /// Health changed
    PlayerHealth { id: PlayerId, health: u8 },
    /// Player came back to life
    PlayerRespawned {
        id: PlayerId,
        position: Vec3,
        rotation: f32,
        health: u8,
    },
    /// A shot was resolved; drives tracers and hit effects
    ShotFired {
        from_id: PlayerId,
        origin: Vec3,
        direction: Vec3,
        hit_id: Option<PlayerId>,
    },
    /// Chat line or server notice
    Chat {
        sender: ChatSender,
        name: String,
        message: String,
        /// Unix time in milliseconds
        time: u64,
    },
    /// A player disconnected
    PlayerLeft { id: PlayerId },
    /// Pong response with server timestamp
    Pong {
        client_timestamp: u64,
        server_timestamp: u64,
    },
}

/// Author of a chat line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatSender {
    System,
    Player(PlayerId),
}

/// Public view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub position: Vec3,
    pub rotation: f32,
    pub health: u8,
}

impl PlayerSnapshot {
    pub fn from_player(player: &PlayerState) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color.clone(),
            position: player.position,
            rotation: player.rotation,
            health: player.health,
        }
    }
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers (compatible with TypeScript client)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
/// Uses legacy config for fixed-size integers (compatible with TypeScript client).
/// Declared lengths are capped at the frame size so a forged string or
/// sequence prefix fails instead of allocating.
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    let config = bincode::config::legacy().with_limit::<MAX_MESSAGE_SIZE>();
    bincode::serde::decode_from_slice(data, config)
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
