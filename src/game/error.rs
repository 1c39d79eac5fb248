//! Error types for game-level operations

use std::time::Duration;

/// Join failures, reported back to the requesting client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Name cannot be empty")]
    NameEmpty,
    #[error("Name is already taken, please choose another")]
    NameTaken,
    #[error("Already joined")]
    AlreadyJoined,
}

/// Reasons an inbound message is dropped without a reply
///
/// Untrusted input is handled with a tolerant-of-noise policy: none of
/// these reach the client, they are only logged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    /// Sender has no registered player
    #[error("Sender has not joined")]
    NotJoined,
    /// Sender's player is dead and awaiting respawn
    #[error("Player is dead")]
    PlayerDead,
    #[error("NaN or Infinity in input values")]
    NonFinite,
    #[error("Aim vector too short: {0}")]
    AimTooShort(f32),
    #[error("Shot cooldown has {0:?} remaining")]
    Cooldown(Duration),
    #[error("Empty chat message")]
    EmptyChat,
}

impl Rejection {
    /// Coarse category for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NotJoined | Rejection::PlayerDead => "not_found",
            Rejection::NonFinite | Rejection::AimTooShort(_) | Rejection::EmptyChat => {
                "validation"
            }
            Rejection::Cooldown(_) => "rate_limit",
        }
    }
}
