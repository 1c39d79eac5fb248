/// Arena dimensions
pub mod map {
    /// Half the side length of the square play area
    pub const HALF_SIZE: f32 = 22.0;
    /// Highest vertical position a player may report
    pub const MAX_HEIGHT: f32 = 8.0;
}

/// Player body constants
pub mod player {
    /// Horizontal collision radius
    pub const RADIUS: f32 = 0.38;
    /// Health on join and after respawn
    pub const MAX_HEALTH: u8 = 100;
    /// Maximum display name length in characters
    pub const MAX_NAME_CHARS: usize = 20;
    /// Camera height above the feet; shots originate here
    pub const EYE_HEIGHT: f32 = 1.55;
    /// Height of the hit sphere center above the feet
    pub const HITBOX_CENTER_HEIGHT: f32 = 1.15;
    /// Hit sphere radius
    pub const HITBOX_RADIUS: f32 = 0.75;
}

/// Collision resolution constants
pub mod collision {
    /// A player this far above an obstacle top is standing on it, not in it
    pub const STEP_TOLERANCE: f32 = 0.25;
    /// Maximum push-out passes per movement report
    pub const MAX_PASSES: usize = 3;
}

/// Hit-scan weapon constants
pub mod combat {
    use std::time::Duration;

    /// Damage dealt per confirmed hit
    pub const SHOT_DAMAGE: u8 = 34;
    /// Maximum ray length
    pub const SHOT_RANGE: f32 = 36.0;
    /// Minimum time between two resolved shots of one player
    pub const SHOT_COOLDOWN: Duration = Duration::from_millis(180);
    /// Aim vectors shorter than this are rejected
    pub const MIN_AIM_LENGTH: f32 = 1e-4;
    /// Ray direction components below this are treated as parallel to a slab
    pub const SLAB_EPSILON: f32 = 1e-8;
}

/// Spawn selection constants
pub mod spawn {
    use std::time::Duration;

    /// Extra clearance added to the player radius when testing a spawn point
    pub const CLEARANCE: f32 = 0.2;
    /// Random samples tried once every fixed candidate is blocked
    pub const SAMPLE_ATTEMPTS: usize = 30;
    /// Random samples stay this far inside the map edge
    pub const SAMPLE_INSET: f32 = 2.0;
    /// Delay between death and revive
    pub const RESPAWN_DELAY: Duration = Duration::from_millis(1200);
}

/// Chat constants
pub mod chat {
    /// Maximum chat message length in characters
    pub const MAX_MESSAGE_CHARS: usize = 120;
    /// Display name used for server notices
    pub const SYSTEM_NAME: &str = "System";
}

/// Network constants
pub mod net {
    /// Maximum framed message size (64 KB)
    pub const MAX_MESSAGE_SIZE: usize = 65536;

    /// Encoded messages queued per connection before new ones are dropped
    pub const OUTBOX_CAPACITY: usize = 256;
}

/// Inner bound of the playable x/z range for a body of the given radius
#[inline]
pub fn map_edge(radius: f32) -> f32 {
    map::HALF_SIZE - radius
}
