pub mod chat;
pub mod combat;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod movement;
pub mod registry;
pub mod respawn;
pub mod spawn;
