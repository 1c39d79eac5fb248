pub mod broadcast;
pub mod framing;
pub mod game_session;
pub mod limits;
pub mod protocol;
pub mod scheduler;
pub mod tls;
pub mod transport;
