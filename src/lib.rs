//! Arena Server Library
//!
//! Authoritative server for a small arena shooter over WebTransport.
//! Clients report movement and shots; the server validates positions,
//! resolves hit-scan shots against static cover and broadcasts results.
//!
//! # Features
//!
//! - `metrics` - Prometheus HTTP endpoint (enabled by default; counters are
//!   always collected)

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;
