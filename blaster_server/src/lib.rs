//! `blaster_server`
//!
//! Headless game host:
//! - Owns one authoritative `World`
//! - Externally scheduled fixed-timestep loop
//! - Applies queued `SessionEvent`s strictly in arrival order between ticks
//! - Persists highscores when they change
//! - Publishes `WorldSnapshot`s for renderers
//!
//! Transport and replication are not handled here; whatever feeds the
//! event channel is responsible for ordering.

pub mod server;

pub use server::GameServer;
