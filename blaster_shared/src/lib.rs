//! `blaster_shared`
//!
//! The deterministic Multiblaster simulation and the types around it.
//!
//! Design goals:
//! - Bit-identical replay: same seed and same ordered event log, same world.
//! - Insertion-ordered entity storage, no hashing-order dependence.
//! - Infallible step function; invalid requests are silent no-ops.
//! - No `unsafe`.

pub mod arena;
pub mod config;
pub mod entities;
pub mod event;
pub mod highscore;
pub mod math;
pub mod physics;
pub mod rng;
pub mod sim;
pub mod snapshot;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::arena::*;
    pub use crate::config::*;
    pub use crate::entities::*;
    pub use crate::event::*;
    pub use crate::highscore::*;
    pub use crate::math::*;
    pub use crate::sim::*;
    pub use crate::snapshot::*;
}
