//! Shared fixtures for the integration tests.

use anyhow::Context;
use blaster_shared::{
    event::{InputEvent, PlayerId, SessionEvent},
    math::Body,
    sim::World,
};

/// Events to apply before each tick; index `n` runs before tick `n + 1`.
pub type EventLog = Vec<Vec<SessionEvent>>;

/// A busy but fully scripted session: three players join at different
/// times, steer, fire, pick initials, and one leaves.
pub fn scripted_log(ticks: usize) -> EventLog {
    let mut log = vec![Vec::new(); ticks];
    let players = [PlayerId(1), PlayerId(2), PlayerId(3)];

    for (n, batch) in log.iter_mut().enumerate() {
        for (k, &p) in players.iter().enumerate() {
            let joined_at = k * 10;
            if n == joined_at {
                batch.push(SessionEvent::PlayerJoined(p));
                batch.push(SessionEvent::input(
                    p,
                    InputEvent::SetInitials(format!("P{}", k + 1)),
                ));
            }
            if n < joined_at {
                continue;
            }
            let phase = (n + k * 7) % 40;
            match phase {
                0 => batch.push(SessionEvent::input(p, InputEvent::ForwardThruster(true))),
                8 => batch.push(SessionEvent::input(p, InputEvent::ForwardThruster(false))),
                12 => batch.push(SessionEvent::input(p, InputEvent::LeftThruster(true))),
                16 => batch.push(SessionEvent::input(p, InputEvent::LeftThruster(false))),
                24 => batch.push(SessionEvent::input(p, InputEvent::RightThruster(true))),
                27 => batch.push(SessionEvent::input(p, InputEvent::RightThruster(false))),
                _ => {}
            }
            if phase % 5 == 0 {
                batch.push(SessionEvent::input(p, InputEvent::FireBlaster));
            }
        }
        if n == ticks / 2 {
            batch.push(SessionEvent::PlayerLeft(PlayerId(2)));
        }
    }
    log
}

/// Applies each batch then steps once per batch.
pub fn replay(world: &mut World, log: &[Vec<SessionEvent>]) {
    for batch in log {
        for event in batch {
            world.apply(event.clone());
        }
        world.step();
    }
}

/// Fresh world, full replay.
pub fn run_log(seed: u64, log: &[Vec<SessionEvent>]) -> World {
    let mut world = World::new(seed);
    replay(&mut world, log);
    world
}

/// Exact serialized form of a world; equal digests mean bit-identical state.
pub fn world_digest(world: &World) -> anyhow::Result<String> {
    serde_json::to_string(world).context("serialize world")
}

/// Moves every asteroid of a fresh world into one corner and shrinks it,
/// so staged scenarios near the center are not disturbed.
pub fn park_asteroids(world: &mut World) {
    for id in world.asteroids().ids() {
        if let Some(a) = world.asteroid_mut(id) {
            a.body = Body {
                x: 50.0,
                y: 50.0,
                ..Body::default()
            };
            a.size = 1.0;
        }
    }
}
