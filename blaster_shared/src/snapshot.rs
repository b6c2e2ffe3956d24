//! Render-facing read surface.
//!
//! A renderer never touches `World` directly. It receives `WorldSnapshot`s
//! at tick boundaries, renders at its own rate, and interpolates positions
//! between the two most recent snapshots.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    arena::EntityId,
    event::PlayerId,
    highscore::HighscoreEntry,
    math::{lerp_wrapped, WORLD_SIZE},
    sim::World,
};

/// Ship as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipView {
    pub id: EntityId,
    pub player: PlayerId,
    pub x: f64,
    pub y: f64,
    pub a: f64,
    pub forward: bool,
    pub score: u32,
    /// Debris countdown, 0 while alive.
    pub hit: u32,
    pub initials: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidView {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub a: f64,
    pub size: f64,
    pub hit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastView {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
}

/// Immutable picture of a world at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub ships: Vec<ShipView>,
    pub asteroids: Vec<AsteroidView>,
    pub blasts: Vec<BlastView>,
    /// Ranked best scores.
    pub highscores: Vec<HighscoreEntry>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            tick: world.tick_count(),
            ships: world
                .ships()
                .iter()
                .map(|(id, s)| ShipView {
                    id,
                    player: s.player,
                    x: s.body.x,
                    y: s.body.y,
                    a: s.body.a,
                    forward: s.forward,
                    score: s.score,
                    hit: s.hit,
                    initials: s.initials.clone(),
                })
                .collect(),
            asteroids: world
                .asteroids()
                .iter()
                .map(|(id, a)| AsteroidView {
                    id,
                    x: a.body.x,
                    y: a.body.y,
                    a: a.body.a,
                    size: a.size,
                    hit: a.hit,
                })
                .collect(),
            blasts: world
                .blasts()
                .iter()
                .map(|(id, b)| BlastView {
                    id,
                    x: b.body.x,
                    y: b.body.y,
                })
                .collect(),
            highscores: world.highscores().ranked(),
        }
    }

    /// Position of any entity by id.
    pub fn position(&self, id: EntityId) -> Option<(f64, f64)> {
        self.ships
            .iter()
            .find(|s| s.id == id)
            .map(|s| (s.x, s.y))
            .or_else(|| {
                self.asteroids
                    .iter()
                    .find(|a| a.id == id)
                    .map(|a| (a.x, a.y))
            })
            .or_else(|| self.blasts.iter().find(|b| b.id == id).map(|b| (b.x, b.y)))
    }
}

/// Bounded snapshot history for interpolation.
#[derive(Default)]
pub struct SnapshotBuffer {
    history: VecDeque<WorldSnapshot>,
    max: usize,
}

impl SnapshotBuffer {
    pub fn new(max: usize) -> Self {
        Self {
            history: VecDeque::new(),
            max: max.max(2),
        }
    }

    pub fn push(&mut self, snap: WorldSnapshot) {
        self.history.push_back(snap);
        while self.history.len() > self.max {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Interpolated position of an entity, `alpha` in `[0, 1]` from the
    /// older to the newer of the last two snapshots. Wraps the short way
    /// around the world edges.
    pub fn interp_position(&self, entity: EntityId, alpha: f64) -> Option<(f64, f64)> {
        if self.history.len() < 2 {
            return None;
        }
        let a = &self.history[self.history.len() - 2];
        let b = &self.history[self.history.len() - 1];

        let (ax, ay) = a.position(entity)?;
        let (bx, by) = b.position(entity)?;
        Some((
            lerp_wrapped(ax, bx, alpha, WORLD_SIZE),
            lerp_wrapped(ay, by, alpha, WORLD_SIZE),
        ))
    }

    pub fn last_snapshot(&self) -> Option<&WorldSnapshot> {
        self.history.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tick: u64, x: f64) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            ships: Vec::new(),
            asteroids: vec![AsteroidView {
                id: EntityId(1),
                x,
                y: 10.0,
                a: 0.0,
                size: 40.0,
                hit: 0,
            }],
            blasts: Vec::new(),
            highscores: Vec::new(),
        }
    }

    #[test]
    fn capture_mirrors_world() {
        let mut world = World::new(3);
        world.player_joined(PlayerId(4));
        let s = WorldSnapshot::capture(&world);
        assert_eq!(s.ships.len(), 1);
        assert_eq!(s.ships[0].player, PlayerId(4));
        assert_eq!(s.asteroids.len(), world.asteroids().len());
        assert!(s.blasts.is_empty());
    }

    #[test]
    fn interp_needs_two_snapshots_and_wraps() {
        let mut buf = SnapshotBuffer::new(4);
        buf.push(snap(1, 995.0));
        assert!(buf.interp_position(EntityId(1), 0.5).is_none());
        buf.push(snap(2, 5.0));
        assert_eq!(buf.interp_position(EntityId(1), 0.5), Some((0.0, 10.0)));
        assert!(buf.interp_position(EntityId(2), 0.5).is_none());
    }

    #[test]
    fn buffer_is_bounded() {
        let mut buf = SnapshotBuffer::new(3);
        for t in 0..10 {
            buf.push(snap(t, 0.0));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.last_snapshot().map(|s| s.tick), Some(9));
    }
}
