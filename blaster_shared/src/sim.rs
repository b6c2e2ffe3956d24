//! The simulation step engine.
//!
//! `World` owns every entity and advances them one fixed tick at a time.
//!
//! Determinism notes:
//! - All randomness comes from the world's own `SimRng`.
//! - Arenas iterate in id order and ids are allocated monotonically.
//! - Nothing here reads the clock, does I/O, or can fail; semantically
//!   invalid requests are no-ops.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    arena::{Arena, EntityId, IdAllocator},
    config::BlasterConfig,
    entities::{Asteroid, Blast, Ship},
    event::{InputEvent, PlayerId, SessionEvent},
    highscore::HighscoreTable,
    physics::{asteroid_box, blast_hits, ship_hits},
    rng::SimRng,
};

/// The world never holds fewer asteroids than this after a tick.
pub const MIN_ASTEROIDS: usize = 5;

/// Which thruster an input toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thruster {
    Left,
    Right,
    Forward,
}

/// One replica's complete game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    tick: u64,
    ids: IdAllocator,
    rng: SimRng,
    ships: Arena<Ship>,
    asteroids: Arena<Asteroid>,
    blasts: Arena<Blast>,
    highscores: HighscoreTable,
    max_initials_len: usize,
    #[serde(skip)]
    highscores_dirty: bool,
}

impl World {
    /// Creates a world with default rules and the given seed.
    pub fn new(seed: u64) -> Self {
        Self::with_config(&BlasterConfig {
            seed,
            ..BlasterConfig::default()
        })
    }

    /// Creates a world from host configuration and seeds the asteroid field.
    pub fn with_config(cfg: &BlasterConfig) -> Self {
        let mut world = Self {
            tick: 0,
            ids: IdAllocator::default(),
            rng: SimRng::new(cfg.seed),
            ships: Arena::default(),
            asteroids: Arena::default(),
            blasts: Arena::default(),
            highscores: HighscoreTable::new(),
            max_initials_len: cfg.max_initials_len,
            highscores_dirty: false,
        };
        world.replenish_asteroids();
        world
    }

    /// Seeds the highscore table from persisted state.
    pub fn with_highscores(mut self, table: HighscoreTable) -> Self {
        self.highscores.merge(&table);
        self
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn ships(&self) -> &Arena<Ship> {
        &self.ships
    }

    pub fn asteroids(&self) -> &Arena<Asteroid> {
        &self.asteroids
    }

    pub fn blasts(&self) -> &Arena<Blast> {
        &self.blasts
    }

    pub fn highscores(&self) -> &HighscoreTable {
        &self.highscores
    }

    /// Returns and clears the "highscores changed" flag.
    pub fn take_highscores_dirty(&mut self) -> bool {
        std::mem::take(&mut self.highscores_dirty)
    }

    /// Raises the flag again, e.g. after a save that did not go through.
    pub fn mark_highscores_dirty(&mut self) {
        self.highscores_dirty = true;
    }

    /// The ship a player controls.
    pub fn ship_of(&self, player: PlayerId) -> Option<(EntityId, &Ship)> {
        self.ships.iter().find(|(_, s)| s.player == player)
    }

    fn ship_id_of(&self, player: PlayerId) -> Option<EntityId> {
        self.ship_of(player).map(|(id, _)| id)
    }

    /// Direct mutable access for hosts and tests that stage scenarios.
    pub fn ship_mut(&mut self, id: EntityId) -> Option<&mut Ship> {
        self.ships.get_mut(id)
    }

    pub fn asteroid_mut(&mut self, id: EntityId) -> Option<&mut Asteroid> {
        self.asteroids.get_mut(id)
    }

    pub fn blast_mut(&mut self, id: EntityId) -> Option<&mut Blast> {
        self.blasts.get_mut(id)
    }

    /// Applies one session event.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PlayerJoined(player) => {
                self.player_joined(player);
            }
            SessionEvent::PlayerLeft(player) => {
                self.player_left(player);
            }
            SessionEvent::Input { player, input } => match input {
                InputEvent::LeftThruster(on) => self.set_thruster(player, Thruster::Left, on),
                InputEvent::RightThruster(on) => self.set_thruster(player, Thruster::Right, on),
                InputEvent::ForwardThruster(on) => {
                    self.set_thruster(player, Thruster::Forward, on)
                }
                InputEvent::FireBlaster => {
                    self.fire(player);
                }
                InputEvent::SetInitials(initials) => {
                    self.set_initials(player, &initials);
                }
            },
        }
    }

    /// Spawns a ship for a new player. A player already in the game keeps
    /// their ship and `None` is returned.
    pub fn player_joined(&mut self, player: PlayerId) -> Option<EntityId> {
        if self.ship_id_of(player).is_some() {
            return None;
        }
        let ship = Ship::spawn(player, &mut self.rng);
        let id = self.ids.allocate();
        self.ships.insert(id, ship);
        debug!(%player, ship = ?id, "Player joined");
        Some(id)
    }

    /// Removes a departing player's ship. Returns whether one existed.
    pub fn player_left(&mut self, player: PlayerId) -> bool {
        match self.ship_id_of(player) {
            Some(id) => {
                self.ships.remove(id);
                debug!(%player, ship = ?id, "Player left");
                true
            }
            None => false,
        }
    }

    pub fn set_thruster(&mut self, player: PlayerId, thruster: Thruster, on: bool) {
        let Some(id) = self.ship_id_of(player) else {
            return;
        };
        if let Some(ship) = self.ships.get_mut(id) {
            match thruster {
                Thruster::Left => ship.left = on,
                Thruster::Right => ship.right = on,
                Thruster::Forward => ship.forward = on,
            }
        }
    }

    /// Fires a blast from the player's ship. Ignored while it is debris.
    pub fn fire(&mut self, player: PlayerId) -> Option<EntityId> {
        let (ship_id, ship) = self.ship_of(player)?;
        let blast = ship.fire(ship_id)?;
        let id = self.ids.allocate();
        self.blasts.insert(id, blast);
        Some(id)
    }

    /// Claims initials for the player's ship and registers them in the
    /// highscore table. Rejected (returns `false`) when empty, too long,
    /// unchanged, or held by another active ship.
    pub fn set_initials(&mut self, player: PlayerId, initials: &str) -> bool {
        let initials = initials.trim();
        if initials.is_empty() || initials.chars().count() > self.max_initials_len {
            debug!(%player, initials, "Rejected malformed initials");
            return false;
        }
        let Some(ship_id) = self.ship_id_of(player) else {
            return false;
        };
        let taken = self
            .ships
            .iter()
            .any(|(_, s)| s.initials.as_deref() == Some(initials));
        if taken {
            debug!(%player, initials, "Rejected initials already in use");
            return false;
        }
        let Some(ship) = self.ships.get_mut(ship_id) else {
            return false;
        };
        ship.initials = Some(initials.to_string());
        let score = ship.score;
        if self.highscores.record(initials, score) {
            self.highscores_dirty = true;
        }
        true
    }

    /// Inserts an asteroid, e.g. when staging a scenario.
    pub fn spawn_asteroid(&mut self, asteroid: Asteroid) -> EntityId {
        let id = self.ids.allocate();
        self.asteroids.insert(id, asteroid);
        id
    }

    /// Removes an asteroid and tops the field back up. Removing an absent
    /// asteroid does nothing and returns `false`.
    pub fn destroy_asteroid(&mut self, id: EntityId) -> bool {
        if self.asteroids.remove(id).is_none() {
            return false;
        }
        self.replenish_asteroids();
        true
    }

    /// Removes a blast. Removing an absent blast does nothing.
    pub fn destroy_blast(&mut self, id: EntityId) -> bool {
        self.blasts.remove(id).is_some()
    }

    fn replenish_asteroids(&mut self) {
        while self.asteroids.len() < MIN_ASTEROIDS {
            let asteroid = Asteroid::random(&mut self.rng);
            self.spawn_asteroid(asteroid);
        }
    }

    /// Advances the world by one tick.
    pub fn step(&mut self) {
        self.tick += 1;

        for (_, ship) in self.ships.iter_mut() {
            ship.update(&mut self.rng);
        }

        for id in self.asteroids.ids() {
            let broken_up = self.asteroids.get_mut(id).is_some_and(|a| a.update());
            if broken_up {
                self.destroy_asteroid(id);
            }
        }

        for id in self.blasts.ids() {
            let expired = self.blasts.get_mut(id).is_some_and(|b| b.update());
            if expired {
                self.destroy_blast(id);
            }
        }

        self.check_collisions();
    }

    /// Each intact asteroid takes at most one hit per tick: the first
    /// blast inside it, otherwise the first ship overlapping it. Asteroids
    /// created during this pass are not checked until the next tick.
    fn check_collisions(&mut self) {
        for asteroid_id in self.asteroids.ids() {
            let Some(asteroid) = self.asteroids.get(asteroid_id) else {
                continue;
            };
            if asteroid.is_debris() {
                continue;
            }
            let bounds = asteroid_box(asteroid);

            let blast = self
                .blasts
                .iter()
                .find(|(_, b)| blast_hits(&bounds, b))
                .map(|(id, _)| id);
            if let Some(blast_id) = blast {
                self.asteroid_hit_by_blast(asteroid_id, blast_id);
                continue;
            }

            let ship = self
                .ships
                .iter()
                .find(|(_, s)| ship_hits(&bounds, s))
                .map(|(id, _)| id);
            if let Some(ship_id) = ship {
                self.ship_hit_by_asteroid(ship_id, asteroid_id);
            }
        }
    }

    fn asteroid_hit_by_blast(&mut self, asteroid_id: EntityId, blast_id: EntityId) {
        let Some(blast) = self.blasts.remove(blast_id) else {
            return;
        };
        self.credit_hit(blast.owner);

        let Some(asteroid) = self.asteroids.get_mut(asteroid_id) else {
            return;
        };
        if let Some(twin) = asteroid.split(&blast.body) {
            let twin_id = self.spawn_asteroid(twin);
            debug!(asteroid = ?asteroid_id, twin = ?twin_id, "Asteroid split");
        }
    }

    fn ship_hit_by_asteroid(&mut self, ship_id: EntityId, asteroid_id: EntityId) {
        if let Some(ship) = self.ships.get_mut(ship_id) {
            ship.hit = 1;
            debug!(player = %ship.player, ship = ?ship_id, "Ship destroyed");
        }
        if let Some(asteroid) = self.asteroids.get_mut(asteroid_id) {
            asteroid.hit = 1;
        }
    }

    /// Scores one point for the blast's owner if that ship still exists.
    fn credit_hit(&mut self, owner: EntityId) {
        let Some(ship) = self.ships.get_mut(owner) else {
            return;
        };
        ship.score += 1;
        if let Some(initials) = ship.initials.as_deref() {
            if self.highscores.record(initials, ship.score) {
                self.highscores_dirty = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Body;

    fn rock(x: f64, y: f64, size: f64) -> Asteroid {
        Asteroid {
            body: Body {
                x,
                y,
                ..Body::default()
            },
            size,
            hit: 0,
        }
    }

    /// A world with the random field parked far from the test area.
    fn quiet_world() -> World {
        let mut w = World::new(11);
        for id in w.asteroids.ids() {
            if let Some(a) = w.asteroid_mut(id) {
                a.body = Body {
                    x: 100.0,
                    y: 100.0,
                    ..Body::default()
                };
                a.size = 1.0;
            }
        }
        w
    }

    #[test]
    fn new_world_has_asteroid_floor() {
        let w = World::new(1);
        assert_eq!(w.asteroids().len(), MIN_ASTEROIDS);
        assert!(w.ships().is_empty());
    }

    #[test]
    fn join_and_leave_are_idempotent() {
        let mut w = World::new(1);
        assert!(w.player_joined(PlayerId(1)).is_some());
        assert!(w.player_joined(PlayerId(1)).is_none());
        assert_eq!(w.ships().len(), 1);
        assert!(w.player_left(PlayerId(1)));
        assert!(!w.player_left(PlayerId(1)));
        assert!(w.ships().is_empty());
    }

    #[test]
    fn destroying_absent_entities_is_a_noop() {
        let mut w = World::new(1);
        let id = w.asteroids().ids()[0];
        assert!(w.destroy_asteroid(id));
        assert_eq!(w.asteroids().len(), MIN_ASTEROIDS);
        assert!(!w.destroy_asteroid(id));
        assert_eq!(w.asteroids().len(), MIN_ASTEROIDS);
        assert!(!w.destroy_blast(EntityId(9999)));
    }

    #[test]
    fn blast_split_scores_and_mirrors() {
        let mut w = quiet_world();
        w.player_joined(PlayerId(1));
        let (ship_id, _) = w.ship_of(PlayerId(1)).unwrap();
        w.set_initials(PlayerId(1), "AB");
        let target = w.spawn_asteroid(rock(800.0, 800.0, 40.0));
        let blast_id = w.fire(PlayerId(1)).unwrap();
        if let Some(b) = w.blast_mut(blast_id) {
            b.body = Body {
                x: 800.0,
                y: 780.0,
                a: 0.0,
                dx: 0.0,
                dy: 5.0,
                da: 0.0,
            };
        }
        let before = w.asteroids().len();
        w.step();

        assert_eq!(w.asteroids().len(), before + 1);
        assert!(w.blasts().is_empty());
        let original = w.asteroids().get(target).unwrap();
        let twin = w.asteroids().iter().last().unwrap().1;
        assert_eq!(original.size, 40.0 * 0.7);
        assert_eq!(twin.size, original.size);
        assert_eq!(twin.body.dx, -original.body.dx);
        assert_eq!(twin.body.dy, -original.body.dy);
        assert_eq!(w.ships().get(ship_id).unwrap().score, 1);
        assert_eq!(w.highscores().get("AB"), Some(1));
        assert!(w.take_highscores_dirty());
    }

    #[test]
    fn small_asteroid_breaks_up_and_field_refills() {
        let mut w = quiet_world();
        w.player_joined(PlayerId(1));
        let target = w.spawn_asteroid(rock(800.0, 800.0, 10.0));
        let blast_id = w.fire(PlayerId(1)).unwrap();
        if let Some(b) = w.blast_mut(blast_id) {
            b.body = Body {
                x: 795.0,
                y: 800.0,
                dx: 1.0,
                ..Body::default()
            };
        }
        w.step();
        assert!(w.asteroids().get(target).unwrap().is_debris());
        for _ in 0..20 {
            w.step();
            assert!(w.asteroids().len() >= MIN_ASTEROIDS);
        }
        assert!(w.asteroids().get(target).is_none());
    }

    #[test]
    fn ship_and_asteroid_wreck_together_outside_spawn_zone() {
        let mut w = quiet_world();
        w.player_joined(PlayerId(1));
        let (ship_id, _) = w.ship_of(PlayerId(1)).unwrap();
        if let Some(s) = w.ship_mut(ship_id) {
            s.body.x = 700.0;
            s.body.y = 700.0;
        }
        let target = w.spawn_asteroid(rock(700.0, 700.0, 30.0));
        w.step();
        assert!(w.ships().get(ship_id).unwrap().is_debris());
        assert!(w.asteroids().get(target).unwrap().is_debris());
        assert_eq!(w.ships().get(ship_id).unwrap().score, 0);
    }

    #[test]
    fn duplicate_initials_rejected() {
        let mut w = World::new(1);
        w.player_joined(PlayerId(1));
        w.player_joined(PlayerId(2));
        assert!(w.set_initials(PlayerId(1), "AB"));
        assert!(w.set_initials(PlayerId(2), "CD"));
        assert!(!w.set_initials(PlayerId(2), "AB"));
        assert_eq!(
            w.ship_of(PlayerId(1)).unwrap().1.initials.as_deref(),
            Some("AB")
        );
        assert_eq!(
            w.ship_of(PlayerId(2)).unwrap().1.initials.as_deref(),
            Some("CD")
        );
    }

    #[test]
    fn malformed_initials_rejected() {
        let mut w = World::new(1);
        w.player_joined(PlayerId(1));
        assert!(!w.set_initials(PlayerId(1), "   "));
        assert!(!w.set_initials(PlayerId(1), "ABCD"));
        assert!(!w.set_initials(PlayerId(7), "AB"));
        assert!(w.highscores().is_empty());
    }

    #[test]
    fn input_for_unknown_player_is_ignored() {
        let mut w = World::new(1);
        let before = w.clone();
        w.apply(SessionEvent::input(PlayerId(3), InputEvent::FireBlaster));
        w.apply(SessionEvent::input(
            PlayerId(3),
            InputEvent::ForwardThruster(true),
        ));
        w.apply(SessionEvent::PlayerLeft(PlayerId(3)));
        assert_eq!(w, before);
    }

    #[test]
    fn step_keeps_bodies_in_range() {
        let mut w = World::new(5);
        w.player_joined(PlayerId(1));
        w.apply(SessionEvent::input(
            PlayerId(1),
            InputEvent::ForwardThruster(true),
        ));
        w.apply(SessionEvent::input(PlayerId(1), InputEvent::LeftThruster(true)));
        for n in 0..300 {
            if n % 7 == 0 {
                w.fire(PlayerId(1));
            }
            w.step();
            let bodies = w
                .ships()
                .iter()
                .map(|(_, s)| s.body)
                .chain(w.asteroids().iter().map(|(_, a)| a.body))
                .chain(w.blasts().iter().map(|(_, b)| b.body));
            for b in bodies {
                assert!((0.0..1000.0).contains(&b.x));
                assert!((0.0..1000.0).contains(&b.y));
                assert!((0.0..std::f64::consts::TAU).contains(&b.a));
            }
            assert!(w.asteroids().len() >= MIN_ASTEROIDS);
        }
    }
}
