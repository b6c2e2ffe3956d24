//! Entity types: ships, asteroids, blasts.
//!
//! Behavior that touches only one entity lives here; anything that needs
//! the whole world (spawning, scoring, collisions) lives in `sim`.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::{
    arena::EntityId,
    event::PlayerId,
    math::{sin_cos, wrap_angle, Body},
    rng::SimRng,
};

/// Ticks a ship spends as debris before respawning.
pub const SHIP_DEBRIS_TICKS: u32 = 60;
/// Forward thrust per tick.
pub const SHIP_THRUST: f64 = 0.5;
/// Per-axis speed cap.
pub const SHIP_MAX_SPEED: f64 = 10.0;
/// Heading change per tick while a turn thruster is on.
pub const SHIP_TURN_RATE: f64 = 0.2;
/// Half edge of a ship's collision box.
pub const SHIP_HALF_EXTENT: f64 = 10.0;
/// Ships spawn in `[SPAWN_MIN, SPAWN_MIN + SPAWN_SPREAD)` on both axes.
pub const SHIP_SPAWN_MIN: f64 = 480.0;
pub const SHIP_SPAWN_SPREAD: f64 = 40.0;

pub const ASTEROID_START_SIZE: f64 = 40.0;
/// Asteroids larger than this split when hit; smaller ones break up.
pub const ASTEROID_SPLIT_MIN_SIZE: f64 = 20.0;
pub const ASTEROID_SPLIT_SHRINK: f64 = 0.7;
pub const ASTEROID_SPLIT_SPIN: f64 = 1.5;
/// Post-split speed numerator; speed is `this / size`.
pub const ASTEROID_SPLIT_SPEED: f64 = 10.0;

pub const BLAST_SPEED: f64 = 20.0;
/// Distance ahead of the ship where a blast appears.
pub const BLAST_MUZZLE_OFFSET: f64 = 20.0;
pub const BLAST_LIFETIME_TICKS: u32 = 30;

/// Player-controlled ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub player: PlayerId,
    pub body: Body,
    pub left: bool,
    pub right: bool,
    pub forward: bool,
    pub score: u32,
    /// 0 while alive, otherwise ticks spent as debris.
    pub hit: u32,
    pub initials: Option<String>,
}

impl Ship {
    /// New ship at a random spawn point.
    pub fn spawn(player: PlayerId, rng: &mut SimRng) -> Self {
        let mut ship = Self {
            player,
            body: Body::default(),
            left: false,
            right: false,
            forward: false,
            score: 0,
            hit: 0,
            initials: None,
        };
        ship.reset(rng);
        ship
    }

    /// Back to a fresh alive state near the center, pointing up.
    /// Initials survive; score does not.
    pub fn reset(&mut self, rng: &mut SimRng) {
        let x = rng.range(SHIP_SPAWN_MIN, SHIP_SPAWN_MIN + SHIP_SPAWN_SPREAD);
        let y = rng.range(SHIP_SPAWN_MIN, SHIP_SPAWN_MIN + SHIP_SPAWN_SPREAD);
        self.body = Body {
            x,
            y,
            a: wrap_angle(-FRAC_PI_2),
            dx: 0.0,
            dy: 0.0,
            da: 0.0,
        };
        self.left = false;
        self.right = false;
        self.forward = false;
        self.score = 0;
        self.hit = 0;
    }

    pub fn is_debris(&self) -> bool {
        self.hit > 0
    }

    /// Adds thrust along the heading, clamping each axis.
    pub fn accelerate(&mut self, amount: f64) {
        let (sin, cos) = sin_cos(self.body.a);
        self.body.dx = (self.body.dx + cos * amount).clamp(-SHIP_MAX_SPEED, SHIP_MAX_SPEED);
        self.body.dy = (self.body.dy + sin * amount).clamp(-SHIP_MAX_SPEED, SHIP_MAX_SPEED);
    }

    /// Per-tick behavior: debris countdown or thrusters, then movement.
    pub fn update(&mut self, rng: &mut SimRng) {
        if self.is_debris() {
            self.hit += 1;
            if self.hit > SHIP_DEBRIS_TICKS {
                self.reset(rng);
            }
        } else {
            if self.forward {
                self.accelerate(SHIP_THRUST);
            }
            if self.left {
                self.body.a -= SHIP_TURN_RATE;
            }
            if self.right {
                self.body.a += SHIP_TURN_RATE;
            }
        }
        self.body.advance();
    }

    /// Blast fired from this ship, or `None` while debris.
    pub fn fire(&self, owner: EntityId) -> Option<Blast> {
        if self.is_debris() {
            return None;
        }
        let (sin, cos) = sin_cos(self.body.a);
        let mut body = Body {
            x: self.body.x + cos * BLAST_MUZZLE_OFFSET,
            y: self.body.y + sin * BLAST_MUZZLE_OFFSET,
            a: self.body.a,
            dx: cos * BLAST_SPEED,
            dy: sin * BLAST_SPEED,
            da: 0.0,
        };
        body.normalize();
        Some(Blast {
            owner,
            body,
            age: 0,
        })
    }
}

/// Drifting rock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub body: Body,
    pub size: f64,
    /// 0 while intact, otherwise ticks spent as debris.
    pub hit: u32,
}

impl Asteroid {
    /// Fresh full-size asteroid somewhere near the corners.
    pub fn random(rng: &mut SimRng) -> Self {
        let x = rng.range(-200.0, 200.0);
        let y = rng.range(-200.0, 200.0);
        let a = rng.range(0.0, std::f64::consts::TAU);
        let speed = rng.range(1.0, 5.0);
        let spin = rng.range(0.02, 0.05);
        let da = if rng.coin() { spin } else { -spin };
        let (sin, cos) = sin_cos(a);
        let mut body = Body {
            x,
            y,
            a,
            dx: cos * speed,
            dy: sin * speed,
            da,
        };
        body.normalize();
        Self {
            body,
            size: ASTEROID_START_SIZE,
            hit: 0,
        }
    }

    pub fn is_debris(&self) -> bool {
        self.hit > 0
    }

    /// Advances the debris countdown and moves. Returns `true` once the
    /// asteroid has fully broken up and should be removed.
    pub fn update(&mut self) -> bool {
        if self.is_debris() {
            self.hit += 1;
            if f64::from(self.hit) > self.size {
                return true;
            }
        }
        self.body.advance();
        false
    }

    /// Splits in place along the blast's perpendicular and returns the
    /// mirror half, or breaks up into debris and returns `None`.
    pub fn split(&mut self, blast: &Body) -> Option<Asteroid> {
        if self.size <= ASTEROID_SPLIT_MIN_SIZE {
            self.hit = 1;
            return None;
        }
        self.size *= ASTEROID_SPLIT_SHRINK;
        self.body.da *= ASTEROID_SPLIT_SPIN;
        self.body.dx = -blast.dy * ASTEROID_SPLIT_SPEED / self.size;
        self.body.dy = blast.dx * ASTEROID_SPLIT_SPEED / self.size;
        Some(Asteroid {
            body: Body {
                dx: -self.body.dx,
                dy: -self.body.dy,
                ..self.body
            },
            size: self.size,
            hit: 0,
        })
    }
}

/// Projectile. `owner` points at the firing ship and is only used to
/// credit the score; the ship may be gone by the time it hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blast {
    pub owner: EntityId,
    pub body: Body,
    pub age: u32,
}

impl Blast {
    /// Ages and moves. Returns `true` once expired.
    pub fn update(&mut self) -> bool {
        self.age += 1;
        if self.age > BLAST_LIFETIME_TICKS {
            return true;
        }
        self.body.advance();
        false
    }
}
