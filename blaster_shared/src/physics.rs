//! Collision tests.
//!
//! Pairwise axis-aligned box checks. Boxes are not wrapped across the
//! torus edges; an entity straddling an edge only collides on its own side.

use crate::{
    entities::{Asteroid, Blast, Ship, SHIP_HALF_EXTENT},
    math::{manhattan, Aabb, WORLD_CENTER},
};

/// Ships with no score this close to the center (Manhattan) are immune.
pub const SPAWN_IMMUNITY_RADIUS: f64 = 40.0;

/// Collision box of an asteroid: its position ± its size.
pub fn asteroid_box(asteroid: &Asteroid) -> Aabb {
    Aabb::around(asteroid.body.x, asteroid.body.y, asteroid.size)
}

/// A blast is a point.
pub fn blast_hits(bounds: &Aabb, blast: &Blast) -> bool {
    bounds.contains(blast.body.x, blast.body.y)
}

/// Whether a fresh ship is still protected at its spawn point.
pub fn spawn_immune(ship: &Ship) -> bool {
    ship.score == 0
        && manhattan(ship.body.x, ship.body.y, WORLD_CENTER.0, WORLD_CENTER.1)
            < SPAWN_IMMUNITY_RADIUS
}

/// Whether an asteroid box hits a ship. Debris and immune ships never do.
pub fn ship_hits(bounds: &Aabb, ship: &Ship) -> bool {
    if ship.is_debris() || spawn_immune(ship) {
        return false;
    }
    bounds.overlaps(&Aabb::around(ship.body.x, ship.body.y, SHIP_HALF_EXTENT))
}
