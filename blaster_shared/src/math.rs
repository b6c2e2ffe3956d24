//! Math helpers for the toroidal play field.
//!
//! This module intentionally stays small and deterministic.
//! Everything is plain `f64` arithmetic; no SIMD, no fast-math.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Edge length of the square world.
pub const WORLD_SIZE: f64 = 1000.0;

/// Center of the world, where ships spawn.
pub const WORLD_CENTER: (f64, f64) = (WORLD_SIZE / 2.0, WORLD_SIZE / 2.0);

/// Wraps `v` into `[0, period)`.
///
/// `rem_euclid` can round a tiny negative input up to exactly `period`,
/// so that case is folded back to zero.
pub fn wrap(v: f64, period: f64) -> f64 {
    let r = v.rem_euclid(period);
    if r >= period {
        0.0
    } else {
        r
    }
}

/// Wraps a coordinate onto the torus.
pub fn wrap_coord(v: f64) -> f64 {
    wrap(v, WORLD_SIZE)
}

/// Normalizes an angle into `[0, 2π)`.
pub fn wrap_angle(a: f64) -> f64 {
    wrap(a, TAU)
}

/// Sine and cosine from one portable implementation. The platform libm
/// behind `f64::sin` may differ by an ulp between replicas.
pub fn sin_cos(a: f64) -> (f64, f64) {
    (libm::sin(a), libm::cos(a))
}

/// Manhattan distance between two points (no wraparound).
pub fn manhattan(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (ax - bx).abs() + (ay - by).abs()
}

/// Kinematic state shared by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, `[0, 2π)`.
    pub a: f64,
    pub dx: f64,
    pub dy: f64,
    pub da: f64,
}

impl Body {
    /// Applies velocity and spin for one tick, then wraps.
    pub fn advance(&mut self) {
        self.x = wrap_coord(self.x + self.dx);
        self.y = wrap_coord(self.y + self.dy);
        self.a = wrap_angle(self.a + self.da);
    }

    /// Wraps position and heading without moving.
    pub fn normalize(&mut self) {
        self.x = wrap_coord(self.x);
        self.y = wrap_coord(self.y);
        self.a = wrap_angle(self.a);
    }
}

/// Axis-aligned box given by its min/max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    /// Box centered on `(x, y)` extending `half` in every direction.
    pub fn around(x: f64, y: f64, half: f64) -> Self {
        Self {
            min_x: x - half,
            min_y: y - half,
            max_x: x + half,
            max_y: y + half,
        }
    }

    /// Strict overlap test; touching edges do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.max_x > other.min_x
            && self.min_x < other.max_x
            && self.max_y > other.min_y
            && self.min_y < other.max_y
    }

    /// Strict containment of a point.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min_x && x < self.max_x && y > self.min_y && y < self.max_y
    }
}

/// Interpolates one coordinate, taking the short way around the torus.
pub fn lerp_wrapped(from: f64, to: f64, t: f64, period: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let mut delta = to - from;
    if delta > period / 2.0 {
        delta -= period;
    } else if delta < -period / 2.0 {
        delta += period;
    }
    wrap(from + delta * t, period)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_folds_into_range() {
        assert_eq!(wrap_coord(1000.0), 0.0);
        assert_eq!(wrap_coord(-1.0), 999.0);
        assert_eq!(wrap_coord(1005.5), 5.5);
        assert_eq!(wrap_coord(-1e-20), 0.0);
        assert!(wrap_angle(-0.1) < TAU);
        assert!(wrap_angle(TAU) == 0.0);
    }

    #[test]
    fn trig_bit_patterns_are_pinned() {
        use std::f64::consts::{FRAC_PI_2, PI};

        assert_eq!(sin_cos(0.0), (0.0, 1.0));
        assert_eq!(sin_cos(FRAC_PI_2).0, 1.0);
        assert_eq!(sin_cos(PI).1, -1.0);
        assert_eq!(sin_cos(PI).0.to_bits(), 0x3CA1_A626_3314_5C07);
        assert_eq!(sin_cos(FRAC_PI_2).1.to_bits(), 0x3C91_A626_3314_5C07);
    }

    #[test]
    fn body_advance_wraps_all_axes() {
        let mut b = Body {
            x: 995.0,
            y: 2.0,
            a: 6.2,
            dx: 10.0,
            dy: -5.0,
            da: 0.2,
        };
        b.advance();
        assert_eq!(b.x, 5.0);
        assert_eq!(b.y, 997.0);
        assert!((0.0..TAU).contains(&b.a));
    }

    #[test]
    fn aabb_overlap_is_strict() {
        let a = Aabb::around(0.0, 0.0, 10.0);
        let touching = Aabb::around(20.0, 0.0, 10.0);
        let inside = Aabb::around(19.0, 0.0, 10.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(a.contains(9.9, -9.9));
        assert!(!a.contains(10.0, 0.0));
    }

    #[test]
    fn lerp_takes_short_way_around() {
        let mid = lerp_wrapped(990.0, 10.0, 0.5, WORLD_SIZE);
        assert_eq!(mid, 0.0);
        let plain = lerp_wrapped(100.0, 200.0, 0.25, WORLD_SIZE);
        assert_eq!(plain, 125.0);
    }
}
