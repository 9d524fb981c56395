//! Cone (circular sector) geometry for beam-style hit areas
//!
//! In polar coordinates around the apex, a cone is:
//! - length: maximum distance from the apex
//! - heading: direction of the axis (radians)
//! - half_angle: angular half-width around the axis

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{normalize_angle, polar_to_cartesian};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    pub apex: Vec2,
    pub length: f32,
    /// Axis angle (radians, normalized to [-π, π))
    pub heading: f32,
    pub half_angle: f32,
}

impl Cone {
    pub fn new(apex: Vec2, length: f32, heading: f32, half_angle: f32) -> Self {
        Self {
            apex,
            length: length.max(0.0),
            heading: normalize_angle(heading),
            half_angle: half_angle.abs(),
        }
    }

    /// A cone opening straight down the screen (+y)
    pub fn downward(apex: Vec2, length: f32, half_angle: f32) -> Self {
        Self::new(apex, length, std::f32::consts::FRAC_PI_2, half_angle)
    }

    /// Check if an angle (around the apex) is within the cone's spread
    pub fn contains_angle(&self, theta: f32) -> bool {
        normalize_angle(theta - self.heading).abs() <= self.half_angle
    }

    /// Check if a point is inside the cone
    pub fn contains_point(&self, point: Vec2) -> bool {
        let offset = point - self.apex;
        let r = offset.length();
        if r > self.length {
            return false;
        }
        r <= f32::EPSILON || self.contains_angle(offset.y.atan2(offset.x))
    }

    /// Width of the cone's far edge
    pub fn mouth_width(&self) -> f32 {
        let left = polar_to_cartesian(self.length, self.heading - self.half_angle);
        let right = polar_to_cartesian(self.length, self.heading + self.half_angle);
        (right - left).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_downward_cone_contains() {
        let cone = Cone::downward(Vec2::new(100.0, 100.0), 80.0, PI / 8.0);
        assert!(cone.contains_point(Vec2::new(100.0, 170.0)));
        assert!(cone.contains_point(Vec2::new(110.0, 170.0)));
        // Wide off-axis
        assert!(!cone.contains_point(Vec2::new(160.0, 130.0)));
        // Beyond the mouth
        assert!(!cone.contains_point(Vec2::new(100.0, 190.0)));
        // Behind the apex
        assert!(!cone.contains_point(Vec2::new(100.0, 60.0)));
    }

    #[test]
    fn test_heading_wraparound() {
        // Axis pointing at -x (π), spread straddles the ±π seam
        let cone = Cone::new(Vec2::ZERO, 10.0, PI, 0.2);
        assert!(cone.contains_angle(PI - 0.1));
        assert!(cone.contains_angle(-PI + 0.1));
        assert!(!cone.contains_angle(0.0));
    }

    #[test]
    fn test_mouth_grows_with_length() {
        let short = Cone::downward(Vec2::ZERO, 20.0, 0.3);
        let long = Cone::downward(Vec2::ZERO, 60.0, 0.3);
        assert!(long.mouth_width() > short.mouth_width() * 2.9);
    }
}
