//! Scripted/stochastic trajectory selection (shooters)
//!
//! Every decision window one idle adversary may be picked at random and sent
//! on a path from the named pattern family. Boss-type adversaries may get
//! the rarer capture path instead.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{Agent, Decision, Strategy};
use crate::sim::Scaling;
use crate::sim::path::{PathPattern, generate};

/// What a diving adversary needs to know
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyView {
    /// Usually the player's position when the dive starts
    pub target: Vec2,
    pub bounds: Vec2,
    /// This agent should fly the capture path
    pub capture: bool,
    /// Height the capture path stops at
    pub beam_altitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySelection {
    /// Adversaries allowed off-formation at once
    pub max_active: usize,
    /// Probability that a decision window launches anyone
    pub launch_chance: f64,
    /// Pixels per tick along the path
    pub speed: f32,
}

const MAX_ACTIVE: Scaling = Scaling::new(2.0, 0.5, 6.0);
const LAUNCH_CHANCE: Scaling = Scaling::new(0.25, 0.05, 0.8);
const DIVE_SPEED: Scaling = Scaling::new(2.2, 0.15, 4.0);

impl TrajectorySelection {
    /// Frequency and concurrency for `level`, scaled by difficulty aggression
    pub fn for_level(level: u32, aggression: f32) -> Self {
        Self {
            max_active: (MAX_ACTIVE.at(level) * aggression).round().max(1.0) as usize,
            launch_chance: f64::from(LAUNCH_CHANCE.at(level) * aggression).clamp(0.0, 1.0),
            speed: DIVE_SPEED.at(level) * aggression.max(0.5),
        }
    }

    /// Choose which idle adversary launches this window, if any
    pub fn pick<'a>(&self, idle: &'a [Agent], active: usize, rng: &mut Pcg32) -> Option<&'a Agent> {
        if active >= self.max_active || idle.is_empty() {
            return None;
        }
        if !rng.random_bool(self.launch_chance) {
            return None;
        }
        idle.get(rng.random_range(0..idle.len()))
    }
}

impl Strategy<SkyView> for TrajectorySelection {
    fn decide(&self, agent: &Agent, view: &SkyView, rng: &mut Pcg32) -> Decision {
        let path = if view.capture {
            let stop = Vec2::new(view.target.x, view.beam_altitude);
            generate(PathPattern::Capture, agent.pos, stop, view.bounds, rng)
        } else {
            let pattern = PathPattern::DIVES[rng.random_range(0..PathPattern::DIVES.len())];
            log::debug!("{:?} dives with {pattern:?}", agent.id);
            generate(pattern, agent.pos, view.target, view.bounds, rng)
        };
        Decision::Follow(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::EntityId;
    use rand::SeedableRng;

    fn agent(id: u32, x: f32) -> Agent {
        Agent {
            id: EntityId(id),
            pos: Vec2::new(x, 60.0),
            cell: glam::IVec2::ZERO,
            heading: None,
        }
    }

    #[test]
    fn test_concurrency_cap() {
        let sel = TrajectorySelection {
            max_active: 2,
            launch_chance: 1.0,
            speed: 2.0,
        };
        let idle = [agent(1, 10.0), agent(2, 20.0)];
        let mut rng = Pcg32::seed_from_u64(5);
        assert!(sel.pick(&idle, 1, &mut rng).is_some());
        assert!(sel.pick(&idle, 2, &mut rng).is_none());
        assert!(sel.pick(&[], 0, &mut rng).is_none());
    }

    #[test]
    fn test_scaling_is_monotone_and_clamped() {
        let early = TrajectorySelection::for_level(0, 1.0);
        let late = TrajectorySelection::for_level(40, 1.0);
        assert!(late.max_active >= early.max_active);
        assert!(late.launch_chance >= early.launch_chance);
        assert_eq!(late.max_active, 6);
        assert!(TrajectorySelection::for_level(40, 2.0).launch_chance <= 1.0);
    }

    #[test]
    fn test_capture_path_stops_at_beam_altitude() {
        let sel = TrajectorySelection::for_level(0, 1.0);
        let view = SkyView {
            target: Vec2::new(150.0, 560.0),
            bounds: Vec2::new(320.0, 600.0),
            capture: true,
            beam_altitude: 400.0,
        };
        let mut rng = Pcg32::seed_from_u64(2);
        let Decision::Follow(path) = sel.decide(&agent(1, 100.0), &view, &mut rng) else {
            panic!("expected a path");
        };
        assert!(path.end().distance(Vec2::new(150.0, 400.0)) < 1e-3);
        assert!(path.start().distance(Vec2::new(100.0, 60.0)) < 1e-3);
    }

    #[test]
    fn test_same_seed_same_dive() {
        let sel = TrajectorySelection::for_level(2, 1.0);
        let view = SkyView {
            target: Vec2::new(160.0, 560.0),
            bounds: Vec2::new(320.0, 600.0),
            capture: false,
            beam_altitude: 400.0,
        };
        let a = sel.decide(&agent(1, 80.0), &view, &mut Pcg32::seed_from_u64(11));
        let b = sel.decide(&agent(1, 80.0), &view, &mut Pcg32::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
