//! Greedy multi-factor heading scoring (snake arena)
//!
//! Each legal heading is scored by a weighted sum of reachable space,
//! progress toward a behaviour-specific target, closeness to the shrinking
//! wall, and a little noise. The best score wins.

use std::collections::{HashSet, VecDeque};

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{Agent, Decision, Strategy};
use crate::sim::grid::manhattan;
use crate::sim::{Direction, EntityId, Grid};

/// Flood fill stops counting here; enough to tell a pocket from open floor
pub const FLOOD_LIMIT: usize = 48;

/// What an AI snake goes after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    /// Nearest player head
    Hunter,
    /// Nearest food
    Forager,
    /// Nearest head of any other snake
    Brawler,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub openness: f32,
    pub approach: f32,
    pub boundary: f32,
    /// Upper bound of the uniform noise term
    pub noise: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            openness: 1.0,
            approach: 4.0,
            boundary: 6.0,
            noise: 0.5,
        }
    }
}

/// A snake head as other snakes see it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    /// The snake's head entity
    pub id: EntityId,
    pub cell: IVec2,
    pub is_player: bool,
}

/// Read-only arena state
pub struct ArenaView<'a> {
    /// Cells occupied by any body segment or wall
    pub blocked: &'a Grid<bool>,
    /// Inclusive corners of the current (shrinking) safe area
    pub min: IVec2,
    pub max: IVec2,
    pub heads: &'a [Head],
    pub food: &'a [IVec2],
}

impl ArenaView<'_> {
    pub fn is_free(&self, cell: IVec2) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all() && self.blocked.get(cell) == Some(false)
    }

    /// Free cells reachable from `start`, capped at `limit`
    pub fn reachable(&self, start: IVec2, limit: usize) -> usize {
        if !self.is_free(start) {
            return 0;
        }
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(cell) = queue.pop_front() {
            if seen.len() >= limit {
                break;
            }
            for d in Direction::ALL {
                let next = cell + d.delta();
                if self.is_free(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.len().min(limit)
    }

    /// Steps from `cell` to the nearest edge of the safe area
    fn edge_distance(&self, cell: IVec2) -> i32 {
        let low = cell - self.min;
        let high = self.max - cell;
        low.x.min(low.y).min(high.x).min(high.y)
    }
}

fn nearest(from: IVec2, cells: impl Iterator<Item = IVec2>) -> Option<IVec2> {
    cells.min_by_key(|c| manhattan(from, *c))
}

/// One AI snake's scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreedyScoring {
    pub behavior: Behavior,
    pub weights: Weights,
}

impl GreedyScoring {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            weights: Weights::default(),
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Behaviour target for the deciding head
    pub fn target(&self, agent: &Agent, view: &ArenaView<'_>) -> Option<IVec2> {
        let from = agent.cell;
        match self.behavior {
            Behavior::Hunter => nearest(from, view.heads.iter().filter(|h| h.is_player).map(|h| h.cell)),
            Behavior::Forager => nearest(from, view.food.iter().copied()),
            Behavior::Brawler => nearest(from, view.heads.iter().filter(|h| h.id != agent.id).map(|h| h.cell)),
        }
    }

    /// Score of moving from `cell` to `next`, without noise
    pub fn score(&self, cell: IVec2, next: IVec2, target: Option<IVec2>, view: &ArenaView<'_>) -> f32 {
        let w = self.weights;
        let openness = view.reachable(next, FLOOD_LIMIT) as f32 * w.openness;
        let approach = target.map_or(0.0, |t| (manhattan(cell, t) - manhattan(next, t)) as f32 * w.approach);
        let edge = view.edge_distance(next);
        let boundary = if edge < 2 { -((2 - edge) as f32) * w.boundary } else { 0.0 };
        openness + approach + boundary
    }
}

impl Strategy<ArenaView<'_>> for GreedyScoring {
    fn decide(&self, agent: &Agent, view: &ArenaView<'_>, rng: &mut Pcg32) -> Decision {
        let target = self.target(agent, view);
        let reverse = agent.heading.map(Direction::opposite);
        let mut best: Option<(Direction, f32)> = None;

        for d in Direction::ALL {
            if Some(d) == reverse {
                continue;
            }
            let next = agent.cell + d.delta();
            if !view.is_free(next) {
                continue;
            }
            let noise = if self.weights.noise > 0.0 {
                rng.random_range(0.0..self.weights.noise)
            } else {
                0.0
            };
            let score = self.score(agent.cell, next, target, view) + noise;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((d, score));
            }
        }

        match (best, agent.heading) {
            (Some((d, _)), _) => Decision::Steer(d),
            // Boxed in: keep going and crash
            (None, Some(heading)) => Decision::Steer(heading),
            (None, None) => Decision::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn agent(cell: IVec2, heading: Direction) -> Agent {
        Agent::at_cell(EntityId(1), cell, Some(heading))
    }

    fn quiet(behavior: Behavior) -> GreedyScoring {
        GreedyScoring::new(behavior).with_weights(Weights {
            noise: 0.0,
            ..Weights::default()
        })
    }

    #[test]
    fn test_forager_heads_for_food() {
        let blocked = Grid::new(20, 20, false);
        let food = [IVec2::new(10, 2)];
        let view = ArenaView {
            blocked: &blocked,
            min: IVec2::ZERO,
            max: IVec2::new(19, 19),
            heads: &[],
            food: &food,
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let decision = quiet(Behavior::Forager).decide(&agent(IVec2::new(10, 10), Direction::Right), &view, &mut rng);
        assert_eq!(decision, Decision::Steer(Direction::Up));
    }

    #[test]
    fn test_avoids_pocket() {
        // A wall at x = 12 leaves a 1-cell pocket to the right
        let mut blocked = Grid::new(20, 20, false);
        for y in 0..20 {
            blocked.set(IVec2::new(12, y), true);
        }
        blocked.set(IVec2::new(11, 9), true);
        blocked.set(IVec2::new(11, 11), true);
        blocked.set(IVec2::new(10, 10), true);
        let view = ArenaView {
            blocked: &blocked,
            min: IVec2::ZERO,
            max: IVec2::new(19, 19),
            heads: &[],
            food: &[],
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let decision = quiet(Behavior::Forager).decide(&agent(IVec2::new(10, 10), Direction::Down), &view, &mut rng);
        assert_eq!(decision, Decision::Steer(Direction::Left));
    }

    #[test]
    fn test_hunter_targets_player_only() {
        let blocked = Grid::new(20, 20, false);
        let heads = [
            Head { id: EntityId(1), cell: IVec2::new(10, 10), is_player: false },
            Head { id: EntityId(2), cell: IVec2::new(11, 10), is_player: false },
            Head { id: EntityId(3), cell: IVec2::new(2, 10), is_player: true },
        ];
        let view = ArenaView {
            blocked: &blocked,
            min: IVec2::ZERO,
            max: IVec2::new(19, 19),
            heads: &heads,
            food: &[],
        };
        let me = agent(IVec2::new(10, 10), Direction::Up);
        assert_eq!(quiet(Behavior::Hunter).target(&me, &view), Some(IVec2::new(2, 10)));
        assert_eq!(quiet(Behavior::Brawler).target(&me, &view), Some(IVec2::new(11, 10)));
    }

    #[test]
    fn test_boundary_penalty() {
        let blocked = Grid::new(20, 20, false);
        let view = ArenaView {
            blocked: &blocked,
            min: IVec2::new(3, 3),
            max: IVec2::new(16, 16),
            heads: &[],
            food: &[],
        };
        let s = quiet(Behavior::Forager);
        let cell = IVec2::new(4, 10);
        let toward_wall = s.score(cell, IVec2::new(3, 10), None, &view);
        let inward = s.score(cell, IVec2::new(5, 10), None, &view);
        assert!(inward > toward_wall);
        assert!(!view.is_free(IVec2::new(2, 10)));
    }

    #[test]
    fn test_boxed_in_keeps_heading() {
        let mut blocked = Grid::new(5, 5, true);
        blocked.set(IVec2::new(2, 2), false);
        let view = ArenaView {
            blocked: &blocked,
            min: IVec2::ZERO,
            max: IVec2::new(4, 4),
            heads: &[],
            food: &[],
        };
        let mut rng = Pcg32::seed_from_u64(1);
        let decision = quiet(Behavior::Brawler).decide(&agent(IVec2::new(2, 2), Direction::Left), &view, &mut rng);
        assert_eq!(decision, Decision::Steer(Direction::Left));
    }
}
