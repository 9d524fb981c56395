//! Adversary decision logic
//!
//! Every algorithm implements `Strategy<V>`: given the deciding agent and a
//! read-only view `V` of the rest of the simulation, return a `Decision`.
//! Strategies never mutate anything; the game applies the decision to the
//! deciding entity only.

pub mod greedy;
pub mod pursuit;
pub mod trajectory;

use glam::{IVec2, Vec2};
use rand_pcg::Pcg32;

use crate::sim::{Direction, EntityId, Path};

pub use greedy::{ArenaView, Behavior, GreedyScoring, Head, Weights};
pub use pursuit::{ChaseView, GhostMode, TargetRule, TargetedPursuit};
pub use trajectory::{SkyView, TrajectorySelection};

/// What an adversary does next
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Take this heading at the next cell
    Steer(Direction),
    /// Fly a freshly generated path
    Follow(Path),
    /// Keep doing what it's doing
    Hold,
}

/// The deciding entity, copied out of the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub id: EntityId,
    pub pos: Vec2,
    pub cell: IVec2,
    pub heading: Option<Direction>,
}

impl Agent {
    pub fn at_cell(id: EntityId, cell: IVec2, heading: Option<Direction>) -> Self {
        Self {
            id,
            pos: cell.as_vec2(),
            cell,
            heading,
        }
    }
}

pub trait Strategy<V: ?Sized> {
    fn decide(&self, agent: &Agent, view: &V, rng: &mut Pcg32) -> Decision;
}

/// Grid topology as seen by a moving agent
pub trait Walkable {
    /// Destination cell when stepping `dir` from `cell`, if that step is legal
    fn step(&self, cell: IVec2, dir: Direction) -> Option<IVec2>;
}

/// Legal headings in tie-break order, without the immediate reverse unless
/// it is the only way out
pub fn legal_headings(walk: &dyn Walkable, cell: IVec2, heading: Option<Direction>) -> Vec<Direction> {
    let reverse = heading.map(Direction::opposite);
    let open: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|d| walk.step(cell, *d).is_some())
        .collect();
    let forward: Vec<Direction> = open.iter().copied().filter(|d| Some(*d) != reverse).collect();
    if forward.is_empty() { open } else { forward }
}

/// Legal heading whose destination lies closest to `target` (ties: Up, Left, Down, Right)
pub fn choose_heading(walk: &dyn Walkable, cell: IVec2, heading: Option<Direction>, target: IVec2) -> Option<Direction> {
    legal_headings(walk, cell, heading)
        .into_iter()
        .filter_map(|d| walk.step(cell, d).map(|next| (d, crate::sim::grid::dist2(next, target))))
        .min_by_key(|(_, dist)| *dist)
        .map(|(d, _)| d)
}
