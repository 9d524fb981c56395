//! Targeted pursuit with per-character offsets (maze chase)
//!
//! Each ghost turns its targeting rule into a target tile, then at every
//! tile centre takes the legal heading that brings it closest to that tile.

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{Agent, Decision, Strategy, Walkable, choose_heading, legal_headings};
use crate::sim::Direction;
use crate::sim::grid::dist2;

/// Global ghost behaviour phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GhostMode {
    Scatter,
    Chase,
    Frightened,
    /// Eyes only, heading back to the house
    Eaten,
}

/// How a ghost picks its chase target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRule {
    /// The player's tile
    Direct,
    /// `ahead` tiles in front of the player
    Ambush { ahead: i32 },
    /// Pivot `ahead` tiles in front of the player, mirrored through the partner
    Flank { ahead: i32 },
    /// Chase while farther than `radius` tiles, otherwise retreat to the corner
    Shy { radius: i32 },
}

/// Read-only slice of the maze a ghost needs
pub struct ChaseView<'a> {
    pub maze: &'a dyn Walkable,
    pub mode: GhostMode,
    pub player: IVec2,
    pub player_heading: Direction,
    /// Tile of the ghost `Flank` mirrors through
    pub partner: Option<IVec2>,
    /// Where eaten ghosts return to
    pub home: IVec2,
}

/// One ghost's personality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetedPursuit {
    pub rule: TargetRule,
    /// Scatter corner (may lie outside the maze)
    pub corner: IVec2,
}

impl TargetedPursuit {
    pub fn new(rule: TargetRule, corner: IVec2) -> Self {
        Self { rule, corner }
    }

    /// Chase-mode target tile for a ghost standing on `cell`
    pub fn chase_target(&self, cell: IVec2, view: &ChaseView<'_>) -> IVec2 {
        let facing = view.player_heading.delta();
        match self.rule {
            TargetRule::Direct => view.player,
            TargetRule::Ambush { ahead } => view.player + facing * ahead,
            TargetRule::Flank { ahead } => {
                let pivot = view.player + facing * ahead;
                match view.partner {
                    Some(partner) => pivot * 2 - partner,
                    None => pivot,
                }
            }
            TargetRule::Shy { radius } => {
                if dist2(cell, view.player) > radius * radius {
                    view.player
                } else {
                    self.corner
                }
            }
        }
    }

    pub fn target(&self, cell: IVec2, view: &ChaseView<'_>) -> Option<IVec2> {
        match view.mode {
            GhostMode::Scatter => Some(self.corner),
            GhostMode::Chase => Some(self.chase_target(cell, view)),
            GhostMode::Eaten => Some(view.home),
            GhostMode::Frightened => None,
        }
    }
}

impl Strategy<ChaseView<'_>> for TargetedPursuit {
    fn decide(&self, agent: &Agent, view: &ChaseView<'_>, rng: &mut Pcg32) -> Decision {
        let heading = match self.target(agent.cell, view) {
            Some(target) => choose_heading(view.maze, agent.cell, agent.heading, target),
            None => {
                // Frightened: any legal non-reversing turn
                let options = legal_headings(view.maze, agent.cell, agent.heading);
                if options.is_empty() {
                    None
                } else {
                    Some(options[rng.random_range(0..options.len())])
                }
            }
        };
        heading.map_or(Decision::Hold, Decision::Steer)
    }
}
