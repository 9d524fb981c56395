//! Read-only per-tick view handed to the renderer

use glam::{IVec2, Vec2};
use serde::Serialize;

use super::entity::{Entity, EntityId, EntityKind, EntityState, Particle};
use super::grid::Direction;
use super::progression::Phase;
use crate::games::GameId;

/// One live entity as the renderer sees it
#[derive(Debug, Clone, Serialize)]
pub struct EntityView<K, S> {
    pub id: EntityId,
    pub kind: K,
    pub pos: Vec2,
    pub cell: Option<IVec2>,
    pub state: S,
    pub hp: u8,
    pub heading: Option<Direction>,
}

impl<K: EntityKind, S: EntityState> From<&Entity<K, S>> for EntityView<K, S> {
    fn from(entity: &Entity<K, S>) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind,
            pos: entity.pos,
            cell: entity.cell,
            state: entity.state,
            hp: entity.hp,
            heading: entity.heading(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<K, S> {
    pub game: GameId,
    pub tick: u64,
    pub phase: Phase,
    pub score: u64,
    pub lives: u8,
    pub wave: u32,
    /// Player is inside its post-respawn invulnerability window
    pub invulnerable: bool,
    pub bounds: Vec2,
    /// Live entities only, in list order
    pub entities: Vec<EntityView<K, S>>,
    pub particles: Vec<Particle>,
    pub hud: Vec<(&'static str, i64)>,
}

impl<K: EntityKind, S: EntityState> Snapshot<K, S> {
    pub fn count(&self, kind: K) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    pub fn hud_value(&self, key: &str) -> Option<i64> {
        self.hud.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
