//! Collision detection and the declared-outcome table
//!
//! Only kind pairs listed in a game's `InteractionTable` are ever tested.
//! The pass walks the entity list in order and resolves each contact
//! immediately, so an actor that is consumed by a hit is never tested
//! against later targets in the same tick.

use std::hash::Hash;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityKind, EntityState, World};

/// Collision footprint centred on the entity position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half: Vec2 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle { radius }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            half: Vec2::new(width * 0.5, height * 0.5),
        }
    }

    /// Half extents of the bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { half } => half,
        }
    }
}

/// Overlap test between two placed shapes (touching does not count)
pub fn overlaps(a_pos: Vec2, a: Shape, b_pos: Vec2, b: Shape) -> bool {
    match (a, b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let r = ra + rb;
            a_pos.distance_squared(b_pos) < r * r
        }
        (Shape::Rect { half: ha }, Shape::Rect { half: hb }) => {
            let d = (a_pos - b_pos).abs();
            d.x < ha.x + hb.x && d.y < ha.y + hb.y
        }
        (Shape::Circle { radius }, Shape::Rect { half }) => circle_rect(a_pos, radius, b_pos, half),
        (Shape::Rect { half }, Shape::Circle { radius }) => circle_rect(b_pos, radius, a_pos, half),
    }
}

fn circle_rect(center: Vec2, radius: f32, rect_pos: Vec2, half: Vec2) -> bool {
    let closest = center.clamp(rect_pos - half, rect_pos + half);
    center.distance_squared(closest) < radius * radius
}

/// What happens when an actor touches a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<X> {
    /// Actor is spent; target loses `amount` hit points and is destroyed at zero
    Damage { amount: u8 },
    /// Target is removed and scored for the actor
    Consume,
    /// Actor is spent; target is destroyed and replaced by smaller pieces
    Split,
    /// Target (the player) loses a life; the actor may be destroyed with it
    LifeLoss { destroy_actor: bool },
    /// Game-specific resolution
    Special(X),
}

/// One declared interacting pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction<C, X> {
    pub actor: C,
    pub target: C,
    pub outcome: Outcome<X>,
}

/// Declared interacting class pairs of one game
#[derive(Debug, Clone)]
pub struct InteractionTable<C, X> {
    rules: Vec<Interaction<C, X>>,
}

impl<C, X> Default for InteractionTable<C, X> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<C: Copy + Eq + Hash, X: Copy> InteractionTable<C, X> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, actor: C, target: C, outcome: Outcome<X>) -> Self {
        self.rules.push(Interaction {
            actor,
            target,
            outcome,
        });
        self
    }

    pub fn lookup(&self, actor: C, target: C) -> Option<Outcome<X>> {
        self.rules
            .iter()
            .find(|r| r.actor == actor && r.target == target)
            .map(|r| r.outcome)
    }

    fn is_actor(&self, class: C) -> bool {
        self.rules.iter().any(|r| r.actor == class)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A detected contact handed to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact<X> {
    pub actor: EntityId,
    pub target: EntityId,
    pub outcome: Outcome<X>,
}

/// Run one collision pass over `world`, resolving contacts in list order.
///
/// `resolve` may change entity states and spawn new entities (which join
/// next tick's pass) but must not purge.
pub fn collision_pass<K, S, X, F>(world: &mut World<K, S>, table: &InteractionTable<K::Class, X>, mut resolve: F)
where
    K: EntityKind,
    S: EntityState,
    X: Copy,
    F: FnMut(&mut World<K, S>, Contact<X>),
{
    let n = world.len();
    for i in 0..n {
        if !table.is_actor(world.entities()[i].kind.class()) {
            continue;
        }
        for j in 0..n {
            if i == j {
                continue;
            }
            let contact = {
                let entities = world.entities();
                let (a, b) = (&entities[i], &entities[j]);
                if a.is_excluded() {
                    break;
                }
                if b.is_excluded() {
                    continue;
                }
                let Some(outcome) = table.lookup(a.kind.class(), b.kind.class()) else {
                    continue;
                };
                if !overlaps(a.pos, a.shape, b.pos, b.shape) {
                    continue;
                }
                Contact {
                    actor: a.id,
                    target: b.id,
                    outcome,
                }
            };
            resolve(world, contact);
        }
    }
}
