//! Entities and the world that owns them
//!
//! Entities live in one `Vec` in spawn order; that order is the iteration
//! order for AI, collisions and snapshots. Terminal entities are skipped by
//! every pass and purged at the end of the tick.

use std::fmt::Debug;
use std::hash::Hash;

use glam::{IVec2, Vec2};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Shape;
use super::grid::Direction;
use super::path::PathCursor;
use crate::consts::MAX_PARTICLES;

/// Stable entity handle (never reused within a session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Kind tag of a game's entity catalog
pub trait EntityKind: Copy + Debug + PartialEq + Serialize {
    /// Coarse class used to key the interaction table
    type Class: Copy + Debug + Eq + Hash;

    fn class(&self) -> Self::Class;

    /// Hard cap on live entities of this kind's class
    fn cap(&self) -> Option<usize> {
        None
    }
}

/// State tag of a game's entity state machines
pub trait EntityState: Copy + Debug + PartialEq + Serialize {
    /// The terminal state used when the engine destroys an entity
    fn dead() -> Self;

    /// Terminal entities are excluded from collision and render
    fn is_terminal(&self) -> bool;
}

/// How an entity moves each tick
#[derive(Debug, Clone, Default)]
pub enum Motion {
    #[default]
    Still,
    /// Pixels per tick
    Velocity(Vec2),
    /// Scripted curve
    Path(PathCursor),
    /// Cell-stepping with a heading; the game moves it on its own period
    Grid { heading: Direction },
}

/// A simulated object
#[derive(Debug, Clone)]
pub struct Entity<K, S> {
    pub id: EntityId,
    pub kind: K,
    pub pos: Vec2,
    pub cell: Option<IVec2>,
    pub motion: Motion,
    pub shape: Shape,
    pub state: S,
    pub hp: u8,
    /// General-purpose per-entity timer (ticks)
    pub timer: u32,
    pub spawned_at: u64,
}

impl<K: EntityKind, S: EntityState> Entity<K, S> {
    pub fn new(kind: K, pos: Vec2, shape: Shape, state: S) -> Self {
        Self {
            id: EntityId(0),
            kind,
            pos,
            cell: None,
            motion: Motion::Still,
            shape,
            state,
            hp: 1,
            timer: 0,
            spawned_at: 0,
        }
    }

    pub fn with_cell(mut self, cell: IVec2) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_hp(mut self, hp: u8) -> Self {
        self.hp = hp;
        self
    }

    pub fn with_timer(mut self, ticks: u32) -> Self {
        self.timer = ticks;
        self
    }

    /// Excluded from collision and render (terminal state)
    pub fn is_excluded(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to the terminal state; false if already terminal
    pub fn kill(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = S::dead();
        true
    }

    pub fn heading(&self) -> Option<Direction> {
        match self.motion {
            Motion::Grid { heading } => Some(heading),
            _ => None,
        }
    }

    pub fn set_heading(&mut self, heading: Direction) {
        self.motion = Motion::Grid { heading };
    }

    pub fn follow(&mut self, cursor: PathCursor) {
        self.motion = Motion::Path(cursor);
    }

    /// Integrate continuous motion one tick; true when a path just finished
    pub fn integrate(&mut self) -> bool {
        match &mut self.motion {
            Motion::Velocity(v) => {
                self.pos += *v;
                false
            }
            Motion::Path(cursor) => {
                if cursor.is_finished() {
                    return false;
                }
                self.pos = cursor.advance();
                cursor.is_finished()
            }
            Motion::Still | Motion::Grid { .. } => false,
        }
    }
}

/// Purely visual debris; capped, never collides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Palette index for the renderer
    pub tint: u32,
    /// 0-1, decreases over time
    pub life: f32,
    pub size: f32,
}

/// Entity storage for one session
#[derive(Debug, Clone)]
pub struct World<K, S> {
    entities: Vec<Entity<K, S>>,
    pub particles: Vec<Particle>,
    pub bounds: Vec2,
    particle_cap: usize,
    next_id: u32,
}

impl<K: EntityKind, S: EntityState> World<K, S> {
    pub fn new(bounds: Vec2) -> Self {
        Self {
            entities: Vec::new(),
            particles: Vec::new(),
            bounds,
            particle_cap: MAX_PARTICLES,
            next_id: 1,
        }
    }

    pub fn set_particle_cap(&mut self, cap: usize) {
        self.particle_cap = cap.min(MAX_PARTICLES);
        self.trim_particles();
    }

    /// Insert an entity, evicting the oldest live member of its class when capped
    pub fn spawn(&mut self, mut entity: Entity<K, S>, tick: u64) -> EntityId {
        if let Some(cap) = entity.kind.cap() {
            let class = entity.kind.class();
            let live = self.count_class(class);
            if live >= cap {
                if let Some(oldest) = self
                    .entities
                    .iter_mut()
                    .filter(|e| !e.is_excluded() && e.kind.class() == class)
                    .min_by_key(|e| e.spawned_at)
                {
                    log::debug!("cap {cap} reached for {class:?}, dropping {:?}", oldest.id);
                    oldest.kill();
                }
            }
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        entity.spawned_at = tick;
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<K, S>> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<K, S>> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Live (non-terminal) entity by id
    pub fn live(&self, id: EntityId) -> Option<&Entity<K, S>> {
        self.get(id).filter(|e| !e.is_excluded())
    }

    /// All entities in list order, terminal ones included
    pub fn entities(&self) -> &[Entity<K, S>] {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [Entity<K, S>] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in list order
    pub fn iter(&self) -> impl Iterator<Item = &Entity<K, S>> {
        self.entities.iter().filter(|e| !e.is_excluded())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity<K, S>> {
        self.entities.iter_mut().filter(|e| !e.is_excluded())
    }

    pub fn count(&self, pred: impl Fn(&Entity<K, S>) -> bool) -> usize {
        self.iter().filter(|e| pred(e)).count()
    }

    pub fn count_class(&self, class: K::Class) -> usize {
        self.count(|e| e.kind.class() == class)
    }

    /// Kill by id; returns a copy of the entity as it was while live
    pub fn kill(&mut self, id: EntityId) -> Option<Entity<K, S>> {
        let entity = self.get_mut(id)?;
        let before = entity.clone();
        entity.kill().then_some(before)
    }

    /// Drop every terminal entity; returns how many were removed
    pub fn purge(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| !e.is_excluded());
        before - self.entities.len()
    }

    /// Remove all entities (wave reset); particles keep animating
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Spray `count` particles from `at`, dropping the oldest past the cap
    pub fn burst(&mut self, at: Vec2, count: usize, tint: u32, rng: &mut Pcg32) {
        for _ in 0..count {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let speed = rng.random_range(0.5..2.5);
            self.particles.push(Particle {
                pos: at,
                vel: crate::polar_to_cartesian(speed, angle),
                tint,
                life: 1.0,
                size: rng.random_range(1.0..3.0),
            });
        }
        self.trim_particles();
    }

    fn trim_particles(&mut self) {
        if self.particles.len() > self.particle_cap {
            let excess = self.particles.len() - self.particle_cap;
            self.particles.drain(..excess);
        }
    }

    /// Advance particle animation one tick
    pub fn update_particles(&mut self) {
        for particle in self.particles.iter_mut() {
            particle.pos += particle.vel;
            particle.vel *= 0.96;
            particle.life -= 1.0 / 45.0;
            particle.size *= 0.99;
        }
        self.particles.retain(|p| p.life > 0.0);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub enum TestKind {
        Ship,
        Shot,
        Rock,
    }

    impl EntityKind for TestKind {
        type Class = TestKind;

        fn class(&self) -> TestKind {
            *self
        }

        fn cap(&self) -> Option<usize> {
            (*self == TestKind::Shot).then_some(2)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub enum TestState {
        Alive,
        Dead,
    }

    impl EntityState for TestState {
        fn dead() -> Self {
            TestState::Dead
        }

        fn is_terminal(&self) -> bool {
            *self == TestState::Dead
        }
    }

    pub fn circle(kind: TestKind, x: f32, y: f32) -> Entity<TestKind, TestState> {
        Entity::new(kind, Vec2::new(x, y), Shape::Circle { radius: 4.0 }, TestState::Alive)
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let mut world = World::new(Vec2::splat(100.0));
        let a = world.spawn(circle(TestKind::Ship, 0.0, 0.0), 0);
        let b = world.spawn(circle(TestKind::Rock, 5.0, 0.0), 0);
        assert!(a < b);
        assert_eq!(world.entities()[1].id, b);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut world = World::new(Vec2::splat(100.0));
        let first = world.spawn(circle(TestKind::Shot, 0.0, 0.0), 1);
        world.spawn(circle(TestKind::Shot, 0.0, 0.0), 2);
        world.spawn(circle(TestKind::Shot, 0.0, 0.0), 3);
        assert_eq!(world.count_class(TestKind::Shot), 2);
        assert!(world.live(first).is_none());
        world.purge();
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut world = World::new(Vec2::splat(100.0));
        let id = world.spawn(circle(TestKind::Rock, 0.0, 0.0), 0);
        assert!(world.kill(id).is_some());
        assert!(world.kill(id).is_none());
        let e = world.get(id).map(|e| e.is_excluded());
        assert_eq!(e, Some(true));
        assert_eq!(world.get(id).map(|e| e.is_excluded()), Some(true));
    }

    #[test]
    fn test_particle_cap_drops_oldest() {
        let mut world: World<TestKind, TestState> = World::new(Vec2::splat(100.0));
        let mut rng = Pcg32::seed_from_u64(4);
        world.burst(Vec2::ZERO, 200, 1, &mut rng);
        world.burst(Vec2::ONE, 200, 2, &mut rng);
        assert_eq!(world.particles.len(), MAX_PARTICLES);
        assert_eq!(world.particles.last().map(|p| p.tint), Some(2));
        assert_eq!(world.particles.iter().filter(|p| p.tint == 2).count(), 200);
    }

    #[test]
    fn test_velocity_integration() {
        let mut e = circle(TestKind::Rock, 1.0, 1.0).with_motion(Motion::Velocity(Vec2::new(2.0, -1.0)));
        e.integrate();
        assert_eq!(e.pos, Vec2::new(3.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_terminal_check_is_stable(kills in 1usize..5) {
            let mut e = circle(TestKind::Ship, 0.0, 0.0);
            let mut transitions = 0;
            for _ in 0..kills {
                if e.kill() {
                    transitions += 1;
                }
                prop_assert!(e.is_excluded());
            }
            prop_assert_eq!(transitions, 1);
            prop_assert_eq!(e.is_excluded(), e.is_excluded());
        }
    }
}
