//! Invaders: a marching 5x11 grid, bombs from below, a mystery ship above

use glam::{IVec2, Vec2};
use rand::Rng;
use serde::Serialize;

use super::GameId;
use crate::audio::{Cue, LoopCue};
use crate::consts::secs;
use crate::settings::Difficulty;
use crate::sim::engine::{Ctx, GameEntity, Removal, destroy};
use crate::sim::path::{PathPattern, generate};
use crate::sim::{
    Countdown, Entity, EntityId, EntityKind, EntityState, Game, InteractionTable, Motion, Outcome, PathCursor,
    Scaling, Shape, TickInput, Tuning, World,
};

pub const ROWS: i32 = 5;
pub const COLS: i32 = 11;
const INVADER_SIZE: Vec2 = Vec2::new(24.0, 18.0);
const STEP: f32 = 6.0;
const DROP: f32 = 16.0;
const MARGIN: f32 = 8.0;

const CANNON_SPEED: f32 = 3.0;
const CANNON_SIZE: Vec2 = Vec2::new(26.0, 14.0);
const SHOT_SPEED: f32 = 8.0;
const BOMB_SPEED: f32 = 3.0;
const MAX_BOMBS: usize = 3;

/// Ticks between march steps with a full grid
const MARCH_PERIOD: Scaling = Scaling::new(40.0, -3.0, 12.0);
const BOMB_CHANCE: Scaling = Scaling::new(0.015, 0.004, 0.06);
const MYSTERY_EVERY: u32 = secs(25);
const MYSTERY_SPEED: f32 = 1.5;
pub const MYSTERY_VALUES: [u32; 4] = [50, 100, 150, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rank {
    Squid,
    Crab,
    Octopus,
}

impl Rank {
    fn for_row(row: i32) -> Self {
        match row {
            0 => Rank::Squid,
            1 | 2 => Rank::Crab,
            _ => Rank::Octopus,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            Rank::Squid => 30,
            Rank::Crab => 20,
            Rank::Octopus => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvaderKind {
    Cannon,
    Shot,
    Invader { rank: Rank },
    Bomb,
    Mystery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvaderClass {
    Cannon,
    Shot,
    Invader,
    Bomb,
    Mystery,
}

impl EntityKind for InvaderKind {
    type Class = InvaderClass;

    fn class(&self) -> InvaderClass {
        match self {
            InvaderKind::Cannon => InvaderClass::Cannon,
            InvaderKind::Shot => InvaderClass::Shot,
            InvaderKind::Invader { .. } => InvaderClass::Invader,
            InvaderKind::Bomb => InvaderClass::Bomb,
            InvaderKind::Mystery => InvaderClass::Mystery,
        }
    }

    fn cap(&self) -> Option<usize> {
        match self {
            InvaderKind::Shot | InvaderKind::Mystery => Some(1),
            InvaderKind::Bomb => Some(MAX_BOMBS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvaderState {
    Alive,
    Gone,
}

impl EntityState for InvaderState {
    fn dead() -> Self {
        InvaderState::Gone
    }

    fn is_terminal(&self) -> bool {
        *self == InvaderState::Gone
    }
}

type InvaderEntity = GameEntity<Invaders>;

/// Ticks between march steps for `alive` of the 55 invaders
pub fn march_period(level: u32, alive: usize, aggression: f32) -> u32 {
    let full = MARCH_PERIOD.at(level) / aggression.max(0.1);
    let share = alive.min((ROWS * COLS) as usize) as f32 / (ROWS * COLS) as f32;
    (full * share).round().max(1.0) as u32
}

#[derive(Debug, Clone)]
pub struct Invaders {
    bounds: Vec2,
    difficulty: Difficulty,
    /// +1 marching right, -1 left
    direction: f32,
    march: Countdown,
    /// Two-frame march animation
    frame: bool,
    mystery_timer: Countdown,
    mystery_value: u32,
}

impl Invaders {
    pub fn new(viewport: Vec2, difficulty: Difficulty) -> Self {
        Self {
            bounds: viewport,
            difficulty,
            direction: 1.0,
            march: Countdown::new(1),
            frame: false,
            mystery_timer: Countdown::new(MYSTERY_EVERY),
            mystery_value: 0,
        }
    }

    fn cannon_y(&self) -> f32 {
        self.bounds.y - 40.0
    }

    fn spacing(&self) -> Vec2 {
        Vec2::new((self.bounds.x * 0.6 / (COLS - 1) as f32).max(INVADER_SIZE.x + 4.0), 32.0)
    }

    /// Step the grid once: sideways, or down and reversed at an edge. True on a drop.
    fn march(&mut self, world: &mut World<InvaderKind, InvaderState>) -> bool {
        let half = INVADER_SIZE.x * 0.5;
        let (min_x, max_x) = world
            .iter()
            .filter(|e| e.kind.class() == InvaderClass::Invader)
            .fold((f32::MAX, f32::MIN), |(lo, hi), e| (lo.min(e.pos.x), hi.max(e.pos.x)));
        let blocked = if self.direction > 0.0 {
            max_x + half + STEP > self.bounds.x - MARGIN
        } else {
            min_x - half - STEP < MARGIN
        };
        self.frame = !self.frame;
        for e in world.iter_mut().filter(|e| e.kind.class() == InvaderClass::Invader) {
            if blocked {
                e.pos.y += DROP;
            } else {
                e.pos.x += self.direction * STEP;
            }
        }
        if blocked {
            self.direction = -self.direction;
        }
        blocked
    }

    /// Lowest live invader of a random column
    fn pick_bomber(&self, ctx: &mut Ctx<'_, Self>) -> Option<Vec2> {
        let mut bottoms: Vec<(i32, Vec2)> = Vec::new();
        for e in ctx.world.iter().filter(|e| e.kind.class() == InvaderClass::Invader) {
            let col = e.cell.map_or(0, |c| c.x);
            match bottoms.iter_mut().find(|(c, _)| *c == col) {
                Some((_, pos)) if e.pos.y > pos.y => *pos = e.pos,
                Some(_) => {}
                None => bottoms.push((col, e.pos)),
            }
        }
        if bottoms.is_empty() {
            return None;
        }
        let (_, pos) = bottoms[ctx.rng.random_range(0..bottoms.len())];
        Some(pos)
    }

    fn drop_bombs(&mut self, ctx: &mut Ctx<'_, Self>) {
        let chance = (BOMB_CHANCE.at(ctx.level()) * self.difficulty.aggression()).clamp(0.0, 1.0);
        if !ctx.rng.random_bool(f64::from(chance)) {
            return;
        }
        if let Some(at) = self.pick_bomber(ctx) {
            let bomb = Entity::new(
                InvaderKind::Bomb,
                at + Vec2::new(0.0, INVADER_SIZE.y * 0.5),
                Shape::rect(3.0, 10.0),
                InvaderState::Alive,
            )
            .with_motion(Motion::Velocity(Vec2::new(0.0, BOMB_SPEED)));
            ctx.spawn(bomb);
        }
    }

    fn move_cannon(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        let shot_live = ctx.world.count_class(InvaderClass::Shot) > 0;
        let width = self.bounds.x;
        let Some(e) = ctx.player.entity.and_then(|id| ctx.world.get_mut(id)) else {
            return;
        };
        if e.is_excluded() {
            return;
        }
        let half = CANNON_SIZE.x * 0.5;
        e.pos.x = (e.pos.x + input.axis_x() * CANNON_SPEED).clamp(half, width - half);
        let muzzle = e.pos - Vec2::new(0.0, CANNON_SIZE.y * 0.5);
        if input.fire && !shot_live {
            let shot = Entity::new(InvaderKind::Shot, muzzle, Shape::rect(2.0, 10.0), InvaderState::Alive)
                .with_motion(Motion::Velocity(Vec2::new(0.0, -SHOT_SPEED)));
            ctx.spawn(shot);
            ctx.cue(Cue::Move);
        }
    }

    fn run_mystery(&mut self, ctx: &mut Ctx<'_, Self>) {
        if ctx.world.count_class(InvaderClass::Mystery) > 0 || !self.mystery_timer.tick() {
            return;
        }
        self.mystery_timer.reset(MYSTERY_EVERY);
        self.mystery_value = MYSTERY_VALUES[ctx.rng.random_range(0..MYSTERY_VALUES.len())];
        let from = if ctx.rng.random_bool(0.5) {
            Vec2::new(-20.0, 40.0)
        } else {
            Vec2::new(self.bounds.x + 20.0, 40.0)
        };
        let path = generate(PathPattern::LateralSweep, from, from, self.bounds, ctx.rng);
        let ship = Entity::new(InvaderKind::Mystery, from, Shape::rect(32.0, 14.0), InvaderState::Alive)
            .with_motion(Motion::Path(PathCursor::new(path, MYSTERY_SPEED)));
        ctx.spawn(ship);
        ctx.start_loop(LoopCue::Siren);
        log::debug!("mystery ship worth {}", self.mystery_value);
    }

    fn landed(&self, world: &World<InvaderKind, InvaderState>) -> bool {
        let line = self.cannon_y() - CANNON_SIZE.y * 0.5;
        world
            .iter()
            .filter(|e| e.kind.class() == InvaderClass::Invader)
            .any(|e| e.pos.y + INVADER_SIZE.y * 0.5 >= line)
    }
}

impl Game for Invaders {
    type Kind = InvaderKind;
    type State = InvaderState;
    type Special = ();

    fn id(&self) -> GameId {
        GameId::Invaders
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: secs(2),
            invulnerable_ticks: secs(1),
            wave_clear_pause: secs(2),
            ready_pause: secs(1),
            game_over_pause: secs(3),
            spawn_point: Vec2::new(self.bounds.x * 0.5, self.cannon_y()),
            extra_life_every: Some(1_500),
        }
    }

    fn interactions(&self) -> InteractionTable<InvaderClass, ()> {
        InteractionTable::new()
            .with(InvaderClass::Shot, InvaderClass::Invader, Outcome::Damage { amount: 1 })
            .with(InvaderClass::Shot, InvaderClass::Mystery, Outcome::Damage { amount: 1 })
            .with(InvaderClass::Bomb, InvaderClass::Cannon, Outcome::LifeLoss { destroy_actor: true })
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        let level = ctx.level();
        let spacing = self.spacing();
        let left = (self.bounds.x - spacing.x * (COLS - 1) as f32) * 0.5;
        let top = 80.0 + level.min(6) as f32 * DROP;
        for row in 0..ROWS {
            for col in 0..COLS {
                let at = Vec2::new(left + col as f32 * spacing.x, top + row as f32 * spacing.y);
                let invader = Entity::new(
                    InvaderKind::Invader {
                        rank: Rank::for_row(row),
                    },
                    at,
                    Shape::rect(INVADER_SIZE.x, INVADER_SIZE.y),
                    InvaderState::Alive,
                )
                .with_cell(IVec2::new(col, row));
                ctx.spawn(invader);
            }
        }
        self.direction = 1.0;
        self.frame = false;
        self.march.reset(march_period(level, (ROWS * COLS) as usize, self.difficulty.aggression()));
        self.mystery_timer.reset(MYSTERY_EVERY);
        ctx.stop_loop(LoopCue::Siren);
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        let cannon = Entity::new(
            InvaderKind::Cannon,
            ctx.player.spawn_point,
            Shape::rect(CANNON_SIZE.x, CANNON_SIZE.y),
            InvaderState::Alive,
        );
        ctx.spawn(cannon)
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        self.move_cannon(ctx, input);

        if self.march.tick() {
            self.march(ctx.world);
            ctx.cue(Cue::Move);
            let alive = ctx.world.count_class(InvaderClass::Invader);
            self.march.reset(march_period(ctx.level(), alive, self.difficulty.aggression()));
        }
        if self.landed(ctx.world) {
            log::info!("invaders reached the cannon row");
            ctx.end_session();
            return;
        }

        self.drop_bombs(ctx);
        self.run_mystery(ctx);

        let height = self.bounds.y;
        let mut expired = Vec::new();
        for e in ctx.world.iter_mut() {
            let path_done = e.integrate();
            let gone = match e.kind {
                InvaderKind::Shot => e.pos.y < 0.0,
                InvaderKind::Bomb => e.pos.y > height,
                InvaderKind::Mystery => path_done,
                _ => false,
            };
            if gone {
                expired.push(e.id);
            }
        }
        for id in expired {
            destroy(self, ctx, id, Removal::Expired);
        }
    }

    fn score_for(&self, entity: &InvaderEntity) -> u32 {
        match entity.kind {
            InvaderKind::Invader { rank } => rank.points(),
            InvaderKind::Mystery => self.mystery_value,
            _ => 0,
        }
    }

    fn is_wave_cleared(&self, world: &World<InvaderKind, InvaderState>) -> bool {
        world.count_class(InvaderClass::Invader) == 0
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, Self>, entity: &InvaderEntity, _removal: Removal) {
        if entity.kind == InvaderKind::Mystery {
            ctx.stop_loop(LoopCue::Siren);
        }
    }

    fn hud(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("frame", i64::from(self.frame)),
            ("march_ticks", i64::from(self.march.remaining())),
        ]
    }
}
