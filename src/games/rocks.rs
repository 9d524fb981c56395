//! Space shooter: a rotating, thrusting ship in a wrapping field of rocks

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::GameId;
use crate::audio::{Cue, LoopCue};
use crate::consts::secs;
use crate::settings::Difficulty;
use crate::sim::engine::{Ctx, GameEntity, Removal, destroy};
use crate::sim::path::{PathPattern, generate};
use crate::sim::{
    Countdown, Direction, Entity, EntityId, EntityKind, EntityState, Game, InteractionTable, Motion, Outcome,
    PathCursor, Scaling, Shape, TickInput, Tuning, World,
};
use crate::{polar_to_cartesian, wrap_position};

const ROTATE_SPEED: f32 = 0.08;
const THRUST: f32 = 0.12;
const DRAG: f32 = 0.99;
const MAX_SPEED: f32 = 6.0;
const SHIP_RADIUS: f32 = 10.0;

const SHOT_SPEED: f32 = 8.0;
const SHOT_LIFE: u32 = 60;
const MAX_SHOTS: usize = 4;

const ROCK_COUNT: Scaling = Scaling::new(4.0, 2.0, 11.0);
const ROCK_SPEED: Scaling = Scaling::new(0.6, 0.08, 1.6);
/// Rocks never spawn closer than this to the ship
const SAFE_RADIUS: f32 = 150.0;

const SAUCER_EVERY: Scaling = Scaling::new(secs(20) as f32, -(secs(2) as f32), secs(8) as f32);
const SAUCER_FIRE: u32 = 90;
const SAUCER_SPEED: f32 = 1.6;
const SAUCER_SHOT_SPEED: f32 = 4.0;
const SAUCER_POINTS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RockSize {
    Large,
    Medium,
    Small,
}

impl RockSize {
    pub fn radius(self) -> f32 {
        match self {
            RockSize::Large => 40.0,
            RockSize::Medium => 20.0,
            RockSize::Small => 10.0,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            RockSize::Large => 20,
            RockSize::Medium => 50,
            RockSize::Small => 100,
        }
    }

    /// Size of the two pieces a hit leaves behind
    pub fn smaller(self) -> Option<RockSize> {
        match self {
            RockSize::Large => Some(RockSize::Medium),
            RockSize::Medium => Some(RockSize::Small),
            RockSize::Small => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RockKind {
    Ship,
    Shot,
    Rock { size: RockSize },
    Saucer,
    SaucerShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RockClass {
    Ship,
    Shot,
    Rock,
    Saucer,
    SaucerShot,
}

impl EntityKind for RockKind {
    type Class = RockClass;

    fn class(&self) -> RockClass {
        match self {
            RockKind::Ship => RockClass::Ship,
            RockKind::Shot => RockClass::Shot,
            RockKind::Rock { .. } => RockClass::Rock,
            RockKind::Saucer => RockClass::Saucer,
            RockKind::SaucerShot => RockClass::SaucerShot,
        }
    }

    fn cap(&self) -> Option<usize> {
        match self {
            RockKind::Shot => Some(MAX_SHOTS),
            RockKind::SaucerShot => Some(2),
            RockKind::Saucer => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RockState {
    Flying,
    Gone,
}

impl EntityState for RockState {
    fn dead() -> Self {
        RockState::Gone
    }

    fn is_terminal(&self) -> bool {
        *self == RockState::Gone
    }
}

type RockEntity = GameEntity<Rocks>;

fn velocity(e: &RockEntity) -> Vec2 {
    match e.motion {
        Motion::Velocity(v) => v,
        _ => Vec2::ZERO,
    }
}

#[derive(Debug, Clone)]
pub struct Rocks {
    bounds: Vec2,
    difficulty: Difficulty,
    /// Ship facing in radians (screen space, y down)
    angle: f32,
    thrusting: bool,
    saucer_timer: Countdown,
}

impl Rocks {
    pub fn new(viewport: Vec2, difficulty: Difficulty) -> Self {
        Self {
            bounds: viewport,
            difficulty,
            angle: -FRAC_PI_2,
            thrusting: false,
            saucer_timer: Countdown::new(SAUCER_EVERY.ticks(0)),
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    fn rock(&self, size: RockSize, pos: Vec2, vel: Vec2) -> RockEntity {
        Entity::new(RockKind::Rock { size }, pos, Shape::circle(size.radius()), RockState::Flying)
            .with_motion(Motion::Velocity(vel))
    }

    fn random_velocity(&self, ctx: &mut Ctx<'_, Self>, speed: f32) -> Vec2 {
        let heading = ctx.rng.random_range(0.0..TAU);
        polar_to_cartesian(speed * ctx.rng.random_range(0.7..1.3), heading)
    }

    /// A point on the border at least `SAFE_RADIUS` from the ship
    fn edge_point(&self, ctx: &mut Ctx<'_, Self>) -> Vec2 {
        let ship = ctx.player_pos().unwrap_or(ctx.player.spawn_point);
        let mut pick = Vec2::ZERO;
        for _ in 0..8 {
            pick = if ctx.rng.random_bool(0.5) {
                Vec2::new(ctx.rng.random_range(0.0..self.bounds.x), 0.0)
            } else {
                Vec2::new(0.0, ctx.rng.random_range(0.0..self.bounds.y))
            };
            if pick.distance(ship) >= SAFE_RADIUS {
                break;
            }
        }
        pick
    }

    fn fly_ship(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        let Some(ship) = ctx.player.entity.filter(|id| ctx.world.live(*id).is_some()) else {
            return;
        };

        self.angle = crate::normalize_angle(self.angle + input.axis_x() * ROTATE_SPEED);
        let thrust = input.is_held(Direction::Up);
        if thrust != self.thrusting {
            self.thrusting = thrust;
            if thrust {
                ctx.start_loop(LoopCue::Hum);
            } else {
                ctx.stop_loop(LoopCue::Hum);
            }
        }

        if input.pressed == Some(Direction::Down) {
            let to = Vec2::new(
                ctx.rng.random_range(0.0..self.bounds.x),
                ctx.rng.random_range(0.0..self.bounds.y),
            );
            if let Some(e) = ctx.world.get_mut(ship) {
                e.pos = to;
                e.motion = Motion::Velocity(Vec2::ZERO);
            }
            log::debug!("hyperspace to {to}");
        }

        let facing = polar_to_cartesian(1.0, self.angle);
        let Some(e) = ctx.world.get_mut(ship) else {
            return;
        };
        let mut vel = velocity(e) * DRAG;
        if thrust {
            vel += facing * THRUST;
        }
        e.motion = Motion::Velocity(vel.clamp_length_max(MAX_SPEED));

        if input.fire {
            let nose = e.pos + facing * SHIP_RADIUS;
            let shot = Entity::new(RockKind::Shot, nose, Shape::circle(2.0), RockState::Flying)
                .with_motion(Motion::Velocity(vel + facing * SHOT_SPEED))
                .with_timer(SHOT_LIFE);
            ctx.spawn(shot);
            ctx.cue(Cue::Move);
        }
    }

    fn run_saucer(&mut self, ctx: &mut Ctx<'_, Self>) {
        let saucer = ctx.world.iter().find(|e| e.kind == RockKind::Saucer).map(|e| e.id);
        let Some(id) = saucer else {
            if self.saucer_timer.tick() {
                self.launch_saucer(ctx);
            }
            return;
        };

        let target = ctx.player_pos();
        let Some(e) = ctx.world.get_mut(id) else {
            return;
        };
        e.timer = e.timer.saturating_sub(1);
        if e.timer > 0 {
            return;
        }
        e.timer = SAUCER_FIRE;
        let from = e.pos;
        let Some(target) = target else {
            return;
        };
        // Aim improves with level
        let spread = (0.4 - ctx.level() as f32 * 0.04).max(0.05);
        let aim = (target - from).to_angle() + ctx.rng.random_range(-spread..=spread);
        let shot = Entity::new(RockKind::SaucerShot, from, Shape::circle(2.5), RockState::Flying)
            .with_motion(Motion::Velocity(polar_to_cartesian(SAUCER_SHOT_SPEED, aim)))
            .with_timer(SHOT_LIFE * 2);
        ctx.spawn(shot);
    }

    fn launch_saucer(&mut self, ctx: &mut Ctx<'_, Self>) {
        self.saucer_timer.reset(SAUCER_EVERY.ticks(ctx.level()));
        let y = ctx.rng.random_range(self.bounds.y * 0.15..self.bounds.y * 0.85);
        let from = if ctx.rng.random_bool(0.5) {
            Vec2::new(-16.0, y)
        } else {
            Vec2::new(self.bounds.x + 16.0, y)
        };
        let path = generate(PathPattern::LateralSweep, from, from, self.bounds, ctx.rng);
        let saucer = Entity::new(RockKind::Saucer, from, Shape::rect(30.0, 14.0), RockState::Flying)
            .with_motion(Motion::Path(PathCursor::new(path, SAUCER_SPEED * self.difficulty.aggression())))
            .with_timer(SAUCER_FIRE);
        ctx.spawn(saucer);
        ctx.start_loop(LoopCue::Siren);
        log::debug!("saucer launched at {from}");
    }
}

impl Game for Rocks {
    type Kind = RockKind;
    type State = RockState;
    type Special = ();

    fn id(&self) -> GameId {
        GameId::Rocks
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: secs(2),
            invulnerable_ticks: secs(2),
            wave_clear_pause: secs(2),
            ready_pause: secs(1),
            game_over_pause: secs(3),
            spawn_point: self.bounds * 0.5,
            extra_life_every: Some(10_000),
        }
    }

    fn interactions(&self) -> InteractionTable<RockClass, ()> {
        InteractionTable::new()
            .with(RockClass::Shot, RockClass::Rock, Outcome::Split)
            .with(RockClass::Shot, RockClass::Saucer, Outcome::Damage { amount: 1 })
            .with(RockClass::Rock, RockClass::Ship, Outcome::LifeLoss { destroy_actor: true })
            .with(RockClass::Saucer, RockClass::Ship, Outcome::LifeLoss { destroy_actor: true })
            .with(RockClass::SaucerShot, RockClass::Ship, Outcome::LifeLoss { destroy_actor: true })
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        let level = ctx.level();
        let count = ROCK_COUNT.count(level);
        let speed = ROCK_SPEED.at(level) * self.difficulty.aggression();
        for _ in 0..count {
            let at = self.edge_point(ctx);
            let vel = self.random_velocity(ctx, speed);
            ctx.spawn(self.rock(RockSize::Large, at, vel));
        }
        self.saucer_timer.reset(SAUCER_EVERY.ticks(level));
        ctx.stop_loop(LoopCue::Siren);
        log::debug!("{count} rocks at speed {speed:.2}");
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        self.angle = -FRAC_PI_2;
        self.thrusting = false;
        let ship = Entity::new(RockKind::Ship, ctx.player.spawn_point, Shape::circle(SHIP_RADIUS), RockState::Flying)
            .with_motion(Motion::Velocity(Vec2::ZERO));
        ctx.spawn(ship)
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        self.fly_ship(ctx, input);
        self.run_saucer(ctx);

        let bounds = ctx.world.bounds;
        let mut expired = Vec::new();
        for e in ctx.world.iter_mut() {
            let path_done = e.integrate();
            match e.kind {
                RockKind::Saucer => {
                    if path_done {
                        expired.push(e.id);
                    }
                }
                RockKind::Shot | RockKind::SaucerShot => {
                    e.pos = wrap_position(e.pos, bounds);
                    e.timer = e.timer.saturating_sub(1);
                    if e.timer == 0 {
                        expired.push(e.id);
                    }
                }
                _ => e.pos = wrap_position(e.pos, bounds),
            }
        }
        for id in expired {
            destroy(self, ctx, id, Removal::Expired);
        }
    }

    fn score_for(&self, entity: &RockEntity) -> u32 {
        match entity.kind {
            RockKind::Rock { size } => size.points(),
            RockKind::Saucer => SAUCER_POINTS,
            _ => 0,
        }
    }

    fn is_wave_cleared(&self, world: &World<RockKind, RockState>) -> bool {
        world.count_class(RockClass::Rock) == 0
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, Self>, entity: &RockEntity, removal: Removal) {
        match entity.kind {
            RockKind::Rock { size } if removal != Removal::Expired => {
                let Some(piece) = size.smaller() else {
                    return;
                };
                let speed = velocity(entity).length().max(ROCK_SPEED.at(ctx.level())) * 1.3;
                for _ in 0..2 {
                    let vel = self.random_velocity(ctx, speed);
                    ctx.spawn(self.rock(piece, entity.pos, vel));
                }
            }
            RockKind::Saucer => ctx.stop_loop(LoopCue::Siren),
            _ => {}
        }
    }

    fn on_player_down(&mut self, ctx: &mut Ctx<'_, Self>) {
        if self.thrusting {
            self.thrusting = false;
            ctx.stop_loop(LoopCue::Hum);
        }
    }

    fn hud(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("heading_mrad", (self.angle * 1000.0) as i64),
            ("thrust", i64::from(self.thrusting)),
        ]
    }
}
