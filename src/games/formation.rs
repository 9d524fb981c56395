//! Formation shooter: a swaying formation that peels off into dives, and a
//! boss that can beam the fighter up and later hand it back as a wingman

use glam::{IVec2, Vec2};
use rand::Rng;
use serde::Serialize;

use super::GameId;
use crate::ai::{Agent, Decision, SkyView, Strategy, TrajectorySelection};
use crate::audio::{Cue, LoopCue};
use crate::consts::{TICK_HZ, secs};
use crate::settings::Difficulty;
use crate::sim::engine::{Ctx, GameEntity, Removal, destroy};
use crate::sim::path::{PathPattern, generate};
use crate::sim::{
    Cone, Contact, Countdown, Entity, EntityId, EntityKind, EntityState, Game, InteractionTable, Motion, Outcome,
    PathCursor, Period, Shape, TickInput, Transition, Tuning, World, fire,
};

const SLOT_SPACING: Vec2 = Vec2::new(32.0, 28.0);
const FORMATION_TOP: f32 = 60.0;
const SWAY: f32 = 16.0;
const SWAY_PERIOD: f32 = (4 * TICK_HZ) as f32;

const ENEMY_RADIUS: f32 = 12.0;
const ENTRY_SPEED: f32 = 3.0;
const ENTRY_GROUP: usize = 8;
const ENTRY_GAP: u32 = 90;
const ENTRY_STAGGER: u32 = 8;

const FIGHTER_SPEED: f32 = 3.5;
const FIGHTER_RADIUS: f32 = 11.0;
const WING_OFFSET: f32 = 24.0;
const SHOT_SPEED: f32 = 8.0;
const SHOTS_SINGLE: usize = 2;
const BOMB_SPEED: f32 = 3.5;
const BOMB_CHANCE: f32 = 0.02;
const MAX_BOMBS: usize = 6;

/// Ticks between dive decisions
const DIVE_WINDOW: u32 = 30;
/// Ordinary dives between two capture attempts
const CAPTURE_AFTER_DIVES: u32 = 5;

const BEAM_DEPLOY: u32 = 40;
const BEAM_ACTIVE: u32 = secs(2);
const BEAM_GROW: u32 = secs(1);
const BEAM_RETRACT: u32 = 40;
const BEAM_LENGTH: f32 = 190.0;
const BEAM_HALF_ANGLE: f32 = 0.32;
/// Height above the fighter row where a capture dive hovers
const BEAM_CLEARANCE: f32 = 160.0;
const COMPANION_SPEED: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Foe {
    Bee,
    Butterfly,
    Boss,
}

impl Foe {
    fn for_row(row: i32) -> Self {
        match row {
            0 => Foe::Boss,
            1 | 2 => Foe::Butterfly,
            _ => Foe::Bee,
        }
    }

    /// Points while sitting in formation and while off it
    pub fn points(self, diving: bool) -> u32 {
        match (self, diving) {
            (Foe::Bee, false) => 50,
            (Foe::Bee, true) => 100,
            (Foe::Butterfly, false) => 80,
            (Foe::Butterfly, true) => 160,
            (Foe::Boss, false) => 150,
            (Foe::Boss, true) => 400,
        }
    }

    fn hp(self) -> u8 {
        match self {
            Foe::Boss => 2,
            _ => 1,
        }
    }
}

/// Formation slots as (row, first column, column count)
const ROWS: [(i32, i32, i32); 5] = [(0, 3, 4), (1, 1, 8), (2, 1, 8), (3, 0, 10), (4, 0, 10)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormationKind {
    Fighter,
    /// Rescued fighter flying docked beside the player
    Wing,
    Shot,
    Enemy { foe: Foe },
    Bomb,
    /// Captured fighter held above its boss
    Captive,
    /// Released captive on its way to dock
    Companion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormationClass {
    Fighter,
    Wing,
    Shot,
    Enemy,
    Bomb,
    Captive,
    Companion,
}

impl EntityKind for FormationKind {
    type Class = FormationClass;

    fn class(&self) -> FormationClass {
        match self {
            FormationKind::Fighter => FormationClass::Fighter,
            FormationKind::Wing => FormationClass::Wing,
            FormationKind::Shot => FormationClass::Shot,
            FormationKind::Enemy { .. } => FormationClass::Enemy,
            FormationKind::Bomb => FormationClass::Bomb,
            FormationKind::Captive => FormationClass::Captive,
            FormationKind::Companion => FormationClass::Companion,
        }
    }

    fn cap(&self) -> Option<usize> {
        match self {
            FormationKind::Shot => Some(SHOTS_SINGLE * 2),
            FormationKind::Bomb => Some(MAX_BOMBS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Beam {
    Deploying,
    Active,
    Retracting,
}

/// Flight state shared by every entity of this game.
///
/// Enemies cycle `Entering -> InFormation -> Diving -> (Beaming | Returning)
/// -> InFormation`; everything the player owns sits in `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flight {
    Entering,
    InFormation,
    Diving,
    Beaming(Beam),
    Returning,
    Active,
    Docking,
    Captured,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEvent {
    Arrived,
    Dive,
    PathDone { capture: bool },
    BeamOpened,
    BeamDone,
    BeamClosed,
    Captured,
    Destroyed,
}

impl Transition<FlightEvent> for Flight {
    fn next(&self, event: FlightEvent) -> Option<Self> {
        use Flight as F;
        use FlightEvent as E;
        match (*self, event) {
            (F::Dead | F::Captured, _) => None,
            (_, E::Destroyed) => Some(F::Dead),
            (F::Entering | F::Returning, E::Arrived) => Some(F::InFormation),
            (F::Docking, E::Arrived) => Some(F::Active),
            (F::InFormation, E::Dive) => Some(F::Diving),
            (F::Diving, E::PathDone { capture: true }) => Some(F::Beaming(Beam::Deploying)),
            (F::Diving, E::PathDone { capture: false }) => Some(F::Returning),
            (F::Beaming(Beam::Deploying), E::BeamOpened) => Some(F::Beaming(Beam::Active)),
            (F::Beaming(Beam::Active), E::BeamDone) => Some(F::Beaming(Beam::Retracting)),
            (F::Beaming(Beam::Retracting), E::BeamClosed) => Some(F::Returning),
            (F::Active, E::Captured) => Some(F::Captured),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Flight::Dead | Flight::Captured)
    }
}

impl EntityState for Flight {
    fn dead() -> Self {
        Flight::Dead
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Flight::Dead | Flight::Captured)
    }
}

impl Flight {
    /// Off formation; worth the higher score
    pub fn is_sortie(&self) -> bool {
        matches!(self, Flight::Diving | Flight::Beaming(_) | Flight::Returning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// Something struck the docked wingman
    WingHit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Carrier {
    boss: EntityId,
    captive: EntityId,
}

type FormationEntity = GameEntity<Formation>;

#[derive(Debug, Clone)]
pub struct Formation {
    bounds: Vec2,
    difficulty: Difficulty,
    sway: f32,
    /// Ordinary dives left before a boss tries the beam
    capture_in: Countdown,
    capture_diver: Option<EntityId>,
    carrier: Option<Carrier>,
    /// The fighter flies with a docked wingman
    dual: bool,
}

impl Formation {
    pub fn new(viewport: Vec2, difficulty: Difficulty) -> Self {
        Self {
            bounds: viewport,
            difficulty,
            sway: 0.0,
            capture_in: Countdown::new(CAPTURE_AFTER_DIVES),
            capture_diver: None,
            carrier: None,
            dual: false,
        }
    }

    pub fn is_dual(&self) -> bool {
        self.dual
    }

    fn fighter_y(&self) -> f32 {
        self.bounds.y - 48.0
    }

    fn beam_altitude(&self) -> f32 {
        self.fighter_y() - BEAM_CLEARANCE
    }

    /// Home position of formation slot `slot` at the current sway
    fn slot_pos(&self, slot: IVec2) -> Vec2 {
        Vec2::new(
            self.bounds.x * 0.5 + (slot.x as f32 - 4.5) * SLOT_SPACING.x + self.sway,
            FORMATION_TOP + slot.y as f32 * SLOT_SPACING.y,
        )
    }

    fn entry_point(&self, group: usize) -> Vec2 {
        match group % 4 {
            0 => Vec2::new(self.bounds.x * 0.35, -20.0),
            1 => Vec2::new(self.bounds.x * 0.65, -20.0),
            2 => Vec2::new(-20.0, self.bounds.y * 0.55),
            _ => Vec2::new(self.bounds.x + 20.0, self.bounds.y * 0.55),
        }
    }

    fn capture_ready(&self, world: &World<FormationKind, Flight>) -> bool {
        self.capture_in.is_done()
            && self.capture_diver.is_none()
            && self.carrier.is_none()
            && !self.dual
            && world.count_class(FormationClass::Companion) == 0
    }

    fn record_dive(&mut self) {
        self.capture_in.tick();
    }

    fn wing(world: &World<FormationKind, Flight>) -> Option<EntityId> {
        world.iter().find(|e| e.kind == FormationKind::Wing).map(|e| e.id)
    }

    fn fly_fighter(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        let wing = Self::wing(ctx.world);
        let shots = ctx.world.count_class(FormationClass::Shot);
        let width = self.bounds.x;
        let Some(fighter) = ctx.player.entity.and_then(|id| ctx.world.get_mut(id)) else {
            return;
        };
        if fighter.is_excluded() {
            return;
        }
        let right_edge = if wing.is_some() { width - WING_OFFSET } else { width };
        fighter.pos.x =
            (fighter.pos.x + input.axis_x() * FIGHTER_SPEED).clamp(FIGHTER_RADIUS, right_edge - FIGHTER_RADIUS);
        let at = fighter.pos;

        let mut muzzles = vec![at];
        if let Some(e) = wing.and_then(|id| ctx.world.get_mut(id)) {
            e.pos = at + Vec2::new(WING_OFFSET, 0.0);
            muzzles.push(e.pos);
        }
        let limit = SHOTS_SINGLE * muzzles.len();
        if !input.fire || shots + muzzles.len() > limit {
            return;
        }
        for muzzle in muzzles {
            let shot = Entity::new(
                FormationKind::Shot,
                muzzle - Vec2::new(0.0, FIGHTER_RADIUS),
                Shape::rect(2.0, 10.0),
                Flight::Active,
            )
            .with_motion(Motion::Velocity(Vec2::new(0.0, -SHOT_SPEED)));
            ctx.spawn(shot);
        }
        ctx.cue(Cue::Move);
    }

    fn fly_enemies(&mut self, ctx: &mut Ctx<'_, Self>) {
        let ids: Vec<EntityId> = ctx
            .world
            .iter()
            .filter(|e| e.kind.class() == FormationClass::Enemy)
            .map(|e| e.id)
            .collect();
        for id in ids {
            let Some(state) = ctx.world.get(id).map(|e| e.state) else {
                continue;
            };
            match state {
                Flight::Entering => self.enter(ctx, id),
                Flight::InFormation => {
                    if let Some(e) = ctx.world.get_mut(id) {
                        e.pos = self.slot_pos(e.cell.unwrap_or_default());
                    }
                }
                Flight::Diving => self.dive(ctx, id),
                Flight::Returning => {
                    if let Some(e) = ctx.world.get_mut(id)
                        && e.integrate()
                    {
                        fire(&mut e.state, FlightEvent::Arrived);
                        e.pos = self.slot_pos(e.cell.unwrap_or_default());
                    }
                }
                Flight::Beaming(beam) => self.beam(ctx, id, beam),
                _ => {}
            }
        }
    }

    fn enter(&mut self, ctx: &mut Ctx<'_, Self>, id: EntityId) {
        let bounds = self.bounds;
        let Some(e) = ctx.world.get_mut(id) else {
            return;
        };
        let slot = e.cell.unwrap_or_default();
        // Waiting off-screen until the group's turn
        if matches!(e.motion, Motion::Still) {
            if e.timer > 0 {
                e.timer -= 1;
            } else {
                let path = generate(PathPattern::Entry, e.pos, self.slot_pos(slot), bounds, ctx.rng);
                e.follow(PathCursor::new(path, ENTRY_SPEED));
            }
        } else if e.integrate() {
            fire(&mut e.state, FlightEvent::Arrived);
            e.pos = self.slot_pos(slot);
        }
    }

    fn dive(&mut self, ctx: &mut Ctx<'_, Self>, id: EntityId) {
        let capture = self.capture_diver == Some(id);
        let fighter_y = self.fighter_y();
        let target = ctx.player_pos();
        let Some(e) = ctx.world.get_mut(id) else {
            return;
        };
        let done = e.integrate();
        let at = e.pos;
        if done {
            fire(&mut e.state, FlightEvent::PathDone { capture });
            if capture {
                e.timer = BEAM_DEPLOY;
                ctx.start_loop(LoopCue::Hum);
                log::debug!("{id:?} deploying beam");
            } else {
                let home = self.slot_pos(e.cell.unwrap_or_default());
                let from = Vec2::new(home.x, -24.0);
                e.pos = from;
                let path = generate(PathPattern::Return, from, home, self.bounds, ctx.rng);
                e.follow(PathCursor::new(path, ENTRY_SPEED));
            }
            return;
        }

        if capture || at.y > fighter_y - 80.0 {
            return;
        }
        let chance = (BOMB_CHANCE * self.difficulty.aggression()).clamp(0.0, 1.0);
        if ctx.rng.random_bool(f64::from(chance)) {
            let drift = target.map_or(0.0, |t| ((t.x - at.x) / 60.0).clamp(-1.5, 1.5));
            let bomb = Entity::new(
                FormationKind::Bomb,
                at + Vec2::new(0.0, ENEMY_RADIUS),
                Shape::rect(3.0, 8.0),
                Flight::Active,
            )
            .with_motion(Motion::Velocity(Vec2::new(drift, BOMB_SPEED)));
            ctx.spawn(bomb);
        }
    }

    fn beam(&mut self, ctx: &mut Ctx<'_, Self>, id: EntityId, beam: Beam) {
        let Some(e) = ctx.world.get_mut(id) else {
            return;
        };
        e.timer = e.timer.saturating_sub(1);
        let at = e.pos;
        let elapsed = BEAM_ACTIVE.saturating_sub(e.timer);
        if e.timer == 0 {
            match beam {
                Beam::Deploying => {
                    fire(&mut e.state, FlightEvent::BeamOpened);
                    e.timer = BEAM_ACTIVE;
                }
                Beam::Active => {
                    fire(&mut e.state, FlightEvent::BeamDone);
                    e.timer = BEAM_RETRACT;
                }
                Beam::Retracting => {
                    fire(&mut e.state, FlightEvent::BeamClosed);
                    let home = self.slot_pos(e.cell.unwrap_or_default());
                    let path = generate(PathPattern::Return, at, home, self.bounds, ctx.rng);
                    e.follow(PathCursor::new(path, ENTRY_SPEED));
                    self.capture_diver = None;
                    ctx.stop_loop(LoopCue::Hum);
                }
            }
            return;
        }
        if beam == Beam::Active {
            let reach = (elapsed as f32 / BEAM_GROW as f32).min(1.0);
            let cone = Cone::downward(at + Vec2::new(0.0, ENEMY_RADIUS), BEAM_LENGTH * reach, BEAM_HALF_ANGLE);
            self.try_capture(ctx, id, cone);
        }
    }

    fn try_capture(&mut self, ctx: &mut Ctx<'_, Self>, boss: EntityId, cone: Cone) {
        if !ctx.player.is_vulnerable() || self.carrier.is_some() || self.dual {
            return;
        }
        let Some(fighter) = ctx.player.entity.and_then(|id| ctx.world.get_mut(id)) else {
            return;
        };
        if fighter.is_excluded() || !cone.contains_point(fighter.pos) {
            return;
        }
        fire(&mut fighter.state, FlightEvent::Captured);
        ctx.strike_player();

        let Some(boss_pos) = ctx.world.get_mut(boss).map(|e| {
            fire(&mut e.state, FlightEvent::BeamDone);
            e.timer = BEAM_RETRACT;
            e.pos
        }) else {
            return;
        };
        let captive = Entity::new(
            FormationKind::Captive,
            boss_pos - Vec2::new(0.0, ENEMY_RADIUS * 2.0),
            Shape::circle(FIGHTER_RADIUS),
            Flight::Active,
        );
        let captive = ctx.spawn(captive);
        self.carrier = Some(Carrier { boss, captive });
        log::info!("fighter captured by {boss:?}");
    }

    fn launch_dives(&mut self, ctx: &mut Ctx<'_, Self>) {
        if !Period::every(DIVE_WINDOW).fires(ctx.tick) || ctx.world.count(|e| e.state == Flight::Entering) > 0 {
            return;
        }
        let idle: Vec<(Agent, Foe)> = ctx
            .world
            .iter()
            .filter(|e| e.state == Flight::InFormation)
            .filter_map(|e| match e.kind {
                FormationKind::Enemy { foe } => Some((
                    Agent {
                        id: e.id,
                        pos: e.pos,
                        cell: e.cell.unwrap_or_default(),
                        heading: None,
                    },
                    foe,
                )),
                _ => None,
            })
            .collect();
        let active = ctx.world.count(|e| e.state.is_sortie());
        let selection = TrajectorySelection::for_level(ctx.level(), self.difficulty.aggression());
        if active >= selection.max_active {
            return;
        }

        let boss = if self.capture_ready(ctx.world) {
            idle.iter().find(|(_, foe)| *foe == Foe::Boss).map(|(a, _)| *a)
        } else {
            None
        };
        let (agent, capture) = match boss {
            Some(agent) => (agent, true),
            None => {
                let agents: Vec<Agent> = idle.iter().map(|(a, _)| *a).collect();
                match selection.pick(&agents, active, ctx.rng) {
                    Some(agent) => (*agent, false),
                    None => return,
                }
            }
        };

        let view = SkyView {
            target: ctx.player_pos().unwrap_or(ctx.player.spawn_point),
            bounds: self.bounds,
            capture,
            beam_altitude: self.beam_altitude(),
        };
        let Decision::Follow(path) = selection.decide(&agent, &view, ctx.rng) else {
            return;
        };
        if let Some(e) = ctx.world.get_mut(agent.id) {
            e.follow(PathCursor::new(path, selection.speed));
            fire(&mut e.state, FlightEvent::Dive);
        }
        if capture {
            self.capture_diver = Some(agent.id);
            self.capture_in.reset(CAPTURE_AFTER_DIVES);
            log::debug!("{:?} flies a capture dive", agent.id);
        } else {
            self.record_dive();
        }
    }

    fn carry_captive(&mut self, ctx: &mut Ctx<'_, Self>) {
        let Some(carrier) = self.carrier else {
            return;
        };
        let Some(boss_pos) = ctx.world.live(carrier.boss).map(|e| e.pos) else {
            return;
        };
        if let Some(captive) = ctx.world.get_mut(carrier.captive) {
            captive.pos = boss_pos - Vec2::new(0.0, ENEMY_RADIUS * 2.0);
        }
    }

    /// Fly released captives home; one that arrives next to a live fighter docks
    fn dock_companions(&mut self, ctx: &mut Ctx<'_, Self>) {
        let fighter = ctx
            .player_entity()
            .filter(|e| !e.is_excluded() && e.kind == FormationKind::Fighter)
            .map(|e| e.pos);
        let mut docked = false;
        for e in ctx.world.iter_mut().filter(|e| e.kind == FormationKind::Companion) {
            e.integrate();
            let arrived = matches!(&e.motion, Motion::Path(cursor) if cursor.is_finished());
            match (arrived, fighter, self.dual) {
                (true, Some(at), false) => {
                    e.kind = FormationKind::Wing;
                    e.motion = Motion::Still;
                    e.pos = at + Vec2::new(WING_OFFSET, 0.0);
                    fire(&mut e.state, FlightEvent::Arrived);
                    self.dual = true;
                    docked = true;
                }
                // Already flying dual; the spare has nowhere to dock
                (true, _, true) => {
                    e.kill();
                }
                _ => {}
            }
        }
        if docked {
            ctx.cue(Cue::PowerUp);
            log::info!("wingman docked");
        }
    }

    fn move_projectiles(&mut self, ctx: &mut Ctx<'_, Self>) {
        let height = self.bounds.y;
        let mut expired = Vec::new();
        for e in ctx.world.iter_mut() {
            let gone = match e.kind {
                FormationKind::Shot => {
                    e.integrate();
                    e.pos.y < -10.0
                }
                FormationKind::Bomb => {
                    e.integrate();
                    e.pos.y > height + 10.0
                }
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

    fn release_captive(&mut self, ctx: &mut Ctx<'_, Self>, carrier: Carrier, fallback: Vec2) {
        let from = ctx.world.kill(carrier.captive).map_or(fallback, |e| e.pos);
        let dock = ctx.player_pos().unwrap_or(ctx.player.spawn_point) + Vec2::new(WING_OFFSET, 0.0);
        let path = generate(PathPattern::Return, from, dock, self.bounds, ctx.rng);
        let companion = Entity::new(
            FormationKind::Companion,
            from,
            Shape::circle(FIGHTER_RADIUS),
            Flight::Docking,
        )
        .with_motion(Motion::Path(PathCursor::new(path, COMPANION_SPEED)));
        ctx.spawn(companion);
        log::info!("captive released");
    }
}

impl Game for Formation {
    type Kind = FormationKind;
    type State = Flight;
    type Special = Special;

    fn id(&self) -> GameId {
        GameId::Formation
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: secs(2),
            invulnerable_ticks: secs(2),
            wave_clear_pause: secs(2),
            ready_pause: secs(2),
            game_over_pause: secs(3),
            spawn_point: Vec2::new(self.bounds.x * 0.5, self.fighter_y()),
            extra_life_every: Some(20_000),
        }
    }

    fn interactions(&self) -> InteractionTable<FormationClass, Special> {
        use FormationClass as C;
        InteractionTable::new()
            .with(C::Shot, C::Enemy, Outcome::Damage { amount: 1 })
            .with(C::Enemy, C::Fighter, Outcome::LifeLoss { destroy_actor: true })
            .with(C::Bomb, C::Fighter, Outcome::LifeLoss { destroy_actor: true })
            .with(C::Enemy, C::Wing, Outcome::Special(Special::WingHit))
            .with(C::Bomb, C::Wing, Outcome::Special(Special::WingHit))
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        self.sway = 0.0;
        self.capture_in.reset(CAPTURE_AFTER_DIVES);
        self.capture_diver = None;
        self.carrier = None;
        ctx.stop_loop(LoopCue::Hum);

        let mut index = 0usize;
        for (row, first, count) in ROWS {
            let foe = Foe::for_row(row);
            for col in first..first + count {
                let group = index / ENTRY_GROUP;
                let delay = group as u32 * ENTRY_GAP + (index % ENTRY_GROUP) as u32 * ENTRY_STAGGER;
                let enemy = Entity::new(
                    FormationKind::Enemy { foe },
                    self.entry_point(group),
                    Shape::circle(ENEMY_RADIUS),
                    Flight::Entering,
                )
                .with_cell(IVec2::new(col, row))
                .with_hp(foe.hp())
                .with_timer(delay);
                ctx.spawn(enemy);
                index += 1;
            }
        }
        log::debug!("formation of {index} enemies");
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        let at = ctx.player.spawn_point;
        let fighter = ctx.spawn(Entity::new(
            FormationKind::Fighter,
            at,
            Shape::circle(FIGHTER_RADIUS),
            Flight::Active,
        ));
        if self.dual && Self::wing(ctx.world).is_none() {
            ctx.spawn(Entity::new(
                FormationKind::Wing,
                at + Vec2::new(WING_OFFSET, 0.0),
                Shape::circle(FIGHTER_RADIUS),
                Flight::Active,
            ));
        }
        fighter
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        self.sway = (ctx.tick as f32 * std::f32::consts::TAU / SWAY_PERIOD).sin() * SWAY;
        self.fly_fighter(ctx, input);
        self.fly_enemies(ctx);
        self.launch_dives(ctx);
        self.carry_captive(ctx);
        self.dock_companions(ctx);
        self.move_projectiles(ctx);
    }

    fn score_for(&self, entity: &FormationEntity) -> u32 {
        match entity.kind {
            FormationKind::Enemy { foe: Foe::Boss } if self.carrier.is_some_and(|c| c.boss == entity.id) => 800,
            FormationKind::Enemy { foe } => foe.points(entity.state.is_sortie()),
            _ => 0,
        }
    }

    /// A rescued ship still on its way home holds the wave open
    fn is_wave_cleared(&self, world: &World<FormationKind, Flight>) -> bool {
        world.count_class(FormationClass::Enemy) == 0
            && world.count_class(FormationClass::Captive) == 0
            && world.count_class(FormationClass::Companion) == 0
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, Self>, entity: &FormationEntity, _removal: Removal) {
        match entity.kind {
            FormationKind::Enemy { .. } => {
                if self.capture_diver == Some(entity.id) {
                    self.capture_diver = None;
                    ctx.stop_loop(LoopCue::Hum);
                }
                if let Some(carrier) = self.carrier.filter(|c| c.boss == entity.id) {
                    self.carrier = None;
                    self.release_captive(ctx, carrier, entity.pos);
                }
            }
            FormationKind::Wing => self.dual = false,
            _ => {}
        }
    }

    fn on_special(&mut self, ctx: &mut Ctx<'_, Self>, contact: Contact<Special>) {
        let Outcome::Special(Special::WingHit) = contact.outcome else {
            return;
        };
        if !destroy(self, ctx, contact.target, Removal::Destroyed) {
            return;
        }
        log::debug!("wingman lost");
        match ctx.world.get(contact.actor).map(|e| e.kind) {
            Some(FormationKind::Bomb) => {
                let _ = ctx.world.kill(contact.actor);
            }
            Some(FormationKind::Enemy { .. }) => {
                destroy(self, ctx, contact.actor, Removal::Destroyed);
            }
            _ => {}
        }
    }

    fn hud(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("dual", i64::from(self.dual)),
            ("capture_in", i64::from(self.capture_in.remaining())),
            ("carrying", i64::from(self.carrier.is_some())),
        ]
    }
}
