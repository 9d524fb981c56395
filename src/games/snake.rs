//! Snake arena: one player snake against greedy AI snakes in a shrinking ring

use std::collections::VecDeque;

use glam::{IVec2, Vec2};
use rand::Rng;
use serde::Serialize;

use super::{GameId, cell_center};
use crate::ai::{Agent, ArenaView, Behavior, Decision, GreedyScoring, Head, Strategy};
use crate::audio::Cue;
use crate::consts::secs;
use crate::settings::Difficulty;
use crate::sim::engine::{Ctx, GameEntity, Removal, destroy};
use crate::sim::{
    Contact, Countdown, Direction, Entity, EntityId, EntityKind, EntityState, Game, Grid, InteractionTable, Motion,
    Outcome, Scaling, Shape, TickInput, Tuning, World,
};

pub const ARENA: i32 = 30;
/// The ring stops shrinking at this many cells across
const MIN_ARENA: i32 = 10;
const START_LENGTH: usize = 3;
const GROWTH: u32 = 3;
const FOOD_COUNT: usize = 3;

const FOOD_POINTS: u32 = 10;
const RIVAL_POINTS: u32 = 50;

const STEP_TICKS: Scaling = Scaling::new(8.0, -0.5, 4.0);
const SHRINK_TICKS: Scaling = Scaling::new(secs(10) as f32, -(secs(1) as f32), secs(5) as f32);
const RIVALS: Scaling = Scaling::new(2.0, 1.0, 5.0);

const BEHAVIORS: [Behavior; 3] = [Behavior::Hunter, Behavior::Forager, Behavior::Brawler];
const RIVAL_STARTS: [(IVec2, Direction); 5] = [
    (IVec2::new(4, 4), Direction::Down),
    (IVec2::new(25, 4), Direction::Down),
    (IVec2::new(4, 15), Direction::Right),
    (IVec2::new(25, 15), Direction::Left),
    (IVec2::new(15, 4), Direction::Down),
];
const PLAYER_START: IVec2 = IVec2::new(ARENA / 2, ARENA - 6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnakeKind {
    Head { snake: u8 },
    Body { snake: u8 },
    Food,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnakeClass {
    Head,
    Body,
    Food,
}

impl EntityKind for SnakeKind {
    type Class = SnakeClass;

    fn class(&self) -> SnakeClass {
        match self {
            SnakeKind::Head { .. } => SnakeClass::Head,
            SnakeKind::Body { .. } => SnakeClass::Body,
            SnakeKind::Food => SnakeClass::Food,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnakeState {
    Alive,
    Gone,
}

impl EntityState for SnakeState {
    fn dead() -> Self {
        SnakeState::Gone
    }

    fn is_terminal(&self) -> bool {
        *self == SnakeState::Gone
    }
}

/// Head contact outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bite {
    Body,
    HeadOn,
    Food,
}

type SnakeEntity = GameEntity<SnakeArena>;

/// The shrinking playable square (inclusive corners)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeArea {
    pub min: IVec2,
    pub max: IVec2,
}

impl SafeArea {
    pub fn full() -> Self {
        Self {
            min: IVec2::ZERO,
            max: IVec2::splat(ARENA - 1),
        }
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.cmpge(self.min).all() && cell.cmple(self.max).all()
    }

    pub fn span(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    /// Pull every edge in by one cell; false once at the floor
    pub fn shrink(&mut self) -> bool {
        if self.span() - 2 < MIN_ARENA {
            return false;
        }
        self.min += IVec2::ONE;
        self.max -= IVec2::ONE;
        true
    }
}

#[derive(Debug, Clone)]
struct Snake {
    index: u8,
    head: EntityId,
    /// Neck first
    body: VecDeque<EntityId>,
    heading: Direction,
    grow: u32,
    /// `None` for the player
    brain: Option<GreedyScoring>,
    alive: bool,
}

#[derive(Debug, Clone)]
pub struct SnakeArena {
    cell: f32,
    difficulty: Difficulty,
    snakes: Vec<Snake>,
    area: SafeArea,
    step_timer: Countdown,
    shrink_timer: Countdown,
    /// Player turn buffered until the next step
    queued: Option<Direction>,
}

impl SnakeArena {
    pub fn new(viewport: Vec2, difficulty: Difficulty) -> Self {
        Self {
            cell: viewport.x.min(viewport.y) / ARENA as f32,
            difficulty,
            snakes: Vec::new(),
            area: SafeArea::full(),
            step_timer: Countdown::new(1),
            shrink_timer: Countdown::new(1),
            queued: None,
        }
    }

    pub fn area(&self) -> SafeArea {
        self.area
    }

    pub fn rivals_alive(&self) -> usize {
        self.snakes.iter().filter(|s| s.index != 0 && s.alive).count()
    }

    fn player_length(&self) -> usize {
        self.snakes
            .iter()
            .find(|s| s.index == 0 && s.alive)
            .map_or(0, |s| s.body.len() + 1)
    }

    fn step_ticks(&self, level: u32) -> u32 {
        (STEP_TICKS.at(level) / self.difficulty.aggression()).round().max(2.0) as u32
    }

    fn segment(&self, kind: SnakeKind, cell: IVec2, heading: Direction) -> SnakeEntity {
        Entity::new(kind, cell_center(cell, self.cell), Shape::rect(self.cell * 0.8, self.cell * 0.8), SnakeState::Alive)
            .with_cell(cell)
            .with_motion(Motion::Grid { heading })
    }

    fn spawn_snake(&mut self, ctx: &mut Ctx<'_, Self>, index: u8, head: IVec2, heading: Direction, brain: Option<GreedyScoring>) -> EntityId {
        let head_id = ctx.spawn(self.segment(SnakeKind::Head { snake: index }, head, heading));
        let mut body = VecDeque::new();
        for i in 1..START_LENGTH as i32 {
            let cell = head - heading.delta() * i;
            body.push_back(ctx.spawn(self.segment(SnakeKind::Body { snake: index }, cell, heading)));
        }
        let snake = Snake {
            index,
            head: head_id,
            body,
            heading,
            grow: 0,
            brain,
            alive: true,
        };
        match self.snakes.iter_mut().find(|s| s.index == index) {
            Some(slot) => *slot = snake,
            None => self.snakes.push(snake),
        }
        head_id
    }

    /// Cells taken by any live head or body
    fn occupied(&self, world: &World<SnakeKind, SnakeState>) -> Grid<bool> {
        let mut grid = Grid::new(ARENA, ARENA, false);
        for e in world.iter().filter(|e| e.kind.class() != SnakeClass::Food) {
            if let Some(cell) = e.cell {
                grid.set(cell, true);
            }
        }
        grid
    }

    fn spawn_food(&self, ctx: &mut Ctx<'_, Self>) {
        let occupied = self.occupied(ctx.world);
        let food: Vec<IVec2> = ctx
            .world
            .iter()
            .filter(|e| e.kind == SnakeKind::Food)
            .filter_map(|e| e.cell)
            .collect();
        for _ in 0..32 {
            let cell = IVec2::new(
                ctx.rng.random_range(self.area.min.x..=self.area.max.x),
                ctx.rng.random_range(self.area.min.y..=self.area.max.y),
            );
            if occupied.get(cell) == Some(false) && !food.contains(&cell) {
                let pellet = Entity::new(SnakeKind::Food, cell_center(cell, self.cell), Shape::rect(self.cell * 0.6, self.cell * 0.6), SnakeState::Alive)
                    .with_cell(cell);
                ctx.spawn(pellet);
                return;
            }
        }
        log::debug!("no free cell for food");
    }

    fn top_up_food(&self, ctx: &mut Ctx<'_, Self>) {
        let outside: Vec<EntityId> = ctx
            .world
            .iter()
            .filter(|e| e.kind == SnakeKind::Food && e.cell.is_some_and(|c| !self.area.contains(c)))
            .map(|e| e.id)
            .collect();
        for id in outside {
            ctx.world.kill(id);
        }
        let present = ctx.world.count_class(SnakeClass::Food);
        for _ in present..FOOD_COUNT {
            self.spawn_food(ctx);
        }
    }

    /// Remove snake `i` from play; false when the player is protected
    fn kill_snake(&mut self, ctx: &mut Ctx<'_, Self>, i: usize) -> bool {
        let Some(snake) = self.snakes.get(i) else {
            return false;
        };
        if !snake.alive {
            return false;
        }
        let head = snake.head;
        if snake.index == 0 {
            if !ctx.strike_player() {
                return false;
            }
        } else {
            destroy(self, ctx, head, Removal::Destroyed);
        }
        if let Some(snake) = self.snakes.get_mut(i) {
            snake.alive = false;
            for id in snake.body.drain(..) {
                ctx.world.kill(id);
            }
        }
        true
    }

    fn decide(&mut self, ctx: &mut Ctx<'_, Self>) -> Vec<Direction> {
        let blocked = self.occupied(ctx.world);
        let heads: Vec<Head> = self
            .snakes
            .iter()
            .filter(|s| s.alive)
            .filter_map(|s| {
                let cell = ctx.world.live(s.head)?.cell?;
                Some(Head {
                    id: s.head,
                    cell,
                    is_player: s.index == 0,
                })
            })
            .collect();
        let food: Vec<IVec2> = ctx
            .world
            .iter()
            .filter(|e| e.kind == SnakeKind::Food)
            .filter_map(|e| e.cell)
            .collect();
        let view = ArenaView {
            blocked: &blocked,
            min: self.area.min,
            max: self.area.max,
            heads: &heads,
            food: &food,
        };

        let queued = self.queued.take();
        let mut headings = Vec::with_capacity(self.snakes.len());
        for s in &self.snakes {
            let cell = heads.iter().find(|h| h.id == s.head).map(|h| h.cell);
            let heading = match (s.brain, cell) {
                (None, _) => queued.filter(|d| *d != s.heading.opposite()).unwrap_or(s.heading),
                (Some(brain), Some(cell)) => {
                    let agent = Agent::at_cell(s.head, cell, Some(s.heading));
                    match brain.decide(&agent, &view, ctx.rng) {
                        Decision::Steer(d) => d,
                        _ => s.heading,
                    }
                }
                (Some(_), None) => s.heading,
            };
            headings.push(heading);
        }
        headings
    }

    /// Move snake `i` one cell along `heading`
    fn advance(&mut self, ctx: &mut Ctx<'_, Self>, i: usize, heading: Direction) {
        let protected = !ctx.player.is_vulnerable();
        let Some(snake) = self.snakes.get_mut(i) else {
            return;
        };
        if !snake.alive {
            return;
        }
        let Some(cell) = ctx.world.live(snake.head).and_then(|e| e.cell) else {
            return;
        };
        let next = cell + heading.delta();
        if snake.index == 0 && protected && !self.area.contains(next) {
            // Freshly respawned players wait at the wall instead of dying
            return;
        }
        snake.heading = heading;

        let neck = Entity::new(
            SnakeKind::Body { snake: snake.index },
            cell_center(cell, self.cell),
            Shape::rect(self.cell * 0.8, self.cell * 0.8),
            SnakeState::Alive,
        )
        .with_cell(cell)
        .with_motion(Motion::Grid { heading });
        snake.body.push_front(ctx.spawn(neck));
        if let Some(e) = ctx.world.get_mut(snake.head) {
            e.cell = Some(next);
            e.pos = cell_center(next, self.cell);
            e.set_heading(heading);
        }
        if snake.grow > 0 {
            snake.grow -= 1;
        } else if let Some(tail) = snake.body.pop_back() {
            ctx.world.kill(tail);
        }
    }

    fn step(&mut self, ctx: &mut Ctx<'_, Self>) {
        let headings = self.decide(ctx);
        for (i, heading) in headings.into_iter().enumerate() {
            self.advance(ctx, i, heading);
        }
        self.cull_outside(ctx);
    }

    fn cull_outside(&mut self, ctx: &mut Ctx<'_, Self>) {
        let outside: Vec<usize> = self
            .snakes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .filter(|(_, s)| {
                ctx.world
                    .live(s.head)
                    .and_then(|e| e.cell)
                    .is_some_and(|c| !self.area.contains(c))
            })
            .map(|(i, _)| i)
            .collect();
        for i in outside {
            self.kill_snake(ctx, i);
        }
    }

    fn snake_with_head(&self, head: EntityId) -> Option<usize> {
        self.snakes.iter().position(|s| s.alive && s.head == head)
    }
}

impl Game for SnakeArena {
    type Kind = SnakeKind;
    type State = SnakeState;
    type Special = Bite;

    fn id(&self) -> GameId {
        GameId::SnakeArena
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: secs(2),
            invulnerable_ticks: secs(2),
            wave_clear_pause: secs(2),
            ready_pause: secs(1),
            game_over_pause: secs(3),
            spawn_point: cell_center(PLAYER_START, self.cell),
            extra_life_every: None,
        }
    }

    fn interactions(&self) -> InteractionTable<SnakeClass, Bite> {
        InteractionTable::new()
            .with(SnakeClass::Head, SnakeClass::Body, Outcome::Special(Bite::Body))
            .with(SnakeClass::Head, SnakeClass::Head, Outcome::Special(Bite::HeadOn))
            .with(SnakeClass::Head, SnakeClass::Food, Outcome::Special(Bite::Food))
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        let level = ctx.level();
        self.snakes.clear();
        self.area = SafeArea::full();
        self.queued = None;
        self.step_timer.reset(self.step_ticks(level));
        self.shrink_timer.reset(SHRINK_TICKS.ticks(level));

        let rivals = RIVALS.count(level).min(RIVAL_STARTS.len());
        for (i, (cell, heading)) in RIVAL_STARTS.iter().take(rivals).enumerate() {
            let brain = GreedyScoring::new(BEHAVIORS[i % BEHAVIORS.len()]);
            self.spawn_snake(ctx, i as u8 + 1, *cell, *heading, Some(brain));
        }
        log::debug!("{rivals} rival snakes");
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        let start = PLAYER_START.clamp(self.area.min + IVec2::splat(2), self.area.max - IVec2::splat(2));
        self.queued = None;
        let id = self.spawn_snake(ctx, 0, start, Direction::Up, None);
        self.top_up_food(ctx);
        id
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        if let Some(turn) = input.steer() {
            self.queued = Some(turn);
        }

        if self.shrink_timer.tick() {
            self.shrink_timer.reset(SHRINK_TICKS.ticks(ctx.level()));
            if self.area.shrink() {
                log::debug!("arena shrinks to {}", self.area.span());
                ctx.cue(Cue::PowerUp);
                self.cull_outside(ctx);
                self.top_up_food(ctx);
            }
        }

        if self.step_timer.tick() {
            self.step_timer.reset(self.step_ticks(ctx.level()));
            self.step(ctx);
        }
    }

    fn score_for(&self, entity: &SnakeEntity) -> u32 {
        match entity.kind {
            SnakeKind::Head { snake } if snake != 0 => RIVAL_POINTS,
            _ => 0,
        }
    }

    fn is_wave_cleared(&self, world: &World<SnakeKind, SnakeState>) -> bool {
        world.count(|e| matches!(e.kind, SnakeKind::Head { snake } if snake != 0)) == 0
    }

    fn on_special(&mut self, ctx: &mut Ctx<'_, Self>, contact: Contact<Bite>) {
        let Some(i) = self.snake_with_head(contact.actor) else {
            return;
        };
        let Outcome::Special(bite) = contact.outcome else {
            return;
        };
        match bite {
            Bite::Food => {
                if ctx.world.kill(contact.target).is_none() {
                    return;
                }
                if let Some(snake) = self.snakes.get_mut(i) {
                    snake.grow += GROWTH;
                    if snake.index == 0 {
                        ctx.award(FOOD_POINTS);
                        ctx.cue(Cue::Collect);
                    }
                }
                self.spawn_food(ctx);
            }
            Bite::Body => {
                self.kill_snake(ctx, i);
            }
            Bite::HeadOn => {
                let other = self.snake_with_head(contact.target);
                self.kill_snake(ctx, i);
                if let Some(j) = other {
                    self.kill_snake(ctx, j);
                }
            }
        }
    }

    fn on_player_down(&mut self, _ctx: &mut Ctx<'_, Self>) {
        self.queued = None;
    }

    fn hud(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("arena_min", i64::from(self.area.min.x)),
            ("arena_max", i64::from(self.area.max.x)),
            ("length", self.player_length() as i64),
            ("rivals", self.rivals_alive() as i64),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Phase, Simulation};

    const VIEW: Vec2 = Vec2::splat(600.0);

    fn sim() -> Simulation<SnakeArena> {
        let mut sim = Simulation::new(SnakeArena::new(VIEW, Difficulty::Normal), VIEW, 13, Difficulty::Normal);
        while sim.phase() != Phase::Playing {
            sim.tick(&TickInput::default());
        }
        sim
    }

    fn player_head(sim: &Simulation<SnakeArena>) -> Option<IVec2> {
        sim.player().entity.and_then(|id| sim.world().live(id)).and_then(|e| e.cell)
    }

    fn place(sim: &mut Simulation<SnakeArena>, kind: SnakeKind, cell: IVec2) {
        let (_, world, _) = sim.parts_mut();
        world.spawn(
            Entity::new(kind, cell_center(cell, 20.0), Shape::rect(16.0, 16.0), SnakeState::Alive).with_cell(cell),
            0,
        );
    }

    fn step_once(sim: &mut Simulation<SnakeArena>) {
        for _ in 0..8 {
            sim.tick(&TickInput::default());
        }
    }

    #[test]
    fn test_wave_setup() {
        let sim = sim();
        assert_eq!(sim.game().rivals_alive(), 2);
        assert_eq!(sim.world().count_class(SnakeClass::Food), FOOD_COUNT);
        let snap = sim.snapshot();
        assert_eq!(snap.hud_value("length"), Some(3));
        assert_eq!(player_head(&sim), Some(PLAYER_START));
    }

    #[test]
    fn test_player_steps_once_per_period() {
        let mut sim = sim();
        step_once(&mut sim);
        assert_eq!(player_head(&sim), Some(PLAYER_START - IVec2::Y));
        assert_eq!(sim.game().player_length(), 3);
    }

    #[test]
    fn test_food_grows_and_scores() {
        let mut sim = sim();
        place(&mut sim, SnakeKind::Food, PLAYER_START - IVec2::Y);
        step_once(&mut sim);
        assert_eq!(sim.session().score(), 10);
        // Eaten food is replaced
        assert_eq!(sim.world().count_class(SnakeClass::Food), FOOD_COUNT + 1);
        for _ in 0..3 {
            step_once(&mut sim);
        }
        assert!(sim.game().player_length() > 3);
    }

    #[test]
    fn test_biting_a_body_costs_a_life() {
        let mut sim = sim();
        place(&mut sim, SnakeKind::Body { snake: 1 }, PLAYER_START - IVec2::Y);
        step_once(&mut sim);
        assert_eq!(sim.session().lives(), 2);
        assert_eq!(sim.phase(), Phase::PlayerDown);
        assert_eq!(sim.world().count(|e| e.kind == SnakeKind::Body { snake: 0 }), 0);
    }

    #[test]
    fn test_rival_leaving_the_ring_scores() {
        let mut sim = sim();
        let rival = sim.game().snakes.iter().find(|s| s.index == 1).map(|s| s.head);
        {
            let (_, world, _) = sim.parts_mut();
            if let Some(e) = rival.and_then(|id| world.get_mut(id)) {
                e.cell = Some(IVec2::new(-3, 10));
            }
        }
        step_once(&mut sim);
        assert_eq!(sim.game().rivals_alive(), 1);
        assert_eq!(sim.session().score(), 50);
    }

    #[test]
    fn test_round_clears_when_rivals_are_gone() {
        let mut sim = sim();
        {
            let (_, world, _) = sim.parts_mut();
            let heads: Vec<EntityId> = world
                .iter()
                .filter(|e| matches!(e.kind, SnakeKind::Head { snake } if snake != 0))
                .map(|e| e.id)
                .collect();
            for id in heads {
                world.kill(id);
            }
        }
        sim.tick(&TickInput::default());
        assert!(matches!(sim.phase(), Phase::WaveClear { .. }));
    }

    #[test]
    fn test_safe_area_shrinks_to_floor() {
        let mut area = SafeArea::full();
        assert!(area.contains(IVec2::ZERO));
        assert!(area.shrink());
        assert!(!area.contains(IVec2::ZERO));
        assert_eq!(area.span(), ARENA - 2);
        while area.shrink() {}
        assert!(area.span() >= MIN_ARENA);
        assert!(area.span() - 2 < MIN_ARENA);
    }
}
