//! Maze chase: clear the pellets while four ghosts hunt you down

use glam::{IVec2, Vec2};
use serde::Serialize;

use super::{GameId, cell_center};
use crate::ai::{Agent, ChaseView, Decision, GhostMode, Strategy, TargetRule, TargetedPursuit, Walkable};
use crate::audio::{Cue, LoopCue};
use crate::consts::secs;
use crate::settings::Difficulty;
use crate::sim::engine::{Ctx, GameEntity, Removal};
use crate::sim::{
    Countdown, Direction, Entity, EntityId, EntityKind, EntityState, Game, Grid, InteractionTable, Motion, Outcome,
    Scaling, Shape, TickInput, Tuning, World,
};

const LAYOUT: [&str; 21] = [
    "###################",
    "#o.......#.......o#",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "#....#...#...#....#",
    "####.###.#.###.####",
    "####.#.......#.####",
    "####.#.##-##.#.####",
    "T   . .#HHH#. .   T",
    "####.#.#####.#.####",
    "####.#.......#.####",
    "####.#.#####.#.####",
    "#........#........#",
    "#.##.###.#.###.##.#",
    "#o.#.....P.....#.o#",
    "##.#.#.#####.#.#.##",
    "#....#...#...#....#",
    "#.######.#.######.#",
    "#.................#",
    "###################",
];

/// Tile just above the house door
const EXIT: IVec2 = IVec2::new(9, 7);
const HOUSE: IVec2 = IVec2::new(9, 9);
const HOUSE_SLOTS: [IVec2; 4] = [EXIT, IVec2::new(8, 9), IVec2::new(9, 9), IVec2::new(10, 9)];
const TUNNEL_ROW: i32 = 9;

/// Ghost release delays at level 0 (ticks)
const RELEASE: [u32; 4] = [0, secs(2), secs(5), secs(8)];
const RELEASE_SCALE: Scaling = Scaling::new(1.0, -0.1, 0.3);
const FRIGHT_TICKS: Scaling = Scaling::new(secs(6) as f32, -30.0, 60.0);

/// Cells per tick
const PLAYER_SPEED: Scaling = Scaling::new(0.13, 0.004, 0.16);
const GHOST_SPEED: Scaling = Scaling::new(0.12, 0.005, 0.16);
const FRIGHTENED_SPEED: f32 = 0.065;
const EATEN_SPEED: f32 = 0.25;
const HOUSE_SPEED: f32 = 0.08;

const PELLET_POINTS: u32 = 10;
const POWER_POINTS: u32 = 50;
const GHOST_POINTS: u32 = 200;

/// Scatter/chase alternation; chase continues forever after the last entry
const SCHEDULE: [(GhostMode, u32); 7] = [
    (GhostMode::Scatter, secs(7)),
    (GhostMode::Chase, secs(20)),
    (GhostMode::Scatter, secs(7)),
    (GhostMode::Chase, secs(20)),
    (GhostMode::Scatter, secs(5)),
    (GhostMode::Chase, secs(20)),
    (GhostMode::Scatter, secs(5)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Wall,
    Open,
    Door,
    House,
}

/// Static maze topology
#[derive(Debug, Clone)]
pub struct MazeLayout {
    tiles: Grid<Tile>,
    pellets: Vec<IVec2>,
    powers: Vec<IVec2>,
    player_start: IVec2,
}

impl MazeLayout {
    /// `#` wall, `.` pellet, `o` power pellet, `-` door, `H` house, `P` start,
    /// anything else open floor
    pub fn parse(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as i32;
        let mut layout = Self {
            tiles: Grid::new(width, height, Tile::Wall),
            pellets: Vec::new(),
            powers: Vec::new(),
            player_start: IVec2::ZERO,
        };
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let cell = IVec2::new(x as i32, y as i32);
                let tile = match ch {
                    '#' => Tile::Wall,
                    '-' => Tile::Door,
                    'H' => Tile::House,
                    _ => Tile::Open,
                };
                match ch {
                    '.' => layout.pellets.push(cell),
                    'o' => layout.powers.push(cell),
                    'P' => layout.player_start = cell,
                    _ => {}
                }
                layout.tiles.set(cell, tile);
            }
        }
        layout
    }

    pub fn tile(&self, cell: IVec2) -> Tile {
        self.tiles.get(cell).unwrap_or(Tile::Wall)
    }

    pub fn width(&self) -> i32 {
        self.tiles.width()
    }

    pub fn height(&self) -> i32 {
        self.tiles.height()
    }

    pub fn player_start(&self) -> IVec2 {
        self.player_start
    }

    fn in_tunnel(&self, cell: IVec2) -> bool {
        cell.y == TUNNEL_ROW && (cell.x < 4 || cell.x >= self.width() - 4)
    }
}

impl Walkable for MazeLayout {
    fn step(&self, cell: IVec2, dir: Direction) -> Option<IVec2> {
        let next = self.tiles.wrap_x(cell + dir.delta());
        (self.tile(next) == Tile::Open).then_some(next)
    }
}

/// Scatter/chase timer, paused while ghosts are frightened
#[derive(Debug, Clone)]
struct ModeSchedule {
    step: usize,
    timer: Countdown,
}

impl ModeSchedule {
    fn new() -> Self {
        Self {
            step: 0,
            timer: Countdown::new(SCHEDULE[0].1),
        }
    }

    fn mode(&self) -> GhostMode {
        SCHEDULE.get(self.step).map_or(GhostMode::Chase, |(mode, _)| *mode)
    }

    /// Advance one tick; returns the new mode on a switch
    fn tick(&mut self) -> Option<GhostMode> {
        if self.step >= SCHEDULE.len() || !self.timer.tick() {
            return None;
        }
        self.step += 1;
        if let Some((_, ticks)) = SCHEDULE.get(self.step) {
            self.timer.reset(*ticks);
        }
        Some(self.mode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MazeKind {
    Player,
    Pellet,
    Power,
    Ghost { index: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MazeClass {
    Player,
    Pellet,
    Ghost,
}

impl EntityKind for MazeKind {
    type Class = MazeClass;

    fn class(&self) -> MazeClass {
        match self {
            MazeKind::Player => MazeClass::Player,
            MazeKind::Pellet | MazeKind::Power => MazeClass::Pellet,
            MazeKind::Ghost { .. } => MazeClass::Ghost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MazeState {
    Normal,
    /// Waiting for its release timer
    InHouse,
    /// Gliding out through the door
    Leaving,
    Frightened,
    /// Eyes heading for the door
    Eaten,
    /// Eyes gliding back into the house
    Returning,
    Gone,
}

impl EntityState for MazeState {
    fn dead() -> Self {
        MazeState::Gone
    }

    fn is_terminal(&self) -> bool {
        *self == MazeState::Gone
    }
}

type MazeEntity = GameEntity<MazeChase>;

fn at_center(e: &MazeEntity, size: f32) -> bool {
    e.cell.is_some_and(|c| e.pos.distance_squared(cell_center(c, size)) < 1e-4)
}

/// Move toward the next cell along the current heading; true on arrival
fn glide(e: &mut MazeEntity, layout: &MazeLayout, speed: f32, size: f32) -> bool {
    let (Some(cell), Some(heading)) = (e.cell, e.heading()) else {
        return false;
    };
    let Some(next) = layout.step(cell, heading) else {
        e.pos = cell_center(cell, size);
        return false;
    };
    // Unwrapped goal so tunnel exits slide off the edge before reappearing
    let goal = cell_center(cell + heading.delta(), size);
    let to = goal - e.pos;
    if to.length() <= speed {
        e.pos = cell_center(next, size);
        e.cell = Some(next);
        true
    } else {
        e.pos += to.normalize_or_zero() * speed;
        false
    }
}

/// Turn around on the spot, even between cells
fn reverse(e: &mut MazeEntity, layout: &MazeLayout, size: f32) {
    let (Some(cell), Some(heading)) = (e.cell, e.heading()) else {
        return;
    };
    if !at_center(e, size) {
        match layout.step(cell, heading) {
            // Never flip across a tunnel seam
            Some(next) if next == cell + heading.delta() => e.cell = Some(next),
            _ => return,
        }
    }
    e.set_heading(heading.opposite());
}

/// Glide straight at `goal` ignoring walls (house traffic); true on arrival
fn glide_direct(e: &mut MazeEntity, goal: Vec2, speed: f32) -> bool {
    let to = goal - e.pos;
    if to.length() <= speed {
        e.pos = goal;
        true
    } else {
        e.pos += to.normalize_or_zero() * speed;
        false
    }
}

#[derive(Debug, Clone)]
pub struct MazeChase {
    cell: f32,
    layout: MazeLayout,
    difficulty: Difficulty,
    personalities: [TargetedPursuit; 4],
    schedule: ModeSchedule,
    frightened: Countdown,
    /// Ghosts eaten during the current fright
    chain: u32,
    pellets_left: usize,
}

impl MazeChase {
    pub fn new(viewport: Vec2, difficulty: Difficulty) -> Self {
        let layout = MazeLayout::parse(&LAYOUT);
        let cell = (viewport.x / layout.width() as f32).min(viewport.y / layout.height() as f32);
        let (w, h) = (layout.width(), layout.height());
        Self {
            cell,
            personalities: [
                TargetedPursuit::new(TargetRule::Direct, IVec2::new(w - 1, -2)),
                TargetedPursuit::new(TargetRule::Ambush { ahead: 4 }, IVec2::new(0, -2)),
                TargetedPursuit::new(TargetRule::Flank { ahead: 2 }, IVec2::new(w - 1, h + 1)),
                TargetedPursuit::new(TargetRule::Shy { radius: 8 }, IVec2::new(0, h + 1)),
            ],
            layout,
            difficulty,
            schedule: ModeSchedule::new(),
            frightened: Countdown::new(0),
            chain: 0,
            pellets_left: 0,
        }
    }

    pub fn layout(&self) -> &MazeLayout {
        &self.layout
    }

    /// Scatter or chase (frightened ghosts ignore it)
    pub fn mode(&self) -> GhostMode {
        self.schedule.mode()
    }

    pub fn is_frightened(&self) -> bool {
        !self.frightened.is_done()
    }

    fn ghost(&self, index: u8, level: u32) -> MazeEntity {
        let slot = HOUSE_SLOTS[usize::from(index) % HOUSE_SLOTS.len()];
        let delay = RELEASE[usize::from(index) % RELEASE.len()] as f32 * RELEASE_SCALE.at(level);
        let state = if slot == EXIT { MazeState::Normal } else { MazeState::InHouse };
        Entity::new(
            MazeKind::Ghost { index },
            cell_center(slot, self.cell),
            Shape::circle(self.cell * 0.4),
            state,
        )
        .with_cell(slot)
        .with_motion(Motion::Grid {
            heading: Direction::Left,
        })
        .with_timer(delay as u32)
    }

    fn reset_ghosts(&self, world: &mut World<MazeKind, MazeState>, level: u32) {
        for e in world.iter_mut() {
            if let MazeKind::Ghost { index } = e.kind {
                let fresh = self.ghost(index, level);
                e.pos = fresh.pos;
                e.cell = fresh.cell;
                e.motion = fresh.motion;
                e.state = fresh.state;
                e.timer = fresh.timer;
            }
        }
    }

    fn frighten(&mut self, ctx: &mut Ctx<'_, Self>) {
        let ticks = FRIGHT_TICKS.ticks(ctx.level());
        self.frightened.reset(ticks);
        self.chain = 0;
        for e in ctx.world.iter_mut() {
            if matches!(e.kind, MazeKind::Ghost { .. }) && e.state == MazeState::Normal {
                e.state = MazeState::Frightened;
                reverse(e, &self.layout, self.cell);
            }
        }
        ctx.cue(Cue::PowerUp);
        ctx.start_loop(LoopCue::Hum);
        log::debug!("ghosts frightened for {ticks} ticks");
    }

    fn end_fright(&mut self, ctx: &mut Ctx<'_, Self>) {
        for e in ctx.world.iter_mut() {
            if e.state == MazeState::Frightened {
                e.state = MazeState::Normal;
            }
        }
        ctx.stop_loop(LoopCue::Hum);
    }

    fn steer_player(&self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        let speed = PLAYER_SPEED.at(ctx.level()) * self.cell;
        let Some(e) = ctx.player.entity.and_then(|id| ctx.world.get_mut(id)) else {
            return;
        };
        if e.is_excluded() {
            return;
        }
        let (Some(cell), Some(heading)) = (e.cell, e.heading()) else {
            return;
        };
        if let Some(want) = input.steer() {
            if at_center(e, self.cell) {
                if self.layout.step(cell, want).is_some() {
                    e.set_heading(want);
                }
            } else if want == heading.opposite() {
                reverse(e, &self.layout, self.cell);
            }
        }
        glide(e, &self.layout, speed, self.cell);
    }

    fn ghost_speed(&self, state: MazeState, cell: IVec2, level: u32) -> f32 {
        let cells = match state {
            MazeState::Frightened => FRIGHTENED_SPEED,
            MazeState::Eaten => EATEN_SPEED,
            MazeState::Leaving | MazeState::Returning | MazeState::InHouse => HOUSE_SPEED,
            _ if self.layout.in_tunnel(cell) => GHOST_SPEED.at(level) * 0.5,
            _ => (GHOST_SPEED.at(level) * self.difficulty.aggression()).min(EATEN_SPEED),
        };
        cells * self.cell
    }

    fn move_ghosts(&mut self, ctx: &mut Ctx<'_, Self>) {
        let Some((player, player_heading)) = ctx
            .player_entity()
            .map(|e| (e.cell.unwrap_or(self.layout.player_start), e.heading().unwrap_or(Direction::Left)))
        else {
            return;
        };
        let partner = ctx
            .world
            .iter()
            .find(|e| e.kind == MazeKind::Ghost { index: 0 })
            .and_then(|e| e.cell);
        let ghosts: Vec<EntityId> = ctx
            .world
            .iter()
            .filter(|e| e.kind.class() == MazeClass::Ghost)
            .map(|e| e.id)
            .collect();
        let global = self.schedule.mode();
        let level = ctx.level();

        for id in ghosts {
            let Some(ghost) = ctx.world.live(id).cloned() else {
                continue;
            };
            let MazeKind::Ghost { index } = ghost.kind else {
                continue;
            };
            let cell = ghost.cell.unwrap_or(EXIT);
            let speed = self.ghost_speed(ghost.state, cell, level);

            let decision = match ghost.state {
                MazeState::Normal | MazeState::Frightened | MazeState::Eaten if at_center(&ghost, self.cell) => {
                    if ghost.state == MazeState::Eaten && cell == EXIT {
                        if let Some(e) = ctx.world.get_mut(id) {
                            e.state = MazeState::Returning;
                        }
                        continue;
                    }
                    let mode = match ghost.state {
                        MazeState::Frightened => GhostMode::Frightened,
                        MazeState::Eaten => GhostMode::Eaten,
                        _ => global,
                    };
                    let view = ChaseView {
                        maze: &self.layout,
                        mode,
                        player,
                        player_heading,
                        partner,
                        home: EXIT,
                    };
                    let agent = Agent {
                        id,
                        pos: ghost.pos,
                        cell,
                        heading: ghost.heading(),
                    };
                    self.personalities[usize::from(index) % 4].decide(&agent, &view, ctx.rng)
                }
                _ => Decision::Hold,
            };

            let Some(e) = ctx.world.get_mut(id) else {
                continue;
            };
            match e.state {
                MazeState::InHouse => {
                    e.timer = e.timer.saturating_sub(1);
                    if e.timer == 0 {
                        e.state = MazeState::Leaving;
                    }
                }
                MazeState::Leaving => {
                    // Fright only catches ghosts already outside; recycled eyes rejoin the schedule
                    if glide_direct(e, cell_center(EXIT, self.cell), speed) {
                        e.state = MazeState::Normal;
                        e.cell = Some(EXIT);
                        e.set_heading(Direction::Left);
                    }
                }
                MazeState::Returning => {
                    if glide_direct(e, cell_center(HOUSE, self.cell), speed) {
                        e.cell = Some(HOUSE);
                        e.state = MazeState::Leaving;
                    }
                }
                MazeState::Normal | MazeState::Frightened | MazeState::Eaten => {
                    if let Decision::Steer(dir) = decision {
                        e.set_heading(dir);
                    }
                    glide(e, &self.layout, speed, self.cell);
                }
                MazeState::Gone => {}
            }
        }
    }
}

impl Game for MazeChase {
    type Kind = MazeKind;
    type State = MazeState;
    type Special = ();

    fn id(&self) -> GameId {
        GameId::MazeChase
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: secs(2),
            invulnerable_ticks: secs(1),
            wave_clear_pause: secs(3),
            ready_pause: secs(2),
            game_over_pause: secs(3),
            spawn_point: cell_center(self.layout.player_start, self.cell),
            extra_life_every: Some(10_000),
        }
    }

    fn interactions(&self) -> InteractionTable<MazeClass, ()> {
        InteractionTable::new()
            .with(MazeClass::Player, MazeClass::Pellet, Outcome::Consume)
            .with(MazeClass::Ghost, MazeClass::Player, Outcome::Special(()))
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        self.schedule = ModeSchedule::new();
        self.frightened.reset(0);
        self.chain = 0;
        ctx.stop_loop(LoopCue::Hum);

        for &cell in &self.layout.pellets {
            ctx.spawn(Entity::new(MazeKind::Pellet, cell_center(cell, self.cell), Shape::circle(self.cell * 0.1), MazeState::Normal).with_cell(cell));
        }
        for &cell in &self.layout.powers {
            ctx.spawn(Entity::new(MazeKind::Power, cell_center(cell, self.cell), Shape::circle(self.cell * 0.25), MazeState::Normal).with_cell(cell));
        }
        self.pellets_left = self.layout.pellets.len() + self.layout.powers.len();

        let level = ctx.level();
        for index in 0..4 {
            ctx.spawn(self.ghost(index, level));
        }
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        let level = ctx.level();
        self.reset_ghosts(ctx.world, level);
        if self.is_frightened() {
            self.frightened.reset(0);
            ctx.stop_loop(LoopCue::Hum);
        }
        ctx.start_loop(LoopCue::Siren);

        let start = self.layout.player_start;
        let player = Entity::new(MazeKind::Player, cell_center(start, self.cell), Shape::circle(self.cell * 0.4), MazeState::Normal)
            .with_cell(start)
            .with_motion(Motion::Grid {
                heading: Direction::Left,
            });
        ctx.spawn(player)
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        self.steer_player(ctx, input);

        if self.is_frightened() {
            if self.frightened.tick() {
                self.end_fright(ctx);
            }
        } else if let Some(mode) = self.schedule.tick() {
            log::debug!("ghost mode now {mode:?}");
            for e in ctx.world.iter_mut() {
                if e.state == MazeState::Normal && e.kind.class() == MazeClass::Ghost {
                    reverse(e, &self.layout, self.cell);
                }
            }
        }

        self.move_ghosts(ctx);
    }

    fn score_for(&self, entity: &MazeEntity) -> u32 {
        match entity.kind {
            MazeKind::Pellet => PELLET_POINTS,
            MazeKind::Power => POWER_POINTS,
            _ => 0,
        }
    }

    fn is_wave_cleared(&self, world: &World<MazeKind, MazeState>) -> bool {
        world.count_class(MazeClass::Pellet) == 0
    }

    fn on_removed(&mut self, ctx: &mut Ctx<'_, Self>, entity: &MazeEntity, _removal: Removal) {
        if entity.kind.class() != MazeClass::Pellet {
            return;
        }
        self.pellets_left = self.pellets_left.saturating_sub(1);
        if entity.kind == MazeKind::Power {
            self.frighten(ctx);
        }
        if self.pellets_left == 0 {
            ctx.stop_loop(LoopCue::Siren);
            ctx.stop_loop(LoopCue::Hum);
        }
    }

    fn on_special(&mut self, ctx: &mut Ctx<'_, Self>, contact: crate::sim::Contact<()>) {
        let Some(state) = ctx.world.live(contact.actor).map(|e| e.state) else {
            return;
        };
        match state {
            MazeState::Frightened => {
                let points = GHOST_POINTS << self.chain.min(3);
                self.chain += 1;
                if let Some(e) = ctx.world.get_mut(contact.actor) {
                    e.state = MazeState::Eaten;
                }
                ctx.award(points);
                ctx.cue(Cue::Collect);
                log::debug!("ghost eaten for {points}");
            }
            MazeState::Normal => {
                ctx.strike_player();
            }
            _ => {}
        }
    }

    fn on_player_down(&mut self, ctx: &mut Ctx<'_, Self>) {
        ctx.stop_loop(LoopCue::Siren);
        ctx.stop_loop(LoopCue::Hum);
    }

    fn hud(&self) -> Vec<(&'static str, i64)> {
        vec![
            ("pellets", self.pellets_left as i64),
            ("frightened", i64::from(self.frightened.remaining())),
            ("chase", i64::from(self.schedule.mode() == GhostMode::Chase)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Phase, Simulation};

    const VIEW: Vec2 = Vec2::new(380.0, 420.0);

    fn sim() -> Simulation<MazeChase> {
        let mut sim = Simulation::new(MazeChase::new(VIEW, Difficulty::Normal), VIEW, 9, Difficulty::Normal);
        while sim.phase() != Phase::Playing {
            sim.tick(&TickInput::default());
        }
        sim
    }

    fn ghost_ids(sim: &Simulation<MazeChase>) -> Vec<EntityId> {
        sim.world().iter().filter(|e| e.kind.class() == MazeClass::Ghost).map(|e| e.id).collect()
    }

    /// Put `id` on top of the player
    fn park_on_player(sim: &mut Simulation<MazeChase>, id: EntityId) {
        let (_, world, player) = sim.parts_mut();
        let Some(at) = player.entity.and_then(|p| world.get(p)).map(|e| e.pos) else {
            return;
        };
        if let Some(e) = world.get_mut(id) {
            e.pos = at;
        }
    }

    #[test]
    fn test_layout_parses() {
        let layout = MazeLayout::parse(&LAYOUT);
        assert_eq!((layout.width(), layout.height()), (19, 21));
        assert_eq!(layout.pellets.len(), 170);
        assert_eq!(layout.powers.len(), 4);
        assert_eq!(layout.player_start(), IVec2::new(9, 15));
        assert_eq!(layout.tile(IVec2::new(9, 8)), Tile::Door);
        assert_eq!(layout.tile(EXIT), Tile::Open);
        // Tunnel wraps, doors never open for walkers
        assert_eq!(layout.step(IVec2::new(0, TUNNEL_ROW), Direction::Left), Some(IVec2::new(18, TUNNEL_ROW)));
        assert_eq!(layout.step(EXIT, Direction::Down), None);
    }

    #[test]
    fn test_schedule_alternates_then_chases() {
        let mut schedule = ModeSchedule::new();
        assert_eq!(schedule.mode(), GhostMode::Scatter);
        let mut switches = Vec::new();
        for _ in 0..secs(200) {
            if let Some(mode) = schedule.tick() {
                switches.push(mode);
            }
        }
        assert_eq!(switches.len(), SCHEDULE.len());
        assert_eq!(switches[0], GhostMode::Chase);
        assert_eq!(schedule.mode(), GhostMode::Chase);
    }

    #[test]
    fn test_eating_pellets_scores() {
        let mut sim = sim();
        let left = TickInput::pressing(Direction::Left);
        sim.tick(&left);
        for _ in 0..20 {
            sim.tick(&TickInput::default());
        }
        assert!(sim.session().score() >= 10);
        assert_eq!(sim.session().score() % 10, 0);
        assert!(sim.game().pellets_left < 174);
    }

    /// Drop the player onto a power pellet and eat it
    fn eat_power(sim: &mut Simulation<MazeChase>) {
        let power = sim.world().iter().find(|e| e.kind == MazeKind::Power).map(|e| e.id);
        {
            let (_, world, player) = sim.parts_mut();
            let at = power.and_then(|id| world.get(id)).map(|e| e.pos);
            if let (Some(at), Some(p)) = (at, player.entity.and_then(|id| world.get_mut(id))) {
                p.pos = at;
            }
        }
        sim.tick(&TickInput::default());
    }

    #[test]
    fn test_power_pellet_frightens_and_chains() {
        let mut sim = sim();
        eat_power(&mut sim);
        assert_eq!(sim.session().score(), 50);
        assert!(sim.game().is_frightened());
        let frightened: Vec<EntityId> = sim
            .world()
            .iter()
            .filter(|e| e.state == MazeState::Frightened)
            .map(|e| e.id)
            .collect();
        // Only the ghost already outside the house gets frightened
        assert_eq!(frightened.len(), 1);

        park_on_player(&mut sim, frightened[0]);
        sim.tick(&TickInput::default());
        assert_eq!(sim.session().score(), 250);
        assert_eq!(sim.world().get(frightened[0]).map(|e| e.state), Some(MazeState::Eaten));
        assert_eq!(sim.session().lives(), 3);
    }

    #[test]
    fn test_eaten_ghost_leaves_house_unfrightened() {
        let mut sim = sim();
        {
            let (_, _, player) = sim.parts_mut();
            player.invulnerable = secs(30);
        }
        eat_power(&mut sim);
        let Some(ghost) = sim.world().iter().find(|e| e.state == MazeState::Frightened).map(|e| e.id) else {
            panic!("no frightened ghost");
        };
        park_on_player(&mut sim, ghost);
        sim.tick(&TickInput::default());
        assert_eq!(sim.world().get(ghost).map(|e| e.state), Some(MazeState::Eaten));

        let mut seen = Vec::new();
        for _ in 0..secs(5) {
            sim.tick(&TickInput::default());
            let state = sim.world().get(ghost).map(|e| e.state);
            if seen.last() != Some(&state) {
                seen.push(state);
            }
            if matches!(state, Some(MazeState::Normal | MazeState::Frightened)) {
                break;
            }
        }
        assert!(seen.contains(&Some(MazeState::Returning)));
        assert!(seen.contains(&Some(MazeState::Leaving)));
        assert!(sim.game().is_frightened());
        assert_eq!(sim.world().get(ghost).map(|e| e.state), Some(MazeState::Normal));
        assert_eq!(sim.world().get(ghost).and_then(|e| e.cell), Some(EXIT));
    }

    #[test]
    fn test_normal_ghost_costs_a_life_and_resets() {
        let mut sim = sim();
        let ghosts = ghost_ids(&sim);
        park_on_player(&mut sim, ghosts[0]);
        sim.tick(&TickInput::default());
        assert_eq!(sim.session().lives(), 2);
        assert_eq!(sim.phase(), Phase::PlayerDown);

        while sim.phase() == Phase::PlayerDown {
            sim.tick(&TickInput::default());
        }
        let ghost = sim.world().get(ghosts[0]).map(|e| e.cell);
        assert_eq!(ghost, Some(Some(EXIT)));
    }

    #[test]
    fn test_clearing_pellets_clears_wave() {
        let mut sim = sim();
        {
            let (_, world, _) = sim.parts_mut();
            let pellets: Vec<EntityId> = world
                .iter()
                .filter(|e| e.kind.class() == MazeClass::Pellet)
                .map(|e| e.id)
                .collect();
            for id in pellets {
                world.kill(id);
            }
        }
        sim.tick(&TickInput::default());
        assert!(matches!(sim.phase(), Phase::WaveClear { .. }));
    }

    #[test]
    fn test_ghosts_leave_the_house() {
        let mut sim = sim();
        for _ in 0..secs(4) {
            sim.tick(&TickInput::default());
            if sim.phase() != Phase::Playing {
                return;
            }
        }
        let outside = sim
            .world()
            .iter()
            .filter(|e| e.kind.class() == MazeClass::Ghost && e.state != MazeState::InHouse)
            .count();
        assert!(outside >= 2);
    }
}
