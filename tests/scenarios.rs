//! End-to-end session scenarios through the public API

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use arcade_cabinet::audio::{AudioBridge, AudioCommand, Cue};
use arcade_cabinet::consts::{LEADERBOARD_SIZE, TICK};
use arcade_cabinet::games::GameId;
use arcade_cabinet::host::{Arcade, Cabinet, HostHooks, Screen};
use arcade_cabinet::input::{Intent, TaggedIntent};
use arcade_cabinet::leaderboard::{Initials, Leaderboard};
use arcade_cabinet::persistence::{FailingStore, MemoryStore, ScoreStore};
use arcade_cabinet::settings::{Difficulty, Settings};
use arcade_cabinet::sim::engine::{Ctx, GameEntity};
use arcade_cabinet::sim::{
    Direction, Entity, EntityId, EntityKind, EntityState, Game, InteractionTable, Outcome, Phase, Shape, Simulation,
    TickInput, Tuning, World,
};

const VIEW: Vec2 = Vec2::new(200.0, 200.0);
const SPAWN: Vec2 = Vec2::new(100.0, 180.0);
const RESPAWN: u32 = 30;
const INVULNERABLE: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
enum Piece {
    Pilot,
    Raider,
    Bolt,
}

impl EntityKind for Piece {
    type Class = Piece;

    fn class(&self) -> Piece {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum Status {
    Up,
    Down,
}

impl EntityState for Status {
    fn dead() -> Self {
        Status::Down
    }

    fn is_terminal(&self) -> bool {
        *self == Status::Down
    }
}

/// Scripted by input: fire shoots every raider at once, a down press drops a
/// raider onto the pilot
#[derive(Debug, Clone)]
struct Drill {
    raiders: usize,
}

impl Game for Drill {
    type Kind = Piece;
    type State = Status;
    type Special = ();

    fn id(&self) -> GameId {
        GameId::Invaders
    }

    fn tuning(&self) -> Tuning {
        Tuning {
            lives: 3,
            respawn_delay: RESPAWN,
            invulnerable_ticks: INVULNERABLE,
            wave_clear_pause: 20,
            ready_pause: 5,
            game_over_pause: 10,
            spawn_point: SPAWN,
            extra_life_every: None,
        }
    }

    fn interactions(&self) -> InteractionTable<Piece, ()> {
        InteractionTable::new()
            .with(Piece::Bolt, Piece::Raider, Outcome::Damage { amount: 1 })
            .with(Piece::Raider, Piece::Pilot, Outcome::LifeLoss { destroy_actor: false })
    }

    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
        for i in 0..self.raiders {
            let at = Vec2::new(20.0 + i as f32 * 20.0, 20.0);
            ctx.spawn(Entity::new(Piece::Raider, at, Shape::circle(4.0), Status::Up));
        }
    }

    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
        let at = ctx.player.spawn_point;
        ctx.spawn(Entity::new(Piece::Pilot, at, Shape::circle(4.0), Status::Up))
    }

    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
        if input.pressed == Some(Direction::Down) {
            ctx.spawn(Entity::new(Piece::Raider, SPAWN, Shape::circle(4.0), Status::Up));
        }
        if input.fire {
            let targets: Vec<Vec2> = ctx.world.iter().filter(|e| e.kind == Piece::Raider).map(|e| e.pos).collect();
            for at in targets {
                ctx.spawn(Entity::new(Piece::Bolt, at, Shape::circle(1.0), Status::Up));
            }
        }
    }

    fn score_for(&self, entity: &GameEntity<Self>) -> u32 {
        match entity.kind {
            Piece::Raider => 100,
            _ => 0,
        }
    }

    fn is_wave_cleared(&self, world: &World<Piece, Status>) -> bool {
        world.count_class(Piece::Raider) == 0
    }
}

fn drill(raiders: usize) -> Simulation<Drill> {
    Simulation::new(Drill { raiders }, VIEW, 1, Difficulty::Normal)
}

fn idle() -> TickInput {
    TickInput::default()
}

fn ambush() -> TickInput {
    TickInput::pressing(Direction::Down)
}

fn volley() -> TickInput {
    TickInput::firing()
}

fn until_playing(sim: &mut Simulation<Drill>) {
    while sim.phase() != Phase::Playing {
        sim.tick(&idle());
    }
}

fn pilot_pos(sim: &Simulation<Drill>) -> Option<Vec2> {
    sim.player().entity.and_then(|id| sim.world().live(id)).map(|e| e.pos)
}

#[test]
fn struck_player_respawns_with_invulnerability() {
    let mut sim = drill(1);
    until_playing(&mut sim);
    assert_eq!(sim.session().lives(), 3);

    sim.tick(&ambush());
    assert_eq!(sim.phase(), Phase::PlayerDown);
    assert_eq!(sim.session().lives(), 2);
    assert_eq!(pilot_pos(&sim), None);

    for _ in 0..RESPAWN {
        sim.tick(&idle());
    }
    assert_eq!(sim.phase(), Phase::Playing);
    assert_eq!(pilot_pos(&sim), Some(SPAWN));
    assert!(sim.player().invulnerable > 0);
    assert!(sim.snapshot().invulnerable);

    // The raider still sits on the spawn point and another one lands
    sim.tick(&ambush());
    for _ in 0..INVULNERABLE - 5 {
        sim.tick(&idle());
    }
    assert_eq!(sim.session().lives(), 2);
    assert_eq!(sim.phase(), Phase::Playing);
}

#[test]
fn simultaneous_kills_clear_the_wave_once() {
    let mut sim = drill(4);
    until_playing(&mut sim);
    sim.tick(&volley());
    assert_eq!(sim.session().score(), 400);
    assert!(matches!(sim.phase(), Phase::WaveClear { .. }));

    for _ in 0..10 {
        sim.tick(&volley());
    }
    let clears = sim
        .drain_audio()
        .into_iter()
        .filter(|c| *c == AudioCommand::Play(Cue::WaveClear))
        .count();
    assert_eq!(clears, 1);
    assert_eq!(sim.session().score(), 400);

    while !matches!(sim.phase(), Phase::Ready { .. }) {
        sim.tick(&idle());
    }
    assert_eq!(sim.session().wave, 1);
    assert_eq!(sim.world().count_class(Piece::Raider), 4);
}

#[test]
fn full_leaderboard_evicts_lowest() {
    let initials = |s: &str| Initials::new(s).unwrap();
    let mut board = Leaderboard::new();
    for i in 0..LEADERBOARD_SIZE as u64 {
        board.insert(initials("OLD"), 500 + i * 10);
    }
    let lowest = board.entries().last().map(|e| e.score).unwrap();
    assert_eq!(lowest, 500);

    assert_eq!(board.insert(initials("NEW"), lowest + 1), Some(LEADERBOARD_SIZE));
    assert_eq!(board.len(), LEADERBOARD_SIZE);
    assert!(board.entries().iter().all(|e| e.score != lowest));
    assert!(board.entries().windows(2).all(|w| w[0].score >= w[1].score));

    let store = MemoryStore::new();
    let mut writer = store.clone();
    board.save(&mut writer, "invaders_scores").unwrap();
    assert_eq!(Leaderboard::load(&store, "invaders_scores"), board);
}

struct Harness {
    cabinet: Cabinet<Drill>,
    seq: u64,
}

impl Harness {
    fn new(store: Box<dyn ScoreStore>, hooks: HostHooks) -> Self {
        let settings = Settings {
            seed: Some(5),
            ..Settings::default()
        };
        let cabinet = Cabinet::new(Drill { raiders: 2 }, VIEW, &settings, hooks, store, AudioBridge::silent());
        Self { cabinet, seq: 0 }
    }

    fn tap(&mut self, intent: Intent) {
        self.seq += 1;
        self.cabinet.push(TaggedIntent::pressed(self.seq, intent));
        self.seq += 1;
        self.cabinet.push(TaggedIntent::released(self.seq, intent));
        self.cabinet.frame(TICK);
    }

    fn wait(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.cabinet.frame(TICK);
        }
    }

    /// Score 200 with one volley, then lose every life
    fn play_to_game_over(&mut self) {
        self.wait(5);
        self.tap(Intent::Fire);
        for _ in 0..200 {
            if self.cabinet.screen() != Screen::Playing {
                return;
            }
            self.tap(Intent::Down);
            self.wait(RESPAWN + INVULNERABLE);
        }
    }
}

#[test]
fn failing_store_still_completes_entry() {
    let tops = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&tops);
    let hooks = HostHooks {
        on_top_score: Box::new(move |id, score, initials| seen.borrow_mut().push((id, score, initials))),
        ..HostHooks::none()
    };
    let mut harness = Harness::new(Box::new(FailingStore::new()), hooks);
    harness.play_to_game_over();
    assert_eq!(harness.cabinet.screen(), Screen::EnteringInitials { rank: 1 });
    assert_eq!(harness.cabinet.hud().score, 200);

    harness.tap(Intent::Fire);
    harness.tap(Intent::Fire);
    harness.tap(Intent::Fire);

    assert_eq!(harness.cabinet.screen(), Screen::Results { rank: Some(1), saved: false });
    let board = harness.cabinet.leaderboard();
    assert_eq!(board.len(), 1);
    assert_eq!(board.top_score(), Some(200));
    let aaa = Initials::default();
    assert_eq!(*tops.borrow(), vec![(GameId::Invaders, 200, aaa)]);
}

#[test]
fn results_then_new_session_then_close() {
    let closed = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&closed);
    let hooks = HostHooks {
        on_close: Box::new(move || *flag.borrow_mut() = true),
        ..HostHooks::none()
    };
    let store = MemoryStore::new();
    let mut harness = Harness::new(Box::new(store.clone()), hooks);
    harness.play_to_game_over();
    for _ in 0..3 {
        harness.tap(Intent::Fire);
    }
    assert_eq!(harness.cabinet.screen(), Screen::Results { rank: Some(1), saved: true });
    assert!(store.get(&GameId::Invaders.storage_key()).is_some());

    harness.tap(Intent::Fire);
    assert_eq!(harness.cabinet.screen(), Screen::Playing);
    assert_eq!(harness.cabinet.hud().score, 0);
    assert_eq!(harness.cabinet.hud().lives, 3);

    harness.tap(Intent::Cancel);
    assert!(harness.cabinet.is_closed());
    assert!(*closed.borrow());
}
