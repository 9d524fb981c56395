//! The generic fixed-tick engine
//!
//! `Simulation<G>` owns the world, the session and the RNG; the per-game
//! strategy `G: Game` supplies the entity catalog, interaction table, wave
//! setup, per-tick behaviour and scoring. One call to `tick` runs exactly one
//! update pass, one collision pass and one progression check.

use std::fmt::Debug;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{Contact, InteractionTable, Outcome, collision_pass};
use super::entity::{Entity, EntityId, EntityKind, EntityState, World};
use super::fsm::fire;
use super::grid::Direction;
use super::progression::{Phase, PhaseEvent, PlayerSlot, PlayerStatus, ScoreSession};
use super::snapshot::{EntityView, Snapshot};
use crate::audio::{AudioCommand, Cue, LoopCue};
use crate::games::GameId;
use crate::settings::Difficulty;

/// Intents for a single tick (already deduplicated by the input queue)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    held: u8,
    /// Most recent direction pressed since the previous tick
    pub pressed: Option<Direction>,
    /// Fire/confirm pressed since the previous tick
    pub fire: bool,
    /// Fire/confirm currently held
    pub fire_held: bool,
}

impl TickInput {
    /// A single fresh press of `direction`
    pub fn pressing(direction: Direction) -> Self {
        let mut input = Self::default();
        input.hold(direction, true);
        input.pressed = Some(direction);
        input
    }

    /// A single fresh press of fire
    pub fn firing() -> Self {
        Self {
            held: 0,
            pressed: None,
            fire: true,
            fire_held: true,
        }
    }

    fn bit(direction: Direction) -> u8 {
        match direction {
            Direction::Up => 1,
            Direction::Left => 2,
            Direction::Down => 4,
            Direction::Right => 8,
        }
    }

    pub fn hold(&mut self, direction: Direction, held: bool) {
        if held {
            self.held |= Self::bit(direction);
        } else {
            self.held &= !Self::bit(direction);
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held & Self::bit(direction) != 0
    }

    /// -1 (left), 0 or 1 (right)
    pub fn axis_x(&self) -> f32 {
        let left = self.is_held(Direction::Left) as i8;
        let right = self.is_held(Direction::Right) as i8;
        f32::from(right - left)
    }

    /// Requested heading: a fresh press wins over a held direction
    pub fn steer(&self) -> Option<Direction> {
        self.pressed
            .or_else(|| Direction::ALL.into_iter().find(|d| self.is_held(*d)))
    }

    /// Drop the one-shot parts after the first substep of a frame
    pub fn clear_momentary(&mut self) {
        self.pressed = None;
        self.fire = false;
    }
}

/// Per-game life-cycle configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    pub lives: u8,
    pub respawn_delay: u32,
    pub invulnerable_ticks: u32,
    pub wave_clear_pause: u32,
    pub ready_pause: u32,
    pub game_over_pause: u32,
    pub spawn_point: Vec2,
    pub extra_life_every: Option<u64>,
}

/// Why an entity left play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Destroyed,
    Consumed,
    Split,
    Expired,
}

/// Mutable view of the engine handed to game code for one tick
pub struct TickCtx<'a, K, S> {
    pub world: &'a mut World<K, S>,
    pub session: &'a mut ScoreSession,
    pub player: &'a mut PlayerSlot,
    pub rng: &'a mut Pcg32,
    pub tuning: &'a Tuning,
    audio: &'a mut Vec<AudioCommand>,
    pub tick: u64,
    level_offset: u32,
}

impl<K: EntityKind, S: EntityState> TickCtx<'_, K, S> {
    /// Wave index adjusted by the difficulty preset; drives all scaling
    pub fn level(&self) -> u32 {
        self.session.wave + self.level_offset
    }

    pub fn award(&mut self, points: u32) {
        if points > 0 {
            self.session.award(points);
        }
    }

    pub fn cue(&mut self, cue: Cue) {
        self.audio.push(AudioCommand::Play(cue));
    }

    pub fn start_loop(&mut self, cue: LoopCue) {
        self.audio.push(AudioCommand::StartLoop(cue));
    }

    pub fn stop_loop(&mut self, cue: LoopCue) {
        self.audio.push(AudioCommand::StopLoop(cue));
    }

    pub fn player_entity(&self) -> Option<&Entity<K, S>> {
        self.player.entity.and_then(|id| self.world.live(id))
    }

    pub fn player_pos(&self) -> Option<Vec2> {
        self.player_entity().map(|e| e.pos)
    }

    pub fn spawn(&mut self, entity: Entity<K, S>) -> EntityId {
        self.world.spawn(entity, self.tick)
    }

    /// Take a life from the player. Ignored while invulnerable or not in play.
    pub fn strike_player(&mut self) -> bool {
        if !self.player.is_vulnerable() {
            return false;
        }
        if let Some(entity) = self.player.entity.and_then(|id| self.world.get_mut(id)) {
            // A game may already have moved it to its own terminal state (captured)
            entity.kill();
            let at = entity.pos;
            self.world.burst(at, 24, 0, self.rng);
        }
        let left = self.session.lose_life();
        self.player.status = if left == 0 {
            PlayerStatus::Out
        } else {
            PlayerStatus::Down {
                respawn_in: self.tuning.respawn_delay.max(1),
            }
        };
        self.player.struck = true;
        self.cue(Cue::Hit);
        log::debug!("player struck, {left} lives left");
        true
    }

    /// End the session immediately (e.g. invaders landed)
    pub fn end_session(&mut self) {
        self.session.forfeit();
        self.player.status = PlayerStatus::Out;
        self.player.struck = true;
    }
}

/// Engine context for game `G`
pub type Ctx<'a, G> = TickCtx<'a, <G as Game>::Kind, <G as Game>::State>;
/// Entity type of game `G`
pub type GameEntity<G> = Entity<<G as Game>::Kind, <G as Game>::State>;

/// Per-game strategy plugged into the engine
pub trait Game {
    type Kind: EntityKind;
    type State: EntityState;
    /// Game-specific collision outcomes
    type Special: Copy + Debug;

    fn id(&self) -> GameId;

    fn tuning(&self) -> Tuning;

    /// Declared interacting pairs; called once at construction
    fn interactions(&self) -> InteractionTable<<Self::Kind as EntityKind>::Class, Self::Special>;

    /// Populate the world for `ctx.session.wave`
    fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>);

    /// Create the player entity at `ctx.player.spawn_point`
    fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId;

    /// Advance movement, AI and spawns by one tick
    fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput);

    /// Points for removing `entity` (in the state it had while live)
    fn score_for(&self, entity: &GameEntity<Self>) -> u32;

    fn is_wave_cleared(&self, world: &World<Self::Kind, Self::State>) -> bool;

    fn on_removed(&mut self, _ctx: &mut Ctx<'_, Self>, _entity: &GameEntity<Self>, _removal: Removal) {}

    fn on_special(&mut self, _ctx: &mut Ctx<'_, Self>, _contact: Contact<Self::Special>) {}

    /// The player just lost a life (world is about to freeze)
    fn on_player_down(&mut self, _ctx: &mut Ctx<'_, Self>) {}

    /// Extra values for the HUD/render snapshot
    fn hud(&self) -> Vec<(&'static str, i64)> {
        Vec::new()
    }
}

/// Remove `id` from play, scoring it and notifying the game
pub fn destroy<G: Game>(game: &mut G, ctx: &mut Ctx<'_, G>, id: EntityId, removal: Removal) -> bool {
    let Some(entity) = ctx.world.kill(id) else {
        return false;
    };
    let points = match removal {
        Removal::Expired => 0,
        _ => game.score_for(&entity),
    };
    ctx.award(points);
    match removal {
        Removal::Consumed => ctx.cue(Cue::Collect),
        Removal::Destroyed | Removal::Split => {
            ctx.cue(Cue::Hit);
            ctx.world.burst(entity.pos, 10, 1, ctx.rng);
        }
        Removal::Expired => {}
    }
    game.on_removed(ctx, &entity, removal);
    true
}

fn resolve_contact<G: Game>(game: &mut G, ctx: &mut Ctx<'_, G>, contact: Contact<G::Special>) {
    match contact.outcome {
        Outcome::Damage { amount } => {
            // A projectile spent earlier this tick hits nothing else
            if ctx.world.kill(contact.actor).is_none() {
                return;
            }
            let destroyed = match ctx.world.get_mut(contact.target) {
                Some(target) if !target.is_excluded() => {
                    target.hp = target.hp.saturating_sub(amount);
                    target.hp == 0
                }
                _ => false,
            };
            if destroyed {
                destroy(game, ctx, contact.target, Removal::Destroyed);
            } else {
                ctx.cue(Cue::Hit);
            }
        }
        Outcome::Consume => {
            destroy(game, ctx, contact.target, Removal::Consumed);
        }
        Outcome::Split => {
            if ctx.world.kill(contact.actor).is_some() {
                destroy(game, ctx, contact.target, Removal::Split);
            }
        }
        Outcome::LifeLoss { destroy_actor } => {
            if ctx.player.entity == Some(contact.target) && ctx.strike_player() && destroy_actor {
                destroy(game, ctx, contact.actor, Removal::Destroyed);
            }
        }
        Outcome::Special(_) => game.on_special(ctx, contact),
    }
}

/// A running session of one game
pub struct Simulation<G: Game> {
    game: G,
    world: World<G::Kind, G::State>,
    session: ScoreSession,
    player: PlayerSlot,
    phase: Phase,
    rng: Pcg32,
    tuning: Tuning,
    interactions: InteractionTable<<G::Kind as EntityKind>::Class, G::Special>,
    audio: Vec<AudioCommand>,
    tick: u64,
    level_offset: u32,
    seed: u64,
}

impl<G: Game> Simulation<G> {
    pub fn new(game: G, viewport: Vec2, seed: u64, difficulty: Difficulty) -> Self {
        let tuning = game.tuning();
        let lives = difficulty.starting_lives(tuning.lives);
        let interactions = game.interactions();
        let mut sim = Self {
            world: World::new(viewport),
            session: ScoreSession::new(lives, tuning.extra_life_every),
            player: PlayerSlot::new(tuning.spawn_point),
            phase: Phase::Ready {
                ticks: tuning.ready_pause.max(1),
            },
            rng: Pcg32::seed_from_u64(seed),
            interactions,
            audio: Vec::new(),
            tick: 0,
            level_offset: difficulty.level_offset(),
            seed,
            tuning,
            game,
        };
        log::info!("{:?} session start (seed {seed}, {lives} lives)", sim.game.id());
        sim.begin_wave();
        sim
    }

    fn split(&mut self) -> (&mut G, Ctx<'_, G>) {
        let Self {
            game,
            world,
            session,
            player,
            rng,
            tuning,
            audio,
            tick,
            level_offset,
            ..
        } = self;
        (
            game,
            TickCtx {
                world,
                session,
                player,
                rng,
                tuning,
                audio,
                tick: *tick,
                level_offset: *level_offset,
            },
        )
    }

    fn begin_wave(&mut self) {
        self.world.clear();
        self.player.entity = None;
        self.player.status = PlayerStatus::Active;
        self.player.invulnerable = 0;
        let (game, mut ctx) = self.split();
        game.start_wave(&mut ctx);
        let id = game.spawn_player(&mut ctx);
        ctx.player.entity = Some(id);
        log::info!("{:?} wave {} start", game.id(), ctx.session.wave + 1);
    }

    /// Advance the session by exactly one tick
    pub fn tick(&mut self, input: &TickInput) {
        if self.phase == Phase::Over {
            return;
        }
        self.tick += 1;
        self.world.update_particles();

        match self.phase {
            Phase::Playing => self.step(input),
            Phase::PlayerDown => self.count_down_respawn(),
            Phase::WaveClear { ticks: 0 } => {
                self.session.wave += 1;
                self.begin_wave();
                fire(
                    &mut self.phase,
                    PhaseEvent::NextWave {
                        ready: self.tuning.ready_pause,
                    },
                );
            }
            Phase::Ready { .. } | Phase::WaveClear { .. } => {
                fire(&mut self.phase, PhaseEvent::Elapsed);
            }
            Phase::GameOver { .. } => {
                fire(&mut self.phase, PhaseEvent::Elapsed);
                if self.phase == Phase::Over {
                    log::info!(
                        "{:?} session over: score {} wave {}",
                        self.game.id(),
                        self.session.score(),
                        self.session.wave + 1
                    );
                }
            }
            Phase::Paused { .. } | Phase::Over => {}
        }
    }

    fn step(&mut self, input: &TickInput) {
        if self.player.invulnerable > 0 {
            self.player.invulnerable -= 1;
        }

        {
            let (game, mut ctx) = self.split();
            game.update(&mut ctx, input);
        }
        self.resolve_collisions();
        self.after_strikes();
        self.world.purge();

        if self.phase == Phase::Playing && self.game.is_wave_cleared(&self.world) {
            fire(
                &mut self.phase,
                PhaseEvent::Cleared {
                    pause: self.tuning.wave_clear_pause,
                },
            );
            self.audio.push(AudioCommand::Play(Cue::WaveClear));
            log::info!("{:?} wave {} cleared", self.game.id(), self.session.wave + 1);
        }
    }

    fn resolve_collisions(&mut self) {
        let Self {
            game,
            world,
            session,
            player,
            rng,
            tuning,
            audio,
            tick,
            level_offset,
            interactions,
            ..
        } = self;
        collision_pass(world, interactions, |world, contact| {
            let mut ctx = TickCtx {
                world,
                session: &mut *session,
                player: &mut *player,
                rng: &mut *rng,
                tuning: &*tuning,
                audio: &mut *audio,
                tick: *tick,
                level_offset: *level_offset,
            };
            resolve_contact(game, &mut ctx, contact);
        });
    }

    /// Turn strikes recorded during this tick into phase changes
    fn after_strikes(&mut self) {
        if !self.player.struck {
            return;
        }
        self.player.struck = false;
        {
            let (game, mut ctx) = self.split();
            game.on_player_down(&mut ctx);
        }
        if self.session.is_out() {
            self.player.status = PlayerStatus::Out;
            fire(
                &mut self.phase,
                PhaseEvent::LivesExhausted {
                    pause: self.tuning.game_over_pause,
                },
            );
            self.audio.push(AudioCommand::StopAllLoops);
            self.audio.push(AudioCommand::Play(Cue::GameOver));
            log::info!("{:?} game over", self.game.id());
        } else {
            fire(&mut self.phase, PhaseEvent::PlayerLost);
        }
    }

    fn count_down_respawn(&mut self) {
        let PlayerStatus::Down { respawn_in } = self.player.status else {
            return;
        };
        if respawn_in > 1 {
            self.player.status = PlayerStatus::Down {
                respawn_in: respawn_in - 1,
            };
            return;
        }

        let (game, mut ctx) = self.split();
        let id = game.spawn_player(&mut ctx);
        ctx.player.entity = Some(id);
        ctx.player.status = PlayerStatus::Active;
        ctx.player.invulnerable = ctx.tuning.invulnerable_ticks;
        fire(&mut self.phase, PhaseEvent::Respawned);
        log::debug!("player respawned at {:?}", self.player.spawn_point);
    }

    /// Host focus changes; only Ready/Playing can pause
    pub fn set_paused(&mut self, paused: bool) {
        let event = if paused { PhaseEvent::Pause } else { PhaseEvent::Resume };
        if fire(&mut self.phase, event) {
            log::debug!("phase now {:?}", self.phase);
        }
    }

    /// Take the audio commands emitted since the last drain
    pub fn drain_audio(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.audio)
    }

    pub fn set_particle_cap(&mut self, cap: usize) {
        self.world.set_particle_cap(cap);
    }

    /// Read-only per-tick view for the renderer
    pub fn snapshot(&self) -> Snapshot<G::Kind, G::State> {
        Snapshot {
            game: self.game.id(),
            tick: self.tick,
            phase: self.phase,
            score: self.session.score(),
            lives: self.session.lives(),
            wave: self.session.wave,
            invulnerable: self.player.invulnerable > 0,
            bounds: self.world.bounds,
            entities: self.world.iter().map(EntityView::from).collect(),
            particles: self.world.particles.clone(),
            hud: self.game.hud(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &ScoreSession {
        &self.session
    }

    pub fn player(&self) -> &PlayerSlot {
        &self.player
    }

    pub fn world(&self) -> &World<G::Kind, G::State> {
        &self.world
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn id(&self) -> GameId {
        self.game.id()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Direct mutable access for scenario tests
    #[cfg(test)]
    pub(crate) fn parts_mut(&mut self) -> (&mut G, &mut World<G::Kind, G::State>, &mut PlayerSlot) {
        (&mut self.game, &mut self.world, &mut self.player)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sim::collision::Shape;
    use proptest::prelude::*;
    use serde::Serialize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub enum Piece {
        Hero,
        Bolt,
        Drone,
    }

    impl EntityKind for Piece {
        type Class = Piece;

        fn class(&self) -> Piece {
            *self
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    pub enum Mood {
        Fine,
        Gone,
    }

    impl EntityState for Mood {
        fn dead() -> Self {
            Mood::Gone
        }

        fn is_terminal(&self) -> bool {
            *self == Mood::Gone
        }
    }

    /// Minimal game: drones drift toward the hero, bolts fire upward
    #[derive(Clone)]
    pub struct Toy {
        pub drones: usize,
        pub waves_started: u32,
    }

    impl Game for Toy {
        type Kind = Piece;
        type State = Mood;
        type Special = ();

        fn id(&self) -> GameId {
            GameId::Rocks
        }

        fn tuning(&self) -> Tuning {
            Tuning {
                lives: 3,
                respawn_delay: 30,
                invulnerable_ticks: 60,
                wave_clear_pause: 20,
                ready_pause: 5,
                game_over_pause: 10,
                spawn_point: Vec2::new(50.0, 90.0),
                extra_life_every: None,
            }
        }

        fn interactions(&self) -> InteractionTable<Piece, ()> {
            InteractionTable::new()
                .with(Piece::Bolt, Piece::Drone, Outcome::Damage { amount: 1 })
                .with(Piece::Drone, Piece::Hero, Outcome::LifeLoss { destroy_actor: false })
        }

        fn start_wave(&mut self, ctx: &mut Ctx<'_, Self>) {
            self.waves_started += 1;
            for i in 0..self.drones {
                ctx.spawn(Entity::new(
                    Piece::Drone,
                    Vec2::new(10.0 + i as f32 * 10.0, 10.0),
                    Shape::circle(3.0),
                    Mood::Fine,
                ));
            }
        }

        fn spawn_player(&mut self, ctx: &mut Ctx<'_, Self>) -> EntityId {
            let at = ctx.player.spawn_point;
            ctx.spawn(Entity::new(Piece::Hero, at, Shape::circle(3.0), Mood::Fine))
        }

        fn update(&mut self, ctx: &mut Ctx<'_, Self>, input: &TickInput) {
            if input.fire {
                if let Some(at) = ctx.player_pos() {
                    ctx.spawn(Entity::new(Piece::Bolt, at, Shape::circle(1.0), Mood::Fine));
                }
            }
            for e in ctx.world.iter_mut() {
                e.integrate();
            }
        }

        fn score_for(&self, entity: &GameEntity<Self>) -> u32 {
            match entity.kind {
                Piece::Drone => 100,
                _ => 0,
            }
        }

        fn is_wave_cleared(&self, world: &World<Piece, Mood>) -> bool {
            world.count_class(Piece::Drone) == 0
        }
    }

    pub fn toy(drones: usize) -> Simulation<Toy> {
        Simulation::new(
            Toy {
                drones,
                waves_started: 0,
            },
            Vec2::splat(100.0),
            7,
            Difficulty::Normal,
        )
    }

    pub fn run_until_playing(sim: &mut Simulation<Toy>) {
        let idle = TickInput::default();
        while sim.phase() != Phase::Playing {
            sim.tick(&idle);
        }
    }

    #[test]
    fn test_ready_then_playing() {
        let mut sim = toy(1);
        assert!(matches!(sim.phase(), Phase::Ready { .. }));
        run_until_playing(&mut sim);
        assert_eq!(sim.ticks(), 5);
    }

    #[test]
    fn test_strike_respawn_invulnerability() {
        let mut sim = toy(1);
        run_until_playing(&mut sim);
        let spawn = sim.player().spawn_point;

        // Park the drone on the hero
        let drone = sim.world().iter().find(|e| e.kind == Piece::Drone).map(|e| e.id);
        {
            let (_, world, _) = sim.parts_mut();
            if let Some(d) = drone.and_then(|id| world.get_mut(id)) {
                d.pos = spawn;
            }
        }
        sim.tick(&TickInput::default());
        assert_eq!(sim.phase(), Phase::PlayerDown);
        assert_eq!(sim.session().lives(), 2);

        for _ in 0..30 {
            sim.tick(&TickInput::default());
        }
        assert_eq!(sim.phase(), Phase::Playing);
        let hero = sim.player().entity.and_then(|id| sim.world().live(id)).map(|e| e.pos);
        assert_eq!(hero, Some(spawn));
        assert!(sim.player().invulnerable > 0);

        // The drone still sits on the spawn point: strikes are ignored
        for _ in 0..10 {
            sim.tick(&TickInput::default());
        }
        assert_eq!(sim.session().lives(), 2);
        assert_eq!(sim.phase(), Phase::Playing);
    }

    #[test]
    fn test_wave_clear_fires_once_for_simultaneous_kills() {
        let mut sim = toy(3);
        run_until_playing(&mut sim);
        let drones: Vec<_> = sim.world().iter().filter(|e| e.kind == Piece::Drone).map(|e| e.pos).collect();
        {
            let (_, world, _) = sim.parts_mut();
            for at in drones {
                world.spawn(Entity::new(Piece::Bolt, at, Shape::circle(1.0), Mood::Fine), 0);
            }
        }
        sim.tick(&TickInput::default());
        assert_eq!(sim.session().score(), 300);
        assert!(matches!(sim.phase(), Phase::WaveClear { .. }));
        let clears = sim
            .drain_audio()
            .into_iter()
            .filter(|c| *c == AudioCommand::Play(Cue::WaveClear))
            .count();
        assert_eq!(clears, 1);

        for _ in 0..21 {
            sim.tick(&TickInput::default());
        }
        assert_eq!(sim.session().wave, 1);
        assert_eq!(sim.game().waves_started, 2);
        assert!(matches!(sim.phase(), Phase::Ready { .. }));
    }

    #[test]
    fn test_last_life_ends_session() {
        let mut sim = toy(1);
        let idle = TickInput::default();
        for _ in 0..3 {
            run_until_playing(&mut sim);
            let spawn = sim.player().spawn_point;
            let drone = sim.world().iter().find(|e| e.kind == Piece::Drone).map(|e| e.id);
            {
                let (_, world, player) = sim.parts_mut();
                player.invulnerable = 0;
                if let Some(d) = drone.and_then(|id| world.get_mut(id)) {
                    d.pos = spawn;
                }
            }
            sim.tick(&idle);
            while sim.phase() == Phase::PlayerDown {
                sim.tick(&idle);
            }
        }
        assert!(matches!(sim.phase(), Phase::GameOver { .. }));
        while sim.phase() != Phase::Over {
            sim.tick(&idle);
        }
        assert_eq!(sim.session().lives(), 0);
        let ticks = sim.ticks();
        sim.tick(&idle);
        assert_eq!(sim.ticks(), ticks);
    }

    #[test]
    fn test_pause_freezes_world() {
        let mut sim = toy(1);
        run_until_playing(&mut sim);
        sim.set_paused(true);
        let before = sim.ticks();
        sim.tick(&TickInput::firing());
        assert_eq!(sim.world().count_class(Piece::Bolt), 0);
        assert_eq!(sim.ticks(), before + 1);
        sim.set_paused(false);
        assert_eq!(sim.phase(), Phase::Playing);
    }

    #[test]
    fn test_spent_actor_deals_no_damage() {
        let mut sim = toy(1);
        let Some(drone) = sim.world().iter().find(|e| e.kind == Piece::Drone).map(|e| e.id) else {
            panic!("no drone");
        };
        {
            let (game, mut ctx) = sim.split();
            let at = ctx.world.get(drone).map(|e| e.pos).unwrap_or_default();
            let bolt = ctx.spawn(Entity::new(Piece::Bolt, at, Shape::circle(1.0), Mood::Fine));
            assert!(ctx.world.kill(bolt).is_some());
            let contact = Contact {
                actor: bolt,
                target: drone,
                outcome: Outcome::Damage { amount: 1 },
            };
            resolve_contact(game, &mut ctx, contact);
        }
        assert!(sim.world().live(drone).is_some());
        assert_eq!(sim.session().score(), 0);
    }

    #[test]
    fn test_steer_prefers_press() {
        let mut input = TickInput::default();
        input.hold(Direction::Left, true);
        assert_eq!(input.steer(), Some(Direction::Left));
        input.pressed = Some(Direction::Up);
        assert_eq!(input.steer(), Some(Direction::Up));
        input.clear_momentary();
        assert_eq!(input.steer(), Some(Direction::Left));
        assert_eq!(input.axis_x(), -1.0);
    }

    #[test]
    fn test_input_constructors() {
        let press = TickInput::pressing(Direction::Right);
        assert_eq!(press.pressed, Some(Direction::Right));
        assert!(press.is_held(Direction::Right));
        assert!(!press.fire);
        let shot = TickInput::firing();
        assert!(shot.fire && shot.fire_held);
        assert_eq!(shot.steer(), None);
    }

    proptest! {
        #[test]
        fn prop_score_monotone_over_ticks(fires in proptest::collection::vec(any::<bool>(), 1..200)) {
            let mut sim = toy(4);
            let mut last = 0;
            for fire in fires {
                let input = if fire { TickInput::firing() } else { TickInput::default() };
                sim.tick(&input);
                prop_assert!(sim.session().score() >= last);
                last = sim.session().score();
            }
        }
    }
}
