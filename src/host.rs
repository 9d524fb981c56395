//! The embeddable cabinet
//!
//! A `Cabinet` wraps one running `Simulation` with everything the page
//! needs around it: the fixed-rate clock, the intent queue, the audio
//! bridge, the leaderboard and the screens that follow a game over.
//!
//! Screen flow:
//! `Playing -> (EnteringInitials) -> Results -> Playing (new session)`,
//! with `Closed` reachable from anywhere through cancel or `terminate`.

use std::time::Duration;

use glam::Vec2;
use serde::Serialize;

use crate::audio::AudioBridge;
use crate::games::GameId;
use crate::input::{FrameIntents, IntentQueue, TaggedIntent};
use crate::leaderboard::{Initials, InitialsEditor, Leaderboard};
use crate::persistence::ScoreStore;
use crate::settings::{Difficulty, Settings};
use crate::sim::{Direction, Game, Phase, SimClock, Simulation};

/// Callbacks into the embedding page
pub struct HostHooks {
    /// The player closed the cabinet (or the host terminated it)
    pub on_close: Box<dyn FnMut()>,
    /// A score just took first place on its leaderboard
    pub on_top_score: Box<dyn FnMut(GameId, u64, Initials)>,
}

impl HostHooks {
    pub fn none() -> Self {
        Self {
            on_close: Box::new(|| {}),
            on_top_score: Box::new(|_, _, _| {}),
        }
    }
}

impl Default for HostHooks {
    fn default() -> Self {
        Self::none()
    }
}

/// What the cabinet is showing around the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Playing,
    /// Qualifying score; the player is typing initials for `rank`
    EnteringInitials { rank: usize },
    /// Final table; `rank` is where the entry landed, `saved` whether it reached the store
    Results { rank: Option<usize>, saved: bool },
    Closed,
}

/// Per-frame values for the page's HUD overlay
#[derive(Debug, Clone, Serialize)]
pub struct Hud {
    pub game: GameId,
    pub title: &'static str,
    pub score: u64,
    pub lives: u8,
    /// 1-based
    pub wave: u32,
    pub phase: &'static str,
    pub screen: Screen,
    pub muted: bool,
    pub high_score: Option<u64>,
    /// Initials being typed, while on the entry screen
    pub initials: Option<String>,
    pub extra: Vec<(&'static str, i64)>,
}

/// Object-safe face of a cabinet, whichever game it runs
pub trait Arcade {
    fn game_id(&self) -> GameId;

    /// Feed real elapsed time; returns the number of ticks run
    fn frame(&mut self, elapsed: Duration) -> u32;

    /// Queue an input intent for the next tick
    fn push(&mut self, intent: TaggedIntent) -> bool;

    /// Page focus changed; unfocused play pauses
    fn set_focused(&mut self, focused: bool);

    fn screen(&self) -> Screen;

    fn hud(&self) -> Hud;

    fn leaderboard(&self) -> &Leaderboard;

    /// Render snapshot plus screen state as JSON
    fn snapshot_json(&self) -> serde_json::Result<String>;

    /// Forced close; same as the player closing
    fn terminate(&mut self);

    fn is_closed(&self) -> bool;
}

#[derive(Serialize)]
struct CabinetView<'a, T: Serialize> {
    screen: Screen,
    initials: Option<String>,
    snapshot: T,
    leaderboard: &'a Leaderboard,
}

/// A game plus clock, input, audio and leaderboard
pub struct Cabinet<G: Game + Clone> {
    id: GameId,
    sim: Simulation<G>,
    /// Pristine game configuration for restarts
    template: G,
    viewport: Vec2,
    difficulty: Difficulty,
    particle_cap: usize,
    seed: u64,
    sessions: u64,
    clock: SimClock,
    intents: IntentQueue,
    audio: AudioBridge,
    store: Box<dyn ScoreStore>,
    board: Leaderboard,
    editor: InitialsEditor,
    final_score: u64,
    screen: Screen,
    hooks: HostHooks,
}

/// Seed for sessions without a fixed one
fn fresh_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64)
    }
}

impl<G: Game + Clone> Cabinet<G> {
    pub fn new(
        game: G,
        viewport: Vec2,
        settings: &Settings,
        hooks: HostHooks,
        store: Box<dyn ScoreStore>,
        audio: AudioBridge,
    ) -> Self {
        let id = game.id();
        let seed = settings.seed.unwrap_or_else(fresh_seed);
        let board = Leaderboard::load(store.as_ref(), &id.storage_key());
        let particle_cap = settings.effective_particle_cap();
        let mut sim = Simulation::new(game.clone(), viewport, seed, settings.difficulty);
        sim.set_particle_cap(particle_cap);
        Self {
            id,
            sim,
            template: game,
            viewport,
            difficulty: settings.difficulty,
            particle_cap,
            seed,
            sessions: 0,
            clock: SimClock::default(),
            intents: IntentQueue::new(),
            audio,
            store,
            board,
            editor: InitialsEditor::new(),
            final_score: 0,
            screen: Screen::Playing,
            hooks,
        }
    }

    pub fn simulation(&self) -> &Simulation<G> {
        &self.sim
    }

    pub fn is_muted(&self) -> bool {
        self.audio.is_muted()
    }

    fn step(&mut self) {
        let frame = self.intents.take();
        if frame.mute_toggle {
            let muted = self.audio.toggle_mute();
            log::debug!("audio {}", if muted { "muted" } else { "unmuted" });
        }

        match self.screen {
            Screen::Playing => self.play(&frame),
            Screen::EnteringInitials { rank } => self.edit_initials(&frame, rank),
            Screen::Results { .. } => {
                if frame.input.fire {
                    self.restart();
                } else if frame.cancel {
                    self.close();
                }
            }
            Screen::Closed => {}
        }
    }

    fn play(&mut self, frame: &FrameIntents) {
        if frame.cancel {
            self.close();
            return;
        }
        self.sim.tick(&frame.input);
        self.audio.apply_all(self.sim.drain_audio());
        if self.sim.phase() == Phase::Over {
            self.finish_session();
        }
    }

    fn finish_session(&mut self) {
        self.final_score = self.sim.session().score();
        // Reopened lazily if another session starts
        self.audio.release();
        self.screen = match self.board.potential_rank(self.final_score) {
            Some(rank) => {
                log::info!("score {} qualifies for rank {rank}", self.final_score);
                self.editor = InitialsEditor::new();
                Screen::EnteringInitials { rank }
            }
            None => Screen::Results {
                rank: None,
                saved: false,
            },
        };
    }

    fn edit_initials(&mut self, frame: &FrameIntents, rank: usize) {
        if frame.cancel {
            log::info!("initials entry abandoned");
            self.screen = Screen::Results {
                rank: None,
                saved: false,
            };
            return;
        }
        match frame.input.pressed {
            Some(Direction::Up) => self.editor.cycle(true),
            Some(Direction::Down) => self.editor.cycle(false),
            Some(Direction::Left) => self.editor.move_cursor(false),
            Some(Direction::Right) => self.editor.move_cursor(true),
            None => {}
        }
        if frame.input.fire
            && let Some(initials) = self.editor.advance()
        {
            self.submit(initials, rank);
        }
    }

    /// Insert the entry, then save best-effort
    fn submit(&mut self, initials: Initials, expected: usize) {
        let score = self.final_score;
        let rank = self.board.insert(initials, score);
        if rank != Some(expected) {
            log::debug!("entry landed at {rank:?}, expected {expected}");
        }
        let key = self.id.storage_key();
        let saved = match self.board.save(self.store.as_mut(), &key) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("leaderboard not saved: {err}");
                false
            }
        };
        if rank == Some(1) {
            (self.hooks.on_top_score)(self.id, score, initials);
        }
        self.screen = Screen::Results { rank, saved };
    }

    fn restart(&mut self) {
        self.sessions += 1;
        let seed = self.seed.wrapping_add(self.sessions);
        self.audio.apply_all(self.sim.drain_audio());
        self.sim = Simulation::new(self.template.clone(), self.viewport, seed, self.difficulty);
        self.sim.set_particle_cap(self.particle_cap);
        self.screen = Screen::Playing;
        log::info!("{:?} new session {}", self.id, self.sessions + 1);
    }

    fn close(&mut self) {
        if self.screen == Screen::Closed {
            return;
        }
        self.screen = Screen::Closed;
        self.intents.release_all();
        self.audio.release();
        log::info!("{:?} cabinet closed", self.id);
        (self.hooks.on_close)();
    }
}

impl<G: Game + Clone> Arcade for Cabinet<G> {
    fn game_id(&self) -> GameId {
        self.id
    }

    fn frame(&mut self, elapsed: Duration) -> u32 {
        if self.is_closed() {
            return 0;
        }
        let due = self.clock.advance(elapsed);
        for _ in 0..due {
            self.step();
            if self.is_closed() {
                break;
            }
        }
        due
    }

    fn push(&mut self, intent: TaggedIntent) -> bool {
        !self.is_closed() && self.intents.push(intent)
    }

    fn set_focused(&mut self, focused: bool) {
        if !focused {
            self.intents.release_all();
        }
        self.sim.set_paused(!focused);
    }

    fn screen(&self) -> Screen {
        self.screen
    }

    fn hud(&self) -> Hud {
        let session = self.sim.session();
        Hud {
            game: self.id,
            title: self.id.title(),
            score: session.score(),
            lives: session.lives(),
            wave: session.wave + 1,
            phase: self.sim.phase().label(),
            screen: self.screen,
            muted: self.audio.is_muted(),
            high_score: self.board.top_score(),
            initials: matches!(self.screen, Screen::EnteringInitials { .. })
                .then(|| self.editor.current().to_string()),
            extra: self.sim.game().hud(),
        }
    }

    fn leaderboard(&self) -> &Leaderboard {
        &self.board
    }

    fn snapshot_json(&self) -> serde_json::Result<String> {
        let view = CabinetView {
            screen: self.screen,
            initials: matches!(self.screen, Screen::EnteringInitials { .. })
                .then(|| self.editor.current().to_string()),
            snapshot: self.sim.snapshot(),
            leaderboard: &self.board,
        };
        serde_json::to_string(&view)
    }

    fn terminate(&mut self) {
        self.close();
    }

    fn is_closed(&self) -> bool {
        self.screen == Screen::Closed
    }
}

impl<G: Game + Clone> Drop for Cabinet<G> {
    fn drop(&mut self) {
        if !self.is_closed() {
            log::debug!("{:?} cabinet dropped while open", self.id);
            self.audio.release();
        }
    }
}
