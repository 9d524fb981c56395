//! Arcade Cabinet headless runner
//!
//! Plays one attract-mode session with a scripted input pattern and prints
//! the HUD and leaderboard. The browser build is driven through
//! `arcade_cabinet::platform::WebCabinet` instead.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::collections::VecDeque;
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;
    use glam::Vec2;

    use arcade_cabinet::audio::NullAudio;
    use arcade_cabinet::consts::{TICK, secs};
    use arcade_cabinet::games::launch;
    use arcade_cabinet::host::{Hud, Screen};
    use arcade_cabinet::input::{Intent, TaggedIntent};
    use arcade_cabinet::leaderboard::CHARSET;
    use arcade_cabinet::persistence::{FileStore, MemoryStore, ScoreStore};
    use arcade_cabinet::{Arcade, Difficulty, GameId, HostHooks, Initials, Leaderboard, Settings};

    const VIEWPORT: Vec2 = Vec2::new(480.0, 640.0);
    /// Ticks between heading changes of the scripted player
    const LEG: u64 = 45;
    const FIRE_EVERY: u64 = 8;
    const ROUTE: [Intent; 4] = [Intent::Left, Intent::Up, Intent::Right, Intent::Down];

    #[derive(Parser, Debug)]
    #[command(name = "arcade-cabinet", version, about = "Run one arcade session headless")]
    struct Cli {
        /// crossing, maze, rocks, invaders, snake or formation
        #[arg(short, long, default_value = "maze")]
        game: String,

        /// Simulated seconds of play
        #[arg(short, long, default_value_t = 30)]
        seconds: u32,

        /// Fixed RNG seed (a fresh one per run when absent)
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for leaderboards and settings; in-memory when absent
        #[arg(long)]
        store: Option<PathBuf>,

        /// easy, normal or hard
        #[arg(short, long, default_value = "normal")]
        difficulty: String,

        /// Initials entered if the run earns a leaderboard place
        #[arg(long, default_value = "CPU")]
        initials: String,

        /// Debug-level logging (RUST_LOG still wins)
        #[arg(short, long)]
        verbose: bool,
    }

    /// Scripted player: walks a square route, fires steadily, types initials
    #[derive(Debug, Default)]
    struct Autopilot {
        seq: u64,
        heading: Option<Intent>,
        script: VecDeque<Intent>,
        typed: bool,
    }

    impl Autopilot {
        fn send(&mut self, cabinet: &mut dyn Arcade, intent: TaggedIntent) {
            self.seq += 1;
            cabinet.push(TaggedIntent { seq: self.seq, ..intent });
        }

        fn tap(&mut self, cabinet: &mut dyn Arcade, intent: Intent) {
            self.send(cabinet, TaggedIntent::pressed(0, intent));
            self.send(cabinet, TaggedIntent::released(0, intent));
        }

        fn steer(&mut self, cabinet: &mut dyn Arcade, tick: u64) {
            if tick % LEG == 0 {
                let next = ROUTE[((tick / LEG) % ROUTE.len() as u64) as usize];
                if let Some(previous) = self.heading.replace(next) {
                    self.send(cabinet, TaggedIntent::released(0, previous));
                }
                self.send(cabinet, TaggedIntent::pressed(0, next));
            }
            if tick % FIRE_EVERY == 0 {
                self.tap(cabinet, Intent::Fire);
            }
        }

        /// One keypress per tick until the initials are confirmed
        fn type_initials(&mut self, cabinet: &mut dyn Arcade, initials: Initials) {
            if !self.typed {
                self.typed = true;
                if let Some(held) = self.heading.take() {
                    self.send(cabinet, TaggedIntent::released(0, held));
                }
                for ch in initials.as_str().bytes() {
                    let steps = CHARSET.iter().position(|c| *c == ch).unwrap_or(0);
                    self.script.extend(std::iter::repeat_n(Intent::Up, steps));
                    self.script.push_back(Intent::Fire);
                }
            }
            if let Some(intent) = self.script.pop_front() {
                self.tap(cabinet, intent);
            }
        }
    }

    fn init_logging(verbose: bool) {
        let default = if verbose { "debug" } else { "info" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
    }

    fn print_hud(hud: &Hud) {
        println!(
            "{} | score {} | lives {} | wave {} | {}",
            hud.title, hud.score, hud.lives, hud.wave, hud.phase
        );
        for (key, value) in &hud.extra {
            println!("  {key}: {value}");
        }
    }

    fn print_board(board: &Leaderboard) {
        println!("-- leaderboard --");
        if board.is_empty() {
            println!("  (empty)");
        }
        for (i, entry) in board.entries().iter().enumerate() {
            println!("{:>3}. {} {:>8}", i + 1, entry.identifier, entry.score);
        }
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        init_logging(cli.verbose);

        let id = GameId::from_str(&cli.game).with_context(|| format!("unknown game {:?}", cli.game))?;
        let difficulty =
            Difficulty::from_str(&cli.difficulty).with_context(|| format!("unknown difficulty {:?}", cli.difficulty))?;
        let initials = Initials::new(&cli.initials.to_uppercase())
            .with_context(|| format!("initials must be 3 of A-Z, 0-9 or space, got {:?}", cli.initials))?;

        let store: Box<dyn ScoreStore> = match &cli.store {
            Some(dir) => Box::new(
                FileStore::open(dir).with_context(|| format!("cannot open store at {}", dir.display()))?,
            ),
            None => Box::new(MemoryStore::new()),
        };
        let mut settings = Settings::load(store.as_ref());
        settings.difficulty = difficulty;
        if cli.seed.is_some() {
            settings.seed = cli.seed;
        }

        let hooks = HostHooks {
            on_close: Box::new(|| log::debug!("cabinet closed")),
            on_top_score: Box::new(|id, score, initials| {
                println!("New top score on {}: {score} by {initials}", id.title());
            }),
        };
        let mut cabinet = launch(id, VIEWPORT, &settings, hooks, store, Box::new(NullAudio));
        log::info!("running {} for {}s", id.title(), cli.seconds);

        let budget = u64::from(secs(cli.seconds));
        let mut pilot = Autopilot::default();
        let mut tick = 0u64;
        loop {
            match cabinet.screen() {
                Screen::Playing if tick >= budget => {
                    log::info!("time up");
                    break;
                }
                Screen::Playing => pilot.steer(cabinet.as_mut(), tick),
                Screen::EnteringInitials { .. } => pilot.type_initials(cabinet.as_mut(), initials),
                Screen::Results { rank, saved } => {
                    log::info!("session over (rank {rank:?}, saved {saved})");
                    break;
                }
                Screen::Closed => break,
            }
            cabinet.frame(TICK);
            tick += 1;
            if tick % u64::from(secs(10)) == 0 {
                log::debug!("{:?}", cabinet.hud());
            }
        }

        print_hud(&cabinet.hud());
        print_board(cabinet.leaderboard());
        cabinet.terminate();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The page drives `platform::WebCabinet`; this binary has nothing to do there
}
