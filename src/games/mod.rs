//! The six cabinet games, each a `Game` strategy for the shared engine

pub mod crossing;
pub mod formation;
pub mod invaders;
pub mod maze;
pub mod rocks;
pub mod snake;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioBridge, AudioPort};
use crate::host::{Arcade, Cabinet, HostHooks};
use crate::persistence::ScoreStore;
use crate::settings::Settings;

pub use crossing::Crossing;
pub use formation::Formation;
pub use invaders::Invaders;
pub use maze::MazeChase;
pub use rocks::Rocks;
pub use snake::SnakeArena;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    Crossing,
    MazeChase,
    Rocks,
    Invaders,
    SnakeArena,
    Formation,
}

impl GameId {
    pub const ALL: [GameId; 6] = [
        GameId::Crossing,
        GameId::MazeChase,
        GameId::Rocks,
        GameId::Invaders,
        GameId::SnakeArena,
        GameId::Formation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameId::Crossing => "crossing",
            GameId::MazeChase => "maze",
            GameId::Rocks => "rocks",
            GameId::Invaders => "invaders",
            GameId::SnakeArena => "snake",
            GameId::Formation => "formation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "crossing" | "frog" => Some(GameId::Crossing),
            "maze" | "maze-chase" | "mazechase" => Some(GameId::MazeChase),
            "rocks" | "asteroids" => Some(GameId::Rocks),
            "invaders" => Some(GameId::Invaders),
            "snake" | "snake-arena" => Some(GameId::SnakeArena),
            "formation" | "galaxy" => Some(GameId::Formation),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameId::Crossing => "Road Hopper",
            GameId::MazeChase => "Maze Muncher",
            GameId::Rocks => "Rock Storm",
            GameId::Invaders => "Sky Invaders",
            GameId::SnakeArena => "Snake Arena",
            GameId::Formation => "Formation Flyer",
        }
    }

    /// Persistence key of this game's leaderboard
    pub fn storage_key(&self) -> String {
        format!("{}_scores", self.as_str())
    }
}

/// Centre of grid cell `cell` for square cells of `size` pixels
pub(crate) fn cell_center(cell: IVec2, size: f32) -> Vec2 {
    (cell.as_vec2() + Vec2::splat(0.5)) * size
}

/// Build a boxed cabinet for any of the six games
pub fn launch(
    id: GameId,
    viewport: Vec2,
    settings: &Settings,
    hooks: HostHooks,
    store: Box<dyn ScoreStore>,
    audio: Box<dyn AudioPort>,
) -> Box<dyn Arcade> {
    let difficulty = settings.difficulty;
    let bridge = AudioBridge::new(audio, settings.master_volume, settings.muted);
    log::info!("launching {} ({})", id.title(), difficulty.as_str());
    match id {
        GameId::Crossing => Box::new(Cabinet::new(Crossing::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
        GameId::MazeChase => Box::new(Cabinet::new(MazeChase::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
        GameId::Rocks => Box::new(Cabinet::new(Rocks::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
        GameId::Invaders => Box::new(Cabinet::new(Invaders::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
        GameId::SnakeArena => Box::new(Cabinet::new(SnakeArena::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
        GameId::Formation => Box::new(Cabinet::new(Formation::new(viewport, difficulty), viewport, settings, hooks, store, bridge)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for id in GameId::ALL {
            assert_eq!(GameId::from_str(id.as_str()), Some(id));
        }
        assert_eq!(GameId::from_str("FROG"), Some(GameId::Crossing));
        assert_eq!(GameId::from_str("pong"), None);
        assert_eq!(GameId::SnakeArena.storage_key(), "snake_scores");
    }

    #[test]
    fn test_cell_center() {
        assert_eq!(cell_center(IVec2::new(2, 0), 10.0), Vec2::new(25.0, 5.0));
    }
}
