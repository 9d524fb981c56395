//! Arcade Cabinet - the simulation core behind the site's hidden arcade games
//!
//! Core modules:
//! - `sim`: Deterministic fixed-tick engine (clock, entities, paths, collisions, progression)
//! - `ai`: Adversary decision strategies (pursuit, greedy scoring, trajectory selection)
//! - `games`: The six game configurations driven by the engine
//! - `leaderboard` / `persistence`: Top-10 tables and their pluggable stores
//! - `input` / `audio`: Intent vocabulary and audio command bridge
//! - `host`: The embeddable cabinet the page talks to
//! - `platform`: Browser glue (wasm32 only)

pub mod ai;
pub mod audio;
pub mod games;
pub mod host;
pub mod input;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use games::GameId;
pub use host::{Arcade, Cabinet, HostHooks};
pub use leaderboard::{Initials, Leaderboard, LeaderboardEntry};
pub use settings::{Difficulty, Settings};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    use std::time::Duration;

    /// Fixed simulation rate
    pub const TICK_HZ: u32 = 60;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / TICK_HZ as f32;
    /// Fixed simulation timestep
    pub const TICK: Duration = Duration::from_nanos(1_000_000_000 / TICK_HZ as u64);
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta accepted by the clock (tab switches, breakpoints)
    pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

    /// Maximum live particles per world
    pub const MAX_PARTICLES: usize = 256;
    /// Leaderboard capacity
    pub const LEADERBOARD_SIZE: usize = 10;

    /// Convert seconds to whole ticks
    pub const fn secs(seconds: u32) -> u32 {
        seconds * TICK_HZ
    }
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Wrap a position into `[0, bounds)` on both axes
#[inline]
pub fn wrap_position(pos: Vec2, bounds: Vec2) -> Vec2 {
    Vec2::new(pos.x.rem_euclid(bounds.x), pos.y.rem_euclid(bounds.y))
}
