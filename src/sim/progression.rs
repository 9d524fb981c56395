//! Session phase, score/lives bookkeeping and difficulty scaling

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::fsm::Transition;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Short "READY" pause before play (world frozen)
    Ready { ticks: u32 },
    /// Active gameplay
    Playing,
    /// Player lost a life; world frozen until the respawn delay elapses
    PlayerDown,
    /// Wave cleared; scripted pause before the next wave
    WaveClear { ticks: u32 },
    /// Host-requested pause (focus loss)
    Paused { resume_to: PausedFrom },
    /// Lives exhausted; pause before the session ends
    GameOver { ticks: u32 },
    /// Session finished
    Over,
}

/// Where a paused session resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PausedFrom {
    Ready,
    Playing,
}

/// Events driving `Phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// One tick of a timed phase elapsed
    Elapsed,
    Cleared { pause: u32 },
    PlayerLost,
    Respawned,
    LivesExhausted { pause: u32 },
    NextWave { ready: u32 },
    Pause,
    Resume,
}

impl Transition<PhaseEvent> for Phase {
    fn next(&self, event: PhaseEvent) -> Option<Self> {
        use PhaseEvent as E;
        match (*self, event) {
            (Phase::Ready { ticks }, E::Elapsed) => Some(if ticks <= 1 {
                Phase::Playing
            } else {
                Phase::Ready { ticks: ticks - 1 }
            }),
            (Phase::WaveClear { ticks }, E::Elapsed) => Some(Phase::WaveClear {
                ticks: ticks.saturating_sub(1),
            }),
            (Phase::GameOver { ticks }, E::Elapsed) => Some(if ticks <= 1 {
                Phase::Over
            } else {
                Phase::GameOver { ticks: ticks - 1 }
            }),
            (Phase::Playing, E::Cleared { pause }) => Some(Phase::WaveClear { ticks: pause }),
            (Phase::Playing, E::PlayerLost) => Some(Phase::PlayerDown),
            (Phase::PlayerDown, E::Respawned) => Some(Phase::Playing),
            (Phase::Playing | Phase::PlayerDown, E::LivesExhausted { pause }) => {
                Some(Phase::GameOver { ticks: pause.max(1) })
            }
            (Phase::WaveClear { ticks: 0 }, E::NextWave { ready }) => Some(Phase::Ready { ticks: ready.max(1) }),
            (Phase::Ready { .. }, E::Pause) => Some(Phase::Paused {
                resume_to: PausedFrom::Ready,
            }),
            (Phase::Playing, E::Pause) => Some(Phase::Paused {
                resume_to: PausedFrom::Playing,
            }),
            (Phase::Paused { resume_to }, E::Resume) => Some(match resume_to {
                PausedFrom::Ready => Phase::Ready { ticks: 1 },
                PausedFrom::Playing => Phase::Playing,
            }),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        *self == Phase::Over
    }
}

impl Phase {
    /// World entities advance only while playing
    pub fn advances_world(&self) -> bool {
        *self == Phase::Playing
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Ready { .. } => "ready",
            Phase::Playing => "playing",
            Phase::PlayerDown => "player_down",
            Phase::WaveClear { .. } => "wave_clear",
            Phase::Paused { .. } => "paused",
            Phase::GameOver { .. } => "game_over",
            Phase::Over => "over",
        }
    }
}

/// Score, lives and wave of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSession {
    score: u64,
    lives: u8,
    /// 0-based wave index
    pub wave: u32,
    extra_life_every: Option<u64>,
    next_extra_life: Option<u64>,
}

impl ScoreSession {
    pub fn new(lives: u8, extra_life_every: Option<u64>) -> Self {
        Self {
            score: 0,
            lives,
            wave: 0,
            extra_life_every,
            next_extra_life: extra_life_every,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    /// Add points (score never decreases); grants extra lives at thresholds
    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(u64::from(points));
        while let (Some(every), Some(at)) = (self.extra_life_every, self.next_extra_life) {
            if self.score < at {
                break;
            }
            self.lives = self.lives.saturating_add(1);
            self.next_extra_life = at.checked_add(every.max(1));
            log::debug!("extra life at {at}");
        }
    }

    /// Deduct a life (bounded at zero); returns remaining lives
    pub fn lose_life(&mut self) -> u8 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Forfeit every remaining life (e.g. invaders landed)
    pub fn forfeit(&mut self) {
        self.lives = 0;
    }

    pub fn is_out(&self) -> bool {
        self.lives == 0
    }
}

/// Player availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Active,
    /// Respawns when the countdown reaches zero
    Down { respawn_in: u32 },
    /// No lives left
    Out,
}

/// The player's entity handle plus life-cycle bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub entity: Option<EntityId>,
    pub status: PlayerStatus,
    /// Remaining invulnerability ticks; strikes are ignored while > 0
    pub invulnerable: u32,
    pub spawn_point: Vec2,
    /// Set by a strike this tick, cleared by the engine
    pub(crate) struck: bool,
}

impl PlayerSlot {
    pub fn new(spawn_point: Vec2) -> Self {
        Self {
            entity: None,
            status: PlayerStatus::Active,
            invulnerable: 0,
            spawn_point,
            struck: false,
        }
    }

    /// Can a hazard hurt the player right now
    pub fn is_vulnerable(&self) -> bool {
        self.status == PlayerStatus::Active && self.invulnerable == 0
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }
}

/// Monotone per-wave scaling clamped to a limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub base: f32,
    pub per_wave: f32,
    pub limit: f32,
}

impl Scaling {
    pub const fn new(base: f32, per_wave: f32, limit: f32) -> Self {
        Self {
            base,
            per_wave,
            limit,
        }
    }

    /// Value at `wave`, moving from `base` toward `limit` and never past it
    pub fn at(&self, wave: u32) -> f32 {
        let raw = self.base + self.per_wave * wave as f32;
        if self.per_wave >= 0.0 {
            raw.min(self.limit)
        } else {
            raw.max(self.limit)
        }
    }

    /// `at` rounded to whole ticks (at least 1)
    pub fn ticks(&self, wave: u32) -> u32 {
        self.at(wave).round().max(1.0) as u32
    }

    /// `at` rounded to a count (at least 0)
    pub fn count(&self, wave: u32) -> usize {
        self.at(wave).round().max(0.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fsm::fire;
    use proptest::prelude::*;

    #[test]
    fn test_ready_counts_into_playing() {
        let mut phase = Phase::Ready { ticks: 2 };
        fire(&mut phase, PhaseEvent::Elapsed);
        assert_eq!(phase, Phase::Ready { ticks: 1 });
        fire(&mut phase, PhaseEvent::Elapsed);
        assert_eq!(phase, Phase::Playing);
    }

    #[test]
    fn test_clear_only_from_playing() {
        let mut phase = Phase::Playing;
        assert!(fire(&mut phase, PhaseEvent::Cleared { pause: 10 }));
        assert!(!fire(&mut phase, PhaseEvent::Cleared { pause: 10 }));
        assert_eq!(phase, Phase::WaveClear { ticks: 10 });
    }

    #[test]
    fn test_over_is_terminal() {
        let mut phase = Phase::GameOver { ticks: 1 };
        fire(&mut phase, PhaseEvent::Elapsed);
        assert_eq!(phase, Phase::Over);
        assert!(!fire(&mut phase, PhaseEvent::Resume));
    }

    #[test]
    fn test_pause_resume() {
        let mut phase = Phase::Playing;
        fire(&mut phase, PhaseEvent::Pause);
        assert!(!phase.advances_world());
        fire(&mut phase, PhaseEvent::Resume);
        assert_eq!(phase, Phase::Playing);
    }

    #[test]
    fn test_lives_bounded_at_zero() {
        let mut session = ScoreSession::new(1, None);
        assert_eq!(session.lose_life(), 0);
        assert_eq!(session.lose_life(), 0);
        assert!(session.is_out());
    }

    #[test]
    fn test_extra_life_thresholds() {
        let mut session = ScoreSession::new(3, Some(10_000));
        session.award(9_990);
        assert_eq!(session.lives(), 3);
        session.award(25_000);
        assert_eq!(session.lives(), 6);
    }

    #[test]
    fn test_scaling_clamps() {
        let faster = Scaling::new(20.0, -2.0, 8.0);
        assert_eq!(faster.ticks(0), 20);
        assert_eq!(faster.ticks(3), 14);
        assert_eq!(faster.ticks(50), 8);
        let more = Scaling::new(4.0, 2.0, 11.0);
        assert_eq!(more.count(10), 11);
    }

    proptest! {
        #[test]
        fn prop_score_never_decreases(awards in proptest::collection::vec(0u32..5_000, 0..64)) {
            let mut session = ScoreSession::new(3, Some(20_000));
            let mut last = session.score();
            for points in awards {
                session.award(points);
                prop_assert!(session.score() >= last);
                last = session.score();
            }
        }
    }
}
