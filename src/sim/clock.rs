//! Fixed-rate simulation clock
//!
//! Real frame time is accumulated and converted into whole ticks. A partial
//! tick carries over to the next frame. Each frame is clamped to
//! `MAX_FRAME_DELTA` and yields at most `MAX_SUBSTEPS` ticks; backlog past
//! that cap is discarded, so a stalled host loses time instead of catching up.

use std::time::Duration;

use crate::consts::{MAX_FRAME_DELTA, MAX_SUBSTEPS, TICK};

/// Accumulates wall-clock time and emits whole simulation ticks
#[derive(Debug, Clone)]
pub struct SimClock {
    step: Duration,
    accumulator: Duration,
    ticks: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(TICK)
    }
}

impl SimClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            accumulator: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Feed `elapsed` real time, returning how many ticks to run (0..=MAX_SUBSTEPS)
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.min(MAX_FRAME_DELTA);

        let mut due = 0;
        while self.accumulator >= self.step && due < MAX_SUBSTEPS {
            self.accumulator -= self.step;
            due += 1;
        }
        // Backlog beyond the substep cap is dropped rather than replayed later
        if due == MAX_SUBSTEPS && self.accumulator >= self.step {
            log::debug!("clock dropped {:?} of backlog", self.accumulator);
            self.accumulator = Duration::ZERO;
        }

        self.ticks += u64::from(due);
        due
    }

    /// Total ticks emitted so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time banked toward the next tick
    pub fn pending(&self) -> Duration {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.ticks = 0;
    }
}

/// An integer multiple of the base tick (e.g. "move every 4 ticks")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period(u32);

impl Period {
    pub fn every(ticks: u32) -> Self {
        Self(ticks.max(1))
    }

    pub fn ticks(self) -> u32 {
        self.0
    }

    /// True on ticks that land on this period
    pub fn fires(self, tick: u64) -> bool {
        tick % u64::from(self.0) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_step_emits_one_tick() {
        let mut clock = SimClock::default();
        assert_eq!(clock.advance(TICK), 1);
        assert_eq!(clock.pending(), Duration::ZERO);
    }

    #[test]
    fn test_jitter_does_not_drift() {
        let mut clock = SimClock::new(Duration::from_millis(10));
        let frames = [7u64, 13, 9, 11, 4, 16, 10, 30];
        let total: u32 = frames
            .iter()
            .map(|ms| clock.advance(Duration::from_millis(*ms)))
            .sum();
        // 100ms of frames at a 10ms step
        assert_eq!(total, 10);
        assert_eq!(clock.ticks(), 10);
        assert_eq!(clock.pending(), Duration::ZERO);
    }

    #[test]
    fn test_short_frames_emit_zero_ticks() {
        let mut clock = SimClock::new(Duration::from_millis(10));
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(4)), 0);
        assert_eq!(clock.advance(Duration::from_millis(4)), 1);
    }

    #[test]
    fn test_substep_cap() {
        let mut clock = SimClock::new(Duration::from_millis(1));
        assert_eq!(clock.advance(Duration::from_secs(5)), MAX_SUBSTEPS);
        assert_eq!(clock.pending(), Duration::ZERO);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut clock = SimClock::new(Duration::from_millis(100));
        assert_eq!(clock.advance(Duration::from_secs(3)), 2);
        assert_eq!(clock.pending(), Duration::from_millis(50));
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_period_fires() {
        let p = Period::every(4);
        let hits: Vec<u64> = (1..=12).filter(|t| p.fires(*t)).collect();
        assert_eq!(hits, vec![4, 8, 12]);
        assert_eq!(Period::every(0).ticks(), 1);
    }
}
