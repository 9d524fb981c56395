//! State machine plumbing shared by entity states and the session phase
//!
//! A machine is a `Copy` enum with a transition table expressed as
//! `Transition::next` over `Copy` events. Missing edges return `None` and are
//! dropped silently.

use std::fmt::Debug;

/// Transition table of a finite state machine driven by events `E`
pub trait Transition<E>: Sized + Copy + Debug {
    /// Next state for `event`, or `None` when the table has no such edge
    fn next(&self, event: E) -> Option<Self>;

    /// Terminal states accept no further events
    fn is_terminal(&self) -> bool;
}

/// Apply `event` to `state`; returns whether a transition happened
pub fn fire<S, E>(state: &mut S, event: E) -> bool
where
    S: Transition<E>,
    E: Copy + Debug,
{
    if state.is_terminal() {
        log::trace!("ignored {event:?} in terminal state {state:?}");
        return false;
    }
    match state.next(event) {
        Some(next) => {
            *state = next;
            true
        }
        None => {
            log::trace!("rejected {event:?} in state {state:?}");
            false
        }
    }
}

/// Per-entity countdown timer gating transitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Count down one tick; true exactly on the tick that reaches zero
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn reset(&mut self, ticks: u32) {
        self.remaining = ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Door {
        Open,
        Closed,
        Gone,
    }

    #[derive(Debug, Clone, Copy)]
    enum Push {
        Open,
        Close,
        Smash,
    }

    impl Transition<Push> for Door {
        fn next(&self, event: Push) -> Option<Self> {
            match (self, event) {
                (Door::Closed, Push::Open) => Some(Door::Open),
                (Door::Open, Push::Close) => Some(Door::Closed),
                (_, Push::Smash) => Some(Door::Gone),
                _ => None,
            }
        }

        fn is_terminal(&self) -> bool {
            *self == Door::Gone
        }
    }

    #[test]
    fn test_fire_follows_table() {
        let mut door = Door::Closed;
        assert!(fire(&mut door, Push::Open));
        assert_eq!(door, Door::Open);
        assert!(!fire(&mut door, Push::Open));
        assert_eq!(door, Door::Open);
    }

    #[test]
    fn test_terminal_rejects_everything() {
        let mut door = Door::Open;
        assert!(fire(&mut door, Push::Smash));
        assert!(!fire(&mut door, Push::Close));
        assert!(!fire(&mut door, Push::Smash));
        assert_eq!(door, Door::Gone);
    }

    #[test]
    fn test_countdown_fires_once() {
        let mut timer = Countdown::new(3);
        assert!(!timer.tick());
        assert!(!timer.tick());
        assert!(timer.tick());
        assert!(!timer.tick());
        assert!(timer.is_done());
    }
}
