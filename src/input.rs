//! Input intents
//!
//! The host maps device events to a small intent vocabulary and tags each one
//! with a monotonic sequence number. Intents queue between ticks and are
//! applied atomically at the start of the next tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::{Direction, TickInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Up,
    Down,
    Left,
    Right,
    /// Fire / confirm
    Fire,
    Cancel,
    MuteToggle,
}

impl Intent {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Intent::Up => Some(Direction::Up),
            Intent::Down => Some(Direction::Down),
            Intent::Left => Some(Direction::Left),
            Intent::Right => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Pressed,
    Released,
}

/// An intent as forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedIntent {
    pub seq: u64,
    pub intent: Intent,
    pub action: Action,
}

impl TaggedIntent {
    pub fn pressed(seq: u64, intent: Intent) -> Self {
        Self {
            seq,
            intent,
            action: Action::Pressed,
        }
    }

    pub fn released(seq: u64, intent: Intent) -> Self {
        Self {
            seq,
            intent,
            action: Action::Released,
        }
    }
}

/// Everything the cabinet needs from one tick's worth of intents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameIntents {
    pub input: TickInput,
    pub cancel: bool,
    pub mute_toggle: bool,
}

/// Pending intents plus the held state that persists between ticks
#[derive(Debug, Default)]
pub struct IntentQueue {
    pending: Vec<TaggedIntent>,
    last_applied: Option<u64>,
    held: TickInput,
}

impl IntentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an intent; duplicates and already-applied ids are dropped
    pub fn push(&mut self, intent: TaggedIntent) -> bool {
        let stale = self.last_applied.is_some_and(|last| intent.seq <= last);
        if stale || self.pending.iter().any(|p| p.seq == intent.seq) {
            log::trace!("dropping intent {:?} (seq {})", intent.intent, intent.seq);
            return false;
        }
        self.pending.push(intent);
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Apply pending intents in sequence order and return this tick's input
    pub fn take(&mut self) -> FrameIntents {
        self.pending.sort_by_key(|p| p.seq);
        let mut frame = FrameIntents::default();
        self.held.clear_momentary();

        for tagged in self.pending.drain(..) {
            self.last_applied = Some(tagged.seq);
            let down = tagged.action == Action::Pressed;
            if let Some(direction) = tagged.intent.direction() {
                self.held.hold(direction, down);
                if down {
                    self.held.pressed = Some(direction);
                }
                continue;
            }
            match (tagged.intent, down) {
                (Intent::Fire, true) => {
                    self.held.fire = true;
                    self.held.fire_held = true;
                }
                (Intent::Fire, false) => self.held.fire_held = false,
                (Intent::Cancel, true) => frame.cancel = true,
                (Intent::MuteToggle, true) => frame.mute_toggle = true,
                _ => {}
            }
        }

        frame.input = self.held;
        frame
    }

    /// Forget held keys (focus loss)
    pub fn release_all(&mut self) {
        self.held = TickInput::default();
    }
}

/// Device key name to intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<String, Intent>);

impl Default for KeyBindings {
    fn default() -> Self {
        let pairs = [
            ("ArrowUp", Intent::Up),
            ("ArrowDown", Intent::Down),
            ("ArrowLeft", Intent::Left),
            ("ArrowRight", Intent::Right),
            ("KeyW", Intent::Up),
            ("KeyS", Intent::Down),
            ("KeyA", Intent::Left),
            ("KeyD", Intent::Right),
            ("Space", Intent::Fire),
            ("Enter", Intent::Fire),
            ("Escape", Intent::Cancel),
            ("KeyM", Intent::MuteToggle),
        ];
        Self(pairs.into_iter().map(|(k, i)| (k.to_string(), i)).collect())
    }
}

impl KeyBindings {
    pub fn resolve(&self, key: &str) -> Option<Intent> {
        self.0.get(key).copied()
    }

    pub fn bind(&mut self, key: impl Into<String>, intent: Intent) {
        self.0.insert(key.into(), intent);
    }

    pub fn unbind(&mut self, key: &str) -> Option<Intent> {
        self.0.remove(key)
    }

    pub fn keys_for(&self, intent: Intent) -> impl Iterator<Item = &str> {
        self.0.iter().filter(move |(_, i)| **i == intent).map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_dropped() {
        let mut queue = IntentQueue::new();
        assert!(queue.push(TaggedIntent::pressed(1, Intent::Fire)));
        assert!(!queue.push(TaggedIntent::pressed(1, Intent::Fire)));
        queue.take();
        assert!(!queue.push(TaggedIntent::pressed(1, Intent::Fire)));
        assert!(queue.push(TaggedIntent::pressed(2, Intent::Fire)));
    }

    #[test]
    fn test_out_of_order_applied_by_seq() {
        let mut queue = IntentQueue::new();
        queue.push(TaggedIntent::released(5, Intent::Left));
        queue.push(TaggedIntent::pressed(4, Intent::Left));
        let frame = queue.take();
        assert!(!frame.input.is_held(Direction::Left));
        assert_eq!(frame.input.pressed, Some(Direction::Left));
    }

    #[test]
    fn test_held_persists_press_does_not() {
        let mut queue = IntentQueue::new();
        queue.push(TaggedIntent::pressed(1, Intent::Right));
        queue.push(TaggedIntent::pressed(2, Intent::Fire));
        let first = queue.take();
        assert!(first.input.fire);
        assert_eq!(first.input.pressed, Some(Direction::Right));

        let second = queue.take();
        assert!(!second.input.fire);
        assert!(second.input.fire_held);
        assert_eq!(second.input.pressed, None);
        assert!(second.input.is_held(Direction::Right));
    }

    #[test]
    fn test_cancel_and_mute_are_momentary() {
        let mut queue = IntentQueue::new();
        queue.push(TaggedIntent::pressed(1, Intent::Cancel));
        queue.push(TaggedIntent::pressed(2, Intent::MuteToggle));
        let frame = queue.take();
        assert!(frame.cancel && frame.mute_toggle);
        assert_eq!(queue.take(), FrameIntents::default());
    }

    #[test]
    fn test_default_bindings() {
        let mut keys = KeyBindings::default();
        assert_eq!(keys.resolve("ArrowUp"), Some(Intent::Up));
        assert_eq!(keys.resolve("KeyQ"), None);
        keys.bind("KeyQ", Intent::Cancel);
        assert_eq!(keys.keys_for(Intent::Cancel).count(), 2);
        let json = serde_json::to_string(&keys).unwrap_or_default();
        assert!(json.contains("\"Space\":\"Fire\""));
    }
}
