//! Platform glue
//!
//! The page drives a cabinet with `requestAnimationFrame` timestamps and raw
//! key codes. `FrameTimer` turns timestamps into frame deltas and
//! `KeyTagger` turns key codes into sequenced intents; both are plain Rust
//! so they run (and are tested) natively. The wasm-bindgen handle lives in
//! `web`.

use std::time::Duration;

use crate::consts::{MAX_FRAME_DELTA, TICK};
use crate::input::{KeyBindings, TaggedIntent};

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebCabinet;

/// Millisecond timestamps to frame deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimer {
    last_ms: Option<f64>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the previous call; the first frame counts as one tick
    pub fn elapsed(&mut self, now_ms: f64) -> Duration {
        let previous = self.last_ms.replace(now_ms);
        let Some(last) = previous else {
            return TICK;
        };
        let dt = now_ms - last;
        if !dt.is_finite() || dt <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((dt / 1000.0).min(MAX_FRAME_DELTA.as_secs_f64()))
    }

    /// Forget the last timestamp (after the tab was hidden)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Resolves key codes through the bindings and numbers each intent
#[derive(Debug, Clone)]
pub struct KeyTagger {
    bindings: KeyBindings,
    next_seq: u64,
}

impl KeyTagger {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings, next_seq: 0 }
    }

    pub fn tag(&mut self, key: &str, down: bool) -> Option<TaggedIntent> {
        let intent = self.bindings.resolve(key)?;
        self.next_seq += 1;
        Some(if down {
            TaggedIntent::pressed(self.next_seq, intent)
        } else {
            TaggedIntent::released(self.next_seq, intent)
        })
    }
}
