//! Audio cues and the bridge to an injected audio port
//!
//! The simulation never touches audio resources. It emits `AudioCommand`s,
//! and the host forwards them to an `AudioBridge`, which owns the port,
//! opens it on first use and releases it on terminate.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebAudioPort;

/// Discrete one-shot cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    Move,
    Collect,
    Hit,
    PowerUp,
    WaveClear,
    GameOver,
}

/// Continuous cues with explicit start/stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoopCue {
    Hum,
    Siren,
}

/// Command emitted by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCommand {
    Play(Cue),
    StartLoop(LoopCue),
    StopLoop(LoopCue),
    StopAllLoops,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio unavailable: {0}")]
    Unavailable(String),
}

/// Backend that actually produces sound
pub trait AudioPort {
    /// Acquire the underlying audio context
    fn open(&mut self) -> Result<(), AudioError>;

    fn play(&mut self, cue: Cue, volume: f32);

    fn start_loop(&mut self, cue: LoopCue, volume: f32);

    fn stop_loop(&mut self, cue: LoopCue);

    /// Release the audio context; must be safe to call more than once
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortState {
    Closed,
    Open,
    /// Opening failed; the session continues silently
    Disabled,
}

/// Owns an `AudioPort` for the lifetime of a cabinet
pub struct AudioBridge {
    port: Box<dyn AudioPort>,
    state: PortState,
    loops: BTreeSet<LoopCue>,
    volume: f32,
    muted: bool,
}

impl AudioBridge {
    pub fn new(port: Box<dyn AudioPort>, volume: f32, muted: bool) -> Self {
        Self {
            port,
            state: PortState::Closed,
            loops: BTreeSet::new(),
            volume: volume.clamp(0.0, 1.0),
            muted,
        }
    }

    /// A bridge that never makes a sound
    pub fn silent() -> Self {
        Self::new(Box::new(NullAudio), 0.0, true)
    }

    fn ensure_open(&mut self) -> bool {
        match self.state {
            PortState::Open => true,
            PortState::Disabled => false,
            PortState::Closed => match self.port.open() {
                Ok(()) => {
                    self.state = PortState::Open;
                    true
                }
                Err(err) => {
                    log::warn!("{err}; continuing without sound");
                    self.state = PortState::Disabled;
                    false
                }
            },
        }
    }

    fn audible(&self) -> bool {
        !self.muted && self.volume > 0.0
    }

    pub fn apply(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Play(cue) => {
                if self.audible() && self.ensure_open() {
                    self.port.play(cue, self.volume);
                }
            }
            AudioCommand::StartLoop(cue) => {
                if self.loops.insert(cue) && self.audible() && self.ensure_open() {
                    self.port.start_loop(cue, self.volume);
                }
            }
            AudioCommand::StopLoop(cue) => {
                if self.loops.remove(&cue) && self.state == PortState::Open {
                    self.port.stop_loop(cue);
                }
            }
            AudioCommand::StopAllLoops => {
                for cue in std::mem::take(&mut self.loops) {
                    if self.state == PortState::Open {
                        self.port.stop_loop(cue);
                    }
                }
            }
        }
    }

    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = AudioCommand>) {
        for command in commands {
            self.apply(command);
        }
    }

    /// Silence (or restore) every cue; active loops resume on unmute
    pub fn set_muted(&mut self, muted: bool) {
        if muted == self.muted {
            return;
        }
        self.muted = muted;
        if self.loops.is_empty() {
            return;
        }
        if muted {
            if self.state == PortState::Open {
                for cue in self.loops.iter().copied() {
                    self.port.stop_loop(cue);
                }
            }
        } else if self.audible() && self.ensure_open() {
            for cue in self.loops.iter().copied() {
                self.port.start_loop(cue, self.volume);
            }
        }
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn is_disabled(&self) -> bool {
        self.state == PortState::Disabled
    }

    pub fn active_loops(&self) -> impl Iterator<Item = LoopCue> + '_ {
        self.loops.iter().copied()
    }

    /// Stop loops and close the port. The bridge may reopen on later use.
    pub fn release(&mut self) {
        self.apply(AudioCommand::StopAllLoops);
        if self.state == PortState::Open {
            self.port.close();
            log::debug!("audio port released");
        }
        if self.state != PortState::Disabled {
            self.state = PortState::Closed;
        }
    }
}

impl Drop for AudioBridge {
    fn drop(&mut self) {
        self.release();
    }
}

/// Port that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPort for NullAudio {
    fn open(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn play(&mut self, _cue: Cue, _volume: f32) {}

    fn start_loop(&mut self, _cue: LoopCue, _volume: f32) {}

    fn stop_loop(&mut self, _cue: LoopCue) {}

    fn close(&mut self) {}
}

/// What a `RecordingAudio` port observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEvent {
    Opened,
    Played(Cue),
    LoopStarted(LoopCue),
    LoopStopped(LoopCue),
    Closed,
}

/// Port that records calls into a shared log (tests and the headless runner)
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    log: Rc<RefCell<Vec<PortEvent>>>,
    fail_open: bool,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A port whose `open` always fails
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Shared handle to the event log; stays valid after the port is boxed
    pub fn events(&self) -> Rc<RefCell<Vec<PortEvent>>> {
        Rc::clone(&self.log)
    }

    fn record(&self, event: PortEvent) {
        self.log.borrow_mut().push(event);
    }
}

impl AudioPort for RecordingAudio {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.fail_open {
            return Err(AudioError::Unavailable("no audio device".into()));
        }
        self.record(PortEvent::Opened);
        Ok(())
    }

    fn play(&mut self, cue: Cue, _volume: f32) {
        self.record(PortEvent::Played(cue));
    }

    fn start_loop(&mut self, cue: LoopCue, _volume: f32) {
        self.record(PortEvent::LoopStarted(cue));
    }

    fn stop_loop(&mut self, cue: LoopCue) {
        self.record(PortEvent::LoopStopped(cue));
    }

    fn close(&mut self) {
        self.record(PortEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> (AudioBridge, Rc<RefCell<Vec<PortEvent>>>) {
        let port = RecordingAudio::new();
        let events = port.events();
        (AudioBridge::new(Box::new(port), 0.8, false), events)
    }

    #[test]
    fn test_opens_lazily() {
        let (mut bridge, events) = bridge();
        assert!(events.borrow().is_empty());
        bridge.apply(AudioCommand::Play(Cue::Move));
        assert_eq!(
            *events.borrow(),
            vec![PortEvent::Opened, PortEvent::Played(Cue::Move)]
        );
    }

    #[test]
    fn test_loops_are_idempotent() {
        let (mut bridge, events) = bridge();
        bridge.apply(AudioCommand::StopLoop(LoopCue::Siren));
        bridge.apply(AudioCommand::StartLoop(LoopCue::Siren));
        bridge.apply(AudioCommand::StartLoop(LoopCue::Siren));
        bridge.apply(AudioCommand::StopLoop(LoopCue::Siren));
        bridge.apply(AudioCommand::StopLoop(LoopCue::Siren));
        assert_eq!(
            *events.borrow(),
            vec![
                PortEvent::Opened,
                PortEvent::LoopStarted(LoopCue::Siren),
                PortEvent::LoopStopped(LoopCue::Siren),
            ]
        );
    }

    #[test]
    fn test_unavailable_port_degrades_silently() {
        let mut bridge = AudioBridge::new(Box::new(RecordingAudio::unavailable()), 1.0, false);
        bridge.apply(AudioCommand::Play(Cue::Hit));
        assert!(bridge.is_disabled());
        bridge.apply(AudioCommand::StartLoop(LoopCue::Hum));
        bridge.release();
        assert!(bridge.is_disabled());
    }

    #[test]
    fn test_mute_pauses_and_restores_loops() {
        let (mut bridge, events) = bridge();
        bridge.apply(AudioCommand::StartLoop(LoopCue::Hum));
        assert!(bridge.toggle_mute());
        bridge.apply(AudioCommand::Play(Cue::Collect));
        assert!(!bridge.toggle_mute());
        let log = events.borrow();
        assert_eq!(
            log[1..],
            [
                PortEvent::LoopStarted(LoopCue::Hum),
                PortEvent::LoopStopped(LoopCue::Hum),
                PortEvent::LoopStarted(LoopCue::Hum),
            ]
        );
    }

    #[test]
    fn test_release_on_drop() {
        let (mut bridge, events) = bridge();
        bridge.apply(AudioCommand::StartLoop(LoopCue::Siren));
        drop(bridge);
        let log = events.borrow();
        assert_eq!(
            log[log.len() - 2..],
            [PortEvent::LoopStopped(LoopCue::Siren), PortEvent::Closed]
        );
    }

    #[test]
    fn test_release_without_use_never_opens() {
        let (mut bridge, events) = bridge();
        bridge.release();
        assert!(events.borrow().is_empty());
    }
}
