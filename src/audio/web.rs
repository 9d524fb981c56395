//! Web Audio backend
//!
//! Every cue is synthesised from oscillators; no sample files.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use super::{AudioError, AudioPort, Cue, LoopCue};

/// `AudioPort` backed by a browser `AudioContext`
#[derive(Default)]
pub struct WebAudioPort {
    ctx: Option<AudioContext>,
    hum: Option<(OscillatorNode, GainNode)>,
    siren: Option<(OscillatorNode, GainNode)>,
}

impl WebAudioPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn osc(ctx: &AudioContext, freq: f32, osc_type: OscillatorType) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Short enveloped note starting `delay` seconds from now
    fn blip(ctx: &AudioContext, freq: f32, osc_type: OscillatorType, vol: f32, delay: f64, len: f64) {
        let Some((osc, gain)) = Self::osc(ctx, freq, osc_type) else {
            return;
        };
        let t = ctx.current_time() + delay;
        gain.gain().set_value_at_time(vol, t).ok();
        gain.gain().exponential_ramp_to_value_at_time(0.01, t + len).ok();
        osc.start_with_when(t).ok();
        osc.stop_with_when(t + len + 0.05).ok();
    }

    /// Pitch sweep from `from` to `to` Hz
    fn sweep(ctx: &AudioContext, from: f32, to: f32, osc_type: OscillatorType, vol: f32, len: f64) {
        let Some((osc, gain)) = Self::osc(ctx, from, osc_type) else {
            return;
        };
        let t = ctx.current_time();
        gain.gain().set_value_at_time(vol, t).ok();
        gain.gain().exponential_ramp_to_value_at_time(0.01, t + len).ok();
        osc.frequency().set_value_at_time(from, t).ok();
        osc.frequency().exponential_ramp_to_value_at_time(to, t + len).ok();
        osc.start().ok();
        osc.stop_with_when(t + len + 0.05).ok();
    }

    fn slot(&mut self, cue: LoopCue) -> &mut Option<(OscillatorNode, GainNode)> {
        match cue {
            LoopCue::Hum => &mut self.hum,
            LoopCue::Siren => &mut self.siren,
        }
    }
}

impl AudioPort for WebAudioPort {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.ctx.is_some() {
            return Ok(());
        }
        let ctx = AudioContext::new().map_err(|e| AudioError::Unavailable(format!("{e:?}")))?;
        self.ctx = Some(ctx);
        Ok(())
    }

    fn play(&mut self, cue: Cue, vol: f32) {
        let Some(ctx) = &self.ctx else { return };

        // Browsers start the context suspended until a user gesture
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match cue {
            Cue::Move => Self::blip(ctx, 220.0, OscillatorType::Square, vol * 0.15, 0.0, 0.05),
            Cue::Collect => {
                for (i, freq) in [600.0, 800.0, 1000.0].iter().enumerate() {
                    Self::blip(ctx, *freq, OscillatorType::Sine, vol * 0.25, i as f64 * 0.06, 0.12);
                }
            }
            Cue::Hit => Self::sweep(ctx, 300.0, 40.0, OscillatorType::Sawtooth, vol * 0.4, 0.3),
            Cue::PowerUp => Self::sweep(ctx, 200.0, 900.0, OscillatorType::Triangle, vol * 0.3, 0.25),
            Cue::WaveClear => {
                for (i, freq) in [400.0, 500.0, 600.0, 800.0].iter().enumerate() {
                    Self::blip(ctx, *freq, OscillatorType::Triangle, vol * 0.3, i as f64 * 0.1, 0.4);
                }
            }
            Cue::GameOver => {
                for (i, freq) in [400.0, 350.0, 300.0, 200.0].iter().enumerate() {
                    Self::blip(ctx, *freq, OscillatorType::Sine, vol * 0.3, i as f64 * 0.2, 0.3);
                }
            }
        }
    }

    fn start_loop(&mut self, cue: LoopCue, vol: f32) {
        let Some(ctx) = self.ctx.clone() else { return };
        if self.slot(cue).is_some() {
            return;
        }
        let (freq, osc_type, level) = match cue {
            LoopCue::Hum => (110.0, OscillatorType::Triangle, 0.08),
            LoopCue::Siren => (440.0, OscillatorType::Sine, 0.05),
        };
        let Some((osc, gain)) = Self::osc(&ctx, freq, osc_type) else {
            return;
        };
        gain.gain().set_value(vol * level);
        if cue == LoopCue::Siren {
            // Wobble the pitch up and down for the siren
            let t = ctx.current_time();
            for i in 0..120 {
                let at = t + f64::from(i) * 0.25;
                let f = if i % 2 == 0 { 420.0 } else { 560.0 };
                osc.frequency().linear_ramp_to_value_at_time(f, at).ok();
            }
        }
        osc.start().ok();
        *self.slot(cue) = Some((osc, gain));
    }

    fn stop_loop(&mut self, cue: LoopCue) {
        if let Some((osc, gain)) = self.slot(cue).take() {
            osc.stop().ok();
            osc.disconnect().ok();
            gain.disconnect().ok();
        }
    }

    fn close(&mut self) {
        self.stop_loop(LoopCue::Hum);
        self.stop_loop(LoopCue::Siren);
        if let Some(ctx) = self.ctx.take() {
            let _ = ctx.close();
        }
    }
}
