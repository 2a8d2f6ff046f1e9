//! Audio cues using the Web Audio API
//!
//! Procedurally generated beeps, no external files. The race core only emits
//! [`EffectRequest`]s; this module maps them to short note sequences and, in
//! the browser, plays them through oscillators.

use crate::sim::{EffectRequest, Tier};

/// Base pitch of a donation beep; each lane is a step higher
const DONATION_BASE_HZ: f32 = 720.0;
const DONATION_LANE_STEP_HZ: f32 = 40.0;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Donation landed on a lane
    Donation { lane: usize, tier: Tier },
    /// First donation started the round
    RoundStart,
    /// A lane crossed the finish line
    Finish,
    /// Clock ran out
    TimeUp,
    /// Fresh round on the board
    RoundReset,
}

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Triangle,
}

/// One scheduled tone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub freq: f32,
    /// Start offset from now (seconds)
    pub delay: f64,
    pub duration: f64,
    /// Peak gain before volume scaling
    pub gain: f32,
    pub wave: Wave,
    /// Optional pitch glide target
    pub glide_to: Option<f32>,
}

impl Note {
    const fn tone(freq: f32, delay: f64, duration: f64, gain: f32, wave: Wave) -> Self {
        Self {
            freq,
            delay,
            duration,
            gain,
            wave,
            glide_to: None,
        }
    }
}

impl SoundEffect {
    /// Sound for an effect request
    pub fn for_request(request: &EffectRequest) -> Self {
        match *request {
            EffectRequest::Donation { lane, tier, .. } => SoundEffect::Donation { lane, tier },
            EffectRequest::RoundStarted { .. } => SoundEffect::RoundStart,
            EffectRequest::Finish { .. } => SoundEffect::Finish,
            EffectRequest::TimeUp => SoundEffect::TimeUp,
            EffectRequest::RoundReset { .. } => SoundEffect::RoundReset,
        }
    }

    /// Note sequence for this effect
    pub fn notes(&self) -> Vec<Note> {
        match *self {
            SoundEffect::Donation { lane, tier } => {
                let freq = DONATION_BASE_HZ + lane as f32 * DONATION_LANE_STEP_HZ;
                let mut notes = vec![Note::tone(freq, 0.0, 0.08, 0.25, Wave::Square)];
                match tier {
                    Tier::Small => {}
                    Tier::Medium => {
                        notes.push(Note::tone(freq * 1.5, 0.07, 0.08, 0.2, Wave::Square));
                    }
                    Tier::Large => notes.push(Note {
                        glide_to: Some(freq * 3.0),
                        ..Note::tone(freq, 0.06, 0.35, 0.3, Wave::Triangle)
                    }),
                }
                notes
            }
            SoundEffect::RoundStart => vec![Note {
                glide_to: Some(600.0),
                ..Note::tone(200.0, 0.0, 0.25, 0.3, Wave::Triangle)
            }],
            SoundEffect::Finish => [400.0, 500.0, 600.0, 800.0]
                .iter()
                .enumerate()
                .map(|(i, &f)| Note::tone(f, i as f64 * 0.1, 0.5, 0.3, Wave::Triangle))
                .collect(),
            SoundEffect::TimeUp => [400.0, 350.0, 300.0, 200.0]
                .iter()
                .enumerate()
                .map(|(i, &f)| Note::tone(f, i as f64 * 0.2, 0.4, 0.3, Wave::Sine))
                .collect(),
            SoundEffect::RoundReset => vec![Note::tone(300.0, 0.0, 0.1, 0.2, Wave::Sine)],
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{Note, SoundEffect, Wave};
    use crate::settings::Settings;
    use crate::sim::EffectRequest;

    /// Audio manager for the race
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        volume: f32,
    }

    impl AudioManager {
        pub fn new(settings: &Settings) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: settings.effective_volume(),
            }
        }

        pub fn apply_settings(&mut self, settings: &Settings) {
            self.volume = settings.effective_volume();
        }

        /// Resume audio context (required after a user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        /// Play whatever the race asked for this frame
        pub fn play_requests(&self, requests: &[EffectRequest]) {
            for request in requests {
                self.play(SoundEffect::for_request(request));
            }
        }

        pub fn play(&self, effect: SoundEffect) {
            if self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            for note in effect.notes() {
                self.play_note(ctx, &note);
            }
        }

        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn play_note(&self, ctx: &AudioContext, note: &Note) {
            let osc_type = match note.wave {
                Wave::Sine => OscillatorType::Sine,
                Wave::Square => OscillatorType::Square,
                Wave::Triangle => OscillatorType::Triangle,
            };
            let Some((osc, gain)) = self.create_osc(ctx, note.freq, osc_type) else {
                return;
            };
            let t = ctx.current_time() + note.delay;
            let end = t + note.duration;

            gain.gain().set_value_at_time(note.gain * self.volume, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
            if let Some(target) = note.glide_to {
                osc.frequency().set_value_at_time(note.freq, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(target, end)
                    .ok();
            }

            osc.start_with_when(t).ok();
            osc.stop_with_when(end + 0.05).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_donation_pitch_rises_with_lane() {
        let low = SoundEffect::Donation {
            lane: 0,
            tier: Tier::Small,
        };
        let high = SoundEffect::Donation {
            lane: 5,
            tier: Tier::Small,
        };
        assert_eq!(low.notes()[0].freq, 720.0);
        assert_eq!(high.notes()[0].freq, 920.0);
        assert_eq!(low.notes()[0].wave, Wave::Square);
    }

    #[test]
    fn test_bigger_tiers_add_notes() {
        let notes = |tier| SoundEffect::Donation { lane: 2, tier }.notes();
        assert_eq!(notes(Tier::Small).len(), 1);
        assert_eq!(notes(Tier::Medium).len(), 2);
        let nitro = notes(Tier::Large);
        assert_eq!(nitro.len(), 2);
        assert_eq!(nitro[1].glide_to, Some(800.0 * 3.0));
    }

    #[test]
    fn test_request_mapping() {
        let request = EffectRequest::Donation {
            lane: 3,
            amount: 20,
            tier: Tier::Large,
        };
        assert_eq!(
            SoundEffect::for_request(&request),
            SoundEffect::Donation {
                lane: 3,
                tier: Tier::Large
            }
        );
        assert_eq!(
            SoundEffect::for_request(&EffectRequest::Finish { lane: 1 }),
            SoundEffect::Finish
        );
        assert_eq!(
            SoundEffect::for_request(&EffectRequest::TimeUp),
            SoundEffect::TimeUp
        );
    }

    #[test]
    fn test_sequences_are_staggered() {
        for effect in [SoundEffect::Finish, SoundEffect::TimeUp] {
            let notes = effect.notes();
            assert!(notes.windows(2).all(|w| w[1].delay > w[0].delay));
        }
    }
}
