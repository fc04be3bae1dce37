//! Instrumental composer — turns an emotion and a style into a list of
//! note events and renders them to a stereo backing track.

use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::buffer::{RENDER_SAMPLE_RATE, SampleBuffer, frame_budget};
use crate::dsp::engine::AudioEngine;
use crate::dsp::voice::{NoteEvent, VoiceKind};
use crate::error::Result;
use crate::mood::EmotionProfile;

/// Seconds rendered past the requested duration so the last notes can ring out.
pub const COMPOSER_TAIL: f64 = 3.0;

/// At or below this intensity the music is switched off.
pub const SILENCE_INTENSITY: f64 = 0.01;

/// Backing-track arrangement styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicStyle {
    Cinematic,
    Piano,
    Ambient,
    Minimal,
    Drone,
}

impl MusicStyle {
    /// Case-insensitive lookup by name.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cinematic" => Some(MusicStyle::Cinematic),
            "piano" => Some(MusicStyle::Piano),
            "ambient" => Some(MusicStyle::Ambient),
            "minimal" => Some(MusicStyle::Minimal),
            "drone" => Some(MusicStyle::Drone),
            _ => None,
        }
    }
}

/// Rough syllable rate of a script: vowel-run-delimited segments per second.
pub fn voice_density(script: &str, voice_duration: f64) -> f64 {
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut runs = 0usize;
    let mut in_run = false;
    for c in script.chars() {
        let v = is_vowel(c);
        if v && !in_run {
            runs += 1;
        }
        in_run = v;
    }
    let seconds = if voice_duration > 0.0 { voice_duration } else { 1.0 };
    (runs + 1) as f64 / seconds
}

/// Lay out every note of the arrangement.
///
/// `rng` is only consulted by the Ambient style.
pub fn schedule<R: Rng>(
    duration: f64,
    profile: &EmotionProfile,
    style: Option<MusicStyle>,
    rng: &mut R,
) -> Vec<NoteEvent> {
    let beat = profile.beat_time();
    let measure = profile.measure_time();
    let total_measures = (duration / measure).ceil() as usize + 1;

    let note = |kind, start, duration, frequency, volume, pan| NoteEvent {
        kind,
        start,
        duration,
        frequency,
        volume,
        pan,
    };

    let mut events = Vec::new();
    for m in 0..total_measures {
        let start = m as f64 * measure;
        let chord = profile.chord(m);

        match style {
            Some(MusicStyle::Cinematic) => {
                events.push(note(VoiceKind::Pad, start, measure, chord.root, 0.25, Some(-0.2)));
                events.push(note(VoiceKind::Pad, start, measure, chord.fifth, 0.2, Some(0.2)));
                if m % 2 == 0 {
                    events.push(note(VoiceKind::Pad, start, measure, chord.third, 0.15, Some(0.0)));
                }
            }
            Some(MusicStyle::Piano) => {
                let slice = measure / 4.0;
                let hits = [
                    (chord.root, 0.2, -0.1),
                    (chord.fifth, 0.15, 0.1),
                    (chord.third * 2.0, 0.15, 0.0),
                    (chord.fifth, 0.1, 0.1),
                ];
                for (k, (freq, vol, pan)) in hits.into_iter().enumerate() {
                    events.push(note(
                        VoiceKind::Piano,
                        start + slice * k as f64,
                        slice,
                        freq,
                        vol,
                        Some(pan),
                    ));
                }
            }
            Some(MusicStyle::Ambient) => {
                events.push(note(VoiceKind::Pad, start, measure, chord.root, 0.2, Some(0.0)));
                if rng.random::<f64>() > 0.5 {
                    events.push(note(
                        VoiceKind::Piano,
                        start + beat,
                        beat,
                        chord.fifth * 2.0,
                        0.1,
                        Some(0.3),
                    ));
                }
            }
            Some(MusicStyle::Minimal) => {
                if m % 2 == 0 {
                    events.push(note(VoiceKind::Piano, start, measure, chord.root, 0.2, Some(0.0)));
                }
            }
            Some(MusicStyle::Drone) => {
                if m == 0 {
                    let span = total_measures as f64 * measure;
                    let root = profile.root_frequency;
                    events.push(note(VoiceKind::Drone, 0.0, span, root, 0.25, None));
                    events.push(note(VoiceKind::Drone, 0.0, span, root * 1.5, 0.15, None));
                }
            }
            None => {}
        }
    }

    events
}

/// Procedural backing-track generator.
///
/// Holds no mutable state; every call builds its own generator from `seed`,
/// so identical arguments always produce identical audio.
#[derive(Debug, Clone)]
pub struct InstrumentalComposer {
    /// Rate of the silent buffer returned when music is off.
    pub caller_sample_rate: u32,
    /// Seed for the Ambient coin flips.
    pub seed: u64,
}

impl InstrumentalComposer {
    pub fn new(caller_sample_rate: u32, seed: u64) -> Self {
        InstrumentalComposer {
            caller_sample_rate,
            seed,
        }
    }

    /// Compose a stereo backing track for `duration` seconds of voice.
    ///
    /// With `intensity ≤ 0.01` this is exactly `duration` seconds of silence
    /// at the caller's rate. Otherwise it is `duration + 3 s` at 48 kHz.
    pub fn compose(
        &self,
        duration: f64,
        emotion: &str,
        style: &str,
        intensity: f64,
        voice_density: f64,
    ) -> Result<SampleBuffer> {
        if intensity <= SILENCE_INTENSITY {
            let frames = frame_budget(duration, self.caller_sample_rate)?.floor() as usize;
            debug!("music off, returning {frames} silent frames");
            return Ok(SampleBuffer::silent(2, frames, self.caller_sample_rate));
        }

        let frames = frame_budget(duration + COMPOSER_TAIL, RENDER_SAMPLE_RATE)?.floor() as usize;
        let profile = EmotionProfile::from_label(emotion);
        let music_style = MusicStyle::from_label(style);
        if music_style.is_none() {
            warn!("unknown music style {style:?}, rendering an empty arrangement");
        }

        let mut rng = Pcg32::seed_from_u64(self.seed);
        let events = schedule(duration, &profile, music_style, &mut rng);
        debug!(
            "composing {:?} / {emotion:?}: root {:.2} Hz, {} BPM, {} events, voice density {voice_density:.2}/s",
            music_style,
            profile.root_frequency,
            profile.tempo,
            events.len()
        );

        let master_gain = (intensity * 0.9).min(0.95);
        let engine = AudioEngine::new(RENDER_SAMPLE_RATE as f64, master_gain);
        let (left, right) = engine.render(&events, frames);
        SampleBuffer::from_channels(vec![left, right], RENDER_SAMPLE_RATE)
    }
}
