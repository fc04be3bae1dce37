//! Audio Engine — renders a list of note events to a stereo buffer.
//!
//! Every event is rendered additively into a double-precision bus, which
//! then runs through the fixed master chain: vocal scoop, rumble high-pass,
//! air shelf, and bus compressor.

use log::debug;

use super::compressor::Compressor;
use super::filter::{BiquadFilter, FilterType};
use super::voice::{NoteEvent, Voice};

/// Centre of the mid-range cut that leaves room for speech.
pub const SCOOP_FREQUENCY: f64 = 1200.0;
pub const SCOOP_GAIN_DB: f64 = -6.0;
pub const RUMBLE_CUTOFF: f64 = 100.0;
pub const AIR_FREQUENCY: f64 = 8000.0;
pub const AIR_GAIN_DB: f64 = 1.5;

/// Post-processing applied to the whole music bus.
#[derive(Debug, Clone)]
pub struct MasterChain {
    gain: f64,
    scoop: [BiquadFilter; 2],
    rumble: [BiquadFilter; 2],
    air: [BiquadFilter; 2],
    compressor: Compressor,
}

impl MasterChain {
    pub fn new(sample_rate: f64, gain: f64) -> Self {
        let scoop = BiquadFilter::with_params(
            FilterType::Peaking,
            sample_rate,
            SCOOP_FREQUENCY,
            1.0,
            SCOOP_GAIN_DB,
        );
        let rumble =
            BiquadFilter::with_params(FilterType::Highpass, sample_rate, RUMBLE_CUTOFF, 1.0, 0.0);
        let air = BiquadFilter::with_params(
            FilterType::HighShelf,
            sample_rate,
            AIR_FREQUENCY,
            1.0,
            AIR_GAIN_DB,
        );

        MasterChain {
            gain,
            scoop: [scoop.clone(), scoop],
            rumble: [rumble.clone(), rumble],
            air: [air.clone(), air],
            compressor: Compressor::new(sample_rate, -24.0, 3.0, 0.03, 0.15),
        }
    }

    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let mut out = [left * self.gain, right * self.gain];
        for (c, s) in out.iter_mut().enumerate() {
            *s = self.scoop[c].process(*s);
            *s = self.rumble[c].process(*s);
            *s = self.air[c].process(*s);
        }
        self.compressor.process(out[0], out[1])
    }
}

/// Offline renderer for note events.
#[derive(Debug, Clone)]
pub struct AudioEngine {
    pub sample_rate: f64,
    /// Bus gain applied before the master chain.
    pub master_gain: f64,
}

impl AudioEngine {
    pub fn new(sample_rate: f64, master_gain: f64) -> Self {
        AudioEngine {
            sample_rate,
            master_gain,
        }
    }

    /// Render `events` into `frames` stereo frames.
    pub fn render(&self, events: &[NoteEvent], frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0_f64; frames];
        let mut right = vec![0.0_f64; frames];

        for event in events {
            Voice::new(event, self.sample_rate).render_into(&mut left, &mut right);
        }
        debug!("rendered {} note events into {frames} frames", events.len());

        let mut chain = MasterChain::new(self.sample_rate, self.master_gain);
        left.iter()
            .zip(right.iter())
            .map(|(&l, &r)| {
                let (l, r) = chain.process(l, r);
                (l as f32, r as f32)
            })
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::voice::VoiceKind;

    fn hit(start: f64) -> NoteEvent {
        NoteEvent {
            kind: VoiceKind::Piano,
            start,
            duration: 0.5,
            frequency: 440.0,
            volume: 0.2,
            pan: Some(0.0),
        }
    }

    #[test]
    fn empty_event_list_renders_silence() {
        let engine = AudioEngine::new(48000.0, 0.9);
        let (l, r) = engine.render(&[], 4800);
        assert_eq!(l.len(), 4800);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn render_produces_output() {
        let engine = AudioEngine::new(48000.0, 0.9);
        let (l, r) = engine.render(&[hit(0.0)], 48000);
        assert!(l.iter().any(|s| s.abs() > 0.01));
        assert!(r.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn render_is_deterministic() {
        let engine = AudioEngine::new(48000.0, 0.9);
        let events = [hit(0.0), hit(0.25)];
        assert_eq!(engine.render(&events, 24000), engine.render(&events, 24000));
    }

    #[test]
    fn zero_master_gain_silences_bus() {
        let engine = AudioEngine::new(48000.0, 0.0);
        let (l, _) = engine.render(&[hit(0.0)], 24000);
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn chain_removes_dc() {
        let mut chain = MasterChain::new(48000.0, 1.0);
        let mut out = (1.0, 1.0);
        for _ in 0..96000 {
            out = chain.process(0.1, 0.1);
        }
        assert!(out.0.abs() < 1e-3, "DC should be removed by the high-pass, got {}", out.0);
    }

    #[test]
    fn chain_scoops_speech_band() {
        let sr = 48000.0;
        let peak = |freq: f64| {
            let mut chain = MasterChain::new(sr, 1.0);
            let mut max_out = 0.0_f64;
            for i in 0..48000 {
                // quiet enough to stay under the compressor's knee
                let s = 0.01 * (2.0 * std::f64::consts::PI * freq * i as f64 / sr).sin();
                let (l, _) = chain.process(s, s);
                if i > 24000 {
                    max_out = max_out.max(l.abs());
                }
            }
            max_out
        };
        assert!(peak(1200.0) < peak(400.0), "1200 Hz should sit below 400 Hz");
    }
}
