//! Voice — one scheduled note rendered additively into the stereo bus.
//!
//! Every note event carries a [`VoiceKind`]; each kind builds its own
//! oscillator stack, filter, gain curve and stop time.

use std::f64::consts::FRAC_PI_2;

use super::envelope::Envelope;
use super::filter::{BiquadFilter, FilterType};
use super::oscillator::{Oscillator, Waveform};

/// Filter sweeps are re-evaluated once per block, like k-rate AudioParams.
pub const CONTROL_BLOCK: usize = 128;

/// Timbre families used by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    /// Sustained, detuned triangle stack with a slow filter sweep.
    Pad,
    /// Percussive sine hit with an exponential decay.
    Piano,
    /// Long low-passed sawtooth that fades in and out.
    Drone,
}

/// A declarative note: when, how long, what pitch, which timbre.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub kind: VoiceKind,
    /// Start time in seconds.
    pub start: f64,
    /// Nominal length in seconds; the envelope tail runs past it.
    pub duration: f64,
    pub frequency: f64,
    /// Peak gain.
    pub volume: f64,
    /// Stereo position in [-1, 1]; `None` feeds both channels at unity.
    pub pan: Option<f64>,
}

impl NoteEvent {
    /// When the note's sources stop, in seconds.
    pub fn stop_time(&self) -> f64 {
        match self.kind {
            VoiceKind::Pad => self.start + self.duration + 1.0,
            VoiceKind::Piano => self.start + 2.0,
            VoiceKind::Drone => self.start + self.duration + 2.0,
        }
    }
}

/// Equal-power gains for a mono source at `pan`.
pub fn pan_gains(pan: Option<f64>) -> (f64, f64) {
    match pan {
        None => (1.0, 1.0),
        Some(p) => {
            let x = (p.clamp(-1.0, 1.0) + 1.0) / 2.0;
            ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin())
        }
    }
}

/// A note prepared for rendering.
#[derive(Debug, Clone)]
pub struct Voice {
    oscillators: Vec<Oscillator>,
    filter: BiquadFilter,
    cutoff: Option<Envelope>,
    gain: Envelope,
    left_gain: f64,
    right_gain: f64,
    start: f64,
    stop: f64,
    sample_rate: f64,
}

impl Voice {
    pub fn new(event: &NoteEvent, sample_rate: f64) -> Self {
        match event.kind {
            VoiceKind::Pad => Self::pad(event, sample_rate),
            VoiceKind::Piano => Self::piano(event, sample_rate),
            VoiceKind::Drone => Self::drone(event, sample_rate),
        }
    }

    fn pad(event: &NoteEvent, sample_rate: f64) -> Self {
        let (t, dur, vol) = (event.start, event.duration, event.volume);
        let freq = if event.frequency < 100.0 {
            event.frequency * 2.0
        } else {
            event.frequency
        };

        let oscillators = [-5.0, 0.0, 5.0]
            .into_iter()
            .map(|cents| Oscillator::new(Waveform::Triangle, freq, sample_rate).with_detune(cents))
            .collect();

        let cutoff = Envelope::new(600.0)
            .set_value_at_time(600.0, t)
            .linear_ramp_to_value_at_time(1000.0, t + dur * 0.5)
            .linear_ramp_to_value_at_time(600.0, t + dur);

        let gain = Envelope::new(0.0)
            .set_value_at_time(0.0, t)
            .linear_ramp_to_value_at_time(vol, t + dur * 0.3)
            .set_value_at_time(vol, t + dur - dur * 0.3)
            .linear_ramp_to_value_at_time(0.0, t + dur + 0.5);

        Self::assemble(
            event,
            oscillators,
            BiquadFilter::with_params(FilterType::Lowpass, sample_rate, 600.0, 1.0, 0.0),
            Some(cutoff),
            gain,
            sample_rate,
        )
    }

    fn piano(event: &NoteEvent, sample_rate: f64) -> Self {
        let t = event.start;
        let gain = Envelope::new(0.0)
            .set_value_at_time(0.0, t)
            .linear_ramp_to_value_at_time(event.volume, t + 0.005)
            .exponential_ramp_to_value_at_time(0.01, t + 1.5);

        Self::assemble(
            event,
            vec![Oscillator::new(Waveform::Sine, event.frequency, sample_rate)],
            BiquadFilter::with_params(FilterType::Lowpass, sample_rate, 3000.0, 1.0, 0.0),
            None,
            gain,
            sample_rate,
        )
    }

    fn drone(event: &NoteEvent, sample_rate: f64) -> Self {
        let (t, dur) = (event.start, event.duration);
        let level = event.volume * 0.5;
        let gain = Envelope::new(0.0)
            .set_value_at_time(0.0, t)
            .linear_ramp_to_value_at_time(level, t + 2.0)
            .set_value_at_time(level, t + dur - 2.0)
            .linear_ramp_to_value_at_time(0.0, t + dur + 2.0);

        Self::assemble(
            event,
            vec![Oscillator::new(Waveform::Sawtooth, event.frequency, sample_rate)],
            BiquadFilter::with_params(FilterType::Lowpass, sample_rate, 250.0, 1.0, 0.0),
            None,
            gain,
            sample_rate,
        )
    }

    fn assemble(
        event: &NoteEvent,
        oscillators: Vec<Oscillator>,
        filter: BiquadFilter,
        cutoff: Option<Envelope>,
        gain: Envelope,
        sample_rate: f64,
    ) -> Self {
        let (left_gain, right_gain) = pan_gains(event.pan);
        Voice {
            oscillators,
            filter,
            cutoff,
            gain,
            left_gain,
            right_gain,
            start: event.start,
            stop: event.stop_time(),
            sample_rate,
        }
    }

    /// Accumulate this voice into the bus. Frames outside the bus are skipped.
    pub fn render_into(&mut self, left: &mut [f64], right: &mut [f64]) {
        let len = left.len().min(right.len());
        let first = ((self.start * self.sample_rate).ceil().max(0.0) as usize).min(len);
        let last = ((self.stop * self.sample_rate).ceil().max(0.0) as usize).min(len);

        for i in first..last {
            let t = i as f64 / self.sample_rate;

            if let Some(cutoff) = &self.cutoff {
                if (i - first) % CONTROL_BLOCK == 0 {
                    self.filter.set_frequency(cutoff.value_at(t));
                }
            }

            let raw: f64 = self.oscillators.iter_mut().map(Oscillator::next_sample).sum();
            let s = self.filter.process(raw) * self.gain.value_at(t);

            left[i] += s * self.left_gain;
            right[i] += s * self.right_gain;
        }
    }
}
