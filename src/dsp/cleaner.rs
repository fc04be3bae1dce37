//! Voice cleanup — a peak-follower gate that mutes hiss between phrases.

use log::debug;

use crate::buffer::SampleBuffer;
use crate::error::{PipelineError, Result};

/// Level above which a sample re-opens the gate (fraction of full scale).
pub const GATE_THRESHOLD: f32 = 0.002;
/// Per-sample decay of the gate once the signal drops below threshold.
pub const GATE_RELEASE: f32 = 0.9995;
/// Envelope values below this snap to exact silence.
pub const GATE_FLOOR: f32 = 0.001;

/// Sample-by-sample gate state.
#[derive(Debug, Clone, Default)]
pub struct NoiseGate {
    envelope: f32,
}

impl NoiseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gate gain in [0, 1].
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        if sample.abs() > GATE_THRESHOLD {
            self.envelope = 1.0;
        } else {
            self.envelope *= GATE_RELEASE;
        }
        if self.envelope < GATE_FLOOR {
            self.envelope = 0.0;
        }
        sample * self.envelope
    }
}

/// Gate a mono voice recording. Length and sample rate are preserved.
pub fn clean(buffer: SampleBuffer) -> Result<SampleBuffer> {
    if buffer.channel_count() != 1 {
        return Err(PipelineError::UnsupportedChannelLayout {
            channels: buffer.channel_count(),
        });
    }

    let sample_rate = buffer.sample_rate();
    let mut gate = NoiseGate::new();
    let cleaned: Vec<f32> = buffer.channel(0).iter().map(|&s| gate.process(s)).collect();
    debug!("cleaned {} voice frames at {sample_rate} Hz", cleaned.len());

    Ok(SampleBuffer::mono(cleaned, sample_rate))
}
