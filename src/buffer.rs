//! Planar floating-point audio buffers shared by every pipeline stage.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{PipelineError, Result};

/// Internal rendering rate of the composer and the rate of the final mix.
pub const RENDER_SAMPLE_RATE: u32 = 48_000;

/// Upper bound on the frames any stage will allocate (20 minutes at 48 kHz).
pub const MAX_RENDER_FRAMES: usize = 48_000 * 60 * 20;

/// Owned planar audio: one `Vec<f32>` per channel, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build from per-channel data. Rejects anything other than 1 or 2
    /// channels, channels of unequal length, or a zero sample rate.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if channels.is_empty() || channels.len() > 2 {
            return Err(PipelineError::UnsupportedChannelLayout {
                channels: channels.len(),
            });
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(PipelineError::InvalidParameters(
                "channel lengths differ".to_string(),
            ));
        }
        Ok(SampleBuffer {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            channels: vec![samples],
            sample_rate,
        }
    }

    /// A zeroed buffer.
    pub fn silent(channel_count: usize, frames: usize, sample_rate: u32) -> Self {
        SampleBuffer {
            channels: vec![vec![0.0; frames]; channel_count.clamp(1, 2)],
            sample_rate,
        }
    }

    /// Decode raw interleaved little-endian 16-bit PCM, as returned by the
    /// speech service. A trailing partial frame is dropped.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channel_count: usize) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if !(1..=2).contains(&channel_count) {
            return Err(PipelineError::UnsupportedChannelLayout {
                channels: channel_count,
            });
        }
        let frames = bytes.len() / (2 * channel_count);
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for (i, pair) in bytes.chunks_exact(2).take(frames * channel_count).enumerate() {
            let s = i16::from_le_bytes([pair[0], pair[1]]);
            channels[i % channel_count].push(s as f32 / 32768.0);
        }
        Ok(SampleBuffer {
            channels,
            sample_rate,
        })
    }

    /// Same as [`SampleBuffer::from_pcm16_le`], from a base64 payload.
    pub fn from_base64_pcm16(encoded: &str, sample_rate: u32, channel_count: usize) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| PipelineError::DecodeFailure(format!("invalid base64 PCM: {e}")))?;
        Self::from_pcm16_le(&bytes, sample_rate, channel_count)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Read a channel with linear interpolation at a fractional frame.
    /// The last frame is returned as-is; anything past it reads as 0.
    pub fn read_interpolated(&self, channel: usize, position: f64) -> f32 {
        let data = &self.channels[channel];
        if data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx + 1 >= data.len() {
            return if idx < data.len() { data[idx] } else { 0.0 };
        }

        let frac = (position - idx as f64) as f32;
        data[idx] * (1.0 - frac) + data[idx + 1] * frac
    }

    /// Linear-interpolation resample to `target_rate`.
    pub fn resampled(&self, target_rate: u32) -> Result<Self> {
        if target_rate == self.sample_rate || self.sample_rate == 0 {
            return Ok(self.clone());
        }
        let frames = (self.frames() as u64 * target_rate as u64 / self.sample_rate as u64) as usize;
        if frames > MAX_RENDER_FRAMES {
            return Err(PipelineError::RenderingOverflow {
                seconds: self.duration(),
                sample_rate: target_rate,
                limit: MAX_RENDER_FRAMES,
            });
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let channels = (0..self.channel_count())
            .map(|c| {
                (0..frames)
                    .map(|i| self.read_interpolated(c, i as f64 * ratio))
                    .collect()
            })
            .collect();
        Ok(SampleBuffer {
            channels,
            sample_rate: target_rate,
        })
    }
}

/// Fails with `InvalidParameters` for a zero sample rate.
pub fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(PipelineError::InvalidParameters(
            "sample rate must be non-zero".to_string(),
        ));
    }
    Ok(())
}

/// Validate a duration and return its exact frame count at `sample_rate`,
/// before anything is allocated. Callers choose floor or ceil.
pub fn frame_budget(seconds: f64, sample_rate: u32) -> Result<f64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(PipelineError::InvalidParameters(format!(
            "duration must be a non-negative number of seconds, got {seconds}"
        )));
    }
    let frames = seconds * sample_rate as f64;
    if frames.ceil() > MAX_RENDER_FRAMES as f64 {
        return Err(PipelineError::RenderingOverflow {
            seconds,
            sample_rate,
            limit: MAX_RENDER_FRAMES,
        });
    }
    Ok(frames)
}
