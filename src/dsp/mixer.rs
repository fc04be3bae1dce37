//! Mixer — lays the voice over the music with sidechain ducking.

use log::{debug, warn};

use crate::buffer::{MAX_RENDER_FRAMES, SampleBuffer, check_sample_rate};
use crate::error::{PipelineError, Result};

/// Hard ceiling applied to every mixed sample.
pub const MIX_CEILING: f32 = 0.99;
/// Follower coefficient while the voice is getting louder.
pub const DUCK_ATTACK: f32 = 0.01;
/// Follower coefficient while the voice is getting quieter.
pub const DUCK_RELEASE: f32 = 0.1;
/// Music is reduced by up to this fraction under full-scale voice.
pub const DUCK_DEPTH: f32 = 0.5;

/// Envelope follower on the voice that drives the music gain.
#[derive(Debug, Clone, Default)]
pub struct Sidechain {
    envelope: f32,
}

impl Sidechain {
    /// Feed one voice sample and return the music gain factor.
    #[inline]
    pub fn duck(&mut self, voice: f32) -> f32 {
        let level = voice.abs();
        let coef = if level > self.envelope {
            DUCK_ATTACK
        } else {
            DUCK_RELEASE
        };
        self.envelope += (level - self.envelope) * coef;
        1.0 - self.envelope * DUCK_DEPTH
    }
}

/// Perceptual slider curve: linear volume in, sub-linear gain out.
pub fn music_gain(music_volume: f64) -> f32 {
    music_volume.clamp(0.0, 1.0).powf(1.5) as f32
}

/// Mix a mono voice over an instrumental.
///
/// The output runs at the instrumental's rate for the longer of the two
/// durations. The voice is linearly resampled on the fly; the music is
/// ducked under it and scaled by [`music_gain`]; every sample is clamped
/// to ±[`MIX_CEILING`].
pub fn mix(voice: &SampleBuffer, instrumental: &SampleBuffer, music_volume: f64) -> Result<SampleBuffer> {
    if voice.channel_count() != 1 {
        return Err(PipelineError::UnsupportedChannelLayout {
            channels: voice.channel_count(),
        });
    }

    check_sample_rate(voice.sample_rate())?;
    check_sample_rate(instrumental.sample_rate())?;

    let out_rate = instrumental.sample_rate();
    let voice_rate = voice.sample_rate();
    let voice_frames = (voice.frames() as u64 * out_rate as u64 / voice_rate as u64) as usize;
    let frames = voice_frames.max(instrumental.frames());
    if frames > MAX_RENDER_FRAMES {
        return Err(PipelineError::RenderingOverflow {
            seconds: frames as f64 / out_rate as f64,
            sample_rate: out_rate,
            limit: MAX_RENDER_FRAMES,
        });
    }

    let ratio = voice_rate as f64 / out_rate as f64;
    let gain = music_gain(music_volume);
    let music_l = instrumental.channel(0);
    let music_r = instrumental.channel(instrumental.channel_count().min(2) - 1);

    let mut sidechain = Sidechain::default();
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    let mut clamped = 0usize;

    for i in 0..frames {
        let v = voice.read_interpolated(0, i as f64 * ratio);
        let duck = sidechain.duck(v);

        let ml = music_l.get(i).copied().unwrap_or(0.0) * gain;
        let mr = music_r.get(i).copied().unwrap_or(0.0) * gain;

        let l = v + ml * duck;
        let r = v + mr * duck;
        if l.abs() > MIX_CEILING || r.abs() > MIX_CEILING {
            clamped += 1;
        }
        left.push(l.clamp(-MIX_CEILING, MIX_CEILING));
        right.push(r.clamp(-MIX_CEILING, MIX_CEILING));
    }

    if clamped > 0 {
        warn!("mix ceiling engaged on {clamped} of {frames} frames");
    }
    debug!(
        "mixed {frames} frames at {out_rate} Hz (voice {voice_rate} Hz, music gain {gain:.3})"
    );

    SampleBuffer::from_channels(vec![left, right], out_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(l: Vec<f32>, r: Vec<f32>, rate: u32) -> SampleBuffer {
        SampleBuffer::from_channels(vec![l, r], rate).unwrap()
    }

    #[test]
    fn output_spans_longer_input() {
        let voice = SampleBuffer::mono(vec![0.1; 480], 48000);
        let music = SampleBuffer::silent(2, 960, 48000);
        assert_eq!(mix(&voice, &music, 0.5).unwrap().frames(), 960);

        let long_voice = SampleBuffer::mono(vec![0.1; 2000], 48000);
        let out = mix(&long_voice, &music, 0.5).unwrap();
        assert_eq!(out.frames(), 2000);
        assert_eq!(out.channel_count(), 2);
    }

    #[test]
    fn voice_is_resampled_to_music_rate() {
        let voice = SampleBuffer::mono(vec![0.0, 0.4, 0.0, -0.4], 24000);
        let music = SampleBuffer::silent(2, 2, 48000);
        let out = mix(&voice, &music, 0.0).unwrap();
        assert_eq!(out.frames(), 8);
        // the final source frame is held rather than interpolated
        let expected = [0.0, 0.2, 0.4, 0.2, 0.0, -0.2, -0.4, -0.4];
        for (got, want) in out.channel(0).iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn zero_volume_leaves_voice_alone() {
        let voice: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
        let music = stereo(vec![0.9; 1000], vec![-0.9; 1000], 48000);
        let out = mix(&SampleBuffer::mono(voice.clone(), 48000), &music, 0.0).unwrap();
        assert_eq!(out.channel(0), voice.as_slice());
        assert_eq!(out.channel(1), voice.as_slice());
    }

    #[test]
    fn output_is_clamped() {
        let voice = SampleBuffer::mono(vec![0.95; 500], 48000);
        let music = stereo(vec![1.0; 500], vec![-1.0; 500], 48000);
        let out = mix(&voice, &music, 1.0).unwrap();
        for c in 0..2 {
            for &s in out.channel(c) {
                assert!((-MIX_CEILING..=MIX_CEILING).contains(&s), "sample {s} escaped the clamp");
            }
        }
        assert_eq!(out.channel(0)[499], 0.99);
    }

    #[test]
    fn music_ducks_under_voice() {
        let n = 4800;
        let music = stereo(vec![0.2; n], vec![0.2; n], 48000);
        let quiet = mix(&SampleBuffer::mono(vec![0.0; n], 48000), &music, 1.0).unwrap();
        let loud = mix(&SampleBuffer::mono(vec![0.5; n], 48000), &music, 1.0).unwrap();

        assert!((quiet.channel(0)[n - 1] - 0.2).abs() < 1e-6);
        // envelope settles at 0.5 → duck 0.75 → 0.5 + 0.15
        assert!((loud.channel(0)[n - 1] - 0.65).abs() < 1e-3);
    }

    #[test]
    fn slider_curve() {
        assert_eq!(music_gain(0.0), 0.0);
        assert_eq!(music_gain(1.0), 1.0);
        assert!((music_gain(0.25) - 0.125).abs() < 1e-6);
        assert_eq!(music_gain(-3.0), 0.0);
    }

    #[test]
    fn mono_music_feeds_both_sides() {
        let voice = SampleBuffer::mono(vec![0.0; 10], 48000);
        let music = SampleBuffer::mono(vec![0.3; 10], 48000);
        let out = mix(&voice, &music, 1.0).unwrap();
        assert_eq!(out.channel(0), out.channel(1));
    }

    #[test]
    fn zero_rate_voice_is_rejected() {
        let voice = SampleBuffer::mono(vec![0.3; 10], 0);
        let music = SampleBuffer::silent(2, 10, 48000);
        assert!(matches!(
            mix(&voice, &music, 1.0),
            Err(PipelineError::InvalidParameters(_))
        ));
    }

    #[test]
    fn stereo_voice_is_rejected() {
        let voice = SampleBuffer::silent(2, 10, 48000);
        let music = SampleBuffer::silent(2, 10, 48000);
        assert!(mix(&voice, &music, 1.0).is_err());
    }
}
