//! WAV renderer — serializes a finished buffer to canonical 16-bit PCM WAV.

use crate::buffer::SampleBuffer;
use crate::error::{PipelineError, Result};

/// Size of the canonical RIFF/WAVE header.
pub const WAV_HEADER_LEN: usize = 44;

/// Quantize one sample: clamp to [-1, 1], scale negatives by 32768 and
/// non-negatives by 32767, truncate toward zero.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    // NaN clamps to NaN and casts to 0
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode `frame_count` frames of `buffer` as a 44-byte-header PCM WAV.
///
/// Samples are interleaved channel by channel within each frame. Frames
/// past the end of the buffer are written as silence. Fails with
/// `RenderingOverflow` when the RIFF size fields cannot hold the data.
pub fn encode(buffer: &SampleBuffer, frame_count: usize) -> Result<Vec<u8>> {
    let channels = buffer.channel_count() as u16;
    let sample_rate = buffer.sample_rate();
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);

    let overflow = || PipelineError::RenderingOverflow {
        seconds: frame_count as f64 / sample_rate.max(1) as f64,
        sample_rate,
        limit: (u32::MAX - 36) as usize / block_align.max(1) as usize,
    };
    let data_size = frame_count
        .checked_mul(block_align as usize)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(overflow)?;
    let file_size = data_size.checked_add(36).ok_or_else(overflow)?;

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for frame in 0..frame_count {
        for c in 0..buffer.channel_count() {
            let sample = buffer.channel(c).get(frame).copied().unwrap_or(0.0);
            buf.extend_from_slice(&quantize(sample).to_le_bytes());
        }
    }

    Ok(buf)
}

/// Encode every frame of `buffer`.
pub fn render_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    encode(buffer, buffer.frames())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u16_at(wav: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([wav[at], wav[at + 1]])
    }

    fn u32_at(wav: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([wav[at], wav[at + 1], wav[at + 2], wav[at + 3]])
    }

    #[test]
    fn wav_header_valid() {
        let buffer = SampleBuffer::silent(2, 100, 48000);
        let wav = render_wav(&buffer).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 400);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 48000);
        assert_eq!(u32_at(&wav, 28), 48000 * 4);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 400);
        assert_eq!(wav.len(), WAV_HEADER_LEN + 400);
    }

    #[test]
    fn mono_header_fields() {
        let wav = render_wav(&SampleBuffer::mono(vec![0.0; 10], 24000)).unwrap();
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 28), 48000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(wav.len(), 44 + 20);
    }

    #[test]
    fn quantization_rules() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(2.5), 32767);
        assert_eq!(quantize(-7.0), -32768);
        assert_eq!(quantize(0.0), 0);
        // truncation toward zero on both sides
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(-0.00001), 0);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn frames_are_interleaved() {
        let buffer =
            SampleBuffer::from_channels(vec![vec![1.0, 0.0], vec![-1.0, 0.5]], 8000).unwrap();
        let wav = render_wav(&buffer).unwrap();
        let samples: Vec<i16> = wav[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0, 16383]);
    }

    #[test]
    fn extra_frames_are_silent() {
        let wav = encode(&SampleBuffer::mono(vec![0.5], 8000), 3).unwrap();
        assert_eq!(u32_at(&wav, 40), 6);
        assert_eq!(&wav[46..50], &[0, 0, 0, 0]);
    }

    #[test]
    fn oversized_frame_count_is_rejected_before_writing() {
        let stereo = SampleBuffer::silent(2, 4, 48000);
        // 4 bytes per frame: data size would exceed the 32-bit RIFF fields
        assert!(matches!(
            encode(&stereo, 1 << 30),
            Err(PipelineError::RenderingOverflow { .. })
        ));
        assert!(matches!(
            encode(&stereo, usize::MAX),
            Err(PipelineError::RenderingOverflow { .. })
        ));
        // the largest data chunk whose file size still fits
        let limit = (u32::MAX as usize - 36) / 4;
        assert!(matches!(
            encode(&stereo, limit + 1),
            Err(PipelineError::RenderingOverflow { limit: l, .. }) if l == limit
        ));
    }

    #[test]
    fn round_trips_through_hound() {
        let left: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.013).sin() * 0.8).collect();
        let right: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.007).cos() * -0.6).collect();
        let buffer = SampleBuffer::from_channels(vec![left.clone(), right.clone()], 44100).unwrap();
        let wav = render_wav(&buffer).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(wav)).expect("hound should parse header");
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded.len(), 4000);
        for (i, pair) in decoded.chunks_exact(2).enumerate() {
            for (c, original) in [left[i], right[i]].into_iter().enumerate() {
                let back = if pair[c] < 0 {
                    pair[c] as f32 / 32768.0
                } else {
                    pair[c] as f32 / 32767.0
                };
                assert!(
                    (back - original).abs() <= 1.0 / 32768.0 + 1e-6,
                    "frame {i} channel {c}: {original} → {back}"
                );
            }
        }
    }
}
