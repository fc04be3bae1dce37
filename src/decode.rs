//! Decoding of uploaded instrumental files into [`SampleBuffer`]s.
//!
//! WAV is always supported; MP3 needs the `mp3` feature. The decoded audio
//! is resampled to the caller's output rate.

use std::io::Cursor;

use log::{debug, warn};

use crate::buffer::{MAX_RENDER_FRAMES, SampleBuffer};
use crate::error::{PipelineError, Result};

/// Decode an uploaded track and resample it to `output_rate`.
///
/// Files with more than two channels keep their first two.
pub fn decode_track(bytes: &[u8], output_rate: u32) -> Result<SampleBuffer> {
    let decoded = if bytes.starts_with(b"RIFF") {
        decode_wav(bytes)?
    } else {
        decode_compressed(bytes)?
    };

    if decoded.is_empty() {
        return Err(PipelineError::DecodeFailure(
            "track decoded to zero frames".to_string(),
        ));
    }
    if decoded.sample_rate() != output_rate {
        warn!(
            "resampling uploaded track from {} Hz to {output_rate} Hz",
            decoded.sample_rate()
        );
    }
    decoded.resampled(output_rate)
}

fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(PipelineError::DecodeFailure("WAV declares zero channels".to_string()));
    }
    if reader.duration() as usize > MAX_RENDER_FRAMES {
        return Err(PipelineError::RenderingOverflow {
            seconds: reader.duration() as f64 / spec.sample_rate.max(1) as f64,
            sample_rate: spec.sample_rate,
            limit: MAX_RENDER_FRAMES,
        });
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
    };

    debug!(
        "decoded WAV: {} Hz, {channels} channel(s), {}-bit",
        spec.sample_rate, spec.bits_per_sample
    );
    deinterleave(&interleaved, channels, spec.sample_rate)
}

#[cfg(feature = "mp3")]
fn decode_compressed(bytes: &[u8]) -> Result<SampleBuffer> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut interleaved: Vec<f32> = Vec::new();
    let mut format: Option<(usize, u32)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let channels = frame.channels;
                let rate = frame.sample_rate as u32;
                match format {
                    None => format = Some((channels, rate)),
                    Some(f) if f != (channels, rate) => {
                        return Err(PipelineError::DecodeFailure(
                            "MP3 changes format mid-stream".to_string(),
                        ));
                    }
                    Some(_) => {}
                }
                interleaved.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
                if interleaved.len() / channels.max(1) > MAX_RENDER_FRAMES {
                    return Err(PipelineError::RenderingOverflow {
                        seconds: interleaved.len() as f64 / (channels.max(1) as f64 * rate.max(1) as f64),
                        sample_rate: rate,
                        limit: MAX_RENDER_FRAMES,
                    });
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => return Err(PipelineError::DecodeFailure(format!("MP3: {e:?}"))),
        }
    }

    let (channels, rate) = format.ok_or_else(|| {
        PipelineError::DecodeFailure("no MP3 frames found".to_string())
    })?;
    debug!("decoded MP3: {rate} Hz, {channels} channel(s)");
    deinterleave(&interleaved, channels, rate)
}

#[cfg(not(feature = "mp3"))]
fn decode_compressed(_bytes: &[u8]) -> Result<SampleBuffer> {
    Err(PipelineError::DecodeFailure(
        "unrecognized format (only WAV uploads are supported in this build)".to_string(),
    ))
}

fn deinterleave(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<SampleBuffer> {
    let kept = channels.min(2);
    let planar = (0..kept)
        .map(|c| interleaved.chunks_exact(channels).map(|frame| frame[c]).collect())
        .collect();
    SampleBuffer::from_channels(planar, sample_rate)
}
