//! The production pipeline: clean → (compose | adapt) → mix → encode.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::buffer::{RENDER_SAMPLE_RATE, SampleBuffer, check_sample_rate};
use crate::composer::{InstrumentalComposer, voice_density};
use crate::decode::decode_track;
use crate::dsp::{adapter, cleaner, mixer, renderer};
use crate::error::{PipelineError, Result};

/// Per-request settings, usually deserialized from the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MixParameters {
    pub emotion: String,
    pub style: String,
    /// Music level in [0, 1]; also the composer intensity.
    pub music_intensity: f64,
    /// Seconds of music to produce. Defaults to the voice duration.
    pub target_duration: Option<f64>,
    /// Seed for the compositional coin flips.
    pub seed: u64,
    /// The script that was spoken, used for the voice-density hint.
    pub script: Option<String>,
}

impl Default for MixParameters {
    fn default() -> Self {
        MixParameters {
            emotion: "Neutral".to_string(),
            style: "Cinematic".to_string(),
            music_intensity: 0.3,
            target_duration: None,
            seed: 0,
            script: None,
        }
    }
}

impl MixParameters {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn intensity(&self) -> Result<f64> {
        if !self.music_intensity.is_finite() {
            return Err(PipelineError::InvalidParameters(format!(
                "music intensity must be finite, got {}",
                self.music_intensity
            )));
        }
        Ok(self.music_intensity.clamp(0.0, 1.0))
    }
}

/// The finished production.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    /// Canonical 16-bit PCM WAV file.
    pub bytes: Vec<u8>,
    /// Length in seconds.
    pub duration: f64,
}

/// Run the whole pipeline on a decoded voice and optional decoded upload.
pub fn produce(
    voice: SampleBuffer,
    custom_track: Option<SampleBuffer>,
    params: &MixParameters,
) -> Result<EncodedAudio> {
    if voice.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    check_sample_rate(voice.sample_rate())?;
    if let Some(track) = &custom_track {
        check_sample_rate(track.sample_rate())?;
    }
    let intensity = params.intensity()?;

    let voice = cleaner::clean(voice)?;
    let target = params.target_duration.unwrap_or_else(|| voice.duration());

    let music = match custom_track {
        Some(track) => {
            let track = track.resampled(RENDER_SAMPLE_RATE)?;
            adapter::adapt(&track, target, RENDER_SAMPLE_RATE)?
        }
        None => {
            let density = params
                .script
                .as_deref()
                .map_or(0.0, |s| voice_density(s, voice.duration()));
            InstrumentalComposer::new(RENDER_SAMPLE_RATE, params.seed).compose(
                target,
                &params.emotion,
                &params.style,
                intensity,
                density,
            )?
        }
    };
    debug!(
        "voice {:.2}s @ {} Hz, music {:.2}s @ {} Hz",
        voice.duration(),
        voice.sample_rate(),
        music.duration(),
        music.sample_rate()
    );

    let mixed = mixer::mix(&voice, &music, intensity)?;
    let bytes = renderer::render_wav(&mixed)?;
    let duration = mixed.duration();
    info!("produced {duration:.2}s of audio ({} bytes)", bytes.len());

    Ok(EncodedAudio { bytes, duration })
}

/// Like [`produce`], with the upload still in its file format.
pub fn produce_from_bytes(
    voice: SampleBuffer,
    custom_track: Option<&[u8]>,
    params: &MixParameters,
) -> Result<EncodedAudio> {
    if voice.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    check_sample_rate(voice.sample_rate())?;
    let track = custom_track
        .map(|bytes| decode_track(bytes, RENDER_SAMPLE_RATE))
        .transpose()?;
    produce(voice, track, params)
}
