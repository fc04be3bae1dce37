pub mod buffer;
pub mod composer;
pub mod decode;
pub mod dsp;
pub mod error;
pub mod mood;
pub mod pipeline;

use crate::buffer::SampleBuffer;
use crate::pipeline::MixParameters;
use wasm_bindgen::prelude::*;

pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{EncodedAudio, produce, produce_from_bytes};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the dolor-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn params_from_js(params: JsValue) -> std::result::Result<MixParameters, JsValue> {
    if params.is_undefined() || params.is_null() {
        return Ok(MixParameters::default());
    }
    serde_wasm_bindgen::from_value(params).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: produce a mixed WAV from decoded mono voice samples.
///
/// `custom_track` holds the raw bytes of an uploaded instrumental, if any.
#[wasm_bindgen]
pub fn produce_wav(
    voice: &[f32],
    voice_sample_rate: u32,
    params: JsValue,
    custom_track: Option<Vec<u8>>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let params = params_from_js(params)?;
    let voice = SampleBuffer::mono(voice.to_vec(), voice_sample_rate);
    produce_from_bytes(voice, custom_track.as_deref(), &params)
        .map(|encoded| encoded.bytes)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: produce a mixed WAV from the speech service's base64
/// 16-bit mono PCM payload.
#[wasm_bindgen]
pub fn produce_wav_from_pcm(
    base64_pcm: &str,
    voice_sample_rate: u32,
    params: JsValue,
    custom_track: Option<Vec<u8>>,
) -> std::result::Result<Vec<u8>, JsValue> {
    let params = params_from_js(params)?;
    let voice = SampleBuffer::from_base64_pcm16(base64_pcm, voice_sample_rate, 1)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    produce_from_bytes(voice, custom_track.as_deref(), &params)
        .map(|encoded| encoded.bytes)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
