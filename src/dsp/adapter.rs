//! Track adapter — loops an uploaded instrumental out to the target length.

use log::debug;

use crate::buffer::{SampleBuffer, frame_budget};
use crate::error::{PipelineError, Result};

/// Seconds of extra music rendered past the voice.
pub const ADAPTER_TAIL: f64 = 2.0;

/// Tile `source` into a stereo buffer of `target_duration + 2 s` at
/// `output_rate`. Channel `c` reads source channel `c mod n`; frame `i`
/// reads source frame `i mod len`. The loop seam is not cross-faded.
pub fn adapt(source: &SampleBuffer, target_duration: f64, output_rate: u32) -> Result<SampleBuffer> {
    if source.is_empty() {
        return Err(PipelineError::DecodeFailure(
            "instrumental track has no audio frames".to_string(),
        ));
    }

    let frames = frame_budget(target_duration + ADAPTER_TAIL, output_rate)?.ceil() as usize;
    let src_frames = source.frames();

    let channels = (0..2)
        .map(|c| {
            let data = source.channel(c % source.channel_count());
            (0..frames).map(|i| data[i % src_frames]).collect()
        })
        .collect();

    debug!(
        "looped {src_frames}-frame instrumental to {frames} frames ({} source channel(s))",
        source.channel_count()
    );
    SampleBuffer::from_channels(channels, output_rate)
}
