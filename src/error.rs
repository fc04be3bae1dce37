use thiserror::Error;

/// Every way a production request can fail.
///
/// All stages are deterministic, so none of these are worth retrying with
/// unchanged input.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("voice recording is empty")]
    EmptyInput,

    #[error("expected a mono buffer, got {channels} channels")]
    UnsupportedChannelLayout { channels: usize },

    #[error("could not decode instrumental track: {0}")]
    DecodeFailure(String),

    #[error("{seconds:.2}s at {sample_rate} Hz exceeds the render limit of {limit} frames")]
    RenderingOverflow {
        seconds: f64,
        sample_rate: u32,
        limit: usize,
    },

    #[error("invalid mix parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::InvalidParameters(e.to_string())
    }
}

impl From<hound::Error> for PipelineError {
    fn from(e: hound::Error) -> Self {
        PipelineError::DecodeFailure(e.to_string())
    }
}
