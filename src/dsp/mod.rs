//! DSP — pure Rust synthesis and processing for the production pipeline.
//!
//! Everything renders offline into freshly allocated buffers, so the same
//! input always yields the same samples whether called from WASM or natively.

pub mod adapter;
pub mod cleaner;
pub mod compressor;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod voice;
