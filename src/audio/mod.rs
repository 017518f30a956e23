//! Audio buffers, normalization and WAV output.

pub mod buffer;
pub mod normalize;
pub mod wav;

// Re-export commonly used items
pub use buffer::AudioBuffer;
pub use normalize::{integrated_loudness, normalize, NormalizationStrategy};
pub use wav::{write_wav, AudioSink, SampleEncoding, WavSink, WriteOptions, WAV_EXTENSION};
