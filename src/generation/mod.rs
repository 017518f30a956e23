//! Prompt-to-file generation.
//!
//! - [`AudioGenerator`]: the seam to the text-to-audio model
//! - [`pipeline::generate_audio`]: turns a list of prompts into named audio files
//! - [`progress::ProgressReporter`]: per-file progress and elapsed time

pub mod pipeline;
pub mod progress;

use crate::audio::AudioBuffer;
use crate::error::Result;

// Re-export commonly used items
pub use pipeline::{generate_audio, WrittenFile};
pub use progress::ProgressReporter;

/// Fixed generation settings, set once when a generator is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Seconds of audio to generate per prompt. Must be > 0.
    pub duration_sec: f32,
    /// Sampling seed. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            duration_sec: 5.0,
            seed: None,
        }
    }
}

/// One prompt submitted to a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Position of the prompt in the submitted sequence.
    pub id: usize,
    /// Text description of the audio to generate.
    pub prompt: String,
}

/// Audio produced for one request.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    /// The [`GenerationRequest::id`] this audio answers.
    pub request_id: usize,
    /// The generated signal.
    pub audio: AudioBuffer,
}

/// A text-to-audio model.
///
/// Implementations return exactly one [`GeneratedAudio`] per request,
/// tagged with the request's id. Results may come back in any order.
pub trait AudioGenerator {
    /// Sample rate of the generated audio, in Hz.
    fn sample_rate(&self) -> u32;

    /// Generates audio for every request in one blocking call.
    fn generate(&mut self, requests: &[GenerationRequest]) -> Result<Vec<GeneratedAudio>>;
}
