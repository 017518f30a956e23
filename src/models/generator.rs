//! ONNX-backed [`AudioGenerator`].

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::audio::AudioBuffer;
use crate::error::Result;
use crate::generation::{AudioGenerator, GeneratedAudio, GenerationParams, GenerationRequest};

use super::loader::GeneratorModels;

/// Runs the encoder, decoder and codec for each prompt.
#[derive(Debug)]
pub struct OnnxGenerator {
    models: GeneratorModels,
    params: GenerationParams,
    rng: ChaCha8Rng,
}

impl OnnxGenerator {
    /// Wraps loaded models with fixed generation settings.
    pub fn new(models: GeneratorModels, params: GenerationParams) -> Self {
        let rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { models, params, rng }
    }

    /// Version string of the loaded models.
    pub fn version(&self) -> &str {
        &self.models.version
    }

    fn generate_one(&mut self, request: &GenerationRequest) -> Result<GeneratedAudio> {
        let config = &self.models.config;
        let frames = config.tokens_for_duration(self.params.duration_sec);
        let sample_rate = config.sample_rate;

        tracing::debug!(id = request.id, prompt = %request.prompt, frames, "generating");

        let (hidden_states, attention_mask) = self.models.text_encoder.encode(&request.prompt)?;
        let tokens = self.models.decoder.generate_frames(
            hidden_states,
            attention_mask,
            frames,
            &mut self.rng,
        )?;
        let samples = self.models.audio_codec.decode(&tokens)?;

        Ok(GeneratedAudio {
            request_id: request.id,
            audio: mono_clip(samples, sample_rate, self.params.duration_sec),
        })
    }
}

impl AudioGenerator for OnnxGenerator {
    fn sample_rate(&self) -> u32 {
        self.models.config.sample_rate
    }

    fn generate(&mut self, requests: &[GenerationRequest]) -> Result<Vec<GeneratedAudio>> {
        let mut results = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let audio = self.generate_one(request)?;
            tracing::info!(
                "generated {}/{} ({:.2}s)",
                index + 1,
                requests.len(),
                audio.audio.duration_sec()
            );
            results.push(audio);
        }
        Ok(results)
    }
}

/// Wraps mono codec output, trimmed to exactly `duration_sec` seconds.
///
/// `ModelConfig::validate` only admits single-channel exports, so the
/// codec's `[1, 1, samples]` output is already in frame order.
fn mono_clip(mut samples: Vec<f32>, sample_rate: u32, duration_sec: f32) -> AudioBuffer {
    // The codec may overshoot by a partial frame.
    let wanted = (duration_sec as f64 * sample_rate as f64).round() as usize;
    samples.truncate(wanted);
    AudioBuffer::mono(sample_rate, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_is_trimmed_to_duration() {
        let audio = mono_clip(vec![0.1; 33_000], 32_000, 1.0);
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.frames(), 32_000);
        assert_eq!(audio.sample_rate(), 32_000);
    }

    #[test]
    fn short_codec_output_is_kept() {
        let audio = mono_clip(vec![0.1; 100], 16_000, 5.0);
        assert_eq!(audio.frames(), 100);
    }
}
