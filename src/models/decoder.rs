//! Token decoder with KV cache support.
//!
//! Runs the split decoder export: `decoder_model.onnx` for the first step,
//! then `decoder_with_past_model.onnx` with the KV cache for every later step.

use std::borrow::Cow;
use std::path::Path;

use half::f16;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use rand::Rng;

use crate::error::{AudioGenError, Result};
use crate::types::{ModelConfig, CODEBOOKS};

use super::delay_pattern::CodebookDelay;
use super::logits::{Logits, DEFAULT_GUIDANCE_SCALE, DEFAULT_TOP_K};
use super::session::{load_session, SessionOptions};

const BOOKS: usize = CODEBOOKS as usize;

/// Decoder batch: every codebook, conditional and unconditional.
const BATCH: usize = BOOKS * 2;

/// One aligned frame of EnCodec codes.
pub type Frame = [i64; BOOKS];

/// Autoregressive decoder over the EnCodec codebooks.
pub struct TokenDecoder {
    decoder_model: Session,
    decoder_with_past: Session,
    config: ModelConfig,
}

impl std::fmt::Debug for TokenDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDecoder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenDecoder {
    /// Loads `decoder_model.onnx` and `decoder_with_past_model.onnx`.
    pub fn load(model_dir: &Path, config: ModelConfig, options: &SessionOptions) -> Result<Self> {
        let decoder_model = load_session(&model_dir.join("decoder_model.onnx"), options)?;
        let decoder_with_past =
            load_session(&model_dir.join("decoder_with_past_model.onnx"), options)?;

        Ok(Self {
            decoder_model,
            decoder_with_past,
            config,
        })
    }

    /// Generates `frames` aligned frames from encoder hidden states.
    ///
    /// The delay pattern costs `BOOKS - 1` steps before the first aligned
    /// frame appears, so the decoder runs `frames + BOOKS - 1` steps in total.
    pub fn generate_frames<R: Rng + ?Sized>(
        &mut self,
        encoder_hidden_states: DynValue,
        encoder_attention_mask: DynValue,
        frames: usize,
        rng: &mut R,
    ) -> Result<Vec<Frame>> {
        // The first pass produces one step; the cached loop produces the rest.
        let steps = frames + BOOKS - 2;
        let num_layers = self.config.num_hidden_layers as usize;
        let pad_token_id = self.config.pad_token_id;

        // Classifier-free guidance: conditional half, then a zeroed unconditional half.
        let encoder_hidden_states = duplicate_with_zeros(&encoder_hidden_states)?;
        let encoder_attention_mask = duplicate_with_zeros_typed::<i64>(&encoder_attention_mask)?;

        let initial_input_ids = Tensor::from_array(([BATCH, 1], vec![pad_token_id; BATCH]))
            .map_err(|e| tensor_error("input_ids", e))?;

        let mut outputs = self
            .decoder_model
            .run(vec![
                (
                    Cow::from("encoder_attention_mask"),
                    SessionInputValue::from(encoder_attention_mask.view()),
                ),
                (
                    Cow::from("encoder_hidden_states"),
                    SessionInputValue::from(encoder_hidden_states.view()),
                ),
                (
                    Cow::from("input_ids"),
                    SessionInputValue::from(initial_input_ids.view()),
                ),
            ])
            .map_err(|e| {
                AudioGenError::generation_failed(format!("Initial decoder inference failed: {}", e))
            })?;

        let mut delay = CodebookDelay::<BOOKS>::new();
        delay.push(sample_step(&mut outputs, rng)?);

        let mut kv_cache: Vec<(String, DynValue)> = Vec::with_capacity(num_layers * 4);
        for j in 0..num_layers {
            for part in ["decoder.key", "decoder.value", "encoder.key", "encoder.value"] {
                let value = take_output(&mut outputs, &format!("present.{j}.{part}"))?;
                kv_cache.push((format!("past_key_values.{j}.{part}"), value));
            }
        }
        drop(outputs);

        let mut frames_out = Vec::with_capacity(frames);

        for step in 0..steps {
            let [a, b, c, d] = delay.next_input(pad_token_id);
            let input_ids = Tensor::from_array(([BATCH, 1], vec![a, b, c, d, a, b, c, d]))
                .map_err(|e| tensor_error("input_ids", e))?;

            let mut session_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (Cow::from("input_ids"), SessionInputValue::from(input_ids.view())),
                (
                    Cow::from("encoder_attention_mask"),
                    SessionInputValue::from(encoder_attention_mask.view()),
                ),
            ];
            for (name, value) in &kv_cache {
                session_inputs.push((Cow::from(name.as_str()), SessionInputValue::from(value.view())));
            }

            let mut outputs = self.decoder_with_past.run(session_inputs).map_err(|e| {
                AudioGenError::generation_failed(format!(
                    "Decoder with past inference failed at step {}: {}",
                    step, e
                ))
            })?;

            delay.push(sample_step(&mut outputs, rng)?);
            if let Some(frame) = delay.last_aligned() {
                frames_out.push(frame);
            }

            // Only the self-attention cache grows; cross-attention entries stay as they are.
            for j in 0..num_layers {
                kv_cache[j * 4].1 = take_output(&mut outputs, &format!("present.{j}.decoder.key"))?;
                kv_cache[j * 4 + 1].1 =
                    take_output(&mut outputs, &format!("present.{j}.decoder.value"))?;
            }

            if step % 50 == 0 {
                tracing::trace!(step, steps, "decoder step");
            }
        }

        frames_out.truncate(frames);
        Ok(frames_out)
    }
}

/// Samples one token per codebook from the logits in `outputs`.
fn sample_step<R: Rng + ?Sized>(
    outputs: &mut ort::session::SessionOutputs,
    rng: &mut R,
) -> Result<Frame> {
    let logits_value = take_output(outputs, "logits")?;
    let tokens = Logits::from_3d_dyn_value(&logits_value)?
        .apply_free_guidance(DEFAULT_GUIDANCE_SCALE)?
        .sample_top_k(DEFAULT_TOP_K, rng)?;

    tokens.try_into().map_err(|tokens: Vec<i64>| {
        AudioGenError::generation_failed(format!(
            "expected {} codebook tokens, got {}",
            BOOKS,
            tokens.len()
        ))
    })
}

fn take_output(
    outputs: &mut ort::session::SessionOutputs,
    name: &str,
) -> Result<DynValue> {
    outputs
        .remove(name)
        .ok_or_else(|| AudioGenError::generation_failed(format!("{} not found in output", name)))
}

fn tensor_error(name: &str, e: impl std::fmt::Display) -> AudioGenError {
    AudioGenError::generation_failed(format!("Failed to create {}: {}", name, e))
}

/// Doubles the batch dimension, filling the new half with zeros.
/// Detects f16 vs f32 hidden states.
fn duplicate_with_zeros(tensor: &DynValue) -> Result<DynValue> {
    if let Ok(result) = duplicate_with_zeros_typed::<f16>(tensor) {
        return Ok(result);
    }
    duplicate_with_zeros_typed::<f32>(tensor)
}

fn duplicate_with_zeros_typed<T>(tensor: &DynValue) -> Result<DynValue>
where
    T: ort::tensor::PrimitiveTensorElementType + Clone + Default + std::fmt::Debug + 'static,
{
    let (shape, data) = tensor
        .try_extract_tensor::<T>()
        .map_err(|e| AudioGenError::generation_failed(format!("Failed to extract tensor: {}", e)))?;

    let mut new_shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
    if new_shape.is_empty() {
        return Err(AudioGenError::generation_failed("Cannot duplicate a scalar tensor"));
    }
    new_shape[0] *= 2;

    let combined: Vec<T> = data
        .iter()
        .cloned()
        .chain(std::iter::repeat(T::default()).take(data.len()))
        .collect();

    let result = Tensor::from_array((new_shape, combined))
        .map_err(|e| tensor_error("duplicated tensor", e))?;

    Ok(result.into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_covers_both_guidance_halves() {
        assert_eq!(BATCH, 8);
    }

    #[test]
    fn duplicate_doubles_batch_with_zeros() {
        let tensor = Tensor::from_array(([1usize, 3], vec![1i64, 1, 1])).unwrap();
        let doubled = duplicate_with_zeros_typed::<i64>(&tensor.into_dyn()).unwrap();
        let (shape, data) = doubled.try_extract_tensor::<i64>().unwrap();
        assert_eq!(shape.iter().copied().collect::<Vec<i64>>(), vec![2, 3]);
        assert_eq!(data, &[1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn duplicate_detects_f32_hidden_states() {
        let tensor = Tensor::from_array(([1usize, 2, 2], vec![0.5f32, 1.0, 1.5, 2.0])).unwrap();
        let doubled = duplicate_with_zeros(&tensor.into_dyn()).unwrap();
        let (_, data) = doubled.try_extract_tensor::<f32>().unwrap();
        assert_eq!(data.len(), 8);
        assert_eq!(&data[4..], &[0.0; 4]);
    }
}
