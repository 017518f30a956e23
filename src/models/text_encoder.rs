//! Text encoder wrapper.
//!
//! Handles tokenization and T5 text encoding for prompts.

use std::path::Path;

use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokenizers::Tokenizer;

use crate::error::{AudioGenError, Result};

use super::session::{load_session, SessionOptions};

/// Prompt encoder combining the tokenizer and the T5 encoder graph.
pub struct TextEncoder {
    tokenizer: Tokenizer,
    text_encoder: Session,
}

impl std::fmt::Debug for TextEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEncoder").finish_non_exhaustive()
    }
}

impl TextEncoder {
    /// Loads `tokenizer.json` and `text_encoder.onnx` from `model_dir`.
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        let tokenizer_path = model_dir.join("tokenizer.json");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            AudioGenError::model_load_failed(format!("Failed to load tokenizer: {}", e))
        })?;

        tokenizer
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| {
                AudioGenError::model_load_failed(format!("Failed to configure tokenizer: {}", e))
            })?;

        let text_encoder = load_session(&model_dir.join("text_encoder.onnx"), options)?;

        Ok(Self {
            tokenizer,
            text_encoder,
        })
    }

    /// Encodes a prompt into encoder hidden states and an attention mask.
    ///
    /// Returns `(last_hidden_state, attention_mask)` with batch size 1.
    pub fn encode(&mut self, text: &str) -> Result<(DynValue, DynValue)> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| AudioGenError::generation_failed(format!("Tokenization failed: {}", e)))?
            .get_ids()
            .iter()
            .map(|&id| id as i64)
            .collect::<Vec<_>>();

        let tokens_len = tokens.len();
        if tokens_len == 0 {
            return Err(AudioGenError::generation_failed(format!(
                "prompt {:?} produced no tokens",
                text
            )));
        }

        let input_ids = Tensor::from_array(([1, tokens_len], tokens)).map_err(|e| {
            AudioGenError::generation_failed(format!("Failed to create input tensor: {}", e))
        })?;

        let attention_mask = Tensor::from_array(([1, tokens_len], vec![1i64; tokens_len]))
            .map_err(|e| {
                AudioGenError::generation_failed(format!("Failed to create attention mask: {}", e))
            })?;

        let mut output = self
            .text_encoder
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|e| {
                AudioGenError::generation_failed(format!("Text encoder inference failed: {}", e))
            })?;

        let last_hidden_state = output.remove("last_hidden_state").ok_or_else(|| {
            AudioGenError::generation_failed("last_hidden_state not found in output")
        })?;

        // The decoder takes its own copy of the mask; the one above was moved into the run.
        let decoder_attention_mask = Tensor::from_array(([1, tokens_len], vec![1i64; tokens_len]))
            .map_err(|e| {
                AudioGenError::generation_failed(format!(
                    "Failed to create decoder attention mask: {}",
                    e
                ))
            })?;

        Ok((last_hidden_state, decoder_attention_mask.into_dyn()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::path::PathBuf;

    fn get_model_dir() -> Option<PathBuf> {
        let path = AppConfig::from_env().effective_model_path();
        if path.join("text_encoder.onnx").exists() {
            Some(path)
        } else {
            None
        }
    }

    #[test]
    fn text_encoder_encodes_prompt() {
        let Some(model_dir) = get_model_dir() else {
            eprintln!("Skipping test: models not found");
            return;
        };

        let mut encoder = TextEncoder::load(&model_dir, &SessionOptions::default()).unwrap();
        let (hidden_state, attention_mask) = encoder.encode("dog barking").unwrap();
        assert!(
            hidden_state.try_extract_tensor::<f32>().is_ok()
                || hidden_state.try_extract_tensor::<half::f16>().is_ok()
        );
        assert!(attention_mask.try_extract_tensor::<i64>().is_ok());
    }

    #[test]
    fn missing_tokenizer_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = TextEncoder::load(dir.path(), &SessionOptions::default()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelLoadFailed);
    }
}
