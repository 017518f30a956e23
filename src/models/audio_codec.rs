//! EnCodec decoder wrapper.
//!
//! Decodes aligned codebook frames into audio samples.

use std::path::Path;

use half::f16;
use ort::session::Session;
use ort::value::{DynValue, Tensor};

use crate::error::{AudioGenError, Result};

use super::decoder::Frame;
use super::session::{load_session, SessionOptions};

/// EnCodec decoder graph (`encodec_decode.onnx`).
pub struct AudioCodec {
    audio_codec: Session,
}

impl std::fmt::Debug for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCodec").finish_non_exhaustive()
    }
}

impl AudioCodec {
    /// Loads `encodec_decode.onnx` from `model_dir`.
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        let audio_codec = load_session(&model_dir.join("encodec_decode.onnx"), options)?;
        Ok(Self { audio_codec })
    }

    /// Decodes frames into interleaved samples.
    pub fn decode(&mut self, frames: &[Frame]) -> Result<Vec<f32>> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let books = frames[0].len();
        let input_tensor = Tensor::from_array((
            [1usize, 1, books, frames.len()],
            codebook_major(frames),
        ))
        .map_err(|e| {
            AudioGenError::generation_failed(format!("Failed to create token tensor: {}", e))
        })?;

        let mut outputs = self
            .audio_codec
            .run(ort::inputs![input_tensor])
            .map_err(|e| {
                AudioGenError::generation_failed(format!("Audio codec inference failed: {}", e))
            })?;

        let audio_values: DynValue = outputs.remove("audio_values").ok_or_else(|| {
            AudioGenError::generation_failed("audio_values not found in output")
        })?;

        if let Ok((_shape, data)) = audio_values.try_extract_tensor::<f32>() {
            return Ok(data.to_vec());
        }
        if let Ok((_shape, data)) = audio_values.try_extract_tensor::<f16>() {
            return Ok(data.iter().map(|e| f32::from(*e)).collect());
        }

        Err(AudioGenError::generation_failed(
            "Audio values must be either f16 or f32",
        ))
    }
}

/// Transposes time-major frames into the `[codebook][time]` layout EnCodec reads.
fn codebook_major(frames: &[Frame]) -> Vec<i64> {
    let seq_len = frames.len();
    let books = frames.first().map_or(0, |f| f.len());
    let mut transposed = vec![0i64; seq_len * books];
    for (t, frame) in frames.iter().enumerate() {
        for (k, &token) in frame.iter().enumerate() {
            transposed[k * seq_len + t] = token;
        }
    }
    transposed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_transpose() {
        let frames = vec![[1i64, 2, 3, 4], [5, 6, 7, 8]];
        assert_eq!(codebook_major(&frames), vec![1, 5, 2, 6, 3, 7, 4, 8]);
    }

    #[test]
    fn empty_frames_transpose_to_nothing() {
        assert!(codebook_major(&[]).is_empty());
    }

    #[test]
    fn missing_codec_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioCodec::load(dir.path(), &SessionOptions::default()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelLoadFailed);
    }
}
