//! Model loader for the text-to-audio ONNX ensemble.
//!
//! Handles loading all required model components and configuration.

use std::path::Path;

use crate::error::{AudioGenError, Result};
use crate::types::ModelConfig;

use super::audio_codec::AudioCodec;
use super::decoder::TokenDecoder;
use super::session::SessionOptions;
use super::text_encoder::TextEncoder;

/// Complete set of loaded models.
#[derive(Debug)]
pub struct GeneratorModels {
    /// Text encoder for converting prompts to embeddings.
    pub text_encoder: TextEncoder,
    /// Decoder for autoregressive token generation.
    pub decoder: TokenDecoder,
    /// Audio codec for converting tokens to audio samples.
    pub audio_codec: AudioCodec,
    /// Model configuration.
    pub config: ModelConfig,
    /// Model version string.
    pub version: String,
}

/// Required model files.
pub const REQUIRED_MODEL_FILES: &[&str] = &[
    "tokenizer.json",
    "text_encoder.onnx",
    "decoder_model.onnx",
    "decoder_with_past_model.onnx",
    "encodec_decode.onnx",
];

/// Optional configuration file; defaults apply when absent.
pub const CONFIG_FILE: &str = "config.json";

/// Hugging Face URLs for the default fp16 export.
pub const MODEL_URLS: &[(&str, &str)] = &[
    (
        "config.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/config.json",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/tokenizer.json",
    ),
    (
        "text_encoder.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/text_encoder.onnx",
    ),
    (
        "decoder_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_model.onnx",
    ),
    (
        "decoder_with_past_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_with_past_model.onnx",
    ),
    (
        "encodec_decode.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/encodec_decode.onnx",
    ),
];

/// Lists the required files absent from `model_dir`.
pub fn missing_model_files(model_dir: &Path) -> Vec<&'static str> {
    REQUIRED_MODEL_FILES
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect()
}

/// Checks if all required model files exist in the directory.
pub fn check_models(model_dir: &Path) -> Result<()> {
    let missing = missing_model_files(model_dir);

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AudioGenError::model_not_found(format!(
            "{} (missing: {})",
            model_dir.display(),
            missing.join(", ")
        )))
    }
}

/// Loads every model session from a directory.
///
/// The directory should contain:
/// - `tokenizer.json` - HuggingFace tokenizer
/// - `text_encoder.onnx` - T5 text encoder
/// - `decoder_model.onnx` - First pass decoder
/// - `decoder_with_past_model.onnx` - Decoder with KV cache
/// - `encodec_decode.onnx` - EnCodec audio decoder
///
/// Optionally `config.json`; built-in defaults are used without it.
pub fn load_sessions(model_dir: &Path, options: &SessionOptions) -> Result<GeneratorModels> {
    check_models(model_dir)?;

    let config = load_or_default_config(model_dir)?;
    if let Some(reason) = config.validate() {
        return Err(AudioGenError::model_load_failed(format!(
            "Invalid model configuration: {}",
            reason
        )));
    }

    tracing::info!(model_dir = %model_dir.display(), "loading text encoder");
    let text_encoder = TextEncoder::load(model_dir, options)?;

    tracing::info!("loading decoder models");
    let decoder = TokenDecoder::load(model_dir, config.clone(), options)?;

    tracing::info!("loading audio codec");
    let audio_codec = AudioCodec::load(model_dir, options)?;

    let version = detect_model_version(model_dir);
    tracing::info!(%version, sample_rate = config.sample_rate, "models loaded");

    Ok(GeneratorModels {
        text_encoder,
        decoder,
        audio_codec,
        config,
        version,
    })
}

/// Loads model configuration from config.json or uses defaults.
fn load_or_default_config(model_dir: &Path) -> Result<ModelConfig> {
    let config_path = model_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        tracing::debug!("no {} found, using built-in defaults", CONFIG_FILE);
        return Ok(ModelConfig::musicgen_small());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        AudioGenError::model_load_failed(format!("Failed to read {}: {}", CONFIG_FILE, e))
    })?;

    ModelConfig::from_hf_json(&content).map_err(|e| {
        AudioGenError::model_load_failed(format!("Failed to parse {}: {}", CONFIG_FILE, e))
    })
}

/// Detects model version from directory structure.
fn detect_model_version(model_dir: &Path) -> String {
    let dir_name = model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    let size = if dir_name.contains("medium") {
        "medium"
    } else {
        "small"
    };
    let precision = if dir_name.contains("fp32") {
        "fp32"
    } else {
        "fp16"
    };

    format!("{}-{}", size, precision)
}
