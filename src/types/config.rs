//! ModelConfig type for the token language model.
//!
//! Contains the architecture parameters of the ONNX model ensemble,
//! read from the Hugging Face `config.json` shipped with the export.

use serde::{Deserialize, Serialize};

/// Number of EnCodec codebooks the decoder pipeline supports.
pub const CODEBOOKS: u32 = 4;

/// Configuration parameters for the model architecture.
///
/// These values are required for tensor shapes during inference and for
/// labeling the generated audio with the right sample rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Token vocabulary size per codebook (typically 2048).
    pub vocab_size: u32,

    /// Number of decoder transformer layers.
    pub num_hidden_layers: u32,

    /// Number of attention heads in each decoder layer.
    pub num_attention_heads: u32,

    /// Decoder hidden dimension.
    pub hidden_size: u32,

    /// Number of EnCodec codebooks (always 4).
    pub codebooks: u32,

    /// Padding token ID for the decoder.
    pub pad_token_id: i64,

    /// Audio sample rate of the EnCodec decoder output, in Hz.
    pub sample_rate: u32,

    /// Number of output audio channels.
    pub audio_channels: u16,

    /// EnCodec frames (decoder steps) per second of audio.
    pub frame_rate: u32,
}

impl ModelConfig {
    /// Creates a ModelConfig for the musicgen-small export.
    ///
    /// This is the default configuration matching the fp16 small model
    /// from gabotechs/music_gen on HuggingFace.
    pub fn musicgen_small() -> Self {
        Self {
            vocab_size: 2048,
            num_hidden_layers: 24,
            num_attention_heads: 16,
            hidden_size: 1024,
            codebooks: CODEBOOKS,
            pad_token_id: 2048, // vocab_size is used as pad token
            sample_rate: 32000,
            audio_channels: 1,
            frame_rate: 50,
        }
    }

    /// Parses the Hugging Face `config.json` of a MusicGen-style export.
    ///
    /// Missing fields fall back to [`ModelConfig::musicgen_small`].
    pub fn from_hf_json(json: &str) -> serde_json::Result<Self> {
        let raw: HfConfig = serde_json::from_str(json)?;
        let defaults = Self::musicgen_small();
        let audio = raw.audio_encoder.unwrap_or_default();

        Ok(Self {
            vocab_size: raw.decoder.vocab_size.unwrap_or(defaults.vocab_size),
            num_hidden_layers: raw
                .decoder
                .num_hidden_layers
                .unwrap_or(defaults.num_hidden_layers),
            num_attention_heads: raw
                .decoder
                .num_attention_heads
                .unwrap_or(defaults.num_attention_heads),
            hidden_size: raw.decoder.hidden_size.unwrap_or(defaults.hidden_size),
            codebooks: raw.decoder.num_codebooks.unwrap_or(defaults.codebooks),
            pad_token_id: raw.decoder.pad_token_id.unwrap_or(defaults.pad_token_id),
            sample_rate: audio.sampling_rate.unwrap_or(defaults.sample_rate),
            audio_channels: audio.audio_channels.unwrap_or(defaults.audio_channels),
            frame_rate: audio.frame_rate.unwrap_or(defaults.frame_rate),
        })
    }

    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.vocab_size == 0 {
            return Some("vocab_size must be > 0".to_string());
        }

        if self.num_hidden_layers == 0 {
            return Some("num_hidden_layers must be > 0".to_string());
        }

        if self.num_attention_heads == 0 {
            return Some("num_attention_heads must be > 0".to_string());
        }

        if self.hidden_size % self.num_attention_heads != 0 {
            return Some(format!(
                "hidden_size ({}) must be divisible by num_attention_heads ({})",
                self.hidden_size, self.num_attention_heads
            ));
        }

        if self.codebooks != CODEBOOKS {
            return Some(format!(
                "codebooks must be {}, got {}",
                CODEBOOKS, self.codebooks
            ));
        }

        if self.sample_rate == 0 {
            return Some("sample_rate must be > 0".to_string());
        }

        // The decoder batch holds one mono codebook stack per guidance half.
        if self.audio_channels != 1 {
            return Some(format!(
                "audio_channels must be 1, got {}",
                self.audio_channels
            ));
        }

        if self.frame_rate == 0 {
            return Some("frame_rate must be > 0".to_string());
        }

        None
    }

    /// Number of decoder steps needed for `duration_sec` seconds of audio.
    pub fn tokens_for_duration(&self, duration_sec: f32) -> usize {
        (duration_sec * self.frame_rate as f32).ceil() as usize
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::musicgen_small()
    }
}

#[derive(Debug, Deserialize)]
struct HfConfig {
    decoder: DecoderSection,
    #[serde(default)]
    audio_encoder: Option<AudioEncoderSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DecoderSection {
    vocab_size: Option<u32>,
    num_hidden_layers: Option<u32>,
    num_attention_heads: Option<u32>,
    hidden_size: Option<u32>,
    num_codebooks: Option<u32>,
    pad_token_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct AudioEncoderSection {
    sampling_rate: Option<u32>,
    audio_channels: Option<u16>,
    frame_rate: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn musicgen_small_config() {
        let config = ModelConfig::musicgen_small();
        assert_eq!(config.vocab_size, 2048);
        assert_eq!(config.num_hidden_layers, 24);
        assert_eq!(config.sample_rate, 32000);
        assert_eq!(config.codebooks, 4);
        assert!(config.validate().is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = ModelConfig::musicgen_small();
        config.codebooks = 8;
        assert!(config.validate().is_some());

        let mut config = ModelConfig::musicgen_small();
        config.hidden_size = 1000;
        assert!(config.validate().is_some());
    }

    #[test]
    fn parses_hf_sections() {
        let json = r#"{
            "audio_encoder": { "sampling_rate": 16000, "model_type": "encodec" },
            "decoder": {
                "num_hidden_layers": 48,
                "num_attention_heads": 24,
                "hidden_size": 1536,
                "vocab_size": 2048,
                "pad_token_id": 2048,
                "num_codebooks": 4
            },
            "text_encoder": { "d_model": 768 }
        }"#;
        let config = ModelConfig::from_hf_json(json).unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.num_hidden_layers, 48);
        assert_eq!(config.hidden_size, 1536);
        assert_eq!(config.frame_rate, 50);
        assert!(config.validate().is_none());
    }

    #[test]
    fn stereo_export_is_rejected() {
        let config =
            ModelConfig::from_hf_json(r#"{"decoder": {}, "audio_encoder": {"audio_channels": 2}}"#)
                .unwrap();
        assert_eq!(config.audio_channels, 2);
        let reason = config.validate().unwrap();
        assert!(reason.contains("audio_channels"));
    }

    #[test]
    fn missing_decoder_section_is_an_error() {
        assert!(ModelConfig::from_hf_json(r#"{ "audio_encoder": {} }"#).is_err());
    }

    #[test]
    fn tokens_for_duration_rounds_up() {
        let config = ModelConfig::musicgen_small();
        assert_eq!(config.tokens_for_duration(5.0), 250);
        assert_eq!(config.tokens_for_duration(0.01), 1);
    }
}
