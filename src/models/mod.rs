//! ONNX model components.
//!
//! - [`TextEncoder`](text_encoder::TextEncoder): Text prompt encoding
//! - [`TokenDecoder`](decoder::TokenDecoder): Autoregressive token generation
//! - [`AudioCodec`](audio_codec::AudioCodec): Token to audio decoding
//! - [`CodebookDelay`](delay_pattern::CodebookDelay): 4-codebook delay pattern
//! - [`Logits`](logits::Logits): Logits processing and sampling
//! - [`OnnxGenerator`](generator::OnnxGenerator): the [`AudioGenerator`](crate::generation::AudioGenerator) built from them

pub mod audio_codec;
pub mod decoder;
pub mod delay_pattern;
pub mod downloader;
pub mod generator;
pub mod loader;
pub mod logits;
pub mod session;
pub mod text_encoder;

// Re-export commonly used types
pub use audio_codec::AudioCodec;
pub use decoder::TokenDecoder;
pub use delay_pattern::CodebookDelay;
pub use downloader::ensure_models;
pub use generator::OnnxGenerator;
pub use loader::{check_models, load_sessions, GeneratorModels, MODEL_URLS, REQUIRED_MODEL_FILES};
pub use logits::{Logits, DEFAULT_GUIDANCE_SCALE, DEFAULT_TOP_K};
pub use session::{execution_providers, load_session, SessionOptions};
pub use text_encoder::TextEncoder;
