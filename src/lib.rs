//! audiogen-batch: text-to-audio generation for a batch of descriptions.
//!
//! Each description produces one WAV file named after the description,
//! with whitespace runs replaced by underscores. Generation runs a
//! MusicGen/AudioGen-style ONNX ensemble (T5 encoder, token decoder, EnCodec).
//!
//! # Modules
//!
//! - [`generation`]: the [`AudioGenerator`](generation::AudioGenerator) seam and the batch orchestrator
//! - [`naming`]: prompt-to-file-name mapping and collision handling
//! - [`audio`]: buffers, loudness normalization and WAV output
//! - [`models`]: the ONNX Runtime generator
//! - [`config`]: runtime configuration (AppConfig, Device)
//! - [`error`]: Error types and codes (AudioGenError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::time::Instant;
//!
//! use audiogen_batch::{
//!     audio::{WavSink, WriteOptions},
//!     generation::{generate_audio, ProgressReporter},
//!     naming::CollisionPolicy,
//! };
//!
//! let mut progress = ProgressReporter::stdout(Instant::now());
//! generate_audio(
//!     &mut generator,
//!     &WavSink,
//!     &WriteOptions::default(),
//!     &["dog barking", "sirens of an emergency vehicle"],
//!     Path::new("out"),
//!     CollisionPolicy::Fail,
//!     &mut progress,
//! )?;
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod models;
pub mod naming;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::{AppConfig, Device};
pub use error::{AudioGenError, ErrorCode, Result};
pub use generation::{generate_audio, AudioGenerator, GenerationParams, WrittenFile};
pub use naming::CollisionPolicy;
pub use types::ModelConfig;
