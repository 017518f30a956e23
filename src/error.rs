//! Error types for audiogen-batch.
//!
//! Every failure in the crate is an [`AudioGenError`] tagged with an
//! [`ErrorCode`], so the binary can print a consistent message and hint.

use std::fmt;
use std::path::Path;

/// Error codes identifying the class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Creating the output directory or writing an audio file failed.
    /// Trigger: permission denied, disk full, invalid path.
    IoFailure,

    /// The generation capability failed.
    /// Trigger: tokenization or inference error, OOM, mismatched results.
    GenerationFailed,

    /// ONNX model files not found at expected path.
    /// Trigger: Model files missing and downloads disabled.
    ModelNotFound,

    /// Failed to load ONNX model into memory.
    /// Trigger: Corrupt file, wrong format, or OOM during load.
    ModelLoadFailed,

    /// Failed to download model from remote source.
    /// Trigger: Network error, disk full during download.
    ModelDownloadFailed,

    /// A prompt cannot be turned into an output file name.
    /// Trigger: Empty prompt, path separators, name too long.
    InvalidPrompt,

    /// Two prompts map to the same output file.
    /// Trigger: Prompts differing only in whitespace or case.
    NameCollision,

    /// A configuration value is out of range.
    /// Trigger: Duration or thread count outside the accepted range.
    InvalidConfig,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoFailure => "IO_FAILURE",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::ModelDownloadFailed => "MODEL_DOWNLOAD_FAILED",
            ErrorCode::InvalidPrompt => "INVALID_PROMPT",
            ErrorCode::NameCollision => "NAME_COLLISION",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::IoFailure => {
                "Check that the output directory is writable and the disk has free space"
            }
            ErrorCode::GenerationFailed => {
                "Try a shorter duration or fewer prompts, or force CPU execution with \
                 AUDIOGEN_DEVICE=cpu"
            }
            ErrorCode::ModelNotFound => {
                "Run once without --no-download to fetch the models, or point --model-dir \
                 at a directory containing the ONNX files"
            }
            ErrorCode::ModelLoadFailed => {
                "Check available memory (4GB+ recommended), verify model files are not corrupted, \
                 or delete the model directory and re-download"
            }
            ErrorCode::ModelDownloadFailed => {
                "Check internet connection, verify disk space (500MB+ required), \
                 or try again later if HuggingFace is unavailable"
            }
            ErrorCode::InvalidPrompt => {
                "Use non-empty prompts without '/' or '\\' that fit in a 255-byte file name"
            }
            ErrorCode::NameCollision => {
                "Make the prompts differ in more than whitespace or case, or pass \
                 --on-collision suffix"
            }
            ErrorCode::InvalidConfig => {
                "Use a duration between 0 and 30 seconds and a thread count between 1 and 256"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type.
#[derive(Debug)]
pub struct AudioGenError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AudioGenError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an IO_FAILURE error for an operation on `path`.
    pub fn io(
        action: &str,
        path: &Path,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let message = format!("Failed to {} {}: {}", action, path.display(), source);
        Self::with_source(ErrorCode::IoFailure, message, source)
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("Model files not found at: {}", path.into()),
        )
    }

    /// Creates a MODEL_LOAD_FAILED error.
    pub fn model_load_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("Failed to load model: {}", reason.into()),
        )
    }

    /// Creates a MODEL_DOWNLOAD_FAILED error.
    pub fn model_download_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelDownloadFailed,
            format!("Failed to download model: {}", reason.into()),
        )
    }

    /// Creates an INVALID_PROMPT error.
    pub fn invalid_prompt(prompt: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidPrompt,
            format!("Invalid prompt {:?}: {}", prompt, reason.into()),
        )
    }

    /// Creates an INVALID_PROMPT error for an empty prompt list.
    pub fn no_prompts() -> Self {
        Self::new(ErrorCode::InvalidPrompt, "At least one prompt is required")
    }

    /// Creates a NAME_COLLISION error.
    pub fn name_collision(first: &str, second: &str, file_name: &str) -> Self {
        Self::new(
            ErrorCode::NameCollision,
            format!(
                "Prompts {:?} and {:?} both map to output file {}",
                first, second, file_name
            ),
        )
    }

    /// Creates an INVALID_CONFIG error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, reason)
    }
}

impl fmt::Display for AudioGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for AudioGenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using AudioGenError.
pub type Result<T> = std::result::Result<T, AudioGenError>;
