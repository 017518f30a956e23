//! Runtime configuration module.
//!
//! Contains the configuration for a generation run: execution device,
//! model location, generation settings, naming policy and write options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::{NormalizationStrategy, WriteOptions};
use crate::generation::GenerationParams;
use crate::naming::CollisionPolicy;

/// Default seconds of audio generated per prompt.
pub const DEFAULT_DURATION_SEC: f32 = 5.0;

/// Longest clip the decoder is run for, in seconds.
pub const MAX_DURATION_SEC: f32 = 30.0;

/// Execution device for ONNX inference.
///
/// Determines which hardware backend to use for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Automatically detect and use the best available device.
    /// Priority: CUDA > CoreML > CPU
    #[default]
    Auto,

    /// Force CPU execution.
    /// Slowest but universally available.
    Cpu,

    /// Use CUDA for NVIDIA GPU acceleration.
    /// Requires CUDA toolkit and compatible GPU.
    Cuda,

    /// Use CoreML for Apple Silicon acceleration.
    /// Only available on macOS.
    CoreMl,
}

impl Device {
    /// Returns the string representation of the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::CoreMl => "coreml",
        }
    }

    /// Parses a device from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Device::Auto),
            "cpu" => Some(Device::Cpu),
            "cuda" | "gpu" => Some(Device::Cuda),
            "coreml" | "metal" | "mps" => Some(Device::CoreMl),
            _ => None,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime configuration for a generation run.
///
/// Loaded from environment variables, then overridden by command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the directory containing the ONNX model files.
    /// If None, uses the platform-specific default cache location.
    pub model_path: Option<PathBuf>,

    /// Execution device for inference.
    pub device: Device,

    /// Number of threads for intra-op parallelism in ONNX Runtime.
    /// If None, uses ONNX Runtime's default (typically number of CPU cores).
    pub threads: Option<u32>,

    /// Seconds of audio generated per prompt.
    pub duration_sec: f32,

    /// Sampling seed for reproducible output.
    pub seed: Option<u64>,

    /// What to do when two prompts map to the same file.
    pub collision_policy: CollisionPolicy,

    /// Download missing model files instead of failing.
    pub allow_download: bool,

    /// Normalization and encoding applied to every written file.
    pub write: WriteOptions,
}

impl AppConfig {
    /// Creates a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an AppConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `AUDIOGEN_MODEL_PATH` - Path to model directory
    /// - `AUDIOGEN_DEVICE` - Device selection (auto, cpu, cuda, coreml)
    /// - `AUDIOGEN_THREADS` - Number of threads for CPU execution
    /// - `AUDIOGEN_DURATION` - Seconds of audio per prompt
    /// - `AUDIOGEN_SEED` - Sampling seed
    /// - `AUDIOGEN_ON_COLLISION` - Collision policy (fail, suffix, overwrite)
    /// - `AUDIOGEN_STRATEGY` - Normalization (loudness, peak, rms, clip, none)
    ///
    /// Falls back to defaults for unset or invalid variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("AUDIOGEN_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(path));
        }

        if let Some(device) = lookup("AUDIOGEN_DEVICE").and_then(|s| Device::parse(&s)) {
            config.device = device;
        }

        if let Some(threads) = lookup("AUDIOGEN_THREADS").and_then(|s| s.parse::<u32>().ok()) {
            if (1..=256).contains(&threads) {
                config.threads = Some(threads);
            }
        }

        if let Some(duration) = lookup("AUDIOGEN_DURATION").and_then(|s| s.parse::<f32>().ok()) {
            if duration > 0.0 && duration <= MAX_DURATION_SEC {
                config.duration_sec = duration;
            }
        }

        if let Some(seed) = lookup("AUDIOGEN_SEED").and_then(|s| s.parse::<u64>().ok()) {
            config.seed = Some(seed);
        }

        if let Some(policy) =
            lookup("AUDIOGEN_ON_COLLISION").and_then(|s| CollisionPolicy::parse(&s))
        {
            config.collision_policy = policy;
        }

        if let Some(strategy) =
            lookup("AUDIOGEN_STRATEGY").and_then(|s| NormalizationStrategy::parse(&s))
        {
            config.write.strategy = strategy;
        }

        config
    }

    /// Returns the effective model path, using platform defaults if not specified.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_path {
            path.clone()
        } else {
            default_model_path()
        }
    }

    /// Generation settings handed to the generator.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            duration_sec: self.duration_sec,
            seed: self.seed,
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if !(self.duration_sec > 0.0 && self.duration_sec <= MAX_DURATION_SEC) {
            return Some(format!(
                "duration must be > 0 and at most {} seconds, got {}",
                MAX_DURATION_SEC, self.duration_sec
            ));
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                return Some("threads must be > 0".to_string());
            }
            if threads > 256 {
                return Some(format!("threads too high: {} (max 256)", threads));
            }
        }

        None
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            device: Device::Auto,
            threads: None,
            duration_sec: DEFAULT_DURATION_SEC,
            seed: None,
            collision_policy: CollisionPolicy::default(),
            allow_download: true,
            write: WriteOptions::default(),
        }
    }
}

/// Returns the platform-specific default model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/audiogen-batch/models
/// - Linux: ~/.cache/audiogen-batch/models
/// - Windows: C:\Users\<user>\AppData\Local\audiogen-batch\cache\models
fn default_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "audiogen-batch") {
        proj_dirs.cache_dir().join("models")
    } else {
        // Fallback to current directory
        PathBuf::from("./models")
    }
}
