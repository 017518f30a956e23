//! Command-line argument parser.
//!
//! Flags override the values loaded from the environment.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::audio::{NormalizationStrategy, SampleEncoding};
use crate::config::{AppConfig, Device};
use crate::naming::CollisionPolicy;

/// Execution device choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    /// Best available: CUDA, then CoreML, then CPU
    Auto,
    /// CPU only
    Cpu,
    /// NVIDIA GPU via CUDA
    Cuda,
    /// Apple Silicon via CoreML
    Coreml,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => Device::Auto,
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
            DeviceArg::Coreml => Device::CoreMl,
        }
    }
}

/// What to do when two prompts map to the same file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollisionArg {
    /// Reject the batch before generating anything
    Fail,
    /// Append `_1`, `_2`, ... to later names
    Suffix,
    /// Later prompts overwrite earlier files
    Overwrite,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Fail => CollisionPolicy::Fail,
            CollisionArg::Suffix => CollisionPolicy::Suffix,
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
        }
    }
}

/// Level normalization applied before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Integrated loudness (ITU-R BS.1770) to -14 LUFS
    Loudness,
    /// Peak to -1 dBFS
    Peak,
    /// RMS to -18 dBFS
    Rms,
    /// Hard clip to -1 dBFS
    Clip,
    /// Write samples unchanged
    None,
}

impl From<StrategyArg> for NormalizationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Loudness => NormalizationStrategy::Loudness,
            StrategyArg::Peak => NormalizationStrategy::Peak,
            StrategyArg::Rms => NormalizationStrategy::Rms,
            StrategyArg::Clip => NormalizationStrategy::Clip,
            StrategyArg::None => NormalizationStrategy::None,
        }
    }
}

/// audiogen-batch: generate one audio clip per text description
#[derive(Parser, Debug)]
#[command(name = "audiogen-batch")]
#[command(about = "Generate one WAV file per text description")]
#[command(version)]
pub struct Cli {
    /// Text descriptions of the sounds to generate
    #[arg(required = true, value_name = "DESCRIPTIONS")]
    pub descriptions: Vec<String>,

    /// Directory the WAV files are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Seconds of audio per description (at most 30)
    #[arg(short, long)]
    pub duration: Option<f32>,

    /// Random seed for reproducible generation
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Path to directory containing ONNX model files
    #[arg(short, long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Execution device
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,

    /// ONNX Runtime intra-op threads
    #[arg(long)]
    pub threads: Option<u32>,

    /// Policy for descriptions that map to the same file name
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionArg>,

    /// Level normalization before writing [default: loudness]
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Disable the compressor applied after loudness normalization
    #[arg(long)]
    pub no_compressor: bool,

    /// Write 32-bit float samples instead of 16-bit PCM
    #[arg(long)]
    pub float: bool,

    /// Fail instead of downloading missing model files
    #[arg(long)]
    pub no_download: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Overrides `config` with every flag given on the command line.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(ref path) = self.model_dir {
            config.model_path = Some(path.clone());
        }
        if let Some(device) = self.device {
            config.device = device.into();
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        if let Some(duration) = self.duration {
            config.duration_sec = duration;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(policy) = self.on_collision {
            config.collision_policy = policy.into();
        }
        if self.no_download {
            config.allow_download = false;
        }

        if let Some(strategy) = self.strategy {
            config.write.strategy = strategy.into();
        }
        if self.no_compressor {
            config.write.loudness_compressor = false;
        }
        if self.float {
            config.write.encoding = SampleEncoding::Float32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("audiogen-batch").chain(args.iter().copied()))
    }

    #[test]
    fn descriptions_and_output_are_required() {
        let err = parse(&["-o", "out"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);

        let err = parse(&["dog barking"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn collects_every_description() {
        let cli = parse(&["-o", "out", "dog barking", "sirens of an emergency vehicle"]).unwrap();
        assert_eq!(cli.descriptions, vec!["dog barking", "sirens of an emergency vehicle"]);
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.strategy, None);
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = parse(&["-o", "out", "rain"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply_to(&mut config);

        let defaults = AppConfig::default();
        assert_eq!(config.duration_sec, defaults.duration_sec);
        assert_eq!(config.collision_policy, CollisionPolicy::Fail);
        assert!(config.allow_download);
        assert_eq!(config.write, defaults.write);
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "-o",
            "out",
            "-d",
            "2.5",
            "-s",
            "7",
            "--device",
            "cpu",
            "--threads",
            "4",
            "--on-collision",
            "suffix",
            "--strategy",
            "peak",
            "--no-compressor",
            "--float",
            "--no-download",
            "rain",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        config.seed = Some(1);
        cli.apply_to(&mut config);

        assert_eq!(config.duration_sec, 2.5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.device, Device::Cpu);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.collision_policy, CollisionPolicy::Suffix);
        assert_eq!(config.write.strategy, NormalizationStrategy::Peak);
        assert!(!config.write.loudness_compressor);
        assert_eq!(config.write.encoding, SampleEncoding::Float32);
        assert!(!config.allow_download);
    }

    #[test]
    fn environment_strategy_survives_without_flag() {
        let cli = parse(&["-o", "out", "rain"]).unwrap();
        let mut config = AppConfig::default();
        config.write.strategy = NormalizationStrategy::Rms;
        cli.apply_to(&mut config);
        assert_eq!(config.write.strategy, NormalizationStrategy::Rms);
    }

    #[test]
    fn out_of_range_duration_fails_validation() {
        let cli = parse(&["-o", "out", "-d", "45", "rain"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply_to(&mut config);
        assert!(config.validate().is_some());
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(parse(&["-o", "out", "--on-collision", "merge", "rain"]).is_err());
    }
}
