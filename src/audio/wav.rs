//! WAV file writer for audio output.
//!
//! Normalizes buffers and writes them to WAV using the hound crate.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::error::{AudioGenError, Result};

use super::buffer::AudioBuffer;
use super::normalize::{normalize, NormalizationStrategy};

/// File extension written by [`WavSink`].
pub const WAV_EXTENSION: &str = "wav";

/// Sample encoding inside the WAV container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// 16-bit signed PCM.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

/// Options applied when persisting a buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Level normalization applied before encoding.
    pub strategy: NormalizationStrategy,
    /// Apply a `tanh` compressor after loudness normalization.
    pub loudness_compressor: bool,
    /// Headroom for the `peak` and `clip` strategies.
    pub peak_clip_headroom_db: f32,
    /// Headroom for the `rms` strategy.
    pub rms_headroom_db: f32,
    /// Target is `-loudness_headroom_db` LUFS for the `loudness` strategy.
    pub loudness_headroom_db: f32,
    /// Sample encoding.
    pub encoding: SampleEncoding,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            strategy: NormalizationStrategy::Loudness,
            loudness_compressor: true,
            peak_clip_headroom_db: 1.0,
            rms_headroom_db: 18.0,
            loudness_headroom_db: 14.0,
            encoding: SampleEncoding::Pcm16,
        }
    }
}

/// Persists audio buffers as files.
pub trait AudioSink {
    /// Extension (without the dot) of the files this sink writes.
    fn extension(&self) -> &str;

    /// Writes `audio` to `path`, consuming the buffer.
    fn write(&self, path: &Path, audio: AudioBuffer, options: &WriteOptions) -> Result<()>;
}

/// Writes normalized WAV files to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavSink;

impl AudioSink for WavSink {
    fn extension(&self) -> &str {
        WAV_EXTENSION
    }

    fn write(&self, path: &Path, mut audio: AudioBuffer, options: &WriteOptions) -> Result<()> {
        normalize(&mut audio, options);
        write_wav(&audio, path, options.encoding)
    }
}

/// Writes an audio buffer to a WAV file as-is.
///
/// Channel count and sample rate come from the buffer. PCM samples are
/// clamped to `[-1, 1]` before quantization.
///
/// # Example
///
/// ```ignore
/// use audiogen_batch::audio::{write_wav, AudioBuffer, SampleEncoding};
///
/// let audio = AudioBuffer::mono(32000, vec![0.0, 0.5, -0.5, 0.0]);
/// write_wav(&audio, Path::new("/tmp/test.wav"), SampleEncoding::Pcm16)?;
/// ```
pub fn write_wav(audio: &AudioBuffer, path: &Path, encoding: SampleEncoding) -> Result<()> {
    let spec = match encoding {
        SampleEncoding::Pcm16 => WavSpec {
            channels: audio.channels(),
            sample_rate: audio.sample_rate(),
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
        SampleEncoding::Float32 => WavSpec {
            channels: audio.channels(),
            sample_rate: audio.sample_rate(),
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    };

    let mut writer =
        WavWriter::create(path, spec).map_err(|e| AudioGenError::io("create", path, e))?;

    match encoding {
        SampleEncoding::Pcm16 => {
            for &sample in audio.samples() {
                writer
                    .write_sample(to_pcm16(sample))
                    .map_err(|e| AudioGenError::io("write samples to", path, e))?;
            }
        }
        SampleEncoding::Float32 => {
            for &sample in audio.samples() {
                writer
                    .write_sample(sample)
                    .map_err(|e| AudioGenError::io("write samples to", path, e))?;
            }
        }
    }

    writer
        .finalize()
        .map_err(|e| AudioGenError::io("finalize", path, e))?;

    Ok(())
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::tempdir;

    #[test]
    fn write_wav_creates_pcm_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let audio = AudioBuffer::mono(16000, vec![0.0, 0.5, -0.5, 2.0]);
        write_wav(&audio, &path, SampleEncoding::Pcm16).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16384, -16384, i16::MAX]);
    }

    #[test]
    fn write_wav_float_keeps_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let audio = AudioBuffer::new(2, 32000, vec![0.25, -0.25, 0.5, -0.5]);
        write_wav(&audio, &path, SampleEncoding::Float32).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_format, SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.25, -0.25, 0.5, -0.5]);
    }

    #[test]
    fn write_into_missing_directory_is_io_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("x.wav");
        let err = WavSink
            .write(&path, AudioBuffer::mono(16000, vec![0.0; 4]), &WriteOptions::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::IoFailure);
        assert!(err.message.contains("x.wav"));
    }

    #[test]
    fn sink_normalizes_before_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("peak.wav");
        let options = WriteOptions {
            strategy: NormalizationStrategy::Peak,
            peak_clip_headroom_db: 0.0,
            ..WriteOptions::default()
        };

        WavSink
            .write(&path, AudioBuffer::mono(16000, vec![0.0, 0.25, -0.125]), &options)
            .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, i16::MAX, -16384]);
    }

    #[test]
    fn default_options_match_loudness_with_compressor() {
        let options = WriteOptions::default();
        assert_eq!(options.strategy, NormalizationStrategy::Loudness);
        assert!(options.loudness_compressor);
        assert_eq!(options.loudness_headroom_db, 14.0);
        assert_eq!(WavSink.extension(), "wav");
    }
}
