//! Level normalization applied before audio is written.
//!
//! The `loudness` strategy measures integrated loudness following
//! ITU-R BS.1770: K-weighting, 400 ms gating blocks with 75% overlap,
//! an absolute gate at -70 LUFS and a relative gate 10 LU below the
//! ungated level.

use serde::{Deserialize, Serialize};

use super::buffer::AudioBuffer;
use super::wav::WriteOptions;

/// Signals quieter than this RMS are left alone by loudness normalization.
pub const ENERGY_FLOOR: f32 = 2e-3;

/// Gating block length in seconds.
const BLOCK_SEC: f64 = 0.4;

/// Block overlap (75%).
const BLOCK_OVERLAP: f64 = 0.75;

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;

/// How the signal level is adjusted before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationStrategy {
    /// Scale so the absolute peak sits `peak_clip_headroom_db` below full scale.
    Peak,
    /// Hard-clip at `peak_clip_headroom_db` below full scale.
    Clip,
    /// Scale the mono RMS to `rms_headroom_db` below full scale.
    Rms,
    /// Scale integrated loudness to `-loudness_headroom_db` LUFS.
    #[default]
    Loudness,
    /// Leave the signal untouched.
    None,
}

impl NormalizationStrategy {
    /// Returns the string representation of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationStrategy::Peak => "peak",
            NormalizationStrategy::Clip => "clip",
            NormalizationStrategy::Rms => "rms",
            NormalizationStrategy::Loudness => "loudness",
            NormalizationStrategy::None => "none",
        }
    }

    /// Parses a strategy from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "peak" => Some(NormalizationStrategy::Peak),
            "clip" => Some(NormalizationStrategy::Clip),
            "rms" => Some(NormalizationStrategy::Rms),
            "loudness" => Some(NormalizationStrategy::Loudness),
            "none" => Some(NormalizationStrategy::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for NormalizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Converts a decibel value to a linear gain.
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Applies the configured normalization strategy in place.
pub fn normalize(audio: &mut AudioBuffer, options: &WriteOptions) {
    match options.strategy {
        NormalizationStrategy::Peak => {
            let peak = audio.peak();
            if peak > 0.0 {
                audio.apply_gain(db_to_gain(-options.peak_clip_headroom_db) / peak);
            }
        }
        NormalizationStrategy::Clip => {
            clip(audio, db_to_gain(-options.peak_clip_headroom_db));
        }
        NormalizationStrategy::Rms => {
            let mono = AudioBuffer::mono(audio.sample_rate(), audio.mono_mix());
            let rms = mono.rms();
            if rms > 0.0 {
                audio.apply_gain(db_to_gain(-options.rms_headroom_db) / rms);
            }
            clip(audio, 1.0);
        }
        NormalizationStrategy::Loudness => {
            normalize_loudness(
                audio,
                options.loudness_headroom_db,
                options.loudness_compressor,
            );
            clip(audio, 1.0);
        }
        NormalizationStrategy::None => {}
    }
}

/// Scales the signal to `-headroom_db` LUFS, optionally followed by a
/// `tanh` soft compressor.
///
/// Near-silent signals and signals shorter than one gating block are
/// returned unchanged.
pub fn normalize_loudness(audio: &mut AudioBuffer, headroom_db: f32, compressor: bool) {
    if audio.rms() < ENERGY_FLOOR {
        return;
    }
    let Some(loudness) = integrated_loudness(audio) else {
        tracing::debug!("signal too short to measure loudness, skipping normalization");
        return;
    };

    let delta = -headroom_db as f64 - loudness;
    let gain = 10f64.powf(delta / 20.0) as f32;
    tracing::debug!(loudness, gain, "normalizing loudness");
    audio.apply_gain(gain);

    if compressor {
        for sample in audio.samples_mut() {
            *sample = sample.tanh();
        }
    }
}

/// Clamps samples to `[-limit, limit]`, logging how many were clipped.
fn clip(audio: &mut AudioBuffer, limit: f32) -> usize {
    let mut clipped = 0;
    for sample in audio.samples_mut() {
        if sample.abs() > limit {
            *sample = sample.clamp(-limit, limit);
            clipped += 1;
        }
    }
    if clipped > 0 {
        tracing::warn!(
            clipped,
            total = audio.samples().len(),
            "clipping {} samples during normalization",
            clipped
        );
    }
    clipped
}

/// Measures integrated loudness in LUFS.
///
/// Returns `None` when the signal is shorter than one gating block or
/// every block falls below the absolute gate.
pub fn integrated_loudness(audio: &AudioBuffer) -> Option<f64> {
    let sample_rate = audio.sample_rate() as f64;
    let block_len = (BLOCK_SEC * sample_rate).round() as usize;
    let step = ((1.0 - BLOCK_OVERLAP) * BLOCK_SEC * sample_rate).round() as usize;
    let frames = audio.frames();

    if block_len == 0 || step == 0 || frames < block_len {
        return None;
    }

    let filtered: Vec<Vec<f64>> = (0..audio.channels() as usize)
        .map(|c| k_weight(audio.channel(c), sample_rate))
        .collect();

    let num_blocks = (frames - block_len) / step + 1;
    let block_energy: Vec<f64> = (0..num_blocks)
        .map(|j| {
            let start = j * step;
            filtered
                .iter()
                .map(|channel| {
                    let sum: f64 = channel[start..start + block_len].iter().map(|x| x * x).sum();
                    sum / block_len as f64
                })
                .sum()
        })
        .collect();

    let above_absolute: Vec<f64> = block_energy
        .iter()
        .copied()
        .filter(|&z| energy_to_lufs(z) > ABSOLUTE_GATE_LUFS)
        .collect();
    if above_absolute.is_empty() {
        return None;
    }

    let relative_gate = energy_to_lufs(mean(&above_absolute)) + RELATIVE_GATE_LU;
    let gated: Vec<f64> = above_absolute
        .into_iter()
        .filter(|&z| energy_to_lufs(z) > relative_gate)
        .collect();
    if gated.is_empty() {
        return None;
    }

    Some(energy_to_lufs(mean(&gated)))
}

fn energy_to_lufs(energy: f64) -> f64 {
    -0.691 + 10.0 * energy.log10()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Applies the two-stage K-weighting filter to one channel.
fn k_weight(samples: impl Iterator<Item = f32>, sample_rate: f64) -> Vec<f64> {
    let mut shelf = Biquad::high_shelf(sample_rate, 1500.0, 4.0, std::f64::consts::FRAC_1_SQRT_2);
    let mut highpass = Biquad::high_pass(sample_rate, 38.0, 0.5);
    samples
        .map(|x| highpass.process(shelf.process(x as f64)))
        .collect()
}

/// Direct form I biquad with coefficients normalized by `a0`.
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn from_coefficients(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn high_shelf(sample_rate: f64, center: f64, gain_db: f64, q: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f64::consts::PI * center / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::from_coefficients(
            [
                a * ((a + 1.0) + (a - 1.0) * cos + sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
                a * ((a + 1.0) + (a - 1.0) * cos - sqrt_a_alpha),
            ],
            [
                (a + 1.0) - (a - 1.0) * cos + sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos),
                (a + 1.0) - (a - 1.0) * cos - sqrt_a_alpha,
            ],
        )
    }

    fn high_pass(sample_rate: f64, cutoff: f64, q: f64) -> Self {
        let w0 = 2.0 * std::f64::consts::PI * cutoff / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);

        Self::from_coefficients(
            [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: u32, seconds: f32) -> AudioBuffer {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples = (0..n)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioBuffer::mono(sample_rate, samples)
    }

    fn options(strategy: NormalizationStrategy, compressor: bool) -> WriteOptions {
        WriteOptions {
            strategy,
            loudness_compressor: compressor,
            ..WriteOptions::default()
        }
    }

    #[test]
    fn full_scale_sine_reads_minus_three_lufs() {
        let audio = sine(997.0, 1.0, 48000, 3.0);
        let loudness = integrated_loudness(&audio).unwrap();
        assert!((loudness + 3.01).abs() < 0.3, "measured {loudness} LUFS");
    }

    #[test]
    fn loudness_scales_with_gain() {
        let loud = sine(997.0, 0.5, 32000, 2.0);
        let quiet = sine(997.0, 0.05, 32000, 2.0);
        let diff = integrated_loudness(&loud).unwrap() - integrated_loudness(&quiet).unwrap();
        assert!((diff - 20.0).abs() < 0.01, "difference was {diff} LU");
    }

    #[test]
    fn loudness_strategy_hits_target() {
        let mut audio = sine(440.0, 0.01, 16000, 2.0);
        normalize(&mut audio, &options(NormalizationStrategy::Loudness, false));
        let loudness = integrated_loudness(&audio).unwrap();
        assert!((loudness + 14.0).abs() < 0.05, "measured {loudness} LUFS");
    }

    #[test]
    fn compressor_keeps_signal_below_full_scale() {
        let mut audio = sine(440.0, 0.9, 16000, 2.0);
        normalize_loudness(&mut audio, 0.0, true);
        assert!(audio.peak() < 1.0);
    }

    #[test]
    fn quiet_and_short_signals_are_untouched() {
        let silent = AudioBuffer::mono(16000, vec![0.0001; 16000]);
        let mut audio = silent.clone();
        normalize(&mut audio, &options(NormalizationStrategy::Loudness, true));
        assert_eq!(audio, silent);

        let short = sine(440.0, 0.5, 16000, 0.1);
        let mut audio = short.clone();
        normalize_loudness(&mut audio, 14.0, true);
        assert_eq!(audio, short);
    }

    #[test]
    fn peak_strategy_leaves_headroom() {
        let mut audio = AudioBuffer::mono(16000, vec![0.1, -0.25, 0.2]);
        normalize(&mut audio, &options(NormalizationStrategy::Peak, false));
        assert!((audio.peak() - db_to_gain(-1.0)).abs() < 1e-6);
    }

    #[test]
    fn clip_strategy_clamps() {
        let mut audio = AudioBuffer::mono(16000, vec![2.0, -3.0, 0.1]);
        normalize(&mut audio, &options(NormalizationStrategy::Clip, false));
        let limit = db_to_gain(-1.0);
        assert_eq!(audio.samples(), &[limit, -limit, 0.1]);
    }

    #[test]
    fn rms_strategy_sets_level() {
        let mut audio = AudioBuffer::mono(16000, vec![0.5, -0.5, 0.5, -0.5]);
        normalize(&mut audio, &options(NormalizationStrategy::Rms, false));
        assert!((audio.rms() - db_to_gain(-18.0)).abs() < 1e-5);
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!(NormalizationStrategy::parse("LOUDNESS"), Some(NormalizationStrategy::Loudness));
        assert_eq!(NormalizationStrategy::parse("none"), Some(NormalizationStrategy::None));
        assert_eq!(NormalizationStrategy::parse("lufs"), None);
        assert_eq!(NormalizationStrategy::default().to_string(), "loudness");
    }
}
