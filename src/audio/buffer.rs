//! In-memory audio signal produced by a generator.

/// An interleaved multi-channel `f32` signal.
///
/// Samples are stored frame by frame: for stereo, `[l0, r0, l1, r1, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Creates a buffer from interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is zero or the sample count is not a multiple of it.
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        assert!(channels > 0, "an audio buffer needs at least one channel");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "sample count must be a multiple of the channel count"
        );
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    /// Creates a single-channel buffer.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(1, sample_rate, samples)
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable access to the interleaved samples.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Returns true if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the signal in seconds.
    pub fn duration_sec(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Iterates over the samples of one channel.
    pub fn channel(&self, index: usize) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .copied()
    }

    /// Averages all channels into one mono signal.
    pub fn mono_mix(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Multiplies every sample by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for sample in &mut self.samples {
            *sample *= gain;
        }
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Root mean square over all samples.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_and_duration() {
        let buffer = AudioBuffer::new(2, 4, vec![0.0; 16]);
        assert_eq!(buffer.frames(), 8);
        assert_eq!(buffer.duration_sec(), 2.0);
    }

    #[test]
    fn channel_iteration() {
        let buffer = AudioBuffer::new(2, 16000, vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(buffer.channel(0).collect::<Vec<_>>(), vec![1.0, 2.0]);
        assert_eq!(buffer.channel(1).collect::<Vec<_>>(), vec![-1.0, -2.0]);
        assert_eq!(buffer.mono_mix(), vec![0.0, 0.0]);
    }

    #[test]
    fn peak_and_rms() {
        let mut buffer = AudioBuffer::mono(16000, vec![0.5, -1.0, 0.5, -1.0]);
        assert_eq!(buffer.peak(), 1.0);
        buffer.apply_gain(0.5);
        assert_eq!(buffer.peak(), 0.5);
        assert!(AudioBuffer::mono(16000, vec![]).rms() == 0.0);
        let square = AudioBuffer::mono(16000, vec![0.5, -0.5, 0.5, -0.5]);
        assert!((square.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn rejects_ragged_samples() {
        AudioBuffer::new(2, 16000, vec![0.0; 3]);
    }
}
