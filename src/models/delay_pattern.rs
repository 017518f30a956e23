//! Codebook delay pattern.
//!
//! The decoder predicts all codebooks at once, but codebook `k` lags
//! `k` steps behind codebook 0. Feeding the decoder therefore needs the
//! delayed view (with padding where a codebook has not started yet), and
//! decoding audio needs the aligned view (one frame across all codebooks).
//!
//! ```text
//! step      0 1 2 3 4 5
//! book 0    x x x x x x
//! book 1    P x x x x x
//! book 2    P P x x x x
//! book 3    P P P x x x
//! ```

/// Token history for `N` delayed codebooks.
#[derive(Debug, Clone)]
pub struct CodebookDelay<const N: usize> {
    history: Vec<[i64; N]>,
}

impl<const N: usize> Default for CodebookDelay<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CodebookDelay<N> {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Records the tokens sampled for every codebook at one decoder step.
    pub fn push(&mut self, step: [i64; N]) {
        self.history.push(step);
    }

    /// Decoder input for the next step.
    ///
    /// Codebook `k` reads padding until `k` steps have been sampled,
    /// then the most recent token.
    pub fn next_input(&self, pad_token_id: i64) -> [i64; N] {
        let mut input = [pad_token_id; N];
        if let Some(last) = self.history.last() {
            for (k, slot) in input.iter_mut().enumerate() {
                if self.history.len() > k {
                    *slot = last[k];
                }
            }
        }
        input
    }

    /// The most recent fully aligned frame, if one exists.
    ///
    /// Reads the diagonal that ends at the latest step: codebook `k`
    /// contributes the token sampled `N - 1 - k` steps ago.
    pub fn last_aligned(&self) -> Option<[i64; N]> {
        let len = self.history.len();
        if len < N {
            return None;
        }
        let mut frame = [0; N];
        for (k, slot) in frame.iter_mut().enumerate() {
            *slot = self.history[len - N + k][k];
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_input_pads_late_codebooks() {
        let mut delay = CodebookDelay::<4>::new();
        assert_eq!(delay.next_input(-1), [-1, -1, -1, -1]);
        delay.push([1, 2, 3, 4]);
        assert_eq!(delay.next_input(-1), [1, -1, -1, -1]);
        delay.push([5, 6, 7, 8]);
        assert_eq!(delay.next_input(-1), [5, 6, -1, -1]);
        delay.push([9, 10, 11, 12]);
        assert_eq!(delay.next_input(-1), [9, 10, 11, -1]);
        delay.push([13, 14, 15, 16]);
        assert_eq!(delay.next_input(-1), [13, 14, 15, 16]);
    }

    #[test]
    fn aligned_frames_follow_the_diagonal() {
        let mut delay = CodebookDelay::<4>::new();
        for step in 0..3 {
            delay.push([step * 4 + 1, step * 4 + 2, step * 4 + 3, step * 4 + 4]);
            assert_eq!(delay.last_aligned(), None);
        }
        delay.push([13, 14, 15, 16]);
        assert_eq!(delay.last_aligned(), Some([1, 6, 11, 16]));
        delay.push([17, 18, 19, 20]);
        assert_eq!(delay.last_aligned(), Some([5, 10, 15, 20]));
    }

    #[test]
    fn two_codebooks_align_after_one_step() {
        let mut delay = CodebookDelay::<2>::default();
        delay.push([1, 2]);
        assert_eq!(delay.last_aligned(), None);
        delay.push([3, 4]);
        assert_eq!(delay.last_aligned(), Some([1, 4]));
    }
}
