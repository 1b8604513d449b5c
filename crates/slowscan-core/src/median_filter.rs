//! Median Filter — sliding-window impulse rejection.
//!
//! Nonlinear smoother applied to the frequency stream ahead of the VIS
//! state machine. Single-sample glitches from the discriminator are
//! replaced by the window median while genuine tone steps pass with only
//! a half-window delay.
//!
//! ## Example
//!
//! ```rust
//! use slowscan_core::median_filter::MedianFilter;
//!
//! let mut mf = MedianFilter::new(5);
//! let input = [1900.0, 1900.0, 7500.0, 1900.0, 1900.0, 1900.0, 1900.0];
//! let output: Vec<f64> = input.iter().map(|&x| mf.process_sample(x)).collect();
//! assert_eq!(output[4], 1900.0); // the spike never surfaces
//! ```

/// Sliding-window median filter over `f64` values.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window_size: usize,
    buffer: Vec<f64>,
    pos: usize,
    filled: usize,
    scratch: Vec<f64>,
}

impl MedianFilter {
    /// Create a filter with the given window size (odd recommended).
    pub fn new(window_size: usize) -> Self {
        let ws = window_size.max(1);
        Self {
            window_size: ws,
            buffer: vec![0.0; ws],
            pos: 0,
            filled: 0,
            scratch: Vec::with_capacity(ws),
        }
    }

    /// Push one value and return the median of the current window.
    ///
    /// Until the window fills, the median is taken over the values seen
    /// so far.
    pub fn process_sample(&mut self, x: f64) -> f64 {
        self.buffer[self.pos] = x;
        self.pos = (self.pos + 1) % self.window_size;
        self.filled = (self.filled + 1).min(self.window_size);

        self.scratch.clear();
        if self.filled < self.window_size {
            for i in 0..self.filled {
                let idx = (self.pos + self.window_size - self.filled + i) % self.window_size;
                self.scratch.push(self.buffer[idx]);
            }
        } else {
            self.scratch.extend_from_slice(&self.buffer);
        }
        self.scratch
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = self.scratch.len();
        if n % 2 == 1 {
            self.scratch[n / 2]
        } else {
            (self.scratch[n / 2 - 1] + self.scratch[n / 2]) / 2.0
        }
    }

    /// Process a block of values.
    pub fn process(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Window size.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Reset the window contents.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_removed() {
        let mut mf = MedianFilter::new(9);
        let mut input = vec![1200.0; 30];
        input[15] = 9000.0;
        let out = mf.process(&input);
        for &y in &out[10..] {
            assert_eq!(y, 1200.0);
        }
    }

    #[test]
    fn test_window_one_is_passthrough() {
        let mut mf = MedianFilter::new(1);
        let input = [3.0, 1.0, 4.0, 1.0, 5.0];
        for &x in &input {
            assert_eq!(mf.process_sample(x), x);
        }
    }

    #[test]
    fn test_known_sequence() {
        let mut mf = MedianFilter::new(3);
        let out = mf.process(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        // full windows: [3,1,4] -> 3, [1,4,1] -> 1, [4,1,5] -> 4
        assert_eq!(&out[2..], &[3.0, 1.0, 4.0]);
    }

    #[test]
    fn test_partial_window_start() {
        let mut mf = MedianFilter::new(5);
        assert_eq!(mf.process_sample(10.0), 10.0);
        assert_eq!(mf.process_sample(20.0), 15.0);
        assert_eq!(mf.process_sample(30.0), 20.0);
    }

    #[test]
    fn test_step_passes_with_delay() {
        let mut mf = MedianFilter::new(9);
        let mut input = vec![1200.0; 20];
        input.extend(vec![1900.0; 20]);
        let out = mf.process(&input);
        assert_eq!(out[15], 1200.0);
        assert_eq!(out[35], 1900.0);
    }

    #[test]
    fn test_reset() {
        let mut mf = MedianFilter::new(5);
        mf.process(&[9.0; 5]);
        mf.reset();
        assert_eq!(mf.process_sample(2.0), 2.0);
    }
}
