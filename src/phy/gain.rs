//! PAPR (peak-to-average power ratio) statistics and gain control (§4.8).
//!
//! [`PaprStats`] accumulates peak/mean squared-magnitude over a sliding
//! window of transmission frames, used both for diagnostic PAPR logging and
//! to feed [`GainControl`]'s `Max`/`Var` modes.

use std::collections::VecDeque;

use crate::phy::control::GainMode;
use crate::Complex;

/// Sliding-window peak/RMS squared-magnitude accumulator.
pub struct PaprStats {
    num_blocks_to_accumulate: usize,
    squared_peaks: VecDeque<f64>,
    squared_means: VecDeque<f64>,
}

impl PaprStats {
    /// Accumulate over a window of `num_blocks_to_accumulate` blocks.
    #[must_use]
    pub fn new(num_blocks_to_accumulate: usize) -> Self {
        Self {
            num_blocks_to_accumulate,
            squared_peaks: VecDeque::new(),
            squared_means: VecDeque::new(),
        }
    }

    /// Feed one block's worth of samples into the accumulator.
    pub fn process_block(&mut self, data: &[Complex]) {
        let mut norm_peak = 0.0f64;
        let mut rms2 = 0.0f64;
        for s in data {
            let x_norm = f64::from(s.norm_sqr());
            if x_norm > norm_peak {
                norm_peak = x_norm;
            }
            rms2 += x_norm;
        }
        rms2 /= data.len() as f64;

        self.squared_peaks.push_back(norm_peak);
        self.squared_means.push_back(rms2);
        if self.squared_means.len() > self.num_blocks_to_accumulate {
            self.squared_means.pop_front();
            self.squared_peaks.pop_front();
        }
    }

    /// Peak and mean squared-magnitude over the current window, if the
    /// window is full.
    fn peak_and_mean_sq(&self) -> Option<(f64, f64)> {
        if self.squared_means.len() < self.num_blocks_to_accumulate {
            return None;
        }
        let peak = self.squared_peaks.iter().copied().fold(0.0, f64::max);
        let rms2 = self.squared_means.iter().sum::<f64>() / self.squared_means.len() as f64;
        Some((peak, rms2))
    }

    /// PAPR in dB over the current window, or `0.0` if the window is not
    /// yet full.
    #[must_use]
    pub fn calculate_papr(&self) -> f64 {
        match self.peak_and_mean_sq() {
            Some((peak, rms2)) => 10.0 * (peak / rms2).log10(),
            None => 0.0,
        }
    }

    /// Discard all accumulated history.
    pub fn clear(&mut self) {
        self.squared_peaks.clear();
        self.squared_means.clear();
    }
}

/// Scales baseband samples per the configured [`GainMode`], using
/// [`PaprStats`] to track peak/RMS across transmission frames for the
/// `Max`/`Var` modes.
pub struct GainControl {
    stats: PaprStats,
}

impl GainControl {
    /// Build gain control with a `num_blocks_to_accumulate`-frame PAPR
    /// window.
    #[must_use]
    pub fn new(num_blocks_to_accumulate: usize) -> Self {
        Self {
            stats: PaprStats::new(num_blocks_to_accumulate),
        }
    }

    /// Diagnostic PAPR, in dB, over the current accumulation window.
    #[must_use]
    pub fn papr_db(&self) -> f64 {
        self.stats.calculate_papr()
    }

    /// Scale `samples` in place according to `mode`, feeding this frame
    /// into the PAPR accumulator first.
    pub fn apply(&mut self, mode: GainMode, samples: &mut [Complex]) {
        self.stats.process_block(samples);

        let scale = match mode {
            GainMode::Fix { factor } => factor,
            GainMode::Max { factor } => {
                let peak = self
                    .stats
                    .peak_and_mean_sq()
                    .map_or_else(|| self.current_block_peak(samples), |(peak, _)| peak.sqrt() as f32);
                if peak > 0.0 {
                    factor / peak
                } else {
                    factor
                }
            }
            GainMode::Var { factor } => {
                let rms = self
                    .stats
                    .peak_and_mean_sq()
                    .map_or_else(|| self.current_block_rms(samples), |(_, rms2)| rms2.sqrt() as f32);
                if rms > 0.0 {
                    factor / rms
                } else {
                    factor
                }
            }
        };

        for s in samples {
            *s *= scale;
        }
    }

    fn current_block_peak(&self, samples: &[Complex]) -> f32 {
        samples.iter().map(|s| s.norm_sqr()).fold(0.0, f32::max).sqrt()
    }

    fn current_block_rms(&self, samples: &[Complex]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = samples.iter().map(|s| s.norm_sqr()).sum();
        (sum / samples.len() as f32).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn papr_is_zero_until_window_is_full() {
        let mut stats = PaprStats::new(4);
        let data = vec![Complex::new(1.0, 0.0); 8];
        for _ in 0..3 {
            stats.process_block(&data);
        }
        assert_eq!(stats.calculate_papr(), 0.0);
    }

    #[test]
    fn constant_magnitude_block_has_zero_papr() {
        let mut stats = PaprStats::new(2);
        let data = vec![Complex::new(0.5, 0.0); 8];
        stats.process_block(&data);
        stats.process_block(&data);
        assert!(stats.calculate_papr().abs() < 1e-6);
    }

    #[test]
    fn fix_mode_scales_by_constant_factor() {
        let mut gc = GainControl::new(1);
        let mut samples = vec![Complex::new(2.0, 0.0); 4];
        gc.apply(GainMode::Fix { factor: 0.5 }, &mut samples);
        for s in &samples {
            assert!((s.re - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn max_mode_scales_peak_to_target() {
        let mut gc = GainControl::new(1);
        let mut samples = vec![Complex::new(1.0, 0.0), Complex::new(4.0, 0.0)];
        gc.apply(GainMode::Max { factor: 2.0 }, &mut samples);
        let peak = samples.iter().map(|s| s.norm()).fold(0.0, f32::max);
        assert!((peak - 2.0).abs() < 1e-4);
    }

    #[test]
    fn clear_resets_accumulated_history() {
        let mut stats = PaprStats::new(1);
        stats.process_block(&vec![Complex::new(1.0, 0.0); 4]);
        assert!(stats.peak_and_mean_sq().is_some());
        stats.clear();
        assert!(stats.peak_and_mean_sq().is_none());
    }
}
