//! OFDM synthesis: maps `nb_carriers` frequency-domain symbols onto an
//! FFT's positive/negative carrier bins (DC left unused) and inverse-FFTs
//! to a time-domain OFDM symbol, plus the guard-interval (cyclic prefix)
//! inserter that follows it.
//!
//! No single reference source module covers this split the way
//! `FrequencyInterleaver`/`PhaseReference`/`CicEqualizer` do each cover one
//! concern: the reference modulator's `OfdmGenerator` wraps a third-party
//! FFT library behind the same `ModCodec` interface every other stage uses.
//! This is built the same way [`crate::fft_stream::FftStream`] already
//! wraps `rustfft` in this crate, inverted and sized per transmission mode
//! instead of fixed.

use rustfft::FftPlanner;

use crate::{Complex, Error, Float, Result};

/// Map carrier index `i` in `[0, nb_carriers)` to its signed subcarrier
/// index `k` (negative frequencies come first in carrier order, positive
/// frequencies second, split around DC as in [`crate::phy::cic::CicEqualizer`]).
fn carrier_to_k(i: usize, nb_carriers: usize) -> i64 {
    if i < (nb_carriers + 1) / 2 {
        i as i64 + (((nb_carriers & 1) ^ 1) as i64)
    } else {
        i as i64 - nb_carriers as i64
    }
}

/// Map a signed subcarrier index `k` to its FFT bin, leaving DC (bin 0)
/// untouched.
fn k_to_bin(k: i64, spacing: usize) -> usize {
    if k >= 0 {
        k as usize
    } else {
        (spacing as i64 + k) as usize
    }
}

/// Inverse-FFT OFDM symbol generator: scatters `nb_carriers` frequency-domain
/// symbols onto an `spacing`-point IFFT's bins (DC and unused bins zeroed)
/// and transforms to the time domain.
pub struct OfdmGenerator {
    nb_carriers: usize,
    spacing: usize,
    bins: Vec<usize>,
    ifft: std::sync::Arc<dyn rustfft::Fft<Float>>,
}

impl OfdmGenerator {
    /// Build a generator for `nb_carriers` active carriers on an `spacing`-point
    /// IFFT.
    #[must_use]
    pub fn new(nb_carriers: usize, spacing: usize) -> Self {
        let bins = (0..nb_carriers)
            .map(|i| k_to_bin(carrier_to_k(i, nb_carriers), spacing))
            .collect();
        let mut planner = FftPlanner::new();
        let ifft = planner.plan_fft_inverse(spacing);
        Self {
            nb_carriers,
            spacing,
            bins,
            ifft,
        }
    }

    /// Active carriers per OFDM symbol.
    #[must_use]
    pub fn nb_carriers(&self) -> usize {
        self.nb_carriers
    }

    /// IFFT size (equivalently, the un-windowed OFDM symbol length).
    #[must_use]
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    /// Transform one or more `nb_carriers`-long frequency-domain symbols
    /// into `spacing`-long time-domain OFDM symbols.
    pub fn process(&self, input: &[Complex]) -> Result<Vec<Complex>> {
        if input.len() % self.nb_carriers != 0 {
            return Err(Error::invariant(format!(
                "OFDM generator input length {} is not a multiple of nb_carriers={}",
                input.len(),
                self.nb_carriers
            )));
        }
        let nb_symbols = input.len() / self.nb_carriers;
        let mut out = Vec::with_capacity(nb_symbols * self.spacing);
        for block in input.chunks_exact(self.nb_carriers) {
            let mut bins = vec![Complex::default(); self.spacing];
            for (i, &sample) in block.iter().enumerate() {
                bins[self.bins[i]] = sample;
            }
            self.ifft.process(&mut bins);
            // rustfft's inverse transform is unnormalised; scale by 1/N so
            // round-tripping through a forward FFT recovers the original
            // carrier amplitudes.
            let scale = 1.0 / self.spacing as Float;
            for b in &mut bins {
                *b *= scale;
            }
            out.extend(bins);
        }
        Ok(out)
    }
}

/// Inserts a cyclic prefix ahead of each OFDM symbol: a null symbol (if
/// `null_size > 0`) followed by `nb_symbols` data symbols, each built from
/// its tail `len - spacing` samples prepended to its `spacing`-sample body.
pub struct GuardIntervalInserter {
    nb_symbols: usize,
    spacing: usize,
    null_size: usize,
    sym_size: usize,
}

impl GuardIntervalInserter {
    /// Build an inserter for `nb_symbols` data symbols of `spacing` active
    /// samples each, with null symbol length `null_size` (0 to omit the
    /// null symbol) and per-data-symbol length (with guard interval)
    /// `sym_size`.
    #[must_use]
    pub fn new(nb_symbols: usize, spacing: usize, null_size: usize, sym_size: usize) -> Self {
        Self {
            nb_symbols,
            spacing,
            null_size,
            sym_size,
        }
    }

    fn expected_input_len(&self) -> usize {
        (self.nb_symbols + usize::from(self.null_size > 0)) * self.spacing
    }

    /// Insert guard intervals, producing one transmission frame.
    pub fn process(&self, input: &[Complex]) -> Result<Vec<Complex>> {
        if input.len() != self.expected_input_len() {
            return Err(Error::invariant(format!(
                "guard interval inserter input is {} samples, expected {}",
                input.len(),
                self.expected_input_len()
            )));
        }
        let out_len = self.null_size + self.nb_symbols * self.sym_size;
        let mut out = vec![Complex::default(); out_len];
        let mut in_pos = 0;
        let mut out_pos = 0;

        if self.null_size > 0 {
            let tail_len = self.null_size - self.spacing;
            let tail_start = 2 * self.spacing - self.null_size;
            out[out_pos..out_pos + tail_len]
                .copy_from_slice(&input[in_pos + tail_start..in_pos + tail_start + tail_len]);
            out[out_pos + tail_len..out_pos + self.null_size]
                .copy_from_slice(&input[in_pos..in_pos + self.spacing]);
            in_pos += self.spacing;
            out_pos += self.null_size;
        }

        for _ in 0..self.nb_symbols {
            let tail_len = self.sym_size - self.spacing;
            let tail_start = 2 * self.spacing - self.sym_size;
            out[out_pos..out_pos + tail_len]
                .copy_from_slice(&input[in_pos + tail_start..in_pos + tail_start + tail_len]);
            out[out_pos + tail_len..out_pos + self.sym_size]
                .copy_from_slice(&input[in_pos..in_pos + self.spacing]);
            in_pos += self.spacing;
            out_pos += self.sym_size;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::mode::Mode;

    #[test]
    fn ofdm_output_length_is_nb_symbols_times_spacing() {
        let gen = OfdmGenerator::new(4, 8);
        let input = vec![Complex::new(1.0, 0.0); 4 * 3];
        let out = gen.process(&input).unwrap();
        assert_eq!(out.len(), 8 * 3);
    }

    #[test]
    fn ofdm_rejects_input_not_a_multiple_of_nb_carriers() {
        let gen = OfdmGenerator::new(4, 8);
        assert!(gen.process(&vec![Complex::default(); 3]).is_err());
    }

    #[test]
    fn guard_interval_output_length_matches_mode2() {
        let p = Mode::Two.params();
        let gi = GuardIntervalInserter::new(p.nb_symbols, p.spacing, p.null_symbol_samples, p.sym_samples);
        let input = vec![Complex::default(); (p.nb_symbols + 1) * p.spacing];
        let out = gi.process(&input).unwrap();
        assert_eq!(out.len(), p.null_symbol_samples + p.nb_symbols * p.sym_samples);
    }

    #[test]
    fn guard_interval_prefix_repeats_the_symbol_tail() {
        let spacing = 8;
        let sym_size = 10;
        let gi = GuardIntervalInserter::new(1, spacing, 0, sym_size);
        let body: Vec<Complex> = (0..spacing).map(|i| Complex::new(i as f32, 0.0)).collect();
        let out = gi.process(&body).unwrap();
        assert_eq!(&out[0..2], &body[spacing - 2..]);
        assert_eq!(&out[2..], &body[..]);
    }

    #[test]
    fn guard_interval_rejects_wrong_input_length() {
        let gi = GuardIntervalInserter::new(2, 8, 0, 10);
        assert!(gi.process(&vec![Complex::default(); 5]).is_err());
    }
}
