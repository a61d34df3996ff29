//! Frequency interleaver (ETS 300 401 clause 14.6): permutes the
//! `nb_carriers` QPSK symbols of one OFDM symbol onto carrier positions
//! using a fixed pseudo-random sequence, independent per transmission mode.

use crate::phy::mode::Mode;
use crate::{Complex, Error, Result};

const ALPHA: u32 = 13;

fn num_for_mode(mode: Mode) -> u32 {
    mode.params().spacing as u32
}

/// Builds the `nb_carriers`-long index permutation for one mode and applies
/// it to successive `nb_carriers`-long blocks.
pub struct FrequencyInterleaver {
    nb_carriers: usize,
    /// `indexes[j]` is the carrier-index-space output slot that input
    /// position `j` is written to.
    indexes: Vec<usize>,
}

impl FrequencyInterleaver {
    /// Build the interleaver for `mode`.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        let params = mode.params();
        let nb_carriers = params.nb_carriers as u32;
        let num = num_for_mode(mode);
        let beta = mode.freq_interleaver_beta();

        let lower = (num - nb_carriers) / 2;
        let upper = num - (num - nb_carriers) / 2;

        let mut indexes = Vec::with_capacity(nb_carriers as usize);
        let mut perm = 0u32;
        for _ in 1..num {
            perm = (ALPHA * perm + beta) & (num - 1);
            if perm >= lower && perm <= upper && perm != num / 2 {
                let out = if perm > num / 2 {
                    perm - (1 + num / 2)
                } else {
                    perm + (nb_carriers - num / 2)
                };
                indexes.push(out as usize);
            }
        }
        debug_assert_eq!(indexes.len(), nb_carriers as usize);

        Self {
            nb_carriers: nb_carriers as usize,
            indexes,
        }
    }

    /// Active carriers per OFDM symbol.
    #[must_use]
    pub fn nb_carriers(&self) -> usize {
        self.nb_carriers
    }

    /// Apply the permutation to one or more `nb_carriers`-long input
    /// blocks, returning blocks of the same total length with carriers
    /// rearranged into frequency order.
    pub fn process(&self, input: &[Complex]) -> Result<Vec<Complex>> {
        if input.len() % self.nb_carriers != 0 {
            return Err(Error::invariant(format!(
                "frequency interleaver input length {} is not a multiple of nb_carriers={}",
                input.len(),
                self.nb_carriers
            )));
        }
        let mut out = vec![Complex::default(); input.len()];
        for (block_in, block_out) in input
            .chunks_exact(self.nb_carriers)
            .zip(out.chunks_exact_mut(self.nb_carriers))
        {
            for (i, &sample) in block_in.iter().enumerate() {
                block_out[self.indexes[i]] = sample;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_full_permutation_for_every_mode() {
        for mode in Mode::ALL {
            let fi = FrequencyInterleaver::new(mode);
            let mut seen = vec![false; fi.nb_carriers()];
            for &idx in &fi.indexes {
                assert!(idx < fi.nb_carriers());
                assert!(!seen[idx], "index {idx} written twice for {mode:?}");
                seen[idx] = true;
            }
            assert!(seen.iter().all(|&s| s), "permutation not onto for {mode:?}");
        }
    }

    #[test]
    fn process_preserves_the_multiset_of_input_samples() {
        let fi = FrequencyInterleaver::new(Mode::Three);
        let input: Vec<Complex> = (0..fi.nb_carriers())
            .map(|i| Complex::new(i as f32, 0.0))
            .collect();
        let out = fi.process(&input).unwrap();
        let mut sum_in = Complex::default();
        let mut sum_out = Complex::default();
        for s in &input {
            sum_in += s;
        }
        for s in &out {
            sum_out += s;
        }
        assert!((sum_in - sum_out).norm() < 1e-3);
    }

    #[test]
    fn rejects_input_not_a_multiple_of_nb_carriers() {
        let fi = FrequencyInterleaver::new(Mode::Two);
        assert!(fi.process(&vec![Complex::default(); 3]).is_err());
    }
}
