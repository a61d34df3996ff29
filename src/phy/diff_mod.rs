//! Differential modulator (ETS 300 401 clause 14.3.1): chains each OFDM
//! symbol's QPSK carriers onto the previous symbol's (starting from the
//! phase reference symbol) by complex multiplication, so a receiver can
//! demodulate without a coherent carrier reference.

use crate::{Complex, Error, Result};

/// Differentially modulate `data` (one or more `carriers`-long symbols)
/// against `phase_reference` (exactly `carriers` long), returning the
/// phase reference symbol followed by each chained data symbol.
pub fn modulate(carriers: usize, phase_reference: &[Complex], data: &[Complex]) -> Result<Vec<Complex>> {
    if phase_reference.len() != carriers {
        return Err(Error::invariant(format!(
            "differential modulator phase reference is {} samples, expected {carriers}",
            phase_reference.len()
        )));
    }
    if data.len() % carriers != 0 {
        return Err(Error::invariant(format!(
            "differential modulator data length {} is not a multiple of carriers={carriers}",
            data.len()
        )));
    }

    let mut out = Vec::with_capacity(phase_reference.len() + data.len());
    out.extend_from_slice(phase_reference);

    for block in data.chunks_exact(carriers) {
        let prev_start = out.len() - carriers;
        for j in 0..carriers {
            let prev = out[prev_start + j];
            out.push(prev * block[j]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_output_block_is_the_phase_reference() {
        let carriers = 4;
        let phase: Vec<Complex> = (0..carriers).map(|i| Complex::new(i as f32, 0.0)).collect();
        let data = vec![Complex::new(1.0, 0.0); carriers];
        let out = modulate(carriers, &phase, &data).unwrap();
        assert_eq!(&out[..carriers], &phase[..]);
    }

    #[test]
    fn multiplying_by_unity_symbols_repeats_the_phase_reference() {
        let carriers = 4;
        let phase: Vec<Complex> = (0..carriers).map(|i| Complex::new(i as f32 + 1.0, 0.0)).collect();
        let data = vec![Complex::new(1.0, 0.0); carriers * 2];
        let out = modulate(carriers, &phase, &data).unwrap();
        assert_eq!(out.len(), carriers * 3);
        crate::tests::assert_almost_equal_complex(&out[carriers..2 * carriers], &phase);
        crate::tests::assert_almost_equal_complex(&out[2 * carriers..], &phase);
    }

    #[test]
    fn rejects_mismatched_phase_reference_length() {
        let data = vec![Complex::default(); 4];
        assert!(modulate(4, &vec![Complex::default(); 3], &data).is_err());
    }

    #[test]
    fn rejects_data_not_a_multiple_of_carriers() {
        let phase = vec![Complex::default(); 4];
        assert!(modulate(4, &phase, &vec![Complex::default(); 5]).is_err());
    }
}
