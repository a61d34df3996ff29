//! QPSK symbol mapper (ETS 300 401 clause 14.4): maps the punctured,
//! time-interleaved, partitioned bitstream onto `nb_carriers` Gray-coded
//! QPSK symbols per OFDM symbol.

use crate::{Complex, Error, Float, Result};

const V: Float = std::f32::consts::FRAC_1_SQRT_2;

/// Sign of `(re0, im0, re1, im1)` for each 4-bit symbol-table index,
/// transcribed from the reference mapper's `symbols[16][4]` table.
const SIGNS: [(Float, Float, Float, Float); 16] = [
    (1.0, 1.0, 1.0, 1.0),
    (1.0, 1.0, 1.0, -1.0),
    (1.0, -1.0, 1.0, 1.0),
    (1.0, -1.0, 1.0, -1.0),
    (1.0, 1.0, -1.0, 1.0),
    (1.0, 1.0, -1.0, -1.0),
    (1.0, -1.0, -1.0, 1.0),
    (1.0, -1.0, -1.0, -1.0),
    (-1.0, 1.0, 1.0, 1.0),
    (-1.0, 1.0, 1.0, -1.0),
    (-1.0, -1.0, 1.0, 1.0),
    (-1.0, -1.0, 1.0, -1.0),
    (-1.0, 1.0, -1.0, 1.0),
    (-1.0, 1.0, -1.0, -1.0),
    (-1.0, -1.0, -1.0, 1.0),
    (-1.0, -1.0, -1.0, -1.0),
];

fn lookup(tmp: u8) -> (Complex, Complex) {
    let (sr0, si0, sr1, si1) = SIGNS[(tmp & 0x0f) as usize];
    (Complex::new(V * sr0, V * si0), Complex::new(V * sr1, V * si1))
}

/// Map one or more `nb_carriers/4`-byte blocks onto `nb_carriers`-long QPSK
/// symbol vectors (one per block).
pub fn map(nb_carriers: usize, input: &[u8]) -> Result<Vec<Complex>> {
    let block_bytes = nb_carriers / 4;
    if block_bytes == 0 || !input.len().is_multiple_of(block_bytes) {
        return Err(Error::invariant(format!(
            "QPSK mapper input length {} is not a multiple of nb_carriers/4={block_bytes}",
            input.len()
        )));
    }
    let half = nb_carriers / 8;
    let mut out = Vec::with_capacity(input.len() * 4);

    let mut block_start = 0;
    while block_start < input.len() {
        for j in 0..half {
            let a = input[block_start + j];
            let b = input[block_start + j + half];

            let tmp = ((a & 0xc0) >> 4) | ((b & 0xc0) >> 6);
            let (s0, s1) = lookup(tmp);
            out.push(s0);
            out.push(s1);

            let tmp = ((a & 0x30) >> 2) | ((b & 0x30) >> 4);
            let (s0, s1) = lookup(tmp);
            out.push(s0);
            out.push(s1);

            let tmp = (a & 0x0c) | ((b & 0x0c) >> 2);
            let (s0, s1) = lookup(tmp);
            out.push(s0);
            out.push(s1);

            let tmp = ((a & 0x03) << 2) | (b & 0x03);
            let (s0, s1) = lookup(tmp);
            out.push(s0);
            out.push(s1);
        }
        block_start += block_bytes;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_length_is_nb_carriers_per_block() {
        let carriers = 32;
        let input = vec![0u8; carriers / 4];
        let out = map(carriers, &input).unwrap();
        assert_eq!(out.len(), carriers);
    }

    #[test]
    fn all_zero_bits_map_to_positive_real_and_imag() {
        let carriers = 16;
        let input = vec![0u8; carriers / 4];
        let out = map(carriers, &input).unwrap();
        for s in out {
            assert!((s.re - V).abs() < 1e-6);
            assert!((s.im - V).abs() < 1e-6);
        }
    }

    #[test]
    fn every_symbol_has_unit_modulus() {
        let carriers = 16;
        let input = [0x5Au8, 0xC3, 0x12, 0xF0];
        let out = map(carriers, &input).unwrap();
        for s in out {
            assert!((s.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn rejects_input_not_a_multiple_of_block_size() {
        assert!(map(16, &[0u8; 3]).is_err());
    }
}
