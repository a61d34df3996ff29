//! PRBS scrambler (ETS 300 401 clause 12.5.2), applied to FIC and to each
//! subchannel independently.

/// Default DAB scrambler polynomial, `x^9 + x^5 + 1` in the accumulator
/// representation used by [`Scrambler::update`].
pub const DAB_POLYNOMIAL: u32 = 0x110;

/// A PRBS byte-stream generator built around a 32-bit shift accumulator and
/// a 4x256 precomputed parity table, XORed byte-wise with its input.
pub struct Scrambler {
    polynomial: u32,
    accum_init: u32,
    table: [[u8; 256]; 4],
}

impl Scrambler {
    /// Build a scrambler for `polynomial` with an explicit initial
    /// accumulator (e.g. `0xA9` for DVB-style dispersal). Pass `0` to derive
    /// the default DAB initial state (smallest all-ones mask `>= polynomial`).
    #[must_use]
    pub fn new(polynomial: u32, accum_init: u32) -> Self {
        Self {
            polynomial,
            accum_init,
            table: Self::gen_table(polynomial),
        }
    }

    /// The standard DAB scrambler, polynomial `0x110`, default init.
    #[must_use]
    pub fn dab() -> Self {
        Self::new(DAB_POLYNOMIAL, 0)
    }

    fn gen_table(polynomial: u32) -> [[u8; 256]; 4] {
        let mut table = [[0u8; 256]; 4];
        for (i, row) in table.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                let mut accum: u32 = (j as u32) << (i * 8);
                for _ in 0..8 {
                    accum = (accum << 1) ^ parity(accum & polynomial);
                }
                *slot = (accum & 0xff) as u8;
            }
        }
        table
    }

    fn initial_accum(&self) -> u32 {
        if self.accum_init != 0 {
            return self.accum_init;
        }
        let mut accum = 0u32;
        while accum < self.polynomial {
            accum = (accum << 1) | 1;
        }
        accum
    }

    fn update(&self, accum: u32) -> u32 {
        let mut acc_lsb = 0u8;
        for (i, row) in self.table.iter().enumerate() {
            acc_lsb ^= row[((accum >> (i * 8)) & 0xff) as usize];
        }
        (accum << 8) ^ u32::from(acc_lsb)
    }

    /// Generate `len` scrambler bytes.
    #[must_use]
    pub fn sequence(&self, len: usize) -> Vec<u8> {
        let mut accum = self.initial_accum();
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            accum = self.update(accum);
            if self.accum_init == 0xa9 && i % 188 == 0 {
                out.push(0);
            } else {
                out.push((accum & 0xff) as u8);
            }
        }
        out
    }

    /// Scramble `data` in place by XOR-ing with the PRBS sequence.
    pub fn apply(&self, data: &mut [u8]) {
        let seq = self.sequence(data.len());
        for (b, s) in data.iter_mut().zip(seq) {
            *b ^= s;
        }
    }
}

fn parity(mut word: u32) -> u32 {
    word ^= word >> 16;
    word ^= word >> 8;
    word ^= word >> 4;
    word ^= word >> 2;
    word ^= word >> 1;
    word & 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrambling_twice_is_self_inverse() {
        let s = Scrambler::dab();
        let original: Vec<u8> = (0u8..=255).cycle().take(864).collect();
        let mut data = original.clone();
        s.apply(&mut data);
        s.apply(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn dvb_dispersal_zeroes_every_188th_byte() {
        let s = Scrambler::new(DAB_POLYNOMIAL, 0xa9);
        let seq = s.sequence(1000);
        for (i, b) in seq.iter().enumerate() {
            if i % 188 == 0 {
                assert_eq!(*b, 0);
            }
        }
    }

    #[test]
    fn default_initial_accumulator_is_smallest_all_ones_mask() {
        let s = Scrambler::dab();
        assert_eq!(s.initial_accum(), 0x1ff);
    }

    #[test]
    fn scrambling_twice_is_self_inverse_for_random_frames() {
        use rand::Rng;
        let mut rng = rand::rng();
        let s = Scrambler::dab();
        for _ in 0..50 {
            let len = rng.random_range(1..=3072);
            let original: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let mut data = original.clone();
            s.apply(&mut data);
            s.apply(&mut data);
            assert_eq!(data, original);
        }
    }
}
