//! Puncturing engine (ETS 300 401 clause 11.3.2): a subchannel- or
//! FIC-specific cyclic sequence of [`PuncturingRule`]s, plus a fixed tail
//! rule covering the convolutional encoder's 3 flush bytes.

/// One puncturing rule: consume `length` input bits (a multiple of 4) per
/// application, emitting only the bits whose position in `pattern`
/// (MSB-first, 32-bit) is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuncturingRule {
    /// Input bits consumed per application of this rule.
    pub length: usize,
    /// MSB-first 32-bit selection mask.
    pub pattern: u32,
}

impl PuncturingRule {
    /// Construct a rule.
    #[must_use]
    pub fn new(length: usize, pattern: u32) -> Self {
        Self { length, pattern }
    }

    /// Bits emitted by one application of this rule.
    #[must_use]
    pub fn bit_size(&self) -> usize {
        self.pattern.count_ones() as usize
    }
}

/// The fixed tail rule covering the convolutional encoder's 21 flush bits
/// (3 input bytes, `0xCCCCCC`).
pub const TAIL_RULE: PuncturingRule = PuncturingRule {
    length: 3,
    pattern: 0xCC_CCCC,
};

/// A cyclic sequence of rules applied to the convolutionally-encoded bytes
/// of one subchannel or the FIC, followed once by [`TAIL_RULE`].
#[derive(Debug, Clone)]
pub struct PuncturingEngine {
    rules: Vec<PuncturingRule>,
    tail: PuncturingRule,
}

impl PuncturingEngine {
    /// Build an engine from an explicit rule sequence, with the standard
    /// tail rule appended.
    #[must_use]
    pub fn new(rules: Vec<PuncturingRule>) -> Self {
        Self {
            rules,
            tail: TAIL_RULE,
        }
    }

    /// Input bytes consumed by the cyclic rule sequence over one full
    /// traversal (not counting the tail), i.e. the convolutionally-encoded
    /// frame length this engine expects minus the 3 tail bytes.
    #[must_use]
    pub fn body_input_bytes(&self, cycles: usize) -> usize {
        self.rules.iter().map(|r| r.length).sum::<usize>() * cycles
    }

    /// Output bit length produced by `cycles` full traversals of the rule
    /// sequence plus the tail rule.
    #[must_use]
    pub fn output_bits(&self, cycles: usize) -> usize {
        let body: usize = self
            .rules
            .iter()
            .map(|r| (r.length / 4) * r.bit_size())
            .sum::<usize>()
            * cycles;
        body + self.tail.bit_size()
    }

    /// Puncture `input` (the convolutionally-encoded frame, tail bytes
    /// included at the end), cycling through the rule sequence, then
    /// applying the tail rule to the final 3 bytes.
    #[must_use]
    pub fn apply(&self, input: &[u8]) -> Vec<u8> {
        let tail_len = self.tail.length;
        let body_len = input.len() - tail_len;
        let out_bits = {
            let mut acc = 0usize;
            let mut consumed = 0usize;
            let mut idx = 0usize;
            while consumed < body_len {
                let rule = &self.rules[idx % self.rules.len()];
                acc += (rule.length / 4) * rule.bit_size();
                consumed += rule.length;
                idx += 1;
            }
            acc + self.tail.bit_size()
        };
        let out_bytes = out_bits.div_ceil(8);
        let mut out = vec![0u8; out_bytes];
        let mut bit_count = 0usize;
        let mut out_count = 0usize;
        let mut in_count = 0usize;
        let mut rule_idx = 0usize;

        let mut push_bit = |bit: u8, out: &mut [u8], bit_count: &mut usize, out_count: &mut usize| {
            out[*out_count] <<= 1;
            out[*out_count] |= bit;
            *bit_count += 1;
            if *bit_count == 8 {
                *bit_count = 0;
                *out_count += 1;
            }
        };

        while in_count < body_len {
            let rule = self.rules[rule_idx % self.rules.len()];
            rule_idx += 1;
            let mut remaining = rule.length;
            while remaining > 0 {
                let mask_base: u32 = 0x8000_0000;
                for i in 0..4 {
                    let mut data = input[in_count];
                    in_count += 1;
                    for j in 0..8 {
                        let mask = mask_base >> (i * 8 + j);
                        if rule.pattern & mask != 0 {
                            push_bit(data >> 7, &mut out, &mut bit_count, &mut out_count);
                        }
                        data <<= 1;
                    }
                }
                remaining -= 4;
            }
        }

        let mask_base: u32 = 0x0080_0000;
        for i in 0..tail_len {
            let mut data = input[in_count];
            in_count += 1;
            for j in 0..8 {
                let mask = mask_base >> (i * 8 + j);
                if self.tail.pattern & mask != 0 {
                    push_bit(data >> 7, &mut out, &mut bit_count, &mut out_count);
                }
                data <<= 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Short-form protection level 1 at 32 kb/s (ETS 300 401), scenario S5.
    fn s5_rules() -> PuncturingEngine {
        PuncturingEngine::new(vec![
            PuncturingRule::new(3 * 16, 0xff_ff_ff_ff), // P24
            PuncturingRule::new(5 * 16, 0xfe_ee_ee_ee), // P17
            PuncturingRule::new(13 * 16, 0xec_ec_ec_ec), // P12
            PuncturingRule::new(3 * 16, 0xfe_ee_ee_ee), // P17
        ])
    }

    #[test]
    fn s5_output_bit_length_matches_closed_form() {
        let engine = s5_rules();
        let p24: u32 = 0xff_ff_ff_ff;
        let p17: u32 = 0xfe_ee_ee_ee;
        let p12: u32 = 0xec_ec_ec_ec;
        let expected = 3 * 16 * p24.count_ones() as usize
            + 5 * 16 * p17.count_ones() as usize
            + 13 * 16 * p12.count_ones() as usize
            + 3 * 16 * p17.count_ones() as usize
            + 3 * 0xCC_CCCCu32.count_ones() as usize;
        assert_eq!(engine.output_bits(1), expected);
    }

    #[test]
    fn apply_emits_expected_byte_count() {
        let engine = s5_rules();
        let body_bytes = engine.body_input_bytes(1);
        let input = vec![0xAAu8; body_bytes + 3];
        let out = engine.apply(&input);
        assert_eq!(out.len(), engine.output_bits(1).div_ceil(8));
    }

    #[test]
    fn all_ones_pattern_is_identity() {
        let engine = PuncturingEngine::new(vec![PuncturingRule::new(4, 0xffff_ffff)]);
        let input = [0x5Au8, 0x3C, 0x00, 0xFF, 0xAA, 0xAA, 0xAA];
        let out = engine.apply(&input);
        assert_eq!(out[0], 0x5A);
        assert_eq!(out[1], 0x3C);
        assert_eq!(out[2], 0x00);
        assert_eq!(out[3], 0xFF);
    }

    #[test]
    fn random_rule_sets_emit_exactly_output_bits_bytes() {
        use rand::Rng;
        let mut rng = rand::rng();
        for _ in 0..30 {
            let nrules = rng.random_range(1..=4);
            let rules: Vec<PuncturingRule> = (0..nrules)
                .map(|_| {
                    let groups = rng.random_range(1..=20usize);
                    PuncturingRule::new(groups * 4, rng.random())
                })
                .collect();
            let engine = PuncturingEngine::new(rules);
            let body_bytes = engine.body_input_bytes(1);
            let input: Vec<u8> = (0..body_bytes + 3).map(|_| rng.random()).collect();
            let out = engine.apply(&input);
            assert_eq!(out.len(), engine.output_bits(1).div_ceil(8));
        }
    }
}
