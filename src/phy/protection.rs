//! Subchannel protection profiles (ETS 300 401 clause 11.3.1): EEP
//! (long-form) and UEP (short-form) puncturing rule tables, plus the
//! `framesize_cu` lookup used to size a subchannel's CIF region.
//!
//! Table data is transcribed from the reference modulator's subchannel
//! source, which in turn implements ETS 300 401 Annex B/C. A small number of
//! (bitrate, protection_level) UEP combinations are not defined by the
//! standard; [`puncturing_rules`]/[`framesize_cu`] report [`crate::Error::Config`]
//! for those rather than guessing.

use crate::phy::puncture::{PuncturingEngine, PuncturingRule};
use crate::{Error, Result};

#[allow(clippy::unusual_byte_groupings)]
mod patterns {
    pub const P1: u32 = 0xc888_8888;
    pub const P2: u32 = 0xc888_c888;
    pub const P3: u32 = 0xc8c8_c888;
    pub const P4: u32 = 0xc8c8_c8c8;
    pub const P5: u32 = 0xccc8_c8c8;
    pub const P6: u32 = 0xccc8_ccc8;
    pub const P7: u32 = 0xcccc_ccc8;
    pub const P8: u32 = 0xcccc_cccc;
    pub const P9: u32 = 0xeccc_cccc;
    pub const P10: u32 = 0xeccc_eccc;
    pub const P11: u32 = 0xecec_eccc;
    pub const P12: u32 = 0xecec_ecec;
    pub const P13: u32 = 0xeeec_ecec;
    pub const P14: u32 = 0xeeec_eeec;
    pub const P15: u32 = 0xeeee_eeec;
    pub const P16: u32 = 0xeeee_eeee;
    pub const P17: u32 = 0xfeee_eeee;
    pub const P18: u32 = 0xfeee_feee;
    pub const P19: u32 = 0xfefe_feee;
    pub const P20: u32 = 0xfefe_fefe;
    pub const P21: u32 = 0xfffe_fefe;
    pub const P22: u32 = 0xfffe_fffe;
    pub const P23: u32 = 0xffff_fffe;
    pub const P24: u32 = 0xffff_ffff;
}
use patterns::*;

/// `tpl` field decomposition (§3: `protection_form`/`protection_option`/`protection_level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tpl {
    /// `true` for EEP (long form), `false` for UEP (short form).
    pub long_form: bool,
    /// Protection option (long form only: 0 or 1).
    pub option: u8,
    /// Protection level, 1-indexed (long form 1..=4, short form 1..=5).
    pub level: u8,
}

impl Tpl {
    /// Decode a 6-bit TPL field.
    #[must_use]
    pub fn decode(tpl: u8) -> Self {
        let long_form = (tpl >> 5) & 1 != 0;
        if long_form {
            Tpl {
                long_form,
                option: (tpl >> 2) & 0x7,
                level: (tpl & 0x3) + 1,
            }
        } else {
            Tpl {
                long_form,
                option: 0,
                level: (tpl & 0x7) + 1,
            }
        }
    }
}

fn rule(length: usize, pattern: u32) -> PuncturingRule {
    PuncturingRule::new(length, pattern)
}

/// EEP long-form rules, option 0 (Protection Profile A).
fn eep_option0(level: u8, bitrate: usize) -> Result<Vec<PuncturingRule>> {
    Ok(match level {
        1 => vec![
            rule((6 * bitrate / 8).saturating_sub(3) * 16, P24),
            rule(3 * 16, P23),
        ],
        2 => {
            if bitrate == 8 {
                vec![rule(5 * 16, P13), rule(1 * 16, P12)]
            } else {
                vec![
                    rule((2 * bitrate / 8).saturating_sub(3) * 16, P14),
                    rule((4 * bitrate / 8 + 3) * 16, P13),
                ]
            }
        }
        3 => vec![
            rule((6 * bitrate / 8).saturating_sub(3) * 16, P8),
            rule(3 * 16, P7),
        ],
        4 => vec![
            rule((4 * bitrate / 8).saturating_sub(3) * 16, P3),
            rule((2 * bitrate / 8 + 3) * 16, P2),
        ],
        _ => return Err(Error::config(format!("invalid EEP option-0 level {level}"))),
    })
}

/// EEP long-form rules, option 1 (Protection Profile B).
fn eep_option1(level: u8, bitrate: usize) -> Result<Vec<PuncturingRule>> {
    let base = (24 * bitrate / 32).saturating_sub(3) * 16;
    Ok(match level {
        1 => vec![rule(base, P10), rule(3 * 16, P9)],
        2 => vec![rule(base, P6), rule(3 * 16, P5)],
        3 => vec![rule(base, P4), rule(3 * 16, P3)],
        4 => vec![rule(base, P2), rule(3 * 16, P1)],
        _ => return Err(Error::config(format!("invalid EEP option-1 level {level}"))),
    })
}

/// UEP short-form rules, keyed by `(bitrate, level)`.
#[allow(clippy::too_many_lines)]
fn uep_rules(bitrate: usize, level: u8) -> Result<Vec<PuncturingRule>> {
    let rules = match (bitrate, level) {
        (32, 1) => vec![rule(3 * 16, P24), rule(5 * 16, P17), rule(13 * 16, P12), rule(3 * 16, P17)],
        (32, 2) => vec![rule(3 * 16, P22), rule(4 * 16, P13), rule(14 * 16, P8), rule(3 * 16, P13)],
        (32, 3) => vec![rule(3 * 16, P15), rule(4 * 16, P9), rule(14 * 16, P6), rule(3 * 16, P8)],
        (32, 4) => vec![rule(3 * 16, P11), rule(3 * 16, P6), rule(18 * 16, P5)],
        (32, 5) => vec![rule(3 * 16, P5), rule(4 * 16, P3), rule(17 * 16, P2)],

        (48, 1) => vec![rule(3 * 16, P24), rule(5 * 16, P18), rule(25 * 16, P13), rule(3 * 16, P18)],
        (48, 2) => vec![rule(3 * 16, P24), rule(4 * 16, P14), rule(26 * 16, P8), rule(3 * 16, P15)],
        (48, 3) => vec![rule(3 * 16, P15), rule(4 * 16, P10), rule(26 * 16, P6), rule(3 * 16, P9)],
        (48, 4) => vec![rule(3 * 16, P9), rule(4 * 16, P6), rule(26 * 16, P4), rule(3 * 16, P6)],
        (48, 5) => vec![rule(4 * 16, P5), rule(3 * 16, P4), rule(26 * 16, P2), rule(3 * 16, P3)],

        (56, 2) => vec![rule(6 * 16, P23), rule(10 * 16, P13), rule(23 * 16, P8), rule(3 * 16, P13)],
        (56, 3) => vec![rule(6 * 16, P16), rule(12 * 16, P7), rule(21 * 16, P6), rule(3 * 16, P9)],
        (56, 4) => vec![rule(6 * 16, P9), rule(10 * 16, P6), rule(23 * 16, P4), rule(3 * 16, P5)],
        (56, 5) => vec![rule(6 * 16, P5), rule(10 * 16, P4), rule(23 * 16, P2), rule(3 * 16, P3)],

        (64, 1) => vec![rule(6 * 16, P24), rule(11 * 16, P18), rule(28 * 16, P12), rule(3 * 16, P18)],
        (64, 2) => vec![rule(6 * 16, P23), rule(10 * 16, P13), rule(29 * 16, P8), rule(3 * 16, P13)],
        (64, 3) => vec![rule(6 * 16, P16), rule(12 * 16, P8), rule(27 * 16, P6), rule(3 * 16, P9)],
        (64, 4) => vec![rule(6 * 16, P11), rule(9 * 16, P6), rule(33 * 16, P5)],
        (64, 5) => vec![rule(6 * 16, P5), rule(9 * 16, P3), rule(31 * 16, P2), rule(2 * 16, P3)],

        (80, 1) => vec![rule(6 * 16, P24), rule(10 * 16, P17), rule(41 * 16, P12), rule(3 * 16, P18)],
        (80, 2) => vec![rule(6 * 16, P23), rule(10 * 16, P13), rule(41 * 16, P8), rule(3 * 16, P13)],
        (80, 3) => vec![rule(6 * 16, P16), rule(11 * 16, P8), rule(40 * 16, P6), rule(3 * 16, P7)],
        (80, 4) => vec![rule(6 * 16, P11), rule(10 * 16, P6), rule(41 * 16, P5), rule(3 * 16, P6)],
        (80, 5) => vec![rule(6 * 16, P6), rule(10 * 16, P3), rule(41 * 16, P2), rule(3 * 16, P3)],

        (96, 1) => vec![rule(6 * 16, P24), rule(13 * 16, P18), rule(50 * 16, P13), rule(3 * 16, P19)],
        (96, 2) => vec![rule(6 * 16, P22), rule(10 * 16, P12), rule(53 * 16, P9), rule(3 * 16, P12)],
        (96, 3) => vec![rule(6 * 16, P16), rule(12 * 16, P9), rule(51 * 16, P6), rule(3 * 16, P10)],
        (96, 4) => vec![rule(7 * 16, P9), rule(10 * 16, P6), rule(52 * 16, P4), rule(3 * 16, P6)],
        (96, 5) => vec![rule(7 * 16, P5), rule(9 * 16, P4), rule(53 * 16, P2), rule(3 * 16, P4)],

        (112, 2) => vec![rule(11 * 16, P23), rule(21 * 16, P12), rule(49 * 16, P9), rule(3 * 16, P14)],
        (112, 3) => vec![rule(11 * 16, P16), rule(23 * 16, P8), rule(47 * 16, P6), rule(3 * 16, P9)],
        (112, 4) => vec![rule(11 * 16, P9), rule(21 * 16, P6), rule(49 * 16, P4), rule(3 * 16, P8)],
        (112, 5) => vec![rule(14 * 16, P5), rule(17 * 16, P4), rule(50 * 16, P2), rule(3 * 16, P5)],

        (128, 1) => vec![rule(11 * 16, P24), rule(20 * 16, P17), rule(62 * 16, P13), rule(3 * 16, P19)],
        (128, 2) => vec![rule(11 * 16, P22), rule(21 * 16, P12), rule(61 * 16, P9), rule(3 * 16, P14)],
        (128, 3) => vec![rule(11 * 16, P16), rule(22 * 16, P9), rule(60 * 16, P6), rule(3 * 16, P10)],
        (128, 4) => vec![rule(11 * 16, P11), rule(21 * 16, P6), rule(61 * 16, P5), rule(3 * 16, P7)],
        (128, 5) => vec![rule(12 * 16, P5), rule(19 * 16, P3), rule(62 * 16, P2), rule(3 * 16, P4)],

        (160, 1) => vec![rule(11 * 16, P24), rule(22 * 16, P18), rule(84 * 16, P12), rule(3 * 16, P19)],
        (160, 2) => vec![rule(11 * 16, P22), rule(21 * 16, P11), rule(85 * 16, P9), rule(3 * 16, P13)],
        (160, 3) => vec![rule(11 * 16, P16), rule(24 * 16, P8), rule(82 * 16, P6), rule(3 * 16, P11)],
        (160, 4) => vec![rule(11 * 16, P11), rule(23 * 16, P6), rule(83 * 16, P5), rule(3 * 16, P9)],
        (160, 5) => vec![rule(11 * 16, P5), rule(19 * 16, P4), rule(87 * 16, P2), rule(3 * 16, P4)],

        (192, 1) => vec![rule(11 * 16, P24), rule(21 * 16, P20), rule(109 * 16, P13), rule(3 * 16, P24)],
        (192, 2) => vec![rule(11 * 16, P22), rule(20 * 16, P13), rule(110 * 16, P9), rule(3 * 16, P13)],
        (192, 3) => vec![rule(11 * 16, P16), rule(24 * 16, P10), rule(106 * 16, P6), rule(3 * 16, P11)],
        (192, 4) => vec![rule(11 * 16, P10), rule(22 * 16, P6), rule(108 * 16, P4), rule(3 * 16, P9)],
        (192, 5) => vec![rule(11 * 16, P6), rule(20 * 16, P4), rule(110 * 16, P2), rule(3 * 16, P5)],

        (224, 1) => vec![rule(11 * 16, P24), rule(24 * 16, P20), rule(130 * 16, P12), rule(3 * 16, P20)],
        (224, 2) => vec![rule(11 * 16, P24), rule(22 * 16, P16), rule(132 * 16, P10), rule(3 * 16, P15)],
        (224, 3) => vec![rule(11 * 16, P16), rule(20 * 16, P10), rule(134 * 16, P7), rule(3 * 16, P9)],
        (224, 4) => vec![rule(12 * 16, P12), rule(26 * 16, P8), rule(127 * 16, P4), rule(3 * 16, P11)],
        (224, 5) => vec![rule(12 * 16, P8), rule(22 * 16, P6), rule(131 * 16, P2), rule(3 * 16, P6)],

        (256, 1) => vec![rule(11 * 16, P24), rule(26 * 16, P19), rule(152 * 16, P14), rule(3 * 16, P18)],
        (256, 2) => vec![rule(11 * 16, P24), rule(22 * 16, P14), rule(156 * 16, P10), rule(3 * 16, P13)],
        (256, 3) => vec![rule(11 * 16, P16), rule(27 * 16, P10), rule(151 * 16, P7), rule(3 * 16, P10)],
        (256, 4) => vec![rule(11 * 16, P12), rule(24 * 16, P9), rule(154 * 16, P5), rule(3 * 16, P10)],
        (256, 5) => vec![rule(11 * 16, P6), rule(24 * 16, P5), rule(154 * 16, P2), rule(3 * 16, P5)],

        (320, 2) => vec![rule(11 * 16, P24), rule(26 * 16, P17), rule(200 * 16, P9), rule(3 * 16, P17)],
        (320, 4) => vec![rule(11 * 16, P13), rule(25 * 16, P9), rule(201 * 16, P5), rule(3 * 16, P10)],
        (320, 5) => vec![rule(11 * 16, P8), rule(26 * 16, P5), rule(200 * 16, P2), rule(3 * 16, P6)],

        (384, 1) => vec![rule(12 * 16, P24), rule(28 * 16, P20), rule(245 * 16, P14), rule(3 * 16, P23)],
        (384, 3) => vec![rule(11 * 16, P16), rule(24 * 16, P9), rule(250 * 16, P7), rule(3 * 16, P10)],
        (384, 5) => vec![rule(11 * 16, P8), rule(27 * 16, P6), rule(247 * 16, P2), rule(3 * 16, P7)],

        _ => {
            return Err(Error::config(format!(
                "UEP puncturing rules undefined for {bitrate} kb/s, level {level}"
            )))
        }
    };
    Ok(rules)
}

/// `framesize_cu` for long-form (EEP) subchannels.
fn framesize_cu_long(option: u8, level: u8, bitrate: usize) -> Result<usize> {
    let factor = if option == 0 {
        match level {
            1 => 12,
            2 => 8,
            3 => 6,
            4 => 4,
            _ => return Err(Error::config(format!("invalid EEP option-0 level {level}"))),
        }
    } else {
        match level {
            1 => return Ok((bitrate / 32) * 27),
            2 => return Ok((bitrate / 32) * 21),
            3 => return Ok((bitrate / 32) * 18),
            4 => return Ok((bitrate / 32) * 15),
            _ => return Err(Error::config(format!("invalid EEP option-1 level {level}"))),
        }
    };
    Ok((bitrate / 8) * factor)
}

/// `framesize_cu` for short-form (UEP) subchannels.
#[allow(clippy::too_many_lines)]
fn framesize_cu_short(bitrate: usize, level: u8) -> Result<usize> {
    let cu = match (bitrate, level) {
        (32, 1) => 35,
        (32, 2) => 29,
        (32, 3) => 24,
        (32, 4) => 21,
        (32, 5) => 16,
        (48, 1) => 52,
        (48, 2) => 42,
        (48, 3) => 35,
        (48, 4) => 29,
        (48, 5) => 24,
        (56, 2) => 52,
        (56, 3) => 42,
        (56, 4) => 35,
        (56, 5) => 29,
        (64, 1) => 70,
        (64, 2) => 58,
        (64, 3) => 48,
        (64, 4) => 42,
        (64, 5) => 32,
        (80, 1) => 84,
        (80, 2) => 70,
        (80, 3) => 58,
        (80, 4) => 52,
        (80, 5) => 40,
        (96, 1) => 104,
        (96, 2) => 84,
        (96, 3) => 70,
        (96, 4) => 58,
        (96, 5) => 48,
        (112, 2) => 104,
        (112, 3) => 84,
        (112, 4) => 70,
        (112, 5) => 58,
        (128, 1) => 140,
        (128, 2) => 116,
        (128, 3) => 96,
        (128, 4) => 84,
        (128, 5) => 64,
        (160, 1) => 168,
        (160, 2) => 140,
        (160, 3) => 116,
        (160, 4) => 104,
        (160, 5) => 80,
        (192, 1) => 208,
        (192, 2) => 168,
        (192, 3) => 140,
        (192, 4) => 116,
        (192, 5) => 96,
        (224, 1) => 232,
        (224, 2) => 208,
        (224, 3) => 168,
        (224, 4) => 140,
        (224, 5) => 116,
        (256, 1) => 280,
        (256, 2) => 232,
        (256, 3) => 192,
        (256, 4) => 168,
        (256, 5) => 128,
        (320, 2) => 280,
        (320, 4) => 208,
        (320, 5) => 160,
        (384, 1) => 416,
        (384, 3) => 280,
        (384, 5) => 192,
        _ => {
            return Err(Error::config(format!(
                "framesize_cu undefined for {bitrate} kb/s UEP level {level}"
            )))
        }
    };
    Ok(cu)
}

/// The complete puncturing-rule sequence for a subchannel with the given
/// `tpl` field and `bitrate` (kb/s), with the tail rule appended.
pub fn puncturing_rules(tpl: u8, bitrate: usize) -> Result<PuncturingEngine> {
    let t = Tpl::decode(tpl);
    let rules = if t.long_form {
        match t.option {
            0 => eep_option0(t.level, bitrate)?,
            1 => eep_option1(t.level, bitrate)?,
            _ => return Err(Error::config(format!("invalid EEP protection option {}", t.option))),
        }
    } else {
        uep_rules(bitrate, t.level)?
    };
    Ok(PuncturingEngine::new(rules))
}

/// The fixed two-rule FIC puncturing sequence (ETS 300 401 clause 11.3.3):
/// rate-3/4-equivalent puncturing of the FIC's convolutionally-encoded
/// bytes, independent of ensemble configuration.
#[must_use]
pub fn fic_rules() -> PuncturingEngine {
    PuncturingEngine::new(vec![rule(21 * 16, P17), rule(3 * 16, P13)])
}

/// `framesize_cu` (a subchannel's size in Capacity Units, 1 CU = 8 bytes)
/// for the given `tpl` and `bitrate` (kb/s).
pub fn framesize_cu(tpl: u8, bitrate: usize) -> Result<usize> {
    let t = Tpl::decode(tpl);
    if t.long_form {
        framesize_cu_long(t.option, t.level, bitrate)
    } else {
        framesize_cu_short(bitrate, t.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tpl_decodes_long_form() {
        // form=1, option=1, level=3 (0b1_001_10): 0x26
        let t = Tpl::decode(0b0010_0110);
        assert!(t.long_form);
        assert_eq!(t.option, 1);
        assert_eq!(t.level, 3);
    }

    #[test]
    fn tpl_decodes_short_form() {
        let t = Tpl::decode(0b0000_0011);
        assert!(!t.long_form);
        assert_eq!(t.level, 4);
    }

    #[test]
    fn uep_32kbps_level1_matches_s5() {
        let engine = puncturing_rules(0, 32).unwrap();
        let expected = 3 * 16 * P24.count_ones() as usize
            + 5 * 16 * P17.count_ones() as usize
            + 13 * 16 * P12.count_ones() as usize
            + 3 * 16 * P17.count_ones() as usize
            + 3 * 0xCC_CCCCu32.count_ones() as usize;
        assert_eq!(engine.output_bits(1), expected);
    }

    #[test]
    fn unknown_uep_combination_is_config_error() {
        assert!(uep_rules(32, 9).is_err());
        assert!(uep_rules(320, 1).is_err());
    }

    #[test]
    fn framesize_cu_short_form_matches_table() {
        assert_eq!(framesize_cu(0, 32).unwrap(), 35);
        assert_eq!(framesize_cu(0x04, 384).unwrap(), 192);
    }

    #[test]
    fn framesize_cu_long_form_formulas() {
        // form=1, option=0, level=1 => (bitrate/8)*12
        assert_eq!(framesize_cu(0b0010_0000, 64).unwrap(), 96);
        // form=1, option=1, level=1 => (bitrate/32)*27
        assert_eq!(framesize_cu(0b0010_0100, 64).unwrap(), 54);
    }
}
