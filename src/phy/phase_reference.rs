//! Phase reference symbol generator (ETS 300 401 clause 14.3.2, table 43):
//! the fixed, mode-dependent QPSK symbol vector transmitted as carrier 0's
//! differential-modulation reference (the "phase reference symbol").

use crate::phy::mode::Mode;
use crate::Complex;

/// `h_{i,k}` table (ETS 300 401 table 43), rows indexed `0..4`, each 32
/// entries wide (duplicated twice internally by the standard; only the
/// first 32-wide half is needed here since indices never exceed 31).
const H: [[u8; 32]; 4] = [
    [
        0, 2, 0, 0, 0, 0, 1, 1, 2, 0, 0, 0, 2, 2, 1, 1, 0, 2, 0, 0, 0, 0, 1, 1, 2, 0, 0, 0, 2, 2,
        1, 1,
    ],
    [
        0, 3, 2, 3, 0, 1, 3, 0, 2, 1, 2, 3, 2, 3, 3, 0, 0, 3, 2, 3, 0, 1, 3, 0, 2, 1, 2, 3, 2, 3,
        3, 0,
    ],
    [
        0, 0, 0, 2, 0, 2, 1, 3, 2, 2, 0, 2, 2, 0, 1, 3, 0, 0, 0, 2, 0, 2, 1, 3, 2, 2, 0, 2, 2, 0,
        1, 3,
    ],
    [
        0, 1, 2, 1, 0, 3, 3, 2, 2, 3, 2, 1, 2, 1, 3, 2, 0, 1, 2, 1, 0, 3, 3, 2, 2, 3, 2, 1, 2, 1,
        3, 2,
    ],
];

/// `(h_row, n)` per 32-carrier block, mode 0/4 (24 blocks, 768 carriers).
const TABLE_MODE_0: [(u8, u8); 24] = [
    (0, 0),
    (3, 1),
    (2, 0),
    (1, 2),
    (0, 0),
    (3, 1),
    (2, 2),
    (1, 2),
    (0, 2),
    (3, 1),
    (2, 3),
    (1, 0),
    (0, 0),
    (1, 1),
    (2, 1),
    (3, 2),
    (0, 2),
    (1, 2),
    (2, 0),
    (3, 3),
    (0, 3),
    (1, 1),
    (2, 3),
    (3, 2),
];

/// Mode 1 (48 blocks, 1536 carriers).
const TABLE_MODE_1: [(u8, u8); 48] = [
    (0, 3),
    (3, 1),
    (2, 1),
    (1, 1),
    (0, 2),
    (3, 2),
    (2, 1),
    (1, 0),
    (0, 2),
    (3, 2),
    (2, 3),
    (1, 3),
    (0, 0),
    (3, 2),
    (2, 1),
    (1, 3),
    (0, 3),
    (3, 3),
    (2, 3),
    (1, 0),
    (0, 3),
    (3, 0),
    (2, 1),
    (1, 1),
    (0, 1),
    (1, 2),
    (2, 0),
    (3, 1),
    (0, 3),
    (1, 2),
    (2, 2),
    (3, 3),
    (0, 2),
    (1, 1),
    (2, 2),
    (3, 3),
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 3),
    (0, 2),
    (1, 2),
    (2, 2),
    (3, 1),
    (0, 1),
    (1, 3),
    (2, 1),
    (3, 2),
];

/// Mode 2 (12 blocks, 384 carriers).
const TABLE_MODE_2: [(u8, u8); 12] = [
    (2, 0),
    (1, 2),
    (0, 2),
    (3, 1),
    (2, 0),
    (1, 3),
    (0, 2),
    (1, 3),
    (2, 2),
    (3, 2),
    (0, 1),
    (1, 2),
];

/// Mode 3 (6 blocks, 192 carriers).
const TABLE_MODE_3: [(u8, u8); 6] = [(3, 2), (2, 2), (1, 2), (0, 2), (1, 3), (2, 0)];

fn convert(data: u8) -> Complex {
    match data % 4 {
        0 => Complex::new(1.0, 0.0),
        1 => Complex::new(0.0, 1.0),
        2 => Complex::new(-1.0, 0.0),
        _ => Complex::new(0.0, -1.0),
    }
}

/// Generate the `nb_carriers`-long phase reference symbol for `mode`.
#[must_use]
pub fn generate(mode: Mode) -> Vec<Complex> {
    let table: &[(u8, u8)] = match mode {
        Mode::Four => &TABLE_MODE_0,
        Mode::One => &TABLE_MODE_1,
        Mode::Two => &TABLE_MODE_2,
        Mode::Three => &TABLE_MODE_3,
    };
    let mut out = Vec::with_capacity(table.len() * 32);
    for &(h_row, n) in table {
        for &h in &H[h_row as usize] {
            out.push(convert(h + n));
        }
    }
    out
}
