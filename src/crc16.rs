//! CRC-16/CCITT-FALSE, used by PFT fragment headers, AF packets, and ETI
//! EOH/EOF trailers.
//!
//! Polynomial 0x1021, initial value 0xFFFF, no input/output reflection,
//! final XOR 0xFFFF.

/// Precomputed table for the 0x1021 polynomial, MSB-first.
fn table() -> &'static [u16; 256] {
    static TABLE: std::sync::OnceLock<[u16; 256]> = std::sync::OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u16; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u16) << 8;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    })
}

/// Compute CRC-16/CCITT-FALSE over `data`.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let table = table();
    let mut crc: u16 = 0xFFFF;
    for &b in data {
        let idx = ((crc >> 8) ^ u16::from(b)) & 0xFF;
        crc = (crc << 8) ^ table[idx as usize];
    }
    crc ^ 0xFFFF
}

/// Verify `data` against a trailing big-endian CRC-16/CCITT-FALSE, i.e.
/// `data` does not include the CRC bytes.
#[must_use]
pub fn verify(data: &[u8], want: u16) -> bool {
    crc16(data) == want
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        // CRC-16/CCITT-FALSE of the empty string is the init value XORed out.
        assert_eq!(crc16(&[]), 0xFFFF ^ 0xFFFF);
    }

    #[test]
    fn known_vector() {
        // "123456789" is the standard CRC-16/CCITT-FALSE check value.
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn crc_of_message_plus_its_own_crc_is_constant_residue() {
        // Property 7 from the spec: CRC16(bytes || crc16(bytes)) is a fixed
        // residue regardless of the message, because appending the check
        // value always drives the shift register to the same terminal state.
        let a = b"hello world".to_vec();
        let b = b"a completely different message".to_vec();
        let residues: Vec<u16> = [a, b]
            .into_iter()
            .map(|mut msg| {
                let crc = crc16(&msg);
                msg.extend_from_slice(&crc.to_be_bytes());
                crc16(&msg)
            })
            .collect();
        assert_eq!(residues[0], residues[1]);
    }
}
