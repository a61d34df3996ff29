/*! Reed-Solomon RS(255, k) erasure decoding over GF(256).

The PFT layer protects an AF packet by splitting it into `fcount` fragments
and running RS(255, `rs_k`) across the bytes at matching offsets in each
fragment (see [`crate::edi::af_builder`]). This module implements just the
decoder half (the encoder lives upstream, outside this crate's scope): given
a 255-byte codeword, possibly with some bytes erased (known-bad positions),
recover the original `rs_k` data bytes.

Field: GF(256) with the primitive polynomial `x^8 + x^4 + x^3 + x^2 + 1`
(`0x11D`), first consecutive root `alpha^1`, primitive element `alpha^1`,
and `NROOTS = 48` parity symbols, matching ETS 300 401's PFT layer. This is
the classic Berlekamp-Massey / Chien-search / Forney decoder (the same
algorithm `libfec`'s `decode_rs_char` implements), reimplemented here from
the algorithm rather than linked as a C dependency.
*/

/// Parity symbols per RS(255, k) codeword, per ETS 300 401 Annex F.2.
pub const NROOTS: usize = 48;

/// Codeword length of the (unshortened) code.
pub(crate) const NN: usize = 255;

/// Sentinel index-form value meaning "the zero element" (there is no log of
/// zero, so `A0 = NN` is used as a reserved marker throughout).
const A0: usize = NN;

fn modnn(x: i32) -> usize {
    let mut x = x;
    while x >= NN as i32 {
        x -= NN as i32;
    }
    while x < 0 {
        x += NN as i32;
    }
    x as usize
}

/// GF(256) log/antilog tables for a given primitive polynomial.
struct Gf256 {
    /// `alpha_to[i]` = alpha^i, for i in 0..=NN (alpha_to[NN] == alpha_to[0]).
    alpha_to: [u8; NN + 1],
    /// `index_of[x]` = i such that alpha^i == x, for x != 0. `index_of[0] == A0`.
    index_of: [usize; NN + 1],
}

impl Gf256 {
    fn new(poly: u16) -> Self {
        let mut alpha_to = [0u8; NN + 1];
        let mut index_of = [0usize; NN + 1];
        let mm = 8usize;
        let mut mask = 1usize;
        for i in 0..mm {
            alpha_to[i] = mask as u8;
            index_of[alpha_to[i] as usize] = i;
            if poly & (1 << i) != 0 {
                alpha_to[mm] ^= mask as u8;
            }
            mask <<= 1;
        }
        index_of[alpha_to[mm] as usize] = mm;
        mask >>= 1;
        for i in (mm + 1)..NN {
            if alpha_to[i - 1] as usize >= mask {
                alpha_to[i] = alpha_to[mm] ^ (((alpha_to[i - 1] as usize ^ mask) << 1) as u8);
            } else {
                alpha_to[i] = alpha_to[i - 1] << 1;
            }
            index_of[alpha_to[i] as usize] = i;
        }
        index_of[0] = A0;
        alpha_to[NN] = alpha_to[0];
        Self { alpha_to, index_of }
    }
}

/// A RS(255, k) erasure decoder, parameterized by the number of data bytes
/// `k` (the rest of the 255-byte codeword, up to [`NROOTS`], is parity).
pub struct ReedSolomon {
    gf: Gf256,
}

impl Default for ReedSolomon {
    fn default() -> Self {
        Self::new()
    }
}

impl ReedSolomon {
    /// Build a decoder for GF(256) with the primitive polynomial `0x11D`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gf: Gf256::new(0x11D),
        }
    }

    /// Decode a (possibly shortened) RS(255, k) codeword in place.
    ///
    /// `data` must be exactly `255 - pad` bytes: `k` data bytes followed by
    /// [`NROOTS`] parity bytes, where `pad = 255 - k - NROOTS` zero bytes
    /// are implied (not present in `data`) to virtually restore it to a
    /// full 255-byte codeword. `eras_pos` lists the indices (within `data`,
    /// i.e. already excluding the implied pad) of bytes known to be
    /// erased; up to [`NROOTS`] erasures are supported.
    ///
    /// On success, returns `Some(count)`: the number of symbols corrected.
    /// `data`'s first `k` bytes are the corrected data bytes. Returns `None`
    /// if the codeword has more errors than RS(255, k) can correct.
    pub fn decode(&self, data: &mut [u8], eras_pos: &[usize]) -> Option<usize> {
        let pad = NN - data.len();
        let no_eras = eras_pos.len();
        assert!(no_eras <= NROOTS, "too many erasures for this decoder");
        let alpha_to = &self.gf.alpha_to;
        let index_of = &self.gf.index_of;

        let mut s = [0u8; NROOTS];
        for si in s.iter_mut() {
            *si = data[0];
        }
        for &byte in &data[1..] {
            for i in 0..NROOTS {
                s[i] = if s[i] == 0 {
                    byte
                } else {
                    // Root alpha^(i+1): FCR == 1, so the i-th root is
                    // alpha^(FCR+i) == alpha^(i+1), not alpha^i.
                    byte ^ alpha_to[modnn(index_of[s[i] as usize] as i32 + i as i32 + 1)]
                };
            }
        }

        let mut syn_error = false;
        let mut s_idx = [0usize; NROOTS];
        for i in 0..NROOTS {
            syn_error |= s[i] != 0;
            s_idx[i] = index_of[s[i] as usize];
        }
        if !syn_error {
            return Some(0);
        }

        let mut lambda = [0u8; NROOTS + 1];
        lambda[0] = 1;
        if no_eras > 0 {
            lambda[1] = alpha_to[modnn((NN - 1 - eras_pos[0]) as i32)];
            for i in 1..no_eras {
                let u = modnn((NN - 1 - eras_pos[i]) as i32);
                for j in (1..=i + 1).rev() {
                    let tmp = index_of[lambda[j - 1] as usize];
                    if tmp != A0 {
                        lambda[j] ^= alpha_to[modnn(u as i32 + tmp as i32)];
                    }
                }
            }
        }

        let mut b = [0usize; NROOTS + 1];
        for i in 0..=NROOTS {
            b[i] = index_of[lambda[i] as usize];
        }

        // Berlekamp-Massey to find the error+erasure locator polynomial.
        let mut r = no_eras;
        let mut el = no_eras;
        while r < NROOTS {
            r += 1;
            let mut discr_r = 0u8;
            for i in 0..r {
                if lambda[i] != 0 && s_idx[r - i - 1] != A0 {
                    discr_r ^=
                        alpha_to[modnn(index_of[lambda[i] as usize] as i32 + s_idx[r - i - 1] as i32)];
                }
            }
            let discr_r = index_of[discr_r as usize];
            if discr_r == A0 {
                for i in (1..=NROOTS).rev() {
                    b[i] = b[i - 1];
                }
                b[0] = A0;
            } else {
                let mut t = [0u8; NROOTS + 1];
                t[0] = lambda[0];
                for i in 0..NROOTS {
                    t[i + 1] = if b[i] != A0 {
                        lambda[i + 1] ^ alpha_to[modnn(discr_r as i32 + b[i] as i32)]
                    } else {
                        lambda[i + 1]
                    };
                }
                if 2 * el <= r + no_eras - 1 {
                    el = r + no_eras - el;
                    for i in 0..=NROOTS {
                        b[i] = if lambda[i] == 0 {
                            A0
                        } else {
                            modnn(index_of[lambda[i] as usize] as i32 - discr_r as i32 + NN as i32)
                        };
                    }
                } else {
                    for i in (1..=NROOTS).rev() {
                        b[i] = b[i - 1];
                    }
                    b[0] = A0;
                }
                lambda = t;
            }
        }

        let mut deg_lambda = 0;
        let mut lambda_idx = [0usize; NROOTS + 1];
        for i in 0..=NROOTS {
            lambda_idx[i] = index_of[lambda[i] as usize];
            if lambda_idx[i] != A0 {
                deg_lambda = i;
            }
        }

        // Chien search for the roots of lambda(x).
        let mut reg = [0usize; NROOTS + 1];
        reg[1..=NROOTS].copy_from_slice(&lambda_idx[1..=NROOTS]);
        let mut root = [0usize; NROOTS];
        let mut loc = [0usize; NROOTS];
        let mut count = 0usize;
        let mut k = 0usize; // IPRIM - 1 == 0, since IPRIM == 1.
        for i in 1..=NN {
            let mut q = 1u8;
            for j in (1..=deg_lambda).rev() {
                if reg[j] != A0 {
                    reg[j] = modnn(reg[j] as i32 + j as i32);
                    q ^= alpha_to[reg[j]];
                }
            }
            if q == 0 {
                root[count] = i;
                loc[count] = k;
                count += 1;
                if count == deg_lambda {
                    break;
                }
            }
            k = modnn(k as i32 + 1);
        }
        if deg_lambda != count {
            return None; // Uncorrectable: more roots expected than found.
        }

        // Evaluator polynomial omega(x) = s(x)*lambda(x) mod x^NROOTS.
        let mut deg_omega = 0;
        let mut omega = [0usize; NROOTS + 1];
        for i in 0..NROOTS {
            let mut tmp = 0u8;
            let jmax = deg_lambda.min(i);
            for j in 0..=jmax {
                if s_idx[i - j] != A0 && lambda_idx[j] != A0 {
                    tmp ^= alpha_to[modnn(s_idx[i - j] as i32 + lambda_idx[j] as i32)];
                }
            }
            if tmp != 0 {
                deg_omega = i;
            }
            omega[i] = index_of[tmp as usize];
        }
        omega[NROOTS] = A0;

        // Forney: compute error/erasure magnitudes and apply them.
        for j in (0..count).rev() {
            let mut num1 = 0u8;
            for i in (0..=deg_omega).rev() {
                if omega[i] != A0 {
                    num1 ^= alpha_to[modnn(omega[i] as i32 + (i * root[j]) as i32)];
                }
            }
            // num2 = inv(X(l))^(FCR-1) = alpha^0 = 1, since FCR == 1.
            let num2 = 1u8;
            let mut den = 0u8;
            let top = deg_lambda.min(NROOTS - 1) & !1usize;
            let mut i = top as i32;
            while i >= 0 {
                let idx = i as usize;
                if lambda_idx[idx + 1] != A0 {
                    den ^= alpha_to[modnn(lambda_idx[idx + 1] as i32 + (idx * root[j]) as i32)];
                }
                i -= 2;
            }
            if den == 0 {
                return None; // Degenerate derivative: uncorrectable.
            }
            if num1 != 0 {
                let pos = loc[j];
                if pos < pad {
                    // Error located inside the implied (virtual) zero pad: the
                    // erroneous byte isn't actually present in `data`, so
                    // there's nothing to fix, but it still counts as located.
                    continue;
                }
                let data_pos = pos - pad;
                data[data_pos] ^=
                    alpha_to[modnn(index_of[num1 as usize] as i32 + index_of[num2 as usize] as i32
                        - index_of[den as usize] as i32
                        + NN as i32)];
            }
        }
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A trivial systematic encoder used only by tests, to produce codewords
    /// this module's decoder can then be exercised against. Not part of the
    /// public API: real PFT senders (outside this crate) do the encoding.
    fn encode(data: &[u8], k: usize) -> Vec<u8> {
        // Re-derive the generator polynomial the same way libfec does, in
        // index form, then do the standard LFSR-based systematic encode.
        let gf = Gf256::new(0x11D);
        let mut genpoly = vec![0u8; NROOTS + 1];
        genpoly[0] = 1;
        for i in 0..NROOTS {
            genpoly[i + 1] = 1;
            for j in (1..=i).rev() {
                if genpoly[j] != 0 {
                    genpoly[j] = genpoly[j - 1]
                        ^ gf.alpha_to[modnn(gf.index_of[genpoly[j] as usize] as i32 + (1 + i) as i32)];
                } else {
                    genpoly[j] = genpoly[j - 1];
                }
            }
            genpoly[0] = gf.alpha_to[modnn(gf.index_of[genpoly[0] as usize] as i32 + (1 + i) as i32)];
        }
        let genpoly_idx: Vec<usize> = genpoly.iter().map(|&v| gf.index_of[v as usize]).collect();

        let mut parity = vec![0u8; NROOTS];
        for &byte in &data[..k] {
            let feedback = gf.index_of[(byte ^ parity[0]) as usize];
            if feedback != A0 {
                for j in 1..NROOTS {
                    parity[j - 1] = parity[j] ^ gf.alpha_to[modnn(feedback as i32 + genpoly_idx[NROOTS - j] as i32)];
                }
            } else {
                for j in 1..NROOTS {
                    parity[j - 1] = parity[j];
                }
            }
            let last = if feedback != A0 {
                gf.alpha_to[modnn(feedback as i32 + genpoly_idx[0] as i32)]
            } else {
                0
            };
            *parity.last_mut().unwrap() = last;
        }
        let mut out = data[..k].to_vec();
        out.extend_from_slice(&parity);
        out
    }

    #[test]
    fn decodes_clean_codeword_with_zero_corrections() {
        let data: Vec<u8> = (0..207u16).map(|i| (i * 7) as u8).collect();
        let mut cw = encode(&data, 207);
        let rs = ReedSolomon::new();
        let n = rs.decode(&mut cw, &[]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(&cw[..207], &data[..]);
    }

    #[test]
    fn recovers_from_erasures_up_to_nroots() {
        let data: Vec<u8> = (0..207u16).map(|i| (i * 3 + 1) as u8).collect();
        let cw = encode(&data, 207);
        let mut corrupted = cw.clone();
        let eras_pos: Vec<usize> = (0..NROOTS).map(|i| i * 5 % 255).collect();
        let mut eras_pos = eras_pos;
        eras_pos.sort_unstable();
        eras_pos.dedup();
        for &p in &eras_pos {
            corrupted[p] = 0;
        }
        let rs = ReedSolomon::new();
        let n = rs.decode(&mut corrupted, &eras_pos).unwrap();
        assert_eq!(n, eras_pos.len());
        assert_eq!(&corrupted[..207], &data[..]);
    }

    #[test]
    fn shortened_codeword_via_virtual_pad() {
        // rs_k = 100: codeword is 100 + 48 = 148 bytes, virtually padded
        // with 255 - 148 = 107 zero bytes to make a full 255-byte codeword.
        let k = 100;
        let data: Vec<u8> = (0..k as u16).map(|i| (i * 11) as u8).collect();
        let mut shortened = encode(&data, k);
        let mut eras_pos = vec![3usize, 10, 55];
        for &p in &eras_pos {
            shortened[p] = 0;
        }
        eras_pos.sort_unstable();
        let rs = ReedSolomon::new();
        let n = rs.decode(&mut shortened, &eras_pos).unwrap();
        assert_eq!(n, eras_pos.len());
        assert_eq!(&shortened[..k], &data[..]);
    }
}
