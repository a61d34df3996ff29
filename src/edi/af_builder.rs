//! Per-`pseq` reassembly of an AF packet out of PFT fragments.

use std::collections::HashMap;

use crate::edi::fragment::Fragment;
use crate::rs::{self, ReedSolomon};
use crate::{Error, Result};

/// What [`AfBuilder::decode_attempt`] thinks about the current fragment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeAttempt {
    /// All `fcount` fragments are present; assembly is exact.
    Yes,
    /// Not all fragments are present, but (assuming FEC) likely enough of
    /// them are to recover the rest with Reed-Solomon.
    Maybe,
    /// Too few fragments to even attempt recovery.
    No,
}

/// Reassembles the fragments of a single AF packet (one `pseq` value).
pub struct AfBuilder {
    pseq: u16,
    fcount: u32,
    fragments: HashMap<u32, Fragment>,
    /// Fields cached from the first fragment received, since the spec
    /// requires every fragment of a packet to agree on them.
    fec: bool,
    rs_k: Option<u8>,
    rs_z: Option<u8>,
    /// Remaining lifetime, measured in fragment/packet arrivals, before this
    /// builder gives up and is discarded by the owning [`super::pft_manager::PftManager`].
    pub lifetime: u32,
}

impl AfBuilder {
    /// Start a new builder for `pseq`, expecting `fcount` fragments, given
    /// `lifetime` arrivals to complete before expiring.
    #[must_use]
    pub fn new(pseq: u16, fcount: u32, lifetime: u32) -> Self {
        Self {
            pseq,
            fcount,
            fragments: HashMap::new(),
            fec: false,
            rs_k: None,
            rs_z: None,
            lifetime,
        }
    }

    /// Sequence number this builder is collecting fragments for.
    #[must_use]
    pub fn pseq(&self) -> u16 {
        self.pseq
    }

    /// Number of fragments currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether no fragment has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Store `frag`, rejecting it if it doesn't belong to this packet.
    pub fn push(&mut self, frag: Fragment) -> Result<()> {
        if frag.pseq != self.pseq {
            return Err(Error::protocol(format!(
                "fragment pseq {} does not match builder pseq {}",
                frag.pseq, self.pseq
            )));
        }
        if frag.fcount != self.fcount {
            return Err(Error::protocol(format!(
                "fragment fcount {} does not match builder fcount {}",
                frag.fcount, self.fcount
            )));
        }
        if self.fragments.is_empty() {
            self.fec = frag.fec;
            self.rs_k = frag.rs_k;
            self.rs_z = frag.rs_z;
        }
        self.fragments.entry(frag.findex).or_insert(frag);
        Ok(())
    }

    /// The fragment used to represent the packet's shared header fields:
    /// the first stored fragment that isn't the (possibly short) terminal
    /// one, or, failing that, whatever is stored.
    fn representative(&self) -> Option<&Fragment> {
        let terminal = self.fcount.saturating_sub(1);
        self.fragments
            .values()
            .filter(|f| f.findex != terminal || self.fcount == 1)
            .min_by_key(|f| f.findex)
            .or_else(|| self.fragments.values().min_by_key(|f| f.findex))
    }

    /// Decide whether assembly is possible yet.
    #[must_use]
    pub fn decode_attempt(&self) -> DecodeAttempt {
        if self.fragments.is_empty() {
            return DecodeAttempt::No;
        }
        if self.fragments.len() as u32 == self.fcount {
            return DecodeAttempt::Yes;
        }
        let Some(rep) = self.representative() else {
            return DecodeAttempt::No;
        };
        if !rep.fec {
            // Without FEC there is no partial recovery: either every
            // fragment showed up, or assembly is impossible.
            return DecodeAttempt::No;
        }
        let plen = u32::from(rep.plen);
        let rs_k = u32::from(rep.rs_k.unwrap_or(0));
        if plen == 0 || rs_k == 0 {
            return DecodeAttempt::No;
        }
        let c_max = (self.fcount * plen) / (rs_k + rs::NROOTS as u32);
        let r_min = self.fcount - (c_max * rs::NROOTS as u32) / plen;
        if self.fragments.len() as u32 >= r_min {
            DecodeAttempt::Maybe
        } else {
            DecodeAttempt::No
        }
    }

    /// Attempt to assemble the AF packet from the fragments held so far.
    ///
    /// Returns `Ok(None)` for a recoverable failure (too few fragments, RS
    /// decode failure beyond correction capacity, or AF CRC mismatch after
    /// assembly) — the caller should treat this as one lost AF packet, not
    /// a fatal error.
    pub fn extract(&self) -> Result<Option<Vec<u8>>> {
        let Some(rep) = self.representative() else {
            return Ok(None);
        };
        let assembled = if !rep.fec {
            self.extract_no_fec()?
        } else {
            match self.extract_fec(rep)? {
                Some(bytes) => bytes,
                None => return Ok(None),
            }
        };
        if !verify_af_packet_crc(&assembled) {
            return Ok(None);
        }
        Ok(Some(assembled))
    }

    fn extract_no_fec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for findex in 0..self.fcount {
            let Some(frag) = self.fragments.get(&findex) else {
                return Err(Error::transient(format!(
                    "missing fragment {findex} of pseq {}",
                    self.pseq
                )));
            };
            out.extend_from_slice(&frag.payload);
        }
        Ok(out)
    }

    fn extract_fec(&self, rep: &Fragment) -> Result<Option<Vec<u8>>> {
        let plen = usize::from(rep.plen);
        let rs_k = usize::from(rep.rs_k.unwrap_or(0));
        let rs_z = usize::from(rep.rs_z.unwrap_or(0));
        if plen == 0 || rs_k == 0 || rs_k > rs::NN - rs::NROOTS {
            return Ok(None);
        }
        let fcount = self.fcount as usize;

        // Column-major deinterleave: block[k*fcount + j] is byte k of
        // fragment j's payload.
        let mut block = vec![0u8; plen * fcount];
        let mut erased = vec![false; plen * fcount];
        for j in 0..fcount {
            match self.fragments.get(&(j as u32)) {
                Some(frag) => {
                    for (k, &b) in frag.payload.iter().enumerate() {
                        block[k * fcount + j] = b;
                    }
                }
                None => {
                    for k in 0..plen {
                        erased[k * fcount + j] = true;
                    }
                }
            }
        }

        let chunk_len = rs_k + rs::NROOTS;
        let c_max = block.len() / chunk_len;
        if c_max == 0 {
            return Ok(None);
        }
        let rs = ReedSolomon::new();
        let mut out = Vec::with_capacity(c_max * rs_k);
        for c in 0..c_max {
            let start = c * chunk_len;

            // The wire codeword is shortened by zero-padding *between* the
            // data and parity, not before the data: `rs_k` data bytes, then
            // a virtual zero gap up to byte 207, then the 48 parity bytes
            // at fixed absolute positions 207..255 (`AFBuilder::extractAF`).
            // Materialise that full 255-byte codeword explicitly so
            // `ReedSolomon::decode` sees every symbol at its true position,
            // rather than relying on its generic front-pad shortening
            // convention, which assumes the gap precedes the data.
            let mut codeword = vec![0u8; rs::NN];
            codeword[..rs_k].copy_from_slice(&block[start..start + rs_k]);
            codeword[207..255].copy_from_slice(&block[start + rs_k..start + chunk_len]);

            let eras_pos: Vec<usize> = (0..chunk_len)
                .filter(|&i| erased[start + i])
                .map(|i| if i < rs_k { i } else { 207 + (i - rs_k) })
                .collect();
            if eras_pos.len() > rs::NROOTS {
                return Ok(None);
            }
            if rs.decode(&mut codeword, &eras_pos).is_none() {
                return Ok(None);
            }
            out.extend_from_slice(&codeword[..rs_k]);
        }
        if rs_z > out.len() {
            return Ok(None);
        }
        out.truncate(out.len() - rs_z);
        Ok(Some(out))
    }
}

/// Verify the trailing CRC-16 of a just-assembled AF packet, per the
/// `AFPacket` layout: header + payload, then a 2-byte CRC.
fn verify_af_packet_crc(bytes: &[u8]) -> bool {
    if bytes.len() < 12 {
        return false;
    }
    let want = u16::from_be_bytes([bytes[bytes.len() - 2], bytes[bytes.len() - 1]]);
    crate::crc16::verify(&bytes[..bytes.len() - 2], want)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edi::fragment::{self, Fragment};

    fn af_packet(seq: u16, payload: &[u8]) -> Vec<u8> {
        let mut pkt = vec![b'A', b'F'];
        let len = payload.len() as u32 + 2; // +2 for the payload-type + flags... simplified for tests.
        pkt.extend(len.to_be_bytes());
        pkt.extend(seq.to_be_bytes());
        pkt.push(0x80); // CRC present, rev 0.0
        pkt.push(b'T');
        pkt.extend_from_slice(payload);
        let crc = crate::crc16::crc16(&pkt);
        pkt.extend(crc.to_be_bytes());
        pkt
    }

    fn no_fec_fragment(pseq: u16, findex: u32, fcount: u32, payload: &[u8]) -> Fragment {
        let mut h = vec![b'P', b'F'];
        h.extend(pseq.to_be_bytes());
        h.extend(&findex.to_be_bytes()[1..]);
        h.extend(&fcount.to_be_bytes()[1..]);
        let plen = payload.len() as u16;
        h.push((plen >> 8) as u8 & 0x3F);
        h.push((plen & 0xFF) as u8);
        let crc = crate::crc16::crc16(&h);
        h.extend(crc.to_be_bytes());
        h.extend_from_slice(payload);
        fragment::parse(&h).unwrap().1.unwrap()
    }

    #[test]
    fn assembles_complete_no_fec_packet() {
        let packet = af_packet(1, b"hello world!");
        let chunks: Vec<&[u8]> = packet.chunks(5).collect();
        let fcount = chunks.len() as u32;
        let mut b = AfBuilder::new(1, fcount, 10);
        for (i, c) in chunks.iter().enumerate() {
            b.push(no_fec_fragment(1, i as u32, fcount, c)).unwrap();
        }
        assert_eq!(b.decode_attempt(), DecodeAttempt::Yes);
        let out = b.extract().unwrap().unwrap();
        assert_eq!(out, packet);
    }

    #[test]
    fn no_fec_missing_fragment_is_unrecoverable() {
        let packet = af_packet(2, b"some payload data here");
        let chunks: Vec<&[u8]> = packet.chunks(6).collect();
        let fcount = chunks.len() as u32;
        assert!(fcount > 1);
        let mut b = AfBuilder::new(2, fcount, 10);
        for (i, c) in chunks.iter().enumerate().skip(1) {
            b.push(no_fec_fragment(2, i as u32, fcount, c)).unwrap();
        }
        assert_eq!(b.decode_attempt(), DecodeAttempt::No);
        assert!(b.extract().unwrap().is_none());
    }

    #[test]
    fn rejects_fragment_with_mismatched_pseq() {
        let mut b = AfBuilder::new(5, 2, 10);
        let frag = no_fec_fragment(6, 0, 2, b"x");
        assert!(b.push(frag).is_err());
    }
}
