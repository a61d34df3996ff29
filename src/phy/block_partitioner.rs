//! CIF construction and transmission-frame assembly (ETS 300 401 clause
//! 5.2): [`CifMux`] multiplexes one Common Interleaved Frame from the PRBS
//! base sequence and each subchannel's processed bitstream; [`BlockPartitioner`]
//! collects `cif_count` CIFs plus their FIC blocks into one transmission
//! frame, dropping leading CIFs to synchronise to a requested phase.

use crate::phy::mode::Mode;
use crate::phy::scrambler::Scrambler;
use crate::{Error, Result};

/// Bytes in one Common Interleaved Frame (864 CUs of 8 bytes each).
pub const CIF_SIZE: usize = 864 * 8;

/// Builds one CIF: a PRBS-filled base buffer with each subchannel's
/// processed bytes overwritten at its start address.
pub struct CifMux {
    base: Vec<u8>,
}

impl CifMux {
    /// Create a multiplexer. The PRBS base sequence is generated once and
    /// reused for every CIF.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Scrambler::dab().sequence(CIF_SIZE),
        }
    }

    /// Build one CIF from `subchannels`, each `(start_address_cu, data)`
    /// with `data.len()` equal to that subchannel's `framesize_cu * 8`.
    pub fn build(&self, subchannels: &[(u16, &[u8])]) -> Result<Vec<u8>> {
        let mut cif = self.base.clone();
        for &(start_address, data) in subchannels {
            let offset = start_address as usize * 8;
            if offset + data.len() > cif.len() {
                return Err(Error::invariant(format!(
                    "subchannel at start address {start_address} (offset {offset}, {} bytes) overruns the CIF",
                    data.len()
                )));
            }
            cif[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(cif)
    }
}

impl Default for CifMux {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles `cif_count` `(FIC, CIF)` pairs into one transmission frame,
/// dropping CIFs until a requested phase offset is reached.
pub struct BlockPartitioner {
    fic_size: usize,
    cif_count: usize,
    cif_phase: usize,
    cif_nb: usize,
    buffer: Vec<u8>,
}

impl BlockPartitioner {
    /// Build a partitioner for `mode`, synchronising to the CIF `phase`
    /// (e.g. the frame's `FP` field) modulo the mode's `cif_count`.
    #[must_use]
    pub fn new(mode: Mode, phase: usize) -> Self {
        let p = mode.params();
        let buffer_len = p.cif_count * (p.fic_size_out + CIF_SIZE);
        Self {
            fic_size: p.fic_size_out,
            cif_count: p.cif_count,
            cif_phase: phase % p.cif_count,
            cif_nb: 0,
            buffer: vec![0u8; buffer_len],
        }
    }

    /// Feed one `(fic, cif)` pair. Returns the assembled transmission frame
    /// once `cif_count` pairs have accumulated past the initial phase sync,
    /// or `None` while still accumulating or dropping for phase sync.
    pub fn process(&mut self, fic: &[u8], cif: &[u8]) -> Result<Option<Vec<u8>>> {
        if fic.len() != self.fic_size {
            return Err(Error::invariant(format!(
                "block partitioner FIC is {} bytes, expected {}",
                fic.len(),
                self.fic_size
            )));
        }
        if cif.len() != CIF_SIZE {
            return Err(Error::invariant(format!(
                "block partitioner CIF is {} bytes, expected {CIF_SIZE}",
                cif.len()
            )));
        }

        if self.cif_phase != 0 {
            self.cif_phase += 1;
            if self.cif_phase == self.cif_count {
                self.cif_phase = 0;
            }
            return Ok(None);
        }

        let fic_off = self.cif_nb * self.fic_size;
        self.buffer[fic_off..fic_off + self.fic_size].copy_from_slice(fic);
        let cif_off = self.cif_count * self.fic_size + self.cif_nb * CIF_SIZE;
        self.buffer[cif_off..cif_off + CIF_SIZE].copy_from_slice(cif);

        self.cif_nb += 1;
        if self.cif_nb == self.cif_count {
            self.cif_nb = 0;
            Ok(Some(self.buffer.clone()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mux_overwrites_prbs_base_at_start_address() {
        let mux = CifMux::new();
        let sub = vec![0xFFu8; 16];
        let cif = mux.build(&[(0, &sub)]).unwrap();
        assert_eq!(&cif[0..16], &sub[..]);
        assert_ne!(&cif[16..32], &sub[..16]);
    }

    #[test]
    fn mux_rejects_subchannel_overrunning_the_cif() {
        let mux = CifMux::new();
        let sub = vec![0u8; 16];
        assert!(mux.build(&[(860, &sub)]).is_err());
    }

    #[test]
    fn partitioner_assembles_a_frame_after_cif_count_pairs() {
        let mut bp = BlockPartitioner::new(Mode::Two, 0);
        let fic = vec![0u8; Mode::Two.params().fic_size_out];
        let cif = vec![0u8; CIF_SIZE];
        // Mode::Two has cif_count == 1, so the very first pair completes a
        // transmission frame.
        let out = bp.process(&fic, &cif).unwrap();
        assert!(out.is_some());
        assert_eq!(out.unwrap().len(), Mode::Two.params().fic_size_out + CIF_SIZE);
    }

    #[test]
    fn partitioner_accumulates_multiple_cifs_for_mode1() {
        let mut bp = BlockPartitioner::new(Mode::One, 0);
        let fic = vec![0u8; Mode::One.params().fic_size_out];
        let cif = vec![0u8; CIF_SIZE];
        let mut last = None;
        for _ in 0..4 {
            last = bp.process(&fic, &cif).unwrap();
        }
        assert!(last.is_some());
        let frame = last.unwrap();
        assert_eq!(frame.len(), 4 * (Mode::One.params().fic_size_out + CIF_SIZE));
    }

    #[test]
    fn partitioner_drops_cifs_until_phase_is_reached() {
        let mut bp = BlockPartitioner::new(Mode::Four, 1);
        let fic = vec![0u8; Mode::Four.params().fic_size_out];
        let cif = vec![0u8; CIF_SIZE];
        // Phase 1 of 2: the first pair is dropped for phase sync, then a
        // full cif_count=2 pairs are needed to complete a frame.
        assert!(bp.process(&fic, &cif).unwrap().is_none());
        assert!(bp.process(&fic, &cif).unwrap().is_none());
        assert!(bp.process(&fic, &cif).unwrap().is_some());
    }
}
