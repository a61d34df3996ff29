//! ETI(NI) frame parser: the PHY side's counterpart to
//! `edi::eti_collector::EtiCollector::assemble`, decoding a 6144-byte
//! ETI(NI) frame back into its FC, FIC and per-subchannel fields so
//! [`crate::phy::encoder::PhyEncoder`] can run off either `edi::EtiAssembler`
//! or raw ETI(NI) file input.

use crate::{Error, Result};

const ETI_FRAME_LEN: usize = 6144;

/// One subchannel's stream characterisation plus its main-stream data, as
/// decoded from the frame's STC table and MST region.
#[derive(Debug, Clone)]
pub struct ParsedStc {
    /// Subchannel identifier.
    pub scid: u8,
    /// Start address, in capacity units.
    pub sad: u16,
    /// Transport protection level (6-bit encoding, see [`crate::phy::protection::Tpl`]).
    pub tpl: u8,
    /// Main stream data for this subchannel.
    pub mst: Vec<u8>,
}

/// Decoded mirror of one ETI(NI) frame.
#[derive(Debug, Clone)]
pub struct EtiParsedFrame {
    /// Error flag (0xFF = no error detected upstream).
    pub err: u8,
    /// Frame count, 0..=249.
    pub fct: u8,
    /// FIC flag (must be set; this crate requires the FIC to be present).
    pub ficf: bool,
    /// Frame phase, 0..=7.
    pub fp: u8,
    /// Management ID, selecting the FIC length (96 bytes unless `mid == 3`,
    /// where it is 128).
    pub mid: u8,
    /// Fast Information Channel bytes.
    pub fic: Vec<u8>,
    /// Multiplex Network Signalling Channel.
    pub mnsc: u16,
    /// Timestamp field (24-bit `tsta` left-shifted 8 with the low byte
    /// either `0xFF` or, when `ATSTF` was set, a padding marker).
    pub tist: u32,
    /// Subchannels, in STC table order.
    pub stc: Vec<ParsedStc>,
}

impl EtiParsedFrame {
    /// Parse a 6144-byte ETI(NI) frame.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        if frame.len() != ETI_FRAME_LEN {
            return Err(Error::protocol(format!(
                "ETI(NI) frame is {} bytes, expected {ETI_FRAME_LEN}",
                frame.len()
            )));
        }
        match &frame[1..4] {
            [0x07, 0x3A, 0xB6] | [0xF8, 0xC5, 0x49] => {}
            other => {
                return Err(Error::protocol(format!("bad ETI FSYNC {other:02x?}")));
            }
        }
        let err = frame[0];
        let fct = frame[4];
        let ficf = frame[5] & 0x80 != 0;
        let nst = (frame[5] & 0x7F) as usize;
        let fp = (frame[6] >> 5) & 0x7;
        let mid = (frame[6] >> 3) & 0x3;
        let fl = ((u32::from(frame[6] & 0x7)) << 8) | u32::from(frame[7]);

        if !ficf {
            return Err(Error::protocol("ETI(NI) frame has FICF unset"));
        }

        let stc_table_start = 8;
        let stc_table_len = nst * 4;
        if frame.len() < stc_table_start + stc_table_len + 2 + 2 {
            return Err(Error::protocol("ETI(NI) frame too short for its STC table"));
        }

        let mut stc_headers = Vec::with_capacity(nst);
        let mut pos = stc_table_start;
        for _ in 0..nst {
            let b0 = frame[pos];
            let b1 = frame[pos + 1];
            let b2 = frame[pos + 2];
            let b3 = frame[pos + 3];
            let scid = b0 >> 2;
            let sad = (u16::from(b0 & 0x3) << 8) | u16::from(b1);
            let tpl = b2 >> 2;
            let stl = (u16::from(b2 & 0x3) << 8) | u16::from(b3);
            stc_headers.push((scid, sad, tpl, stl as usize));
            pos += 4;
        }

        let mnsc = u16::from_be_bytes([frame[pos], frame[pos + 1]]);
        pos += 2;

        let eoh_crc = u16::from_be_bytes([frame[pos], frame[pos + 1]]);
        let got = crate::crc16::crc16(&frame[4..pos]);
        if eoh_crc != got {
            return Err(Error::Crc {
                context: "ETI EOH",
                expected: eoh_crc,
                got,
            });
        }
        pos += 2;

        let fic_len = if mid != 3 { 24 * 4 } else { 32 * 4 };
        if frame.len() < pos + fic_len {
            return Err(Error::protocol("ETI(NI) frame too short for its FIC"));
        }
        let fic = frame[pos..pos + fic_len].to_vec();
        pos += fic_len;

        let mut stc = Vec::with_capacity(nst);
        for &(scid, sad, tpl, stl) in &stc_headers {
            let mst_len = stl * 8;
            if frame.len() < pos + mst_len {
                return Err(Error::protocol("ETI(NI) frame too short for a subchannel's MST"));
            }
            stc.push(ParsedStc {
                scid,
                sad,
                tpl,
                mst: frame[pos..pos + mst_len].to_vec(),
            });
            pos += mst_len;
        }

        let eof_crc_start = stc_table_start + stc_table_len + 2 + 2;
        let eof_crc = u16::from_be_bytes([frame[pos], frame[pos + 1]]);
        let got = crate::crc16::crc16(&frame[eof_crc_start..pos]);
        if eof_crc != got {
            return Err(Error::Crc {
                context: "ETI EOF",
                expected: eof_crc,
                got,
            });
        }
        pos += 2;

        pos += 2; // RFU
        let tist = u32::from_be_bytes([frame[pos], frame[pos + 1], frame[pos + 2], frame[pos + 3]]);

        let expected_fl = (nst as u32) + 1 + (fic.len() as u32) / 4
            + stc.iter().map(|s| s.mst.len() as u32 / 4).sum::<u32>();
        if fl != expected_fl {
            return Err(Error::protocol(format!(
                "ETI FL field {fl} does not match computed frame length {expected_fl}"
            )));
        }

        Ok(Self {
            err,
            fct,
            ficf,
            fp,
            mid,
            fic,
            mnsc,
            tist,
            stc,
        })
    }
}

/// Chunks a raw byte stream (an ETI(NI) file with no framing of its own)
/// into fixed-size, 6144-byte frames for [`crate::phy::encoder::PhyEncoder`].
///
/// This is the file-input counterpart to `edi::EtiAssembler`: both emit
/// [`NCReadStream<Vec<u8>>`](crate::stream::NCReadStream) of unparsed
/// ETI(NI) frame bytes.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct EtiFrameReader {
    #[dabmod(in)]
    src: crate::stream::ReadStream<u8>,
    #[dabmod(out)]
    dst: crate::stream::NCWriteStream<Vec<u8>>,
}

impl EtiFrameReader {
    /// Create a new `EtiFrameReader`.
    #[must_use]
    pub fn new(src: crate::stream::ReadStream<u8>) -> (Self, crate::stream::NCReadStream<Vec<u8>>) {
        let (dst, rx) = crate::stream::new_nocopy_stream();
        (Self { src, dst }, rx)
    }
}

impl crate::block::Block for EtiFrameReader {
    fn work(&mut self) -> Result<crate::block::BlockRet<'_>> {
        let (i, _tags) = self.src.read_buf()?;
        if i.len() < ETI_FRAME_LEN {
            if self.src.eof() {
                return Ok(crate::block::BlockRet::EOF);
            }
            return Ok(crate::block::BlockRet::WaitForStream(&self.src, ETI_FRAME_LEN));
        }
        let frame = i.slice()[..ETI_FRAME_LEN].to_vec();
        i.consume(ETI_FRAME_LEN);
        self.dst.push(frame, []);
        Ok(crate::block::BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edi::eti_collector::EtiCollector;

    fn ptr_payload() -> Vec<u8> {
        let mut v = b"DETI".to_vec();
        v.extend([0, 0, 0, 0]);
        v
    }

    fn deti_payload(fct: u8, mid: u8, fp: u8, fic_len: usize) -> Vec<u8> {
        let h0: u16 = 1u16 << 14 | u16::from(fct);
        let h1: u32 = (u32::from(mid) << 22) | (u32::from(fp) << 19) | 0xFFFF;
        let mut v = Vec::new();
        v.extend(h0.to_be_bytes());
        v.extend(h1.to_be_bytes());
        v.extend(vec![0u8; fic_len]);
        v
    }

    #[test]
    fn round_trips_a_frame_with_one_subchannel() {
        let mut c = EtiCollector::new();
        c.handle_ptr(&ptr_payload()).unwrap();
        c.handle_deti(&deti_payload(3, 1, 2, 96)).unwrap();
        let mut est = Vec::new();
        est.push((5u8 << 2) | (100u16 >> 8) as u8);
        est.push((100u16 & 0xFF) as u8);
        est.push(10u8 << 2);
        est.extend(vec![0xAAu8; 16]);
        c.handle_est(1, &est).unwrap();
        let frame = c.assemble().unwrap();

        let parsed = EtiParsedFrame::parse(&frame).unwrap();
        assert_eq!(parsed.fct, 3);
        assert_eq!(parsed.mid, 1);
        assert_eq!(parsed.fp, 2);
        assert_eq!(parsed.fic.len(), 96);
        assert_eq!(parsed.stc.len(), 1);
        assert_eq!(parsed.stc[0].scid, 5);
        assert_eq!(parsed.stc[0].sad, 100);
        assert_eq!(parsed.stc[0].tpl, 10);
        assert_eq!(parsed.stc[0].mst, vec![0xAAu8; 16]);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(EtiParsedFrame::parse(&[0u8; 10]).is_err());
    }

    #[test]
    fn rejects_bad_fsync() {
        let mut frame = vec![0x55u8; ETI_FRAME_LEN];
        frame[0] = 0;
        frame[1] = 0;
        frame[2] = 0;
        frame[3] = 0;
        assert!(EtiParsedFrame::parse(&frame).is_err());
    }
}
