/*! EDI (Encapsulation of DAB Interfaces) receive path.

Turns a raw EDI byte stream — PFT fragments and/or bare AF packets — into
6144-byte ETI(NI) frames, in two stages:

- [`EdiReceiver`] defragments PFT fragments (with Reed-Solomon erasure
  recovery when the stream uses FEC) into assembled AF packets, strictly in
  `pseq` order.
- [`EtiAssembler`] validates each AF packet, dispatches its TAG items, and
  assembles the accumulated state into one ETI(NI) frame.

The two stages communicate over one [`crate::stream::NCReadStream`] of
`Vec<u8>` AF packets, so the defragmenter can run ahead of the assembler
without either blocking on the other except through that bounded queue.
*/

pub mod af_builder;
pub mod af_decoder;
pub mod eti_collector;
pub mod fragment;
pub mod pft_manager;
pub mod tag;

use log::warn;

use crate::block::{Block, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream, ReadStream};
use crate::Result;

use af_decoder::AfDecoder;
use eti_collector::EtiCollector;
use pft_manager::PftManager;
use tag::TagDispatcher;

/// Parses PFT fragments (or bare AF packets) from a raw EDI byte stream and
/// emits reassembled AF packets in `pseq` order.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct EdiReceiver {
    #[dabmod(in)]
    src: ReadStream<u8>,
    #[dabmod(out)]
    dst: NCWriteStream<Vec<u8>>,
    pft: PftManager,
}

impl EdiReceiver {
    /// Create a new `EdiReceiver` with the default PFT `max_delay` (10 AF
    /// packets).
    #[must_use]
    pub fn new(src: ReadStream<u8>) -> (Self, NCReadStream<Vec<u8>>) {
        Self::with_max_delay(src, 10)
    }

    /// Create a new `EdiReceiver` with a custom PFT `max_delay`, in AF
    /// packets.
    #[must_use]
    pub fn with_max_delay(src: ReadStream<u8>, max_delay: u32) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, rx) = crate::stream::new_nocopy_stream();
        (
            Self {
                src,
                dst,
                pft: PftManager::new(max_delay),
            },
            rx,
        )
    }

    fn drain_ready_packets(&mut self) -> Result<bool> {
        let mut produced = false;
        while let Some(bytes) = self.pft.get_next_af()? {
            self.dst.push(bytes, vec![]);
            produced = true;
        }
        Ok(produced)
    }
}

impl Block for EdiReceiver {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (i, _tags) = self.src.read_buf()?;
        if i.is_empty() {
            if self.src.eof() {
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let window = i.slice();
        match fragment::parse(&window) {
            Ok((0, _)) => {
                // Not enough bytes buffered for a full fragment yet.
                Ok(BlockRet::WaitForStream(&self.src, window.len() + 1))
            }
            Ok((consumed, Some(frag))) => {
                i.consume(consumed);
                self.pft.push(frag)?;
                self.drain_ready_packets()?;
                Ok(BlockRet::Again)
            }
            Ok((consumed, None)) => {
                i.consume(consumed.max(1));
                Ok(BlockRet::Again)
            }
            Err(e) => {
                warn!("EDI stream resync after malformed fragment: {e}");
                i.consume(1);
                Ok(BlockRet::Again)
            }
        }
    }
}

/// Validates AF packets, dispatches their TAGs, and assembles complete
/// ETI(NI) frames.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct EtiAssembler {
    #[dabmod(in)]
    src: NCReadStream<Vec<u8>>,
    #[dabmod(out)]
    dst: NCWriteStream<Vec<u8>>,
    decoder: AfDecoder,
    dispatcher: TagDispatcher,
    collector: EtiCollector,
}

impl EtiAssembler {
    /// Create a new `EtiAssembler`.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, rx) = crate::stream::new_nocopy_stream();
        (
            Self {
                src,
                dst,
                decoder: AfDecoder::new(),
                dispatcher: TagDispatcher::new(),
                collector: EtiCollector::new(),
            },
            rx,
        )
    }
}

impl Block for EtiAssembler {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let Some((af_packet, _tags)) = self.src.pop() else {
            if self.src.eof() {
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        };

        let tag_packet = match self.decoder.decode(&af_packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping AF packet: {e}");
                return Ok(BlockRet::Again);
            }
        };

        if let Err(e) = self.dispatcher.dispatch(&mut self.collector, &tag_packet) {
            warn!("dropping AF packet, TAG dispatch failed: {e}");
            self.collector = EtiCollector::new();
            return Ok(BlockRet::Again);
        }

        match self.collector.assemble() {
            Ok(eti_frame) => {
                self.dst.push(eti_frame, vec![]);
            }
            Err(e) => {
                warn!("dropping ETI frame: {e}");
            }
        }
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ReadStream;

    fn ptr_tag() -> Vec<u8> {
        let mut payload = b"DETI".to_vec();
        payload.extend([0, 0, 0, 0]);
        let mut v = b"*ptr".to_vec();
        v.extend(((payload.len() as u32) * 8).to_be_bytes());
        v.extend(payload);
        v
    }

    fn deti_tag() -> Vec<u8> {
        let h0: u16 = 1u16 << 14; // ficf=1, atstf=0, fct=0
        let h1: u32 = (1u32 << 22) | 0xFFFF; // mid=1, fp=0, mnsc=0xFFFF
        let mut payload = Vec::new();
        payload.extend(h0.to_be_bytes());
        payload.extend(h1.to_be_bytes());
        payload.extend(vec![0u8; 96]);
        let mut v = b"deti".to_vec();
        v.extend(((payload.len() as u32) * 8).to_be_bytes());
        v.extend(payload);
        v
    }

    fn af_packet(seq: u16, tag_packet: &[u8]) -> Vec<u8> {
        let mut pkt = vec![b'A', b'F'];
        pkt.extend((tag_packet.len() as u32).to_be_bytes());
        pkt.extend(seq.to_be_bytes());
        pkt.push(0x80);
        pkt.push(b'T');
        pkt.extend_from_slice(tag_packet);
        let crc = crate::crc16::crc16(&pkt);
        pkt.extend(crc.to_be_bytes());
        pkt
    }

    fn no_fec_pft_fragments(pseq: u16, payload: &[u8], chunk: usize) -> Vec<u8> {
        let chunks: Vec<&[u8]> = payload.chunks(chunk).collect();
        let fcount = chunks.len() as u32;
        let mut out = Vec::new();
        for (i, c) in chunks.iter().enumerate() {
            let mut h = vec![b'P', b'F'];
            h.extend(pseq.to_be_bytes());
            h.extend(&(i as u32).to_be_bytes()[1..]);
            h.extend(&fcount.to_be_bytes()[1..]);
            let plen = c.len() as u16;
            h.push((plen >> 8) as u8 & 0x3F);
            h.push((plen & 0xFF) as u8);
            let crc = crate::crc16::crc16(&h);
            h.extend(crc.to_be_bytes());
            h.extend_from_slice(c);
            out.extend(h);
        }
        out
    }

    #[test]
    fn end_to_end_fragment_stream_to_eti_frame() {
        let mut tag_packet = ptr_tag();
        tag_packet.extend(deti_tag());
        let af = af_packet(0, &tag_packet);
        let wire = no_fec_pft_fragments(0, &af, 32);

        let r = ReadStream::from_slice(&wire);

        let (mut receiver, af_stream) = EdiReceiver::new(r);
        let (mut assembler, eti_stream) = EtiAssembler::new(af_stream);

        loop {
            match receiver.work().unwrap() {
                BlockRet::EOF => break,
                _ => continue,
            }
        }
        // Drop the receiver (and its NCWriteStream) so the assembler's
        // `eof()` can observe that no more AF packets are coming.
        drop(receiver);
        loop {
            match assembler.work().unwrap() {
                BlockRet::EOF => break,
                _ => continue,
            }
        }

        let (frame, _tags) = eti_stream.pop().expect("one ETI frame expected");
        assert_eq!(frame.len(), 6144);
        assert_eq!(&frame[0..4], &[0x00, 0x07, 0x3A, 0xB6]);
    }
}
