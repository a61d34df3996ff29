//! Top-level PHY encoder (§4): ties together every stage built elsewhere in
//! `phy` into the bit-domain/symbol-domain pipeline the reference
//! modulator's `DabModulator::process` wires up as one flowgraph per
//! transmission mode.
//!
//! Rather than mirror that flowgraph's dozens of single-purpose blocks
//! (`PrbsGenerator`, `ConvEncoder`, `PuncturingEncoder`, ... one per
//! subchannel, plus the shared symbol-domain chain), this crate exposes two
//! coarse-grained pieces: [`SubchannelEncoder`] for the per-subchannel
//! bit-domain work, and [`PhyEncoder`], the `Block` that drives one ETI(NI)
//! frame end to end into baseband samples. Each call below into `phy::*`
//! is exactly the corresponding reference stage.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::block::{Block, BlockRet};
use crate::phy::block_partitioner::{BlockPartitioner, CifMux};
use crate::phy::cic::CicEqualizer;
use crate::phy::control::ControlState;
use crate::phy::conv;
use crate::phy::diff_mod;
use crate::phy::eti_frame::EtiParsedFrame;
use crate::phy::freq_interleaver::FrequencyInterleaver;
use crate::phy::gain::GainControl;
use crate::phy::interleaver::TimeInterleaver;
use crate::phy::mode::Mode;
use crate::phy::ofdm::{GuardIntervalInserter, OfdmGenerator};
use crate::phy::phase_reference;
use crate::phy::protection;
use crate::phy::puncture::PuncturingEngine;
use crate::phy::qpsk;
use crate::phy::scrambler::Scrambler;
use crate::stream::{NCReadStream, WriteStream};
use crate::{Complex, Error, Result};

/// Bit-domain pipeline for one subchannel: scramble, rate-1/4 convolutional
/// encode, puncture to its protection profile, then 16-deep time-interleave.
///
/// Mirrors the reference modulator's per-subchannel `PrbsGenerator` ->
/// `ConvEncoder` -> `PuncturingEncoder` -> `TimeInterleaver` chain, run once
/// per CIF rather than as a standing flowgraph block.
pub struct SubchannelEncoder {
    tpl: u8,
    framesize_cu: usize,
    scrambler: Scrambler,
    puncturing: PuncturingEngine,
    interleaver: Option<TimeInterleaver>,
}

impl SubchannelEncoder {
    /// Build an encoder for a subchannel with protection field `tpl` and
    /// `framesize_cu` capacity units (the STC table's `stl`, converted from
    /// bytes). The subchannel's bitrate is derived from `framesize_cu`
    /// (1 CU = 8 bytes = 8/3 kb/s of CIF-period throughput) and cross-checked
    /// against [`protection::framesize_cu`].
    pub fn new(tpl: u8, framesize_cu: usize) -> Result<Self> {
        let bits_per_cif = framesize_cu * 64;
        if bits_per_cif % 24 != 0 {
            return Err(Error::config(format!(
                "subchannel framesize_cu {framesize_cu} does not correspond to a whole kb/s bitrate"
            )));
        }
        let bitrate = bits_per_cif / 24;
        let puncturing = protection::puncturing_rules(tpl, bitrate)?;
        let expected_cu = protection::framesize_cu(tpl, bitrate)?;
        if expected_cu != framesize_cu {
            return Err(Error::config(format!(
                "subchannel framesize_cu {framesize_cu} does not match the {expected_cu} CU expected for tpl {tpl:#04x} at {bitrate} kb/s"
            )));
        }
        Ok(Self {
            tpl,
            framesize_cu,
            scrambler: Scrambler::dab(),
            puncturing,
            interleaver: None,
        })
    }

    /// `true` if this encoder was built for the given protection field and
    /// framesize, used to detect a subchannel reconfiguration between
    /// frames.
    #[must_use]
    pub fn matches(&self, tpl: u8, framesize_cu: usize) -> bool {
        self.tpl == tpl && self.framesize_cu == framesize_cu
    }

    /// Encode one CIF's worth of this subchannel's main stream data
    /// (`framesize_cu * 8` bytes) into its punctured, time-interleaved form.
    pub fn encode(&mut self, mst: &[u8]) -> Result<Vec<u8>> {
        if mst.len() != self.framesize_cu * 8 {
            return Err(Error::invariant(format!(
                "subchannel MST is {} bytes, expected {}",
                mst.len(),
                self.framesize_cu * 8
            )));
        }
        let mut data = mst.to_vec();
        self.scrambler.apply(&mut data);
        let convolved = conv::encode(&data);
        let punctured = self.puncturing.apply(&convolved);

        let mut interleaver = match self.interleaver.take() {
            Some(ti) => ti,
            None => TimeInterleaver::new(punctured.len())?,
        };
        let out = interleaver.process(&punctured)?;
        self.interleaver = Some(interleaver);
        Ok(out)
    }
}

/// Drives one ETI(NI) frame at a time through every PHY stage, emitting
/// baseband I/Q samples at 2048000 Sa/s.
///
/// A transmission frame only completes once `mode.params().cif_count` ETI
/// frames have been consumed (the [`BlockPartitioner`] phase-synchronises
/// and accumulates them), so a `work()` call consuming an ETI frame may
/// produce no output; conversely, one completed transmission frame's
/// samples may be drained across several `work()` calls as the output
/// stream's free space allows.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct PhyEncoder {
    mode: Mode,
    control: Arc<ControlState>,

    fic_scrambler: Scrambler,
    fic_puncturing: PuncturingEngine,
    subchannels: HashMap<u8, SubchannelEncoder>,

    cif_mux: CifMux,
    partitioner: BlockPartitioner,

    qpsk_carriers: usize,
    phase_reference: Vec<Complex>,
    freq_interleaver: FrequencyInterleaver,
    cic: Option<CicEqualizer>,
    ofdm: OfdmGenerator,
    guard: GuardIntervalInserter,
    gain: GainControl,

    pending: Vec<Complex>,
    pending_pos: usize,

    #[dabmod(in)]
    src: NCReadStream<Vec<u8>>,
    #[dabmod(out)]
    dst: WriteStream<Complex>,
}

impl PhyEncoder {
    /// Build a PHY encoder for `mode`, synchronising transmission frames to
    /// `fct_phase` (typically the first frame's FCT modulo `cif_count`).
    /// `clock_rate`, if set, enables the CIC pre-equaliser for a downstream
    /// resampler running at that rate (Hz); `papr_window` sets the number
    /// of transmission frames [`GainControl`]'s PAPR accumulator averages
    /// over.
    pub fn new(
        src: NCReadStream<Vec<u8>>,
        mode: Mode,
        fct_phase: usize,
        control: Arc<ControlState>,
        clock_rate: Option<u32>,
        output_rate: u32,
        papr_window: usize,
    ) -> (Self, crate::stream::ReadStream<Complex>) {
        let params = mode.params();
        let (dst, dr) = crate::stream::new_stream();

        let cic = clock_rate.map(|clock_rate| {
            let spacing_hz = params.spacing as f32 * output_rate as f32 / 2_048_000.0;
            let r = clock_rate / output_rate;
            CicEqualizer::new(params.nb_carriers, spacing_hz as usize, r as i32)
        });

        (
            Self {
                mode,
                control,
                fic_scrambler: Scrambler::dab(),
                fic_puncturing: protection::fic_rules(),
                subchannels: HashMap::new(),
                cif_mux: CifMux::new(),
                partitioner: BlockPartitioner::new(mode, fct_phase),
                qpsk_carriers: params.nb_carriers,
                phase_reference: phase_reference::generate(mode),
                freq_interleaver: FrequencyInterleaver::new(mode),
                cic,
                ofdm: OfdmGenerator::new(params.nb_carriers, params.spacing),
                guard: GuardIntervalInserter::new(
                    params.nb_symbols,
                    params.spacing,
                    params.null_symbol_samples,
                    params.sym_samples,
                ),
                gain: GainControl::new(papr_window.max(1)),
                pending: Vec::new(),
                pending_pos: 0,
                src,
                dst,
            },
            dr,
        )
    }

    /// Transmission mode this encoder was built for.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Diagnostic PAPR, in dB, over the current accumulation window.
    #[must_use]
    pub fn papr_db(&self) -> f64 {
        self.gain.papr_db()
    }

    fn encode_frame(&mut self, frame: &[u8]) -> Result<()> {
        let parsed = EtiParsedFrame::parse(frame)?;

        let mut fic = parsed.fic.clone();
        self.fic_scrambler.apply(&mut fic);
        let fic_convolved = conv::encode(&fic);
        let fic_punctured = self.fic_puncturing.apply(&fic_convolved);

        let mut sub_outputs: Vec<(u16, Vec<u8>)> = Vec::with_capacity(parsed.stc.len());
        for stc in &parsed.stc {
            if stc.mst.len() % 8 != 0 {
                return Err(Error::protocol(format!(
                    "subchannel {} MST length {} is not a multiple of 8",
                    stc.scid,
                    stc.mst.len()
                )));
            }
            let framesize_cu = stc.mst.len() / 8;
            let needs_rebuild = self
                .subchannels
                .get(&stc.scid)
                .is_none_or(|enc| !enc.matches(stc.tpl, framesize_cu));
            if needs_rebuild {
                debug!(
                    "building subchannel encoder: scid={} tpl={:#04x} framesize_cu={framesize_cu}",
                    stc.scid, stc.tpl
                );
                self.subchannels
                    .insert(stc.scid, SubchannelEncoder::new(stc.tpl, framesize_cu)?);
            }
            let encoder = self.subchannels.get_mut(&stc.scid).expect("just inserted above");
            let punctured = encoder.encode(&stc.mst)?;
            sub_outputs.push((stc.sad, punctured));
        }

        let sub_refs: Vec<(u16, &[u8])> = sub_outputs.iter().map(|(sad, d)| (*sad, d.as_slice())).collect();
        let cif = self.cif_mux.build(&sub_refs)?;

        let Some(tx_frame) = self.partitioner.process(&fic_punctured, &cif)? else {
            return Ok(());
        };

        let qpsk_symbols = qpsk::map(self.qpsk_carriers, &tx_frame)?;
        let interleaved = self.freq_interleaver.process(&qpsk_symbols)?;
        let diff = diff_mod::modulate(self.qpsk_carriers, &self.phase_reference, &interleaved)?;

        let mut freq_domain = vec![Complex::default(); self.qpsk_carriers];
        freq_domain.extend(diff);

        if let Some(cic) = &self.cic {
            freq_domain = cic.apply(&freq_domain);
        }

        let mut time_domain = self.ofdm.process(&freq_domain)?;
        let gain_mode = self.control.gain_mode();
        self.gain.apply(gain_mode, &mut time_domain);

        let mut tx = self.guard.process(&time_domain)?;
        if self.control.mute() {
            tx.fill(Complex::default());
        }

        self.pending = tx;
        self.pending_pos = 0;
        Ok(())
    }
}

impl Block for PhyEncoder {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        if self.pending_pos < self.pending.len() {
            let mut os = self.dst.write_buf()?;
            if os.is_empty() {
                return Ok(BlockRet::WaitForStream(&self.dst, 1));
            }
            let n = std::cmp::min(os.len(), self.pending.len() - self.pending_pos);
            os.fill_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
            os.produce(n, &[]);
            self.pending_pos += n;
            if self.pending_pos == self.pending.len() {
                self.pending.clear();
                self.pending_pos = 0;
            }
            return Ok(BlockRet::Again);
        }

        let Some((frame, _tags)) = self.src.pop() else {
            if self.src.eof() {
                return Ok(BlockRet::EOF);
            }
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        };

        self.encode_frame(&frame)?;
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::protection::Tpl;

    #[test]
    fn subchannel_encoder_derives_bitrate_from_framesize_cu() {
        // UEP short form, 32 kb/s level 1 -> framesize_cu 35 (phy::protection tests).
        let enc = SubchannelEncoder::new(0, 35).unwrap();
        assert!(enc.matches(0, 35));
    }

    #[test]
    fn subchannel_encoder_rejects_mismatched_framesize() {
        // tpl 0 (UEP level 1) at a framesize_cu that doesn't correspond to
        // any defined bitrate/level combination.
        assert!(SubchannelEncoder::new(0, 1).is_err());
    }

    #[test]
    fn subchannel_encode_output_length_matches_puncturing_engine() {
        let mut enc = SubchannelEncoder::new(0, 35).unwrap();
        let mst = vec![0xAAu8; 35 * 8];
        let out = enc.encode(&mst).unwrap();
        assert_eq!(out.len(), enc.puncturing.output_bits(1).div_ceil(8));
    }

    #[test]
    fn subchannel_encode_rejects_wrong_mst_length() {
        let mut enc = SubchannelEncoder::new(0, 35).unwrap();
        assert!(enc.encode(&vec![0u8; 10]).is_err());
    }

    #[test]
    fn long_form_tpl_decodes_for_subchannel_encoder() {
        // EEP option 0, level 1, at 64 kb/s -> framesize_cu 96 (phy::protection tests).
        let tpl_byte = 0b0010_0000;
        assert!(Tpl::decode(tpl_byte).long_form);
        let enc = SubchannelEncoder::new(tpl_byte, 96).unwrap();
        assert!(enc.matches(tpl_byte, 96));
    }
}
