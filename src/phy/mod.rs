/*! DAB physical-layer encoder.

Turns one ETI(NI) frame into one transmission frame's worth of baseband I/Q
samples, in two layers:

- A bit-domain layer ([`protection`], [`scrambler`], [`conv`], [`puncture`],
  [`interleaver`], [`block_partitioner`]) that scrambles, convolutionally
  encodes, punctures and time-interleaves the FIC and each subchannel, then
  multiplexes the result into Common Interleaved Frames (CIFs).
- A symbol-domain and OFDM layer ([`qpsk`], [`freq_interleaver`],
  [`phase_reference`], [`diff_mod`], [`cic`], [`ofdm`], [`gain`]) that maps
  CIF bytes onto QPSK carriers, differentially modulates them against a
  phase reference, and synthesises the OFDM signal.

[`encoder`] composes both layers into two blocks, [`encoder::SubchannelEncoder`]
(a plain per-subchannel bit-domain pipeline, not itself a flowgraph block)
and [`encoder::PhyEncoder`] (the top-level `Block` driving the whole chain).
[`mode`] holds the transmission-mode parameter table both layers read from.
[`eti_frame`] decodes the 6144-byte ETI(NI) wire format `PhyEncoder` consumes.
[`control`] holds the atomic scalars an external control surface mutates.
*/

pub mod block_partitioner;
pub mod cic;
pub mod control;
pub mod conv;
pub mod diff_mod;
pub mod encoder;
pub mod eti_frame;
pub mod freq_interleaver;
pub mod gain;
pub mod interleaver;
pub mod mode;
pub mod ofdm;
pub mod phase_reference;
pub mod protection;
pub mod puncture;
pub mod qpsk;
pub mod scrambler;
