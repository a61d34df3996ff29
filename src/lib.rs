#![warn(missing_docs)]
/*! A DAB (Digital Audio Broadcasting) modulator pipeline.

This crate turns an ETI (Ensemble Transport Interface) frame stream — either
raw ETI(NI) or wrapped in EDI (Encapsulation of DAB Interfaces), with
optional forward-error-corrected fragmentation — into the baseband
complex-valued signal that drives a software-defined radio front-end.

It is built on a small GNURadio-style flowgraph framework: blocks are
connected by unidirectional streams, and a [`graph::Graph`] calls
[`block::Block::work`] on each block in turn until the graph is drained.
Two kinds of stream exist: [`stream::ReadStream`]/[`stream::WriteStream`]
carry `Copy` element types (bytes, soft bits, complex samples) through a
ring buffer; [`stream::NCReadStream`]/[`stream::NCWriteStream`] carry
non-`Copy`, frame-shaped values (assembled AF packets, ETI frames) through a
bounded queue instead.

# Architecture overview

```text
   [ EDI bytes (AF/PFT) ]
            ↓
     [ edi::EdiReceiver ]      -- PFT defragmentation, RS(255,207), AF CRC
            ↓  (NC: assembled AF packets)
     [ edi::EtiAssembler ]     -- TAG dispatch, ETI frame assembly
            ↓  (NC: 6144-byte ETI(NI) frames)
   [ phy encoder flowgraph ]   -- scramble, convolve, puncture, interleave,
            ↓                    QPSK map, freq-interleave, diff-modulate,
            ↓                    OFDM, guard interval, resample, gain
   [ baseband I/Q samples ]
```

See the [`edi`] module for the receive path and the [`phy`] module for the
physical-layer encoder. The two are connected by one [`stream::NCReadStream`]
of 6144-byte ETI(NI) frames.

Out of scope for this crate (left to the caller): the ZMQ remote-control
surface, configuration-file parsing, UDP socket wrappers, and RF front-end
output (UHD/SoapySDR). Gain, mode, and mute parameters are exposed as atomic
scalars in [`phy::control`] so a caller can wire up such a control surface
without this crate needing to know about it.
*/
use std::sync::atomic::AtomicUsize;

pub mod block;
pub mod blocks;
pub mod circular_buffer;
pub mod constant_source;
pub mod convert;
pub mod crc16;
pub mod debug_sink;
pub mod edi;
pub mod error;
pub mod fft_stream;
pub mod file_sink;
pub mod file_source;
pub mod graph;
pub mod null_sink;
pub mod phy;
pub mod rational_resampler;
pub mod rs;
pub mod stream;
pub mod tee;
pub mod vector_sink;
pub mod vector_source;
pub mod writer_sink;

pub use error::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Float type used for DSP samples. Always `f32`: the reference DAB
/// modulator this crate's algorithms are drawn from runs the whole PHY
/// chain in single precision, and matching it keeps noise-floor and
/// resource-usage expectations the same.
pub type Float = f32;

/// Complex (I/Q) baseband sample.
pub type Complex = num_complex::Complex<Float>;

/// Monotonically increasing ID shared between the two ends of a stream, for
/// logging and for `StreamWait` bookkeeping.
pub(crate) static NEXT_STREAM_ID: AtomicUsize = AtomicUsize::new(0);

/// A trait all types flowing through a [`stream::ReadStream`]`/`[`stream::WriteStream`]
/// can implement to support raw byte (de)serialization, e.g. for
/// [`file_source::FileSource`]/[`file_sink::FileSink`].
pub trait Sample {
    /// The type of the sample.
    type Type;

    /// The serialized size of one sample, in bytes.
    fn size() -> usize;

    /// Parse one sample from exactly [`Self::size`] bytes.
    fn parse(data: &[u8]) -> Result<Self::Type>;

    /// Serialize one sample to bytes.
    fn serialize(&self) -> Vec<u8>;
}

impl Sample for Complex {
    type Type = Complex;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::invariant("Complex::parse: wrong slice size"));
        }
        let i = Float::from_le_bytes(data[0..Self::size() / 2].try_into()?);
        let q = Float::from_le_bytes(data[Self::size() / 2..].try_into()?);
        Ok(Complex::new(i, q))
    }
    fn serialize(&self) -> Vec<u8> {
        let mut ret = Vec::new();
        ret.extend(Float::to_le_bytes(self.re));
        ret.extend(Float::to_le_bytes(self.im));
        ret
    }
}

impl Sample for Float {
    type Type = Float;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::invariant("Float::parse: wrong slice size"));
        }
        Ok(Float::from_le_bytes(data[0..Self::size()].try_into()?))
    }
    fn serialize(&self) -> Vec<u8> {
        Float::to_le_bytes(*self).to_vec()
    }
}

impl Sample for u8 {
    type Type = u8;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::invariant("u8::parse: wrong slice size"));
        }
        Ok(data[0])
    }
    fn serialize(&self) -> Vec<u8> {
        vec![*self]
    }
}

/// Trivial trait for types that have `.len()`, used by [`stream::NCReadStream::peek_size`].
#[allow(clippy::len_without_is_empty)]
pub trait Len {
    /// Get the length.
    fn len(&self) -> usize;
}

impl<T> Len for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    //! Test helper functions.
    use super::*;

    /// For testing, assert that two slices of complex samples are almost
    /// equal, since floating point numbers are almost never exactly equal.
    pub fn assert_almost_equal_complex(left: &[Complex], right: &[Complex]) {
        assert_eq!(left.len(), right.len(), "\nleft: {left:?}\nright: {right:?}");
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).norm_sqr().sqrt();
            if dist > 0.001 {
                assert_eq!(left[i], right[i], "\nElement {i}:\nleft: {left:?}\nright: {right:?}");
            }
        }
    }

    /// For testing, assert that two slices of floats are almost equal.
    pub fn assert_almost_equal_float(left: &[Float], right: &[Float]) {
        assert_eq!(left.len(), right.len(), "\nleft: {left:?}\nright: {right:?}");
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).abs();
            if dist > 0.001 {
                assert_eq!(left[i], right[i], "\nleft: {left:?}\nright: {right:?}");
            }
        }
    }
}
