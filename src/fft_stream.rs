//! Fixed-size streaming FFT.

use rustfft::FftPlanner;

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::{Complex, Float};

/// Forward FFT over consecutive, non-overlapping blocks of `size` complex
/// samples.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct FftStream {
    size: usize,
    fft: std::sync::Arc<dyn rustfft::Fft<Float>>,
    #[dabmod(in)]
    src: ReadStream<Complex>,
    #[dabmod(out)]
    dst: WriteStream<Complex>,
}

impl FftStream {
    /// Create a new `FftStream` operating on blocks of `size` samples.
    pub fn new(src: ReadStream<Complex>, size: usize) -> (Self, ReadStream<Complex>) {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let (dst, dr) = crate::stream::new_stream();
        (
            Self {
                size,
                fft,
                src,
                dst,
            },
            dr,
        )
    }
}

impl Block for FftStream {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (input, _tags) = self.src.read_buf()?;
        if input.len() < self.size {
            return Ok(BlockRet::WaitForStream(&self.src, self.size));
        }
        let mut o = self.dst.write_buf()?;
        if o.len() < self.size {
            return Ok(BlockRet::WaitForStream(&self.dst, self.size));
        }
        let ii = input.slice();
        let oo = o.slice();
        oo[..self.size].copy_from_slice(&ii[..self.size]);
        self.fft.process(&mut oo[..self.size]);
        input.consume(self.size);
        o.produce(self.size, &[]);
        Ok(BlockRet::Again)
    }
}
