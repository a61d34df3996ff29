//! Change sample rate by a rational factor.
//!
//! Unlike GNU Radio's rational resampler, this one doesn't low-pass filter
//! before decimating. That's acceptable here because the only consumer is
//! the PHY output stage resampling from the fixed 2.048 MS/s OFDM rate to
//! whatever the output sink wants; it is the caller's job to pick an output
//! rate that doesn't need serious anti-alias filtering, or to filter
//! upstream.

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::stream::{ReadStream, WriteStream};

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Resample a `Copy` stream by `interp/deci`.
#[derive(dabmod_macros::Block)]
#[dabmod(crate, custom_name)]
pub struct RationalResampler<T: Copy + Default> {
    name: String,
    interp: i64,
    deci: i64,
    counter: i64,
    #[dabmod(in)]
    src: ReadStream<T>,
    #[dabmod(out)]
    dst: WriteStream<T>,
}

impl<T: Copy + Default> RationalResampler<T> {
    /// Create a new resampler. `interp`/`deci` are reduced by their GCD.
    pub fn new(src: ReadStream<T>, interp: usize, deci: usize) -> Result<(Self, ReadStream<T>)> {
        let g = gcd(interp, deci).max(1);
        let (dst, dr) = crate::stream::new_stream();
        Ok((
            Self {
                name: "RationalResampler".into(),
                interp: i64::try_from(interp / g)
                    .map_err(|e| crate::Error::config(e.to_string()))?,
                deci: i64::try_from(deci / g).map_err(|e| crate::Error::config(e.to_string()))?,
                counter: 0,
                src,
                dst,
            },
            dr,
        ))
    }

    fn custom_name(&self) -> &str {
        &self.name
    }
}

impl<T: Copy + Default> Block for RationalResampler<T> {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (i, _tags) = self.src.read_buf()?;
        if i.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        let input = i.slice();
        let mut v = Vec::new();
        let mut consumed = 0;
        for s in &input {
            consumed += 1;
            self.counter += self.interp;
            while self.counter >= self.deci {
                v.push(*s);
                self.counter -= self.deci;
                if v.len() >= o.len() {
                    break;
                }
            }
            if v.len() >= o.len() {
                break;
            }
        }
        if v.is_empty() {
            i.consume(consumed);
            return Ok(BlockRet::Again);
        }
        let n = v.len();
        o.fill_from_slice(&v);
        o.produce(n, &[]);
        i.consume(consumed);
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{VectorSink, VectorSource};

    fn runtest(inputsize: usize, interp: usize, deci: usize, finalcount: usize) -> Result<()> {
        let input: Vec<f32> = (0..inputsize).map(|i| i as f32).collect();
        let (mut src, rx) = VectorSource::new(input);
        let (mut resamp, rx2) = RationalResampler::new(rx, interp, deci)?;
        let mut sink = VectorSink::new(rx2, inputsize * interp / deci + 16);
        loop {
            let a = src.work()?;
            let b = resamp.work()?;
            sink.work()?;
            if matches!(a, BlockRet::EOF) && matches!(b, BlockRet::WaitForStream(_, _)) {
                break;
            }
        }
        assert_eq!(finalcount, sink.data().len(), "{:?}", sink.data());
        Ok(())
    }

    #[test]
    fn various_ratios() -> Result<()> {
        runtest(10, 1, 1, 10)?;
        runtest(10, 1, 2, 5)?;
        runtest(10, 2, 1, 20)?;
        runtest(100, 2, 3, 66)?;
        runtest(100, 3, 2, 150)?;
        Ok(())
    }
}
