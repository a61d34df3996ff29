//! Tee a stream into two identical copies.

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/// Duplicate a stream into two outputs.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct Tee<T: Copy + Default> {
    #[dabmod(in)]
    src: ReadStream<T>,
    #[dabmod(out)]
    dst1: WriteStream<T>,
    #[dabmod(out)]
    dst2: WriteStream<T>,
}

impl<T: Copy + Default> Tee<T> {
    /// Create a new `Tee` block.
    pub fn new(src: ReadStream<T>) -> (Self, ReadStream<T>, ReadStream<T>) {
        let (dst1, r1) = crate::stream::new_stream();
        let (dst2, r2) = crate::stream::new_stream();
        (Self { src, dst1, dst2 }, r1, r2)
    }
}

impl<T: Copy + Default> Block for Tee<T> {
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (i, tags) = self.src.read_buf()?;
        if i.is_empty() {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut o1 = self.dst1.write_buf()?;
        let mut o2 = self.dst2.write_buf()?;
        let n = i.len().min(o1.len()).min(o2.len());
        if n == 0 {
            return Ok(BlockRet::WaitForStream(&self.dst1, 1));
        }
        let slice = i.slice();
        o1.fill_from_slice(&slice[..n]);
        o2.fill_from_slice(&slice[..n]);
        o1.produce(n, &tags);
        o2.produce(n, &tags);
        i.consume(n);
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{NullSink, VectorSource};

    #[test]
    fn splits_stream() -> Result<()> {
        let (mut src, rx) = VectorSource::new(vec![1u8, 2, 3]);
        src.work()?;
        let (mut tee, r1, r2) = Tee::new(rx);
        tee.work()?;
        let (b1, _) = r1.read_buf()?;
        let (b2, _) = r2.read_buf()?;
        assert_eq!(b1.slice(), vec![1, 2, 3]);
        assert_eq!(b2.slice(), vec![1, 2, 3]);
        drop(b1);
        drop(b2);
        let mut sink1 = NullSink::new(r1);
        let mut sink2 = NullSink::new(r2);
        sink1.work()?;
        sink2.work()?;
        Ok(())
    }
}
