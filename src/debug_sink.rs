//! Print values to stdout, for debugging.

use crate::Result;
use crate::block::{Block, BlockRet};
use crate::stream::ReadStream;

/// Print values to stdout, for debugging.
#[derive(dabmod_macros::Block)]
#[dabmod(crate, new)]
pub struct DebugSink<T>
where
    T: Copy + std::fmt::Debug,
{
    #[dabmod(in)]
    src: ReadStream<T>,
}

impl<T> Block for DebugSink<T>
where
    T: Copy + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (i, _tags) = self.src.read_buf()?;
        let n = i.len();
        if n == 0 {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        for s in i.iter() {
            println!("debug: {s:?}");
        }
        i.consume(n);
        Ok(BlockRet::Again)
    }
}
