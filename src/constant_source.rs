//! Generate the same value, forever.
use crate::Result;
use crate::block::{Block, BlockRet};
use crate::stream::WriteStream;

/// Generate the same value, forever.
#[derive(dabmod_macros::Block)]
#[dabmod(crate, new)]
pub struct ConstantSource<T: Copy + Default> {
    #[dabmod(out)]
    dst: WriteStream<T>,
    val: T,
}

impl<T> Block for ConstantSource<T>
where
    T: Copy + Default,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let mut o = self.dst.write_buf()?;
        let n = o.len();
        if n == 0 {
            return Ok(BlockRet::WaitForStream(&self.dst, 1));
        }
        o.slice().fill(self.val);
        o.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}
