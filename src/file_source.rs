//! Read stream from raw file.
use std::io::BufReader;
use std::io::Read;

use log::{debug, trace, warn};

use crate::block::{Block, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::{Result, Sample};

/// Read stream from raw file.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct FileSource<T: Copy + Default> {
    filename: String,
    f: BufReader<std::fs::File>,
    repeat: bool,
    buf: Vec<u8>,
    #[dabmod(out)]
    dst: WriteStream<T>,
}

impl<T: Default + Copy> FileSource<T> {
    /// Create new FileSource block, returning it along with the stream it
    /// feeds.
    pub fn new(filename: &str, repeat: bool) -> Result<(Self, ReadStream<T>)> {
        let f = BufReader::new(std::fs::File::open(filename)?);
        debug!("Opening source {filename}");
        let (dst, rx) = WriteStream::new();
        Ok((
            Self {
                filename: filename.to_string(),
                f,
                repeat,
                buf: Vec::new(),
                dst,
            },
            rx,
        ))
    }
}

impl<T> Block for FileSource<T>
where
    T: Sample<Type = T> + Copy + Default + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let mut o = self.dst.write_buf()?;
        let sample_size = T::size();
        let have = self.buf.len() / sample_size;
        let want = o.len();
        if want == 0 {
            trace!("FileSource: no space left in output stream");
            return Ok(BlockRet::Pending);
        }

        if have < want {
            let get = want - have;
            let get_bytes = get * sample_size;
            let mut buffer = vec![0; get_bytes];
            let n = self.f.read(&mut buffer[..])?;
            if n == 0 {
                if self.repeat {
                    debug!("Restarting {} (repeat)", self.filename);
                    self.f = BufReader::new(std::fs::File::open(&self.filename)?);
                    return Ok(BlockRet::Again);
                }
                warn!("EOF on {}", self.filename);
                return Ok(BlockRet::EOF);
            }
            if self.buf.is_empty() && (n % sample_size) == 0 {
                // Fast path when reading only whole samples.
                let v = buffer
                    .chunks_exact(sample_size)
                    .map(|d| T::parse(d).unwrap())
                    .collect::<Vec<_>>();
                o.fill_from_slice(&v);
                trace!("FileSource: Produced {} in fast path", n / sample_size);
                o.produce(n / sample_size, &[]);
                return Ok(BlockRet::Again);
            }
            self.buf.extend(&buffer[..n]);
        }

        let have = self.buf.len() / sample_size;
        if have == 0 {
            return Ok(BlockRet::Pending);
        }

        let v = self
            .buf
            .chunks_exact(sample_size)
            .map(T::parse)
            .collect::<Result<Vec<_>>>()?;
        self.buf.drain(0..(have * sample_size));
        let n = v.len();
        o.fill_from_slice(&v);
        trace!("FileSource: Produced {n}");
        o.produce(n, &[]);
        Ok(BlockRet::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Complex, Float};

    #[test]
    fn source_f32() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let tmpfn = tmpd.path().join("delme.bin").display().to_string();

        std::fs::write(
            &tmpfn,
            vec![0, 0, 128, 63, 0, 0, 64, 64, 195, 245, 72, 64, 195, 245, 72, 192],
        )?;

        let (mut src, dst) = FileSource::<Float>::new(&tmpfn, false)?;
        src.work()?;

        let (res, _) = dst.read_buf()?;
        #[allow(clippy::approx_constant)]
        let correct = vec![1.0 as Float, 3.0, 3.14, -3.14];
        assert_eq!(res.slice(), correct);
        Ok(())
    }

    #[test]
    fn source_c32() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let tmpfn = tmpd.path().join("delme.bin").display().to_string();

        std::fs::write(
            &tmpfn,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 195, 245, 72, 64, 205, 204, 44, 192],
        )?;

        let (mut src, dst) = FileSource::<Complex>::new(&tmpfn, false)?;
        src.work()?;

        let (res, _) = dst.read_buf()?;
        #[allow(clippy::approx_constant)]
        let correct = vec![Complex::new(0.0, 0.0), Complex::new(3.14, -2.7)];
        assert_eq!(res.slice(), correct);
        Ok(())
    }
}
