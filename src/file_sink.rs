//! Write a stream to a raw file.
use std::io::BufWriter;
use std::io::Write;

use log::debug;

use crate::block::{Block, BlockRet};
use crate::stream::{NCReadStream, ReadStream};
use crate::{Result, Sample};

/// File write mode.
pub enum Mode {
    /// Create a new file. Fail if it already exists.
    Create,
    /// Overwrite an existing file, or create one if missing.
    Overwrite,
    /// Append to an existing file, or create one if missing.
    Append,
}

fn open(filename: &std::path::Path, mode: Mode) -> Result<std::fs::File> {
    debug!("Opening sink {}", filename.display());
    Ok(match mode {
        Mode::Create => std::fs::File::options()
            .read(false)
            .write(true)
            .create_new(true)
            .open(filename)?,
        Mode::Overwrite => std::fs::File::create(filename)?,
        Mode::Append => std::fs::File::options()
            .read(false)
            .append(true)
            .open(filename)?,
    })
}

/// Send a `Copy` stream to a raw file.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct FileSink<T: Copy + Sample<Type = T>> {
    f: BufWriter<std::fs::File>,
    #[dabmod(in)]
    src: ReadStream<T>,
}

impl<T: Copy + Sample<Type = T>> FileSink<T> {
    /// Create a new `FileSink`.
    pub fn new(src: ReadStream<T>, filename: std::path::PathBuf, mode: Mode) -> Result<Self> {
        Ok(Self {
            f: BufWriter::new(open(&filename, mode)?),
            src,
        })
    }

    /// Flush the write buffer.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.f.flush()?)
    }
}

impl<T> Block for FileSink<T>
where
    T: Copy + Sample<Type = T> + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        let (i, _tags) = self.src.read_buf()?;
        let n = i.len();
        if n == 0 {
            return Ok(BlockRet::WaitForStream(&self.src, 1));
        }
        let mut v = Vec::with_capacity(T::size() * n);
        for s in i.iter() {
            v.extend(s.serialize());
        }
        self.f.write_all(&v)?;
        i.consume(n);
        Ok(BlockRet::Again)
    }
}

/// Send a non-`Copy` (frame-shaped) stream to a raw file, one value per
/// line, newline-terminated.
#[derive(dabmod_macros::Block)]
#[dabmod(crate)]
pub struct NCFileSink<T> {
    f: BufWriter<std::fs::File>,
    #[dabmod(in)]
    src: NCReadStream<T>,
}

impl<T> NCFileSink<T> {
    /// Create a new `NCFileSink`.
    pub fn new(src: NCReadStream<T>, filename: std::path::PathBuf, mode: Mode) -> Result<Self> {
        Ok(Self {
            f: BufWriter::new(open(&filename, mode)?),
            src,
        })
    }

    /// Flush the write buffer.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.f.flush()?)
    }
}

impl<T> Block for NCFileSink<T>
where
    T: Sample<Type = T> + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet<'_>> {
        match self.src.pop() {
            Some((s, _tags)) => {
                let mut v = s.serialize();
                v.push(b'\n');
                self.f.write_all(&v)?;
                Ok(BlockRet::Again)
            }
            None => Ok(BlockRet::WaitForStream(&self.src, 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Complex, Float};

    #[test]
    fn sink_f32() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let tmpfn = tmpd.path().join("delme.bin");
        {
            #[allow(clippy::approx_constant)]
            let rx = ReadStream::from_slice(&[1.0f32, 3.0, 3.14, -3.14]);
            let mut sink = FileSink::<Float>::new(rx, tmpfn.clone(), Mode::Create)?;
            sink.work()?;
            sink.flush()?;
        }
        let out = std::fs::read(tmpfn)?;
        assert_eq!(
            out,
            vec![0, 0, 128, 63, 0, 0, 64, 64, 195, 245, 72, 64, 195, 245, 72, 192]
        );
        Ok(())
    }

    #[test]
    fn sink_c32() -> Result<()> {
        let tmpd = tempfile::tempdir()?;
        let tmpfn = tmpd.path().join("delme.bin");
        {
            #[allow(clippy::approx_constant)]
            let rx = ReadStream::from_slice(&[Complex::new(0.0, 0.0), Complex::new(3.14, -2.7)]);
            let mut sink = FileSink::<Complex>::new(rx, tmpfn.clone(), Mode::Create)?;
            sink.work()?;
            sink.flush()?;
        }
        let out = std::fs::read(tmpfn)?;
        assert_eq!(
            out,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 195, 245, 72, 64, 205, 204, 44, 192]
        );
        Ok(())
    }
}
