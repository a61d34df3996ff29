/*! Backing storage for [`crate::stream::ReadStream`] / [`crate::stream::WriteStream`].

Earlier generations of this crate mapped a buffer twice into virtual memory
so that any read or write window was always a contiguous slice, wrapping
around the end of the allocation for free. That trick needs `unsafe` and a
page-aligned `mmap`, in exchange for avoiding a `memmove` on wraparound. DAB
frames are small and bounded (an ETI frame is exactly 6144 bytes; a
transmission frame a few hundred thousand samples), so the double-mapping
trick buys nothing here. A plain growable `Vec<T>` that compacts on write
does the same job without `unsafe`.
*/
use std::sync::{Arc, Condvar, Mutex};

use crate::stream::Tag;
use crate::Result;

struct Inner<T> {
    data: Vec<T>,
    /// Read position within `data`. Everything before this has been consumed.
    rpos: usize,
    tags: Vec<Tag>,
}

impl<T> Inner<T> {
    /// Drop already-consumed data so `data` doesn't grow without bound.
    fn compact(&mut self) {
        if self.rpos == 0 {
            return;
        }
        self.data.drain(..self.rpos);
        for tag in &mut self.tags {
            tag.set_pos(tag.pos().saturating_sub(self.rpos));
        }
        self.rpos = 0;
    }
}

/// Shared ring buffer of `T`.
///
/// One [`crate::stream::WriteStream`] and one [`crate::stream::ReadStream`]
/// share a `Buffer` through an `Arc`.
pub struct Buffer<T> {
    id: usize,
    max_size: usize,
    inner: Mutex<Inner<T>>,
    cv: Condvar,
}

impl<T: Copy> Buffer<T> {
    /// Create a buffer that holds up to `max_size` elements.
    pub fn new(max_size: usize) -> Result<Self> {
        Ok(Self {
            id: crate::NEXT_STREAM_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            max_size,
            inner: Mutex::new(Inner {
                data: Vec::new(),
                rpos: 0,
                tags: Vec::new(),
            }),
            cv: Condvar::new(),
        })
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Configured capacity, in elements.
    pub fn total_size(&self) -> usize {
        self.max_size
    }

    /// Elements immediately available to read.
    pub fn available(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.data.len() - inner.rpos
    }

    /// Free space for writing, in elements.
    pub fn free(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        self.max_size.saturating_sub(inner.data.len() - inner.rpos)
    }

    /// Block (with a short timeout, so callers can re-poll EOF) until at
    /// least `need` elements are readable. Returns what's actually there.
    pub(crate) fn wait_for_read(&self, need: usize) -> usize {
        let inner = self.inner.lock().unwrap();
        let (inner, _) = self
            .cv
            .wait_timeout_while(inner, std::time::Duration::from_millis(50), |s| {
                s.data.len() - s.rpos < need
            })
            .unwrap();
        inner.data.len() - inner.rpos
    }

    /// Block until at least `need` elements of space are free.
    pub(crate) fn wait_for_write(&self, need: usize) -> usize {
        let inner = self.inner.lock().unwrap();
        let (inner, _) = self
            .cv
            .wait_timeout_while(inner, std::time::Duration::from_millis(50), |s| {
                self.max_size.saturating_sub(s.data.len() - s.rpos) < need
            })
            .unwrap();
        self.max_size.saturating_sub(inner.data.len() - inner.rpos)
    }

    pub(crate) fn is_empty(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.data.len() == inner.rpos
    }

    /// Get a read window, plus any tags still within it.
    pub fn read_buf(self: Arc<Self>) -> Result<(BufferReader<T>, Vec<Tag>)> {
        let tags = {
            let inner = self.inner.lock().unwrap();
            let avail = inner.data.len() - inner.rpos;
            inner
                .tags
                .iter()
                .filter(|t| t.pos() < avail)
                .cloned()
                .collect()
        };
        Ok((BufferReader { buf: self }, tags))
    }

    /// Get a write window onto the tail of the buffer.
    pub fn write_buf(self: Arc<Self>) -> Result<BufferWriter<T>> {
        self.inner.lock().unwrap().compact();
        Ok(BufferWriter {
            buf: self,
            staged: Vec::new(),
        })
    }
}

/// A snapshot of the readable portion of a [`Buffer`].
pub struct BufferReader<T> {
    buf: Arc<Buffer<T>>,
}

impl<T: Copy> BufferReader<T> {
    /// Elements available in this window.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.buf.available()
    }

    /// True if nothing is available.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the whole readable slice.
    pub fn slice(&self) -> Vec<T> {
        let inner = self.buf.inner.lock().unwrap();
        inner.data[inner.rpos..].to_vec()
    }

    /// Iterate the readable elements without collecting first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.slice().into_iter()
    }

    /// Mark `n` elements as consumed.
    pub fn consume(&self, n: usize) {
        let mut inner = self.buf.inner.lock().unwrap();
        assert!(
            inner.rpos + n <= inner.data.len(),
            "consume({n}) past end of buffer ({} available)",
            inner.data.len() - inner.rpos
        );
        inner.rpos += n;
        drop(inner);
        self.buf.cv.notify_all();
    }
}

/// A staging area for the writable tail of a [`Buffer`].
///
/// Values written via [`BufferWriter::fill_from_slice`] only become visible
/// to readers once [`BufferWriter::produce`] is called.
pub struct BufferWriter<T> {
    buf: Arc<Buffer<T>>,
    staged: Vec<T>,
}

impl<T: Copy + Default> BufferWriter<T> {
    /// Remaining write capacity.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.buf.free()
    }

    /// True if there's no room to write anything.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite the staged write window with `data`.
    ///
    /// Panics if `data` is longer than the available capacity.
    pub fn fill_from_slice(&mut self, data: &[T]) {
        assert!(data.len() <= self.len(), "write overflow");
        self.staged.clear();
        self.staged.extend_from_slice(data);
    }

    /// Mutable access to the staged slice, e.g. to fill it element by
    /// element instead of via [`Self::fill_from_slice`].
    pub fn slice(&mut self) -> &mut [T] {
        let cap = self.len();
        if self.staged.len() < cap {
            self.staged.resize(cap, T::default());
        }
        &mut self.staged
    }

    /// Commit the first `n` staged elements, attaching `tags` (positions
    /// relative to the start of this write window).
    pub fn produce(self, n: usize, tags: &[Tag]) {
        assert!(n <= self.staged.len().max(self.len()), "produced too much");
        let mut inner = self.buf.inner.lock().unwrap();
        let base = inner.data.len() - inner.rpos;
        for v in self.staged.into_iter().take(n) {
            inner.data.push(v);
        }
        for tag in tags {
            let mut t = tag.clone();
            t.set_pos(base + tag.pos());
            inner.tags.push(t);
        }
        drop(inner);
        self.buf.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() -> Result<()> {
        let buf = Arc::new(Buffer::<u8>::new(16)?);
        {
            let mut w = buf.clone().write_buf()?;
            w.fill_from_slice(&[1, 2, 3]);
            w.produce(3, &[]);
        }
        let (r, _tags) = buf.clone().read_buf()?;
        assert_eq!(r.slice(), vec![1, 2, 3]);
        r.consume(2);
        let (r, _tags) = buf.read_buf()?;
        assert_eq!(r.slice(), vec![3]);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "write overflow")]
    fn overflow_panics() {
        let buf = Arc::new(Buffer::<u8>::new(2).unwrap());
        let mut w = buf.write_buf().unwrap();
        w.fill_from_slice(&[1, 2, 3]);
    }
}
