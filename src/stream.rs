/*! Streams connecting blocks.

Blocks are connected by streams. A block has zero or more input streams and
zero or more output streams. `ReadStream`/`WriteStream` carry `Copy` element
types (samples, soft bits) through a ring buffer; `NCReadStream`/
`NCWriteStream` carry non-`Copy`, frame-shaped values (e.g. a decoded ETI
frame as `Vec<u8>`) through a bounded queue instead.
*/
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::circular_buffer;
use crate::{Error, Float, Len, Result};

/// Tag position in the current stream window.
pub type TagPos = usize;

/// Value carried by a [`Tag`].
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum TagValue {
    /// String value.
    String(String),
    /// Float value.
    Float(Float),
    /// Bool value.
    Bool(bool),
    /// U64 value.
    U64(u64),
    /// I64 value.
    I64(i64),
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::String(s) => write!(f, "String:{s}"),
            TagValue::Float(s) => write!(f, "Float:{s}"),
            TagValue::Bool(s) => write!(f, "Bool:{s}"),
            TagValue::U64(s) => write!(f, "U64:{s}"),
            TagValue::I64(s) => write!(f, "I64:{s}"),
        }
    }
}

/// Metadata attached to a position in a stream (e.g. "this sample starts a
/// new ETI frame", carried from the `eti_collector` block through to the
/// PHY encoder so downstream blocks can re-synchronize on frame boundaries).
#[derive(Debug, PartialEq, Clone, PartialOrd)]
pub struct Tag {
    pos: TagPos,
    key: String,
    val: TagValue,
}

impl Tag {
    /// Create a new tag.
    #[must_use]
    pub fn new<T: Into<String>>(pos: TagPos, key: T, val: TagValue) -> Self {
        Self {
            pos,
            key: key.into(),
            val,
        }
    }

    /// Position, relative to the current window.
    #[must_use]
    pub fn pos(&self) -> TagPos {
        self.pos
    }

    /// Set the position, relative to the current window.
    pub fn set_pos(&mut self, pos: TagPos) {
        self.pos = pos;
    }

    /// Tag key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tag value.
    #[must_use]
    pub fn val(&self) -> &TagValue {
        &self.val
    }
}

/// Default stream capacity, in elements.
///
/// Large enough to hold several transmission frames' worth of OFDM samples
/// without forcing blocks to synchronize on every `work()` call.
pub(crate) const DEFAULT_STREAM_SIZE: usize = 4_096_000;

const DEFAULT_NOCOPY_CAPACITY: usize = 64;

/// Let the scheduler wait on a stream without knowing its element type.
pub trait StreamWait {
    /// ID shared between the read and write side of one stream.
    #[must_use]
    fn id(&self) -> usize;

    /// Wait a little while for `need` items/space to become available.
    ///
    /// Returns true if `need` will *never* be satisfied (the other end has
    /// gone away), meaning the scheduler should treat this block as done.
    #[must_use]
    fn wait(&self, need: usize) -> bool;

    /// True if the other end of this stream has been dropped.
    #[must_use]
    fn closed(&self) -> bool;
}

impl<T: Copy> StreamWait for ReadStream<T> {
    fn id(&self) -> usize {
        self.circ.id()
    }
    fn wait(&self, need: usize) -> bool {
        self.circ.wait_for_read(need) < need && Arc::strong_count(&self.circ) == 1
    }
    fn closed(&self) -> bool {
        Arc::strong_count(&self.circ) == 1
    }
}

impl<T: Copy + Default> StreamWait for WriteStream<T> {
    fn id(&self) -> usize {
        self.circ.id()
    }
    fn wait(&self, need: usize) -> bool {
        self.circ.wait_for_write(need) < need && Arc::strong_count(&self.circ) == 1
    }
    fn closed(&self) -> bool {
        Arc::strong_count(&self.circ) == 1
    }
}

/// The read side of a stream of `Copy` elements.
#[derive(Debug)]
pub struct ReadStream<T> {
    circ: Arc<circular_buffer::Buffer<T>>,
}

impl<T> Clone for ReadStream<T> {
    fn clone(&self) -> Self {
        Self {
            circ: self.circ.clone(),
        }
    }
}

impl<T: Copy> ReadStream<T> {
    /// Create a stream already containing `data`, for tests.
    #[cfg(test)]
    #[must_use]
    pub fn from_slice(data: &[T]) -> Self
    where
        T: Default,
    {
        let circ = Arc::new(circular_buffer::Buffer::new(DEFAULT_STREAM_SIZE).unwrap());
        let mut wb = circ.clone().write_buf().unwrap();
        wb.fill_from_slice(data);
        wb.produce(data.len(), &[]);
        Self { circ }
    }

    /// Total configured capacity of the underlying buffer.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.circ.total_size()
    }

    /// Get a window into the stream, plus any tags within it.
    ///
    /// Only the owning block and its `BufferReader` should hold a reference
    /// at a time; see [`WriteStream::write_buf`] for the refcount rationale.
    pub fn read_buf(&self) -> Result<(circular_buffer::BufferReader<T>, Vec<Tag>)> {
        let refcount = Arc::strong_count(&self.circ);
        debug_assert!(refcount < 4, "read_buf() called with refcount {refcount}");
        if refcount > 3 {
            return Err(Error::Stream(format!(
                "read_buf() called with refcount {refcount}"
            )));
        }
        Arc::clone(&self.circ).read_buf()
    }

    /// True if `need` elements will *never* arrive (writer gone, and not
    /// enough buffered to satisfy it).
    #[must_use]
    pub fn wait_for_read(&self, need: usize) -> bool {
        self.circ.wait_for_read(need) < need && Arc::strong_count(&self.circ) == 1
    }
}

impl<T> ReadStream<T> {
    /// True if there is nothing more, ever, to read from this stream.
    #[must_use]
    pub fn eof(&self) -> bool {
        if Arc::strong_count(&self.circ) != 1 {
            return false;
        }
        self.circ.is_empty()
    }

    #[must_use]
    pub(crate) fn refcount(&self) -> usize {
        Arc::strong_count(&self.circ)
    }
}

/// The write side of a stream of `Copy` elements.
#[derive(Debug)]
pub struct WriteStream<T> {
    circ: Arc<circular_buffer::Buffer<T>>,
}

impl<T> StreamReadSide for WriteStream<T> {
    type ReadSide = ReadStream<T>;
}

impl<T: Copy + Default> WriteStream<T> {
    /// Create a new, connected `(WriteStream, ReadStream)` pair.
    #[must_use]
    pub fn new() -> (WriteStream<T>, ReadStream<T>) {
        new_stream()
    }

    /// Free space in the stream, in elements.
    #[must_use]
    pub fn free(&self) -> usize {
        self.circ.free()
    }

    /// Get a write window.
    ///
    /// See [`ReadStream::read_buf`] for the refcount rationale: there should
    /// never be more than the source block, destination block, and their
    /// two active buffer views holding a reference at once.
    pub fn write_buf(&self) -> Result<circular_buffer::BufferWriter<T>> {
        let refcount = Arc::strong_count(&self.circ);
        debug_assert!(refcount < 4, "write_buf() called with refcount {refcount}");
        if refcount > 3 {
            return Err(Error::Stream(format!(
                "write_buf() called with refcount {refcount}"
            )));
        }
        Arc::clone(&self.circ).write_buf()
    }

    /// True if `need` elements of space will *never* become free.
    #[must_use]
    pub fn wait_for_write(&self, need: usize) -> bool {
        self.circ.wait_for_write(need) < need && Arc::strong_count(&self.circ) == 1
    }

    #[must_use]
    pub(crate) fn refcount(&self) -> usize {
        Arc::strong_count(&self.circ)
    }
}

/// Create a new stream of `Copy` elements.
#[must_use]
pub fn new_stream<T: Copy + Default>() -> (WriteStream<T>, ReadStream<T>) {
    let circ = Arc::new(circular_buffer::Buffer::new(DEFAULT_STREAM_SIZE).unwrap());
    (WriteStream { circ: circ.clone() }, ReadStream { circ })
}

struct NCEntry<T> {
    val: T,
    tags: Vec<Tag>,
}

struct NCInner<T> {
    lock: Mutex<VecDeque<NCEntry<T>>>,
    cv: Condvar,
    capacity: usize,
}

/// The read side of a stream of non-`Copy`, frame-shaped values.
pub struct NCReadStream<T> {
    id: usize,
    inner: Arc<NCInner<T>>,
}

impl<T> Clone for NCReadStream<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<T> StreamWait for NCReadStream<T> {
    fn id(&self) -> usize {
        self.id
    }
    fn wait(&self, need: usize) -> bool {
        let l = self
            .inner
            .cv
            .wait_timeout_while(
                self.inner.lock.lock().unwrap(),
                std::time::Duration::from_millis(100),
                |s| s.len() < need,
            )
            .unwrap();
        l.0.len() < need && Arc::strong_count(&self.inner) == 1
    }
    fn closed(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }
}

impl<T> StreamWait for NCWriteStream<T> {
    fn id(&self) -> usize {
        self.id
    }
    fn wait(&self, _need: usize) -> bool {
        self.closed()
    }
    fn closed(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }
}

/// The write side of a stream of non-`Copy`, frame-shaped values.
pub struct NCWriteStream<T> {
    id: usize,
    inner: Arc<NCInner<T>>,
}

/// Create a new stream of non-`Copy` elements (frames, packets).
#[must_use]
pub fn new_nocopy_stream<T>() -> (NCWriteStream<T>, NCReadStream<T>) {
    let inner = Arc::new(NCInner {
        lock: Mutex::new(VecDeque::new()),
        cv: Condvar::new(),
        capacity: DEFAULT_NOCOPY_CAPACITY,
    });
    let id = crate::NEXT_STREAM_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    (
        NCWriteStream {
            id,
            inner: inner.clone(),
        },
        NCReadStream { id, inner },
    )
}

impl<T> NCReadStream<T> {
    /// Pop the oldest value, if any.
    #[must_use]
    pub fn pop(&self) -> Option<(T, Vec<Tag>)> {
        let ret = self
            .inner
            .lock
            .lock()
            .unwrap()
            .pop_front()
            .map(|v| (v.val, v.tags));
        self.inner.cv.notify_all();
        ret
    }

    /// True if there is nothing more, ever, to read.
    #[must_use]
    pub fn eof(&self) -> bool {
        if !self.inner.lock.lock().unwrap().is_empty() {
            false
        } else {
            Arc::strong_count(&self.inner) == 1
        }
    }

    /// True if nothing is queued right now.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock.lock().unwrap().is_empty()
    }
}

/// Maps a write-side stream type to its corresponding read-side type.
pub trait StreamReadSide {
    /// The matching read-side stream type.
    type ReadSide;
}

impl<T> StreamReadSide for NCWriteStream<T> {
    type ReadSide = NCReadStream<T>;
}

impl<T> NCWriteStream<T> {
    /// Create a new, connected `(NCWriteStream, NCReadStream)` pair.
    #[must_use]
    pub fn new() -> (NCWriteStream<T>, NCReadStream<T>) {
        new_nocopy_stream()
    }

    /// Push one value, with its tags, handing off ownership.
    ///
    /// Does not enforce capacity; check [`Self::remaining`] first if
    /// overflow is a concern.
    pub fn push<Tags: Into<Vec<Tag>>>(&self, val: T, tags: Tags) {
        self.inner.lock.lock().unwrap().push_back(NCEntry {
            val,
            tags: tags.into(),
        });
        self.inner.cv.notify_all();
    }

    /// Remaining queue capacity.
    #[must_use]
    pub fn remaining(&self) -> usize {
        let has = self.inner.lock.lock().unwrap().len();
        self.capacity().saturating_sub(has)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T: Len> NCReadStream<T> {
    /// Size of the front-of-queue value, if any.
    #[must_use]
    pub fn peek_size(&self) -> Option<usize> {
        self.inner.lock.lock().unwrap().front().map(|e| e.val.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_stream_round_trip() -> Result<()> {
        let (w, r) = new_stream::<u8>();
        {
            let mut wb = w.write_buf()?;
            wb.fill_from_slice(&[1, 2, 3]);
            wb.produce(3, &[]);
        }
        let (rb, _tags) = r.read_buf()?;
        assert_eq!(rb.slice(), vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn eof_after_writer_drop() -> Result<()> {
        let (w, r) = new_stream::<u8>();
        drop(w);
        assert!(r.eof());
        Ok(())
    }

    #[test]
    fn nocopy_round_trip() {
        let (w, r) = new_nocopy_stream::<Vec<u8>>();
        w.push(vec![1, 2, 3], vec![]);
        let (v, _tags) = r.pop().unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }
}
