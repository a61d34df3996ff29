/*! Block trait and the scheduler's return type.

Blocks are the processing units of the pipeline. Each block owns its input
and output stream handles and knows how to turn one into the other; the
[`crate::graph::Graph`] just keeps calling [`Block::work`] until every block
reports [`BlockRet::EOF`] or is stuck waiting on a stream that will never
satisfy it.
*/

use crate::Result;
use crate::stream::StreamWait;

/// Return type for [`Block::work`].
///
/// Tells the scheduler whether to call this block again right away, to wait
/// on a particular stream before bothering, or to retire the block entirely.
#[derive(Debug)]
pub enum BlockRet<'a> {
    /// At least one item was produced or consumed; call `work()` again
    /// without waiting.
    Again,

    /// Nothing happened this round and nothing will until the named stream
    /// has at least `usize` more room (for a write side) or items (for a
    /// read side). The scheduler parks the block until that changes.
    WaitForStream(&'a dyn StreamWait, usize),

    /// The block is waiting on something the scheduler can't observe through
    /// a stream (e.g. a background thread). Poll again after a short delay.
    Pending,

    /// This block will never produce more output. Once every block in the
    /// graph reaches EOF or is permanently blocked, the graph run ends.
    EOF,
}

/// Name of a block, for logging.
pub trait BlockName {
    /// Name of the block type. Not the name of a particular instance.
    fn block_name(&self) -> &str;
}

/// End-of-file propagation.
///
/// Most blocks derive this via the `noeof` / default behavior of the derive
/// macro; blocks with non-stream completion conditions (e.g. a fixed repeat
/// count) implement it by hand.
pub trait BlockEOF {
    /// Return whether this block itself is done. Default: never.
    fn eof(&mut self) -> bool {
        false
    }
}

/// Trait all blocks implement, usually via `#[derive(dabmod_macros::Block)]`.
pub trait Block: BlockName {
    /// Do one unit of work: pull from inputs, push to outputs.
    fn work(&mut self) -> Result<BlockRet<'_>>;
}
