/*! Graphs contain blocks connected by streams, and run them to completion.

Unlike the older multi-threaded scheduler this crate used to ship
(`mtgraph`), blocks here connect directly: a block's constructor takes the
`ReadStream`/`NCReadStream` handles it needs and returns the matching output
handles, so by the time a block is handed to [`Graph::add`] it is already
wired up. The graph's only job is to keep calling `work()` on every block,
in order, until each one reports [`BlockRet::EOF`] or gets permanently
stuck waiting on a stream that [`StreamWait::wait`] says will never be
satisfied.

This crate runs single-threaded: one call to [`Graph::run`] drives the
whole EDI-to-IQ pipeline on the caller's thread. That matches how a DAB
modulator is actually used — it is I/O bound on a UDP/file source and an
output sink, not CPU-parallel across blocks.
*/
use std::time::Instant;

use log::debug;

use crate::Result;
use crate::block::{Block, BlockRet};

/// Runs a collection of connected blocks until the graph is done.
///
/// Implemented by [`Graph`]; the trait exists so callers and tests can be
/// written against "something that runs a graph" without committing to a
/// particular scheduling strategy.
pub trait GraphRunner {
    /// Add a block to the graph. Blocks run in the order they were added.
    fn add(&mut self, b: Box<dyn Block>);

    /// Run until every block is at EOF or permanently blocked.
    fn run(&mut self) -> Result<()>;
}

/// A single-threaded, cooperative block scheduler.
///
/// # Example
///
/// ```
/// use dabmod::graph::{Graph, GraphRunner};
/// use dabmod::blocks::{VectorSource, NullSink};
/// # fn main() -> dabmod::Result<()> {
/// let (src, rx) = VectorSource::new(vec![1.0f32, 2.0, 3.0]);
/// let sink = NullSink::new(rx);
/// let mut g = Graph::new();
/// g.add(Box::new(src));
/// g.add(Box::new(sink));
/// g.run()?;
/// # Ok(())
/// # }
/// ```
pub struct Graph {
    blocks: Vec<Box<dyn Block>>,
    done: Vec<bool>,
}

impl Graph {
    /// Create a new, empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            done: Vec::new(),
        }
    }

    fn run_one(&mut self) -> Result<bool> {
        let mut all_done = true;
        let st_loop = Instant::now();
        let mut progressed = false;
        for (n, b) in self.blocks.iter_mut().enumerate() {
            if self.done[n] {
                continue;
            }
            let st = Instant::now();
            match b.work()? {
                BlockRet::Again => {
                    progressed = true;
                    all_done = false;
                }
                BlockRet::Pending => {
                    all_done = false;
                }
                BlockRet::WaitForStream(w, need) => {
                    if w.wait(need) {
                        debug!("{} will never get {need} more; treating as EOF", b.block_name());
                        self.done[n] = true;
                    } else {
                        all_done = false;
                    }
                }
                BlockRet::EOF => {
                    self.done[n] = true;
                }
            }
            debug!("work() done for {}. Took {:?}", b.block_name(), st.elapsed());
        }
        debug!(
            "Graph loop end. all_done={all_done}. Took {:?}",
            st_loop.elapsed()
        );
        if !progressed && !all_done {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        Ok(all_done)
    }
}

impl GraphRunner for Graph {
    fn add(&mut self, b: Box<dyn Block>) {
        self.blocks.push(b);
        self.done.push(false);
    }

    fn run(&mut self) -> Result<()> {
        while !self.run_one()? {}
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Float;
    use crate::blocks::{VectorSink, VectorSourceBuilder};

    #[test]
    fn runs_source_to_sink() -> Result<()> {
        let (src, rx) = VectorSourceBuilder::<Float>::new(vec![1.0, 2.0, 3.0]).build();
        let mut g = Graph::new();
        g.add(Box::new(src));
        // VectorSink keeps everything it sees, so this also exercises the
        // scheduler draining a finite source to EOF.
        let sink = VectorSink::new(rx, 100);
        g.add(Box::new(sink));
        g.run()?;
        Ok(())
    }
}
