//! Sequencing and lifetime management across many in-flight [`AfBuilder`]s.

use std::collections::HashMap;

use crate::edi::af_builder::{AfBuilder, DecodeAttempt};
use crate::edi::fragment::Fragment;
use crate::Result;

/// How many completed/expired builders behind `next_pseq` are kept around
/// before being garbage-collected, per §4.3.
const NUM_AFBUILDERS_TO_KEEP: u16 = 10;

/// Default `max_delay`, in AF packets, before giving up on a packet.
const DEFAULT_MAX_DELAY: u32 = 10;

/// Reassembles a stream of PFT fragments into AF packets, strictly in
/// `pseq` order (wrapping, unsigned 16-bit), tolerating loss by skipping a
/// packet once it has been outstanding for `max_delay` packet arrivals.
pub struct PftManager {
    builders: HashMap<u16, AfBuilder>,
    next_pseq: Option<u16>,
    max_delay: u32,
}

impl Default for PftManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELAY)
    }
}

impl PftManager {
    /// Create a manager with the given `max_delay`, in AF packets.
    #[must_use]
    pub fn new(max_delay: u32) -> Self {
        Self {
            builders: HashMap::new(),
            next_pseq: None,
            max_delay,
        }
    }

    /// Feed one parsed fragment in. Invalid (CRC-failed) fragments are
    /// still stored: a missing fragment and an invalid one both just
    /// contribute nothing usable to reassembly.
    pub fn push(&mut self, frag: Fragment) -> Result<()> {
        if self.next_pseq.is_none() {
            self.next_pseq = Some(frag.pseq);
        }
        let pseq = frag.pseq;
        let fcount = frag.fcount.max(1);
        let lifetime = (fcount * self.max_delay).max(1);
        let builder = self
            .builders
            .entry(pseq)
            .or_insert_with(|| AfBuilder::new(pseq, frag.fcount, lifetime));
        builder.push(frag)
    }

    /// Advance the reassembly state machine by one step and report whether
    /// an AF packet became available. Returns `Ok(None)` both when nothing
    /// is ready yet (call again after the next `push`) and when the
    /// packet at the front of the queue was permanently skipped.
    pub fn get_next_af(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(next_pseq) = self.next_pseq else {
            return Ok(None);
        };
        if !self.builders.contains_key(&next_pseq) && self.builders.len() > self.max_delay as usize
        {
            self.builders.clear();
            self.next_pseq = None;
            return Ok(None);
        }
        let Some(builder) = self.builders.get_mut(&next_pseq) else {
            return Ok(None);
        };
        let result = match builder.decode_attempt() {
            DecodeAttempt::Yes => {
                let out = builder.extract()?;
                self.advance(next_pseq);
                out
            }
            DecodeAttempt::Maybe => {
                builder.lifetime = builder.lifetime.saturating_sub(1);
                if builder.lifetime == 0 {
                    let out = builder.extract()?;
                    self.advance(next_pseq);
                    out
                } else {
                    None
                }
            }
            DecodeAttempt::No => {
                builder.lifetime = builder.lifetime.saturating_sub(1);
                if builder.lifetime == 0 {
                    self.advance(next_pseq);
                }
                None
            }
        };
        self.garbage_collect();
        Ok(result)
    }

    fn advance(&mut self, pseq: u16) {
        self.builders.remove(&pseq);
        self.next_pseq = Some(pseq.wrapping_add(1));
    }

    fn garbage_collect(&mut self) {
        if let Some(next) = self.next_pseq {
            let stale = next.wrapping_sub(NUM_AFBUILDERS_TO_KEEP);
            self.builders.remove(&stale);
        }
    }
}
