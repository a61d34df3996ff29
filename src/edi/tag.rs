//! TAG item parsing and dispatch into an [`EtiCollector`].

use std::collections::HashSet;

use crate::edi::eti_collector::EtiCollector;
use crate::{Error, Result};

/// Iterates the TAG items inside one AF packet's tag-packet payload and
/// dispatches each to the matching [`EtiCollector`] handler.
///
/// The protocol TAG `*ptr` must be the first item; `est<n>` and `deti`
/// tags are rejected if seen first (the collector itself enforces this,
/// since it also needs to track the state across AF packets sharing one
/// ETI frame... in practice one AF packet carries one full ETI frame, so
/// state resets per packet). Decoding stops — without error — the moment
/// an unrecognised tag name is seen, per the tag-packet format's contract.
#[derive(Default)]
pub struct TagDispatcher {
    warned_unknown: HashSet<[u8; 4]>,
}

impl TagDispatcher {
    /// Create a dispatcher with no unknown-tag warnings issued yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every tag item in `data`, updating `collector`.
    pub fn dispatch(&mut self, collector: &mut EtiCollector, data: &[u8]) -> Result<()> {
        let mut pos = 0;
        let mut first = true;
        while pos + 8 <= data.len() {
            let name: [u8; 4] = data[pos..pos + 4].try_into()?;
            let bit_len = u32::from_be_bytes(data[pos + 4..pos + 8].try_into()?);
            if bit_len % 8 != 0 {
                return Err(Error::protocol("tag item bit length not a multiple of 8"));
            }
            let byte_len = (bit_len / 8) as usize;
            let start = pos + 8;
            let end = start
                .checked_add(byte_len)
                .ok_or_else(|| Error::protocol("tag item length overflow"))?;
            if end > data.len() {
                return Err(Error::protocol("tag item overruns its AF packet"));
            }
            let payload = &data[start..end];

            if first && &name != b"*ptr" {
                return Err(Error::protocol(
                    "first TAG in an AF packet must be '*ptr'",
                ));
            }

            match &name {
                b"*ptr" => collector.handle_ptr(payload)?,
                b"deti" => collector.handle_deti(payload)?,
                b"*dmy" => {}
                _ if &name[0..3] == b"est" => {
                    let n = (name[3] as char)
                        .to_digit(16)
                        .ok_or_else(|| Error::protocol("malformed 'est<n>' tag name"))?
                        as u8;
                    collector.handle_est(n, payload)?;
                }
                _ => {
                    if self.warned_unknown.insert(name) {
                        log::warn!(
                            "unrecognised EDI tag {:?}",
                            String::from_utf8_lossy(&name)
                        );
                    }
                    break;
                }
            }

            pos = end;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_item(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut v = name.to_vec();
        v.extend(((payload.len() as u32) * 8).to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    #[test]
    fn dispatches_ptr_and_stops_on_unknown_tag() {
        let mut ptr_payload = b"DETI".to_vec();
        ptr_payload.extend([0, 0, 0, 0]);
        let mut data = tag_item(b"*ptr", &ptr_payload);
        data.extend(tag_item(b"zzzz", b"ignored"));

        let mut collector = EtiCollector::new();
        let mut dispatcher = TagDispatcher::new();
        dispatcher.dispatch(&mut collector, &data).unwrap();
    }

    #[test]
    fn rejects_packet_not_starting_with_ptr() {
        let data = tag_item(b"*dmy", b"");
        let mut collector = EtiCollector::new();
        let mut dispatcher = TagDispatcher::new();
        assert!(dispatcher.dispatch(&mut collector, &data).is_err());
    }
}
