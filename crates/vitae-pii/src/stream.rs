//! Incremental unmasking for chunked model output

use crate::codec::unmask;
use crate::mapping::PiiMapping;

/// Applies [`unmask`] to text that arrives in pieces.
///
/// A token may straddle two chunks (`"[PII_EM"` then `"AIL_1]"`). The
/// unmasker holds back an unterminated `[` tail until it closes, or until
/// it is longer than any token in the mapping and so cannot be one.
#[derive(Debug, Clone)]
pub struct StreamUnmasker {
    mapping: PiiMapping,
    pending: String,
    longest_token: usize,
}

impl StreamUnmasker {
    /// Create an unmasker for one request's mapping
    #[must_use]
    pub fn new(mapping: PiiMapping) -> Self {
        let longest_token = mapping.longest_token();
        Self {
            mapping,
            pending: String::new(),
            longest_token,
        }
    }

    /// Feed a chunk and return whatever can be released so far.
    ///
    /// The returned string may be empty when the whole chunk is held back.
    pub fn push(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        if self.mapping.is_empty() {
            return std::mem::take(&mut self.pending);
        }

        let split = self.hold_point();
        let ready: String = self.pending.drain(..split).collect();
        unmask(&ready, &self.mapping)
    }

    /// Release everything still held back
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        unmask(&rest, &self.mapping)
    }

    /// Drop held-back text without releasing it
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    fn hold_point(&self) -> usize {
        match self.pending.rfind('[') {
            Some(idx)
                if !self.pending[idx..].contains(']')
                    && self.pending.len() - idx < self.longest_token =>
            {
                idx
            }
            _ => self.pending.len(),
        }
    }
}
