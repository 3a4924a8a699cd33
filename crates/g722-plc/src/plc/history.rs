//! Output history buffer
//!
//! Fixed-length buffer of the most recent output samples, oldest first. Good
//! frames append the delivered output; concealed frames append the
//! unattenuated synthesis so periodic extension keeps its level while the
//! delivered output fades.

use crate::plc::constants::{HIST_LEN, LPCO};

/// Most recent [`HIST_LEN`] samples, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryBuffer {
    samples: [i16; HIST_LEN],
}

impl HistoryBuffer {
    /// Create an all-zero history
    pub fn new() -> Self {
        Self {
            samples: [0; HIST_LEN],
        }
    }

    /// Append a frame, discarding the oldest samples
    pub fn push_frame(&mut self, frame: &[i16]) {
        let n = frame.len().min(HIST_LEN);
        let frame = &frame[frame.len() - n..];
        self.samples.copy_within(n.., 0);
        self.samples[HIST_LEN - n..].copy_from_slice(frame);
    }

    /// All samples, oldest first
    pub fn samples(&self) -> &[i16; HIST_LEN] {
        &self.samples
    }

    /// The newest `n` samples
    pub fn last(&self, n: usize) -> &[i16] {
        &self.samples[HIST_LEN - n.min(HIST_LEN)..]
    }

    /// The newest [`LPCO`] samples, newest first, as synthesis filter memory
    pub fn filter_memory(&self) -> [i16; LPCO] {
        let mut mem = [0i16; LPCO];
        for (i, m) in mem.iter_mut().enumerate() {
            *m = self.samples[HIST_LEN - 1 - i];
        }
        mem
    }

    /// Clear to silence
    pub fn reset(&mut self) {
        self.samples = [0; HIST_LEN];
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
