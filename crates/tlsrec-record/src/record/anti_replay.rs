//! DTLS anti-replay sliding window (RFC 6347 §4.1.2.6).
//!
//! A 64-bit bitmap tracks the most recent sequence numbers; bit `i` is set
//! when `highest - i` has been accepted.

/// Window size (number of sequence numbers tracked).
const WINDOW_SIZE: u64 = 64;

/// Per-epoch replay window.
#[derive(Debug, Default, Clone)]
pub struct ReplayWindow {
    bitmap: u64,
    highest: Option<u64>,
}

impl ReplayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `seq` was already accepted or is too old to tell.
    ///
    /// Does not update the window; call [`mark`](Self::mark) once the
    /// record has authenticated.
    pub fn is_replay(&self, seq: u64) -> bool {
        let Some(highest) = self.highest else {
            return false;
        };
        if seq > highest {
            return false;
        }
        let offset = highest - seq;
        offset >= WINDOW_SIZE || self.bitmap & (1u64 << offset) != 0
    }

    /// Record `seq` as received.
    pub fn mark(&mut self, seq: u64) {
        match self.highest {
            None => {
                self.highest = Some(seq);
                self.bitmap = 1;
            }
            Some(highest) if seq > highest => {
                let shift = seq - highest;
                self.bitmap = if shift >= WINDOW_SIZE {
                    1
                } else {
                    (self.bitmap << shift) | 1
                };
                self.highest = Some(seq);
            }
            Some(highest) => {
                let offset = highest - seq;
                if offset < WINDOW_SIZE {
                    self.bitmap |= 1u64 << offset;
                }
            }
        }
    }

    pub fn highest(&self) -> Option<u64> {
        self.highest
    }
}
