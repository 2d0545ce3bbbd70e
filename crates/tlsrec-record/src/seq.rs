//! Per-direction, per-epoch sequence number registry.
//!
//! Each direction starts in epoch 0 with a counter of 0. A cipher-spec
//! change opens a new epoch whose counter restarts at 0, while a bounded
//! number of superseded epochs stay usable so records already in flight
//! can drain.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::RecordConfig;
use crate::record::anti_replay::ReplayWindow;
use tlsrec_types::RecordError;

/// DTLS sequence numbers are 48 bits wide (RFC 6347 §4.1).
pub const MAX_DTLS_SEQUENCE: u64 = (1u64 << 48) - 1;

/// Counters of one direction.
#[derive(Debug, Clone)]
pub struct EpochCounters {
    current: u16,
    counters: BTreeMap<u16, u64>,
    max_sequence: u64,
    max_retained: usize,
}

impl EpochCounters {
    fn new(max_sequence: u64, max_retained: usize) -> Self {
        Self {
            current: 0,
            counters: BTreeMap::from([(0, 0)]),
            max_sequence,
            max_retained,
        }
    }

    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn is_live(&self, epoch: u16) -> bool {
        self.counters.contains_key(&epoch)
    }

    /// The value the next allocation for `epoch` will return.
    pub fn peek(&self, epoch: u16) -> Option<u64> {
        self.counters.get(&epoch).copied()
    }

    /// Live epochs in ascending order.
    pub fn epochs(&self) -> impl Iterator<Item = u16> + '_ {
        self.counters.keys().copied()
    }

    fn allocate(&mut self, epoch: u16) -> Result<u64, RecordError> {
        let counter = self
            .counters
            .get_mut(&epoch)
            .ok_or_else(|| RecordError::framing(format!("epoch {epoch} is not live")))?;
        if *counter > self.max_sequence {
            return Err(RecordError::SequenceOverflow);
        }
        let seq = *counter;
        *counter += 1;
        Ok(seq)
    }

    /// Open the next epoch and retire superseded epochs beyond the bound.
    /// Returns the new epoch and the epochs retired to make room.
    fn start_epoch(&mut self) -> Result<(u16, Vec<u16>), RecordError> {
        let epoch = self
            .current
            .checked_add(1)
            .ok_or_else(|| RecordError::framing("epoch space exhausted"))?;
        self.counters.insert(epoch, 0);
        self.current = epoch;

        let mut retired = Vec::new();
        while self.counters.len() > self.max_retained + 1 {
            if let Some((oldest, _)) = self.counters.pop_first() {
                retired.push(oldest);
            }
        }
        Ok((epoch, retired))
    }

    fn retire(&mut self, epoch: u16) -> bool {
        epoch != self.current && self.counters.remove(&epoch).is_some()
    }
}

/// Sequence numbers for both directions of one connection.
///
/// Read and write paths touch disjoint counters; each direction must be
/// driven by one caller at a time.
#[derive(Debug, Clone)]
pub struct SequenceNumbers {
    datagram: bool,
    write: EpochCounters,
    read: EpochCounters,
    replay: BTreeMap<u16, ReplayWindow>,
}

impl SequenceNumbers {
    /// Registry for a TLS (stream) connection.
    pub fn stream(config: &RecordConfig) -> Self {
        Self::new(false, config.max_retained_epochs)
    }

    /// Registry for a DTLS connection: 48-bit counters and replay windows.
    pub fn datagram(config: &RecordConfig) -> Self {
        Self::new(true, config.max_retained_epochs)
    }

    fn new(datagram: bool, max_retained: usize) -> Self {
        let max_sequence = if datagram { MAX_DTLS_SEQUENCE } else { u64::MAX - 1 };
        Self {
            datagram,
            write: EpochCounters::new(max_sequence, max_retained),
            read: EpochCounters::new(max_sequence, max_retained),
            replay: BTreeMap::from([(0, ReplayWindow::new())]),
        }
    }

    pub fn is_datagram(&self) -> bool {
        self.datagram
    }

    pub fn current_write_epoch(&self) -> u16 {
        self.write.current()
    }

    pub fn current_read_epoch(&self) -> u16 {
        self.read.current()
    }

    pub fn write_counters(&self) -> &EpochCounters {
        &self.write
    }

    pub fn read_counters(&self) -> &EpochCounters {
        &self.read
    }

    pub fn is_read_epoch_live(&self, epoch: u16) -> bool {
        self.read.is_live(epoch)
    }

    /// Allocate the next write sequence number of `epoch`.
    ///
    /// For DTLS the value carries the epoch in its top 16 bits, matching
    /// the 8 bytes fed to the MAC and the AEAD nonce.
    pub fn next_write_sequence(&mut self, epoch: u16) -> Result<u64, RecordError> {
        let seq = self.write.allocate(epoch)?;
        Ok(self.encode(epoch, seq))
    }

    /// Allocate the next implicit read sequence number of `epoch`.
    pub fn next_read_sequence(&mut self, epoch: u16) -> Result<u64, RecordError> {
        let seq = self.read.allocate(epoch)?;
        Ok(self.encode(epoch, seq))
    }

    fn encode(&self, epoch: u16, seq: u64) -> u64 {
        if self.datagram {
            (u64::from(epoch) << 48) | seq
        } else {
            seq
        }
    }

    /// Start a new write epoch with its counter at 0.
    pub fn new_write_epoch(&mut self) -> Result<u16, RecordError> {
        let (epoch, retired) = self.write.start_epoch()?;
        debug!(epoch, ?retired, "new write epoch");
        Ok(epoch)
    }

    /// Start a new read epoch with its counter and replay window reset.
    pub fn new_read_epoch(&mut self) -> Result<u16, RecordError> {
        let (epoch, retired) = self.read.start_epoch()?;
        self.replay.insert(epoch, ReplayWindow::new());
        for old in &retired {
            self.replay.remove(old);
        }
        debug!(epoch, ?retired, "new read epoch");
        Ok(epoch)
    }

    /// Retire a superseded write epoch. The current epoch is never retired.
    pub fn retire_write_epoch(&mut self, epoch: u16) -> bool {
        let retired = self.write.retire(epoch);
        if retired {
            debug!(epoch, "write epoch retired");
        }
        retired
    }

    /// Retire a superseded read epoch. The current epoch is never retired.
    pub fn retire_read_epoch(&mut self, epoch: u16) -> bool {
        let retired = self.read.retire(epoch);
        if retired {
            self.replay.remove(&epoch);
            debug!(epoch, "read epoch retired");
        }
        retired
    }

    /// DTLS: whether an explicit sequence number of `epoch` was seen already.
    /// Records of epochs that are not live count as seen.
    pub fn already_seen(&self, epoch: u16, seq: u64) -> bool {
        self.replay.get(&epoch).map_or(true, |w| w.is_replay(seq))
    }

    /// DTLS: mark an authenticated record as received.
    pub fn read_accept(&mut self, epoch: u16, seq: u64) {
        if let Some(window) = self.replay.get_mut(&epoch) {
            window.mark(seq);
        }
    }
}
