//! Per-epoch cipher states for one traffic direction.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RecordConfig;
use crate::crypt::cipher_state::ConnectionCipherState;

/// Resolves the cipher state protecting records of an epoch.
pub trait CipherStateLookup {
    /// `None` means records of `epoch` are plaintext.
    fn cipher_state(&mut self, epoch: u16) -> Option<&mut ConnectionCipherState>;
}

/// A single cipher state answers for every epoch.
impl<'a> CipherStateLookup for Option<&'a mut ConnectionCipherState> {
    fn cipher_state(&mut self, _epoch: u16) -> Option<&mut ConnectionCipherState> {
        self.as_deref_mut()
    }
}

/// Every epoch is plaintext.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCipherState;

impl CipherStateLookup for NoCipherState {
    fn cipher_state(&mut self, _epoch: u16) -> Option<&mut ConnectionCipherState> {
        None
    }
}

struct EpochEntry {
    state: ConnectionCipherState,
    superseded_at: Option<Instant>,
}

/// Cipher states keyed by epoch.
///
/// Installing a state supersedes the previous one. Superseded states stay
/// available for at most `epoch_grace_period`, and no more than
/// `max_retained_epochs` of them are kept.
pub struct EpochCipherStates {
    entries: BTreeMap<u16, EpochEntry>,
    current: Option<u16>,
    max_retained: usize,
    grace_period: Duration,
}

impl EpochCipherStates {
    pub fn new(config: &RecordConfig) -> Self {
        Self {
            entries: BTreeMap::new(),
            current: None,
            max_retained: config.max_retained_epochs,
            grace_period: config.epoch_grace_period,
        }
    }

    /// Install the state for `epoch` and make it current.
    /// Returns the epochs dropped to respect the retention bound.
    pub fn install(&mut self, epoch: u16, state: ConnectionCipherState) -> Vec<u16> {
        let now = Instant::now();
        if let Some(previous) = self.current.and_then(|e| self.entries.get_mut(&e)) {
            previous.superseded_at = Some(now);
        }
        self.entries.insert(
            epoch,
            EpochEntry {
                state,
                superseded_at: None,
            },
        );
        self.current = Some(epoch);

        let mut dropped = Vec::new();
        while self.entries.len() > self.max_retained + 1 {
            let oldest = self.entries.keys().copied().find(|&e| e != epoch);
            match oldest {
                Some(old) => {
                    self.entries.remove(&old);
                    dropped.push(old);
                }
                None => break,
            }
        }
        debug!(epoch, ?dropped, "cipher state installed");
        dropped
    }

    pub fn current_epoch(&self) -> Option<u16> {
        self.current
    }

    pub fn get(&self, epoch: u16) -> Option<&ConnectionCipherState> {
        self.entries.get(&epoch).map(|e| &e.state)
    }

    pub fn get_mut(&mut self, epoch: u16) -> Option<&mut ConnectionCipherState> {
        self.entries.get_mut(&epoch).map(|e| &mut e.state)
    }

    pub fn current_mut(&mut self) -> Option<&mut ConnectionCipherState> {
        let epoch = self.current?;
        self.get_mut(epoch)
    }

    /// Drop a superseded state. The current state is never retired.
    pub fn retire(&mut self, epoch: u16) -> bool {
        if self.current == Some(epoch) {
            return false;
        }
        let retired = self.entries.remove(&epoch).is_some();
        if retired {
            debug!(epoch, "cipher state retired");
        }
        retired
    }

    /// Drop superseded states whose grace period has elapsed.
    pub fn retire_expired(&mut self) -> Vec<u16> {
        let grace = self.grace_period;
        let expired: Vec<u16> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.superseded_at.is_some_and(|t| t.elapsed() >= grace))
            .map(|(&epoch, _)| epoch)
            .collect();
        for epoch in &expired {
            self.entries.remove(epoch);
        }
        if !expired.is_empty() {
            debug!(?expired, "expired cipher states retired");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installed epochs in ascending order.
    pub fn epochs(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }
}

impl CipherStateLookup for EpochCipherStates {
    fn cipher_state(&mut self, epoch: u16) -> Option<&mut ConnectionCipherState> {
        self.get_mut(epoch)
    }
}
