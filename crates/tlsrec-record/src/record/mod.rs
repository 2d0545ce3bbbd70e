//! TLS/DTLS record layer: framing, fragmentation, protection and parsing.

pub mod anti_replay;
pub(crate) mod protection;
pub mod reader;
pub mod writer;

use tlsrec_crypto::RandomSource;
use tlsrec_types::RecordError;
use tracing::debug;

use crate::config::RecordConfig;
use crate::crypt::cipher_state::ConnectionCipherState;
use crate::epochs::EpochCipherStates;
use crate::seq::SequenceNumbers;
use crate::version::ProtocolVersion;
use reader::{read_record, ReadStatus};
use writer::write_record;

/// Maximum plaintext fragment (2^14).
pub const MAX_PLAINTEXT_LENGTH: usize = 16384;
/// Maximum protected fragment (2^14 + 2048).
pub const MAX_CIPHERTEXT_LENGTH: usize = MAX_PLAINTEXT_LENGTH + 2048;
/// type(1) || version(2) || length(2)
pub const TLS_HEADER_LEN: usize = 5;
/// type(1) || version(2) || epoch(2) || sequence(6) || length(2)
pub const DTLS_HEADER_LEN: usize = 13;

/// Record framing of the underlying transport, fixed per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// TLS/SSL over a byte stream: 5-byte headers.
    Stream,
    /// DTLS over datagrams: 13-byte headers with explicit sequence numbers.
    Datagram,
}

impl Transport {
    pub fn of_version(version: ProtocolVersion) -> Self {
        if version.is_datagram() {
            Transport::Datagram
        } else {
            Transport::Stream
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            Transport::Stream => TLS_HEADER_LEN,
            Transport::Datagram => DTLS_HEADER_LEN,
        }
    }
}

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RecordType {
    /// Sentinel for "no record"; never written or parsed.
    #[default]
    NoRecord = 0,
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
    Heartbeat = 24,
}

impl TryFrom<u8> for RecordType {
    type Error = RecordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            20 => Ok(RecordType::ChangeCipherSpec),
            21 => Ok(RecordType::Alert),
            22 => Ok(RecordType::Handshake),
            23 => Ok(RecordType::ApplicationData),
            24 => Ok(RecordType::Heartbeat),
            _ => Err(RecordError::framing(format!("unknown record type {value}"))),
        }
    }
}

/// A received record with its plaintext contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    sequence: u64,
    version: ProtocolVersion,
    record_type: RecordType,
    contents: Vec<u8>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new(0, ProtocolVersion::new(0, 0), RecordType::NoRecord, Vec::new())
    }
}

impl Record {
    pub(crate) fn new(
        sequence: u64,
        version: ProtocolVersion,
        record_type: RecordType,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            sequence,
            version,
            record_type,
            contents,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.record_type != RecordType::NoRecord
    }

    /// Sequence number the record was authenticated under. DTLS values
    /// carry the epoch in the top 16 bits.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.contents
    }
}

/// Record layer state for one connection: the read buffer, sequence
/// numbers and the per-epoch cipher states of both directions.
///
/// Starts in plaintext mode. `change_write_cipher` and
/// `change_read_cipher` open a new epoch with a fresh cipher state.
pub struct RecordLayer {
    config: RecordConfig,
    version: ProtocolVersion,
    sequence: SequenceNumbers,
    write_states: EpochCipherStates,
    read_states: EpochCipherStates,
    read_buffer: Vec<u8>,
}

impl RecordLayer {
    pub fn new(config: RecordConfig, version: ProtocolVersion) -> Self {
        let sequence = if version.is_datagram() {
            SequenceNumbers::datagram(&config)
        } else {
            SequenceNumbers::stream(&config)
        };
        Self {
            write_states: EpochCipherStates::new(&config),
            read_states: EpochCipherStates::new(&config),
            sequence,
            version,
            config,
            read_buffer: Vec::new(),
        }
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Version written into outgoing record headers.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Change the outgoing record version, e.g. once the handshake has
    /// settled on one. Stream and datagram versions cannot be mixed.
    pub fn set_version(&mut self, version: ProtocolVersion) -> Result<(), RecordError> {
        if version.is_datagram() != self.sequence.is_datagram() {
            return Err(RecordError::framing(format!(
                "cannot switch record version from {} to {version}",
                self.version
            )));
        }
        self.version = version;
        Ok(())
    }

    /// Returns true if records are written under a cipher state.
    pub fn is_encrypting(&self) -> bool {
        self.write_states
            .get(self.sequence.current_write_epoch())
            .is_some()
    }

    /// Returns true if records are read under a cipher state.
    pub fn is_decrypting(&self) -> bool {
        self.read_states
            .get(self.sequence.current_read_epoch())
            .is_some()
    }

    pub fn sequence_numbers(&self) -> &SequenceNumbers {
        &self.sequence
    }

    /// Start a new write epoch protected by `state`. Returns the epoch.
    pub fn change_write_cipher(&mut self, state: ConnectionCipherState) -> Result<u16, RecordError> {
        let epoch = self.sequence.new_write_epoch()?;
        for old in self.write_states.install(epoch, state) {
            self.sequence.retire_write_epoch(old);
        }
        Ok(epoch)
    }

    /// Start a new read epoch protected by `state`. Returns the epoch.
    pub fn change_read_cipher(&mut self, state: ConnectionCipherState) -> Result<u16, RecordError> {
        let epoch = self.sequence.new_read_epoch()?;
        for old in self.read_states.install(epoch, state) {
            self.sequence.retire_read_epoch(old);
        }
        Ok(epoch)
    }

    /// Drop superseded epochs whose grace period has elapsed.
    /// Returns the number of epochs retired.
    pub fn retire_expired(&mut self) -> usize {
        let mut retired = 0;
        for epoch in self.write_states.retire_expired() {
            self.sequence.retire_write_epoch(epoch);
            retired += 1;
        }
        for epoch in self.read_states.retire_expired() {
            self.sequence.retire_read_epoch(epoch);
            retired += 1;
        }
        retired
    }

    /// Fragment `data` and write each fragment as a protected record
    /// of the current write epoch.
    pub fn seal(
        &mut self,
        record_type: RecordType,
        data: &[u8],
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<u8>, RecordError> {
        let epoch = self.sequence.current_write_epoch();
        let mut out = Vec::with_capacity(data.len() + DTLS_HEADER_LEN);
        let mut fragments = data.chunks(self.config.max_fragment_size);
        let first = fragments.next().unwrap_or(&[]);
        for fragment in std::iter::once(first).chain(fragments) {
            write_record(
                &mut out,
                record_type,
                fragment,
                self.version,
                &mut self.sequence,
                self.write_states.get_mut(epoch),
                rng,
            )?;
        }
        Ok(out)
    }

    /// Parse every complete record in `input`.
    ///
    /// A trailing partial record stays buffered for the next call.
    /// Returns the records and the number of bytes consumed.
    pub fn open(&mut self, input: &[u8]) -> Result<(Vec<Record>, usize), RecordError> {
        let mut records = Vec::new();
        let mut offset = 0;
        loop {
            let outcome = read_record(
                &mut self.read_buffer,
                &input[offset..],
                Transport::of_version(self.version),
                Some(&mut self.sequence),
                &mut self.read_states,
            )?;
            offset += outcome.consumed;
            match outcome.status {
                ReadStatus::Ready(record) => records.push(record),
                ReadStatus::Discarded => debug!("record discarded"),
                ReadStatus::NeedMore(_) => break,
            }
        }
        Ok((records, offset))
    }

    /// Bytes of a partial record held for the next `open`.
    pub fn pending_bytes(&self) -> usize {
        self.read_buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::keys::SessionKeys;
    use crate::crypt::{CipherSuite, CipherSuiteParams};
    use crate::ConnectionSide;
    use tlsrec_types::CryptoError;

    struct CountingRng(u8);

    impl RandomSource for CountingRng {
        fn fill_bytes(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
            for b in out.iter_mut() {
                *b = self.0;
                self.0 = self.0.wrapping_add(1);
            }
            Ok(())
        }
    }

    fn cipher_pair(
        version: ProtocolVersion,
        suite: CipherSuite,
    ) -> (ConnectionCipherState, ConnectionCipherState) {
        let params = CipherSuiteParams::from_suite(suite).unwrap();
        let block: Vec<u8> = (0..params.key_block_len()).map(|i| i as u8).collect();
        let keys = SessionKeys::from_key_block(&params, &block).unwrap();
        let w = ConnectionCipherState::new(version, ConnectionSide::Client, &params, &keys).unwrap();
        let r = ConnectionCipherState::new(version, ConnectionSide::Client, &params, &keys).unwrap();
        (w, r)
    }

    #[test]
    fn test_record_type_try_from() {
        assert_eq!(RecordType::try_from(22).unwrap(), RecordType::Handshake);
        assert_eq!(RecordType::try_from(24).unwrap(), RecordType::Heartbeat);
        assert!(RecordType::try_from(0).is_err());
        assert!(RecordType::try_from(25).is_err());
    }

    #[test]
    fn test_default_record_is_invalid() {
        let r = Record::default();
        assert!(!r.is_valid());
        assert_eq!(r.size(), 0);
        let r = Record::new(3, ProtocolVersion::TLS_V12, RecordType::Alert, vec![1, 0]);
        assert!(r.is_valid());
        assert_eq!(r.sequence(), 3);
        assert_eq!(r.into_contents(), vec![1, 0]);
    }

    #[test]
    fn test_plaintext_seal_open() {
        let mut rng = CountingRng(0);
        let mut client = RecordLayer::new(RecordConfig::default(), ProtocolVersion::TLS_V12);
        let mut server = RecordLayer::new(RecordConfig::default(), ProtocolVersion::TLS_V12);
        assert!(!client.is_encrypting());

        let wire = client.seal(RecordType::Handshake, b"client hello", &mut rng).unwrap();
        assert_eq!(&wire[..5], &[22, 3, 3, 0, 12]);

        let (records, consumed) = server.open(&wire).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].contents(), b"client hello");
        assert_eq!(server.pending_bytes(), 0);
    }

    #[test]
    fn test_seal_fragments_large_payload() {
        let mut rng = CountingRng(0);
        let config = RecordConfig::builder().max_fragment_size(1024).build().unwrap();
        let mut client = RecordLayer::new(config.clone(), ProtocolVersion::TLS_V12);
        let mut server = RecordLayer::new(config, ProtocolVersion::TLS_V12);
        let (w, r) = cipher_pair(ProtocolVersion::TLS_V12, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256);
        client.change_write_cipher(w).unwrap();
        server.change_read_cipher(r).unwrap();

        let data: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
        let wire = client.seal(RecordType::ApplicationData, &data, &mut rng).unwrap();
        let (records, _) = server.open(&wire).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].size(), 1024);
        assert_eq!(records[2].size(), 3000 - 2048);
        let joined: Vec<u8> = records.into_iter().flat_map(Record::into_contents).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn test_seal_empty_payload_writes_one_record() {
        let mut rng = CountingRng(0);
        let mut client = RecordLayer::new(RecordConfig::default(), ProtocolVersion::TLS_V12);
        let wire = client.seal(RecordType::ApplicationData, &[], &mut rng).unwrap();
        assert_eq!(wire, vec![23, 3, 3, 0, 0]);
    }

    #[test]
    fn test_open_keeps_partial_record() {
        let mut rng = CountingRng(0);
        let mut client = RecordLayer::new(RecordConfig::default(), ProtocolVersion::TLS_V12);
        let mut server = RecordLayer::new(RecordConfig::default(), ProtocolVersion::TLS_V12);
        let mut wire = client.seal(RecordType::Handshake, b"one", &mut rng).unwrap();
        wire.extend(client.seal(RecordType::Handshake, b"two", &mut rng).unwrap());

        let (records, _) = server.open(&wire[..10]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(server.pending_bytes(), 2);
        let (records, _) = server.open(&wire[10..]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].contents(), b"two");
    }

    #[test]
    fn test_change_cipher_opens_new_epoch() {
        let mut client = RecordLayer::new(RecordConfig::default(), ProtocolVersion::DTLS_V12);
        let (w, _) = cipher_pair(ProtocolVersion::DTLS_V12, CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256);
        assert_eq!(client.change_write_cipher(w).unwrap(), 1);
        assert!(client.is_encrypting());
        assert_eq!(client.sequence_numbers().current_write_epoch(), 1);
        assert!(client.set_version(ProtocolVersion::TLS_V12).is_err());
        assert!(client.set_version(ProtocolVersion::DTLS_V10).is_ok());
    }
}
