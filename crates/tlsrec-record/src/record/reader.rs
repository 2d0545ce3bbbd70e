//! Incremental record reader.
//!
//! Input may arrive in arbitrary chunks. The reader copies into
//! `read_buffer` only what the pending record needs (header first, then
//! the declared body) and never consumes bytes of the following record.
//! A partial record is reported as `NeedMore`, which is not an error.

use tlsrec_types::RecordError;
use tracing::{debug, trace};

use super::protection::unprotect;
use super::{Record, RecordType, Transport, MAX_CIPHERTEXT_LENGTH, MAX_PLAINTEXT_LENGTH};
use crate::epochs::CipherStateLookup;
use crate::seq::SequenceNumbers;
use crate::version::ProtocolVersion;

/// Result of one `read_record` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The pending record needs at least this many more bytes.
    NeedMore(usize),
    /// A complete, authenticated record.
    Ready(Record),
    /// A DTLS record that was dropped (replayed, unknown epoch or failed
    /// authentication).
    Discarded,
}

impl ReadStatus {
    /// Bytes still missing; 0 unless `NeedMore`.
    pub fn bytes_needed(&self) -> usize {
        match self {
            ReadStatus::NeedMore(n) => *n,
            _ => 0,
        }
    }
}

/// Bytes of `input` consumed and what they produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub consumed: usize,
    pub status: ReadStatus,
}

/// Top up `read_buffer` to `desired` bytes from `input`.
/// Returns the number of bytes taken.
fn fill_buffer_to(read_buffer: &mut Vec<u8>, input: &[u8], desired: usize) -> usize {
    let want = desired.saturating_sub(read_buffer.len());
    let take = want.min(input.len());
    read_buffer.extend_from_slice(&input[..take]);
    take
}

/// Feed `input` to the record being assembled in `read_buffer`.
///
/// `transport` fixes the header layout; the version bytes of a received
/// header never select it. A stream record whose version belongs to the
/// other transport is a framing error, a datagram one is discarded.
///
/// `seq` is `None` before sequence tracking starts (e.g. the very first
/// record of a connection); records are then read in epoch 0 with
/// sequence 0. `lookup` resolves the cipher state of the record's epoch.
///
/// The buffer is cleared whenever a record is returned, discarded or
/// rejected; every error is fatal to the connection.
pub fn read_record(
    read_buffer: &mut Vec<u8>,
    input: &[u8],
    transport: Transport,
    seq: Option<&mut SequenceNumbers>,
    lookup: &mut dyn CipherStateLookup,
) -> Result<ReadOutcome, RecordError> {
    let mut consumed = 0;
    let result = read_record_inner(read_buffer, input, &mut consumed, transport, seq, lookup);
    if !matches!(result, Ok(ReadStatus::NeedMore(_))) {
        read_buffer.clear();
    }
    result.map(|status| ReadOutcome { consumed, status })
}

fn read_record_inner(
    read_buffer: &mut Vec<u8>,
    input: &[u8],
    consumed: &mut usize,
    transport: Transport,
    seq: Option<&mut SequenceNumbers>,
    lookup: &mut dyn CipherStateLookup,
) -> Result<ReadStatus, RecordError> {
    if let Some(seq) = seq.as_deref() {
        if seq.is_datagram() != (transport == Transport::Datagram) {
            return Err(RecordError::framing(
                "sequence tracking does not match the transport",
            ));
        }
    }

    let header_len = transport.header_len();
    if read_buffer.len() < header_len {
        *consumed += fill_buffer_to(read_buffer, &input[*consumed..], header_len);
        if read_buffer.len() < header_len {
            return Ok(ReadStatus::NeedMore(header_len - read_buffer.len()));
        }
    }

    let record_type = RecordType::try_from(read_buffer[0])?;
    let version = ProtocolVersion::new(read_buffer[1], read_buffer[2]);
    if !version.is_known_major() {
        return Err(RecordError::framing(format!(
            "unexpected record version {version}"
        )));
    }
    let foreign_version = Transport::of_version(version) != transport;
    if foreign_version && transport == Transport::Stream {
        return Err(RecordError::framing(format!(
            "record version {version} on a stream connection"
        )));
    }
    let length = usize::from(u16::from_be_bytes([
        read_buffer[header_len - 2],
        read_buffer[header_len - 1],
    ]));
    if length > MAX_CIPHERTEXT_LENGTH {
        return Err(RecordError::RecordOverflow(length));
    }

    let total = header_len + length;
    if read_buffer.len() < total {
        *consumed += fill_buffer_to(read_buffer, &input[*consumed..], total);
        if read_buffer.len() < total {
            return Ok(ReadStatus::NeedMore(total - read_buffer.len()));
        }
    }

    let body = &read_buffer[header_len..total];
    match transport {
        Transport::Datagram if foreign_version => {
            debug!(%version, "discarding datagram record with a stream version");
            Ok(ReadStatus::Discarded)
        }
        Transport::Datagram => {
            let mut wire_seq = [0u8; 8];
            wire_seq.copy_from_slice(&read_buffer[3..11]);
            let wire_seq = u64::from_be_bytes(wire_seq);
            read_datagram(record_type, version, wire_seq, body, seq, lookup)
        }
        Transport::Stream => read_stream(record_type, version, body, seq, lookup),
    }
}

fn read_stream(
    record_type: RecordType,
    version: ProtocolVersion,
    body: &[u8],
    seq: Option<&mut SequenceNumbers>,
    lookup: &mut dyn CipherStateLookup,
) -> Result<ReadStatus, RecordError> {
    let (epoch, sequence) = match seq {
        Some(seq) => {
            let epoch = seq.current_read_epoch();
            (epoch, seq.next_read_sequence(epoch)?)
        }
        None => (0, 0),
    };

    let contents = match lookup.cipher_state(epoch) {
        Some(state) => unprotect(state, record_type, version, sequence, body)?,
        None => body.to_vec(),
    };
    if contents.len() > MAX_PLAINTEXT_LENGTH {
        return Err(RecordError::RecordOverflow(contents.len()));
    }
    trace!(?record_type, epoch, sequence, len = contents.len(), "record read");
    Ok(ReadStatus::Ready(Record::new(sequence, version, record_type, contents)))
}

fn read_datagram(
    record_type: RecordType,
    version: ProtocolVersion,
    wire_seq: u64,
    body: &[u8],
    mut seq: Option<&mut SequenceNumbers>,
    lookup: &mut dyn CipherStateLookup,
) -> Result<ReadStatus, RecordError> {
    let epoch = (wire_seq >> 48) as u16;
    let sequence = wire_seq & crate::seq::MAX_DTLS_SEQUENCE;

    if let Some(seq) = seq.as_deref() {
        if !seq.is_read_epoch_live(epoch) {
            debug!(epoch, sequence, "discarding record of unknown epoch");
            return Ok(ReadStatus::Discarded);
        }
        if seq.already_seen(epoch, sequence) {
            debug!(epoch, sequence, "discarding replayed record");
            return Ok(ReadStatus::Discarded);
        }
    }

    let contents = match lookup.cipher_state(epoch) {
        Some(state) => match unprotect(state, record_type, version, wire_seq, body) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(epoch, sequence, %err, "discarding record that failed authentication");
                return Ok(ReadStatus::Discarded);
            }
        },
        None if epoch == 0 => body.to_vec(),
        None => {
            debug!(epoch, sequence, "discarding record without cipher state");
            return Ok(ReadStatus::Discarded);
        }
    };
    if contents.len() > MAX_PLAINTEXT_LENGTH {
        debug!(epoch, sequence, len = contents.len(), "discarding oversized record");
        return Ok(ReadStatus::Discarded);
    }

    if let Some(seq) = seq.as_deref_mut() {
        seq.read_accept(epoch, sequence);
    }
    trace!(?record_type, epoch, sequence, len = contents.len(), "datagram record read");
    Ok(ReadStatus::Ready(Record::new(wire_seq, version, record_type, contents)))
}
