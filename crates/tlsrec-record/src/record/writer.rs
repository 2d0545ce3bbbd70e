//! Record writer: serialize one record, protecting it under the current
//! write epoch's cipher state if there is one.

use std::borrow::Cow;

use tlsrec_crypto::RandomSource;
use tlsrec_types::RecordError;
use tracing::trace;

use super::protection::protect;
use super::{RecordType, MAX_CIPHERTEXT_LENGTH, MAX_PLAINTEXT_LENGTH};
use crate::crypt::cipher_state::ConnectionCipherState;
use crate::seq::{SequenceNumbers, MAX_DTLS_SEQUENCE};
use crate::version::ProtocolVersion;

/// Append one record carrying `msg` to `out`.
///
/// A sequence number is allocated from the current write epoch before
/// any protection work and is not given back if a later step fails.
pub fn write_record(
    out: &mut Vec<u8>,
    record_type: RecordType,
    msg: &[u8],
    version: ProtocolVersion,
    seq: &mut SequenceNumbers,
    cipher_state: Option<&mut ConnectionCipherState>,
    rng: &mut dyn RandomSource,
) -> Result<(), RecordError> {
    if record_type == RecordType::NoRecord {
        return Err(RecordError::framing("cannot write a record of type NoRecord"));
    }
    if msg.len() > MAX_PLAINTEXT_LENGTH {
        return Err(RecordError::framing(format!(
            "record plaintext of {} bytes exceeds {MAX_PLAINTEXT_LENGTH}",
            msg.len()
        )));
    }

    let epoch = seq.current_write_epoch();
    let sequence = seq.next_write_sequence(epoch)?;

    let body: Cow<'_, [u8]> = match cipher_state {
        Some(state) => Cow::Owned(protect(state, record_type, version, sequence, msg, rng)?),
        None => Cow::Borrowed(msg),
    };
    if body.len() > MAX_CIPHERTEXT_LENGTH {
        return Err(RecordError::framing(format!(
            "protected record of {} bytes exceeds {MAX_CIPHERTEXT_LENGTH}",
            body.len()
        )));
    }

    out.reserve(super::DTLS_HEADER_LEN + body.len());
    out.push(record_type as u8);
    out.push(version.major());
    out.push(version.minor());
    if version.is_datagram() {
        let wire_seq = (u64::from(epoch) << 48) | (sequence & MAX_DTLS_SEQUENCE);
        out.extend_from_slice(&wire_seq.to_be_bytes());
    }
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);

    trace!(?record_type, epoch, sequence, len = body.len(), "record written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordConfig;
    use tlsrec_types::CryptoError;

    struct ZeroRng;

    impl RandomSource for ZeroRng {
        fn fill_bytes(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
            out.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_plaintext_tls_header() {
        let mut seq = SequenceNumbers::stream(&RecordConfig::default());
        let mut out = Vec::new();
        write_record(
            &mut out,
            RecordType::Handshake,
            b"abc",
            ProtocolVersion::TLS_V10,
            &mut seq,
            None,
            &mut ZeroRng,
        )
        .unwrap();
        assert_eq!(out, vec![22, 3, 1, 0, 3, b'a', b'b', b'c']);
        assert_eq!(seq.write_counters().peek(0), Some(1));
    }

    #[test]
    fn test_plaintext_dtls_header() {
        let mut seq = SequenceNumbers::datagram(&RecordConfig::default());
        let mut out = Vec::new();
        for _ in 0..2 {
            write_record(
                &mut out,
                RecordType::Alert,
                &[1, 0],
                ProtocolVersion::DTLS_V12,
                &mut seq,
                None,
                &mut ZeroRng,
            )
            .unwrap();
        }
        assert_eq!(out.len(), 2 * (13 + 2));
        assert_eq!(&out[..13], &[21, 254, 253, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        // second record: epoch 0, sequence 1
        assert_eq!(&out[15..28], &[21, 254, 253, 0, 0, 0, 0, 0, 0, 0, 1, 0, 2]);
    }

    #[test]
    fn test_rejects_bad_input_before_allocating() {
        let mut seq = SequenceNumbers::stream(&RecordConfig::default());
        let mut out = Vec::new();
        let err = write_record(
            &mut out,
            RecordType::NoRecord,
            b"x",
            ProtocolVersion::TLS_V12,
            &mut seq,
            None,
            &mut ZeroRng,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::Framing(_)));

        let big = vec![0u8; MAX_PLAINTEXT_LENGTH + 1];
        let err = write_record(
            &mut out,
            RecordType::ApplicationData,
            &big,
            ProtocolVersion::TLS_V12,
            &mut seq,
            None,
            &mut ZeroRng,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::Framing(_)));
        assert!(out.is_empty());
        assert_eq!(seq.write_counters().peek(0), Some(0));
    }

    #[test]
    fn test_max_plaintext_accepted() {
        let mut seq = SequenceNumbers::stream(&RecordConfig::default());
        let mut out = Vec::new();
        let msg = vec![7u8; MAX_PLAINTEXT_LENGTH];
        write_record(
            &mut out,
            RecordType::ApplicationData,
            &msg,
            ProtocolVersion::TLS_V12,
            &mut seq,
            None,
            &mut ZeroRng,
        )
        .unwrap();
        assert_eq!(&out[3..5], &[0x40, 0x00]);
        assert_eq!(out.len(), 5 + MAX_PLAINTEXT_LENGTH);
    }
}
