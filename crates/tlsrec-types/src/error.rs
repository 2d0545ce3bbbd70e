/// Errors raised by symmetric primitives and the random source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid iv length: expected {expected}, got {got}")]
    InvalidIvLength { expected: usize, got: usize },
    #[error("input length {0} is not a multiple of the block size")]
    NotBlockAligned(usize),
    #[error("aead: tag verification failed")]
    AeadTagVerifyFail,
    #[error("aead: encryption failed")]
    AeadEncryptFail,
    #[error("buffer length not enough: need {need}, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("algorithm not supported: {0}")]
    NotSupported(&'static str),
    #[error("random source failed")]
    RandFail,
}

/// Record layer errors.
///
/// Every variant is fatal for the connection. Running out of buffered
/// input is reported through the reader's status, never as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Length or structural violation detected before any cryptographic step.
    #[error("record framing error: {0}")]
    Framing(String),
    /// The declared or decrypted length exceeds the protocol maximum.
    #[error("record overflow: {0} bytes")]
    RecordOverflow(usize),
    /// MAC mismatch or any padding inconsistency.
    #[error("bad record MAC")]
    BadRecordMac,
    /// Primitive-level failure.
    #[error("cipher error: {0}")]
    Cipher(#[from] CryptoError),
    /// The 64-bit (48-bit for DTLS) sequence space of an epoch is exhausted.
    #[error("sequence number overflow")]
    SequenceOverflow,
}

impl RecordError {
    pub fn framing(msg: impl Into<String>) -> Self {
        RecordError::Framing(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_converts_to_cipher_error() {
        let err: RecordError = CryptoError::RandFail.into();
        assert_eq!(err, RecordError::Cipher(CryptoError::RandFail));
        assert_eq!(err.to_string(), "cipher error: random source failed");
    }

    #[test]
    fn test_bad_record_mac_message_is_uniform() {
        assert_eq!(RecordError::BadRecordMac.to_string(), "bad record MAC");
        assert_eq!(
            RecordError::framing("empty").to_string(),
            "record framing error: empty"
        );
    }
}
