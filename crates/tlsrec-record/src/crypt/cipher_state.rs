//! Cipher state for one traffic direction and one key epoch.

use std::time::{Duration, Instant};

use tlsrec_crypto::aead::{create_aead, AeadAlg};
use tlsrec_crypto::block::create_block_cipher;
use tlsrec_crypto::mac::create_mac;
use tlsrec_crypto::stream::create_stream_cipher;
use tlsrec_crypto::{Aead, BlockCipher, Mac, StreamCipher};
use tlsrec_types::{CryptoError, RecordError};
use tracing::debug;
use zeroize::Zeroizing;

use super::keys::SessionKeys;
use super::{BulkKind, CipherSuite, CipherSuiteParams};
use crate::version::ProtocolVersion;
use crate::ConnectionSide;

/// GCM explicit nonce carried in each record (RFC 5288 §3).
pub const GCM_EXPLICIT_NONCE_LEN: usize = 8;

/// How the per-record AEAD nonce is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadNonce {
    /// `fixed_iv(4) || explicit_nonce(8)`, explicit part sent in the clear.
    ExplicitSuffix,
    /// `fixed_iv(12) XOR pad_left(seq)`, nothing sent (RFC 7905).
    XorSequence,
}

/// The symmetric cipher driving a cipher state.
pub enum CipherMode {
    Block {
        cipher: Box<dyn BlockCipher>,
        /// Last ciphertext block of the previous record (implicit-IV chaining).
        cbc_state: Zeroizing<Vec<u8>>,
    },
    Stream(Box<dyn StreamCipher>),
    Aead {
        aead: Box<dyn Aead>,
        fixed_iv: Zeroizing<Vec<u8>>,
        nonce: AeadNonce,
    },
}

/// Negotiated cipher, MAC and framing quirks for one direction of one epoch.
///
/// Only the CBC chaining state and the stream cipher position mutate after
/// construction; callers must serialize access per direction.
pub struct ConnectionCipherState {
    start_time: Instant,
    version: ProtocolVersion,
    side: ConnectionSide,
    suite: CipherSuite,
    pub(crate) mode: CipherMode,
    pub(crate) mac: Option<Box<dyn Mac>>,
    block_size: usize,
    iv_size: usize,
    mac_size: usize,
    is_ssl3: bool,
}

impl ConnectionCipherState {
    /// Initialize a new cipher state from the `side` half of `keys`.
    pub fn new(
        version: ProtocolVersion,
        side: ConnectionSide,
        params: &CipherSuiteParams,
        keys: &SessionKeys,
    ) -> Result<Self, RecordError> {
        let is_ssl3 = version.is_ssl3();
        let cipher_key = keys.cipher_key(side);
        let iv = keys.iv(side);

        let (mode, block_size, iv_size) = match params.bulk.kind() {
            BulkKind::Block(alg) => {
                let cipher = create_block_cipher(alg, cipher_key)?;
                let bs = cipher.block_size();
                let explicit = version.supports_explicit_cbc_ivs();
                let cbc_state = if iv.len() == bs {
                    iv.to_vec()
                } else if explicit {
                    vec![0u8; bs]
                } else {
                    return Err(CryptoError::InvalidIvLength {
                        expected: bs,
                        got: iv.len(),
                    }
                    .into());
                };
                let mode = CipherMode::Block {
                    cipher,
                    cbc_state: Zeroizing::new(cbc_state),
                };
                (mode, bs, if explicit { bs } else { 0 })
            }
            BulkKind::Stream(alg) => (CipherMode::Stream(create_stream_cipher(alg, cipher_key)?), 0, 0),
            BulkKind::Aead(alg) => {
                if !version.supports_aead_modes() {
                    return Err(CryptoError::NotSupported("AEAD cipher suite before TLS 1.2").into());
                }
                let (nonce, explicit_len) = match alg {
                    AeadAlg::Aes128Gcm | AeadAlg::Aes256Gcm => {
                        (AeadNonce::ExplicitSuffix, GCM_EXPLICIT_NONCE_LEN)
                    }
                    AeadAlg::ChaCha20Poly1305 => (AeadNonce::XorSequence, 0),
                };
                if iv.len() != params.fixed_iv_len() {
                    return Err(CryptoError::InvalidIvLength {
                        expected: params.fixed_iv_len(),
                        got: iv.len(),
                    }
                    .into());
                }
                let mode = CipherMode::Aead {
                    aead: create_aead(alg, cipher_key)?,
                    fixed_iv: Zeroizing::new(iv.to_vec()),
                    nonce,
                };
                (mode, 0, explicit_len)
            }
        };

        let mac = if params.is_aead() {
            None
        } else {
            Some(create_mac(params.mac.record_mac(is_ssl3)?, keys.mac_key(side))?)
        };
        let mac_size = mac.as_ref().map_or(0, |m| m.output_size());

        debug!(
            suite = format_args!("{:#06x}", params.suite.0),
            ?side,
            %version,
            block_size,
            iv_size,
            mac_size,
            "cipher state created"
        );

        Ok(Self {
            start_time: Instant::now(),
            version,
            side,
            suite: params.suite,
            mode,
            mac,
            block_size,
            iv_size,
            mac_size,
            is_ssl3,
        })
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn side(&self) -> ConnectionSide {
        self.side
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn mode(&self) -> &CipherMode {
        &self.mode
    }

    pub fn block_cipher(&self) -> Option<&dyn BlockCipher> {
        match &self.mode {
            CipherMode::Block { cipher, .. } => Some(cipher.as_ref()),
            _ => None,
        }
    }

    pub fn stream_cipher(&mut self) -> Option<&mut dyn StreamCipher> {
        match &mut self.mode {
            CipherMode::Stream(cipher) => Some(cipher.as_mut()),
            _ => None,
        }
    }

    pub fn aead(&self) -> Option<&dyn Aead> {
        match &self.mode {
            CipherMode::Aead { aead, .. } => Some(aead.as_ref()),
            _ => None,
        }
    }

    pub fn mac(&mut self) -> Option<&mut dyn Mac> {
        match &mut self.mac {
            Some(mac) => Some(mac.as_mut()),
            None => None,
        }
    }

    /// CBC residual state; empty for non-block modes.
    pub fn cbc_state(&self) -> &[u8] {
        match &self.mode {
            CipherMode::Block { cbc_state, .. } => cbc_state.as_slice(),
            _ => &[],
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Bytes of per-record IV or explicit nonce sent ahead of the ciphertext.
    pub fn iv_size(&self) -> usize {
        self.iv_size
    }

    pub fn mac_size(&self) -> usize {
        self.mac_size
    }

    /// Authentication overhead: the MAC, or the AEAD tag.
    pub fn tag_size(&self) -> usize {
        match &self.mode {
            CipherMode::Aead { aead, .. } => aead.tag_size(),
            _ => self.mac_size,
        }
    }

    pub fn is_ssl3(&self) -> bool {
        self.is_ssl3
    }

    pub fn is_aead(&self) -> bool {
        matches!(self.mode, CipherMode::Aead { .. })
    }

    pub fn mac_includes_record_version(&self) -> bool {
        !self.is_ssl3
    }

    pub fn cipher_padding_single_byte(&self) -> bool {
        self.is_ssl3
    }

    pub fn cbc_without_explicit_iv(&self) -> bool {
        self.block_size > 0 && self.iv_size == 0
    }

    /// Time since construction, for key-rotation policy.
    pub fn age(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_for(params: &CipherSuiteParams) -> SessionKeys {
        let block: Vec<u8> = (0..params.key_block_len()).map(|i| (i * 7) as u8).collect();
        SessionKeys::from_key_block(params, &block).unwrap()
    }

    fn state(version: ProtocolVersion, suite: CipherSuite) -> Result<ConnectionCipherState, RecordError> {
        let params = CipherSuiteParams::from_suite(suite).unwrap();
        let keys = keys_for(&params);
        ConnectionCipherState::new(version, ConnectionSide::Client, &params, &keys)
    }

    #[test]
    fn test_tls10_cbc_uses_implicit_iv() {
        let s = state(ProtocolVersion::TLS_V10, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap();
        assert_eq!(s.block_size(), 16);
        assert_eq!(s.iv_size(), 0);
        assert_eq!(s.mac_size(), 20);
        assert!(s.cbc_without_explicit_iv());
        assert!(s.mac_includes_record_version());
        assert_eq!(s.cbc_state().len(), 16);
        assert!(s.block_cipher().is_some());
    }

    #[test]
    fn test_tls12_cbc_uses_explicit_iv() {
        let s = state(ProtocolVersion::TLS_V12, CipherSuite::TLS_RSA_WITH_3DES_EDE_CBC_SHA).unwrap();
        assert_eq!(s.block_size(), 8);
        assert_eq!(s.iv_size(), 8);
        assert!(!s.cbc_without_explicit_iv());
    }

    #[test]
    fn test_ssl3_flags() {
        let s = state(ProtocolVersion::SSL_V3, CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA).unwrap();
        assert!(s.is_ssl3());
        assert!(!s.mac_includes_record_version());
        assert!(s.cipher_padding_single_byte());
        assert!(s.cbc_without_explicit_iv());
    }

    #[test]
    fn test_stream_state() {
        let mut s = state(ProtocolVersion::TLS_V10, CipherSuite::TLS_RSA_WITH_RC4_128_MD5).unwrap();
        assert_eq!(s.block_size(), 0);
        assert_eq!(s.iv_size(), 0);
        assert_eq!(s.mac_size(), 16);
        assert!(!s.cbc_without_explicit_iv());
        assert!(s.stream_cipher().is_some());
        assert!(s.cbc_state().is_empty());
    }

    #[test]
    fn test_aead_state_has_no_mac() {
        let mut s = state(
            ProtocolVersion::TLS_V12,
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        )
        .unwrap();
        assert!(s.is_aead());
        assert!(s.mac().is_none());
        assert_eq!(s.mac_size(), 0);
        assert_eq!(s.tag_size(), 16);
        assert_eq!(s.iv_size(), GCM_EXPLICIT_NONCE_LEN);

        let c = state(
            ProtocolVersion::TLS_V12,
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        )
        .unwrap();
        assert_eq!(c.iv_size(), 0);
    }

    #[test]
    fn test_aead_requires_tls12() {
        let err = state(ProtocolVersion::TLS_V11, CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256)
            .err()
            .unwrap();
        assert!(matches!(err, RecordError::Cipher(CryptoError::NotSupported(_))));
    }

    #[test]
    fn test_ssl3_rejects_sha256_mac() {
        assert!(state(ProtocolVersion::SSL_V3, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256).is_err());
    }

    #[test]
    fn test_sides_use_different_keys() {
        let params = CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap();
        let keys = keys_for(&params);
        let c = ConnectionCipherState::new(ProtocolVersion::TLS_V10, ConnectionSide::Client, &params, &keys)
            .unwrap();
        let s = ConnectionCipherState::new(ProtocolVersion::TLS_V10, ConnectionSide::Server, &params, &keys)
            .unwrap();
        assert_eq!(c.cbc_state(), keys.iv(ConnectionSide::Client));
        assert_eq!(s.cbc_state(), keys.iv(ConnectionSide::Server));
        assert_ne!(c.cbc_state(), s.cbc_state());
    }

    #[test]
    fn test_age_is_monotonic() {
        let s = state(ProtocolVersion::TLS_V12, CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap();
        let a = s.age();
        let b = s.age();
        assert!(b >= a);
    }
}
