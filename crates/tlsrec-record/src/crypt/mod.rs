//! Cipher suite parameters, session keys and per-direction cipher state.

pub mod cipher_state;
pub mod keys;

use tlsrec_crypto::aead::AeadAlg;
use tlsrec_crypto::block::BlockCipherAlg;
use tlsrec_crypto::mac::MacAlg;
use tlsrec_crypto::stream::StreamCipherAlg;
use tlsrec_types::{CryptoError, RecordError};

/// TLS cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    pub const TLS_RSA_WITH_RC4_128_MD5: Self = Self(0x0004);
    pub const TLS_RSA_WITH_RC4_128_SHA: Self = Self(0x0005);
    pub const TLS_RSA_WITH_3DES_EDE_CBC_SHA: Self = Self(0x000A);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA: Self = Self(0x002F);
    pub const TLS_RSA_WITH_AES_256_CBC_SHA: Self = Self(0x0035);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA256: Self = Self(0x003C);
    pub const TLS_RSA_WITH_AES_256_CBC_SHA256: Self = Self(0x003D);
    pub const TLS_RSA_WITH_AES_128_GCM_SHA256: Self = Self(0x009C);
    pub const TLS_RSA_WITH_AES_256_GCM_SHA384: Self = Self(0x009D);
    pub const TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA: Self = Self(0xC013);
    pub const TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384: Self = Self(0xC028);
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: Self = Self(0xC02F);
    pub const TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384: Self = Self(0xC030);
    pub const TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256: Self = Self(0xCCA8);
}

/// Bulk encryption algorithm of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkCipher {
    Rc4_128,
    TripleDesCbc,
    Aes128Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// How a bulk cipher is driven by the record layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    Block(BlockCipherAlg),
    Stream(StreamCipherAlg),
    Aead(AeadAlg),
}

impl BulkCipher {
    pub fn kind(self) -> BulkKind {
        match self {
            BulkCipher::Rc4_128 => BulkKind::Stream(StreamCipherAlg::Rc4_128),
            BulkCipher::TripleDesCbc => BulkKind::Block(BlockCipherAlg::TripleDes),
            BulkCipher::Aes128Cbc => BulkKind::Block(BlockCipherAlg::Aes128),
            BulkCipher::Aes256Cbc => BulkKind::Block(BlockCipherAlg::Aes256),
            BulkCipher::Aes128Gcm => BulkKind::Aead(AeadAlg::Aes128Gcm),
            BulkCipher::Aes256Gcm => BulkKind::Aead(AeadAlg::Aes256Gcm),
            BulkCipher::ChaCha20Poly1305 => BulkKind::Aead(AeadAlg::ChaCha20Poly1305),
        }
    }

    pub fn key_len(self) -> usize {
        match self.kind() {
            BulkKind::Block(alg) => alg.key_size(),
            BulkKind::Stream(alg) => alg.key_size(),
            BulkKind::Aead(alg) => alg.key_size(),
        }
    }

    /// IV bytes taken from the key block: the CBC IV, or the AEAD fixed IV.
    pub fn fixed_iv_len(self) -> usize {
        match self {
            BulkCipher::Rc4_128 => 0,
            BulkCipher::TripleDesCbc => 8,
            BulkCipher::Aes128Cbc | BulkCipher::Aes256Cbc => 16,
            BulkCipher::Aes128Gcm | BulkCipher::Aes256Gcm => 4,
            BulkCipher::ChaCha20Poly1305 => 12,
        }
    }
}

/// Record MAC hash of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    /// Authentication is provided by the AEAD tag.
    Aead,
}

impl MacAlgorithm {
    pub fn mac_len(self) -> usize {
        match self {
            MacAlgorithm::Md5 => 16,
            MacAlgorithm::Sha1 => 20,
            MacAlgorithm::Sha256 => 32,
            MacAlgorithm::Sha384 => 48,
            MacAlgorithm::Aead => 0,
        }
    }

    /// The keyed MAC used for records; SSLv3 has its own construction
    /// and only defines it over MD5 and SHA-1.
    pub fn record_mac(self, ssl3: bool) -> Result<MacAlg, CryptoError> {
        match (self, ssl3) {
            (MacAlgorithm::Md5, false) => Ok(MacAlg::HmacMd5),
            (MacAlgorithm::Sha1, false) => Ok(MacAlg::HmacSha1),
            (MacAlgorithm::Sha256, false) => Ok(MacAlg::HmacSha256),
            (MacAlgorithm::Sha384, false) => Ok(MacAlg::HmacSha384),
            (MacAlgorithm::Md5, true) => Ok(MacAlg::Ssl3Md5),
            (MacAlgorithm::Sha1, true) => Ok(MacAlg::Ssl3Sha1),
            (MacAlgorithm::Sha256 | MacAlgorithm::Sha384, true) => {
                Err(CryptoError::NotSupported("SHA-2 record MAC with SSLv3"))
            }
            (MacAlgorithm::Aead, _) => Err(CryptoError::NotSupported("AEAD suite has no MAC")),
        }
    }
}

/// Record-protection parameters of a cipher suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSuiteParams {
    /// The cipher suite identifier.
    pub suite: CipherSuite,
    pub bulk: BulkCipher,
    pub mac: MacAlgorithm,
}

impl CipherSuiteParams {
    /// Look up record-protection parameters for a cipher suite.
    pub fn from_suite(suite: CipherSuite) -> Result<Self, RecordError> {
        let (bulk, mac) = match suite {
            CipherSuite::TLS_RSA_WITH_RC4_128_MD5 => (BulkCipher::Rc4_128, MacAlgorithm::Md5),
            CipherSuite::TLS_RSA_WITH_RC4_128_SHA => (BulkCipher::Rc4_128, MacAlgorithm::Sha1),
            CipherSuite::TLS_RSA_WITH_3DES_EDE_CBC_SHA => {
                (BulkCipher::TripleDesCbc, MacAlgorithm::Sha1)
            }
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => {
                (BulkCipher::Aes128Cbc, MacAlgorithm::Sha1)
            }
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA => (BulkCipher::Aes256Cbc, MacAlgorithm::Sha1),
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA256 => {
                (BulkCipher::Aes128Cbc, MacAlgorithm::Sha256)
            }
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA256 => {
                (BulkCipher::Aes256Cbc, MacAlgorithm::Sha256)
            }
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384 => {
                (BulkCipher::Aes256Cbc, MacAlgorithm::Sha384)
            }
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => {
                (BulkCipher::Aes128Gcm, MacAlgorithm::Aead)
            }
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384
            | CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => {
                (BulkCipher::Aes256Gcm, MacAlgorithm::Aead)
            }
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => {
                (BulkCipher::ChaCha20Poly1305, MacAlgorithm::Aead)
            }
            _ => {
                return Err(RecordError::Cipher(CryptoError::NotSupported(
                    "unknown cipher suite",
                )))
            }
        };
        Ok(Self { suite, bulk, mac })
    }

    pub fn key_len(&self) -> usize {
        self.bulk.key_len()
    }

    pub fn mac_key_len(&self) -> usize {
        self.mac.mac_len()
    }

    pub fn fixed_iv_len(&self) -> usize {
        self.bulk.fixed_iv_len()
    }

    pub fn is_aead(&self) -> bool {
        matches!(self.bulk.kind(), BulkKind::Aead(_))
    }

    /// Total key block length: two MAC keys, two cipher keys, two IVs.
    pub fn key_block_len(&self) -> usize {
        2 * (self.mac_key_len() + self.key_len() + self.fixed_iv_len())
    }
}
