//! AEAD ciphers backed by the RustCrypto `aes-gcm` and `chacha20poly1305` crates.

use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{Aead as RustCryptoAeadTrait, AeadCore, KeyInit, Nonce, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;

use crate::provider::Aead;
use tlsrec_types::CryptoError;

/// AEAD algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlg {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl AeadAlg {
    pub fn key_size(self) -> usize {
        match self {
            AeadAlg::Aes128Gcm => 16,
            AeadAlg::Aes256Gcm | AeadAlg::ChaCha20Poly1305 => 32,
        }
    }
}

/// Adapter from a RustCrypto AEAD to [`Aead`].
pub struct RustCryptoAead<A> {
    inner: A,
}

impl<A> RustCryptoAead<A>
where
    A: KeyInit,
{
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = A::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: A::key_size(),
            got: key.len(),
        })?;
        Ok(Self { inner })
    }
}

impl<A> RustCryptoAead<A>
where
    A: AeadCore,
{
    fn nonce(nonce: &[u8]) -> Result<&Nonce<A>, CryptoError> {
        if nonce.len() != A::NonceSize::USIZE {
            return Err(CryptoError::InvalidIvLength {
                expected: A::NonceSize::USIZE,
                got: nonce.len(),
            });
        }
        Ok(Nonce::<A>::from_slice(nonce))
    }
}

impl<A> Aead for RustCryptoAead<A>
where
    A: RustCryptoAeadTrait + Send + Sync,
{
    fn tag_size(&self) -> usize {
        A::TagSize::USIZE
    }

    fn nonce_size(&self) -> usize {
        A::NonceSize::USIZE
    }

    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Self::nonce(nonce)?;
        self.inner
            .encrypt(nonce, Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::AeadEncryptFail)
    }

    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Self::nonce(nonce)?;
        self.inner
            .decrypt(nonce, Payload { msg: ciphertext, aad })
            .map_err(|_| CryptoError::AeadTagVerifyFail)
    }
}

/// Instantiate a keyed AEAD.
pub fn create_aead(alg: AeadAlg, key: &[u8]) -> Result<Box<dyn Aead>, CryptoError> {
    Ok(match alg {
        AeadAlg::Aes128Gcm => Box::new(RustCryptoAead::<Aes128Gcm>::new(key)?),
        AeadAlg::Aes256Gcm => Box::new(RustCryptoAead::<Aes256Gcm>::new(key)?),
        AeadAlg::ChaCha20Poly1305 => Box::new(RustCryptoAead::<ChaCha20Poly1305>::new(key)?),
    })
}
