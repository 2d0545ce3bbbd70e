//! Trait-based capabilities for the primitives the record layer consumes.
//!
//! The record layer never sees a concrete algorithm: it drives these
//! traits through boxed trait objects owned by a cipher state.

use tlsrec_types::CryptoError;

/// A block cipher keyed at construction (e.g., AES, 3DES).
pub trait BlockCipher: Send + Sync {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypt a single block in-place.
    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt a single block in-place.
    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;
}

/// A keystream cipher whose position advances across calls (e.g., RC4).
pub trait StreamCipher: Send + Sync {
    /// XOR the next `data.len()` keystream bytes into `data`.
    fn apply_keystream(&mut self, data: &mut [u8]);
}

/// A keyed Message Authentication Code.
pub trait Mac: Send + Sync {
    /// The output size of the MAC in bytes.
    fn output_size(&self) -> usize;

    /// Input block size of the underlying hash.
    fn hash_block_size(&self) -> usize;

    /// Compression-function calls spent MACing a `msg_len`-byte message.
    fn compressions(&self, msg_len: usize) -> usize;

    /// Feed data into the MAC computation.
    fn update(&mut self, data: &[u8]);

    /// Finalize, write the MAC value to `out` and reset for the next message.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;
}

/// An Authenticated Encryption with Associated Data algorithm.
pub trait Aead: Send + Sync {
    /// The length of the authentication tag in bytes.
    fn tag_size(&self) -> usize;

    /// The expected nonce size in bytes.
    fn nonce_size(&self) -> usize;

    /// Encrypt plaintext. Returns `ciphertext || tag`.
    fn encrypt(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt `ciphertext || tag`. Returns the plaintext.
    fn decrypt(&self, nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// A cryptographically secure byte source.
pub trait RandomSource {
    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;
}
