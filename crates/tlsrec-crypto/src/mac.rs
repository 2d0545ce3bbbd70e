//! Record MACs: HMAC (TLS 1.0+) and the SSLv3 keyed hash (RFC 6101 §5.2.3.1).

use digest::{Digest, FixedOutputReset, KeyInit};
use hmac::Hmac;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};
use zeroize::Zeroizing;

use crate::provider::Mac;
use tlsrec_types::CryptoError;

/// MAC algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlg {
    HmacMd5,
    HmacSha1,
    HmacSha256,
    HmacSha384,
    Ssl3Md5,
    Ssl3Sha1,
}

impl MacAlg {
    /// MAC output (and key) length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            MacAlg::HmacMd5 | MacAlg::Ssl3Md5 => 16,
            MacAlg::HmacSha1 | MacAlg::Ssl3Sha1 => 20,
            MacAlg::HmacSha256 => 32,
            MacAlg::HmacSha384 => 48,
        }
    }

    /// Block layout of the underlying Merkle-Damgard hash.
    pub fn geometry(self) -> HashGeometry {
        match self {
            MacAlg::HmacSha384 => HashGeometry::WIDE,
            _ => HashGeometry::NARROW,
        }
    }
}

/// Input block size and trailing length-field size of a Merkle-Damgard
/// hash, enough to count its compression-function calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashGeometry {
    pub block_size: usize,
    pub length_field: usize,
}

impl HashGeometry {
    /// MD5, SHA-1, SHA-256.
    pub const NARROW: Self = Self {
        block_size: 64,
        length_field: 8,
    };
    /// SHA-384, SHA-512.
    pub const WIDE: Self = Self {
        block_size: 128,
        length_field: 16,
    };

    /// Compression calls to hash `absorbed` bytes, final padding included.
    pub fn compressions(self, absorbed: usize) -> usize {
        (absorbed + 1 + self.length_field).div_ceil(self.block_size)
    }
}

/// Adapter from a RustCrypto `hmac` instance to [`Mac`].
pub struct HmacMac<M> {
    inner: M,
    geometry: HashGeometry,
}

impl<M> HmacMac<M>
where
    M: digest::Mac + KeyInit,
{
    pub fn new(key: &[u8], geometry: HashGeometry) -> Result<Self, CryptoError> {
        let inner = <M as digest::Mac>::new_from_slice(key).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: <M as digest::OutputSizeUser>::output_size(),
                got: key.len(),
            }
        })?;
        Ok(Self { inner, geometry })
    }
}

impl<M> Mac for HmacMac<M>
where
    M: digest::Mac + FixedOutputReset + Send + Sync,
{
    fn output_size(&self) -> usize {
        <M as digest::OutputSizeUser>::output_size()
    }

    fn hash_block_size(&self) -> usize {
        self.geometry.block_size
    }

    fn compressions(&self, msg_len: usize) -> usize {
        // inner hash: one block of padded key, then the message
        self.geometry.compressions(self.geometry.block_size + msg_len)
    }

    fn update(&mut self, data: &[u8]) {
        digest::Mac::update(&mut self.inner, data);
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let size = self.output_size();
        if out.len() < size {
            return Err(CryptoError::BufferTooSmall {
                need: size,
                got: out.len(),
            });
        }
        let tag = digest::Mac::finalize_reset(&mut self.inner).into_bytes();
        out[..size].copy_from_slice(&tag);
        Ok(())
    }
}

/// SSLv3 MAC:
///
/// ```text
/// hash(secret || pad_2 || hash(secret || pad_1 || data))
/// ```
///
/// with `pad_1 = 0x36` and `pad_2 = 0x5c` repeated 48 times for MD5 and
/// 40 times for SHA-1.
pub struct Ssl3Mac<D> {
    secret: Zeroizing<Vec<u8>>,
    pad_len: usize,
    inner: D,
}

impl<D> Ssl3Mac<D>
where
    D: Digest,
{
    pub fn new(secret: &[u8], pad_len: usize) -> Self {
        let mut mac = Self {
            secret: Zeroizing::new(secret.to_vec()),
            pad_len,
            inner: D::new(),
        };
        mac.start_inner();
        mac
    }

    fn start_inner(&mut self) {
        Digest::update(&mut self.inner, self.secret.as_slice());
        Digest::update(&mut self.inner, vec![0x36u8; self.pad_len]);
    }
}

impl<D> Mac for Ssl3Mac<D>
where
    D: Digest + FixedOutputReset + Send + Sync,
{
    fn output_size(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn hash_block_size(&self) -> usize {
        HashGeometry::NARROW.block_size
    }

    fn compressions(&self, msg_len: usize) -> usize {
        HashGeometry::NARROW.compressions(self.secret.len() + self.pad_len + msg_len)
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let size = self.output_size();
        if out.len() < size {
            return Err(CryptoError::BufferTooSmall {
                need: size,
                got: out.len(),
            });
        }
        let inner_hash = Digest::finalize_reset(&mut self.inner);

        let mut outer = D::new();
        Digest::update(&mut outer, self.secret.as_slice());
        Digest::update(&mut outer, vec![0x5cu8; self.pad_len]);
        Digest::update(&mut outer, &inner_hash);
        out[..size].copy_from_slice(&Digest::finalize(outer));

        self.start_inner();
        Ok(())
    }
}

/// Instantiate a keyed MAC.
pub fn create_mac(alg: MacAlg, key: &[u8]) -> Result<Box<dyn Mac>, CryptoError> {
    let geometry = alg.geometry();
    Ok(match alg {
        MacAlg::HmacMd5 => Box::new(HmacMac::<Hmac<Md5>>::new(key, geometry)?),
        MacAlg::HmacSha1 => Box::new(HmacMac::<Hmac<Sha1>>::new(key, geometry)?),
        MacAlg::HmacSha256 => Box::new(HmacMac::<Hmac<Sha256>>::new(key, geometry)?),
        MacAlg::HmacSha384 => Box::new(HmacMac::<Hmac<Sha384>>::new(key, geometry)?),
        MacAlg::Ssl3Md5 => Box::new(Ssl3Mac::<Md5>::new(key, 48)),
        MacAlg::Ssl3Sha1 => Box::new(Ssl3Mac::<Sha1>::new(key, 40)),
    })
}
