//! Stream ciphers backed by the RustCrypto `rc4` crate.

use cipher::consts::U16;
use cipher::KeyInit;

use crate::provider::StreamCipher;
use tlsrec_types::CryptoError;

/// Stream cipher algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamCipherAlg {
    Rc4_128,
}

impl StreamCipherAlg {
    pub fn key_size(self) -> usize {
        match self {
            StreamCipherAlg::Rc4_128 => 16,
        }
    }
}

/// RC4 with a 128-bit key.
pub struct Rc4Stream {
    inner: rc4::Rc4<U16>,
}

impl Rc4Stream {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = rc4::Rc4::<U16>::new_from_slice(key).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: 16,
                got: key.len(),
            }
        })?;
        Ok(Self { inner })
    }
}

impl StreamCipher for Rc4Stream {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        cipher::StreamCipher::apply_keystream(&mut self.inner, data);
    }
}

/// Instantiate a keyed stream cipher.
pub fn create_stream_cipher(
    alg: StreamCipherAlg,
    key: &[u8],
) -> Result<Box<dyn StreamCipher>, CryptoError> {
    match alg {
        StreamCipherAlg::Rc4_128 => Ok(Box::new(Rc4Stream::new(key)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc4_keystream_continues_across_calls() {
        let key = [0x11u8; 16];
        let mut whole = create_stream_cipher(StreamCipherAlg::Rc4_128, &key).unwrap();
        let mut split = create_stream_cipher(StreamCipherAlg::Rc4_128, &key).unwrap();

        let mut a = [0u8; 32];
        whole.apply_keystream(&mut a);

        let mut b = [0u8; 32];
        split.apply_keystream(&mut b[..10]);
        split.apply_keystream(&mut b[10..]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rc4_roundtrip() {
        let key = [0x22u8; 16];
        let mut enc = create_stream_cipher(StreamCipherAlg::Rc4_128, &key).unwrap();
        let mut dec = create_stream_cipher(StreamCipherAlg::Rc4_128, &key).unwrap();
        let mut data = b"stream cipher data".to_vec();
        enc.apply_keystream(&mut data);
        assert_ne!(&data[..], b"stream cipher data");
        dec.apply_keystream(&mut data);
        assert_eq!(&data[..], b"stream cipher data");
    }

    #[test]
    fn test_rc4_rejects_short_key() {
        assert!(create_stream_cipher(StreamCipherAlg::Rc4_128, &[0u8; 5]).is_err());
    }
}
