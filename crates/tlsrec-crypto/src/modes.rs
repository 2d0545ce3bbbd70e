//! CBC chaining over any [`BlockCipher`], without padding.
//!
//! Padding is a record-format concern and is applied by the caller.

use crate::provider::BlockCipher;
use tlsrec_types::CryptoError;

fn check_lengths(cipher: &dyn BlockCipher, iv: &[u8], data: &[u8]) -> Result<usize, CryptoError> {
    let bs = cipher.block_size();
    if iv.len() != bs {
        return Err(CryptoError::InvalidIvLength {
            expected: bs,
            got: iv.len(),
        });
    }
    if data.len() % bs != 0 {
        return Err(CryptoError::NotBlockAligned(data.len()));
    }
    Ok(bs)
}

/// CBC encrypt in-place. `data` must be block-aligned.
///
/// The final ciphertext block, which chains into the next record for
/// implicit-IV protocol versions, is left at the end of `data`.
pub fn cbc_encrypt(cipher: &dyn BlockCipher, iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    let bs = check_lengths(cipher, iv, data)?;
    let mut prev = iv.to_vec();

    for chunk in data.chunks_mut(bs) {
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(chunk)?;
        prev.copy_from_slice(chunk);
    }
    Ok(())
}

/// CBC decrypt in-place (no padding removal).
pub fn cbc_decrypt(cipher: &dyn BlockCipher, iv: &[u8], data: &mut [u8]) -> Result<(), CryptoError> {
    let bs = check_lengths(cipher, iv, data)?;
    let mut prev = iv.to_vec();
    let mut saved = vec![0u8; bs];

    for chunk in data.chunks_mut(bs) {
        saved.copy_from_slice(chunk);
        cipher.decrypt_block(chunk)?;
        for (b, p) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        std::mem::swap(&mut prev, &mut saved);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{create_block_cipher, BlockCipherAlg};

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_cbc_aes128_sp800_38a_vector() {
        // NIST SP 800-38A F.2.1, first two blocks
        let key = hex("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex("000102030405060708090a0b0c0d0e0f");
        let cipher = create_block_cipher(BlockCipherAlg::Aes128, &key).unwrap();

        let mut data = hex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
        cbc_encrypt(cipher.as_ref(), &iv, &mut data).unwrap();
        assert_eq!(
            data,
            hex("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2")
        );

        cbc_decrypt(cipher.as_ref(), &iv, &mut data).unwrap();
        assert_eq!(
            data,
            hex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51")
        );
    }

    #[test]
    fn test_cbc_chaining_across_calls_matches_single_call() {
        let cipher = create_block_cipher(BlockCipherAlg::Aes128, &[0x42u8; 16]).unwrap();
        let iv = [0u8; 16];

        let mut whole = vec![0x5au8; 64];
        cbc_encrypt(cipher.as_ref(), &iv, &mut whole).unwrap();

        let mut first = vec![0x5au8; 32];
        let mut second = vec![0x5au8; 32];
        cbc_encrypt(cipher.as_ref(), &iv, &mut first).unwrap();
        let residual = first[16..].to_vec();
        cbc_encrypt(cipher.as_ref(), &residual, &mut second).unwrap();

        assert_eq!(&whole[..32], &first[..]);
        assert_eq!(&whole[32..], &second[..]);
    }

    #[test]
    fn test_cbc_rejects_unaligned() {
        let cipher = create_block_cipher(BlockCipherAlg::TripleDes, &[0x42u8; 24]).unwrap();
        let mut data = vec![0u8; 12];
        assert_eq!(
            cbc_encrypt(cipher.as_ref(), &[0u8; 8], &mut data),
            Err(CryptoError::NotBlockAligned(12))
        );
        assert!(cbc_decrypt(cipher.as_ref(), &[0u8; 16], &mut [0u8; 16]).is_err());
    }
}
