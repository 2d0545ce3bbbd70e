//! Block ciphers backed by the RustCrypto `aes` and `des` crates.

use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit, KeySizeUser};

use crate::provider::BlockCipher;
use tlsrec_types::CryptoError;

/// Block cipher algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCipherAlg {
    Aes128,
    Aes256,
    TripleDes,
}

impl BlockCipherAlg {
    pub fn key_size(self) -> usize {
        match self {
            BlockCipherAlg::Aes128 => 16,
            BlockCipherAlg::Aes256 => 32,
            BlockCipherAlg::TripleDes => 24,
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            BlockCipherAlg::Aes128 | BlockCipherAlg::Aes256 => 16,
            BlockCipherAlg::TripleDes => 8,
        }
    }
}

/// Adapter from a RustCrypto block cipher to [`BlockCipher`].
pub struct RustCryptoBlock<C> {
    inner: C,
}

impl<C> RustCryptoBlock<C>
where
    C: KeyInit + KeySizeUser,
{
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let inner = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: C::key_size(),
            got: key.len(),
        })?;
        Ok(Self { inner })
    }
}

impl<C> RustCryptoBlock<C>
where
    C: BlockSizeUser,
{
    fn check_block(block: &[u8]) -> Result<(), CryptoError> {
        if block.len() != C::block_size() {
            return Err(CryptoError::NotBlockAligned(block.len()));
        }
        Ok(())
    }
}

impl<C> BlockCipher for RustCryptoBlock<C>
where
    C: BlockEncrypt + BlockDecrypt + Send + Sync,
{
    fn block_size(&self) -> usize {
        C::block_size()
    }

    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Self::check_block(block)?;
        self.inner.encrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }

    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Self::check_block(block)?;
        self.inner.decrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }
}

/// Instantiate a keyed block cipher.
pub fn create_block_cipher(
    alg: BlockCipherAlg,
    key: &[u8],
) -> Result<Box<dyn BlockCipher>, CryptoError> {
    Ok(match alg {
        BlockCipherAlg::Aes128 => Box::new(RustCryptoBlock::<aes::Aes128>::new(key)?),
        BlockCipherAlg::Aes256 => Box::new(RustCryptoBlock::<aes::Aes256>::new(key)?),
        BlockCipherAlg::TripleDes => Box::new(RustCryptoBlock::<des::TdesEde3>::new(key)?),
    })
}
