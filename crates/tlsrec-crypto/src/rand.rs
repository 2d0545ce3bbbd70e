//! Operating-system random source.

use crate::provider::RandomSource;
use tlsrec_types::CryptoError;

/// Random source backed by the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRng;

impl RandomSource for OsRng {
    fn fill_bytes(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        getrandom::getrandom(out).map_err(|_| CryptoError::RandFail)
    }
}
