#![forbid(unsafe_code)]
#![doc = "Symmetric cipher, MAC, AEAD and randomness capabilities for the tlsrec record layer."]

pub mod aead;
pub mod block;
pub mod ct;
pub mod mac;
pub mod modes;
pub mod provider;
pub mod rand;
pub mod stream;

pub use provider::{Aead, BlockCipher, Mac, RandomSource, StreamCipher};
