#![forbid(unsafe_code)]
#![doc = "Common error types for the tlsrec record layer."]

pub mod error;

pub use error::*;
