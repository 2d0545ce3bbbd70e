#![forbid(unsafe_code)]
#![doc = "TLS and DTLS record layer: cipher state, sequence numbers, record protection and parsing."]

pub mod alert;
pub mod config;
pub mod crypt;
pub mod epochs;
pub mod record;
pub mod seq;
pub mod version;

pub use config::RecordConfig;
pub use crypt::cipher_state::ConnectionCipherState;
pub use crypt::keys::SessionKeys;
pub use crypt::{CipherSuite, CipherSuiteParams};
pub use epochs::{CipherStateLookup, EpochCipherStates, NoCipherState};
pub use record::reader::{read_record, ReadOutcome, ReadStatus};
pub use record::writer::write_record;
pub use record::{Record, RecordLayer, RecordType, Transport};
pub use seq::SequenceNumbers;
pub use tlsrec_types::{CryptoError, RecordError};
pub use version::ProtocolVersion;

/// Which endpoint's traffic a cipher state protects.
///
/// A client's write state and a server's read state are both built
/// with `Client`: they consume the client half of the key block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionSide {
    Client,
    Server,
}

impl ConnectionSide {
    /// The other endpoint.
    pub fn peer(self) -> Self {
        match self {
            ConnectionSide::Client => ConnectionSide::Server,
            ConnectionSide::Server => ConnectionSide::Client,
        }
    }
}
