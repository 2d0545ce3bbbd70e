//! Record-layer protocol versions.

use std::cmp::Ordering;
use std::fmt;

/// A `(major, minor)` protocol version as carried in the record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    major: u8,
    minor: u8,
}

impl ProtocolVersion {
    pub const SSL_V3: Self = Self::new(3, 0);
    pub const TLS_V10: Self = Self::new(3, 1);
    pub const TLS_V11: Self = Self::new(3, 2);
    pub const TLS_V12: Self = Self::new(3, 3);
    pub const DTLS_V10: Self = Self::new(254, 255);
    pub const DTLS_V12: Self = Self::new(254, 253);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn major(self) -> u8 {
        self.major
    }

    pub fn minor(self) -> u8 {
        self.minor
    }

    /// True for DTLS wire versions.
    pub fn is_datagram(self) -> bool {
        self.major == 254
    }

    pub fn is_ssl3(self) -> bool {
        self == Self::SSL_V3
    }

    /// Whether the record framing of this version is understood here.
    pub fn is_known_major(self) -> bool {
        self.major == 3 || self.is_datagram()
    }

    /// TLS 1.1+ and every DTLS version send a fresh IV with each CBC record.
    pub fn supports_explicit_cbc_ivs(self) -> bool {
        self.is_datagram() || (self.major == 3 && self.minor >= 2)
    }

    /// AEAD cipher suites are defined from TLS 1.2 / DTLS 1.2 on.
    pub fn supports_aead_modes(self) -> bool {
        self == Self::TLS_V12 || self == Self::DTLS_V12
    }

    pub fn to_u16(self) -> u16 {
        u16::from_be_bytes([self.major, self.minor])
    }
}

impl From<u16> for ProtocolVersion {
    fn from(v: u16) -> Self {
        let [major, minor] = v.to_be_bytes();
        Self::new(major, minor)
    }
}

impl From<ProtocolVersion> for u16 {
    fn from(v: ProtocolVersion) -> Self {
        v.to_u16()
    }
}

/// Stream versions order numerically; DTLS minor numbers count down, so
/// their order is inverted. Stream and datagram versions are unordered.
impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_datagram(), other.is_datagram()) {
            (false, false) => Some(self.to_u16().cmp(&other.to_u16())),
            (true, true) => Some(other.minor.cmp(&self.minor)),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::SSL_V3 => write!(f, "SSL v3"),
            Self::TLS_V10 => write!(f, "TLS v1.0"),
            Self::TLS_V11 => write!(f, "TLS v1.1"),
            Self::TLS_V12 => write!(f, "TLS v1.2"),
            Self::DTLS_V10 => write!(f, "DTLS v1.0"),
            Self::DTLS_V12 => write!(f, "DTLS v1.2"),
            v => write!(f, "unknown version {}.{}", v.major, v.minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ordering() {
        assert!(ProtocolVersion::SSL_V3 < ProtocolVersion::TLS_V10);
        assert!(ProtocolVersion::TLS_V11 < ProtocolVersion::TLS_V12);
        assert!(ProtocolVersion::TLS_V12 >= ProtocolVersion::TLS_V12);
    }

    #[test]
    fn test_datagram_ordering_is_inverted() {
        assert!(ProtocolVersion::DTLS_V12 > ProtocolVersion::DTLS_V10);
        assert_eq!(
            ProtocolVersion::DTLS_V12.partial_cmp(&ProtocolVersion::TLS_V12),
            None
        );
    }

    #[test]
    fn test_explicit_iv_support() {
        assert!(!ProtocolVersion::SSL_V3.supports_explicit_cbc_ivs());
        assert!(!ProtocolVersion::TLS_V10.supports_explicit_cbc_ivs());
        assert!(ProtocolVersion::TLS_V11.supports_explicit_cbc_ivs());
        assert!(ProtocolVersion::DTLS_V10.supports_explicit_cbc_ivs());
    }

    #[test]
    fn test_u16_conversion_and_display() {
        assert_eq!(ProtocolVersion::from(0x0303), ProtocolVersion::TLS_V12);
        assert_eq!(u16::from(ProtocolVersion::DTLS_V12), 0xFEFD);
        assert_eq!(ProtocolVersion::TLS_V11.to_string(), "TLS v1.1");
        assert_eq!(ProtocolVersion::new(3, 9).to_string(), "unknown version 3.9");
    }
}
