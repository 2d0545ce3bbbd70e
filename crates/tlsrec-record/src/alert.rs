//! Alerts the caller raises when the record layer fails.

use tlsrec_types::RecordError;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertLevel {
    Warning = 1,
    Fatal = 2,
}

/// Alert description codes produced by record-layer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertDescription {
    BadRecordMac = 20,
    RecordOverflow = 22,
    DecodeError = 50,
    InternalError = 80,
}

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    /// Record-layer errors are always fatal.
    pub fn fatal(description: AlertDescription) -> Self {
        Self {
            level: AlertLevel::Fatal,
            description,
        }
    }

    /// Alert body as sent in an `Alert` record.
    pub fn to_bytes(self) -> [u8; 2] {
        [self.level as u8, self.description as u8]
    }
}

impl From<&RecordError> for AlertDescription {
    fn from(err: &RecordError) -> Self {
        match err {
            RecordError::Framing(_) => AlertDescription::DecodeError,
            RecordError::RecordOverflow(_) => AlertDescription::RecordOverflow,
            RecordError::BadRecordMac => AlertDescription::BadRecordMac,
            RecordError::Cipher(_) | RecordError::SequenceOverflow => {
                AlertDescription::InternalError
            }
        }
    }
}

impl From<&RecordError> for Alert {
    fn from(err: &RecordError) -> Self {
        Alert::fatal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsrec_types::CryptoError;

    #[test]
    fn test_error_to_alert_mapping() {
        assert_eq!(
            AlertDescription::from(&RecordError::BadRecordMac),
            AlertDescription::BadRecordMac
        );
        assert_eq!(
            AlertDescription::from(&RecordError::RecordOverflow(65535)),
            AlertDescription::RecordOverflow
        );
        assert_eq!(
            AlertDescription::from(&RecordError::framing("x")),
            AlertDescription::DecodeError
        );
        assert_eq!(
            AlertDescription::from(&RecordError::Cipher(CryptoError::RandFail)),
            AlertDescription::InternalError
        );
    }

    #[test]
    fn test_alert_bytes() {
        let alert = Alert::from(&RecordError::BadRecordMac);
        assert_eq!(alert.level, AlertLevel::Fatal);
        assert_eq!(alert.to_bytes(), [2, 20]);
    }
}
