//! Record layer configuration with builder pattern.

use std::time::Duration;

use crate::record::MAX_PLAINTEXT_LENGTH;
use tlsrec_types::RecordError;

/// Smallest fragment size a peer may negotiate (RFC 6066 §4).
pub const MIN_FRAGMENT_SIZE: usize = 512;

/// Record layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    /// Largest plaintext fragment written per record (default: 16384).
    pub max_fragment_size: usize,
    /// Superseded epochs kept per direction for draining in-flight records.
    pub max_retained_epochs: usize,
    /// How long a superseded read epoch stays usable.
    pub epoch_grace_period: Duration,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            max_fragment_size: MAX_PLAINTEXT_LENGTH,
            max_retained_epochs: 1,
            epoch_grace_period: Duration::from_secs(60),
        }
    }
}

impl RecordConfig {
    /// Create a new builder.
    pub fn builder() -> RecordConfigBuilder {
        RecordConfigBuilder::default()
    }
}

/// Builder for `RecordConfig`.
#[derive(Debug, Default)]
pub struct RecordConfigBuilder {
    config: RecordConfig,
}

impl RecordConfigBuilder {
    pub fn max_fragment_size(mut self, size: usize) -> Self {
        self.config.max_fragment_size = size;
        self
    }

    pub fn max_retained_epochs(mut self, count: usize) -> Self {
        self.config.max_retained_epochs = count;
        self
    }

    pub fn epoch_grace_period(mut self, period: Duration) -> Self {
        self.config.epoch_grace_period = period;
        self
    }

    pub fn build(self) -> Result<RecordConfig, RecordError> {
        let size = self.config.max_fragment_size;
        if !(MIN_FRAGMENT_SIZE..=MAX_PLAINTEXT_LENGTH).contains(&size) {
            return Err(RecordError::framing(format!(
                "max fragment size {size} outside {MIN_FRAGMENT_SIZE}..={MAX_PLAINTEXT_LENGTH}"
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RecordConfig::builder().build().unwrap();
        assert_eq!(config, RecordConfig::default());
        assert_eq!(config.max_fragment_size, 16384);
        assert_eq!(config.max_retained_epochs, 1);
    }

    #[test]
    fn test_builder_overrides() {
        let config = RecordConfig::builder()
            .max_fragment_size(1024)
            .max_retained_epochs(3)
            .epoch_grace_period(Duration::from_millis(10))
            .build()
            .unwrap();
        assert_eq!(config.max_fragment_size, 1024);
        assert_eq!(config.max_retained_epochs, 3);
        assert_eq!(config.epoch_grace_period, Duration::from_millis(10));
    }

    #[test]
    fn test_builder_rejects_bad_fragment_size() {
        assert!(RecordConfig::builder().max_fragment_size(100).build().is_err());
        assert!(RecordConfig::builder()
            .max_fragment_size(16385)
            .build()
            .is_err());
    }
}
