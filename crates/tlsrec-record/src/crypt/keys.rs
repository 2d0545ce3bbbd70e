//! Per-direction key material handed over by the key schedule.

use super::CipherSuiteParams;
use crate::ConnectionSide;
use tlsrec_types::RecordError;
use zeroize::Zeroize;

/// MAC keys (empty for AEAD suites), cipher keys and IVs for both sides.
pub struct SessionKeys {
    client_mac_key: Vec<u8>,
    server_mac_key: Vec<u8>,
    client_cipher_key: Vec<u8>,
    server_cipher_key: Vec<u8>,
    client_iv: Vec<u8>,
    server_iv: Vec<u8>,
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.client_mac_key.zeroize();
        self.server_mac_key.zeroize();
        self.client_cipher_key.zeroize();
        self.server_cipher_key.zeroize();
        self.client_iv.zeroize();
        self.server_iv.zeroize();
    }
}

impl SessionKeys {
    pub fn new(
        client_mac_key: Vec<u8>,
        server_mac_key: Vec<u8>,
        client_cipher_key: Vec<u8>,
        server_cipher_key: Vec<u8>,
        client_iv: Vec<u8>,
        server_iv: Vec<u8>,
    ) -> Self {
        Self {
            client_mac_key,
            server_mac_key,
            client_cipher_key,
            server_cipher_key,
            client_iv,
            server_iv,
        }
    }

    /// Slice a key block in RFC 5246 §6.3 order:
    ///
    /// ```text
    /// client_write_MAC_key || server_write_MAC_key ||
    /// client_write_key     || server_write_key     ||
    /// client_write_IV      || server_write_IV
    /// ```
    pub fn from_key_block(params: &CipherSuiteParams, key_block: &[u8]) -> Result<Self, RecordError> {
        let need = params.key_block_len();
        if key_block.len() < need {
            return Err(RecordError::framing(format!(
                "key block too short: need {need}, got {}",
                key_block.len()
            )));
        }

        let mut rest = key_block;
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            head.to_vec()
        };
        let mac_len = params.mac_key_len();
        let key_len = params.key_len();
        let iv_len = params.fixed_iv_len();

        let client_mac_key = take(mac_len);
        let server_mac_key = take(mac_len);
        let client_cipher_key = take(key_len);
        let server_cipher_key = take(key_len);
        let client_iv = take(iv_len);
        let server_iv = take(iv_len);

        Ok(Self::new(
            client_mac_key,
            server_mac_key,
            client_cipher_key,
            server_cipher_key,
            client_iv,
            server_iv,
        ))
    }

    pub fn mac_key(&self, side: ConnectionSide) -> &[u8] {
        match side {
            ConnectionSide::Client => &self.client_mac_key,
            ConnectionSide::Server => &self.server_mac_key,
        }
    }

    pub fn cipher_key(&self, side: ConnectionSide) -> &[u8] {
        match side {
            ConnectionSide::Client => &self.client_cipher_key,
            ConnectionSide::Server => &self.server_cipher_key,
        }
    }

    pub fn iv(&self, side: ConnectionSide) -> &[u8] {
        match side {
            ConnectionSide::Client => &self.client_iv,
            ConnectionSide::Server => &self.server_iv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::CipherSuite;

    #[test]
    fn test_key_block_slicing_order() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA).unwrap();
        let block: Vec<u8> = (0..params.key_block_len()).map(|i| i as u8).collect();
        let keys = SessionKeys::from_key_block(&params, &block).unwrap();

        assert_eq!(keys.mac_key(ConnectionSide::Client), &block[0..20]);
        assert_eq!(keys.mac_key(ConnectionSide::Server), &block[20..40]);
        assert_eq!(keys.cipher_key(ConnectionSide::Client), &block[40..56]);
        assert_eq!(keys.cipher_key(ConnectionSide::Server), &block[56..72]);
        assert_eq!(keys.iv(ConnectionSide::Client), &block[72..88]);
        assert_eq!(keys.iv(ConnectionSide::Server), &block[88..104]);
    }

    #[test]
    fn test_short_key_block_rejected() {
        let params =
            CipherSuiteParams::from_suite(CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256).unwrap();
        assert!(SessionKeys::from_key_block(&params, &[0u8; 10]).is_err());
    }
}
