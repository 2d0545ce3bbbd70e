//! Record protection: MAC-then-encrypt for CBC and stream ciphers
//! (RFC 5246 §6.2.3.1-2, SSLv3), and AEAD (RFC 5246 §6.2.3.3, RFC 7905).
//!
//! Every check on a received record runs in constant time and every
//! failure surfaces as `BadRecordMac`, so padding errors and MAC errors
//! cannot be told apart.

use subtle::Choice;
use tlsrec_crypto::ct;
use tlsrec_crypto::modes::{cbc_decrypt, cbc_encrypt};
use tlsrec_crypto::{Mac, RandomSource};
use tlsrec_types::{CryptoError, RecordError};
use tracing::trace;
use zeroize::Zeroize;

use super::RecordType;
use crate::crypt::cipher_state::{AeadNonce, CipherMode, ConnectionCipherState};
use crate::version::ProtocolVersion;

/// Padding is checked over at most this many trailing bytes.
const MAX_PADDING_CHECK: usize = 256;

/// MAC over `seq(8) || type(1) || version(2) || length(2) || content`.
/// The version is left out for SSLv3.
fn compute_mac(
    mac: &mut dyn Mac,
    seq: u64,
    record_type: RecordType,
    version: ProtocolVersion,
    include_version: bool,
    content: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    mac.update(&seq.to_be_bytes());
    mac.update(&[record_type as u8]);
    if include_version {
        mac.update(&[version.major(), version.minor()]);
    }
    mac.update(&(content.len() as u16).to_be_bytes());
    mac.update(content);
    let mut out = vec![0u8; mac.output_size()];
    mac.finish(&mut out)?;
    Ok(out)
}

/// Minimal TLS padding for `data_len` bytes: `pad_len + 1` bytes,
/// each equal to `pad_len`, bringing the total to a block multiple.
pub(crate) fn tls_padding(data_len: usize, block_size: usize) -> Vec<u8> {
    let pad_len = (block_size - ((data_len + 1) % block_size)) % block_size;
    vec![pad_len as u8; pad_len + 1]
}

/// Check TLS CBC padding in constant time.
///
/// Returns the padding size including the length byte, or 0 if the
/// padding is malformed.
pub(crate) fn check_tls_padding(record: &[u8]) -> usize {
    let len = record.len();
    if len == 0 {
        return 0;
    }
    let to_check = len.min(MAX_PADDING_CHECK);
    let pad_byte = record[len - 1];
    let pad_bytes = usize::from(pad_byte) + 1;

    let mut pad_invalid = ct::is_lt(len, pad_bytes);
    for i in (len - to_check)..len {
        let offset = len - i;
        let in_pad_range = ct::is_lte(offset, pad_bytes);
        let pad_correct = ct::is_equal(usize::from(record[i]), usize::from(pad_byte));
        pad_invalid |= in_pad_range & !pad_correct;
    }
    ct::select(pad_invalid, 0, pad_bytes)
}

/// SSLv3 padding carries only its length; it must fit in one block.
fn check_ssl3_padding(record: &[u8], block_size: usize) -> usize {
    let Some(&last) = record.last() else {
        return 0;
    };
    let pad_bytes = usize::from(last) + 1;
    ct::select(ct::is_lte(pad_bytes, block_size), pad_bytes, 0)
}

/// `seq || type || version || length`
fn aead_aad(seq: u64, record_type: RecordType, version: ProtocolVersion, len: usize) -> [u8; 13] {
    let mut aad = [0u8; 13];
    aad[..8].copy_from_slice(&seq.to_be_bytes());
    aad[8] = record_type as u8;
    aad[9] = version.major();
    aad[10] = version.minor();
    aad[11..].copy_from_slice(&(len as u16).to_be_bytes());
    aad
}

fn aead_nonce(fixed_iv: &[u8], kind: AeadNonce, explicit: &[u8; 8]) -> Vec<u8> {
    match kind {
        AeadNonce::ExplicitSuffix => {
            let mut nonce = Vec::with_capacity(fixed_iv.len() + explicit.len());
            nonce.extend_from_slice(fixed_iv);
            nonce.extend_from_slice(explicit);
            nonce
        }
        AeadNonce::XorSequence => {
            let mut nonce = fixed_iv.to_vec();
            let offset = nonce.len().saturating_sub(explicit.len());
            for (n, s) in nonce[offset..].iter_mut().zip(explicit) {
                *n ^= s;
            }
            nonce
        }
    }
}

/// Protect `msg` as the body of one record.
pub(crate) fn protect(
    state: &mut ConnectionCipherState,
    record_type: RecordType,
    version: ProtocolVersion,
    seq: u64,
    msg: &[u8],
    rng: &mut dyn RandomSource,
) -> Result<Vec<u8>, RecordError> {
    let include_version = state.mac_includes_record_version();
    let iv_size = state.iv_size();
    let ConnectionCipherState { mode, mac, .. } = state;

    match mode {
        CipherMode::Aead {
            aead,
            fixed_iv,
            nonce,
        } => {
            let explicit = seq.to_be_bytes();
            let nonce_bytes = aead_nonce(fixed_iv, *nonce, &explicit);
            let aad = aead_aad(seq, record_type, version, msg.len());
            let sealed = aead.encrypt(&nonce_bytes, &aad, msg)?;
            let mut body = Vec::with_capacity(iv_size + sealed.len());
            if *nonce == AeadNonce::ExplicitSuffix {
                body.extend_from_slice(&explicit);
            }
            body.extend_from_slice(&sealed);
            Ok(body)
        }
        CipherMode::Stream(cipher) => {
            let mac = mac
                .as_deref_mut()
                .ok_or(CryptoError::NotSupported("stream cipher without MAC"))?;
            let tag = compute_mac(mac, seq, record_type, version, include_version, msg)?;
            let mut body = Vec::with_capacity(msg.len() + tag.len());
            body.extend_from_slice(msg);
            body.extend_from_slice(&tag);
            cipher.apply_keystream(&mut body);
            Ok(body)
        }
        CipherMode::Block { cipher, cbc_state } => {
            let mac = mac
                .as_deref_mut()
                .ok_or(CryptoError::NotSupported("block cipher without MAC"))?;
            let bs = cipher.block_size();
            let tag = compute_mac(mac, seq, record_type, version, include_version, msg)?;
            let mut data = Vec::with_capacity(msg.len() + tag.len() + bs);
            data.extend_from_slice(msg);
            data.extend_from_slice(&tag);
            let padding = tls_padding(data.len(), bs);
            data.extend_from_slice(&padding);

            let mut body = Vec::with_capacity(iv_size + data.len());
            if iv_size > 0 {
                let mut iv = vec![0u8; iv_size];
                rng.fill_bytes(&mut iv)?;
                cbc_encrypt(cipher.as_ref(), &iv, &mut data)?;
                body.extend_from_slice(&iv);
            } else {
                cbc_encrypt(cipher.as_ref(), cbc_state, &mut data)?;
                cbc_state.copy_from_slice(&data[data.len() - bs..]);
            }
            body.extend_from_slice(&data);
            Ok(body)
        }
    }
}

/// Authenticate and decrypt a record body. Returns the plaintext.
pub(crate) fn unprotect(
    state: &mut ConnectionCipherState,
    record_type: RecordType,
    version: ProtocolVersion,
    seq: u64,
    body: &[u8],
) -> Result<Vec<u8>, RecordError> {
    let include_version = state.mac_includes_record_version();
    let ssl3_padding = state.cipher_padding_single_byte();
    let iv_size = state.iv_size();
    let mac_size = state.mac_size();
    let ConnectionCipherState { mode, mac, .. } = state;

    match mode {
        CipherMode::Aead {
            aead,
            fixed_iv,
            nonce,
        } => {
            let tag_size = aead.tag_size();
            if body.len() < iv_size + tag_size {
                return Err(RecordError::BadRecordMac);
            }
            let mut explicit = seq.to_be_bytes();
            let ciphertext = if *nonce == AeadNonce::ExplicitSuffix {
                explicit.copy_from_slice(&body[..iv_size]);
                &body[iv_size..]
            } else {
                body
            };
            let nonce_bytes = aead_nonce(fixed_iv, *nonce, &explicit);
            let aad = aead_aad(seq, record_type, version, ciphertext.len() - tag_size);
            aead.decrypt(&nonce_bytes, &aad, ciphertext)
                .map_err(|_| RecordError::BadRecordMac)
        }
        CipherMode::Stream(cipher) => {
            let mac = mac
                .as_deref_mut()
                .ok_or(CryptoError::NotSupported("stream cipher without MAC"))?;
            if body.len() < mac_size {
                return Err(RecordError::BadRecordMac);
            }
            let mut plaintext = body.to_vec();
            cipher.apply_keystream(&mut plaintext);
            let content_len = plaintext.len() - mac_size;
            let expected = compute_mac(
                mac,
                seq,
                record_type,
                version,
                include_version,
                &plaintext[..content_len],
            )?;
            if bool::from(ct::bytes_eq(&expected, &plaintext[content_len..])) {
                plaintext.truncate(content_len);
                Ok(plaintext)
            } else {
                plaintext.zeroize();
                Err(RecordError::BadRecordMac)
            }
        }
        CipherMode::Block { cipher, cbc_state } => {
            let mac = mac
                .as_deref_mut()
                .ok_or(CryptoError::NotSupported("block cipher without MAC"))?;
            let bs = cipher.block_size();
            if body.len() < iv_size {
                return Err(RecordError::BadRecordMac);
            }
            let (iv, ciphertext) = body.split_at(iv_size);
            if ciphertext.is_empty() || ciphertext.len() % bs != 0 || ciphertext.len() < mac_size + 1 {
                return Err(RecordError::BadRecordMac);
            }

            let mut plaintext = ciphertext.to_vec();
            if iv_size > 0 {
                cbc_decrypt(cipher.as_ref(), iv, &mut plaintext)
                    .map_err(|_| RecordError::BadRecordMac)?;
            } else {
                cbc_decrypt(cipher.as_ref(), cbc_state, &mut plaintext)
                    .map_err(|_| RecordError::BadRecordMac)?;
                cbc_state.copy_from_slice(&ciphertext[ciphertext.len() - bs..]);
            }

            let record_len = plaintext.len();
            let pad_size = if ssl3_padding {
                check_ssl3_padding(&plaintext, bs)
            } else {
                check_tls_padding(&plaintext)
            };
            // A valid padding never overlaps the MAC.
            let size_ok = ct::is_lte(mac_size + pad_size, record_len);
            let pad_size = ct::select(size_ok, pad_size, 0);
            let pad_ok: Choice = size_ok & !ct::is_equal(pad_size, 0);

            let content_len = record_len - mac_size - pad_size;
            let expected = compute_mac(
                mac,
                seq,
                record_type,
                version,
                include_version,
                &plaintext[..content_len],
            )?;
            // Top the compression count up to what the longest possible
            // content would have cost, so timing is independent of padding.
            let header_len = if include_version { 13 } else { 11 };
            let extra = mac.compressions(header_len + record_len - mac_size)
                - mac.compressions(header_len + content_len);
            mac.update(&vec![0u8; extra * mac.hash_block_size()]);
            let mut scratch = vec![0u8; mac_size];
            mac.finish(&mut scratch)?;

            let mac_ok = ct::bytes_eq(&expected, &plaintext[content_len..content_len + mac_size]);
            if bool::from(pad_ok & mac_ok) {
                plaintext.truncate(content_len);
                Ok(plaintext)
            } else {
                trace!(record_len, "cbc record failed authentication");
                plaintext.zeroize();
                Err(RecordError::BadRecordMac)
            }
        }
    }
}
