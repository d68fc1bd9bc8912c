// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Named symmetric encryption for cookie values.
//!
//! ## Sealed Value Format
//!
//! ```text
//! base64url_nopad( nonce[12] || AES-256-GCM ciphertext || tag[16] )
//! ```
//!
//! The subkey for a key name is `HMAC-SHA256(master, DOMAIN || key_name)` and
//! the key name is also bound as associated data, so a value sealed under one
//! name fails to open under any other.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Domain separation prefix for subkey derivation.
const DERIVATION_DOMAIN: &[u8] = b"session-guard/protector/v1:";

/// AES-GCM authentication tag length.
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ProtectorError {
    /// Value was tampered with, truncated, or sealed under another key.
    #[error("decryption failed")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("random number generator failure")]
    Random,

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// A named symmetric encrypt/decrypt capability.
///
/// Implementations must be safe to share across request tasks.
pub trait Protector: Send + Sync {
    /// Encrypt `plaintext` under the key called `key_name`.
    fn protect(&self, key_name: &str, plaintext: &str) -> Result<String, ProtectorError>;

    /// Decrypt a value produced by [`Protector::protect`] with the same key name.
    fn unprotect(&self, key_name: &str, ciphertext: &str) -> Result<String, ProtectorError>;
}

/// Protector deriving one AES-256-GCM key per name from a master secret.
pub struct KeyRingProtector {
    master: Vec<u8>,
    rng: SystemRandom,
}

impl KeyRingProtector {
    /// Create a protector over the given master secret.
    pub fn new(master: impl Into<Vec<u8>>) -> Result<Self, ProtectorError> {
        let master = master.into();
        if master.len() < 32 {
            return Err(ProtectorError::InvalidKey(
                "master secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            master,
            rng: SystemRandom::new(),
        })
    }

    fn key_for(&self, key_name: &str) -> Result<LessSafeKey, ProtectorError> {
        let mut mac = HmacSha256::new_from_slice(&self.master)
            .map_err(|e| ProtectorError::InvalidKey(e.to_string()))?;
        mac.update(DERIVATION_DOMAIN);
        mac.update(key_name.as_bytes());
        let digest = mac.finalize().into_bytes();

        let unbound = UnboundKey::new(&AES_256_GCM, digest.as_slice())
            .map_err(|_| ProtectorError::InvalidKey("derived key rejected".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl Protector for KeyRingProtector {
    fn protect(&self, key_name: &str, plaintext: &str) -> Result<String, ProtectorError> {
        let key = self.key_for(key_name)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| ProtectorError::Random)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(key_name.as_bytes()),
            &mut in_out,
        )
        .map_err(|_| ProtectorError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(Base64UrlUnpadded::encode_string(&sealed))
    }

    fn unprotect(&self, key_name: &str, ciphertext: &str) -> Result<String, ProtectorError> {
        let sealed =
            Base64UrlUnpadded::decode_vec(ciphertext).map_err(|_| ProtectorError::Decryption)?;
        // Non-canonical trailing bits would let two encodings open to the same value.
        if Base64UrlUnpadded::encode_string(&sealed) != ciphertext {
            return Err(ProtectorError::Decryption);
        }
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(ProtectorError::Decryption);
        }

        let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| ProtectorError::Decryption)?;

        let key = self.key_for(key_name)?;
        let mut in_out = body.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::from(key_name.as_bytes()), &mut in_out)
            .map_err(|_| ProtectorError::Decryption)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| ProtectorError::Decryption)
    }
}

/// Random URL-safe identifier with `bytes` bytes of entropy.
///
/// Used for per-token key names and refresh values.
pub fn random_identifier(bytes: usize) -> Result<String, ProtectorError> {
    let mut buf = vec![0u8; bytes];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| ProtectorError::Random)?;
    Ok(Base64UrlUnpadded::encode_string(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> KeyRingProtector {
        KeyRingProtector::new(b"an-unremarkable-32-byte-master!!".to_vec()).unwrap()
    }

    #[test]
    fn protect_then_unprotect_returns_plaintext() {
        let p = protector();
        let sealed = p.protect("cookies", "user-42").unwrap();
        assert_ne!(sealed, "user-42");
        assert_eq!(p.unprotect("cookies", &sealed).unwrap(), "user-42");
    }

    #[test]
    fn nonces_make_each_seal_unique() {
        let p = protector();
        let a = p.protect("cookies", "same").unwrap();
        let b = p.protect("cookies", "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn foreign_key_name_fails() {
        let p = protector();
        let sealed = p.protect("key-a", "secret").unwrap();
        assert!(matches!(
            p.unprotect("key-b", &sealed),
            Err(ProtectorError::Decryption)
        ));
    }

    #[test]
    fn other_master_secret_fails() {
        let sealed = protector().protect("cookies", "secret").unwrap();
        let other = KeyRingProtector::new(b"a-different-32-byte-master-key!!".to_vec()).unwrap();
        assert!(other.unprotect("cookies", &sealed).is_err());
    }

    #[test]
    fn every_single_byte_tamper_is_detected() {
        let p = protector();
        let sealed = p.protect("cookies", "payload").unwrap();
        let bytes = sealed.as_bytes();

        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(tampered).unwrap();
            if tampered == sealed {
                continue;
            }
            assert!(p.unprotect("cookies", &tampered).is_err(), "byte {i} accepted");
        }
    }

    #[test]
    fn truncated_and_garbage_values_fail() {
        let p = protector();
        assert!(p.unprotect("cookies", "").is_err());
        assert!(p.unprotect("cookies", "AAAA").is_err());
        assert!(p.unprotect("cookies", "not base64 !!").is_err());
    }

    #[test]
    fn short_master_secret_rejected() {
        assert!(matches!(
            KeyRingProtector::new(b"short".to_vec()),
            Err(ProtectorError::InvalidKey(_))
        ));
    }

    #[test]
    fn random_identifiers_differ() {
        let a = random_identifier(32).unwrap();
        let b = random_identifier(32).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }
}
