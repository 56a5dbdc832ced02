// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Symmetric encryption of statement files at rest.
//!
//! ## Wire Layout
//!
//! ```text
//! | IV (16 bytes, AES block size) | AES-256-CBC ciphertext, PKCS#7 padded |
//! ```
//!
//! A fresh IV is drawn from the system CSPRNG on every encryption, so the
//! same key never sees a repeated IV. Decryption reads the IV prefix, then
//! decrypts the remainder with it.
//!
//! ## Key Ids
//!
//! Every encrypted file records an opaque key id minted at encryption time.
//! Keys are resolved through a [`KeyResolver`] so files sealed under
//! different key ids may use different keys; see [`StaticKey`] and
//! [`DerivedKeys`].
//!
//! ## Failure Reporting
//!
//! Short input, misaligned ciphertext and bad padding all collapse into
//! [`CipherError::Corrupted`]. Callers cannot tell a wrong key from a
//! tampered file, which keeps decryption from acting as a padding oracle.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use aes::Aes256;
use base64ct::{Base64, Base64Unpadded, Base64Url, Base64UrlUnpadded, Encoding};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// IV length in bytes (the AES block size).
pub const IV_LEN: usize = 16;

/// Domain separation label for per-file key derivation.
const KEY_DERIVATION_LABEL: &[u8] = b"statement-delivery/file-key/v1:";

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// IV missing or short, ciphertext misaligned, or padding invalid.
    #[error("encrypted file is corrupted or could not be decrypted")]
    Corrupted,

    /// The plaintext source could not be read during encryption.
    #[error("failed to read plaintext input: {0}")]
    Input(#[source] std::io::Error),

    #[error("secure random generator unavailable")]
    Random,
}

/// 256-bit symmetric key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from base64 (URL-safe or standard, padded or not).
    ///
    /// Returns `None` unless the input decodes to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let encoded = encoded.trim();
        let decoded = Base64UrlUnpadded::decode_vec(encoded)
            .or_else(|_| Base64Url::decode_vec(encoded))
            .or_else(|_| Base64::decode_vec(encoded))
            .or_else(|_| Base64Unpadded::decode_vec(encoded))
            .ok()?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().ok()?;
        Some(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// Maps a key id to the key material used for that file.
pub trait KeyResolver: Send + Sync {
    fn key_for(&self, key_id: &str) -> CipherKey;
}

/// Every key id resolves to the configured master key.
#[derive(Debug, Clone)]
pub struct StaticKey {
    master: CipherKey,
}

impl StaticKey {
    pub fn new(master: CipherKey) -> Self {
        Self { master }
    }
}

impl KeyResolver for StaticKey {
    fn key_for(&self, _key_id: &str) -> CipherKey {
        self.master.clone()
    }
}

/// Per-file keys: `HMAC-SHA256(master, label || key_id)`.
#[derive(Debug, Clone)]
pub struct DerivedKeys {
    master: CipherKey,
}

impl DerivedKeys {
    pub fn new(master: CipherKey) -> Self {
        Self { master }
    }
}

impl KeyResolver for DerivedKeys {
    fn key_for(&self, key_id: &str) -> CipherKey {
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.master.as_bytes());
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(KEY_DERIVATION_LABEL);
        ctx.update(key_id.as_bytes());
        let tag = ctx.sign();

        let mut derived = [0u8; KEY_LEN];
        derived.copy_from_slice(tag.as_ref());
        CipherKey(derived)
    }
}

/// AES-256-CBC file cipher with IV-prefixed output.
///
/// Key material is read-only, so one instance is shared across all
/// concurrent requests.
#[derive(Clone)]
pub struct FileCipher {
    keys: Arc<dyn KeyResolver>,
    rng: SystemRandom,
}

impl FileCipher {
    pub fn new(keys: Arc<dyn KeyResolver>) -> Self {
        Self {
            keys,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a fresh opaque key id for a file about to be encrypted.
    pub fn new_key_id(&self) -> String {
        format!("key_{}", uuid::Uuid::new_v4().simple())
    }

    /// Encrypt everything readable from `plaintext` under `key_id`.
    pub fn encrypt(&self, mut plaintext: impl Read, key_id: &str) -> Result<Vec<u8>, CipherError> {
        let mut input = Vec::new();
        plaintext
            .read_to_end(&mut input)
            .map_err(CipherError::Input)?;

        let mut iv = [0u8; IV_LEN];
        self.rng.fill(&mut iv).map_err(|_| CipherError::Random)?;

        let key = self.keys.key_for(key_id);
        let ciphertext = Aes256CbcEnc::new(&(*key.as_bytes()).into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(&input);

        let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt an IV-prefixed stream produced by [`FileCipher::encrypt`].
    pub fn decrypt(&self, mut ciphertext: impl Read, key_id: &str) -> Result<Vec<u8>, CipherError> {
        let mut input = Vec::new();
        ciphertext
            .read_to_end(&mut input)
            .map_err(|_| CipherError::Corrupted)?;

        if input.len() < IV_LEN {
            return Err(CipherError::Corrupted);
        }
        let (iv_bytes, body) = input.split_at(IV_LEN);

        // PKCS#7 always emits at least one block.
        if body.is_empty() || body.len() % IV_LEN != 0 {
            return Err(CipherError::Corrupted);
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(iv_bytes);

        let key = self.keys.key_for(key_id);
        Aes256CbcDec::new(&(*key.as_bytes()).into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CipherError::Corrupted)
    }
}

impl fmt::Debug for FileCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCipher").finish_non_exhaustive()
    }
}
