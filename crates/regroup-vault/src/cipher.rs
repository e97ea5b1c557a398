// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM token encryption under a single workspace key.
//!
//! A [`CredentialCipher`] produces self-contained blobs in the format the
//! principals table persists: `nonce (12 bytes) || ciphertext || tag (16
//! bytes)`. Every encryption draws a fresh random nonce from the system
//! CSPRNG; nonce reuse would be catastrophic for GCM security.

use std::path::Path;

use regroup_core::RegroupError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use zeroize::Zeroizing;

/// Nonce prefix length of every encrypted token blob.
const NONCE_LEN: usize = 12;

/// GCM authentication tag length appended to the ciphertext.
const TAG_LEN: usize = 16;

/// Encrypts and decrypts stored OAuth tokens with a single AES-256-GCM key.
pub struct CredentialCipher {
    /// The key -- only in memory, zeroized on drop.
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Wrap an existing 32-byte key.
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Create a cipher around a fresh random key that is never written out.
    /// For persistent keys use [`CredentialCipher::generate_key_file`].
    pub fn generate() -> Result<Self, RegroupError> {
        Ok(Self::new(random_key()?))
    }

    /// Load the key from a hex-encoded key file (64 hex characters).
    pub fn from_key_file(path: &Path) -> Result<Self, RegroupError> {
        let hex = std::fs::read_to_string(path).map_err(|e| {
            RegroupError::Vault(format!(
                "cannot read credential key file {}: {e}",
                path.display()
            ))
        })?;
        let key = decode_hex_key(hex.trim())?;
        Ok(Self::new(key))
    }

    /// Generate a fresh random key and write it hex-encoded to `path`.
    ///
    /// Refuses to overwrite an existing key file: losing the old key would
    /// orphan every stored credential.
    pub fn generate_key_file(path: &Path) -> Result<Self, RegroupError> {
        if path.exists() {
            return Err(RegroupError::Vault(format!(
                "credential key file {} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RegroupError::Vault(format!("cannot create key directory: {e}")))?;
        }
        let key = random_key()?;
        let hex: String = key.iter().map(|b| format!("{b:02x}")).collect();
        std::fs::write(path, hex).map_err(|e| {
            RegroupError::Vault(format!(
                "cannot write credential key file {}: {e}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "credential key file generated");
        Ok(Self::new(key))
    }

    /// Encrypt a token into a self-contained `nonce || ciphertext || tag`
    /// blob.
    pub fn encrypt_token(&self, token: &SecretString) -> Result<Vec<u8>, RegroupError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| RegroupError::Vault("failed to generate random nonce".to_string()))?;

        let plaintext = token.expose_secret().as_bytes();
        let mut blob = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(plaintext);

        // Seal the plaintext region in place; the tag lands at the end.
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);
        let tag = self
            .aead_key()?
            .seal_in_place_separate_tag(nonce, Aad::empty(), &mut blob[NONCE_LEN..])
            .map_err(|_| RegroupError::Vault("AES-256-GCM encryption failed".to_string()))?;
        blob.extend_from_slice(tag.as_ref());
        Ok(blob)
    }

    /// Decrypt a `nonce || ciphertext || tag` blob back into the token.
    pub fn decrypt_token(&self, blob: &[u8]) -> Result<SecretString, RegroupError> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(RegroupError::Vault(
                "encrypted token blob is too short".to_string(),
            ));
        }
        let nonce_bytes: [u8; NONCE_LEN] = blob[..NONCE_LEN]
            .try_into()
            .map_err(|_| RegroupError::Vault("corrupted nonce in token blob".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = Zeroizing::new(blob[NONCE_LEN..].to_vec());
        let plaintext = self
            .aead_key()?
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                RegroupError::Vault(
                    "AES-256-GCM decryption failed -- wrong key or corrupted data".to_string(),
                )
            })?;

        let token = std::str::from_utf8(plaintext).map_err(|e| {
            RegroupError::Vault(format!("decrypted token is not valid UTF-8: {e}"))
        })?;
        Ok(SecretString::from(token.to_string()))
    }

    fn aead_key(&self) -> Result<LessSafeKey, RegroupError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.as_ref())
            .map_err(|_| RegroupError::Vault("failed to initialize AES-256-GCM key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

/// Draw a random 32-byte key from the system CSPRNG.
fn random_key() -> Result<[u8; 32], RegroupError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; 32];
    rng.fill(&mut key)
        .map_err(|_| RegroupError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}

/// Decode a 64-character hex string into a 32-byte key.
fn decode_hex_key(hex: &str) -> Result<[u8; 32], RegroupError> {
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RegroupError::Vault(
            "credential key file must contain exactly 64 hex characters".to_string(),
        ));
    }
    let mut key = [0u8; 32];
    for (i, byte) in key.iter_mut().enumerate() {
        let pair = &hex[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| RegroupError::Vault("invalid hex in credential key file".to_string()))?;
    }
    Ok(key)
}
