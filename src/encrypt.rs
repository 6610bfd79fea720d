// Copyright (c) 2020 Apple Inc.
// SPDX-License-Identifier: MPL-2.0

//! Hybrid public-key encryption of share bundles.
//!
//! Each call generates an ephemeral X25519 key pair and agrees on a shared secret with the
//! server's static key. A 128-bit AES-GCM key is derived from the secret with the ANSI X9.63 KDF
//! over SHA-256. The ciphertext layout is
//!
//! ```text
//! ephemeral public key (32) || nonce (12) || AES-GCM ciphertext || tag (16)
//! ```
//!
//! and the associated data is `"PrioPacket" || ephemeral public key || nonce`.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Nonce,
};
use base64::{engine::Engine, prelude::BASE64_STANDARD};
use rand_core::{OsError, OsRng, TryRngCore};
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Formatter};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};

/// Length of an X25519 public or private key.
pub const KEY_LENGTH: usize = 32;
/// Length of the AES-GCM nonce.
pub const NONCE_LENGTH: usize = 12;
/// Length of the AES-GCM tag.
pub const TAG_LENGTH: usize = 16;
/// Length of the symmetric AES-GCM key.
const SYMMETRIC_KEY_LENGTH: usize = 16;
/// Domain separation prefix of the associated data.
const AAD_PREFIX: &[u8] = b"PrioPacket";

/// Possible errors from encryption and decryption.
#[derive(Debug, thiserror::Error)]
pub enum EncryptError {
    /// Key material has the wrong length or is otherwise unusable.
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),
    /// Hex decoding of a key failed.
    #[error("hex decoding error")]
    DecodeHex(#[from] hex::FromHexError),
    /// Base64 decoding of a key failed.
    #[error("base64 decoding error")]
    DecodeBase64(#[from] base64::DecodeError),
    /// The ciphertext cannot contain the fixed-size header and tag.
    #[error("ciphertext too short")]
    CiphertextTooShort,
    /// The AEAD failed to seal the plaintext.
    #[error("encryption failed")]
    Encryption,
    /// Tag verification failed.
    #[error("decryption failed")]
    Decryption,
    /// The operating system's entropy source failed.
    #[error("system entropy source failed: {0}")]
    Entropy(OsError),
}

impl EncryptError {
    /// Whether the error is attributable to the key material rather than to the data or the
    /// environment.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            EncryptError::InvalidKey(_)
                | EncryptError::DecodeHex(_)
                | EncryptError::DecodeBase64(_)
        )
    }
}

/// A server's X25519 public key.
#[derive(Clone)]
pub struct PublicKey([u8; KEY_LENGTH]);

impl PublicKey {
    /// Imports a raw 32-byte key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncryptError> {
        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| EncryptError::InvalidKey("public key must be 32 bytes"))?;
        Ok(Self(key))
    }

    /// Imports a hex-encoded key. Upper and lower case are accepted.
    pub fn from_hex(key: &str) -> Result<Self, EncryptError> {
        Self::from_bytes(&hex::decode(key)?)
    }

    /// Imports a base64-encoded key.
    pub fn from_base64(key: &str) -> Result<Self, EncryptError> {
        Self::from_bytes(&BASE64_STANDARD.decode(key)?)
    }

    /// Exports the key as upper-case hex.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// The raw key.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PublicKey {}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl From<&PrivateKey> for PublicKey {
    fn from(private_key: &PrivateKey) -> Self {
        Self(DalekPublicKey::from(&private_key.0).to_bytes())
    }
}

/// A server's X25519 private key. The secret is zeroized on drop.
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Generates a fresh key from the operating system's CSPRNG.
    pub fn generate() -> Result<Self, EncryptError> {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(EncryptError::Entropy)?;
        Ok(Self(StaticSecret::from(bytes)))
    }

    /// Imports a raw 32-byte secret.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncryptError> {
        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| EncryptError::InvalidKey("private key must be 32 bytes"))?;
        Ok(Self(StaticSecret::from(key)))
    }

    /// Imports a hex-encoded secret.
    pub fn from_hex(key: &str) -> Result<Self, EncryptError> {
        Self::from_bytes(&hex::decode(key)?)
    }

    /// Imports a base64-encoded secret.
    pub fn from_base64(key: &str) -> Result<Self, EncryptError> {
        Self::from_bytes(&BASE64_STANDARD.decode(key)?)
    }

    /// Exports the secret as upper-case hex.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0.as_bytes())
    }

    /// Exports the secret as base64.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.0.as_bytes())
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"<redacted>").finish()
    }
}

/// ANSI X9.63 KDF with SHA-256 and empty shared info, truncated to one AES-128 key.
fn derive_symmetric_key(
    private_key: &PrivateKey,
    peer: &PublicKey,
) -> Result<[u8; SYMMETRIC_KEY_LENGTH], EncryptError> {
    let shared = private_key.0.diffie_hellman(&DalekPublicKey::from(peer.0));
    if !shared.was_contributory() {
        return Err(EncryptError::InvalidKey("public key is a low-order point"));
    }

    let mut hasher = Sha256::new();
    hasher.update(shared.as_bytes());
    hasher.update(1u32.to_be_bytes());
    let digest = hasher.finalize();

    let mut key = [0u8; SYMMETRIC_KEY_LENGTH];
    key.copy_from_slice(&digest[..SYMMETRIC_KEY_LENGTH]);
    Ok(key)
}

fn associated_data(ephemeral: &PublicKey, nonce: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_PREFIX.len() + KEY_LENGTH + NONCE_LENGTH);
    aad.extend_from_slice(AAD_PREFIX);
    aad.extend_from_slice(&ephemeral.0);
    aad.extend_from_slice(nonce);
    aad
}

/// Number of bytes [`encrypt_share`] produces for a plaintext of `plaintext_len` bytes.
pub fn encrypted_size(plaintext_len: usize) -> usize {
    KEY_LENGTH + NONCE_LENGTH + plaintext_len + TAG_LENGTH
}

/// Encrypts `share` to `key` under a fresh ephemeral key pair and nonce.
pub fn encrypt_share(share: &[u8], key: &PublicKey) -> Result<Vec<u8>, EncryptError> {
    let ephemeral = PrivateKey::generate()?;
    let ephemeral_public = PublicKey::from(&ephemeral);
    let symmetric_key = derive_symmetric_key(&ephemeral, key)?;

    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(EncryptError::Entropy)?;
    let aad = associated_data(&ephemeral_public, &nonce);

    let cipher = Aes128Gcm::new_from_slice(&symmetric_key)
        .map_err(|_| EncryptError::Encryption)?;
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: share,
                aad: &aad,
            },
        )
        .map_err(|_| EncryptError::Encryption)?;

    let mut output = Vec::with_capacity(encrypted_size(share.len()));
    output.extend_from_slice(&ephemeral_public.0);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Decrypts a ciphertext produced by [`encrypt_share`] with the matching private key.
pub fn decrypt_share(share: &[u8], key: &PrivateKey) -> Result<Vec<u8>, EncryptError> {
    if share.len() < encrypted_size(0) {
        return Err(EncryptError::CiphertextTooShort);
    }

    let (ephemeral_bytes, rest) = share.split_at(KEY_LENGTH);
    let (nonce, sealed) = rest.split_at(NONCE_LENGTH);
    let ephemeral_public = PublicKey::from_bytes(ephemeral_bytes)?;
    let symmetric_key = derive_symmetric_key(key, &ephemeral_public)?;
    let aad = associated_data(&ephemeral_public, nonce);

    let cipher = Aes128Gcm::new_from_slice(&symmetric_key)
        .map_err(|_| EncryptError::Decryption)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: &aad,
            },
        )
        .map_err(|_| EncryptError::Decryption)
}
