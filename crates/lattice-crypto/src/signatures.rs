//! # Seed Signing
//!
//! The private half of an nkeys seed signs two things: the
//! `header.payload` input of an invocation claims token, and the nonce a
//! broker sends when a user JWT logs in. Verification only ever happens
//! against the 32-byte key carried inside an encoded `C...`/`U...` public key.
//!
//! Ed25519 needs no randomness, so a seed and an input always give the same
//! signature.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Raw public key of an nkeys identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityKey([u8; 32]);

impl IdentityKey {
    /// Fails with [`CryptoError::InvalidPublicKey`] unless the bytes are a
    /// curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Bytes as they sit between the type prefix and checksum.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check a token or nonce signature made by this identity's seed.
    pub fn verify(&self, signed: &[u8], signature: &TokenSignature) -> Result<(), CryptoError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        key.verify(signed, &ed25519_dalek::Signature::from_bytes(&signature.0))
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Detached signature, the third segment of a claims token once decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSignature([u8; 64]);

impl TokenSignature {
    /// Signature from a decoded token segment of any length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedToken(format!("signature is {} bytes, expected 64", bytes.len()))
        })?;
        Ok(Self(raw))
    }

    /// Bytes to base64url-encode into a token.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Private half of a decoded seed. `ed25519-dalek` wipes the key on drop.
pub struct SeedSigner {
    key: SigningKey,
}

impl SeedSigner {
    /// Signer from the 32 secret bytes inside a seed.
    pub fn from_seed(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// Public key that verifies this signer's output.
    pub fn identity(&self) -> IdentityKey {
        IdentityKey(self.key.verifying_key().to_bytes())
    }

    /// Sign a token's `header.payload` or a broker nonce.
    pub fn sign(&self, input: &[u8]) -> TokenSignature {
        TokenSignature(self.key.sign(input).to_bytes())
    }
}

impl std::fmt::Debug for SeedSigner {
    // never print the secret
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedSigner")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}
