//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The signing seed could not be turned into a key pair.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Building or signing a claims token failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// A claims token was not `header.payload.signature`.
    #[error("Malformed token: {0}")]
    MalformedToken(String),
}
