//! # Lattice Crypto - Identities and Invocation Claims
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `nkeys` | base32 + CRC16 (XMODEM) | Seed and public key text encoding |
//! | `signatures` | Ed25519 | Signing claims tokens and broker nonces |
//! | `hashing` | SHA-256 | Invocation integrity hash |
//! | `claims` | Ed25519 JWT | Per-invocation wascap envelope |
//!
//! ## Security Properties
//!
//! - Seed bytes are zeroized when a key pair is dropped
//! - Seeds with a bad checksum or a non-seed prefix are rejected
//! - Claims tokens carry a detached signature over `header.payload`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod claims;
pub mod errors;
pub mod hashing;
pub mod nkeys;
pub mod signatures;

pub use claims::{decode_token, ClaimsSigner, InvocationClaims, Wascap};
pub use errors::CryptoError;
pub use hashing::invocation_hash;
pub use nkeys::{KeyPair, KeyType};
pub use signatures::{IdentityKey, SeedSigner, TokenSignature};
