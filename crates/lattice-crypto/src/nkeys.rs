//! # NKeys
//!
//! Text encoding of lattice identities.
//!
//! ```text
//! seed:       base32( [0x90 | t>>5, (t&31)<<3] ++ seed[32] ++ crc16_le )
//! public key: base32( [t] ++ ed25519_public[32] ++ crc16_le )
//! ```
//!
//! `t` is the key type prefix byte, base32 is RFC 4648 without padding and
//! the checksum is CRC16/XMODEM over everything before it.

use crate::{CryptoError, IdentityKey, SeedSigner};
use zeroize::Zeroizing;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Prefix byte (before masking) marking a seed.
const PREFIX_SEED: u8 = 18 << 3;

const SEED_RAW_LEN: usize = 2 + 32 + 2;
const PUBLIC_RAW_LEN: usize = 1 + 32 + 2;

/// Role of a key, carried as its first base32 character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// `A...`
    Account,
    /// `C...`
    Cluster,
    /// `M...`
    Module,
    /// `N...`
    Server,
    /// `O...`
    Operator,
    /// `U...`
    User,
    /// `V...`
    Service,
}

impl KeyType {
    fn prefix(self) -> u8 {
        match self {
            Self::Account => 0,
            Self::Cluster => 2 << 3,
            Self::Module => 12 << 3,
            Self::Server => 13 << 3,
            Self::Operator => 14 << 3,
            Self::User => 20 << 3,
            Self::Service => 21 << 3,
        }
    }

    fn from_prefix(prefix: u8) -> Option<Self> {
        [
            Self::Account,
            Self::Cluster,
            Self::Module,
            Self::Server,
            Self::Operator,
            Self::User,
            Self::Service,
        ]
        .into_iter()
        .find(|kind| kind.prefix() == prefix)
    }
}

/// Ed25519 key pair decoded from an nkeys seed.
#[derive(Debug)]
pub struct KeyPair {
    kind: KeyType,
    inner: SeedSigner,
}

impl KeyPair {
    /// Decode an `S...` seed string.
    pub fn from_seed(seed: &str) -> Result<Self, CryptoError> {
        let raw = Zeroizing::new(
            base32_decode(seed.trim())
                .ok_or_else(|| CryptoError::KeyDerivation("seed is not base32".to_string()))?,
        );
        if raw.len() != SEED_RAW_LEN {
            return Err(CryptoError::KeyDerivation(format!(
                "seed decodes to {} bytes, expected {SEED_RAW_LEN}",
                raw.len()
            )));
        }
        verify_checksum(&raw).map_err(|_| CryptoError::KeyDerivation("bad seed checksum".to_string()))?;

        if raw[0] & 0xf8 != PREFIX_SEED {
            return Err(CryptoError::KeyDerivation("not a seed".to_string()));
        }
        let type_prefix = ((raw[0] & 0x07) << 5) | ((raw[1] & 0xf8) >> 3);
        let kind = KeyType::from_prefix(type_prefix).ok_or_else(|| {
            CryptoError::KeyDerivation(format!("unknown key type prefix {type_prefix}"))
        })?;

        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&raw[2..34]);
        Ok(Self {
            kind,
            inner: SeedSigner::from_seed(&secret),
        })
    }

    /// Role encoded in the seed.
    pub fn key_type(&self) -> KeyType {
        self.kind
    }

    /// Encoded public key, e.g. `C...` for a cluster seed.
    pub fn public_key(&self) -> String {
        encode_public_key(self.kind, &self.inner.identity())
    }

    /// Signer for claims tokens and broker nonces.
    pub fn signer(&self) -> &SeedSigner {
        &self.inner
    }
}

/// Encode a raw public key with its type prefix and checksum.
pub fn encode_public_key(kind: KeyType, key: &IdentityKey) -> String {
    let mut raw = Vec::with_capacity(PUBLIC_RAW_LEN);
    raw.push(kind.prefix());
    raw.extend_from_slice(key.as_bytes());
    let crc = crc16(&raw);
    raw.extend_from_slice(&crc.to_le_bytes());
    base32_encode(&raw)
}

/// Decode an encoded public key of any known type.
pub fn decode_public_key(encoded: &str) -> Result<(KeyType, IdentityKey), CryptoError> {
    let raw = base32_decode(encoded.trim()).ok_or(CryptoError::InvalidPublicKey)?;
    if raw.len() != PUBLIC_RAW_LEN {
        return Err(CryptoError::InvalidPublicKey);
    }
    verify_checksum(&raw)?;
    let kind = KeyType::from_prefix(raw[0]).ok_or(CryptoError::InvalidPublicKey)?;

    let mut key = [0u8; 32];
    key.copy_from_slice(&raw[1..33]);
    Ok((kind, IdentityKey::from_bytes(key)?))
}

fn verify_checksum(raw: &[u8]) -> Result<(), CryptoError> {
    let (body, tail) = raw.split_at(raw.len() - 2);
    if crc16(body) == u16::from_le_bytes([tail[0], tail[1]]) {
        Ok(())
    } else {
        Err(CryptoError::InvalidPublicKey)
    }
}

// ===== ENCODINGS =====

/// CRC16/XMODEM: polynomial 0x1021, zero initial value.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(char::from(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    out
}

fn base32_decode(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for c in input.bytes() {
        let value = match c {
            b'A'..=b'Z' => c - b'A',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }
    Some(out)
}
