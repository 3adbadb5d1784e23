//! # Lattice Wire - MessagePack Codec for Protocol Messages
//!
//! Every value exchanged on the lattice is a self-describing MessagePack map
//! keyed by fixed lowercase field names. The key names are a cross-process
//! contract and must not change.
//!
//! ## Rules
//!
//! - **Optional fields**: `None` is the nil marker, `Some(v)` is `v` itself.
//! - **Forward compatibility**: unknown map keys are skipped.
//! - **Nil byte arrays** decode to an empty payload.
//! - **Entities** are tagged either explicitly (`entity_type` int8) or
//!   implicitly (key count), see [`EntityTagging`].
//!
//! ```text
//! Invocation ──encode──► [0x89 "origin" {..} "target" {..} "operation" ..]
//!            ◄─decode──
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
mod marker;

pub use codec::{peek_origin, WireDecode, WireEncode};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::WireError;

/// Deepest container nesting accepted while skipping unknown values.
pub const MAX_NESTING_DEPTH: usize = 32;

/// How [`lattice_types::Entity`] discriminants are carried on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntityTagging {
    /// An `entity_type` int8 field: 0 = actor, 1 = provider.
    #[default]
    Explicit,
    /// No tag; one key means actor, three keys mean provider.
    Implicit,
}

/// Encode `value` with explicit entity tags.
pub fn to_vec<T: WireEncode + ?Sized>(value: &T) -> Vec<u8> {
    to_vec_with(value, EntityTagging::default())
}

/// Encode `value` with the given entity tagging.
pub fn to_vec_with<T: WireEncode + ?Sized>(value: &T, tagging: EntityTagging) -> Vec<u8> {
    let mut encoder = Encoder::new(tagging);
    value.encode(&mut encoder);
    encoder.into_bytes()
}

/// Decode a `T` expecting explicit entity tags.
pub fn from_slice<T: WireDecode>(bytes: &[u8]) -> Result<T, WireError> {
    from_slice_with(bytes, EntityTagging::default())
}

/// Decode a `T` with the given entity tagging.
pub fn from_slice_with<T: WireDecode>(bytes: &[u8], tagging: EntityTagging) -> Result<T, WireError> {
    let mut decoder = Decoder::new(bytes, tagging);
    T::decode(&mut decoder)
}
