//! # Decoder
//!
//! Cursor over a borrowed MessagePack buffer. Every read checks the
//! remaining length first, so a short buffer yields
//! [`WireError::Truncated`] instead of a panic.

use crate::marker;
use crate::{EntityTagging, WireError, MAX_NESTING_DEPTH};

/// MessagePack reader.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    tagging: EntityTagging,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8], tagging: EntityTagging) -> Self {
        Self {
            buf,
            pos: 0,
            tagging,
        }
    }

    /// Entity tagging in effect.
    pub fn tagging(&self) -> EntityTagging {
        self.tagging
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Marker of the next value without consuming it.
    pub fn peek_marker(&self) -> Result<u8, WireError> {
        self.buf.get(self.pos).copied().ok_or(WireError::Truncated {
            needed: 1,
            remaining: 0,
        })
    }

    /// Consume a nil marker if one is next.
    pub fn try_read_nil(&mut self) -> Result<bool, WireError> {
        if self.peek_marker()? == marker::NIL {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            marker::TRUE => Ok(true),
            marker::FALSE => Ok(false),
            found => Err(WireError::UnexpectedMarker {
                expected: "bool",
                found,
            }),
        }
    }

    /// Any integer encoding holding a non-negative value.
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        let m = self.read_u8()?;
        match m {
            0x00..=marker::POSITIVE_FIXINT_MAX => Ok(u64::from(m)),
            marker::UINT8 => Ok(u64::from(self.read_u8()?)),
            marker::UINT16 => Ok(u64::from(u16::from_be_bytes(self.read_array()?))),
            marker::UINT32 => Ok(u64::from(u32::from_be_bytes(self.read_array()?))),
            marker::UINT64 => Ok(u64::from_be_bytes(self.read_array()?)),
            marker::INT8 | marker::INT16 | marker::INT32 | marker::INT64 | marker::NEGATIVE_FIXINT..=0xff => {
                let signed = self.read_signed_body(m)?;
                u64::try_from(signed).map_err(|_| WireError::IntegerOverflow)
            }
            found => Err(WireError::UnexpectedMarker {
                expected: "unsigned integer",
                found,
            }),
        }
    }

    /// Any integer encoding that fits an `i64`.
    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        let m = self.read_u8()?;
        match m {
            0x00..=marker::POSITIVE_FIXINT_MAX => Ok(i64::from(m)),
            marker::UINT8 => Ok(i64::from(self.read_u8()?)),
            marker::UINT16 => Ok(i64::from(u16::from_be_bytes(self.read_array()?))),
            marker::UINT32 => Ok(i64::from(u32::from_be_bytes(self.read_array()?))),
            marker::UINT64 => i64::try_from(u64::from_be_bytes(self.read_array()?))
                .map_err(|_| WireError::IntegerOverflow),
            marker::INT8 | marker::INT16 | marker::INT32 | marker::INT64 | marker::NEGATIVE_FIXINT..=0xff => {
                self.read_signed_body(m)
            }
            found => Err(WireError::UnexpectedMarker {
                expected: "integer",
                found,
            }),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8, WireError> {
        i8::try_from(self.read_i64()?).map_err(|_| WireError::IntegerOverflow)
    }

    pub fn read_str(&mut self) -> Result<String, WireError> {
        let m = self.read_u8()?;
        let len = match m {
            marker::FIXSTR..=0xbf => usize::from(m & 0x1f),
            marker::STR8 => usize::from(self.read_u8()?),
            marker::STR16 => usize::from(u16::from_be_bytes(self.read_array()?)),
            marker::STR32 => u32::from_be_bytes(self.read_array()?) as usize,
            found => {
                return Err(WireError::UnexpectedMarker {
                    expected: "string",
                    found,
                })
            }
        };
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| WireError::InvalidUtf8)
    }

    /// Binary payload. Nil yields an empty vector; string markers are
    /// accepted and read as raw bytes.
    pub fn read_bin(&mut self) -> Result<Vec<u8>, WireError> {
        let m = self.read_u8()?;
        let len = match m {
            marker::NIL => return Ok(Vec::new()),
            marker::BIN8 | marker::STR8 => usize::from(self.read_u8()?),
            marker::BIN16 | marker::STR16 => usize::from(u16::from_be_bytes(self.read_array()?)),
            marker::BIN32 | marker::STR32 => u32::from_be_bytes(self.read_array()?) as usize,
            marker::FIXSTR..=0xbf => usize::from(m & 0x1f),
            found => {
                return Err(WireError::UnexpectedMarker {
                    expected: "binary",
                    found,
                })
            }
        };
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_array_len(&mut self) -> Result<usize, WireError> {
        let m = self.read_u8()?;
        match m {
            marker::FIXARRAY..=0x9f => Ok(usize::from(m & 0x0f)),
            marker::ARRAY16 => Ok(usize::from(u16::from_be_bytes(self.read_array()?))),
            marker::ARRAY32 => Ok(u32::from_be_bytes(self.read_array()?) as usize),
            found => Err(WireError::UnexpectedMarker {
                expected: "array",
                found,
            }),
        }
    }

    pub fn read_map_len(&mut self) -> Result<usize, WireError> {
        let m = self.read_u8()?;
        match m {
            marker::FIXMAP..=0x8f => Ok(usize::from(m & 0x0f)),
            marker::MAP16 => Ok(usize::from(u16::from_be_bytes(self.read_array()?))),
            marker::MAP32 => Ok(u32::from_be_bytes(self.read_array()?) as usize),
            found => Err(WireError::UnexpectedMarker {
                expected: "map",
                found,
            }),
        }
    }

    /// Skip the next value, whatever its type.
    pub fn skip(&mut self) -> Result<(), WireError> {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> Result<(), WireError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(WireError::NestingTooDeep);
        }

        let m = self.read_u8()?;
        let (skip_bytes, children) = match m {
            0x00..=marker::POSITIVE_FIXINT_MAX
            | marker::NEGATIVE_FIXINT..=0xff
            | marker::NIL
            | marker::FALSE
            | marker::TRUE => (0, 0),
            marker::FIXMAP..=0x8f => (0, usize::from(m & 0x0f) * 2),
            marker::FIXARRAY..=0x9f => (0, usize::from(m & 0x0f)),
            marker::FIXSTR..=0xbf => (usize::from(m & 0x1f), 0),
            marker::BIN8 | marker::STR8 => (usize::from(self.read_u8()?), 0),
            marker::BIN16 | marker::STR16 => (usize::from(u16::from_be_bytes(self.read_array()?)), 0),
            marker::BIN32 | marker::STR32 => (u32::from_be_bytes(self.read_array()?) as usize, 0),
            // ext payloads carry a one-byte type before the data
            marker::EXT8 => (usize::from(self.read_u8()?) + 1, 0),
            marker::EXT16 => (usize::from(u16::from_be_bytes(self.read_array()?)) + 1, 0),
            marker::EXT32 => ((u32::from_be_bytes(self.read_array()?) as usize).saturating_add(1), 0),
            marker::UINT8 | marker::INT8 => (1, 0),
            marker::UINT16 | marker::INT16 => (2, 0),
            marker::UINT32 | marker::INT32 | marker::FLOAT32 => (4, 0),
            marker::UINT64 | marker::INT64 | marker::FLOAT64 => (8, 0),
            marker::FIXEXT1 => (2, 0),
            marker::FIXEXT2 => (3, 0),
            marker::FIXEXT4 => (5, 0),
            marker::FIXEXT8 => (9, 0),
            marker::FIXEXT16 => (17, 0),
            marker::ARRAY16 => (0, usize::from(u16::from_be_bytes(self.read_array()?))),
            marker::ARRAY32 => (0, u32::from_be_bytes(self.read_array()?) as usize),
            marker::MAP16 => (0, usize::from(u16::from_be_bytes(self.read_array()?)) * 2),
            marker::MAP32 => (0, (u32::from_be_bytes(self.read_array()?) as usize).saturating_mul(2)),
            found => {
                return Err(WireError::UnexpectedMarker {
                    expected: "value",
                    found,
                })
            }
        };

        self.take(skip_bytes)?;
        for _ in 0..children {
            self.skip_nested(depth + 1)?;
        }
        Ok(())
    }

    // ===== RAW READS =====

    fn read_signed_body(&mut self, m: u8) -> Result<i64, WireError> {
        match m {
            marker::INT8 => Ok(i64::from(self.read_u8()? as i8)),
            marker::INT16 => Ok(i64::from(i16::from_be_bytes(self.read_array()?))),
            marker::INT32 => Ok(i64::from(i32::from_be_bytes(self.read_array()?))),
            marker::INT64 => Ok(i64::from_be_bytes(self.read_array()?)),
            _ => Ok(i64::from(m as i8)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(WireError::Truncated {
                needed: n,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(bytes: &[u8]) -> Decoder<'_> {
        Decoder::new(bytes, EntityTagging::default())
    }

    #[test]
    fn test_read_integers() {
        assert_eq!(decoder(&[0x05]).read_u64().unwrap(), 5);
        assert_eq!(decoder(&[0xcd, 0x01, 0x2c]).read_u64().unwrap(), 300);
        assert_eq!(decoder(&[0xd0, 0x05]).read_u64().unwrap(), 5);
        assert_eq!(decoder(&[0xff]).read_i64().unwrap(), -1);
        assert_eq!(decoder(&[0xd0, 0xdf]).read_i8().unwrap(), -33);
        assert_eq!(decoder(&[0xcc, 0x01]).read_i8().unwrap(), 1);
    }

    #[test]
    fn test_integer_overflow() {
        assert_eq!(decoder(&[0xff]).read_u64(), Err(WireError::IntegerOverflow));
        assert_eq!(decoder(&[0xcd, 0x01, 0x2c]).read_i8(), Err(WireError::IntegerOverflow));
    }

    #[test]
    fn test_read_str_rejects_bad_utf8() {
        assert_eq!(decoder(&[0xa2, 0xff, 0xfe]).read_str(), Err(WireError::InvalidUtf8));
        assert_eq!(decoder(&[0xa2, b'h', b'i']).read_str().unwrap(), "hi");
    }

    #[test]
    fn test_nil_bin_is_empty() {
        assert!(decoder(&[0xc0]).read_bin().unwrap().is_empty());
        assert_eq!(decoder(&[0xa1, b'x']).read_bin().unwrap(), b"x".to_vec());
    }

    #[test]
    fn test_truncated() {
        assert_eq!(
            decoder(&[0xa5, b'a']).read_str(),
            Err(WireError::Truncated {
                needed: 5,
                remaining: 1
            })
        );
        assert!(matches!(decoder(&[]).read_bool(), Err(WireError::Truncated { .. })));
        assert!(matches!(
            decoder(&[0xcf, 0x00]).read_u64(),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unexpected_marker() {
        assert_eq!(
            decoder(&[0xa1, b'x']).read_map_len(),
            Err(WireError::UnexpectedMarker {
                expected: "map",
                found: 0xa1
            })
        );
        assert!(matches!(
            decoder(&[0xc1]).skip(),
            Err(WireError::UnexpectedMarker { found: 0xc1, .. })
        ));
    }

    #[test]
    fn test_skip_nested_values() {
        // {"k": [1, "x", {"n": nil}]} followed by 0x07
        let bytes = [
            0x81, 0xa1, b'k', 0x93, 0x01, 0xa1, b'x', 0x81, 0xa1, b'n', 0xc0, 0x07,
        ];
        let mut dec = decoder(&bytes);
        dec.skip().unwrap();
        assert_eq!(dec.read_u64().unwrap(), 7);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_skip_ext_and_floats() {
        let bytes = [0xd4, 0x01, 0xaa, 0xcb, 0, 0, 0, 0, 0, 0, 0, 0, 0xc7, 0x02, 0x05, 0x01, 0x02];
        let mut dec = decoder(&bytes);
        dec.skip().unwrap();
        dec.skip().unwrap();
        dec.skip().unwrap();
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_skip_depth_limit() {
        let mut bytes = vec![0x91; MAX_NESTING_DEPTH + 2];
        bytes.push(0xc0);
        assert_eq!(decoder(&bytes).skip(), Err(WireError::NestingTooDeep));
    }

    #[test]
    fn test_try_read_nil_only_consumes_nil() {
        let bytes = [0xc0, 0x01];
        let mut dec = decoder(&bytes);
        assert!(dec.try_read_nil().unwrap());
        assert!(!dec.try_read_nil().unwrap());
        assert_eq!(dec.read_u64().unwrap(), 1);
    }
}
