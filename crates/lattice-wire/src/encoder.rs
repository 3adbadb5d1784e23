//! # Encoder
//!
//! Appends MessagePack values to a growable buffer, always choosing the
//! smallest representation.

use crate::marker;
use crate::EntityTagging;

/// MessagePack writer.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
    tagging: EntityTagging,
}

impl Encoder {
    /// Empty encoder.
    pub fn new(tagging: EntityTagging) -> Self {
        Self {
            buf: Vec::new(),
            tagging,
        }
    }

    /// Entity tagging in effect.
    pub fn tagging(&self) -> EntityTagging {
        self.tagging
    }

    /// Encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_nil(&mut self) {
        self.buf.push(marker::NIL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf
            .push(if value { marker::TRUE } else { marker::FALSE });
    }

    pub fn write_u64(&mut self, value: u64) {
        if value <= u64::from(marker::POSITIVE_FIXINT_MAX) {
            self.buf.push(value as u8);
        } else if let Ok(v) = u8::try_from(value) {
            self.buf.push(marker::UINT8);
            self.buf.push(v);
        } else if let Ok(v) = u16::try_from(value) {
            self.buf.push(marker::UINT16);
            self.buf.extend_from_slice(&v.to_be_bytes());
        } else if let Ok(v) = u32::try_from(value) {
            self.buf.push(marker::UINT32);
            self.buf.extend_from_slice(&v.to_be_bytes());
        } else {
            self.buf.push(marker::UINT64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    pub fn write_i64(&mut self, value: i64) {
        if let Ok(unsigned) = u64::try_from(value) {
            return self.write_u64(unsigned);
        }
        if value >= -32 {
            // negative fixint keeps the two's complement byte
            self.buf.push(value as i8 as u8);
        } else if let Ok(v) = i8::try_from(value) {
            self.buf.push(marker::INT8);
            self.buf.push(v as u8);
        } else if let Ok(v) = i16::try_from(value) {
            self.buf.push(marker::INT16);
            self.buf.extend_from_slice(&v.to_be_bytes());
        } else if let Ok(v) = i32::try_from(value) {
            self.buf.push(marker::INT32);
            self.buf.extend_from_slice(&v.to_be_bytes());
        } else {
            self.buf.push(marker::INT64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    pub fn write_str(&mut self, value: &str) {
        let len = value.len();
        if len <= 31 {
            self.buf.push(marker::FIXSTR | len as u8);
        } else {
            self.write_sized(len, marker::STR8, marker::STR16, marker::STR32);
        }
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_bin(&mut self, value: &[u8]) {
        self.write_sized(value.len(), marker::BIN8, marker::BIN16, marker::BIN32);
        self.buf.extend_from_slice(value);
    }

    pub fn write_array_len(&mut self, len: usize) {
        if len <= 15 {
            self.buf.push(marker::FIXARRAY | len as u8);
        } else {
            self.write_header(len, marker::ARRAY16, marker::ARRAY32);
        }
    }

    pub fn write_map_len(&mut self, len: usize) {
        if len <= 15 {
            self.buf.push(marker::FIXMAP | len as u8);
        } else {
            self.write_header(len, marker::MAP16, marker::MAP32);
        }
    }

    fn write_sized(&mut self, len: usize, m8: u8, m16: u8, m32: u8) {
        if let Ok(v) = u8::try_from(len) {
            self.buf.push(m8);
            self.buf.push(v);
        } else {
            self.write_header(len, m16, m32);
        }
    }

    fn write_header(&mut self, len: usize, m16: u8, m32: u8) {
        if let Ok(v) = u16::try_from(len) {
            self.buf.push(m16);
            self.buf.extend_from_slice(&v.to_be_bytes());
        } else {
            self.buf.push(m32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
}
