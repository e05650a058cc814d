//! BER decoding.
//!
//! Zero-copy decoding using `Bytes` to avoid allocations.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use bytes::Bytes;

/// BER decoder that reads from a byte buffer.
pub struct Decoder {
    data: Bytes,
    offset: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Get the current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next byte without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        if self.offset < self.data.len() {
            Some(self.data[self.offset])
        } else {
            None
        }
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.peek_byte()
    }

    /// Read a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.offset >= self.data.len() {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "truncated data: unexpected end of input");
            return Err(Error::decode(self.offset, DecodeErrorKind::TruncatedData));
        }
        let byte = self.data[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    /// Read a tag byte.
    pub fn read_tag(&mut self) -> Result<u8> {
        self.read_byte()
    }

    /// Read a length.
    pub fn read_length(&mut self) -> Result<usize> {
        let (len, consumed) = decode_length(&self.data[self.offset..], self.offset)?;
        self.offset += consumed;
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        // Saturating add so a hostile length cannot overflow past the bounds check
        if self.offset.saturating_add(len) > self.data.len() {
            tracing::debug!(
                target: "async_ldap::ber",
                offset = self.offset,
                needed = len,
                available = self.remaining(),
                "insufficient data"
            );
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::InsufficientData {
                    needed: len,
                    available: self.remaining(),
                },
            ));
        }
        let bytes = self.data.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }

    /// Read and expect a specific tag, returning the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let tag = self.read_tag()?;
        if tag != expected {
            tracing::debug!(
                target: "async_ldap::ber",
                offset = self.offset - 1,
                expected,
                actual = tag,
                "unexpected tag"
            );
            return Err(Error::decode(
                self.offset - 1,
                DecodeErrorKind::UnexpectedTag {
                    expected,
                    actual: tag,
                },
            ));
        }
        self.read_length()
    }

    /// Read a BER INTEGER (signed, 32-bit).
    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Read an ENUMERATED value.
    pub fn read_enumerated(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::ENUMERATED)?;
        self.read_integer_value(len)
    }

    /// Read an integer body given the length.
    ///
    /// Non-minimal encodings are accepted; values longer than 4 significant
    /// bytes are rejected (LDAP integers fit in 32 bits).
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "zero-length integer");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::ZeroLengthPrimitive,
            ));
        }

        let bytes = self.read_bytes(len)?;

        // Tolerate redundant leading sign-extension octets, reject real overflow.
        // A fill octet is redundant only when the next octet carries the same sign bit.
        let sign_fill: u8 = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut significant = 0;
        while significant < bytes.len() - 1
            && bytes[significant] == sign_fill
            && (bytes[significant + 1] & 0x80) == (sign_fill & 0x80)
        {
            significant += 1;
        }
        if bytes.len() - significant > 4 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, length = len, "integer too long");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::IntegerTooLong { length: len },
            ));
        }

        // Sign extend
        let is_negative = bytes[0] & 0x80 != 0;
        let mut value: i32 = if is_negative { -1 } else { 0 };
        for &byte in bytes.iter().skip(significant) {
            value = (value << 8) | (byte as i32);
        }

        Ok(value)
    }

    /// Read a 64-bit integer body given the length.
    ///
    /// Used for values that can exceed 32 bits (archive sizes).
    pub fn read_integer64_value(&mut self, len: usize) -> Result<i64> {
        if len == 0 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "zero-length integer");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::ZeroLengthPrimitive,
            ));
        }

        let bytes = self.read_bytes(len)?;

        let sign_fill: u8 = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut significant = 0;
        while significant < bytes.len() - 1
            && bytes[significant] == sign_fill
            && (bytes[significant + 1] & 0x80) == (sign_fill & 0x80)
        {
            significant += 1;
        }
        if bytes.len() - significant > 8 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, length = len, "integer too long");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::IntegerTooLong { length: len },
            ));
        }

        let is_negative = bytes[0] & 0x80 != 0;
        let mut value: i64 = if is_negative { -1 } else { 0 };
        for &byte in bytes.iter().skip(significant) {
            value = (value << 8) | (byte as i64);
        }

        Ok(value)
    }

    /// Read a BOOLEAN.
    ///
    /// Any nonzero content octet decodes as TRUE (X.690 8.2.2).
    pub fn read_boolean(&mut self) -> Result<bool> {
        let len = self.expect_tag(tag::universal::BOOLEAN)?;
        self.read_boolean_value(len)
    }

    /// Read a boolean body given the length.
    pub fn read_boolean_value(&mut self, len: usize) -> Result<bool> {
        if len != 1 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, length = len, "invalid BOOLEAN length");
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::InvalidBooleanLength { length: len },
            ));
        }
        Ok(self.read_byte()? != 0)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    /// Read an OCTET STRING that must hold UTF-8 (LDAPString, LDAPOID, LDAPDN).
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_octet_string()?;
        self.into_utf8(bytes)
    }

    /// Read a UTF-8 string body given a pre-read length.
    pub fn read_string_value(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        self.into_utf8(bytes)
    }

    fn into_utf8(&self, bytes: Bytes) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "string value is not valid UTF-8");
            Error::decode(self.offset, DecodeErrorKind::InvalidUtf8)
        })
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let len = self.expect_tag(tag::universal::NULL)?;
        if len != 0 {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "NULL with non-zero length");
            return Err(Error::decode(self.offset, DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }

    /// Read a SEQUENCE, returning a decoder for its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed type with a specific tag, returning a decoder for its contents.
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        let content = self.read_bytes(len)?;
        Ok(Decoder {
            data: content,
            offset: 0,
        })
    }

    /// Skip a TLV (tag-length-value) without parsing.
    pub fn skip_tlv(&mut self) -> Result<()> {
        let _tag = self.read_tag()?;
        let len = self.read_length()?;
        // Check BEFORE moving the offset so overflow cannot land us past the end
        let new_offset = self.offset.saturating_add(len);
        if new_offset > self.data.len() {
            tracing::debug!(target: "async_ldap::ber", offset = self.offset, "TLV extends past end of data");
            return Err(Error::decode(self.offset, DecodeErrorKind::TlvOverflow));
        }
        self.offset = new_offset;
        Ok(())
    }

    /// Create a sub-decoder for a portion of the remaining data.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        let content = self.read_bytes(len)?;
        Ok(Decoder {
            data: content,
            offset: 0,
        })
    }

    /// Require that the decoder is exhausted.
    ///
    /// Used after decoding a complete value to reject trailing garbage.
    pub fn expect_end(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::decode(
                self.offset,
                DecodeErrorKind::TrailingData {
                    remaining: self.remaining(),
                },
            ));
        }
        Ok(())
    }

    /// Get the underlying bytes for the entire buffer.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Get remaining data as a slice.
    pub fn remaining_slice(&self) -> &[u8] {
        &self.data[self.offset..]
    }
}
