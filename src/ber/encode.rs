//! BER encoding.
//!
//! [`EncodeBuf`] builds messages back-to-front: callers push the innermost
//! (last) element first, so every constructed type knows its content length
//! by the time its header is written. This yields single-pass, single-buffer
//! encoding with no length back-patching. `finish()` reverses the buffer
//! once to produce the wire form.
//!
//! Field order inside [`push_constructed`](EncodeBuf::push_constructed)
//! closures is therefore the REVERSE of the ASN.1 definition order.

use super::length::encode_length;
use super::tag;
use bytes::Bytes;

/// BER encoder that builds output in reverse.
pub struct EncodeBuf {
    // Bytes in reverse wire order.
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create an empty encode buffer.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    /// Create with a capacity hint for the final message size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes pushed so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether anything has been pushed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Push a single tag byte.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Push a length field.
    pub fn push_length(&mut self, len: usize) {
        let (bytes, n) = encode_length(len);
        // encode_length returns bytes already reversed for prepending
        self.buf.extend_from_slice(&bytes[..n]);
    }

    /// Push raw bytes (content only, no header).
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().rev());
    }

    /// Push an INTEGER with minimal two's-complement content.
    pub fn push_integer(&mut self, value: i32) {
        self.push_integer_with_tag(tag::universal::INTEGER, value);
    }

    /// Push an ENUMERATED.
    pub fn push_enumerated(&mut self, value: i32) {
        self.push_integer_with_tag(tag::universal::ENUMERATED, value);
    }

    /// Push an integer body under an arbitrary tag (context-tagged INTEGER
    /// or ENUMERATED).
    pub fn push_integer_with_tag(&mut self, tag: u8, value: i32) {
        let be = value.to_be_bytes();

        // Strip redundant sign-extension octets, keeping at least one byte
        // and keeping the sign bit of the first retained byte correct.
        let sign_fill: u8 = if value < 0 { 0xFF } else { 0x00 };
        let mut start = 0;
        while start < be.len() - 1
            && be[start] == sign_fill
            && (be[start + 1] & 0x80) == (sign_fill & 0x80)
        {
            start += 1;
        }

        let content = &be[start..];
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Push a 64-bit integer body under an arbitrary tag.
    pub fn push_integer64_with_tag(&mut self, tag: u8, value: i64) {
        let be = value.to_be_bytes();

        let sign_fill: u8 = if value < 0 { 0xFF } else { 0x00 };
        let mut start = 0;
        while start < be.len() - 1
            && be[start] == sign_fill
            && (be[start + 1] & 0x80) == (sign_fill & 0x80)
        {
            start += 1;
        }

        let content = &be[start..];
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Push a BOOLEAN (0xFF for TRUE per X.690 11.1).
    pub fn push_boolean(&mut self, value: bool) {
        self.push_boolean_with_tag(tag::universal::BOOLEAN, value);
    }

    /// Push a boolean body under an arbitrary tag.
    pub fn push_boolean_with_tag(&mut self, tag: u8, value: bool) {
        self.buf.push(if value { 0xFF } else { 0x00 });
        self.push_length(1);
        self.push_tag(tag);
    }

    /// Push an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_octet_string_with_tag(tag::universal::OCTET_STRING, data);
    }

    /// Push octet-string content under an arbitrary tag (LDAP's context-tagged
    /// strings are IMPLICIT OCTET STRING).
    pub fn push_octet_string_with_tag(&mut self, tag: u8, data: &[u8]) {
        self.push_bytes(data);
        self.push_length(data.len());
        self.push_tag(tag);
    }

    /// Push a UTF-8 string as an OCTET STRING.
    pub fn push_str(&mut self, s: &str) {
        self.push_octet_string(s.as_bytes());
    }

    /// Push a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Push a SEQUENCE whose content is produced by the closure.
    ///
    /// The closure must push fields in reverse definition order.
    pub fn push_sequence(&mut self, f: impl FnOnce(&mut Self)) {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Push a constructed element with the given tag.
    ///
    /// The closure must push fields in reverse definition order.
    pub fn push_constructed(&mut self, tag: u8, f: impl FnOnce(&mut Self)) {
        let before = self.buf.len();
        f(self);
        let content_len = self.buf.len() - before;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Finish encoding and return the wire bytes.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::Decoder;

    fn finish(buf: EncodeBuf) -> Vec<u8> {
        buf.finish().to_vec()
    }

    #[test]
    fn test_encode_integer_minimal() {
        let cases: &[(i32, &[u8])] = &[
            (0, &[0x02, 0x01, 0x00]),
            (127, &[0x02, 0x01, 0x7F]),
            (128, &[0x02, 0x02, 0x00, 0x80]),
            (256, &[0x02, 0x02, 0x01, 0x00]),
            (-1, &[0x02, 0x01, 0xFF]),
            (-128, &[0x02, 0x01, 0x80]),
            (-129, &[0x02, 0x02, 0xFF, 0x7F]),
            (i32::MAX, &[0x02, 0x04, 0x7F, 0xFF, 0xFF, 0xFF]),
            (i32::MIN, &[0x02, 0x04, 0x80, 0x00, 0x00, 0x00]),
        ];
        for (value, expected) in cases {
            let mut buf = EncodeBuf::new();
            buf.push_integer(*value);
            assert_eq!(&finish(buf), expected, "encoding {}", value);
        }
    }

    #[test]
    fn test_encode_boolean() {
        let mut buf = EncodeBuf::new();
        buf.push_boolean(true);
        assert_eq!(finish(buf), vec![0x01, 0x01, 0xFF]);

        let mut buf = EncodeBuf::new();
        buf.push_boolean(false);
        assert_eq!(finish(buf), vec![0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_encode_octet_string() {
        let mut buf = EncodeBuf::new();
        buf.push_str("hi");
        assert_eq!(finish(buf), vec![0x04, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_encode_null() {
        let mut buf = EncodeBuf::new();
        buf.push_null();
        assert_eq!(finish(buf), vec![0x05, 0x00]);
    }

    #[test]
    fn test_encode_sequence_reverse_order() {
        // SEQUENCE { INTEGER 1, INTEGER 2 }: fields pushed 2 first, then 1
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_integer(2);
            buf.push_integer(1);
        });
        assert_eq!(
            finish(buf),
            vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn test_encode_nested_constructed() {
        let mut buf = EncodeBuf::new();
        buf.push_constructed(0xA0, |buf| {
            buf.push_sequence(|buf| {
                buf.push_str("x");
            });
        });
        assert_eq!(finish(buf), vec![0xA0, 0x05, 0x30, 0x03, 0x04, 0x01, b'x']);
    }

    #[test]
    fn test_long_form_length() {
        let payload = vec![0xAB; 200];
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(&payload);
        let out = finish(buf);
        assert_eq!(&out[..3], &[0x04, 0x81, 200]);
        assert_eq!(out.len(), 203);
    }

    #[test]
    fn test_roundtrip_through_decoder() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string_with_tag(0x80, b"tagged");
            buf.push_boolean(true);
            buf.push_enumerated(2);
            buf.push_integer(-12345);
        });

        let mut dec = Decoder::new(buf.finish());
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), -12345);
        assert_eq!(seq.read_enumerated().unwrap(), 2);
        assert!(seq.read_boolean().unwrap());
        let len = seq.expect_tag(0x80).unwrap();
        assert_eq!(&seq.read_bytes(len).unwrap()[..], b"tagged");
        seq.expect_end().unwrap();
    }
}
