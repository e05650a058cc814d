//! LDAP extended operations (RFC 4511 Section 4.12) and intermediate
//! responses (RFC 3771 / RFC 4511 Section 4.13).
//!
//! This module holds the generic wire envelopes plus the typed operations
//! this library implements:
//!
//! - [`collect_support_data`] - stream a server diagnostic archive to the
//!   client in fragments
//! - [`revoke_totp`] - revoke TOTP shared secrets for an account
//!
//! Typed requests convert to and from the generic [`ExtendedRequest`] via
//! `to_extended_request()` / `from_extended_request()`; the typed
//! intermediate responses do the same against [`IntermediateResponse`].

pub mod collect_support_data;
pub mod revoke_totp;

use crate::ber::{tag, Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::message::LdapResult;
use bytes::Bytes;
use zeroize::Zeroizing;

/// Secret request material (passphrases, passwords, shared secrets).
///
/// The backing buffer is zeroed on drop, and `Debug` never prints the
/// contents.
#[derive(Clone)]
pub struct Secret {
    inner: Zeroizing<Vec<u8>>,
}

impl Secret {
    /// Create from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Zeroizing::new(bytes.into()),
        }
    }

    /// The secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<&[u8]> for Secret {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.inner[..] == other.inner[..]
    }
}

impl Eq for Secret {}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Generic extended request:
/// `[APPLICATION 23] SEQUENCE { requestName [0], requestValue [1] OPTIONAL }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRequest {
    /// Operation OID.
    pub oid: Box<str>,
    /// Raw request value, if the operation defines one.
    pub value: Option<Bytes>,
}

impl ExtendedRequest {
    const TAG_NAME: u8 = tag::context(0);
    const TAG_VALUE: u8 = tag::context(1);

    /// Create a request without a value.
    pub fn new(oid: impl Into<Box<str>>) -> Self {
        Self {
            oid: oid.into(),
            value: None,
        }
    }

    /// Attach a request value.
    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::ldap::EXTENDED_REQUEST, |buf| {
            if let Some(value) = &self.value {
                buf.push_octet_string_with_tag(Self::TAG_VALUE, value);
            }
            buf.push_octet_string_with_tag(Self::TAG_NAME, self.oid.as_bytes());
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_constructed(tag::ldap::EXTENDED_REQUEST)?;

        let len = seq.expect_tag(Self::TAG_NAME)?;
        let oid = seq.read_string_value(len)?.into_boxed_str();

        let mut value = None;
        if seq.peek_tag() == Some(Self::TAG_VALUE) {
            let len = seq.expect_tag(Self::TAG_VALUE)?;
            value = Some(seq.read_bytes(len)?);
        }
        seq.expect_end()?;

        Ok(ExtendedRequest { oid, value })
    }
}

/// Generic extended response:
/// `[APPLICATION 24] SEQUENCE { COMPONENTS OF LDAPResult, responseName [10]
/// OPTIONAL, responseValue [11] OPTIONAL }`.
#[derive(Debug, Clone)]
pub struct ExtendedResponse {
    /// Result components.
    pub result: LdapResult,
    /// Response OID, when the server names the operation.
    pub oid: Option<Box<str>>,
    /// Raw response value, if any.
    pub value: Option<Bytes>,
}

impl ExtendedResponse {
    const TAG_NAME: u8 = tag::context(10);
    const TAG_VALUE: u8 = tag::context(11);

    /// Create a response carrying only a result.
    pub fn with_result(result: LdapResult) -> Self {
        Self {
            result,
            oid: None,
            value: None,
        }
    }

    /// Set the response OID.
    pub fn named(mut self, oid: impl Into<Box<str>>) -> Self {
        self.oid = Some(oid.into());
        self
    }

    /// Attach a response value.
    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::ldap::EXTENDED_RESPONSE, |buf| {
            if let Some(value) = &self.value {
                buf.push_octet_string_with_tag(Self::TAG_VALUE, value);
            }
            if let Some(oid) = &self.oid {
                buf.push_octet_string_with_tag(Self::TAG_NAME, oid.as_bytes());
            }
            self.result.encode_components(buf);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_constructed(tag::ldap::EXTENDED_RESPONSE)?;
        let result = LdapResult::decode_components(&mut seq)?;

        let mut oid = None;
        let mut value = None;
        while let Some(field_tag) = seq.peek_tag() {
            match field_tag {
                t if t == Self::TAG_NAME => {
                    let len = seq.expect_tag(Self::TAG_NAME)?;
                    oid = Some(seq.read_string_value(len)?.into_boxed_str());
                }
                t if t == Self::TAG_VALUE => {
                    let len = seq.expect_tag(Self::TAG_VALUE)?;
                    value = Some(seq.read_bytes(len)?);
                }
                _ => seq.skip_tlv()?,
            }
        }

        Ok(ExtendedResponse { result, oid, value })
    }
}

/// Intermediate response:
/// `[APPLICATION 25] SEQUENCE { responseName [0] OPTIONAL, responseValue [1]
/// OPTIONAL }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateResponse {
    /// Response OID identifying the kind of intermediate message.
    pub oid: Option<Box<str>>,
    /// Raw response value.
    pub value: Option<Bytes>,
}

impl IntermediateResponse {
    const TAG_NAME: u8 = tag::context(0);
    const TAG_VALUE: u8 = tag::context(1);

    /// Create an intermediate response with an OID and value.
    pub fn new(oid: impl Into<Box<str>>, value: impl Into<Bytes>) -> Self {
        Self {
            oid: Some(oid.into()),
            value: Some(value.into()),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::ldap::INTERMEDIATE_RESPONSE, |buf| {
            if let Some(value) = &self.value {
                buf.push_octet_string_with_tag(Self::TAG_VALUE, value);
            }
            if let Some(oid) = &self.oid {
                buf.push_octet_string_with_tag(Self::TAG_NAME, oid.as_bytes());
            }
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_constructed(tag::ldap::INTERMEDIATE_RESPONSE)?;

        let mut oid = None;
        let mut value = None;
        while let Some(field_tag) = seq.peek_tag() {
            match field_tag {
                t if t == Self::TAG_NAME => {
                    let len = seq.expect_tag(Self::TAG_NAME)?;
                    oid = Some(seq.read_string_value(len)?.into_boxed_str());
                }
                t if t == Self::TAG_VALUE => {
                    let len = seq.expect_tag(Self::TAG_VALUE)?;
                    value = Some(seq.read_bytes(len)?);
                }
                _ => seq.skip_tlv()?,
            }
        }

        Ok(IntermediateResponse { oid, value })
    }
}

/// Require that a response names the expected OID (absent names are
/// tolerated; a different OID is an error).
pub(crate) fn check_response_oid(actual: Option<&str>, expected: &str, offset: usize) -> Result<()> {
    match actual {
        None => Ok(()),
        Some(oid) if oid == expected => Ok(()),
        Some(oid) => {
            tracing::debug!(
                target: "async_ldap::extop",
                expected,
                actual = oid,
                "extended operation OID mismatch"
            );
            Err(Error::decode(offset, DecodeErrorKind::OidMismatch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;

    fn roundtrip_request(req: ExtendedRequest) -> ExtendedRequest {
        let mut buf = EncodeBuf::new();
        req.encode(&mut buf);
        let mut dec = Decoder::new(buf.finish());
        ExtendedRequest::decode(&mut dec).unwrap()
    }

    #[test]
    fn test_request_without_value() {
        // StartTLS-shaped request: OID only
        let req = ExtendedRequest::new("1.3.6.1.4.1.1466.20037");
        assert_eq!(roundtrip_request(req.clone()), req);
    }

    #[test]
    fn test_request_with_value() {
        let req = ExtendedRequest::new("1.3.6.1.4.1.30221.2.6.64").with_value(&b"\x30\x00"[..]);
        assert_eq!(roundtrip_request(req.clone()), req);
    }

    #[test]
    fn test_request_wire_form() {
        let req = ExtendedRequest::new("1.2.3").with_value(&b"v"[..]);
        let mut buf = EncodeBuf::new();
        req.encode(&mut buf);
        assert_eq!(
            buf.finish().to_vec(),
            vec![0x77, 0x0A, 0x80, 0x05, b'1', b'.', b'2', b'.', b'3', 0x81, 0x01, b'v']
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let resp = ExtendedResponse::with_result(LdapResult::with_code(
            ResultCode::UnwillingToPerform,
            "support data collection disabled",
        ))
        .named("1.3.6.1.4.1.30221.2.6.67")
        .with_value(&b"\x04\x00"[..]);

        let mut buf = EncodeBuf::new();
        resp.encode(&mut buf);
        let mut dec = Decoder::new(buf.finish());
        let decoded = ExtendedResponse::decode(&mut dec).unwrap();

        assert_eq!(decoded.result.result_code, ResultCode::UnwillingToPerform);
        assert_eq!(decoded.oid.as_deref(), Some("1.3.6.1.4.1.30221.2.6.67"));
        assert_eq!(decoded.value.as_deref(), Some(&b"\x04\x00"[..]));
    }

    #[test]
    fn test_response_unknown_field_skipped() {
        // A response with an extra context-tagged field after the value
        let mut buf = EncodeBuf::new();
        buf.push_constructed(tag::ldap::EXTENDED_RESPONSE, |buf| {
            buf.push_octet_string_with_tag(0x8C, b"future");
            buf.push_octet_string_with_tag(0x8A, b"1.2.3");
            buf.push_str("");
            buf.push_str("");
            buf.push_enumerated(0);
        });
        let mut dec = Decoder::new(buf.finish());
        let decoded = ExtendedResponse::decode(&mut dec).unwrap();
        assert_eq!(decoded.oid.as_deref(), Some("1.2.3"));
        assert!(decoded.value.is_none());
    }

    #[test]
    fn test_intermediate_roundtrip() {
        let ir = IntermediateResponse::new("1.3.6.1.4.1.30221.2.6.66", &b"chunk"[..]);
        let mut buf = EncodeBuf::new();
        ir.encode(&mut buf);
        let mut dec = Decoder::new(buf.finish());
        assert_eq!(IntermediateResponse::decode(&mut dec).unwrap(), ir);
    }

    #[test]
    fn test_intermediate_empty() {
        let ir = IntermediateResponse {
            oid: None,
            value: None,
        };
        let mut buf = EncodeBuf::new();
        ir.encode(&mut buf);
        let encoded = buf.finish();
        assert_eq!(&encoded[..], &[0x79, 0x00]);
        let mut dec = Decoder::new(encoded);
        assert_eq!(IntermediateResponse::decode(&mut dec).unwrap(), ir);
    }

    #[test]
    fn test_check_response_oid() {
        assert!(check_response_oid(None, "1.2.3", 0).is_ok());
        assert!(check_response_oid(Some("1.2.3"), "1.2.3", 0).is_ok());
        assert!(check_response_oid(Some("1.2.4"), "1.2.3", 0).is_err());
    }
}
