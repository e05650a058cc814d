//! LDAP message framing (RFC 4511 Section 4.1.1).
//!
//! `LDAPMessage ::= SEQUENCE { messageID INTEGER (0 .. maxInt), protocolOp
//! CHOICE { ... }, controls [0] Controls OPTIONAL }`
//!
//! The protocol-op CHOICE here covers what an extended-operation client
//! needs: bind, unbind, and the three extended-operation envelopes. Ops this
//! library does not model decode to [`ProtocolOp::Unknown`] with their raw
//! content preserved.

mod control;

pub use control::Control;
pub(crate) use control::{decode_controls, encode_controls};

use crate::ber::{tag, Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result, ResultCode};
use crate::extop::{ExtendedRequest, ExtendedResponse, IntermediateResponse};
use bytes::Bytes;

/// Message ID reserved for unsolicited notifications (RFC 4511 Section 4.4).
pub const UNSOLICITED_MESSAGE_ID: i32 = 0;

/// OID of the notice-of-disconnection unsolicited notification.
pub const NOTICE_OF_DISCONNECTION_OID: &str = "1.3.6.1.4.1.1466.20036";

/// A complete LDAP message envelope.
#[derive(Debug, Clone)]
pub struct LdapMessage {
    /// Message ID correlating requests with responses.
    pub message_id: i32,
    /// The operation carried by this message.
    pub op: ProtocolOp,
    /// Attached controls (empty when absent).
    pub controls: Vec<Control>,
}

impl LdapMessage {
    /// Create a message without controls.
    pub fn new(message_id: i32, op: ProtocolOp) -> Self {
        Self {
            message_id,
            op,
            controls: Vec::new(),
        }
    }

    /// Whether this is an unsolicited notification (message ID 0).
    pub fn is_unsolicited(&self) -> bool {
        self.message_id == UNSOLICITED_MESSAGE_ID
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            encode_controls(buf, &self.controls);
            self.op.encode(buf);
            buf.push_integer(self.message_id);
        });
        buf.finish()
    }

    /// Decode from BER.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;

        let message_id = seq.read_integer()?;
        if seq.is_empty() {
            return Err(Error::decode(
                seq.offset(),
                DecodeErrorKind::MissingProtocolOp,
            ));
        }
        let op = ProtocolOp::decode(&mut seq)?;
        let controls = decode_controls(&mut seq)?;
        seq.expect_end()?;

        Ok(LdapMessage {
            message_id,
            op,
            controls,
        })
    }
}

/// The protocol-op CHOICE.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ProtocolOp {
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    UnbindRequest,
    ExtendedRequest(ExtendedRequest),
    ExtendedResponse(ExtendedResponse),
    IntermediateResponse(IntermediateResponse),
    /// An op this library does not model, preserved for forward compatibility.
    Unknown { tag: u8, data: Bytes },
}

impl ProtocolOp {
    /// The application-class tag this op encodes with.
    pub fn wire_tag(&self) -> u8 {
        match self {
            Self::BindRequest(_) => tag::ldap::BIND_REQUEST,
            Self::BindResponse(_) => tag::ldap::BIND_RESPONSE,
            Self::UnbindRequest => tag::ldap::UNBIND_REQUEST,
            Self::ExtendedRequest(_) => tag::ldap::EXTENDED_REQUEST,
            Self::ExtendedResponse(_) => tag::ldap::EXTENDED_RESPONSE,
            Self::IntermediateResponse(_) => tag::ldap::INTERMEDIATE_RESPONSE,
            Self::Unknown { tag, .. } => *tag,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Self::BindRequest(op) => op.encode(buf),
            Self::BindResponse(op) => op.encode(buf),
            Self::UnbindRequest => {
                // [APPLICATION 2] NULL - primitive with empty content
                buf.push_length(0);
                buf.push_tag(tag::ldap::UNBIND_REQUEST);
            }
            Self::ExtendedRequest(op) => op.encode(buf),
            Self::ExtendedResponse(op) => op.encode(buf),
            Self::IntermediateResponse(op) => op.encode(buf),
            Self::Unknown { tag, data } => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(*tag);
            }
        }
    }

    /// Decode from BER, dispatching on the op tag.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let op_tag = decoder
            .peek_tag()
            .ok_or_else(|| Error::decode(decoder.offset(), DecodeErrorKind::TruncatedData))?;

        match op_tag {
            tag::ldap::BIND_REQUEST => Ok(Self::BindRequest(BindRequest::decode(decoder)?)),
            tag::ldap::BIND_RESPONSE => Ok(Self::BindResponse(BindResponse::decode(decoder)?)),
            tag::ldap::UNBIND_REQUEST => {
                let tag = decoder.read_tag()?;
                debug_assert_eq!(tag, tag::ldap::UNBIND_REQUEST);
                let len = decoder.read_length()?;
                if len != 0 {
                    return Err(Error::decode(decoder.offset(), DecodeErrorKind::InvalidNull));
                }
                Ok(Self::UnbindRequest)
            }
            tag::ldap::EXTENDED_REQUEST => {
                Ok(Self::ExtendedRequest(ExtendedRequest::decode(decoder)?))
            }
            tag::ldap::EXTENDED_RESPONSE => {
                Ok(Self::ExtendedResponse(ExtendedResponse::decode(decoder)?))
            }
            tag::ldap::INTERMEDIATE_RESPONSE => Ok(Self::IntermediateResponse(
                IntermediateResponse::decode(decoder)?,
            )),
            other => {
                tracing::debug!(
                    target: "async_ldap::message",
                    op_tag = other,
                    "unmodeled protocol op"
                );
                let tag = decoder.read_tag()?;
                let len = decoder.read_length()?;
                let data = decoder.read_bytes(len)?;
                Ok(Self::Unknown { tag, data })
            }
        }
    }
}

/// The result components shared by LDAP response operations
/// (RFC 4511 Section 4.1.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapResult {
    /// Outcome of the operation.
    pub result_code: ResultCode,
    /// DN of the closest existing ancestor for naming errors; otherwise empty.
    pub matched_dn: String,
    /// Human-readable detail; often empty on success.
    pub diagnostic_message: String,
    /// Referral URLs ([3], present only with code `referral`).
    pub referral_urls: Vec<String>,
}

impl LdapResult {
    /// A bare success result.
    pub fn success() -> Self {
        Self {
            result_code: ResultCode::Success,
            matched_dn: String::new(),
            diagnostic_message: String::new(),
            referral_urls: Vec::new(),
        }
    }

    /// A result with the given code and diagnostic message.
    pub fn with_code(result_code: ResultCode, diagnostic_message: impl Into<String>) -> Self {
        Self {
            result_code,
            matched_dn: String::new(),
            diagnostic_message: diagnostic_message.into(),
            referral_urls: Vec::new(),
        }
    }

    /// Whether the result code indicates success.
    pub fn is_success(&self) -> bool {
        self.result_code.is_success()
    }

    /// Encode the result components (no enclosing header; responses embed
    /// these directly).
    pub(crate) fn encode_components(&self, buf: &mut EncodeBuf) {
        if !self.referral_urls.is_empty() {
            buf.push_constructed(tag::ldap::REFERRAL, |buf| {
                for url in self.referral_urls.iter().rev() {
                    buf.push_str(url);
                }
            });
        }
        buf.push_str(&self.diagnostic_message);
        buf.push_str(&self.matched_dn);
        buf.push_enumerated(self.result_code.as_i32());
    }

    /// Decode the result components from a response body.
    pub(crate) fn decode_components(seq: &mut Decoder) -> Result<Self> {
        let result_code = ResultCode::from_i32(seq.read_enumerated()?);
        let matched_dn = seq.read_string()?;
        let diagnostic_message = seq.read_string()?;

        let mut referral_urls = Vec::new();
        if seq.peek_tag() == Some(tag::ldap::REFERRAL) {
            let mut referral = seq.read_constructed(tag::ldap::REFERRAL)?;
            while !referral.is_empty() {
                referral_urls.push(referral.read_string()?);
            }
        }

        Ok(LdapResult {
            result_code,
            matched_dn,
            diagnostic_message,
            referral_urls,
        })
    }
}

/// Simple bind request (RFC 4511 Section 4.2).
///
/// Only simple authentication is modeled; this library binds with a DN and
/// password before running extended operations.
#[derive(Debug, Clone)]
pub struct BindRequest {
    /// Protocol version; always 3.
    pub version: i32,
    /// Bind DN (empty for anonymous).
    pub name: String,
    /// Simple authentication password (`[0] OCTET STRING`).
    pub password: Bytes,
}

impl BindRequest {
    /// Simple-bind authentication choice tag.
    const TAG_SIMPLE: u8 = tag::context(0);

    /// Create a v3 simple bind request.
    pub fn simple(name: impl Into<String>, password: impl Into<Bytes>) -> Self {
        Self {
            version: 3,
            name: name.into(),
            password: password.into(),
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::ldap::BIND_REQUEST, |buf| {
            buf.push_octet_string_with_tag(Self::TAG_SIMPLE, &self.password);
            buf.push_str(&self.name);
            buf.push_integer(self.version);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_constructed(tag::ldap::BIND_REQUEST)?;
        let version = seq.read_integer()?;
        let name = seq.read_string()?;

        let auth_tag = seq.read_tag()?;
        if auth_tag != Self::TAG_SIMPLE {
            // SASL and anything else is out of scope for this client
            return Err(Error::decode(
                seq.offset() - 1,
                DecodeErrorKind::UnexpectedTag {
                    expected: Self::TAG_SIMPLE,
                    actual: auth_tag,
                },
            ));
        }
        let len = seq.read_length()?;
        let password = seq.read_bytes(len)?;
        seq.expect_end()?;

        Ok(BindRequest {
            version,
            name,
            password,
        })
    }
}

/// Bind response (RFC 4511 Section 4.2.2).
#[derive(Debug, Clone)]
pub struct BindResponse {
    /// Result components.
    pub result: LdapResult,
    /// Server SASL credentials (`[7]`); absent for simple binds.
    pub server_sasl_creds: Option<Bytes>,
}

impl BindResponse {
    const TAG_SASL_CREDS: u8 = tag::context(7);

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::ldap::BIND_RESPONSE, |buf| {
            if let Some(creds) = &self.server_sasl_creds {
                buf.push_octet_string_with_tag(Self::TAG_SASL_CREDS, creds);
            }
            self.result.encode_components(buf);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_constructed(tag::ldap::BIND_RESPONSE)?;
        let result = LdapResult::decode_components(&mut seq)?;

        let mut server_sasl_creds = None;
        if seq.peek_tag() == Some(Self::TAG_SASL_CREDS) {
            let len = seq.expect_tag(Self::TAG_SASL_CREDS)?;
            server_sasl_creds = Some(seq.read_bytes(len)?);
        }

        Ok(BindResponse {
            result,
            server_sasl_creds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_request_roundtrip() {
        let msg = LdapMessage::new(
            1,
            ProtocolOp::BindRequest(BindRequest::simple(
                "cn=Directory Manager",
                &b"password"[..],
            )),
        );

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded.message_id, 1);
        match decoded.op {
            ProtocolOp::BindRequest(bind) => {
                assert_eq!(bind.version, 3);
                assert_eq!(bind.name, "cn=Directory Manager");
                assert_eq!(&bind.password[..], b"password");
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_bind_response_roundtrip() {
        let msg = LdapMessage::new(
            1,
            ProtocolOp::BindResponse(BindResponse {
                result: LdapResult::with_code(ResultCode::InvalidCredentials, "nope"),
                server_sasl_creds: None,
            }),
        );

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        match decoded.op {
            ProtocolOp::BindResponse(resp) => {
                assert_eq!(resp.result.result_code, ResultCode::InvalidCredentials);
                assert_eq!(resp.result.diagnostic_message, "nope");
                assert!(resp.server_sasl_creds.is_none());
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_unbind_roundtrip() {
        let msg = LdapMessage::new(5, ProtocolOp::UnbindRequest);
        let encoded = msg.encode();
        // 30 05 02 01 05 42 00
        assert_eq!(&encoded[..], &[0x30, 0x05, 0x02, 0x01, 0x05, 0x42, 0x00]);

        let decoded = LdapMessage::decode(encoded).unwrap();
        assert!(matches!(decoded.op, ProtocolOp::UnbindRequest));
    }

    #[test]
    fn test_result_with_referral() {
        let result = LdapResult {
            result_code: ResultCode::Referral,
            matched_dn: "dc=example,dc=com".into(),
            diagnostic_message: String::new(),
            referral_urls: vec![
                "ldap://other.example.com/dc=example,dc=com".into(),
                "ldap://backup.example.com/dc=example,dc=com".into(),
            ],
        };
        let msg = LdapMessage::new(
            7,
            ProtocolOp::BindResponse(BindResponse {
                result: result.clone(),
                server_sasl_creds: None,
            }),
        );

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        match decoded.op {
            ProtocolOp::BindResponse(resp) => assert_eq!(resp.result, result),
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_op_preserved() {
        // SearchRequest (0x63) is not modeled; its content must survive
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_constructed(0x63, |buf| {
                buf.push_str("dc=example");
            });
            buf.push_integer(9);
        });

        let decoded = LdapMessage::decode(buf.finish()).unwrap();
        match &decoded.op {
            ProtocolOp::Unknown { tag, data } => {
                assert_eq!(*tag, 0x63);
                assert_eq!(&data[..2], &[0x04, 0x0A]);
            }
            other => panic!("unexpected op: {:?}", other),
        }

        // And re-encode identically
        let reencoded = decoded.encode();
        let twice = LdapMessage::decode(reencoded).unwrap();
        assert!(matches!(twice.op, ProtocolOp::Unknown { tag: 0x63, .. }));
    }

    #[test]
    fn test_message_with_controls() {
        let mut msg = LdapMessage::new(3, ProtocolOp::UnbindRequest);
        msg.controls.push(Control::critical("2.16.840.1.113730.3.4.2"));

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded.controls.len(), 1);
        assert_eq!(&*decoded.controls[0].oid, "2.16.840.1.113730.3.4.2");
        assert!(decoded.controls[0].criticality);
    }

    #[test]
    fn test_missing_protocol_op_rejected() {
        // SEQUENCE { INTEGER 1 } with no op
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_integer(1);
        });
        let err = LdapMessage::decode(buf.finish()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::MissingProtocolOp,
                ..
            }
        ));
    }

    #[test]
    fn test_unsolicited_id() {
        let msg = LdapMessage::new(0, ProtocolOp::UnbindRequest);
        assert!(msg.is_unsolicited());
        let msg = LdapMessage::new(4, ProtocolOp::UnbindRequest);
        assert!(!msg.is_unsolicited());
    }
}
