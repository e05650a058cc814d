//! Revoke-TOTP-shared-secret extended operation.
//!
//! Removes one or all TOTP shared secrets from a user account, immediately
//! invalidating the corresponding one-time passwords. The target account is
//! either named explicitly (authentication ID, `u:` or `dn:` form) or
//! defaults to the authorization identity of the connection.

use super::{check_response_oid, ExtendedRequest, Secret};
use crate::ber::{tag, Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use bytes::Bytes;

/// Request OID.
pub const REVOKE_TOTP_SHARED_SECRET_REQUEST_OID: &str = "1.3.6.1.4.1.30221.2.6.58";

/// Revoke-TOTP-shared-secret request.
///
/// # Examples
///
/// ```
/// use async_ldap::extop::revoke_totp::RevokeTotpSharedSecretRequest;
///
/// // Revoke one specific secret for a named user
/// let req = RevokeTotpSharedSecretRequest::new(
///     Some("u:jdoe".into()),
///     Some("userpassword".into()),
///     Some("ONSWG4TFOQ======".into()),
/// ).unwrap();
/// assert_eq!(req.authentication_id(), Some("u:jdoe"));
///
/// // A static password without an authentication ID is rejected
/// assert!(RevokeTotpSharedSecretRequest::new(
///     None,
///     Some("userpassword".into()),
///     None,
/// ).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RevokeTotpSharedSecretRequest {
    authentication_id: Option<String>,
    static_password: Option<Secret>,
    totp_shared_secret: Option<Secret>,
}

impl RevokeTotpSharedSecretRequest {
    const TAG_AUTHENTICATION_ID: u8 = tag::context(0);
    const TAG_STATIC_PASSWORD: u8 = tag::context(1);
    const TAG_TOTP_SHARED_SECRET: u8 = tag::context(2);

    /// Create a request, validating field combinations:
    ///
    /// - a static password may only accompany an authentication ID;
    /// - at least one of authentication ID or shared secret must be present
    ///   (an absent shared secret revokes all of the target's secrets).
    pub fn new(
        authentication_id: Option<String>,
        static_password: Option<Secret>,
        totp_shared_secret: Option<Secret>,
    ) -> Result<Self> {
        if static_password.is_some() && authentication_id.is_none() {
            return Err(Error::Config(
                "a static password may only be provided with an authentication ID".into(),
            ));
        }
        if authentication_id.is_none() && totp_shared_secret.is_none() {
            return Err(Error::Config(
                "either an authentication ID or a TOTP shared secret is required".into(),
            ));
        }
        Ok(Self {
            authentication_id,
            static_password,
            totp_shared_secret,
        })
    }

    /// Revoke every secret held by the named account.
    pub fn revoke_all(authentication_id: impl Into<String>) -> Self {
        Self {
            authentication_id: Some(authentication_id.into()),
            static_password: None,
            totp_shared_secret: None,
        }
    }

    /// The target account, if named explicitly.
    pub fn authentication_id(&self) -> Option<&str> {
        self.authentication_id.as_deref()
    }

    /// The static password proving the requester's identity, if any.
    pub fn static_password(&self) -> Option<&Secret> {
        self.static_password.as_ref()
    }

    /// The specific shared secret to revoke; `None` revokes all.
    pub fn totp_shared_secret(&self) -> Option<&Secret> {
        self.totp_shared_secret.as_ref()
    }

    /// Encode the request value.
    pub fn encode_value(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            if let Some(secret) = &self.totp_shared_secret {
                buf.push_octet_string_with_tag(Self::TAG_TOTP_SHARED_SECRET, secret.as_bytes());
            }
            if let Some(password) = &self.static_password {
                buf.push_octet_string_with_tag(Self::TAG_STATIC_PASSWORD, password.as_bytes());
            }
            if let Some(id) = &self.authentication_id {
                buf.push_octet_string_with_tag(Self::TAG_AUTHENTICATION_ID, id.as_bytes());
            }
        });
        buf.finish()
    }

    /// Decode a request value.
    ///
    /// Applies the same field-combination validation as [`new`](Self::new).
    pub fn decode_value(value: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(value);
        let mut seq = decoder.read_sequence()?;

        let mut authentication_id = None;
        let mut static_password = None;
        let mut totp_shared_secret = None;

        while let Some(field_tag) = seq.peek_tag() {
            match field_tag {
                t if t == Self::TAG_AUTHENTICATION_ID => {
                    let len = seq.expect_tag(t)?;
                    authentication_id = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_STATIC_PASSWORD => {
                    let len = seq.expect_tag(t)?;
                    static_password = Some(Secret::new(seq.read_bytes(len)?.to_vec()));
                }
                t if t == Self::TAG_TOTP_SHARED_SECRET => {
                    let len = seq.expect_tag(t)?;
                    totp_shared_secret = Some(Secret::new(seq.read_bytes(len)?.to_vec()));
                }
                _ => seq.skip_tlv()?,
            }
        }

        Self::new(authentication_id, static_password, totp_shared_secret)
    }

    /// Wrap in a generic extended request.
    pub fn to_extended_request(&self) -> ExtendedRequest {
        ExtendedRequest::new(REVOKE_TOTP_SHARED_SECRET_REQUEST_OID).with_value(self.encode_value())
    }

    /// Extract from a generic extended request.
    pub fn from_extended_request(request: &ExtendedRequest) -> Result<Self> {
        check_response_oid(Some(&*request.oid), REVOKE_TOTP_SHARED_SECRET_REQUEST_OID, 0)?;
        let value = request
            .value
            .clone()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnexpectedValue))?;
        Self::decode_value(value)
    }
}
