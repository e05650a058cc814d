//! LDAP controls (RFC 4511 Section 4.1.11).
//!
//! `Control ::= SEQUENCE { controlType LDAPOID, criticality BOOLEAN DEFAULT
//! FALSE, controlValue OCTET STRING OPTIONAL }`

use crate::ber::{tag, Decoder, EncodeBuf};
use crate::error::Result;
use bytes::Bytes;

/// A request or response control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Control type OID.
    pub oid: Box<str>,
    /// Whether the server must reject the operation if the control is
    /// unsupported.
    pub criticality: bool,
    /// Raw control value, if any.
    pub value: Option<Bytes>,
}

impl Control {
    /// Create a non-critical control without a value.
    pub fn new(oid: impl Into<Box<str>>) -> Self {
        Self {
            oid: oid.into(),
            criticality: false,
            value: None,
        }
    }

    /// Create a critical control without a value.
    pub fn critical(oid: impl Into<Box<str>>) -> Self {
        Self {
            oid: oid.into(),
            criticality: true,
            value: None,
        }
    }

    /// Attach a value.
    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            if let Some(value) = &self.value {
                buf.push_octet_string(value);
            }
            // DEFAULT FALSE is omitted when false
            if self.criticality {
                buf.push_boolean(true);
            }
            buf.push_str(&self.oid);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let oid = seq.read_string()?.into_boxed_str();

        let mut criticality = false;
        let mut value = None;

        // Criticality and value are both optional; take whatever follows
        if seq.peek_tag() == Some(tag::universal::BOOLEAN) {
            criticality = seq.read_boolean()?;
        }
        if seq.peek_tag() == Some(tag::universal::OCTET_STRING) {
            value = Some(seq.read_octet_string()?);
        }
        seq.expect_end()?;

        Ok(Control {
            oid,
            criticality,
            value,
        })
    }
}

/// Encode a control list as `[0] SEQUENCE OF Control` (omitted when empty).
pub(crate) fn encode_controls(buf: &mut EncodeBuf, controls: &[Control]) {
    if controls.is_empty() {
        return;
    }
    buf.push_constructed(tag::ldap::CONTROLS, |buf| {
        for control in controls.iter().rev() {
            control.encode(buf);
        }
    });
}

/// Decode a `[0] SEQUENCE OF Control` if present at the cursor.
pub(crate) fn decode_controls(decoder: &mut Decoder) -> Result<Vec<Control>> {
    let mut controls = Vec::new();
    if decoder.peek_tag() == Some(tag::ldap::CONTROLS) {
        let mut seq = decoder.read_constructed(tag::ldap::CONTROLS)?;
        while !seq.is_empty() {
            controls.push(Control::decode(&mut seq)?);
        }
    }
    Ok(controls)
}
