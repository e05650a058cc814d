//! Error types for async-ldap.
//!
//! This module provides:
//!
//! - [`Error`] - The main error type for all library operations
//! - [`ResultCode`] - LDAP result codes returned by servers (RFC 4511 Appendix A)
//! - Kind enums ([`DecodeErrorKind`], [`DnErrorKind`]) carrying structured
//!   detail for codec and DN failures
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without
//! breaking changes.
//!
//! # Error Handling Patterns
//!
//! Most applications should match on specific error variants:
//!
//! ```no_run
//! use async_ldap::{Client, Error, ResultCode};
//!
//! # async fn example() -> async_ldap::Result<()> {
//! let client = Client::builder("ds.example.com:389").connect().await?;
//!
//! match client.simple_bind("uid=admin,dc=example,dc=com", "password").await {
//!     Ok(()) => println!("bound"),
//!     Err(Error::Ldap { code: ResultCode::InvalidCredentials, .. }) => {
//!         println!("wrong password");
//!     }
//!     Err(Error::Timeout { elapsed, .. }) => {
//!         println!("no response after {:?}", elapsed);
//!     }
//!     Err(e) => println!("error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// BER decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeErrorKind {
    /// Expected different tag.
    UnexpectedTag { expected: u8, actual: u8 },
    /// Data truncated unexpectedly.
    TruncatedData,
    /// Invalid BER length encoding.
    InvalidLength,
    /// Indefinite length not supported.
    IndefiniteLength,
    /// Length field too long.
    LengthTooLong { octets: usize },
    /// Length exceeds maximum.
    LengthExceedsMax { length: usize, max: usize },
    /// Zero-length INTEGER, ENUMERATED, or BOOLEAN.
    ZeroLengthPrimitive,
    /// Integer too long for its target type.
    IntegerTooLong { length: usize },
    /// BOOLEAN with length other than one octet.
    InvalidBooleanLength { length: usize },
    /// NULL with non-zero length.
    InvalidNull,
    /// OCTET STRING holding non-UTF-8 where a string is required.
    InvalidUtf8,
    /// TLV extends past end of data.
    TlvOverflow,
    /// Insufficient data for read.
    InsufficientData { needed: usize, available: usize },
    /// Unknown LDAP protocol op tag.
    UnknownProtocolOp(u8),
    /// Missing protocol op in message.
    MissingProtocolOp,
    /// Unknown enumerated value where the protocol allows no fallback.
    UnknownEnumerated(i32),
    /// Extended operation value present where none is allowed, or vice versa.
    UnexpectedValue,
    /// Response named a different extended operation OID.
    OidMismatch,
    /// Trailing bytes after a complete element.
    TrailingData { remaining: usize },
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedTag { expected, actual } => {
                write!(f, "expected tag 0x{:02X}, got 0x{:02X}", expected, actual)
            }
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::InvalidLength => write!(f, "invalid length encoding"),
            Self::IndefiniteLength => write!(f, "indefinite length encoding not supported"),
            Self::LengthTooLong { octets } => {
                write!(f, "length encoding too long ({} octets)", octets)
            }
            Self::LengthExceedsMax { length, max } => {
                write!(f, "length {} exceeds maximum {}", length, max)
            }
            Self::ZeroLengthPrimitive => write!(f, "zero-length primitive"),
            Self::IntegerTooLong { length } => write!(f, "integer too long: {} bytes", length),
            Self::InvalidBooleanLength { length } => {
                write!(f, "BOOLEAN must be 1 byte, got {}", length)
            }
            Self::InvalidNull => write!(f, "NULL with non-zero length"),
            Self::InvalidUtf8 => write!(f, "string value is not valid UTF-8"),
            Self::TlvOverflow => write!(f, "TLV extends past end of data"),
            Self::InsufficientData { needed, available } => {
                write!(f, "need {} bytes but only {} remaining", needed, available)
            }
            Self::UnknownProtocolOp(t) => write!(f, "unknown protocol op tag: 0x{:02X}", t),
            Self::MissingProtocolOp => write!(f, "missing protocol op in message"),
            Self::UnknownEnumerated(v) => write!(f, "unknown enumerated value: {}", v),
            Self::UnexpectedValue => write!(f, "unexpected extended operation value"),
            Self::OidMismatch => write!(f, "extended operation OID mismatch"),
            Self::TrailingData { remaining } => {
                write!(f, "{} trailing bytes after element", remaining)
            }
        }
    }
}

/// DN parsing error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DnErrorKind {
    /// RDN with no attribute/value separator.
    MissingEquals,
    /// Empty attribute description.
    EmptyAttributeName,
    /// Attribute description with characters outside keystring/OID form.
    InvalidAttributeName,
    /// Empty RDN between separators.
    EmptyRdn,
    /// Escape sequence at end of input.
    TrailingEscape,
    /// `\XX` escape with non-hex digits.
    InvalidHexEscape,
}

impl std::fmt::Display for DnErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEquals => write!(f, "RDN has no '=' separator"),
            Self::EmptyAttributeName => write!(f, "empty attribute name"),
            Self::InvalidAttributeName => write!(f, "invalid attribute name"),
            Self::EmptyRdn => write!(f, "empty RDN"),
            Self::TrailingEscape => write!(f, "escape at end of input"),
            Self::InvalidHexEscape => write!(f, "invalid hex escape"),
        }
    }
}

/// LDAP result codes (RFC 4511 Appendix A).
///
/// Returned by servers in every response operation. A non-success code on a
/// client helper surfaces as [`Error::Ldap`].
///
/// # Example
///
/// ```
/// use async_ldap::ResultCode;
///
/// let code = ResultCode::from_i32(49);
/// assert_eq!(code, ResultCode::InvalidCredentials);
/// assert_eq!(code.as_i32(), 49);
/// println!("{}", code); // prints "invalidCredentials"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultCode {
    /// Operation completed successfully (code 0).
    Success,
    /// Server-internal sequencing error (code 1).
    OperationsError,
    /// Request violated the protocol (code 2).
    ProtocolError,
    /// Time limit exceeded (code 3).
    TimeLimitExceeded,
    /// Size limit exceeded (code 4).
    SizeLimitExceeded,
    /// Compare evaluated to FALSE (code 5).
    CompareFalse,
    /// Compare evaluated to TRUE (code 6).
    CompareTrue,
    /// Requested auth method not supported (code 7).
    AuthMethodNotSupported,
    /// Stronger authentication required (code 8).
    StrongerAuthRequired,
    /// Referral returned (code 10).
    Referral,
    /// Administrative limit exceeded (code 11).
    AdminLimitExceeded,
    /// Critical control unrecognized or unsupported (code 12).
    UnavailableCriticalExtension,
    /// Confidentiality (e.g. TLS) required (code 13).
    ConfidentialityRequired,
    /// Multi-stage SASL bind in progress (code 14).
    SaslBindInProgress,
    /// No such attribute (code 16).
    NoSuchAttribute,
    /// Undefined attribute type (code 17).
    UndefinedAttributeType,
    /// Inappropriate matching (code 18).
    InappropriateMatching,
    /// Constraint violation (code 19).
    ConstraintViolation,
    /// Attribute or value already exists (code 20).
    AttributeOrValueExists,
    /// Invalid attribute syntax (code 21).
    InvalidAttributeSyntax,
    /// No such object (code 32).
    NoSuchObject,
    /// Alias problem (code 33).
    AliasProblem,
    /// Invalid DN syntax (code 34).
    InvalidDnSyntax,
    /// Alias dereferencing problem (code 36).
    AliasDereferencingProblem,
    /// Inappropriate authentication (code 48).
    InappropriateAuthentication,
    /// Invalid credentials (code 49).
    InvalidCredentials,
    /// Insufficient access rights (code 50).
    InsufficientAccessRights,
    /// Server busy (code 51).
    Busy,
    /// Server unavailable (code 52).
    Unavailable,
    /// Server unwilling to perform (code 53).
    UnwillingToPerform,
    /// Loop detected (code 54).
    LoopDetect,
    /// Naming violation (code 64).
    NamingViolation,
    /// Object class violation (code 65).
    ObjectClassViolation,
    /// Operation not allowed on non-leaf entry (code 66).
    NotAllowedOnNonLeaf,
    /// Operation not allowed on RDN (code 67).
    NotAllowedOnRdn,
    /// Entry already exists (code 68).
    EntryAlreadyExists,
    /// Object class modifications prohibited (code 69).
    ObjectClassModsProhibited,
    /// Operation affects multiple DSAs (code 71).
    AffectsMultipleDsas,
    /// Unspecified error (code 80).
    Other,
    /// Unknown or server-specific result code.
    Unknown(i32),
}

impl ResultCode {
    /// Create from raw result code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::OperationsError,
            2 => Self::ProtocolError,
            3 => Self::TimeLimitExceeded,
            4 => Self::SizeLimitExceeded,
            5 => Self::CompareFalse,
            6 => Self::CompareTrue,
            7 => Self::AuthMethodNotSupported,
            8 => Self::StrongerAuthRequired,
            10 => Self::Referral,
            11 => Self::AdminLimitExceeded,
            12 => Self::UnavailableCriticalExtension,
            13 => Self::ConfidentialityRequired,
            14 => Self::SaslBindInProgress,
            16 => Self::NoSuchAttribute,
            17 => Self::UndefinedAttributeType,
            18 => Self::InappropriateMatching,
            19 => Self::ConstraintViolation,
            20 => Self::AttributeOrValueExists,
            21 => Self::InvalidAttributeSyntax,
            32 => Self::NoSuchObject,
            33 => Self::AliasProblem,
            34 => Self::InvalidDnSyntax,
            36 => Self::AliasDereferencingProblem,
            48 => Self::InappropriateAuthentication,
            49 => Self::InvalidCredentials,
            50 => Self::InsufficientAccessRights,
            51 => Self::Busy,
            52 => Self::Unavailable,
            53 => Self::UnwillingToPerform,
            54 => Self::LoopDetect,
            64 => Self::NamingViolation,
            65 => Self::ObjectClassViolation,
            66 => Self::NotAllowedOnNonLeaf,
            67 => Self::NotAllowedOnRdn,
            68 => Self::EntryAlreadyExists,
            69 => Self::ObjectClassModsProhibited,
            71 => Self::AffectsMultipleDsas,
            80 => Self::Other,
            other => {
                tracing::warn!(target: "async_ldap::error", code = other, "unknown LDAP result code");
                Self::Unknown(other)
            }
        }
    }

    /// Convert to raw result code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::OperationsError => 1,
            Self::ProtocolError => 2,
            Self::TimeLimitExceeded => 3,
            Self::SizeLimitExceeded => 4,
            Self::CompareFalse => 5,
            Self::CompareTrue => 6,
            Self::AuthMethodNotSupported => 7,
            Self::StrongerAuthRequired => 8,
            Self::Referral => 10,
            Self::AdminLimitExceeded => 11,
            Self::UnavailableCriticalExtension => 12,
            Self::ConfidentialityRequired => 13,
            Self::SaslBindInProgress => 14,
            Self::NoSuchAttribute => 16,
            Self::UndefinedAttributeType => 17,
            Self::InappropriateMatching => 18,
            Self::ConstraintViolation => 19,
            Self::AttributeOrValueExists => 20,
            Self::InvalidAttributeSyntax => 21,
            Self::NoSuchObject => 32,
            Self::AliasProblem => 33,
            Self::InvalidDnSyntax => 34,
            Self::AliasDereferencingProblem => 36,
            Self::InappropriateAuthentication => 48,
            Self::InvalidCredentials => 49,
            Self::InsufficientAccessRights => 50,
            Self::Busy => 51,
            Self::Unavailable => 52,
            Self::UnwillingToPerform => 53,
            Self::LoopDetect => 54,
            Self::NamingViolation => 64,
            Self::ObjectClassViolation => 65,
            Self::NotAllowedOnNonLeaf => 66,
            Self::NotAllowedOnRdn => 67,
            Self::EntryAlreadyExists => 68,
            Self::ObjectClassModsProhibited => 69,
            Self::AffectsMultipleDsas => 71,
            Self::Other => 80,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether this code indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::CompareTrue | Self::CompareFalse)
    }

    /// Whether the connection remains usable after this code.
    ///
    /// `protocolError`, `busy`, and `unavailable` commonly precede a server
    /// close; everything else leaves the connection in a defined state.
    pub fn is_connection_usable(&self) -> bool {
        !matches!(self, Self::ProtocolError | Self::Busy | Self::Unavailable)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::OperationsError => write!(f, "operationsError"),
            Self::ProtocolError => write!(f, "protocolError"),
            Self::TimeLimitExceeded => write!(f, "timeLimitExceeded"),
            Self::SizeLimitExceeded => write!(f, "sizeLimitExceeded"),
            Self::CompareFalse => write!(f, "compareFalse"),
            Self::CompareTrue => write!(f, "compareTrue"),
            Self::AuthMethodNotSupported => write!(f, "authMethodNotSupported"),
            Self::StrongerAuthRequired => write!(f, "strongerAuthRequired"),
            Self::Referral => write!(f, "referral"),
            Self::AdminLimitExceeded => write!(f, "adminLimitExceeded"),
            Self::UnavailableCriticalExtension => write!(f, "unavailableCriticalExtension"),
            Self::ConfidentialityRequired => write!(f, "confidentialityRequired"),
            Self::SaslBindInProgress => write!(f, "saslBindInProgress"),
            Self::NoSuchAttribute => write!(f, "noSuchAttribute"),
            Self::UndefinedAttributeType => write!(f, "undefinedAttributeType"),
            Self::InappropriateMatching => write!(f, "inappropriateMatching"),
            Self::ConstraintViolation => write!(f, "constraintViolation"),
            Self::AttributeOrValueExists => write!(f, "attributeOrValueExists"),
            Self::InvalidAttributeSyntax => write!(f, "invalidAttributeSyntax"),
            Self::NoSuchObject => write!(f, "noSuchObject"),
            Self::AliasProblem => write!(f, "aliasProblem"),
            Self::InvalidDnSyntax => write!(f, "invalidDNSyntax"),
            Self::AliasDereferencingProblem => write!(f, "aliasDereferencingProblem"),
            Self::InappropriateAuthentication => write!(f, "inappropriateAuthentication"),
            Self::InvalidCredentials => write!(f, "invalidCredentials"),
            Self::InsufficientAccessRights => write!(f, "insufficientAccessRights"),
            Self::Busy => write!(f, "busy"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::UnwillingToPerform => write!(f, "unwillingToPerform"),
            Self::LoopDetect => write!(f, "loopDetect"),
            Self::NamingViolation => write!(f, "namingViolation"),
            Self::ObjectClassViolation => write!(f, "objectClassViolation"),
            Self::NotAllowedOnNonLeaf => write!(f, "notAllowedOnNonLeaf"),
            Self::NotAllowedOnRdn => write!(f, "notAllowedOnRDN"),
            Self::EntryAlreadyExists => write!(f, "entryAlreadyExists"),
            Self::ObjectClassModsProhibited => write!(f, "objectClassModsProhibited"),
            Self::AffectsMultipleDsas => write!(f, "affectsMultipleDSAs"),
            Self::Other => write!(f, "other"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// The main error type for all async-ldap operations.
///
/// # Common Patterns
///
/// ```
/// use async_ldap::{Error, ResultCode};
///
/// fn is_retriable(error: &Error) -> bool {
///     matches!(error,
///         Error::Timeout { .. } |
///         Error::Io { .. } |
///         Error::Ldap { code: ResultCode::Busy | ResultCode::Unavailable, .. }
///     )
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error{}: {source}", target.map(|t| format!(" communicating with {}", t)).unwrap_or_default())]
    Io {
        target: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    /// Request timed out.
    #[error("timeout after {elapsed:?}{} (message_id={message_id})", target.map(|t| format!(" waiting for {}", t)).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        message_id: i32,
    },

    /// Non-success LDAP result returned by the server.
    #[error("LDAP error{}: {code}{}", target.map(|t| format!(" from {}", t)).unwrap_or_default(), if diagnostic_message.is_empty() { String::new() } else { format!(" ({})", diagnostic_message) })]
    Ldap {
        target: Option<SocketAddr>,
        code: ResultCode,
        matched_dn: String,
        diagnostic_message: String,
    },

    /// BER decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode {
        offset: usize,
        kind: DecodeErrorKind,
    },

    /// Response message ID doesn't match the request.
    #[error("message ID mismatch: expected {expected}, got {actual}")]
    MessageIdMismatch { expected: i32, actual: i32 },

    /// Unsolicited notification received while awaiting a response.
    ///
    /// Message ID 0 is reserved for server-initiated notifications
    /// (RFC 4511 Section 4.4), most commonly notice of disconnection.
    #[error("unsolicited notification{}: {code}{}", oid.as_deref().map(|o| format!(" {}", o)).unwrap_or_default(), if diagnostic_message.is_empty() { String::new() } else { format!(" ({})", diagnostic_message) })]
    Unsolicited {
        target: Option<SocketAddr>,
        oid: Option<Box<str>>,
        code: ResultCode,
        diagnostic_message: String,
    },

    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Invalid DN string.
    #[error("invalid DN{}: {kind}", input.as_deref().map(|i| format!(" {:?}", i)).unwrap_or_default())]
    InvalidDn {
        kind: DnErrorKind,
        input: Option<Box<str>>,
    },

    /// Configuration error.
    ///
    /// Returned when client or request configuration is invalid (e.g. a
    /// static password without an authentication ID).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an invalid DN error from a kind (no input string).
    pub fn invalid_dn(kind: DnErrorKind) -> Self {
        Self::InvalidDn { kind, input: None }
    }

    /// Create an invalid DN error with the input string that failed.
    pub fn invalid_dn_with_input(kind: DnErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidDn {
            kind,
            input: Some(input.into()),
        }
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Io { target, .. } => *target,
            Self::Timeout { target, .. } => *target,
            Self::Ldap { target, .. } => *target,
            Self::Unsolicited { target, .. } => *target,
            _ => None,
        }
    }
}
