//! Collect-support-data extended operation.
//!
//! Asks a directory server to assemble its diagnostic archive (logs, stack
//! traces, configuration, system information) and stream it back over the
//! same connection. The server interleaves two kinds of intermediate
//! responses while the operation runs:
//!
//! - [`CollectSupportDataOutput`] - a line of tool output (stdout/stderr)
//! - [`CollectSupportDataArchiveFragment`] - the next chunk of archive bytes
//!
//! and finishes with an extended response naming
//! [`COLLECT_SUPPORT_DATA_RESULT_OID`]. Concatenating the fragments in
//! arrival order yields the archive; the final fragment carries
//! `more_data_to_return == false`.
//!
//! # Wire contract
//!
//! The request value is a SEQUENCE of context-tagged optional fields, tags
//! [0] through [14] as listed on [`CollectSupportDataRequest`]. Booleans
//! with DEFAULT FALSE are omitted when false. Decoders skip unknown tags so
//! newer peers can add fields.

use super::{check_response_oid, ExtendedRequest, IntermediateResponse, Secret};
use crate::ber::{tag, Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use bytes::Bytes;

/// Request OID.
pub const COLLECT_SUPPORT_DATA_REQUEST_OID: &str = "1.3.6.1.4.1.30221.2.6.64";
/// Tool-output intermediate response OID.
pub const COLLECT_SUPPORT_DATA_OUTPUT_OID: &str = "1.3.6.1.4.1.30221.2.6.65";
/// Archive-fragment intermediate response OID.
pub const COLLECT_SUPPORT_DATA_FRAGMENT_OID: &str = "1.3.6.1.4.1.30221.2.6.66";
/// Final extended response OID.
pub const COLLECT_SUPPORT_DATA_RESULT_OID: &str = "1.3.6.1.4.1.30221.2.6.67";

/// How aggressively the server scrubs secrets from the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    /// Include everything as-is.
    #[default]
    None,
    /// Obscure values known to hold secrets.
    ObscureSecrets,
    /// Omit anything that could plausibly be sensitive.
    Maximum,
}

impl SecurityLevel {
    /// Create from the wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ObscureSecrets),
            2 => Some(Self::Maximum),
            _ => None,
        }
    }

    /// The wire value.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => 0,
            Self::ObscureSecrets => 1,
            Self::Maximum => 2,
        }
    }
}

impl std::fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ObscureSecrets => write!(f, "obscure-secrets"),
            Self::Maximum => write!(f, "maximum"),
        }
    }
}

/// Which stream a tool-output message was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    StandardOutput,
    StandardError,
}

impl OutputStream {
    /// Create from the wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::StandardOutput),
            1 => Some(Self::StandardError),
            _ => None,
        }
    }

    /// The wire value.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::StandardOutput => 0,
            Self::StandardError => 1,
        }
    }
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StandardOutput => write!(f, "stdout"),
            Self::StandardError => write!(f, "stderr"),
        }
    }
}

/// Collect-support-data request.
///
/// All fields are optional; `CollectSupportDataRequest::new()` produces a
/// request for a default archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectSupportDataRequest {
    /// Archive file name the server should report (`[0]`).
    pub archive_file_name: Option<String>,
    /// Passphrase to encrypt the archive with (`[1]`).
    pub encryption_passphrase: Option<Secret>,
    /// Include data that is expensive to capture (`[2]`).
    pub include_expensive_data: bool,
    /// Include a replication state dump (`[3]`).
    pub include_replication_state_dump: bool,
    /// Include binary files (`[4]`).
    pub include_binary_files: bool,
    /// Secret-scrubbing level (`[5]`).
    pub security_level: SecurityLevel,
    /// Capture data sequentially rather than in parallel, reducing load
    /// (`[6]`).
    pub use_sequential_mode: bool,
    /// Number of interval-based samples to capture (`[7]`).
    pub report_count: Option<i32>,
    /// Seconds between interval-based samples (`[8]`).
    pub report_interval_seconds: Option<i32>,
    /// Number of stack traces to capture (`[9]`).
    pub jstack_count: Option<i32>,
    /// Log capture window as a duration, e.g. `10m` (`[10]`).
    pub log_duration: Option<String>,
    /// Log capture window start, generalized time (`[11]`).
    pub log_start_time: Option<String>,
    /// Log capture window end, generalized time (`[12]`).
    pub log_end_time: Option<String>,
    /// Comment to embed in the archive (`[13]`).
    pub comment: Option<String>,
    /// Largest fragment the client wants per intermediate response (`[14]`).
    pub maximum_fragment_size_bytes: Option<i32>,
}

impl CollectSupportDataRequest {
    const TAG_ARCHIVE_FILE_NAME: u8 = tag::context(0);
    const TAG_ENCRYPTION_PASSPHRASE: u8 = tag::context(1);
    const TAG_INCLUDE_EXPENSIVE_DATA: u8 = tag::context(2);
    const TAG_INCLUDE_REPLICATION_STATE_DUMP: u8 = tag::context(3);
    const TAG_INCLUDE_BINARY_FILES: u8 = tag::context(4);
    const TAG_SECURITY_LEVEL: u8 = tag::context(5);
    const TAG_USE_SEQUENTIAL_MODE: u8 = tag::context(6);
    const TAG_REPORT_COUNT: u8 = tag::context(7);
    const TAG_REPORT_INTERVAL_SECONDS: u8 = tag::context(8);
    const TAG_JSTACK_COUNT: u8 = tag::context(9);
    const TAG_LOG_DURATION: u8 = tag::context(10);
    const TAG_LOG_START_TIME: u8 = tag::context(11);
    const TAG_LOG_END_TIME: u8 = tag::context(12);
    const TAG_COMMENT: u8 = tag::context(13);
    const TAG_MAXIMUM_FRAGMENT_SIZE: u8 = tag::context(14);

    /// Request a default archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the request value.
    pub fn encode_value(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            if let Some(size) = self.maximum_fragment_size_bytes {
                buf.push_integer_with_tag(Self::TAG_MAXIMUM_FRAGMENT_SIZE, size);
            }
            if let Some(comment) = &self.comment {
                buf.push_octet_string_with_tag(Self::TAG_COMMENT, comment.as_bytes());
            }
            if let Some(end) = &self.log_end_time {
                buf.push_octet_string_with_tag(Self::TAG_LOG_END_TIME, end.as_bytes());
            }
            if let Some(start) = &self.log_start_time {
                buf.push_octet_string_with_tag(Self::TAG_LOG_START_TIME, start.as_bytes());
            }
            if let Some(duration) = &self.log_duration {
                buf.push_octet_string_with_tag(Self::TAG_LOG_DURATION, duration.as_bytes());
            }
            if let Some(count) = self.jstack_count {
                buf.push_integer_with_tag(Self::TAG_JSTACK_COUNT, count);
            }
            if let Some(interval) = self.report_interval_seconds {
                buf.push_integer_with_tag(Self::TAG_REPORT_INTERVAL_SECONDS, interval);
            }
            if let Some(count) = self.report_count {
                buf.push_integer_with_tag(Self::TAG_REPORT_COUNT, count);
            }
            if self.use_sequential_mode {
                buf.push_boolean_with_tag(Self::TAG_USE_SEQUENTIAL_MODE, true);
            }
            if self.security_level != SecurityLevel::None {
                buf.push_integer_with_tag(Self::TAG_SECURITY_LEVEL, self.security_level.as_i32());
            }
            if self.include_binary_files {
                buf.push_boolean_with_tag(Self::TAG_INCLUDE_BINARY_FILES, true);
            }
            if self.include_replication_state_dump {
                buf.push_boolean_with_tag(Self::TAG_INCLUDE_REPLICATION_STATE_DUMP, true);
            }
            if self.include_expensive_data {
                buf.push_boolean_with_tag(Self::TAG_INCLUDE_EXPENSIVE_DATA, true);
            }
            if let Some(passphrase) = &self.encryption_passphrase {
                buf.push_octet_string_with_tag(
                    Self::TAG_ENCRYPTION_PASSPHRASE,
                    passphrase.as_bytes(),
                );
            }
            if let Some(name) = &self.archive_file_name {
                buf.push_octet_string_with_tag(Self::TAG_ARCHIVE_FILE_NAME, name.as_bytes());
            }
        });
        buf.finish()
    }

    /// Decode a request value.
    pub fn decode_value(value: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(value);
        let mut seq = decoder.read_sequence()?;

        let mut request = Self::default();
        while let Some(field_tag) = seq.peek_tag() {
            match field_tag {
                t if t == Self::TAG_ARCHIVE_FILE_NAME => {
                    let len = seq.expect_tag(t)?;
                    request.archive_file_name = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_ENCRYPTION_PASSPHRASE => {
                    let len = seq.expect_tag(t)?;
                    request.encryption_passphrase =
                        Some(Secret::new(seq.read_bytes(len)?.to_vec()));
                }
                t if t == Self::TAG_INCLUDE_EXPENSIVE_DATA => {
                    let len = seq.expect_tag(t)?;
                    request.include_expensive_data = seq.read_boolean_value(len)?;
                }
                t if t == Self::TAG_INCLUDE_REPLICATION_STATE_DUMP => {
                    let len = seq.expect_tag(t)?;
                    request.include_replication_state_dump = seq.read_boolean_value(len)?;
                }
                t if t == Self::TAG_INCLUDE_BINARY_FILES => {
                    let len = seq.expect_tag(t)?;
                    request.include_binary_files = seq.read_boolean_value(len)?;
                }
                t if t == Self::TAG_SECURITY_LEVEL => {
                    let len = seq.expect_tag(t)?;
                    let raw = seq.read_integer_value(len)?;
                    request.security_level = SecurityLevel::from_i32(raw).ok_or_else(|| {
                        Error::decode(seq.offset(), DecodeErrorKind::UnknownEnumerated(raw))
                    })?;
                }
                t if t == Self::TAG_USE_SEQUENTIAL_MODE => {
                    let len = seq.expect_tag(t)?;
                    request.use_sequential_mode = seq.read_boolean_value(len)?;
                }
                t if t == Self::TAG_REPORT_COUNT => {
                    let len = seq.expect_tag(t)?;
                    request.report_count = Some(seq.read_integer_value(len)?);
                }
                t if t == Self::TAG_REPORT_INTERVAL_SECONDS => {
                    let len = seq.expect_tag(t)?;
                    request.report_interval_seconds = Some(seq.read_integer_value(len)?);
                }
                t if t == Self::TAG_JSTACK_COUNT => {
                    let len = seq.expect_tag(t)?;
                    request.jstack_count = Some(seq.read_integer_value(len)?);
                }
                t if t == Self::TAG_LOG_DURATION => {
                    let len = seq.expect_tag(t)?;
                    request.log_duration = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_LOG_START_TIME => {
                    let len = seq.expect_tag(t)?;
                    request.log_start_time = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_LOG_END_TIME => {
                    let len = seq.expect_tag(t)?;
                    request.log_end_time = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_COMMENT => {
                    let len = seq.expect_tag(t)?;
                    request.comment = Some(seq.read_string_value(len)?);
                }
                t if t == Self::TAG_MAXIMUM_FRAGMENT_SIZE => {
                    let len = seq.expect_tag(t)?;
                    request.maximum_fragment_size_bytes = Some(seq.read_integer_value(len)?);
                }
                _ => seq.skip_tlv()?,
            }
        }

        Ok(request)
    }

    /// Wrap in a generic extended request.
    pub fn to_extended_request(&self) -> ExtendedRequest {
        ExtendedRequest::new(COLLECT_SUPPORT_DATA_REQUEST_OID).with_value(self.encode_value())
    }

    /// Extract from a generic extended request.
    pub fn from_extended_request(request: &ExtendedRequest) -> Result<Self> {
        check_response_oid(Some(&*request.oid), COLLECT_SUPPORT_DATA_REQUEST_OID, 0)?;
        let value = request
            .value
            .clone()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnexpectedValue))?;
        Self::decode_value(value)
    }
}

/// Tool-output intermediate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSupportDataOutput {
    /// Which stream the message belongs to.
    pub stream: OutputStream,
    /// One line of tool output.
    pub message: String,
}

impl CollectSupportDataOutput {
    const TAG_STREAM: u8 = tag::context(0);
    const TAG_MESSAGE: u8 = tag::context(1);

    /// Create a tool-output message.
    pub fn new(stream: OutputStream, message: impl Into<String>) -> Self {
        Self {
            stream,
            message: message.into(),
        }
    }

    /// Encode the response value.
    pub fn encode_value(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string_with_tag(Self::TAG_MESSAGE, self.message.as_bytes());
            buf.push_integer_with_tag(Self::TAG_STREAM, self.stream.as_i32());
        });
        buf.finish()
    }

    /// Decode a response value.
    pub fn decode_value(value: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(value);
        let mut seq = decoder.read_sequence()?;

        let len = seq.expect_tag(Self::TAG_STREAM)?;
        let raw = seq.read_integer_value(len)?;
        let stream = OutputStream::from_i32(raw).ok_or_else(|| {
            Error::decode(seq.offset(), DecodeErrorKind::UnknownEnumerated(raw))
        })?;

        let len = seq.expect_tag(Self::TAG_MESSAGE)?;
        let message = seq.read_string_value(len)?;
        seq.expect_end()?;

        Ok(Self { stream, message })
    }

    /// Wrap in a generic intermediate response.
    pub fn to_intermediate_response(&self) -> IntermediateResponse {
        IntermediateResponse::new(COLLECT_SUPPORT_DATA_OUTPUT_OID, self.encode_value())
    }

    /// Extract from a generic intermediate response.
    pub fn from_intermediate_response(response: &IntermediateResponse) -> Result<Self> {
        check_response_oid(response.oid.as_deref(), COLLECT_SUPPORT_DATA_OUTPUT_OID, 0)?;
        let value = response
            .value
            .clone()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnexpectedValue))?;
        Self::decode_value(value)
    }
}

/// Archive-fragment intermediate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSupportDataArchiveFragment {
    /// Total archive size the server expects to send.
    pub total_archive_size_bytes: i64,
    /// Whether further fragments follow.
    pub more_data_to_return: bool,
    /// This fragment's bytes.
    pub fragment_data: Bytes,
}

impl CollectSupportDataArchiveFragment {
    const TAG_TOTAL_SIZE: u8 = tag::context(0);
    const TAG_MORE_DATA: u8 = tag::context(1);
    const TAG_FRAGMENT_DATA: u8 = tag::context(2);

    /// Create a fragment.
    pub fn new(
        total_archive_size_bytes: i64,
        more_data_to_return: bool,
        fragment_data: impl Into<Bytes>,
    ) -> Self {
        Self {
            total_archive_size_bytes,
            more_data_to_return,
            fragment_data: fragment_data.into(),
        }
    }

    /// Encode the response value.
    pub fn encode_value(&self) -> Bytes {
        let mut buf = EncodeBuf::with_capacity(self.fragment_data.len() + 32);
        buf.push_sequence(|buf| {
            buf.push_octet_string_with_tag(Self::TAG_FRAGMENT_DATA, &self.fragment_data);
            buf.push_boolean_with_tag(Self::TAG_MORE_DATA, self.more_data_to_return);
            buf.push_integer64_with_tag(Self::TAG_TOTAL_SIZE, self.total_archive_size_bytes);
        });
        buf.finish()
    }

    /// Decode a response value.
    pub fn decode_value(value: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(value);
        let mut seq = decoder.read_sequence()?;

        let len = seq.expect_tag(Self::TAG_TOTAL_SIZE)?;
        let total_archive_size_bytes = seq.read_integer64_value(len)?;

        let len = seq.expect_tag(Self::TAG_MORE_DATA)?;
        let more_data_to_return = seq.read_boolean_value(len)?;

        let len = seq.expect_tag(Self::TAG_FRAGMENT_DATA)?;
        let fragment_data = seq.read_bytes(len)?;
        seq.expect_end()?;

        Ok(Self {
            total_archive_size_bytes,
            more_data_to_return,
            fragment_data,
        })
    }

    /// Wrap in a generic intermediate response.
    pub fn to_intermediate_response(&self) -> IntermediateResponse {
        IntermediateResponse::new(COLLECT_SUPPORT_DATA_FRAGMENT_OID, self.encode_value())
    }

    /// Extract from a generic intermediate response.
    pub fn from_intermediate_response(response: &IntermediateResponse) -> Result<Self> {
        check_response_oid(
            response.oid.as_deref(),
            COLLECT_SUPPORT_DATA_FRAGMENT_OID,
            0,
        )?;
        let value = response
            .value
            .clone()
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnexpectedValue))?;
        Self::decode_value(value)
    }
}
