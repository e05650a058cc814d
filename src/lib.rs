//! # async-ldap
//!
//! Async LDAP extended-operation client library for Rust.
//!
//! ## Features
//!
//! - Zero-copy BER encoding/decoding (X.690 with RFC 4511 restrictions)
//! - LDAP message framing: bind, unbind, extended operations, intermediate
//!   responses, controls
//! - Typed extended operations: collect-support-data (with streamed archive
//!   fragments) and revoke-TOTP-shared-secret
//! - Distinguished-name parsing with a compact encoding for diffing
//!   directory contents
//! - Replication summary monitor-line parsing
//! - Async-first API built on Tokio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_ldap::extop::collect_support_data::CollectSupportDataRequest;
//! use async_ldap::Client;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), async_ldap::Error> {
//!     let client = Client::builder("ds.example.com:389")
//!         .timeout(Duration::from_secs(60))
//!         .bind("uid=admin,dc=example,dc=com", "password")
//!         .connect()
//!         .await?;
//!
//!     let mut archive = Vec::new();
//!     let outcome = client
//!         .collect_support_data(&CollectSupportDataRequest::new(), |fragment| {
//!             archive.extend_from_slice(fragment);
//!             Ok(())
//!         })
//!         .await?;
//!
//!     println!("archive complete: {} bytes", outcome.archive_bytes_received);
//!     client.unbind().await;
//!     Ok(())
//! }
//! ```

pub mod ber;
pub mod client;
pub mod dn;
pub mod error;
pub mod extop;
pub mod format;
pub mod message;
pub mod summary;
pub mod transport;

// Re-exports for convenience
pub use client::{Client, ClientBuilder, ClientConfig, CollectSupportDataResult};
pub use dn::{Dn, Rdn, RdnComponent};
pub use error::{DecodeErrorKind, DnErrorKind, Error, Result, ResultCode};
pub use extop::{ExtendedRequest, ExtendedResponse, IntermediateResponse, Secret};
pub use message::{BindRequest, BindResponse, Control, LdapMessage, LdapResult, ProtocolOp};
pub use transport::{TcpTransport, Transport};

/// Type alias for a client over the TCP transport.
pub type TcpClient = Client<TcpTransport>;

/// Testing utilities exposed via the `testing` feature.
#[cfg(feature = "testing")]
pub mod testing {
    pub use crate::format::hex::{decode as decode_hex, encode as encode_hex};
}
