//! Transport layer abstraction.
//!
//! LDAP is connection-oriented, so the transport surface is a reliable
//! ordered byte stream carrying BER-framed messages. [`Transport`] hides the
//! concrete stream so the client can run over plain TCP today and TLS or an
//! in-process test pipe without changes.

mod tcp;

pub use tcp::{read_ber_message, TcpOptions, TcpTransport, TcpTransportBuilder};

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;

/// Client-side transport abstraction.
///
/// # Clone Requirement
///
/// The `Clone` bound exists because the client hands a clone of the
/// transport to helper tasks. All implementations use `Arc` internally,
/// making clone a reference-count increment.
pub trait Transport: Send + Sync + Clone {
    /// Send one complete BER-framed message.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive the next complete BER-framed message.
    ///
    /// Callers impose timeouts by wrapping the returned future.
    fn recv(&self) -> impl Future<Output = Result<Bytes>> + Send;

    /// The peer address for this transport.
    fn peer_addr(&self) -> SocketAddr;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;

    /// Shut down the connection. Subsequent operations fail.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
