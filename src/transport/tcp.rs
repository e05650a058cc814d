//! TCP transport for LDAP clients.
//!
//! # Message Framing
//!
//! LDAP needs no extra framing on TCP: every message is an outer BER
//! SEQUENCE whose definite length delimits it on the stream.
//!
//! ```text
//! +------+--------+------------+
//! | 0x30 | Length |  Content   |
//! +------+--------+------------+
//!   Tag   1-5 bytes  N bytes
//! ```
//!
//! The receiver reads the tag byte (0x30), the length field (definite form
//! only), then exactly that many content bytes.
//!
//! # Allocation Cap
//!
//! A peer's claimed length is checked against a configurable cap before any
//! buffer is allocated, so a hostile or broken server cannot make the client
//! reserve gigabytes from a five-byte header.

use super::Transport;
use crate::error::{DecodeErrorKind, Error, Result};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Default allocation limit for incoming messages.
///
/// Collect-support-data archives arrive in fragments of around 1MB, so even
/// diagnostic-heavy responses stay far below this. Anything larger is a
/// protocol violation or an attack.
const DEFAULT_MAX_ALLOCATION_SIZE: usize = 32 * 1024 * 1024; // 32 MB

/// Configuration options for [`TcpTransport`].
#[derive(Debug, Clone)]
pub struct TcpOptions {
    /// Maximum size of incoming messages to accept.
    ///
    /// Messages claiming to be larger than this are rejected before
    /// allocating any buffers.
    pub max_allocation_size: usize,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            max_allocation_size: DEFAULT_MAX_ALLOCATION_SIZE,
        }
    }
}

/// Builder for [`TcpTransport`].
///
/// For advanced TCP socket configuration (TCP_NODELAY, keepalive, buffer
/// sizes), use [`TcpTransport::from_stream()`] with a pre-configured
/// `TcpStream`.
pub struct TcpTransportBuilder {
    timeout: Option<Duration>,
    options: TcpOptions,
}

impl TcpTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            timeout: None,
            options: TcpOptions::default(),
        }
    }

    /// Set connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set maximum allocation size for incoming messages.
    pub fn max_allocation_size(mut self, size: usize) -> Self {
        self.options.max_allocation_size = size;
        self
    }

    /// Connect to the target address.
    pub async fn connect(self, target: SocketAddr) -> Result<TcpTransport> {
        let stream = match self.timeout {
            Some(t) => timeout(t, TcpStream::connect(target))
                .await
                .map_err(|_| Error::Timeout {
                    target: Some(target),
                    elapsed: t,
                    message_id: 0,
                })?
                .map_err(|e| Error::Io {
                    target: Some(target),
                    source: e,
                })?,
            None => TcpStream::connect(target).await.map_err(|e| Error::Io {
                target: Some(target),
                source: e,
            })?,
        };

        TcpTransport::from_stream(stream, self.options)
    }
}

impl Default for TcpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP transport for a single directory server connection.
///
/// # Connection Lifecycle
///
/// The connection is established during construction and remains open for
/// the lifetime of the transport. If the connection fails, subsequent
/// operations return errors and a new transport must be created.
///
/// # Serialized Access
///
/// Sends and receives each take the stream lock for the duration of one
/// whole message, so concurrent callers cannot interleave partial frames.
#[derive(Clone)]
pub struct TcpTransport {
    inner: Arc<TcpTransportInner>,
}

struct TcpTransportInner {
    /// `None` after close()
    stream: Mutex<Option<TcpStream>>,
    target: SocketAddr,
    local_addr: SocketAddr,
    max_allocation_size: usize,
}

impl TcpTransport {
    /// Connect to a target address with default options.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        Self::builder().connect(target).await
    }

    /// Connect with a timeout.
    pub async fn connect_timeout(target: SocketAddr, connect_timeout: Duration) -> Result<Self> {
        Self::builder()
            .timeout(connect_timeout)
            .connect(target)
            .await
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::new()
    }

    /// Create a transport from an established stream.
    ///
    /// Use this when you need fine-grained control over TCP socket options.
    pub fn from_stream(stream: TcpStream, options: TcpOptions) -> Result<Self> {
        let target = stream.peer_addr().map_err(|e| Error::Io {
            target: None,
            source: e,
        })?;
        let local_addr = stream.local_addr().map_err(|e| Error::Io {
            target: Some(target),
            source: e,
        })?;

        Ok(Self {
            inner: Arc::new(TcpTransportInner {
                stream: Mutex::new(Some(stream)),
                target,
                local_addr,
                max_allocation_size: options.max_allocation_size,
            }),
        })
    }

    fn closed_error(&self) -> Error {
        Error::Io {
            target: Some(self.inner.target),
            source: std::io::Error::new(std::io::ErrorKind::NotConnected, "transport closed"),
        }
    }
}

impl Transport for TcpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.inner.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| self.closed_error())?;

        stream.write_all(data).await.map_err(|e| Error::Io {
            target: Some(self.inner.target),
            source: e,
        })?;
        stream.flush().await.map_err(|e| Error::Io {
            target: Some(self.inner.target),
            source: e,
        })
    }

    async fn recv(&self) -> Result<Bytes> {
        let mut guard = self.inner.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| self.closed_error())?;
        read_ber_message(stream, self.inner.max_allocation_size, Some(self.inner.target)).await
    }

    fn peer_addr(&self) -> SocketAddr {
        self.inner.target
    }

    fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    async fn close(&self) {
        let mut guard = self.inner.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
        }
    }
}

/// Read a complete BER-framed LDAP message from a stream.
///
/// Returns the whole message including its tag and length header, ready for
/// [`LdapMessage::decode`](crate::message::LdapMessage::decode).
pub async fn read_ber_message<R: AsyncRead + Unpin>(
    stream: &mut R,
    max_allocation_size: usize,
    target: Option<SocketAddr>,
) -> Result<Bytes> {
    // Tag byte: LDAP messages are always an outer SEQUENCE
    let mut tag_buf = [0u8; 1];
    stream
        .read_exact(&mut tag_buf)
        .await
        .map_err(|e| Error::Io { target, source: e })?;

    let tag = tag_buf[0];
    if tag != 0x30 {
        return Err(Error::decode(
            0,
            DecodeErrorKind::UnexpectedTag {
                expected: 0x30,
                actual: tag,
            },
        ));
    }

    // Length field
    let mut first_len_byte = [0u8; 1];
    stream
        .read_exact(&mut first_len_byte)
        .await
        .map_err(|e| Error::Io { target, source: e })?;

    let (content_len, len_bytes) = if first_len_byte[0] < 0x80 {
        // Short form
        (first_len_byte[0] as usize, vec![first_len_byte[0]])
    } else if first_len_byte[0] == 0x80 {
        return Err(Error::decode(1, DecodeErrorKind::IndefiniteLength));
    } else {
        // Long form: first byte holds the count of following length bytes
        let num_len_bytes = (first_len_byte[0] & 0x7F) as usize;
        if num_len_bytes > 4 {
            return Err(Error::decode(
                1,
                DecodeErrorKind::LengthTooLong {
                    octets: num_len_bytes,
                },
            ));
        }

        let mut len_bytes_buf = vec![0u8; num_len_bytes];
        stream
            .read_exact(&mut len_bytes_buf)
            .await
            .map_err(|e| Error::Io { target, source: e })?;

        let mut length: usize = 0;
        for &b in &len_bytes_buf {
            length = (length << 8) | (b as usize);
        }

        let mut all_len_bytes = vec![first_len_byte[0]];
        all_len_bytes.extend_from_slice(&len_bytes_buf);

        (length, all_len_bytes)
    };

    // Reject excessive claimed sizes before allocating
    if content_len > max_allocation_size {
        return Err(Error::MessageTooLarge {
            size: content_len,
            max: max_allocation_size,
        });
    }

    // Content
    let mut content = vec![0u8; content_len];
    stream
        .read_exact(&mut content)
        .await
        .map_err(|e| Error::Io { target, source: e })?;

    // Reassemble the whole TLV for the decoder
    let total_len = 1 + len_bytes.len() + content_len;
    let mut message = BytesMut::with_capacity(total_len);
    message.extend_from_slice(&[tag]);
    message.extend_from_slice(&len_bytes);
    message.extend_from_slice(&content);

    Ok(message.freeze())
}
