//! LDAP extended-operation client.
//!
//! [`Client`] drives extended operations over a [`Transport`], correlating
//! responses by message ID and surfacing intermediate responses to the
//! caller as they arrive.
//!
//! # Example
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
//!     println!(
//!         "received {} bytes in {} fragments",
//!         outcome.archive_bytes_received, outcome.fragments_received
//!     );
//!     Ok(())
//! }
//! ```

use crate::error::{DecodeErrorKind, Error, Result};
use crate::extop::collect_support_data::{
    CollectSupportDataArchiveFragment, CollectSupportDataOutput, CollectSupportDataRequest,
    COLLECT_SUPPORT_DATA_FRAGMENT_OID, COLLECT_SUPPORT_DATA_OUTPUT_OID,
};
use crate::extop::revoke_totp::RevokeTotpSharedSecretRequest;
use crate::extop::{ExtendedRequest, ExtendedResponse, IntermediateResponse, Secret};
use crate::message::{BindRequest, LdapMessage, LdapResult, ProtocolOp};
use crate::transport::{TcpTransport, Transport};
use bytes::Bytes;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::instrument;

/// LDAP client, generic over transport with TCP as default.
#[derive(Clone)]
pub struct Client<T: Transport = TcpTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

struct ClientInner<T: Transport> {
    transport: T,
    config: ClientConfig,
    /// Next message ID; positive values only, ID 0 is reserved for
    /// unsolicited notifications.
    next_message_id: AtomicI32,
    /// One operation in flight per connection.
    op_lock: Mutex<()>,
}

/// Client configuration.
///
/// Most users should use [`ClientBuilder`] rather than constructing this
/// directly.
#[derive(Clone)]
pub struct ClientConfig {
    /// Timeout waiting for each response message (default: 60 seconds;
    /// collect-support-data can legitimately pause between fragments while
    /// the server gathers expensive data).
    pub timeout: Duration,
    /// Connection establishment timeout (default: 10 seconds).
    pub connect_timeout: Duration,
    /// DN to bind as after connecting (default: none, anonymous).
    pub bind_dn: Option<String>,
    /// Password for the bind DN.
    pub bind_password: Option<Secret>,
    /// Maximum incoming message size (default: 32MB).
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            bind_dn: None,
            bind_password: None,
            max_message_size: 32 * 1024 * 1024,
        }
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    target: String,
    config: ClientConfig,
}

impl ClientBuilder {
    fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            config: ClientConfig::default(),
        }
    }

    /// Set the per-response timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Bind with the given DN and password immediately after connecting.
    pub fn bind(mut self, dn: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.config.bind_dn = Some(dn.into());
        self.config.bind_password = Some(password.into());
        self
    }

    /// Set the maximum incoming message size.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Connect over TCP, binding if credentials were configured.
    pub async fn connect(self) -> Result<Client<TcpTransport>> {
        let addr = tokio::net::lookup_host(&self.target)
            .await
            .map_err(|e| Error::Io {
                target: None,
                source: e,
            })?
            .next()
            .ok_or_else(|| Error::Config(format!("no addresses for {}", self.target)))?;

        let transport = TcpTransport::builder()
            .timeout(self.config.connect_timeout)
            .max_allocation_size(self.config.max_message_size)
            .connect(addr)
            .await?;

        let client = Client::new(transport, self.config);

        if let (Some(dn), Some(password)) =
            (client.inner.config.bind_dn.clone(), client.inner.config.bind_password.clone())
        {
            client
                .simple_bind(&dn, Bytes::copy_from_slice(password.as_bytes()))
                .await?;
        }

        Ok(client)
    }
}

impl Client<TcpTransport> {
    /// Create a client builder for the given `host:port` target.
    pub fn builder(target: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(target)
    }
}

/// Outcome of a collect-support-data operation.
#[derive(Debug)]
pub struct CollectSupportDataResult {
    /// The final result components from the server.
    pub result: LdapResult,
    /// Number of archive fragments received.
    pub fragments_received: usize,
    /// Total archive bytes streamed to the sink.
    pub archive_bytes_received: u64,
    /// The total size the server promised, from the last fragment seen.
    pub total_archive_size_bytes: Option<i64>,
    /// Tool output emitted while the operation ran.
    pub output_messages: Vec<CollectSupportDataOutput>,
}

impl<T: Transport> Client<T> {
    /// Create a client over an established transport.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                next_message_id: AtomicI32::new(1),
                op_lock: Mutex::new(()),
            }),
        }
    }

    /// The server address.
    pub fn peer_addr(&self) -> std::net::SocketAddr {
        self.inner.transport.peer_addr()
    }

    fn next_message_id(&self) -> i32 {
        // Positive IDs only; skip 0 (reserved) and the negative range on wrap
        self.inner
            .next_message_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(if v >= i32::MAX { 1 } else { v + 1 })
            })
            .expect("fetch_update closure never returns None")
    }

    /// Receive the next message for `message_id`, rejecting mismatches and
    /// surfacing unsolicited notifications.
    async fn recv_for(&self, message_id: i32) -> Result<LdapMessage> {
        let data = timeout(self.inner.config.timeout, self.inner.transport.recv())
            .await
            .map_err(|_| Error::Timeout {
                target: Some(self.inner.transport.peer_addr()),
                elapsed: self.inner.config.timeout,
                message_id,
            })??;

        let message = LdapMessage::decode(data)?;

        if message.is_unsolicited() {
            return Err(self.unsolicited_error(message));
        }
        if message.message_id != message_id {
            tracing::debug!(
                target: "async_ldap::client",
                expected = message_id,
                actual = message.message_id,
                "response message ID mismatch"
            );
            return Err(Error::MessageIdMismatch {
                expected: message_id,
                actual: message.message_id,
            });
        }
        Ok(message)
    }

    fn unsolicited_error(&self, message: LdapMessage) -> Error {
        let target = Some(self.inner.transport.peer_addr());
        match message.op {
            ProtocolOp::ExtendedResponse(resp) => {
                tracing::warn!(
                    target: "async_ldap::client",
                    oid = resp.oid.as_deref().unwrap_or("<none>"),
                    code = %resp.result.result_code,
                    "unsolicited notification"
                );
                Error::Unsolicited {
                    target,
                    oid: resp.oid,
                    code: resp.result.result_code,
                    diagnostic_message: resp.result.diagnostic_message,
                }
            }
            op => Error::decode(0, DecodeErrorKind::UnknownProtocolOp(op.wire_tag())),
        }
    }

    fn ldap_error(&self, result: LdapResult) -> Error {
        Error::Ldap {
            target: Some(self.inner.transport.peer_addr()),
            code: result.result_code,
            matched_dn: result.matched_dn,
            diagnostic_message: result.diagnostic_message,
        }
    }

    /// Perform an LDAP v3 simple bind.
    #[instrument(level = "debug", skip(self, password), fields(peer = %self.peer_addr()))]
    pub async fn simple_bind(&self, dn: &str, password: impl Into<Bytes>) -> Result<()> {
        let _op = self.inner.op_lock.lock().await;
        let message_id = self.next_message_id();

        let request = LdapMessage::new(
            message_id,
            ProtocolOp::BindRequest(BindRequest::simple(dn, password)),
        );
        self.inner.transport.send(&request.encode()).await?;

        let response = self.recv_for(message_id).await?;
        match response.op {
            ProtocolOp::BindResponse(resp) => {
                if resp.result.result_code.is_success() {
                    tracing::debug!(target: "async_ldap::client", dn, "bind successful");
                    Ok(())
                } else {
                    Err(self.ldap_error(resp.result))
                }
            }
            op => Err(Error::decode(
                0,
                DecodeErrorKind::UnknownProtocolOp(op.wire_tag()),
            )),
        }
    }

    /// Run an extended operation, discarding intermediate responses.
    pub async fn extended(&self, request: ExtendedRequest) -> Result<ExtendedResponse> {
        self.extended_with_handler(request, |_| {}).await
    }

    /// Run an extended operation, passing each intermediate response to
    /// `on_intermediate` as it arrives.
    ///
    /// The returned response may carry a non-success result code; callers
    /// decide whether that is an error for their operation.
    #[instrument(level = "debug", skip(self, request, on_intermediate), fields(peer = %self.peer_addr(), oid = %request.oid))]
    pub async fn extended_with_handler(
        &self,
        request: ExtendedRequest,
        mut on_intermediate: impl FnMut(IntermediateResponse),
    ) -> Result<ExtendedResponse> {
        let _op = self.inner.op_lock.lock().await;
        let message_id = self.next_message_id();

        let message = LdapMessage::new(message_id, ProtocolOp::ExtendedRequest(request));
        self.inner.transport.send(&message.encode()).await?;

        loop {
            let response = self.recv_for(message_id).await?;
            match response.op {
                ProtocolOp::IntermediateResponse(ir) => on_intermediate(ir),
                ProtocolOp::ExtendedResponse(resp) => return Ok(resp),
                op => {
                    return Err(Error::decode(
                        0,
                        DecodeErrorKind::UnknownProtocolOp(op.wire_tag()),
                    ));
                }
            }
        }
    }

    /// Run collect-support-data, streaming archive fragment bytes to
    /// `archive_sink` in arrival order.
    ///
    /// Tool output lines are collected into the returned
    /// [`CollectSupportDataResult`] (and logged at debug level as they
    /// arrive). A non-success final result code is returned as
    /// [`Error::Ldap`].
    #[instrument(level = "debug", skip_all, fields(peer = %self.peer_addr()))]
    pub async fn collect_support_data(
        &self,
        request: &CollectSupportDataRequest,
        mut archive_sink: impl FnMut(&[u8]) -> std::io::Result<()>,
    ) -> Result<CollectSupportDataResult> {
        let mut fragments_received = 0usize;
        let mut archive_bytes_received = 0u64;
        let mut total_archive_size_bytes = None;
        let mut more_expected = true;
        let mut output_messages = Vec::new();
        let mut sink_error = None;

        let response = self
            .extended_with_handler(request.to_extended_request(), |ir| {
                if sink_error.is_some() {
                    return;
                }
                match ir.oid.as_deref() {
                    Some(COLLECT_SUPPORT_DATA_FRAGMENT_OID) => {
                        match CollectSupportDataArchiveFragment::from_intermediate_response(&ir) {
                            Ok(fragment) => {
                                fragments_received += 1;
                                archive_bytes_received += fragment.fragment_data.len() as u64;
                                total_archive_size_bytes = Some(fragment.total_archive_size_bytes);
                                more_expected = fragment.more_data_to_return;
                                if let Err(e) = archive_sink(&fragment.fragment_data) {
                                    sink_error = Some(Error::Io {
                                        target: None,
                                        source: e,
                                    });
                                }
                            }
                            Err(e) => sink_error = Some(e),
                        }
                    }
                    Some(COLLECT_SUPPORT_DATA_OUTPUT_OID) => {
                        match CollectSupportDataOutput::from_intermediate_response(&ir) {
                            Ok(output) => {
                                tracing::debug!(
                                    target: "async_ldap::client",
                                    stream = %output.stream,
                                    message = %output.message,
                                    "collect-support-data output"
                                );
                                output_messages.push(output);
                            }
                            Err(e) => sink_error = Some(e),
                        }
                    }
                    other => {
                        tracing::debug!(
                            target: "async_ldap::client",
                            oid = other.unwrap_or("<none>"),
                            "ignoring unrecognized intermediate response"
                        );
                    }
                }
            })
            .await?;

        if let Some(e) = sink_error {
            return Err(e);
        }

        if !response.result.result_code.is_success() {
            return Err(self.ldap_error(response.result));
        }

        if more_expected && fragments_received > 0 {
            tracing::warn!(
                target: "async_ldap::client",
                fragments = fragments_received,
                "operation completed but the last fragment promised more data"
            );
        }

        Ok(CollectSupportDataResult {
            result: response.result,
            fragments_received,
            archive_bytes_received,
            total_archive_size_bytes,
            output_messages,
        })
    }

    /// Revoke TOTP shared secrets.
    ///
    /// A non-success result code is returned as [`Error::Ldap`].
    #[instrument(level = "debug", skip_all, fields(peer = %self.peer_addr()))]
    pub async fn revoke_totp_shared_secret(
        &self,
        request: &RevokeTotpSharedSecretRequest,
    ) -> Result<()> {
        let response = self.extended(request.to_extended_request()).await?;
        if response.result.result_code.is_success() {
            Ok(())
        } else {
            Err(self.ldap_error(response.result))
        }
    }

    /// Send an unbind request and close the connection.
    ///
    /// Unbind has no response; transport errors while sending are ignored
    /// because the connection is being torn down regardless.
    #[instrument(level = "debug", skip_all, fields(peer = %self.peer_addr()))]
    pub async fn unbind(&self) {
        let _op = self.inner.op_lock.lock().await;
        let message_id = self.next_message_id();
        let message = LdapMessage::new(message_id, ProtocolOp::UnbindRequest);
        let _ = self.inner.transport.send(&message.encode()).await;
        self.inner.transport.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_allocation() {
        struct NoopTransport;
        impl Clone for NoopTransport {
            fn clone(&self) -> Self {
                NoopTransport
            }
        }
        impl Transport for NoopTransport {
            async fn send(&self, _data: &[u8]) -> Result<()> {
                Ok(())
            }
            async fn recv(&self) -> Result<Bytes> {
                unimplemented!()
            }
            fn peer_addr(&self) -> std::net::SocketAddr {
                "127.0.0.1:389".parse().unwrap()
            }
            fn local_addr(&self) -> std::net::SocketAddr {
                "127.0.0.1:0".parse().unwrap()
            }
            async fn close(&self) {}
        }

        let client = Client::new(NoopTransport, ClientConfig::default());
        assert_eq!(client.next_message_id(), 1);
        assert_eq!(client.next_message_id(), 2);

        // Wrap skips 0 and the negative range
        client.inner.next_message_id.store(i32::MAX, Ordering::Relaxed);
        assert_eq!(client.next_message_id(), i32::MAX);
        assert_eq!(client.next_message_id(), 1);
    }
}
