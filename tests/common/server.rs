//! In-process scripted LDAP server for testing.
//!
//! Binds an ephemeral localhost port, accepts a single connection, and
//! answers each decoded request through a caller-supplied handler. The
//! handler returns the full message sequence to write back, which lets
//! tests script multi-message flows (intermediate responses followed by a
//! final result) and misbehavior (wrong message IDs, unsolicited
//! notifications).
//!
//! The server stops when the client unbinds, disconnects, or the handler
//! returns `Flow::CloseAfter`.

use async_ldap::message::{BindResponse, LdapMessage, LdapResult, ProtocolOp};
use async_ldap::transport::read_ber_message;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the server does after writing the handler's messages.
pub enum Flow {
    /// Keep serving requests.
    Continue(Vec<LdapMessage>),
    /// Write the messages, then close the connection.
    CloseAfter(Vec<LdapMessage>),
}

/// A scripted LDAP server on an ephemeral localhost port.
pub struct ScriptedServer {
    addr: SocketAddr,
    _task: JoinHandle<()>,
}

impl ScriptedServer {
    /// Spawn a server whose responses are produced by `handler`.
    ///
    /// Binds are answered with success automatically; every other request
    /// goes through the handler.
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: FnMut(&LdapMessage) -> Flow + Send + 'static,
    {
        Self::spawn_raw(accepting_binds(handler)).await
    }

    /// Spawn a server where even binds go through the handler.
    pub async fn spawn_raw<F>(mut handler: F) -> Self
    where
        F: FnMut(&LdapMessage) -> Flow + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");

        let task = tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };

            loop {
                let frame = match read_ber_message(&mut socket, 64 * 1024 * 1024, None).await {
                    Ok(frame) => frame,
                    // Client went away
                    Err(_) => return,
                };
                let message = match LdapMessage::decode(frame) {
                    Ok(message) => message,
                    Err(_) => return,
                };

                if matches!(message.op, ProtocolOp::UnbindRequest) {
                    return;
                }

                let (responses, close) = match handler(&message) {
                    Flow::Continue(responses) => (responses, false),
                    Flow::CloseAfter(responses) => (responses, true),
                };
                for response in responses {
                    if socket.write_all(&response.encode()).await.is_err() {
                        return;
                    }
                }
                if close {
                    let _ = socket.shutdown().await;
                    return;
                }
            }
        });

        Self { addr, _task: task }
    }

    /// The address as a `host:port` string for `Client::builder`.
    pub fn target(&self) -> String {
        self.addr.to_string()
    }
}

/// Wrap a handler so bind requests succeed without reaching it.
fn accepting_binds<F>(mut handler: F) -> impl FnMut(&LdapMessage) -> Flow + Send
where
    F: FnMut(&LdapMessage) -> Flow + Send,
{
    move |message: &LdapMessage| {
        if matches!(message.op, ProtocolOp::BindRequest(_)) {
            Flow::Continue(vec![LdapMessage::new(
                message.message_id,
                ProtocolOp::BindResponse(BindResponse {
                    result: LdapResult::success(),
                    server_sasl_creds: None,
                }),
            )])
        } else {
            handler(message)
        }
    }
}
