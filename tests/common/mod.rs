//! Shared test infrastructure.

mod server;

pub use server::{Flow, ScriptedServer};

/// A handler result that answers with nothing at all.
pub fn server_noop() -> Flow {
    Flow::Continue(Vec::new())
}

use async_ldap::extop::collect_support_data::{
    CollectSupportDataArchiveFragment, CollectSupportDataOutput, OutputStream,
    COLLECT_SUPPORT_DATA_RESULT_OID,
};
use async_ldap::extop::ExtendedResponse;
use async_ldap::message::{LdapMessage, LdapResult, ProtocolOp};
use async_ldap::ResultCode;

/// Build the message sequence a server emits for a successful
/// collect-support-data operation: tool output, `archive` split into
/// `fragment_size` chunks, then the final extended response.
pub fn csd_success_script(
    message_id: i32,
    archive: &[u8],
    fragment_size: usize,
) -> Vec<LdapMessage> {
    let mut messages = vec![LdapMessage::new(
        message_id,
        ProtocolOp::IntermediateResponse(
            CollectSupportDataOutput::new(OutputStream::StandardOutput, "collecting data...")
                .to_intermediate_response(),
        ),
    )];

    let chunks: Vec<&[u8]> = archive.chunks(fragment_size.max(1)).collect();
    let total = archive.len() as i64;
    for (i, chunk) in chunks.iter().enumerate() {
        let more = i + 1 < chunks.len();
        messages.push(LdapMessage::new(
            message_id,
            ProtocolOp::IntermediateResponse(
                CollectSupportDataArchiveFragment::new(total, more, chunk.to_vec())
                    .to_intermediate_response(),
            ),
        ));
    }

    messages.push(LdapMessage::new(
        message_id,
        ProtocolOp::ExtendedResponse(
            ExtendedResponse::with_result(LdapResult::success())
                .named(COLLECT_SUPPORT_DATA_RESULT_OID),
        ),
    ));
    messages
}

/// An extended response with the given result code.
pub fn extended_result(message_id: i32, code: ResultCode, diagnostic: &str) -> LdapMessage {
    LdapMessage::new(
        message_id,
        ProtocolOp::ExtendedResponse(ExtendedResponse::with_result(LdapResult::with_code(
            code, diagnostic,
        ))),
    )
}
