//! Property-based tests for the BER codec and message framing.
//!
//! These validate round-trip symmetry in isolation: anything the encoder
//! produces, the decoder must read back unchanged, for arbitrary values.

use async_ldap::ber::{Decoder, EncodeBuf};
use async_ldap::extop::collect_support_data::{
    CollectSupportDataArchiveFragment, CollectSupportDataRequest, SecurityLevel,
};
use async_ldap::extop::{ExtendedRequest, IntermediateResponse};
use async_ldap::message::{Control, LdapMessage, ProtocolOp};
use bytes::Bytes;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Printable OID-ish strings (digits and dots).
fn arb_oid_string() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..40, 2..8).prop_map(|arcs| {
        arcs.iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(".")
    })
}

fn arb_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..max)
}

fn arb_security_level() -> impl Strategy<Value = SecurityLevel> {
    prop_oneof![
        Just(SecurityLevel::None),
        Just(SecurityLevel::ObscureSecrets),
        Just(SecurityLevel::Maximum),
    ]
}

fn arb_csd_request() -> impl Strategy<Value = CollectSupportDataRequest> {
    (
        (
            prop::option::of("[a-zA-Z0-9._-]{1,32}"),
            prop::option::of("[ -~]{0,64}".prop_map(async_ldap::Secret::from)),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
            arb_security_level(),
            any::<bool>(),
        ),
        (
            prop::option::of(0i32..1000),
            prop::option::of(1i32..3600),
            prop::option::of(0i32..100),
            prop::option::of("[0-9]{1,4}[smh]"),
            prop::option::of("[ -~]{0,64}"),
            prop::option::of(1i32..16_000_000),
        ),
    )
        .prop_map(
            |(
                (
                    archive_file_name,
                    encryption_passphrase,
                    include_expensive_data,
                    include_replication_state_dump,
                    include_binary_files,
                    security_level,
                    use_sequential_mode,
                ),
                (
                    report_count,
                    report_interval_seconds,
                    jstack_count,
                    log_duration,
                    comment,
                    maximum_fragment_size_bytes,
                ),
            )| CollectSupportDataRequest {
                archive_file_name,
                encryption_passphrase,
                include_expensive_data,
                include_replication_state_dump,
                include_binary_files,
                security_level,
                use_sequential_mode,
                report_count,
                report_interval_seconds,
                jstack_count,
                log_duration,
                log_start_time: None,
                log_end_time: None,
                comment,
                maximum_fragment_size_bytes,
            },
        )
}

// =============================================================================
// BER primitives
// =============================================================================

proptest! {
    #[test]
    fn integer_roundtrip(value in any::<i32>()) {
        let mut buf = EncodeBuf::new();
        buf.push_integer(value);
        let mut dec = Decoder::new(buf.finish());
        prop_assert_eq!(dec.read_integer().unwrap(), value);
        prop_assert!(dec.is_empty());
    }

    #[test]
    fn integer64_roundtrip(value in any::<i64>()) {
        let mut buf = EncodeBuf::new();
        buf.push_integer64_with_tag(0x85, value);
        let mut dec = Decoder::new(buf.finish());
        let len = dec.expect_tag(0x85).unwrap();
        prop_assert_eq!(dec.read_integer64_value(len).unwrap(), value);
    }

    #[test]
    fn octet_string_roundtrip(data in arb_bytes(512)) {
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(&data);
        let mut dec = Decoder::new(buf.finish());
        prop_assert_eq!(&dec.read_octet_string().unwrap()[..], &data[..]);
    }

    #[test]
    fn enumerated_roundtrip(value in any::<i32>()) {
        let mut buf = EncodeBuf::new();
        buf.push_enumerated(value);
        let mut dec = Decoder::new(buf.finish());
        prop_assert_eq!(dec.read_enumerated().unwrap(), value);
    }

    #[test]
    fn nested_sequence_roundtrip(values in prop::collection::vec(any::<i32>(), 0..20)) {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            for v in values.iter().rev() {
                buf.push_integer(*v);
            }
        });
        let mut dec = Decoder::new(buf.finish());
        let mut seq = dec.read_sequence().unwrap();
        for v in &values {
            prop_assert_eq!(seq.read_integer().unwrap(), *v);
        }
        prop_assert!(seq.expect_end().is_ok());
    }

    /// The decoder must never panic on arbitrary input, only error.
    #[test]
    fn decoder_total_on_garbage(data in arb_bytes(256)) {
        let mut dec = Decoder::new(Bytes::from(data));
        // Walk TLVs until error or exhaustion
        while !dec.is_empty() {
            if dec.skip_tlv().is_err() {
                break;
            }
        }
    }

    /// Message decoding must never panic on arbitrary input.
    #[test]
    fn message_decode_total_on_garbage(data in arb_bytes(256)) {
        let _ = LdapMessage::decode(Bytes::from(data));
    }
}

// =============================================================================
// Message framing
// =============================================================================

proptest! {
    #[test]
    fn extended_request_message_roundtrip(
        message_id in 1i32..i32::MAX,
        oid in arb_oid_string(),
        value in prop::option::of(arb_bytes(256)),
    ) {
        let mut request = ExtendedRequest::new(oid.clone());
        if let Some(v) = &value {
            request = request.with_value(v.clone());
        }
        let msg = LdapMessage::new(message_id, ProtocolOp::ExtendedRequest(request));

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        prop_assert_eq!(decoded.message_id, message_id);
        match decoded.op {
            ProtocolOp::ExtendedRequest(req) => {
                prop_assert_eq!(&*req.oid, oid.as_str());
                prop_assert_eq!(req.value.map(|b| b.to_vec()), value);
            }
            other => prop_assert!(false, "unexpected op: {:?}", other),
        }
    }

    #[test]
    fn intermediate_response_roundtrip(
        oid in prop::option::of(arb_oid_string()),
        value in prop::option::of(arb_bytes(256)),
    ) {
        let ir = IntermediateResponse {
            oid: oid.map(Into::into),
            value: value.map(Bytes::from),
        };
        let mut buf = EncodeBuf::new();
        ir.encode(&mut buf);
        let mut dec = Decoder::new(buf.finish());
        prop_assert_eq!(IntermediateResponse::decode(&mut dec).unwrap(), ir);
    }

    #[test]
    fn controls_roundtrip(
        specs in prop::collection::vec(
            (arb_oid_string(), any::<bool>(), prop::option::of(arb_bytes(64))),
            0..5,
        )
    ) {
        let controls: Vec<Control> = specs
            .into_iter()
            .map(|(oid, criticality, value)| Control {
                oid: oid.into(),
                criticality,
                value: value.map(Bytes::from),
            })
            .collect();

        let mut msg = LdapMessage::new(1, ProtocolOp::UnbindRequest);
        msg.controls = controls.clone();

        let decoded = LdapMessage::decode(msg.encode()).unwrap();
        prop_assert_eq!(decoded.controls, controls);
    }
}

// =============================================================================
// Typed extended operations
// =============================================================================

proptest! {
    #[test]
    fn csd_request_roundtrip(request in arb_csd_request()) {
        let decoded = CollectSupportDataRequest::decode_value(request.encode_value()).unwrap();
        prop_assert_eq!(decoded, request);
    }

    #[test]
    fn archive_fragment_roundtrip(
        total in 0i64..i64::MAX,
        more in any::<bool>(),
        data in arb_bytes(2048),
    ) {
        let fragment = CollectSupportDataArchiveFragment::new(total, more, data);
        let decoded =
            CollectSupportDataArchiveFragment::decode_value(fragment.encode_value()).unwrap();
        prop_assert_eq!(decoded, fragment);
    }
}
