//! Proptest generators for property-based testing.

use proptest::prelude::*;

use msgbox_kernel_core::{
    AgentId, AgentRecord, CredentialedDetails, LocationReport, Message, MessageText,
    SecurityCode, MESSAGE_TEXT_BUFFER,
};

use crate::fixtures::{GENESIS_AGENT, GENESIS_CODE, TEXT};

/// Generate an agent id inside the location-report bounds.
pub fn agent_id() -> impl Strategy<Value = AgentId> {
    (0u64..=3000).prop_map(AgentId::new)
}

/// Generate a printable, non-sentinel security code.
pub fn security_code() -> impl Strategy<Value = SecurityCode> {
    "[A-Z0-9]{2}"
        .prop_filter("sentinel", |s| s != "00")
        .prop_map(|s| {
            let b = s.as_bytes();
            SecurityCode::from_bytes([b[0], b[1]])
        })
}

/// Generate a non-sentinel agent record.
pub fn agent_record() -> impl Strategy<Value = AgentRecord> {
    (0u64..1000, security_code()).prop_map(|(n, code)| AgentRecord::new(n, code))
}

/// Generate a message number.
pub fn message_number() -> impl Strategy<Value = u64> {
    0u64..1000
}

/// Generate a well-formed location report.
pub fn valid_location(agent: AgentId) -> impl Strategy<Value = LocationReport> {
    (0u64..=15000, 1u64..=5000).prop_filter_map("y out of range", move |(x, dy)| {
        let y = x.checked_add(dy)?.max(5000);
        (y <= 20000 && y > x).then(|| LocationReport::with_checksum(agent, x, y))
    })
}

/// Generate a location report that fails at least one structural check.
pub fn malformed_location(agent: AgentId) -> impl Strategy<Value = LocationReport> {
    prop_oneof![
        // Bad checksum
        (valid_location(agent), 1u64..100).prop_map(|(mut r, drift)| {
            r.checksum = r.checksum.wrapping_add(drift);
            r
        }),
        // y not above x
        (5000u64..=15000).prop_map(move |x| LocationReport::with_checksum(agent, x, x)),
        // Out of bounds
        (20001u64..30000).prop_map(move |y| LocationReport::with_checksum(agent, 0, y)),
    ]
}

/// Generate a message text of arbitrary occupied length.
pub fn message_text() -> impl Strategy<Value = MessageText> {
    prop::collection::vec(b'a'..=b'z', 0..=MESSAGE_TEXT_BUFFER)
        .prop_map(|bytes| MessageText::from_prefix(&bytes))
}

/// Classification of a generated message for the fixture's genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// May raise the watermark.
    Admissible,
    /// Always skipped.
    Skipped,
}

/// Generate messages against the fixture genesis, with their expected class.
pub fn classified_message() -> impl Strategy<Value = (Message, Expect)> {
    prop_oneof![
        (valid_location(GENESIS_AGENT), message_number())
            .prop_map(|(r, n)| (Message::new(r, n), Expect::Admissible)),
        (malformed_location(GENESIS_AGENT), message_number())
            .prop_map(|(r, n)| (Message::new(r, n), Expect::Skipped)),
        (malformed_location(AgentId::RESERVED), message_number())
            .prop_map(|(r, n)| (Message::new(r, n), Expect::Admissible)),
        (1u64..=3000, message_number()).prop_map(|(agent, n)| {
            let report = LocationReport::with_checksum(AgentId::new(agent), 10, 6000);
            (Message::new(report, n), Expect::Admissible)
        }),
        (1u64..=3000, message_number()).prop_filter_map("genesis agent", |(agent, n)| {
            (agent != GENESIS_AGENT.get()).then(|| {
                let details = CredentialedDetails {
                    agent_id: AgentId::new(agent),
                    text: MessageText::from_prefix(TEXT),
                    security_code: GENESIS_CODE,
                };
                (Message::new(details, n), Expect::Skipped)
            })
        }),
        (security_code(), message_number()).prop_map(|(code, n)| {
            let expect = if code == GENESIS_CODE {
                Expect::Admissible
            } else {
                Expect::Skipped
            };
            let details = CredentialedDetails {
                agent_id: GENESIS_AGENT,
                text: MessageText::from_prefix(TEXT),
                security_code: code,
            };
            (Message::new(details, n), expect)
        }),
        (message_text(), message_number()).prop_map(|(text, n)| {
            let details = CredentialedDetails {
                agent_id: GENESIS_AGENT,
                text,
                security_code: GENESIS_CODE,
            };
            let expect = if text.is_valid() {
                Expect::Admissible
            } else {
                Expect::Skipped
            };
            (Message::new(details, n), expect)
        }),
    ]
}

/// Generate a stream of classified messages.
pub fn message_stream(max_len: usize) -> impl Strategy<Value = Vec<(Message, Expect)>> {
    prop::collection::vec(classified_message(), 0..=max_len)
}

/// The watermark a stream must fold to.
pub fn expected_watermark(seed: u64, stream: &[(Message, Expect)]) -> u64 {
    stream
        .iter()
        .filter(|(_, expect)| *expect == Expect::Admissible)
        .map(|(message, _)| message.message_number)
        .fold(seed, u64::max)
}
