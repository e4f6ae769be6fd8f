//! Strong type definitions for the Message Box Kernel.
//!
//! Identifiers, credentials and counters are newtypes so they cannot be mixed
//! up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Digest;
use crate::error::CoreError;

const CREDENTIAL_DOMAIN: &[u8] = b"msgbox-credential-v1";

/// A message sequence number.
pub type MessageNumber = u64;

/// Identifier of an agent allowed to post messages.
///
/// `0` is the reserved unauthenticated identity: messages from it bypass
/// structural and credential checks in the batch fold.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl AgentId {
    /// The reserved unauthenticated identity.
    pub const RESERVED: Self = Self(0);

    /// Create a new agent id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Check if this is the reserved identity.
    pub const fn is_reserved(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A two-symbol agent credential.
///
/// `"00"` is the sentinel credential carried by the "no such agent" record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityCode(pub [u8; 2]);

impl SecurityCode {
    /// Credential of the sentinel record.
    pub const SENTINEL: Self = Self(*b"00");

    /// Create from raw symbols.
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    /// Get the raw symbols.
    pub const fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }

    /// Symbol-wise comparison without short-circuiting.
    pub fn matches(&self, other: &SecurityCode) -> bool {
        (self.0[0] == other.0[0]) & (self.0[1] == other.0[1])
    }

    /// Check if this is the sentinel credential.
    pub fn is_sentinel(&self) -> bool {
        self.matches(&Self::SENTINEL)
    }

    /// Commitment to this credential as held by `agent_id`.
    ///
    /// Two commitments are equal iff agent and credential are both equal.
    pub fn commitment(&self, agent_id: AgentId) -> Digest {
        let mut data = [0u8; 10];
        data[..8].copy_from_slice(&agent_id.get().to_be_bytes());
        data[8..].copy_from_slice(&self.0);
        Digest::tagged(CREDENTIAL_DOMAIN, &data)
    }
}

impl FromStr for SecurityCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 2] = s
            .as_bytes()
            .try_into()
            .map_err(|_| CoreError::InvalidSecurityCode(s.to_string()))?;
        if !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(CoreError::InvalidSecurityCode(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecurityCode({})", self)
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Number of symbols in a well-formed message text.
pub const MESSAGE_TEXT_LEN: usize = 12;

/// Buffer size of a message text: the payload plus one terminator slot.
pub const MESSAGE_TEXT_BUFFER: usize = MESSAGE_TEXT_LEN + 1;

/// A fixed-size message payload.
///
/// Empty slots are zero. The text is well-formed when it occupies exactly
/// [`MESSAGE_TEXT_LEN`] symbols: slot 12 is set and the terminator slot is empty.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageText(pub [u8; MESSAGE_TEXT_BUFFER]);

impl MessageText {
    /// Wrap a raw buffer. No validation.
    pub const fn from_buffer(buffer: [u8; MESSAGE_TEXT_BUFFER]) -> Self {
        Self(buffer)
    }

    /// Copy as many leading bytes as fit into the buffer.
    ///
    /// Used to build texts of the wrong length; validation decides later.
    pub fn from_prefix(bytes: &[u8]) -> Self {
        let mut buffer = [0u8; MESSAGE_TEXT_BUFFER];
        let n = bytes.len().min(MESSAGE_TEXT_BUFFER);
        buffer[..n].copy_from_slice(&bytes[..n]);
        Self(buffer)
    }

    /// Parse a text of exactly twelve non-NUL symbols.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let bytes = text.as_bytes();
        if bytes.len() != MESSAGE_TEXT_LEN || bytes.contains(&0) {
            return Err(CoreError::InvalidMessageText {
                len: bytes.len(),
            });
        }
        Ok(Self::from_prefix(bytes))
    }

    /// Get the raw buffer.
    pub const fn as_bytes(&self) -> &[u8; MESSAGE_TEXT_BUFFER] {
        &self.0
    }

    /// The twelfth symbol is present and the terminator slot is empty.
    pub fn is_valid(&self) -> bool {
        (self.0[MESSAGE_TEXT_LEN - 1] != 0) & (self.0[MESSAGE_TEXT_LEN] == 0)
    }
}

impl fmt::Debug for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageText({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// What the kernel knows about an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Highest message number accepted from this agent.
    pub last_message_number: MessageNumber,

    /// The agent's credential.
    pub security_code: SecurityCode,
}

impl AgentRecord {
    /// The "no such agent" record.
    pub const SENTINEL: Self = Self {
        last_message_number: 0,
        security_code: SecurityCode::SENTINEL,
    };

    /// Create a new record.
    pub const fn new(last_message_number: MessageNumber, security_code: SecurityCode) -> Self {
        Self {
            last_message_number,
            security_code,
        }
    }

    /// Check if this is the sentinel record.
    pub fn is_sentinel(&self) -> bool {
        self.security_code.is_sentinel()
    }

    /// The same credential with a new last message number.
    pub fn advanced_to(&self, message_number: MessageNumber) -> Self {
        Self {
            last_message_number: message_number,
            security_code: self.security_code,
        }
    }
}

/// Highest message number the system has durably accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(pub MessageNumber);

impl Watermark {
    /// The watermark at system genesis.
    pub const GENESIS: Self = Self(0);

    /// Get the raw value.
    pub const fn get(self) -> MessageNumber {
        self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MessageNumber> for Watermark {
    fn from(n: MessageNumber) -> Self {
        Self(n)
    }
}

/// Public output threaded through a batch attestation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchAccumulator {
    /// Highest admissible message number folded so far.
    pub highest_msg_number: MessageNumber,
}

impl BatchAccumulator {
    /// Start from the given watermark.
    pub const fn seeded(seed: Watermark) -> Self {
        Self {
            highest_msg_number: seed.0,
        }
    }

    /// The accumulated watermark.
    pub const fn watermark(&self) -> Watermark {
        Watermark(self.highest_msg_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_code_parse() {
        let code: SecurityCode = "A7".parse().unwrap();
        assert_eq!(code.as_bytes(), b"A7");
        assert_eq!(code.to_string(), "A7");

        assert!("A".parse::<SecurityCode>().is_err());
        assert!("A77".parse::<SecurityCode>().is_err());
        assert!("A ".parse::<SecurityCode>().is_err());
    }

    #[test]
    fn test_security_code_matches() {
        let a = SecurityCode::from_bytes(*b"A7");
        assert!(a.matches(&SecurityCode::from_bytes(*b"A7")));
        assert!(!a.matches(&SecurityCode::from_bytes(*b"A8")));
        assert!(!a.matches(&SecurityCode::from_bytes(*b"B7")));
        assert!(SecurityCode::SENTINEL.is_sentinel());
    }

    #[test]
    fn test_credential_commitment_binds_agent_and_code() {
        let code = SecurityCode::from_bytes(*b"A7");
        let agent = AgentId::new(7);
        assert_eq!(code.commitment(agent), code.commitment(agent));
        assert_ne!(code.commitment(agent), code.commitment(AgentId::new(8)));
        assert_ne!(
            code.commitment(agent),
            SecurityCode::from_bytes(*b"A8").commitment(agent)
        );
    }

    #[test]
    fn test_message_text_validity() {
        assert!(MessageText::parse("hello world!").unwrap().is_valid());
        assert!(!MessageText::from_prefix(b"hello world").is_valid());
        assert!(!MessageText::from_prefix(b"hello world!!").is_valid());
        assert!(!MessageText::from_prefix(b"").is_valid());
    }

    #[test]
    fn test_message_text_parse_rejects_wrong_length() {
        assert!(matches!(
            MessageText::parse("short"),
            Err(CoreError::InvalidMessageText { len: 5 })
        ));
        assert!(MessageText::parse("thirteen char").is_err());
    }

    #[test]
    fn test_sentinel_record() {
        assert!(AgentRecord::SENTINEL.is_sentinel());
        let record = AgentRecord::new(3, SecurityCode::from_bytes(*b"A7"));
        assert!(!record.is_sentinel());

        let advanced = record.advanced_to(9);
        assert_eq!(advanced.last_message_number, 9);
        assert_eq!(advanced.security_code, record.security_code);
    }

    #[test]
    fn test_reserved_agent() {
        assert!(AgentId::RESERVED.is_reserved());
        assert!(!AgentId::new(7).is_reserved());
    }
}
