//! Messages: the unit of input to the kernel.
//!
//! A message carries a claimed sequence number and one of two detail forms:
//! a numeric location report, or a credentialed text message.

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, MessageNumber, MessageText, SecurityCode};

/// Numeric-fields form of message details.
///
/// Well-formedness is a property of the fields alone: bounds, checksum and
/// coordinate ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationReport {
    pub agent_id: AgentId,
    pub x_loc: u64,
    pub y_loc: u64,
    pub checksum: u64,
}

impl LocationReport {
    /// Build a report whose checksum is correct for its fields.
    pub fn with_checksum(agent_id: AgentId, x_loc: u64, y_loc: u64) -> Self {
        Self {
            agent_id,
            x_loc,
            y_loc,
            checksum: agent_id.get().wrapping_add(x_loc).wrapping_add(y_loc),
        }
    }
}

/// Credentialed form of message details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialedDetails {
    pub agent_id: AgentId,
    pub text: MessageText,
    pub security_code: SecurityCode,
}

/// The details of a message, in one of the two supported forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageDetails {
    /// Location report (structural checks only).
    Location(LocationReport),
    /// Text message carrying the agent's credential.
    Credentialed(CredentialedDetails),
}

impl MessageDetails {
    /// The agent this message claims to come from.
    pub fn agent_id(&self) -> AgentId {
        match self {
            MessageDetails::Location(report) => report.agent_id,
            MessageDetails::Credentialed(details) => details.agent_id,
        }
    }
}

impl From<LocationReport> for MessageDetails {
    fn from(report: LocationReport) -> Self {
        MessageDetails::Location(report)
    }
}

impl From<CredentialedDetails> for MessageDetails {
    fn from(details: CredentialedDetails) -> Self {
        MessageDetails::Credentialed(details)
    }
}

/// A message with its claimed sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub details: MessageDetails,
    pub message_number: MessageNumber,
}

impl Message {
    /// Create a new message.
    pub fn new(details: impl Into<MessageDetails>, message_number: MessageNumber) -> Self {
        Self {
            details: details.into(),
            message_number,
        }
    }

    /// The agent this message claims to come from.
    pub fn agent_id(&self) -> AgentId {
        self.details.agent_id()
    }

    /// The credentialed details, if this is a credentialed message.
    pub fn credentialed(&self) -> Option<&CredentialedDetails> {
        match &self.details {
            MessageDetails::Credentialed(details) => Some(details),
            MessageDetails::Location(_) => None,
        }
    }
}
