//! Message validation rules.
//!
//! The predicates here are pure and stateless. The `*_fails` / `*_valid`
//! functions return plain booleans for the batch fold; the `check_*` functions
//! return typed faults for the direct submission path.

use crate::error::{AuthorizationFault, StructuralFault, ValidationError};
use crate::message::{CredentialedDetails, LocationReport, Message, MessageDetails};
use crate::types::AgentRecord;

/// A closed interval of allowed field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u64,
    pub max: u64,
}

impl Bounds {
    /// Create a closed interval.
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Check if `value` lies within the interval.
    pub const fn contains(&self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Allowed agent ids in a location report.
pub const AGENT_ID_BOUNDS: Bounds = Bounds::new(0, 3000);

/// Allowed x coordinates in a location report.
pub const X_LOC_BOUNDS: Bounds = Bounds::new(0, 15000);

/// Allowed y coordinates in a location report.
pub const Y_LOC_BOUNDS: Bounds = Bounds::new(5000, 20000);

/// The checksum is not the sum of agent id and both coordinates.
pub fn checksum_fails(report: &LocationReport) -> bool {
    expected_checksum(report) != u128::from(report.checksum)
}

/// The y coordinate does not strictly exceed the x coordinate.
pub fn location_fails(report: &LocationReport) -> bool {
    report.y_loc <= report.x_loc
}

/// Any field lies outside its allowed interval.
pub fn bounds_fail(report: &LocationReport) -> bool {
    !AGENT_ID_BOUNDS.contains(report.agent_id.get())
        | !X_LOC_BOUNDS.contains(report.x_loc)
        | !Y_LOC_BOUNDS.contains(report.y_loc)
}

/// The message text occupies exactly twelve symbols.
pub fn text_valid(details: &CredentialedDetails) -> bool {
    details.text.is_valid()
}

/// The message carries the record's credential.
pub fn credential_matches(details: &CredentialedDetails, record: &AgentRecord) -> bool {
    details.security_code.matches(&record.security_code)
}

/// The message number is past the record's last accepted number.
pub fn sequence_advances(message: &Message, record: &AgentRecord) -> bool {
    message.message_number > record.last_message_number
}

/// Check structural well-formedness for either detail form.
pub fn is_well_formed(details: &MessageDetails) -> bool {
    match details {
        MessageDetails::Location(report) => {
            !(checksum_fails(report) | location_fails(report) | bounds_fail(report))
        }
        MessageDetails::Credentialed(details) => text_valid(details),
    }
}

/// Check authorization against a resolved record.
///
/// Location reports carry no credential: their fields are the whole check,
/// so they are authorized for any agent. A credentialed message needs a
/// known record with a matching credential; the sentinel record authorizes
/// nothing, even a message that carries the sentinel credential.
pub fn is_authorized(details: &MessageDetails, record: &AgentRecord) -> bool {
    match details {
        MessageDetails::Location(_) => true,
        MessageDetails::Credentialed(details) => {
            !record.is_sentinel() & credential_matches(details, record)
        }
    }
}

/// Check a location report, reporting the first fault found.
///
/// Faults are checked in order: bounds, checksum, location.
pub fn check_location_report(report: &LocationReport) -> Result<(), StructuralFault> {
    for (field, value, bounds) in [
        ("agent_id", report.agent_id.get(), AGENT_ID_BOUNDS),
        ("x_loc", report.x_loc, X_LOC_BOUNDS),
        ("y_loc", report.y_loc, Y_LOC_BOUNDS),
    ] {
        if !bounds.contains(value) {
            return Err(StructuralFault::OutOfBounds {
                field,
                value,
                min: bounds.min,
                max: bounds.max,
            });
        }
    }

    if checksum_fails(report) {
        return Err(StructuralFault::ChecksumMismatch {
            expected: expected_checksum(report),
            got: report.checksum,
        });
    }

    if location_fails(report) {
        return Err(StructuralFault::LocationOrder {
            x_loc: report.x_loc,
            y_loc: report.y_loc,
        });
    }

    Ok(())
}

/// Fully validate a message against the resolved record of its agent.
///
/// Used by the direct submission path, where any failure aborts the call.
/// The direct path advances the agent's record, so an unknown agent is
/// rejected for both forms. Order: unknown agent, structure, credential,
/// sequence.
pub fn check_message(message: &Message, record: &AgentRecord) -> Result<(), ValidationError> {
    let agent_id = message.agent_id();

    if record.is_sentinel() {
        return Err(AuthorizationFault::UnknownAgent(agent_id).into());
    }

    match &message.details {
        MessageDetails::Location(report) => check_location_report(report)?,
        MessageDetails::Credentialed(details) => {
            if !text_valid(details) {
                return Err(StructuralFault::TextFormat.into());
            }
            if !credential_matches(details, record) {
                return Err(AuthorizationFault::CredentialMismatch(agent_id).into());
            }
        }
    }

    if !sequence_advances(message, record) {
        return Err(ValidationError::Sequencing {
            last: record.last_message_number,
            got: message.message_number,
        });
    }

    Ok(())
}

fn expected_checksum(report: &LocationReport) -> u128 {
    u128::from(report.agent_id.get()) + u128::from(report.x_loc) + u128::from(report.y_loc)
}
