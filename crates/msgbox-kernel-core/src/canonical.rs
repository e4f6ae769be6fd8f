//! Canonical CBOR encoding.
//!
//! Anything that is hashed or signed is encoded as a CBOR map with small
//! unsigned integer keys, emitted in ascending key order, definite lengths,
//! smallest integer encodings and no floats. For unsigned keys, numeric order
//! equals the RFC 8949 bytewise key order, so sorting by key is sufficient.

use ciborium::value::{Integer, Value};

use crate::crypto::Digest;
use crate::error::{CoreError, Result};
use crate::message::{Message, MessageDetails};

/// Domain tag for message digests.
pub const MESSAGE_DOMAIN: &[u8] = b"msgbox-message-v1";

/// Builder for a canonical integer-keyed CBOR map.
#[derive(Debug, Default, Clone)]
pub struct CanonicalMap {
    entries: Vec<(u64, Value)>,
}

impl CanonicalMap {
    /// Start an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unsigned integer field.
    pub fn uint(mut self, key: u64, value: u64) -> Self {
        self.entries.push((key, Value::Integer(Integer::from(value))));
        self
    }

    /// Add a byte string field.
    pub fn bytes(mut self, key: u64, value: &[u8]) -> Self {
        self.entries.push((key, Value::Bytes(value.to_vec())));
        self
    }

    /// Add an array of byte strings.
    pub fn byte_array<'a>(mut self, key: u64, values: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let items = values
            .into_iter()
            .map(|v| Value::Bytes(v.to_vec()))
            .collect();
        self.entries.push((key, Value::Array(items)));
        self
    }

    /// Add an array of unsigned integers.
    pub fn uint_array(mut self, key: u64, values: impl IntoIterator<Item = u64>) -> Self {
        let items = values
            .into_iter()
            .map(|v| Value::Integer(Integer::from(v)))
            .collect();
        self.entries.push((key, Value::Array(items)));
        self
    }

    /// Add a nested map.
    pub fn map(mut self, key: u64, nested: CanonicalMap) -> Self {
        // Nested maps are validated when the outer map is finished.
        self.entries.push((key, Value::Map(nested.sorted_entries_unchecked())));
        self
    }

    /// Convert to a CBOR value, sorting keys and rejecting duplicates.
    pub fn into_value(mut self) -> Result<Value> {
        self.entries.sort_by_key(|(k, _)| *k);
        if let Some(pair) = self.entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(CoreError::EncodingError(format!(
                "duplicate map key {}",
                pair[0].0
            )));
        }
        Ok(Value::Map(
            self.entries
                .into_iter()
                .map(|(k, v)| (Value::Integer(Integer::from(k)), v))
                .collect(),
        ))
    }

    /// Encode to canonical bytes.
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let value = self.into_value()?;
        let mut buf = Vec::new();
        ciborium::into_writer(&value, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    fn sorted_entries_unchecked(mut self) -> Vec<(Value, Value)> {
        self.entries.sort_by_key(|(k, _)| *k);
        self.entries
            .into_iter()
            .map(|(k, v)| (Value::Integer(Integer::from(k)), v))
            .collect()
    }
}

/// Message field keys.
mod keys {
    pub const MESSAGE_NUMBER: u64 = 0;
    pub const FORM: u64 = 1;
    pub const AGENT_ID: u64 = 2;
    pub const X_LOC: u64 = 3;
    pub const Y_LOC: u64 = 4;
    pub const CHECKSUM: u64 = 5;
    pub const TEXT: u64 = 6;
    pub const SECURITY_CODE: u64 = 7;

    pub const FORM_LOCATION: u64 = 0;
    pub const FORM_CREDENTIALED: u64 = 1;
}

/// Canonical bytes of a message.
pub fn message_bytes(message: &Message) -> Result<Vec<u8>> {
    let map = CanonicalMap::new()
        .uint(keys::MESSAGE_NUMBER, message.message_number)
        .uint(keys::AGENT_ID, message.agent_id().get());

    let map = match &message.details {
        MessageDetails::Location(report) => map
            .uint(keys::FORM, keys::FORM_LOCATION)
            .uint(keys::X_LOC, report.x_loc)
            .uint(keys::Y_LOC, report.y_loc)
            .uint(keys::CHECKSUM, report.checksum),
        MessageDetails::Credentialed(details) => map
            .uint(keys::FORM, keys::FORM_CREDENTIALED)
            .bytes(keys::TEXT, details.text.as_bytes())
            .bytes(keys::SECURITY_CODE, details.security_code.as_bytes()),
    };

    map.to_bytes()
}

/// Domain-separated digest of a message.
pub fn message_digest(message: &Message) -> Result<Digest> {
    Ok(Digest::tagged(MESSAGE_DOMAIN, &message_bytes(message)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CredentialedDetails, LocationReport};
    use crate::types::{AgentId, MessageText, SecurityCode};

    #[test]
    fn test_small_map_encoding() {
        let bytes = CanonicalMap::new().uint(1, 500).uint(0, 7).to_bytes().unwrap();
        // map(2), 0 => 7, 1 => 500 (0x19 0x01f4)
        assert_eq!(bytes, vec![0xa2, 0x00, 0x07, 0x01, 0x19, 0x01, 0xf4]);
    }

    #[test]
    fn test_key_order_independent_of_insertion() {
        let a = CanonicalMap::new().uint(0, 1).bytes(3, b"x").uint(2, 9);
        let b = CanonicalMap::new().uint(2, 9).uint(0, 1).bytes(3, b"x");
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = CanonicalMap::new().uint(1, 1).uint(1, 2).to_bytes();
        assert!(matches!(result, Err(CoreError::EncodingError(_))));
    }

    #[test]
    fn test_message_digest_distinguishes_forms() {
        let location = Message::new(
            LocationReport::with_checksum(AgentId::new(7), 10, 6000),
            1,
        );
        let credentialed = Message::new(
            CredentialedDetails {
                agent_id: AgentId::new(7),
                text: MessageText::parse("twelve chars").unwrap(),
                security_code: SecurityCode::from_bytes(*b"A7"),
            },
            1,
        );

        let d1 = message_digest(&location).unwrap();
        let d2 = message_digest(&credentialed).unwrap();
        assert_ne!(d1, d2);
        assert_eq!(d1, message_digest(&location).unwrap());
    }

    #[test]
    fn test_message_digest_covers_number() {
        let report = LocationReport::with_checksum(AgentId::new(7), 10, 6000);
        assert_ne!(
            message_digest(&Message::new(report, 1)).unwrap(),
            message_digest(&Message::new(report, 2)).unwrap()
        );
    }
}
