//! vpnmon Core - Data model for the VPN relay availability monitor
//!
//! This crate provides:
//! - Relay node and probe outcome types
//! - The report structure and its wire format
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{AvailabilitySummary, Node, NodeRecord, ProbeOutcome, Report, ReportEntry, Verdict};

use serde::Serialize;

/// Serialize a value to JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Serialize a value to JSON indented by four spaces
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })?;

    String::from_utf8(buf).map_err(|e| {
        CoreError::serialization_error(
            format!("Serialized JSON is not valid UTF-8: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a value from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| {
        CoreError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_json_uses_four_space_indent() {
        let entry = ReportEntry {
            hostname: "relay1".to_string(),
            id: 1,
            status: Some(true),
        };

        let json = to_json_pretty(&entry).unwrap();
        assert!(json.contains("\n    \"hostname\": \"relay1\""));
        assert!(json.contains("\n    \"status\": true"));
    }

    #[test]
    fn test_node_records_from_json() {
        let records: Vec<NodeRecord> =
            from_json(r#"[{"id": 1, "hostname": "a"}, {"id": 2, "ip_address": null}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].host(), Some("a"));
        assert_eq!(records[1].host(), None);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result: Result<Vec<NodeRecord>> = from_json("not json");
        assert!(matches!(result, Err(CoreError::SerializationError { .. })));
    }
}
