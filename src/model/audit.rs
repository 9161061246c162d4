use serde::{Deserialize, Serialize};

/// `audit.records.v1` — `{id, event_type, ts_ms, payload_json}`. Append-only,
/// never read back by the pipeline itself, only by external observers and
/// tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub event_type: String,
    pub ts_ms: i64,
    pub payload_json: String,
}

impl AuditRecord {
    /// Builds an audit record whose `payload_json` is the canonical
    /// (sorted-key, compact) JSON encoding of `payload`.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, ts_ms: i64, payload: &impl Serialize) -> Self {
        let payload_json = crate::bus::canonical_json_string(payload)
            .unwrap_or_else(|_| "{}".to_string());
        Self {
            id: id.into(),
            event_type: event_type.into(),
            ts_ms,
            payload_json,
        }
    }
}
