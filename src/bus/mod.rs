// =============================================================================
// Event Bus — ordered append-only topic log
// =============================================================================
//
// One logical append-only log per topic. A publish appends exactly one
// canonical-JSON record (keys sorted, no whitespace) terminated by a
// newline; a read returns previously-published records in insertion order.
// The bus is single-writer-per-topic by design — multi-writer safety is a
// non-goal.
// =============================================================================

mod file;
mod memory;

pub use file::FileBus;
pub use memory::MemoryBus;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Topic names, centralized so producers and consumers never hand-type them.
pub mod topics {
    pub const MARKET_TICK: &str = "market.tick.v1";
    pub const OHLCV_BAR: &str = "ohlcv.bar.v1";
    pub const OHLCV_CORRECTION: &str = "ohlcv.correction.v1";
    pub const METRICS_OHLCV: &str = "metrics.ohlcv.v1";
    pub const INDICATORS_BAR: &str = "indicators.bar.v1";
    pub const FEATURE_SNAPSHOT: &str = "feature.snapshot.v1";
    pub const SIGNAL_DISPLAY: &str = "signal.display.v1";
    pub const ARTICLE_ANALYSIS: &str = "article.analysis.v1";
    pub const FUSION_PLAN: &str = "fusion.plan.v1";
    pub const FUSION_TRACE: &str = "fusion.trace.v1";
    pub const CANDIDATE: &str = "candidate.v1";
    pub const AUDIT_RECORDS: &str = "audit.records.v1";
}

/// The append-only topic bus contract. Implementations MAY use any storage
/// that preserves append order and line integrity.
pub trait EventBus {
    /// Atomically append one record to `topic`. Never partial; never
    /// reorders with prior publishes on the same topic from the same writer.
    fn publish_raw(&self, topic: &str, canonical_line: &str) -> Result<()>;

    /// Returns every record published to `topic` to date, in insertion
    /// order, as raw (already-canonical) lines with the trailing newline
    /// stripped. Empty topic reads return an empty vector, not an error.
    fn read_raw(&self, topic: &str) -> Result<Vec<String>>;
}

/// Serializes `record` as canonical JSON (sorted keys, compact separators)
/// and appends it to `topic`.
pub fn publish<B: EventBus + ?Sized, T: Serialize>(bus: &B, topic: &str, record: &T) -> Result<()> {
    let line = canonical_json_string(record)
        .map_err(|e| PipelineError::InvalidInput(format!("failed to encode record for {topic}: {e}")))?;
    bus.publish_raw(topic, &line)
}

/// Deserializes every record on `topic`, in insertion order. Blank lines are
/// skipped on read.
pub fn read_topic<B: EventBus + ?Sized, T: DeserializeOwned>(bus: &B, topic: &str) -> Result<Vec<T>> {
    bus.read_raw(topic)?
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(&line)
                .map_err(|e| PipelineError::InvalidInput(format!("malformed record on {topic}: {e}")))
        })
        .collect()
}

/// Canonical JSON encoding: keys sorted lexicographically, compact
/// separators, no trailing newline. Centralizing this in the bus means
/// producers never have to think about the framing invariant themselves.
pub fn canonical_json_string<T: Serialize>(value: &T) -> std::result::Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let sorted = sort_value(value);
    serde_json::to_string(&sorted)
}

fn sort_value(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            for k in keys {
                let v = map[&k].clone();
                sorted.insert(k, sort_value(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}
