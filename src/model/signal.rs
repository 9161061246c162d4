use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `LONG` or `SHORT`, per the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

/// A trading signal published to `signal.display.v1`.
///
/// `id` is a stable, content-addressed hash (see
/// [`crate::rule_engines::stable_signal_id`]) — the same semantic inputs
/// always produce the same ID, which is how replay idempotence is achieved
/// at this layer without a transactional store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub signal_type: String,
    pub generated_ts_ms: i64,
    pub entry_price_ticks: i64,
    pub stop_price_ticks: i64,
    #[serde(default)]
    pub target_price_ticks: Vec<i64>,
    pub confidence_pct: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_long: Option<String>,
    #[serde(default)]
    pub debug: HashMap<String, serde_json::Value>,
}
