use serde::{Deserialize, Serialize};

/// One trade report on `market.tick.v1`.
///
/// Prices are integer "ticks" (fixed-point, scale set per instrument);
/// timestamps are milliseconds since epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub ts_ms: i64,
    pub price_ticks: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

fn default_size() -> i64 {
    1
}

impl Tick {
    /// Dedupe key per the data model: `trade_id` if present, else the tuple
    /// `(seq, ts_ms, price_ticks, size)`. Returns `None` when neither
    /// `trade_id` nor `seq` is present — such ticks are not dedupable and
    /// must always be accepted.
    pub fn dedupe_key(&self) -> Option<String> {
        if let Some(id) = &self.trade_id {
            return Some(id.clone());
        }
        let seq = self.seq?;
        Some(format!("{seq}:{}:{}:{}", self.ts_ms, self.price_ticks, self.size))
    }
}
