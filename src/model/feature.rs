use serde::{Deserialize, Serialize};

/// `feature.snapshot.v1` — one record per input bar from the feature
/// worker: EMA20/ATR14/VWAP alongside the bar's own close/volume.
///
/// Distinct from `IndicatorBar`: this carries a cumulative VWAP that
/// `IndicatorEngine` does not compute, and its EMA/ATR periods (20/14) are
/// fixed rather than configurable, matching a separate feature surface
/// rather than the crossover-signal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub as_of_ts_ms: i64,
    pub computed_at_ms: i64,
    pub uses_up_to_ts_ms: i64,
    pub features: FeatureValues,
    pub version: String,
    pub provenance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureValues {
    pub ema_20: Option<f64>,
    pub atr_14: Option<f64>,
    pub vwap: Option<f64>,
    pub close: f64,
    pub volume: i64,
}
