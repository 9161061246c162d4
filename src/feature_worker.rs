// =============================================================================
// Feature Worker — EMA20/ATR14/VWAP snapshot producer
// =============================================================================
//
// A second, independent indicator surface alongside `IndicatorEngine`: one
// `feature.snapshot.v1` record per input bar, carrying a cumulative VWAP
// that `IndicatorEngine` does not compute. Unlike `IndicatorEngine` this
// never emits a signal — it is a pure feature surface for downstream
// display/analytics consumers.
// =============================================================================

use std::collections::HashMap;

use crate::bus::{publish, topics, EventBus};
use crate::error::Result;
use crate::model::{Bar, FeatureSnapshot, FeatureValues};

const EMA_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;

/// Seeds directly with the first price (no warm-up gate), then the
/// standard EMA recurrence thereafter.
struct EmaState {
    alpha: f64,
    value: Option<f64>,
}

impl EmaState {
    fn new(period: usize) -> Self {
        Self { alpha: 2.0 / (period as f64 + 1.0), value: None }
    }

    fn update(&mut self, price: f64) -> f64 {
        let next = match self.value {
            None => price,
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }
}

/// True-range history capped at `period` entries, seeded with their mean,
/// then Wilder-smoothed. Returns `None` until the history fills.
struct AtrState {
    period: usize,
    trs: Vec<f64>,
    prev_close: Option<f64>,
    value: Option<f64>,
}

impl AtrState {
    fn new(period: usize) -> Self {
        Self { period, trs: Vec::with_capacity(period), prev_close: None, value: None }
    }

    fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tr = match self.prev_close {
            None => high - low,
            Some(prev_close) => (high - low).max((high - prev_close).abs()).max((prev_close - low).abs()),
        };
        if self.prev_close.is_none() || self.trs.len() < self.period {
            self.trs.push(tr);
        } else {
            let prev = *self.value.get_or_insert_with(|| self.trs.iter().sum::<f64>() / self.trs.len() as f64);
            self.value = Some((prev * (self.period as f64 - 1.0) + tr) / self.period as f64);
        }
        self.prev_close = Some(close);
        self.value
    }
}

/// Cumulative since the first bar seen for this symbol — never resets, so
/// it is a session-to-date VWAP rather than a windowed one.
#[derive(Default)]
struct VwapState {
    cum_pv: f64,
    cum_vol: f64,
}

impl VwapState {
    fn update(&mut self, price: f64, size: i64) -> Option<f64> {
        self.cum_pv += price * size as f64;
        self.cum_vol += size as f64;
        if self.cum_vol == 0.0 {
            None
        } else {
            Some(self.cum_pv / self.cum_vol)
        }
    }
}

struct SymbolState {
    ema20: EmaState,
    atr14: AtrState,
    vwap: VwapState,
}

impl SymbolState {
    fn new() -> Self {
        Self { ema20: EmaState::new(EMA_PERIOD), atr14: AtrState::new(ATR_PERIOD), vwap: VwapState::default() }
    }
}

/// Drives `SymbolState` per symbol, publishing one `feature.snapshot.v1`
/// record per input bar.
pub struct FeatureWorker {
    version: String,
    states: HashMap<String, SymbolState>,
}

impl Default for FeatureWorker {
    fn default() -> Self {
        Self::new("features_v1.0.0")
    }
}

impl FeatureWorker {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), states: HashMap::new() }
    }

    /// Feeds one bar into its symbol's rolling state and publishes the
    /// resulting snapshot. `ema_20` is populated from the first bar;
    /// `atr_14`/`vwap` are `None`/defined per their own warm-up rules.
    pub fn handle_bar<B: EventBus + ?Sized>(&mut self, bus: &B, bar: &Bar) -> Result<()> {
        let state = self.states.entry(bar.symbol.clone()).or_insert_with(SymbolState::new);

        let close = bar.close as f64;
        let ema_20 = state.ema20.update(close);
        let atr_14 = state.atr14.update(bar.high as f64, bar.low as f64, close);
        let vwap = state.vwap.update(close, bar.volume);

        let as_of = bar.end_ms();
        let snapshot = FeatureSnapshot {
            symbol: bar.symbol.clone(),
            as_of_ts_ms: as_of,
            computed_at_ms: as_of,
            uses_up_to_ts_ms: as_of,
            features: FeatureValues { ema_20: Some(ema_20), atr_14, vwap, close, volume: bar.volume },
            version: self.version.clone(),
            provenance: "feature_worker".to_string(),
        };
        publish(bus, topics::FEATURE_SNAPSHOT, &snapshot)
    }
}
