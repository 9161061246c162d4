use serde::{Deserialize, Serialize};

/// A finalized or in-progress OHLCV bar, keyed by `(symbol, timeframe_start_ms)`.
///
/// Invariants enforced by the aggregator that produces these, not by this
/// type itself: `low <= open <= high`, `low <= close <= high`,
/// `timeframe_start_ms % timeframe_ms == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe_ms: i64,
    pub timeframe_start_ms: i64,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
    pub volume: i64,
    pub trade_count: i64,
    pub version: u32,
}

impl Bar {
    pub fn new_open(symbol: &str, timeframe_ms: i64, timeframe_start_ms: i64, price: i64, size: i64) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe_ms,
            timeframe_start_ms,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: size,
            trade_count: 1,
            version: 1,
        }
    }

    pub fn apply_open_tick(&mut self, price: i64, size: i64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += size;
        self.trade_count += 1;
    }

    pub fn end_ms(&self) -> i64 {
        self.timeframe_start_ms + self.timeframe_ms
    }
}

/// A published bar envelope, carrying the wall-clock emission marker and the
/// `replaced` flag (`false` for `ohlcv.bar.v1`, `true` for
/// `ohlcv.correction.v1`) on top of the bar fields themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRecord {
    #[serde(flatten)]
    pub bar: Bar,
    pub replaced: bool,
    pub emitted_ts_ms: i64,
}

/// `metrics.ohlcv.v1` — aggregator-wide counters emitted alongside a publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub symbol: String,
    pub timeframe_start_ms: i64,
    pub timeframe_ms: i64,
    pub trade_count: i64,
    pub volume: i64,
    pub emitted_ts_ms: i64,
    pub counters: AggregatorCounters,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregatorCounters {
    pub bars_published: u64,
    pub corrections: u64,
    pub duplicates: u64,
}

/// `indicators.bar.v1` — one record per input bar, values `None` until warm-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorBar {
    pub symbol: String,
    pub timeframe_start_ms: i64,
    pub indicators: IndicatorValues,
    pub bar: Bar,
    pub emitted_ts_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub atr: Option<f64>,
}
