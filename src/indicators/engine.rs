// =============================================================================
// Incremental Indicator Engine — per-symbol rolling EMA/ATR
// =============================================================================
//
// Runtime mirror of the batch `calculate_ema`/`calculate_atr` formulas,
// adapted to streaming per-bar updates: same SMA-seeded warm-up, same
// Wilder recurrence for ATR, but one `update()` call per incoming bar
// instead of a whole-slice recomputation.
// =============================================================================

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::bus::{publish, topics, EventBus};
use crate::config::IndicatorConfig;
use crate::error::Result;
use crate::model::{Bar, IndicatorBar, IndicatorValues, Side, Signal};
use crate::validator::publish_validated_signal;

const CROSSOVER_EPSILON: f64 = 1e-9;

/// Per-symbol rolling state: close-price ring buffer (sized for debugging /
/// potential future indicators), EMA short/long with their immediately
/// preceding values (for crossover detection), and Wilder-smoothed ATR.
pub struct IndicatorState {
    short_period: usize,
    long_period: usize,
    atr_period: usize,
    prices: VecDeque<f64>,
    ema_short: Option<f64>,
    ema_long: Option<f64>,
    prev_ema_short: Option<f64>,
    prev_ema_long: Option<f64>,
    trs: VecDeque<f64>,
    atr: Option<f64>,
    last_close: Option<f64>,
}

impl IndicatorState {
    fn new(cfg: &IndicatorConfig) -> Self {
        let capacity = cfg.ema_long.max(cfg.atr_period) + 10;
        Self {
            short_period: cfg.ema_short,
            long_period: cfg.ema_long,
            atr_period: cfg.atr_period,
            prices: VecDeque::with_capacity(capacity),
            ema_short: None,
            ema_long: None,
            prev_ema_short: None,
            prev_ema_long: None,
            trs: VecDeque::with_capacity(cfg.atr_period),
            atr: None,
            last_close: None,
        }
    }

    fn push_bounded(buf: &mut VecDeque<f64>, value: f64, cap: usize) {
        buf.push_back(value);
        while buf.len() > cap {
            buf.pop_front();
        }
    }

    /// Feeds one bar's OHLC into the rolling state and returns the updated
    /// indicator values (each `None` until its own warm-up completes).
    pub fn update_from_bar(&mut self, bar: &Bar) -> IndicatorValues {
        let close = bar.close as f64;
        let high = bar.high as f64;
        let low = bar.low as f64;

        if self.last_close.is_none() {
            self.last_close = Some(close);
        }

        let capacity = self.long_period.max(self.atr_period) + 10;
        Self::push_bounded(&mut self.prices, close, capacity);

        self.prev_ema_short = self.ema_short;
        self.prev_ema_long = self.ema_long;

        self.ema_short = Self::advance_ema(self.prev_ema_short, &self.prices, self.short_period, close);
        self.ema_long = Self::advance_ema(self.prev_ema_long, &self.prices, self.long_period, close);

        let last_close = self.last_close.unwrap_or(close);
        let tr = (high - low).max((high - last_close).abs()).max((low - last_close).abs());
        Self::push_bounded(&mut self.trs, tr, self.atr_period);
        self.atr = match self.atr {
            None if self.trs.len() >= self.atr_period => {
                Some(self.trs.iter().sum::<f64>() / self.trs.len() as f64)
            }
            None => None,
            Some(prev_atr) => {
                let p = self.atr_period as f64;
                Some((prev_atr * (p - 1.0) + tr) / p)
            }
        };

        self.last_close = Some(close);

        IndicatorValues { ema_short: self.ema_short, ema_long: self.ema_long, atr: self.atr }
    }

    /// Seeds with the SMA of the last `period` prices once warm, otherwise
    /// applies the standard EMA recurrence against `prev`.
    fn advance_ema(prev: Option<f64>, prices: &VecDeque<f64>, period: usize, close: f64) -> Option<f64> {
        match prev {
            None if prices.len() >= period => {
                let window_sum: f64 = prices.iter().rev().take(period).sum();
                Some(window_sum / period as f64)
            }
            None => None,
            Some(prev_ema) => {
                let alpha = 2.0 / (period as f64 + 1.0);
                Some(alpha * close + (1.0 - alpha) * prev_ema)
            }
        }
    }
}

/// Drives `IndicatorState` per symbol, publishing `indicators.bar.v1`
/// unconditionally and a crossover-triggered signal on `signal.display.v1`.
pub struct IndicatorEngine {
    config: IndicatorConfig,
    states: HashMap<String, IndicatorState>,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config, states: HashMap::new() }
    }

    /// Processes one input bar for its symbol. Always publishes
    /// `indicators.bar.v1`; emits a `SCALP` LONG signal on a strict upward
    /// EMA-short/EMA-long crossover with a positive ATR.
    pub fn handle_bar<B: EventBus + ?Sized>(&mut self, bus: &B, bar: &Bar, emitted_ts_ms: i64) -> Result<()> {
        let cfg = self.config.clone();
        let state = self.states.entry(bar.symbol.clone()).or_insert_with(|| IndicatorState::new(&cfg));
        let indicators = state.update_from_bar(bar);

        let record = IndicatorBar {
            symbol: bar.symbol.clone(),
            timeframe_start_ms: bar.timeframe_start_ms,
            indicators: indicators.clone(),
            bar: bar.clone(),
            emitted_ts_ms,
        };
        publish(bus, topics::INDICATORS_BAR, &record)?;

        let (Some(short), Some(long), Some(atr)) = (indicators.ema_short, indicators.ema_long, indicators.atr) else {
            return Ok(());
        };
        let (Some(prev_short), Some(prev_long)) = (state.prev_ema_short, state.prev_ema_long) else {
            return Ok(());
        };

        let crossed_up = (prev_short - prev_long) <= CROSSOVER_EPSILON && (short - long) > CROSSOVER_EPSILON;
        if !crossed_up || atr <= 0.0 {
            return Ok(());
        }

        let entry = bar.close;
        let stop_offset = (self.config.stop_atr_multiplier * atr).round() as i64;
        let stop = (entry - stop_offset).max(1);
        let target = entry + ((1.5 * (entry - stop) as f64).round() as i64);

        let magnitude = (short - long) / atr.max(1e-6);
        let confidence_pct = (50.0 + magnitude * 10.0).round().clamp(30.0, 95.0) as i64;

        let mut debug = std::collections::HashMap::new();
        debug.insert("ema_short".to_string(), serde_json::json!(round6(short)));
        debug.insert("ema_long".to_string(), serde_json::json!(round6(long)));
        debug.insert("atr".to_string(), serde_json::json!(round6(atr)));
        debug.insert("magnitude_atr".to_string(), serde_json::json!(round6(magnitude)));

        let signal = Signal {
            id: format!("signal-{}-{}", bar.symbol, bar.timeframe_start_ms),
            symbol: bar.symbol.clone(),
            side: Side::Long,
            signal_type: "SCALP".to_string(),
            generated_ts_ms: emitted_ts_ms,
            entry_price_ticks: entry,
            stop_price_ticks: stop,
            target_price_ticks: vec![target],
            confidence_pct,
            rr: None,
            ttl_ms: Some(300_000),
            model_version: Some("ind_engine_v1".to_string()),
            source: Some("indicators_engine".to_string()),
            explanation_short: Some("ema_short crossover above ema_long with ATR stop".to_string()),
            explanation_long: None,
            debug,
        };

        let outcome = publish_validated_signal(bus, &signal, emitted_ts_ms)?;
        // Open Question #1 (DESIGN.md): preserved permissive fallback — when
        // the validator rejects, the raw signal is published anyway.
        if !outcome.is_ok() {
            debug!(id = %signal.id, "validator rejected crossover signal; publishing raw fallback");
            publish(bus, topics::SIGNAL_DISPLAY, &signal)?;
        }
        Ok(())
    }
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{read_topic, MemoryBus};
    use crate::model::IndicatorBar;

    fn bar(symbol: &str, start: i64, o: i64, h: i64, l: i64, c: i64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timeframe_ms: 1000,
            timeframe_start_ms: start,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 1,
            trade_count: 1,
            version: 1,
        }
    }

    #[test]
    fn crossover_signal_after_warmup_on_rising_series() {
        let bus = MemoryBus::new();
        let mut engine = IndicatorEngine::new(IndicatorConfig::default());

        for i in 0..40i64 {
            let close = 1000 + i * 2;
            let b = bar("AAA", i * 1000, close, close + 2, close - 2, close);
            engine.handle_bar(&bus, &b, i * 1000).unwrap();
        }

        let signals: Vec<Signal> = read_topic(&bus, topics::SIGNAL_DISPLAY).unwrap();
        assert!(!signals.is_empty());
        let s = &signals[0];
        assert_eq!(s.symbol, "AAA");
        assert!(matches!(s.side, Side::Long));
        assert!((30..=95).contains(&s.confidence_pct));
        assert!(s.stop_price_ticks >= 1);
    }

    #[test]
    fn flat_series_emits_no_signals() {
        let bus = MemoryBus::new();
        let mut engine = IndicatorEngine::new(IndicatorConfig::default());

        for i in 0..45i64 {
            let b = bar("AAA", i * 1000, 1000, 1000, 1000, 1000);
            engine.handle_bar(&bus, &b, i * 1000).unwrap();
        }

        let signals: Vec<Signal> = read_topic(&bus, topics::SIGNAL_DISPLAY).unwrap();
        assert!(signals.is_empty());
    }

    #[test]
    fn indicators_bar_published_unconditionally_with_nulls_before_warmup() {
        let bus = MemoryBus::new();
        let mut engine = IndicatorEngine::new(IndicatorConfig::default());
        let b = bar("AAA", 0, 1000, 1002, 998, 1000);
        engine.handle_bar(&bus, &b, 0).unwrap();
        let recs: Vec<IndicatorBar> = read_topic(&bus, topics::INDICATORS_BAR).unwrap();
        assert_eq!(recs.len(), 1);
        assert!(recs[0].indicators.ema_short.is_none());
        assert!(recs[0].indicators.atr.is_none());
    }

    #[test]
    fn monotonic_per_symbol_timeframe_start() {
        let bus = MemoryBus::new();
        let mut engine = IndicatorEngine::new(IndicatorConfig::default());
        for i in 0..5i64 {
            let b = bar("AAA", i * 1000, 1000, 1002, 998, 1000 + i);
            engine.handle_bar(&bus, &b, i * 1000).unwrap();
        }
        let recs: Vec<IndicatorBar> = read_topic(&bus, topics::INDICATORS_BAR).unwrap();
        let starts: Vec<i64> = recs.iter().map(|r| r.timeframe_start_ms).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }
}
