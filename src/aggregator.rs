// =============================================================================
// Deterministic OHLCV Aggregator
// =============================================================================
//
// Windowing, dedupe, watermark finalization, and bounded-retroactive
// correction over a tick stream. Designed for a single-threaded worker: one
// instance owns its `open_bars`/`published_bars`/`dedupe` state exclusively.
//
// Windowing uses only `tick.ts_ms`, never wall clock — only `emitted_ts_ms`
// fields carry wall clock, via the injectable `time_source`.
// =============================================================================

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{publish, topics, EventBus};
use crate::config::AggregatorConfig;
use crate::error::{PipelineError, Result};
use crate::model::{AggregatorCounters, AuditRecord, Bar, BarRecord, MetricsRecord, Tick};

/// A FIFO-ordered set bounded at `limit + prune_batch - 1` entries: inserts
/// append to the tail, overflow evicts from the head. Do NOT swap this for a
/// hash-map's native iteration order — that order is unspecified and would
/// break the bounded-memory invariant's determinism.
struct DedupeMap {
    order: VecDeque<String>,
    seen: HashSet<String>,
    limit: usize,
    prune_batch: usize,
}

impl DedupeMap {
    fn new(limit: usize, prune_batch: usize) -> Self {
        Self { order: VecDeque::new(), seen: HashSet::new(), limit, prune_batch }
    }

    /// Returns `true` if `key` was already present (a duplicate). Otherwise
    /// records it and prunes from the head if over `limit`.
    fn check_and_insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return true;
        }
        self.seen.insert(key.to_string());
        self.order.push_back(key.to_string());
        if self.order.len() > self.limit {
            let to_prune = self.prune_batch.min(self.order.len());
            for _ in 0..to_prune {
                if let Some(old) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }
        false
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Deterministic OHLCV aggregator: tick -> bar windowing, dedupe,
/// watermarking, and bounded-retroactive correction.
///
/// `time_source` is injected so tests get deterministic `emitted_ts_ms`
/// values; it is never consulted for windowing decisions.
pub struct DeterministicAggregator<'a> {
    config: AggregatorConfig,
    open_bars: HashMap<(String, i64), Bar>,
    published_bars: HashMap<(String, i64), Bar>,
    dedupe: HashMap<String, DedupeMap>,
    counters: AggregatorCounters,
    time_source: Box<dyn Fn() -> i64 + 'a>,
}

impl<'a> DeterministicAggregator<'a> {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_time_source(config, || chrono::Utc::now().timestamp_millis())
    }

    pub fn with_time_source(config: AggregatorConfig, time_source: impl Fn() -> i64 + 'a) -> Self {
        Self {
            config,
            open_bars: HashMap::new(),
            published_bars: HashMap::new(),
            dedupe: HashMap::new(),
            counters: AggregatorCounters::default(),
            time_source: Box::new(time_source),
        }
    }

    pub fn counters(&self) -> AggregatorCounters {
        self.counters
    }

    fn now_ms(&self) -> i64 {
        (self.time_source)()
    }

    fn floor_start(&self, ts_ms: i64) -> i64 {
        (ts_ms / self.config.timeframe_ms) * self.config.timeframe_ms
    }

    fn audit<B: EventBus + ?Sized>(&self, bus: &B, event_type: &str, payload: &impl serde::Serialize) -> Result<()> {
        let now_ms = self.now_ms();
        let record = AuditRecord::new(Uuid::new_v4().to_string(), event_type, now_ms, payload);
        publish(bus, topics::AUDIT_RECORDS, &record)
    }

    fn is_duplicate<B: EventBus + ?Sized>(&mut self, bus: &B, symbol: &str, tick: &Tick) -> Result<bool> {
        let Some(key) = tick.dedupe_key() else {
            return Ok(false);
        };
        let map = self.dedupe.entry(symbol.to_string()).or_insert_with(|| {
            DedupeMap::new(self.config.dedupe_limit, self.config.prune_batch)
        });
        if map.check_and_insert(&key) {
            self.counters.duplicates += 1;
            self.audit(bus, "tick_duplicate", tick)?;
            debug!(symbol, key = %key, "duplicate tick dropped");
            return Ok(true);
        }
        Ok(false)
    }

    fn publish_bar<B: EventBus + ?Sized>(&mut self, bus: &B, bar: &Bar, replaced: bool) -> Result<()> {
        let record = BarRecord { bar: bar.clone(), replaced, emitted_ts_ms: self.now_ms() };
        let topic = if replaced { topics::OHLCV_CORRECTION } else { topics::OHLCV_BAR };
        publish(bus, topic, &record)?;
        let event_type = if replaced { "ohlcv_bar_corrected" } else { "ohlcv_bar_published" };
        self.audit(bus, event_type, &record)?;
        if replaced {
            self.counters.corrections += 1;
            info!(symbol = %bar.symbol, start = bar.timeframe_start_ms, version = bar.version, "bar corrected");
        } else {
            self.counters.bars_published += 1;
            info!(symbol = %bar.symbol, start = bar.timeframe_start_ms, "bar published");
        }
        Ok(())
    }

    /// Per DESIGN.md's Open Question resolution #2: the correction path
    /// does NOT call this — metrics follow first-publish only.
    fn emit_metrics<B: EventBus + ?Sized>(&self, bus: &B, bar: &Bar) -> Result<()> {
        let record = MetricsRecord {
            symbol: bar.symbol.clone(),
            timeframe_start_ms: bar.timeframe_start_ms,
            timeframe_ms: bar.timeframe_ms,
            trade_count: bar.trade_count,
            volume: bar.volume,
            emitted_ts_ms: self.now_ms(),
            counters: self.counters,
        };
        publish(bus, topics::METRICS_OHLCV, &record)?;
        self.audit(bus, "ohlcv_metrics", &record)
    }

    /// Rebuilds a candidate bar from a late tick against an already-published
    /// bar. `open`/`close` are frozen; only high/low/volume/trade_count may
    /// change. Returns `None` (no-op, no empty correction) if nothing changed.
    fn recompute_from_late_tick(published: &Bar, tick: &Tick) -> Option<Bar> {
        let mut candidate = published.clone();
        let mut changed = false;
        if tick.price_ticks > candidate.high {
            candidate.high = tick.price_ticks;
            changed = true;
        }
        if tick.price_ticks < candidate.low {
            candidate.low = tick.price_ticks;
            changed = true;
        }
        candidate.volume += tick.size;
        candidate.trade_count += 1;
        if candidate.volume != published.volume || candidate.trade_count != published.trade_count {
            changed = true;
        }
        if !changed {
            return None;
        }
        candidate.version = published.version + 1;
        Some(candidate)
    }

    fn finalize_expired<B: EventBus + ?Sized>(&mut self, bus: &B, now_ms: i64) -> Result<()> {
        let mut expired: Vec<(String, i64)> = self
            .open_bars
            .iter()
            .filter(|(_, bar)| now_ms >= bar.end_ms() + self.config.allowed_lateness_ms)
            .map(|(key, _)| key.clone())
            .collect();
        // Ascending `start_ms` order, independent of HashMap iteration order.
        expired.sort_by_key(|(_, start)| *start);

        for key in expired {
            let bar = self.open_bars.remove(&key).expect("key came from open_bars");
            self.publish_bar(bus, &bar, false)?;
            self.emit_metrics(bus, &bar)?;
            self.published_bars.insert(key, bar);
        }
        Ok(())
    }

    /// Processes one tick for `symbol`. `now_ms` overrides the injected time
    /// source for watermark evaluation only (used by tests and replay).
    pub fn handle_tick<B: EventBus + ?Sized>(&mut self, bus: &B, symbol: &str, tick: &Tick, now_ms: Option<i64>) -> Result<()> {
        if tick.price_ticks < 1 || tick.size < 1 {
            return Err(PipelineError::InvalidInput(format!(
                "tick for {symbol} has non-positive price_ticks or size"
            )));
        }

        if self.is_duplicate(bus, symbol, tick)? {
            return Ok(());
        }

        let start = self.floor_start(tick.ts_ms);
        let key = (symbol.to_string(), start);

        if let Some(published) = self.published_bars.get(&key) {
            if let Some(replacement) = Self::recompute_from_late_tick(published, tick) {
                self.published_bars.insert(key, replacement.clone());
                self.publish_bar(bus, &replacement, true)?;
            }
            return Ok(());
        }

        match self.open_bars.get_mut(&key) {
            Some(bar) => bar.apply_open_tick(tick.price_ticks, tick.size),
            None => {
                let bar = Bar::new_open(symbol, self.config.timeframe_ms, start, tick.price_ticks, tick.size);
                self.open_bars.insert(key, bar);
            }
        }

        let now = now_ms.unwrap_or_else(|| self.now_ms());
        self.finalize_expired(bus, now)
    }

    /// Unconditionally finalizes every open bar in ascending `start` order.
    /// Used at shutdown and at end-of-input replays.
    pub fn flush<B: EventBus + ?Sized>(&mut self, bus: &B) -> Result<()> {
        let mut keys: Vec<(String, i64)> = self.open_bars.keys().cloned().collect();
        keys.sort_by_key(|(_, start)| *start);
        for key in keys {
            let bar = self.open_bars.remove(&key).expect("key came from open_bars");
            self.publish_bar(bus, &bar, false)?;
            self.emit_metrics(bus, &bar)?;
            self.published_bars.insert(key, bar);
        }
        if !self.open_bars.is_empty() {
            warn!("open_bars not empty after flush, this should never happen");
        }
        Ok(())
    }

    #[cfg(test)]
    fn dedupe_len(&self, symbol: &str) -> usize {
        self.dedupe.get(symbol).map(DedupeMap::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{read_topic, MemoryBus};

    fn tick(ts_ms: i64, price: i64, size: i64, trade_id: Option<&str>) -> Tick {
        Tick {
            symbol: "AAA".to_string(),
            ts_ms,
            price_ticks: price,
            size,
            trade_id: trade_id.map(|s| s.to_string()),
            seq: None,
            venue: None,
        }
    }

    fn cfg(timeframe_ms: i64, allowed_lateness_ms: i64) -> AggregatorConfig {
        AggregatorConfig { timeframe_ms, allowed_lateness_ms, dedupe_limit: 10_000, prune_batch: 1_000 }
    }

    #[test]
    fn basic_bar_scenario() {
        let bus = MemoryBus::new();
        let base = 1_000_000i64;
        let mut agg = DeterministicAggregator::with_time_source(cfg(1000, 10), || 0);

        agg.handle_tick(&bus, "AAA", &tick(base + 10, 1000, 1, None), Some(base + 10)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(base + 200, 1010, 1, None), Some(base + 200)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(base + 800, 1005, 1, None), Some(base + 800)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(base + 2000, 1100, 1, None), Some(base + 3100)).unwrap();

        let bars: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR).unwrap();
        assert_eq!(bars.len(), 1);
        let b = &bars[0].bar;
        assert_eq!(b.open, 1000);
        assert_eq!(b.high, 1010);
        assert_eq!(b.low, 1000);
        assert_eq!(b.close, 1005);
        assert_eq!(b.volume, 3);
        assert_eq!(b.trade_count, 3);
        assert_eq!(b.version, 1);
        assert_eq!(b.timeframe_start_ms, base);
    }

    #[test]
    fn correction_scenario() {
        let bus = MemoryBus::new();
        let base = 2_000_000i64;
        let mut agg = DeterministicAggregator::with_time_source(cfg(1000, 0), || 0);

        agg.handle_tick(&bus, "AAA", &tick(base + 10, 500, 1, None), Some(base + 10)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(base + 2000, 700, 1, None), Some(base + 1000)).unwrap();

        let first_bars: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR).unwrap();
        assert_eq!(first_bars.len(), 1);
        let first_high = first_bars[0].bar.high;

        agg.handle_tick(&bus, "AAA", &tick(base + 50, 520, 1, Some("late1")), Some(base + 1001)).unwrap();

        let corrections: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_CORRECTION).unwrap();
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].bar.version, 2);
        assert_eq!(corrections[0].bar.high, first_high.max(520));
        assert_eq!(corrections[0].bar.open, first_bars[0].bar.open);
        assert_eq!(corrections[0].bar.close, first_bars[0].bar.close);
    }

    #[test]
    fn duplicate_drop_scenario() {
        let bus = MemoryBus::new();
        let mut agg = DeterministicAggregator::with_time_source(cfg(1000, 10), || 0);

        agg.handle_tick(&bus, "AAA", &tick(100, 500, 1, Some("dup")), Some(100)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(150, 510, 1, Some("dup")), Some(150)).unwrap();

        assert_eq!(agg.counters().duplicates, 1);
        let audits: Vec<AuditRecord> = read_topic(&bus, topics::AUDIT_RECORDS).unwrap();
        assert!(audits.iter().any(|a| a.event_type == "tick_duplicate"));

        agg.flush(&bus).unwrap();
        let bars: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].bar.trade_count, 1);
        assert_eq!(bars[0].bar.volume, 1);
    }

    #[test]
    fn dedupe_map_bounded_after_every_tick() {
        let bus = MemoryBus::new();
        let mut agg = DeterministicAggregator::with_time_source(
            AggregatorConfig { timeframe_ms: 1000, allowed_lateness_ms: 1_000_000, dedupe_limit: 5, prune_batch: 2 },
            || 0,
        );
        for i in 0..50 {
            let t = tick(i * 10, 100 + i, 1, Some(&format!("id-{i}")));
            agg.handle_tick(&bus, "AAA", &t, Some(0)).unwrap();
            assert!(agg.dedupe_len("AAA") <= 5 + 2 - 1);
        }
    }

    #[test]
    fn malformed_tick_rejected_with_no_state_change() {
        let bus = MemoryBus::new();
        let mut agg = DeterministicAggregator::with_time_source(cfg(1000, 10), || 0);
        let bad = tick(100, 0, 1, None);
        let err = agg.handle_tick(&bus, "AAA", &bad, Some(100)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        agg.flush(&bus).unwrap();
        let bars: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn flush_finalizes_in_ascending_start_order() {
        let bus = MemoryBus::new();
        let mut agg = DeterministicAggregator::with_time_source(cfg(1000, 1_000_000_000), || 0);
        agg.handle_tick(&bus, "AAA", &tick(5000, 100, 1, None), Some(0)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(1000, 200, 1, None), Some(0)).unwrap();
        agg.handle_tick(&bus, "AAA", &tick(3000, 300, 1, None), Some(0)).unwrap();
        agg.flush(&bus).unwrap();
        let bars: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR).unwrap();
        let starts: Vec<i64> = bars.iter().map(|b| b.bar.timeframe_start_ms).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }
}
