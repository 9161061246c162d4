use crate::model::{Bar, Side, Signal};

use super::stable_signal_id;

/// Breakout above the previous bar's high with volume expansion
/// (`volume > 1.2 * previous.volume`). Operates on the caller's already
/// bus-filtered, ascending-by-`timeframe_start_ms` bar history for one
/// symbol — this crate hands components their inputs rather than letting
/// them reach into global state.
pub fn day_rule_minimal(symbol: &str, bars: &[Bar]) -> Option<Signal> {
    if bars.len() < 2 {
        return None;
    }
    let prev = &bars[bars.len() - 2];
    let cur = &bars[bars.len() - 1];

    if cur.close <= prev.high || (cur.volume as f64) <= (prev.volume as f64) * 1.2 {
        return None;
    }

    let entry = cur.close;
    let stop = prev.low;
    let target = entry + (entry - stop) * 2;
    let anchor_ts = cur.end_ms();

    Some(Signal {
        id: stable_signal_id(symbol, "DAY", anchor_ts, entry, stop),
        symbol: symbol.to_string(),
        side: Side::Long,
        signal_type: "DAY".to_string(),
        generated_ts_ms: anchor_ts,
        entry_price_ticks: entry,
        stop_price_ticks: stop,
        target_price_ticks: vec![target],
        confidence_pct: 62,
        rr: Some(2.0),
        ttl_ms: Some(3_600_000),
        model_version: Some("day_v1".to_string()),
        source: Some("day_engine".to_string()),
        explanation_short: Some("day breakout with volume expansion".to_string()),
        explanation_long: Some("day_engine minimal breakout rule fired".to_string()),
        debug: [("prev_high".to_string(), serde_json::json!(prev.high))].into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(start: i64, high: i64, low: i64, close: i64, volume: i64) -> Bar {
        Bar {
            symbol: "AAA".to_string(),
            timeframe_ms: 1000,
            timeframe_start_ms: start,
            open: close,
            high,
            low,
            close,
            volume,
            trade_count: 1,
            version: 1,
        }
    }

    #[test]
    fn fires_on_breakout_with_volume_expansion() {
        let bars = vec![bar(0, 110, 90, 100, 100), bar(1000, 130, 105, 120, 130)];
        let signal = day_rule_minimal("AAA", &bars).unwrap();
        assert_eq!(signal.entry_price_ticks, 120);
        assert_eq!(signal.stop_price_ticks, 90);
        assert_eq!(signal.target_price_ticks, vec![120 + (120 - 90) * 2]);
        assert_eq!(signal.rr, Some(2.0));
    }

    #[test]
    fn does_not_fire_without_volume_expansion() {
        let bars = vec![bar(0, 110, 90, 100, 100), bar(1000, 130, 105, 120, 110)];
        assert!(day_rule_minimal("AAA", &bars).is_none());
    }

    #[test]
    fn does_not_fire_without_breakout() {
        let bars = vec![bar(0, 110, 90, 100, 100), bar(1000, 110, 95, 105, 200)];
        assert!(day_rule_minimal("AAA", &bars).is_none());
    }

    #[test]
    fn insufficient_history_returns_none() {
        let bars = vec![bar(0, 110, 90, 100, 100)];
        assert!(day_rule_minimal("AAA", &bars).is_none());
    }
}
