use crate::model::{Side, Signal, Tick};

use super::stable_signal_id;

/// Minimal top-of-book snapshot. This crate's aggregator does not model an
/// order book, so the scalp engine takes one directly from the caller
/// rather than reading a dedicated topic; see DESIGN.md.
#[derive(Debug, Clone, Copy)]
pub struct TopOfBook {
    pub bid_price_ticks: i64,
    pub ask_price_ticks: i64,
}

/// Emits a `SCALP` signal when buy prints dominate sell prints at a tight
/// spread: `spread <= 1` tick and `buys >= max(1, sells * 2)`.
pub fn scalp_rule_minimal(symbol: &str, ticks: &[Tick], book: TopOfBook, ts_ms: i64) -> Option<Signal> {
    let spread_ticks = book.ask_price_ticks - book.bid_price_ticks;
    if spread_ticks > 1 {
        return None;
    }

    let (mut buys, mut sells) = (0i64, 0i64);
    for t in ticks {
        if t.price_ticks >= book.ask_price_ticks {
            buys += 1;
        } else if t.price_ticks <= book.bid_price_ticks {
            sells += 1;
        }
    }
    if buys < 1.max(sells * 2) {
        return None;
    }

    let entry = book.ask_price_ticks;
    let stop = book.bid_price_ticks;
    let target = entry + spread_ticks * 5;

    Some(Signal {
        id: stable_signal_id(symbol, "SCALP", ts_ms, entry, stop),
        symbol: symbol.to_string(),
        side: Side::Long,
        signal_type: "SCALP".to_string(),
        generated_ts_ms: ts_ms,
        entry_price_ticks: entry,
        stop_price_ticks: stop,
        target_price_ticks: vec![target],
        confidence_pct: 55,
        rr: Some(1.0),
        ttl_ms: Some(300_000),
        model_version: Some("scalp_v1".to_string()),
        source: Some("scalp_engine".to_string()),
        explanation_short: Some("scalp spread compression + buy prints".to_string()),
        explanation_long: Some("scalp_engine minimal rule fired".to_string()),
        debug: [("spread_ticks".to_string(), serde_json::json!(spread_ticks))].into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(price: i64) -> Tick {
        Tick { symbol: "AAA".to_string(), ts_ms: 0, price_ticks: price, size: 1, trade_id: None, seq: None, venue: None }
    }

    #[test]
    fn fires_when_buys_dominate_at_tight_spread() {
        let book = TopOfBook { bid_price_ticks: 100, ask_price_ticks: 101 };
        let ticks = vec![tick(101), tick(101), tick(101), tick(100)];
        let signal = scalp_rule_minimal("AAA", &ticks, book, 5000).unwrap();
        assert_eq!(signal.entry_price_ticks, 101);
        assert_eq!(signal.stop_price_ticks, 100);
    }

    #[test]
    fn does_not_fire_on_wide_spread() {
        let book = TopOfBook { bid_price_ticks: 100, ask_price_ticks: 105 };
        let ticks = vec![tick(105), tick(105), tick(105)];
        assert!(scalp_rule_minimal("AAA", &ticks, book, 5000).is_none());
    }

    #[test]
    fn does_not_fire_without_buy_dominance() {
        let book = TopOfBook { bid_price_ticks: 100, ask_price_ticks: 101 };
        let ticks = vec![tick(100), tick(100), tick(101)];
        assert!(scalp_rule_minimal("AAA", &ticks, book, 5000).is_none());
    }
}
