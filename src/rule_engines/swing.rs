use crate::model::{Bar, NewsAnalysis, Side, Signal};

use super::stable_signal_id;

const SWING_WINDOW: usize = 20;
const NEWS_VETO_WINDOW_MS: i64 = 3_600_000;
const NEWS_VETO_SENTIMENT: f64 = -0.5;

/// Breakout above a 20-bar swing high, vetoed by bearish recent news
/// sentiment (`sentiment_score < -0.5` within the last hour).
pub fn swing_rule_minimal(symbol: &str, bars: &[Bar], news: &[NewsAnalysis]) -> Option<Signal> {
    if bars.is_empty() {
        return None;
    }
    let start = bars.len().saturating_sub(SWING_WINDOW);
    let window = &bars[start..];

    let swing_high = if window.len() > 1 {
        window[..window.len() - 1].iter().map(|b| b.high).max().unwrap()
    } else {
        window[window.len() - 1].high
    };
    let swing_low = window.iter().map(|b| b.low).min().unwrap();

    let last = &window[window.len() - 1];
    if last.close <= swing_high {
        return None;
    }

    let now_ms = last.end_ms();
    let vetoed = news.iter().any(|a| {
        now_ms - a.analysis_ts_ms < NEWS_VETO_WINDOW_MS && a.sentiment_score < NEWS_VETO_SENTIMENT
    });
    if vetoed {
        return None;
    }

    let entry = last.close;
    let stop = swing_low;
    let target = entry + (entry - stop) * 2;

    let mut debug = std::collections::HashMap::new();
    debug.insert("swing_high".to_string(), serde_json::json!(swing_high));
    debug.insert("swing_low".to_string(), serde_json::json!(swing_low));

    Some(Signal {
        id: stable_signal_id(symbol, "SWING", now_ms, entry, stop),
        symbol: symbol.to_string(),
        side: Side::Long,
        signal_type: "SWING".to_string(),
        generated_ts_ms: now_ms,
        entry_price_ticks: entry,
        stop_price_ticks: stop,
        target_price_ticks: vec![target],
        confidence_pct: 66,
        rr: Some(2.0),
        ttl_ms: Some(86_400_000),
        model_version: Some("swing_v1".to_string()),
        source: Some("swing_engine".to_string()),
        explanation_short: Some("swing breakout above structure".to_string()),
        explanation_long: Some("swing_engine minimal structure rule fired".to_string()),
        debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(start: i64, high: i64, low: i64, close: i64) -> Bar {
        Bar {
            symbol: "AAA".to_string(),
            timeframe_ms: 1000,
            timeframe_start_ms: start,
            open: close,
            high,
            low,
            close,
            volume: 1,
            trade_count: 1,
            version: 1,
        }
    }

    fn ascending_bars(n: usize) -> Vec<Bar> {
        (0..n as i64).map(|i| bar(i * 1000, 100 + i, 90 + i, 100 + i)).collect()
    }

    #[test]
    fn fires_on_breakout_without_news_veto() {
        let mut bars = ascending_bars(19);
        bars.push(bar(19_000, 500, 400, 500));
        let signal = swing_rule_minimal("AAA", &bars, &[]).unwrap();
        assert_eq!(signal.entry_price_ticks, 500);
    }

    #[test]
    fn veto_on_recent_bearish_sentiment() {
        let mut bars = ascending_bars(19);
        bars.push(bar(19_000, 500, 400, 500));
        let news = vec![NewsAnalysis {
            article_id: "a1".to_string(),
            analysis_ts_ms: 19_900,
            sentiment_score: -0.9,
            relevance_score: 0.8,
            summary: "bad news".to_string(),
            entities: vec![],
            tags: vec![],
            model_version: None,
            impact_class: "none".to_string(),
        }];
        assert!(swing_rule_minimal("AAA", &bars, &news).is_none());
    }

    #[test]
    fn stale_bearish_sentiment_does_not_veto() {
        let mut bars = ascending_bars(19);
        bars.push(bar(19_000, 500, 400, 500));
        let now_ms = bars.last().unwrap().end_ms();
        let news = vec![NewsAnalysis {
            article_id: "a1".to_string(),
            analysis_ts_ms: now_ms - NEWS_VETO_WINDOW_MS - 1000,
            sentiment_score: -0.9,
            relevance_score: 0.8,
            summary: "old bad news".to_string(),
            entities: vec![],
            tags: vec![],
            model_version: None,
            impact_class: "none".to_string(),
        }];
        assert!(swing_rule_minimal("AAA", &bars, &news).is_some());
    }

    #[test]
    fn no_breakout_no_signal() {
        let bars = vec![bar(0, 110, 90, 100); 25];
        assert!(swing_rule_minimal("AAA", &bars, &[]).is_none());
    }
}
