// =============================================================================
// CSV Tick Ingest — out of scope, specified only at its interface boundary
// =============================================================================
//
// Reads `ts_ms,symbol,price_ticks,size,venue` rows and publishes one
// `market.tick.v1` record per row. Format-specific glue; the hard part this
// crate carries is everything downstream of the tick topic.
// =============================================================================

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::bus::{publish, topics, EventBus};
use crate::model::Tick;

/// Ingests ticks from a CSV file at `csv_path`, publishing each row to
/// `market.tick.v1`. Returns the number of ticks published.
pub fn ingest_csv_ticks<B: EventBus + ?Sized>(bus: &B, csv_path: impl AsRef<Path>) -> Result<usize> {
    let csv_path = csv_path.as_ref();
    let content = std::fs::read_to_string(csv_path)
        .with_context(|| format!("failed to read tick csv from {}", csv_path.display()))?;

    let mut lines = content.lines();
    let header = lines.next().ok_or_else(|| anyhow!("empty tick csv: {}", csv_path.display()))?;
    let columns: Vec<&str> = header.split(',').collect();

    let mut count = 0;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let row: std::collections::HashMap<&str, &str> = columns.iter().copied().zip(fields).collect();

        let tick = Tick {
            symbol: row.get("symbol").context("missing symbol column")?.to_string(),
            ts_ms: row.get("ts_ms").context("missing ts_ms column")?.parse().context("invalid ts_ms")?,
            price_ticks: row.get("price_ticks").context("missing price_ticks column")?.parse().context("invalid price_ticks")?,
            size: row.get("size").map(|v| v.parse().unwrap_or(1)).unwrap_or(1),
            trade_id: None,
            seq: row.get("seq_no").and_then(|v| v.parse().ok()),
            venue: row.get("venue").map(|v| v.to_string()).or_else(|| Some("CSV".to_string())),
        };

        publish(bus, topics::MARKET_TICK, &tick).map_err(|e| anyhow!("{e}"))?;
        count += 1;
    }

    Ok(count)
}
