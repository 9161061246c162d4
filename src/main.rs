// =============================================================================
// tickfabric — CLI entry point
// =============================================================================
//
// Drives one synchronous pass of the pipeline over an input tick file: CSV
// ingest, dedupe + windowing through the aggregator, incremental indicators
// and EMA20/ATR14/VWAP feature snapshots and rule-engine signals per
// published bar, a final fusion pass per symbol, then a flush and a report
// of the run's counters.
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tickfabric::aggregator::DeterministicAggregator;
use tickfabric::bus::{read_topic, topics, FileBus};
use tickfabric::config::PipelineConfig;
use tickfabric::feature_worker::FeatureWorker;
use tickfabric::fusion::FusionEngine;
use tickfabric::indicators::IndicatorEngine;
use tickfabric::ingest::ingest_csv_ticks;
use tickfabric::model::{Bar, BarRecord, Tick};
use tickfabric::rule_engines::{day::day_rule_minimal, swing::swing_rule_minimal};
use tickfabric::validator::publish_validated_signal;

#[derive(Parser)]
#[command(name = "tickfabric", about = "Deterministic market-data streaming fabric")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a tick file and drive the pipeline to completion.
    Run {
        /// Path to a `ts_ms,symbol,price_ticks,size,venue` CSV file.
        #[arg(long)]
        ticks: PathBuf,

        /// Directory the file-backed bus writes its per-topic ndjson logs to.
        #[arg(long, default_value = "bus_data")]
        bus_dir: PathBuf,

        /// Optional pipeline config JSON; defaults are used when absent.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("tickfabric starting up");

    let cli = Cli::parse();
    match cli.command {
        Command::Run { ticks, bus_dir, config } => run(ticks, bus_dir, config),
    }
}

fn run(ticks_path: PathBuf, bus_dir: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match &config_path {
        Some(path) => PipelineConfig::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load pipeline config, using defaults");
            PipelineConfig::default()
        }),
        None => PipelineConfig::default(),
    };

    let bus = FileBus::new(&bus_dir)?;

    let ingested = ingest_csv_ticks(&bus, &ticks_path).with_context(|| format!("ingesting ticks from {}", ticks_path.display()))?;
    info!(count = ingested, path = %ticks_path.display(), "ticks ingested");

    let mut aggregator = DeterministicAggregator::new(config.aggregator.clone());
    let all_ticks: Vec<Tick> = read_topic(&bus, topics::MARKET_TICK)?;
    for tick in &all_ticks {
        if let Err(e) = aggregator.handle_tick(&bus, &tick.symbol, tick, Some(tick.ts_ms)) {
            warn!(symbol = %tick.symbol, error = %e, "tick rejected");
        }
    }
    aggregator.flush(&bus)?;

    let counters = aggregator.counters();
    info!(
        bars_published = counters.bars_published,
        corrections = counters.corrections,
        duplicates = counters.duplicates,
        "aggregation complete"
    );

    let mut indicator_engine = IndicatorEngine::new(config.indicators.clone());
    let mut feature_worker = FeatureWorker::default();
    let mut bars_by_symbol: HashMap<String, Vec<Bar>> = HashMap::new();

    let bar_records: Vec<BarRecord> = read_topic(&bus, topics::OHLCV_BAR)?;
    for record in &bar_records {
        let bar = &record.bar;
        indicator_engine.handle_bar(&bus, bar, record.emitted_ts_ms)?;
        feature_worker.handle_bar(&bus, bar)?;

        let history = bars_by_symbol.entry(bar.symbol.clone()).or_default();
        history.push(bar.clone());

        if let Some(signal) = day_rule_minimal(&bar.symbol, history) {
            publish_validated_signal(&bus, &signal, record.emitted_ts_ms)?;
        }
        if let Some(signal) = swing_rule_minimal(&bar.symbol, history, &[]) {
            publish_validated_signal(&bus, &signal, record.emitted_ts_ms)?;
        }
    }

    let fusion_engine = FusionEngine::new(config.fusion_plan.clone());
    for symbol in bars_by_symbol.keys() {
        if let Some(candidate) = fusion_engine.fuse(&bus, symbol)? {
            info!(
                symbol = %candidate.symbol,
                composite_score = candidate.composite_score,
                resolution = ?candidate.resolution,
                "fusion candidate produced"
            );
        }
    }

    info!("pipeline run complete");
    Ok(())
}
