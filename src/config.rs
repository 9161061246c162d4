// =============================================================================
// Pipeline Configuration — env-driven knobs with atomic JSON persistence
// =============================================================================
//
// Every tunable lives here so a pipeline run can be reconfigured without
// touching code. Fields carry `#[serde(default = "...")]` so that adding a
// field never breaks loading an older config file, and `load`/`save` use the
// same atomic tmp+rename pattern as the rest of this corpus.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::FusionPlan;

fn default_timeframe_ms() -> i64 {
    60_000
}

fn default_allowed_lateness_ms() -> i64 {
    1_000
}

fn default_dedupe_limit() -> usize {
    10_000
}

fn default_prune_batch() -> usize {
    1_000
}

fn default_ema_short() -> usize {
    9
}

fn default_ema_long() -> usize {
    21
}

fn default_atr_period() -> usize {
    14
}

fn default_stop_atr_multiplier() -> f64 {
    1.5
}

/// Runtime knobs for [`crate::aggregator::DeterministicAggregator`].
///
/// `timeframe_ms`/`allowed_lateness_ms`/`dedupe_limit`/`prune_batch` can each
/// be overridden by an environment variable of the same name in
/// `SCREAMING_SNAKE_CASE` prefixed `OHLC_` (e.g. `OHLC_TIMEFRAME_MS`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_timeframe_ms")]
    pub timeframe_ms: i64,
    #[serde(default = "default_allowed_lateness_ms")]
    pub allowed_lateness_ms: i64,
    #[serde(default = "default_dedupe_limit")]
    pub dedupe_limit: usize,
    #[serde(default = "default_prune_batch")]
    pub prune_batch: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timeframe_ms: default_timeframe_ms(),
            allowed_lateness_ms: default_allowed_lateness_ms(),
            dedupe_limit: default_dedupe_limit(),
            prune_batch: default_prune_batch(),
        }
    }
}

impl AggregatorConfig {
    /// Builds a config from defaults, then overlays any of the four
    /// `OHLC_*` environment variables that are present and parse as the
    /// expected type. A present-but-unparseable value falls back to the
    /// existing value rather than erroring.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parse_env_i64("OHLC_TIMEFRAME_MS") {
            cfg.timeframe_ms = v;
        }
        if let Some(v) = parse_env_i64("OHLC_ALLOWED_LATENESS_MS") {
            cfg.allowed_lateness_ms = v;
        }
        if let Some(v) = parse_env_usize("OHLC_DEDUPE_LIMIT") {
            cfg.dedupe_limit = v;
        }
        if let Some(v) = parse_env_usize("OHLC_PRUNE_BATCH") {
            cfg.prune_batch = v;
        }
        cfg
    }
}

fn parse_env_i64(name: &str) -> Option<i64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Runtime knobs for [`crate::indicators::IndicatorEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_ema_short")]
    pub ema_short: usize,
    #[serde(default = "default_ema_long")]
    pub ema_long: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default = "default_stop_atr_multiplier")]
    pub stop_atr_multiplier: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_short: default_ema_short(),
            ema_long: default_ema_long(),
            atr_period: default_atr_period(),
            stop_atr_multiplier: default_stop_atr_multiplier(),
        }
    }
}

/// Bundles every per-component config the way `RuntimeConfig` bundles
/// strategy params. Loadable from a JSON file with the rest of the config
/// defaulted when absent (every field carries `#[serde(default)]`), and
/// persisted with the same atomic tmp+rename write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub fusion_plan: FusionPlan,
}

impl PipelineConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline config from {}", path.display()))?;
        info!(path = %path.display(), "pipeline config loaded");
        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename) to avoid corruption on crash.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("failed to serialize pipeline config")?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;
        info!(path = %path.display(), "pipeline config saved (atomic)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aggregator_config_uses_documented_defaults() {
        let cfg = AggregatorConfig::default();
        assert_eq!(cfg.timeframe_ms, 60_000);
        assert_eq!(cfg.allowed_lateness_ms, 1_000);
        assert_eq!(cfg.dedupe_limit, 10_000);
        assert_eq!(cfg.prune_batch, 1_000);
    }

    #[test]
    fn deserialize_empty_json_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.aggregator.timeframe_ms, 60_000);
        assert_eq!(cfg.indicators.ema_short, 9);
        assert_eq!(cfg.fusion_plan.accept_threshold, 55.0);
    }

    #[test]
    fn roundtrip_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let cfg = PipelineConfig::default();
        cfg.save(&path).unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.aggregator.timeframe_ms, cfg.aggregator.timeframe_ms);
    }
}
