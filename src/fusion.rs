// =============================================================================
// Fusion Engine — weighted aggregation of per-horizon signals
// =============================================================================
//
// Generalized from a per-contribution weight × value accumulate-and-decide
// scorer, three-way BUY/SELL/HOLD, to a two-way ACCEPTED/CONFLICT
// resolution, reading its inputs from the bus (sorted by ID) instead of an
// in-memory signal list.
// =============================================================================

use sha2::{Digest, Sha256};

use crate::bus::{publish, read_topic, topics, EventBus};
use crate::error::Result;
use crate::model::{Candidate, Contribution, FusionPlan, FusionTrace, Resolution, Signal};

/// First 24 hex chars of SHA-256 over
/// `"{symbol}|{sorted(signal_ids)}|{fusion_plan_version}"`.
pub fn stable_fusion_id(symbol: &str, signal_ids: &[String], plan_version: &str) -> String {
    let mut sorted = signal_ids.to_vec();
    sorted.sort();
    let payload = format!("{symbol}|{}|{plan_version}", sorted.join("|"));
    let digest = Sha256::digest(payload.as_bytes());
    hex::encode(digest)[..24].to_string()
}

pub struct FusionEngine {
    plan: FusionPlan,
}

impl FusionEngine {
    pub fn new(plan: FusionPlan) -> Self {
        Self { plan }
    }

    /// Reads every signal for `symbol` off `signal.display.v1`, fuses them
    /// into a single candidate, and publishes `fusion.trace.v1` +
    /// `candidate.v1`. Emits nothing if no signals are present for the
    /// symbol.
    pub fn fuse<B: EventBus + ?Sized>(&self, bus: &B, symbol: &str) -> Result<Option<Candidate>> {
        let all_signals: Vec<Signal> = read_topic(bus, topics::SIGNAL_DISPLAY)?;
        let mut signals: Vec<Signal> = all_signals.into_iter().filter(|s| s.symbol == symbol).collect();
        if signals.is_empty() {
            return Ok(None);
        }
        // Ascending lexicographic `id` order — the deterministic tie-break.
        signals.sort_by(|a, b| a.id.cmp(&b.id));

        let mut contributions = Vec::with_capacity(signals.len());
        let mut total_weighted = 0.0;
        let mut total_weight = 0.0;
        let mut dominant: Option<(String, f64)> = None;

        for s in &signals {
            let horizon = s.signal_type.clone();
            let conf = s.confidence_pct;
            let weight = self.plan.weights.get(&horizon).copied().unwrap_or(1.0);
            let weighted = conf as f64 * weight;

            contributions.push(Contribution {
                horizon: horizon.clone(),
                signal_id: s.id.clone(),
                confidence_pct: conf,
                weight,
                weighted_score: weighted,
                rationale: vec![s.explanation_short.clone().unwrap_or_default().chars().take(200).collect()],
            });

            total_weighted += weighted;
            total_weight += weight;

            // Ties keep the first encountered, which — due to sorted input —
            // is the lexicographic-least id.
            if dominant.as_ref().map(|(_, w)| weighted > *w).unwrap_or(true) {
                dominant = Some((horizon, weighted));
            }
        }

        let composite = if total_weight > 0.0 { total_weighted / total_weight } else { 0.0 };
        let resolution = if composite >= self.plan.accept_threshold { Resolution::Accepted } else { Resolution::Conflict };
        let signal_ids: Vec<String> = signals.iter().map(|s| s.id.clone()).collect();
        let fusion_id = stable_fusion_id(symbol, &signal_ids, &self.plan.version);
        let created_ts_ms = signals.iter().map(|s| s.generated_ts_ms).max().unwrap_or(0);
        let dominant_horizon = dominant.map(|(h, _)| h);

        let trace = FusionTrace {
            fusion_id: fusion_id.clone(),
            symbol: symbol.to_string(),
            created_ts_ms,
            contributions,
            composite_score: composite,
            resolution,
            dominant_horizon: dominant_horizon.clone(),
            fusion_plan_version: self.plan.version.clone(),
        };
        publish(bus, topics::FUSION_TRACE, &trace)?;

        let mut sorted_ids = signal_ids;
        sorted_ids.sort();
        let candidate = Candidate {
            id: fusion_id,
            symbol: symbol.to_string(),
            composite_score: composite,
            resolution,
            created_ts_ms,
            dominant_horizon,
            signals: sorted_ids,
        };
        publish(bus, topics::CANDIDATE, &candidate)?;

        Ok(Some(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::model::Side;

    fn signal(id: &str, signal_type: &str, confidence_pct: i64) -> Signal {
        Signal {
            id: id.to_string(),
            symbol: "AAA".to_string(),
            side: Side::Long,
            signal_type: signal_type.to_string(),
            generated_ts_ms: 1000,
            entry_price_ticks: 100,
            stop_price_ticks: 90,
            target_price_ticks: vec![120],
            confidence_pct,
            rr: None,
            ttl_ms: None,
            model_version: None,
            source: None,
            explanation_short: None,
            explanation_long: None,
            debug: Default::default(),
        }
    }

    #[test]
    fn fusion_accept_scenario() {
        let bus = MemoryBus::new();
        publish(&bus, topics::SIGNAL_DISPLAY, &signal("s1", "SCALP", 60)).unwrap();
        publish(&bus, topics::SIGNAL_DISPLAY, &signal("s2", "DAY", 70)).unwrap();
        publish(&bus, topics::SIGNAL_DISPLAY, &signal("s3", "SWING", 80)).unwrap();

        let mut plan = FusionPlan::default();
        plan.accept_threshold = 55.0;
        let engine = FusionEngine::new(plan);
        let candidate = engine.fuse(&bus, "AAA").unwrap().unwrap();

        assert!(matches!(candidate.resolution, Resolution::Accepted));
        assert_eq!(candidate.dominant_horizon, Some("SWING".to_string()));
        assert!((candidate.composite_score - 220.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_signals_emits_nothing() {
        let bus = MemoryBus::new();
        let engine = FusionEngine::new(FusionPlan::default());
        assert!(engine.fuse(&bus, "AAA").unwrap().is_none());
    }

    #[test]
    fn fusion_id_is_pure_function_of_symbol_ids_and_plan_version() {
        let a = stable_fusion_id("AAA", &["s2".to_string(), "s1".to_string()], "v1");
        let b = stable_fusion_id("AAA", &["s1".to_string(), "s2".to_string()], "v1");
        assert_eq!(a, b);
    }

    #[test]
    fn conflict_below_threshold() {
        let bus = MemoryBus::new();
        publish(&bus, topics::SIGNAL_DISPLAY, &signal("s1", "SCALP", 10)).unwrap();
        let mut plan = FusionPlan::default();
        plan.accept_threshold = 55.0;
        let engine = FusionEngine::new(plan);
        let candidate = engine.fuse(&bus, "AAA").unwrap().unwrap();
        assert!(matches!(candidate.resolution, Resolution::Conflict));
    }
}
