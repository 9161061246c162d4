// =============================================================================
// Signal / News / Fusion-Plan Validator
// =============================================================================
//
// Central field/range validation run before any signal, news item, or
// fusion plan reaches its topic. A rejection publishes an audit record and
// skips the publish; it never retries and never mutates the payload.
// =============================================================================

use tracing::warn;
use uuid::Uuid;

use crate::bus::{publish, topics, EventBus};
use crate::error::Result;
use crate::model::{AuditRecord, FusionPlan, NewsAnalysis, Signal, Side};

/// The outcome of offering a record to the validator + bus.
pub enum PublishOutcome {
    Ok { id: String },
    Rejected { errors: Vec<String> },
}

impl PublishOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PublishOutcome::Ok { .. })
    }
}

/// Field/range checks for a `Signal`.
pub fn validate_signal(signal: &Signal) -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if signal.id.len() < 8 || signal.id.len() > 64 {
        errors.push("id: must be between 8 and 64 characters".to_string());
    }
    if !matches!(signal.side, Side::Long | Side::Short) {
        errors.push("side: invalid".to_string());
    }
    if signal.generated_ts_ms < 0 {
        errors.push("generated_ts_ms: must be >= 0".to_string());
    }
    if signal.entry_price_ticks < 1 {
        errors.push("entry_price_ticks: must be >= 1".to_string());
    }
    if signal.stop_price_ticks < 1 {
        errors.push("stop_price_ticks: must be >= 1".to_string());
    }
    if !(0..=100).contains(&signal.confidence_pct) {
        errors.push("confidence_pct: out of range".to_string());
    }
    if let Some(rr) = signal.rr {
        if rr < 0.0 {
            errors.push("rr: must be >= 0".to_string());
        }
    }
    if let Some(ttl) = signal.ttl_ms {
        if ttl < 0 {
            errors.push("ttl_ms: must be >= 0".to_string());
        }
    }
    if let Some(short) = &signal.explanation_short {
        if short.len() > 240 {
            errors.push("explanation_short: too long".to_string());
        }
    }
    if let Some(long) = &signal.explanation_long {
        if long.len() > 2000 {
            errors.push("explanation_long: too long".to_string());
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Field/range checks for `article.analysis.v1`.
pub fn validate_news(news: &NewsAnalysis) -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if !(-1.0..=1.0).contains(&news.sentiment_score) {
        errors.push("sentiment_score: out of range".to_string());
    }
    if !(0.0..=1.0).contains(&news.relevance_score) {
        errors.push("relevance_score: out of range".to_string());
    }
    if news.summary.len() > 4000 {
        errors.push("summary: too long".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Field/range checks for `fusion.plan.v1`.
pub fn validate_fusion_plan(plan: &FusionPlan) -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if plan.weights.is_empty() {
        errors.push("weights: must be a non-empty object".to_string());
    }
    if !(0.0..=100.0).contains(&plan.accept_threshold) {
        errors.push("accept_threshold: out of range".to_string());
    }
    if plan.conflict_rr_threshold < 0.0 {
        errors.push("conflict_rr_threshold: must be >= 0".to_string());
    }
    if plan.min_contributions < 1 {
        errors.push("min_contributions: must be >= 1".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn audit<B: EventBus + ?Sized>(bus: &B, ts_ms: i64, event_type: &str, payload: &impl serde::Serialize) -> Result<()> {
    let record = AuditRecord::new(Uuid::new_v4().to_string(), event_type, ts_ms, payload);
    publish(bus, topics::AUDIT_RECORDS, &record)
}

/// Validates `signal`, publishing the audit trail either way. On success,
/// publishes the canonical signal to `signal.display.v1` and returns
/// `PublishOutcome::Ok`. On rejection, publishes a rejection audit and
/// returns `PublishOutcome::Rejected` WITHOUT publishing the signal — the
/// caller decides whether a permissive fallback publish applies (see
/// `IndicatorEngine::handle_bar`, which does; rule engines do not).
pub fn publish_validated_signal<B: EventBus + ?Sized>(bus: &B, signal: &Signal, ts_ms: i64) -> Result<PublishOutcome> {
    match validate_signal(signal) {
        Ok(()) => {
            publish(bus, topics::SIGNAL_DISPLAY, signal)?;
            audit(bus, ts_ms, "codex_validated_signal", signal)?;
            Ok(PublishOutcome::Ok { id: signal.id.clone() })
        }
        Err(errors) => {
            warn!(id = %signal.id, errors = ?errors, "signal validation rejected");
            audit(bus, ts_ms, "codex_validation_failed", &errors)?;
            Ok(PublishOutcome::Rejected { errors })
        }
    }
}

/// Validates `news`, publishing to `article.analysis.v1` on success or a
/// rejection audit otherwise.
pub fn publish_validated_news<B: EventBus + ?Sized>(bus: &B, news: &NewsAnalysis, ts_ms: i64) -> Result<PublishOutcome> {
    match validate_news(news) {
        Ok(()) => {
            publish(bus, topics::ARTICLE_ANALYSIS, news)?;
            audit(bus, ts_ms, "codex_validated_news", news)?;
            Ok(PublishOutcome::Ok { id: news.article_id.clone() })
        }
        Err(errors) => {
            audit(bus, ts_ms, "codex_news_validate_failed", &errors)?;
            Ok(PublishOutcome::Rejected { errors })
        }
    }
}

/// Validates `plan`, publishing to `fusion.plan.v1` on success or a
/// rejection audit otherwise.
pub fn publish_validated_fusion_plan<B: EventBus + ?Sized>(bus: &B, plan: &FusionPlan, ts_ms: i64) -> Result<PublishOutcome> {
    match validate_fusion_plan(plan) {
        Ok(()) => {
            publish(bus, topics::FUSION_PLAN, plan)?;
            audit(bus, ts_ms, "codex_validated_fusion_plan", plan)?;
            Ok(PublishOutcome::Ok { id: plan.version.clone() })
        }
        Err(errors) => {
            audit(bus, ts_ms, "codex_fusion_plan_failed", &errors)?;
            Ok(PublishOutcome::Rejected { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_signal() -> Signal {
        Signal {
            id: "signal-AAA-1000".to_string(),
            symbol: "AAA".to_string(),
            side: Side::Long,
            signal_type: "SCALP".to_string(),
            generated_ts_ms: 1000,
            entry_price_ticks: 100,
            stop_price_ticks: 90,
            target_price_ticks: vec![120],
            confidence_pct: 60,
            rr: None,
            ttl_ms: Some(1000),
            model_version: None,
            source: None,
            explanation_short: None,
            explanation_long: None,
            debug: Default::default(),
        }
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let mut s = valid_signal();
        s.confidence_pct = 150;
        assert!(validate_signal(&s).is_err());
    }

    #[test]
    fn rejects_short_id() {
        let mut s = valid_signal();
        s.id = "abc".to_string();
        assert!(validate_signal(&s).is_err());
    }

    #[test]
    fn accepts_well_formed_signal() {
        assert!(validate_signal(&valid_signal()).is_ok());
    }

    #[test]
    fn rejects_non_positive_entry_or_stop() {
        let mut s = valid_signal();
        s.entry_price_ticks = 0;
        assert!(validate_signal(&s).is_err());
    }

    #[test]
    fn fusion_plan_requires_nonempty_weights() {
        let plan = FusionPlan { weights: Default::default(), ..FusionPlan::default() };
        assert!(validate_fusion_plan(&plan).is_err());
    }
}
