use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `fusion.plan.v1` — the weighting config the fusion engine resolves
/// candidates against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionPlan {
    pub version: String,
    pub weights: HashMap<String, f64>,
    pub accept_threshold: f64,
    #[serde(default)]
    pub conflict_rr_threshold: f64,
    #[serde(default = "default_min_contributions")]
    pub min_contributions: u32,
    #[serde(default)]
    pub debug: HashMap<String, serde_json::Value>,
}

fn default_min_contributions() -> u32 {
    1
}

impl Default for FusionPlan {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("SCALP".to_string(), 0.5);
        weights.insert("DAY".to_string(), 1.0);
        weights.insert("SWING".to_string(), 1.5);
        Self {
            version: "fusion_plan_v1".to_string(),
            weights,
            accept_threshold: 55.0,
            conflict_rr_threshold: 0.3,
            min_contributions: 1,
            debug: HashMap::new(),
        }
    }
}

/// `ACCEPTED` or `CONFLICT`, the fusion engine's resolution of a symbol's
/// composite score against the plan's `accept_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "CONFLICT")]
    Conflict,
}

/// One signal's contribution to a fusion trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub horizon: String,
    pub signal_id: String,
    pub confidence_pct: i64,
    pub weight: f64,
    pub weighted_score: f64,
    pub rationale: Vec<String>,
}

/// `fusion.trace.v1` — full per-contribution breakdown behind a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionTrace {
    pub fusion_id: String,
    pub symbol: String,
    pub created_ts_ms: i64,
    pub contributions: Vec<Contribution>,
    pub composite_score: f64,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_horizon: Option<String>,
    pub fusion_plan_version: String,
}

/// `candidate.v1` — the single ranked candidate per instrument that the
/// fusion engine emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub symbol: String,
    pub composite_score: f64,
    pub resolution: Resolution,
    pub created_ts_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_horizon: Option<String>,
    pub signals: Vec<String>,
}
