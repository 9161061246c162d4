use serde::{Deserialize, Serialize};

/// `article.analysis.v1` — produced by an external news adapter, consumed by
/// the swing rule engine's veto check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub article_id: String,
    pub analysis_ts_ms: i64,
    pub sentiment_score: f64,
    pub relevance_score: f64,
    pub summary: String,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default = "default_impact_class")]
    pub impact_class: String,
}

fn default_impact_class() -> String {
    "none".to_string()
}
