// =============================================================================
// Codex Stub — out of scope, specified only at its interface boundary
// =============================================================================
//
// A stand-in for an external LLM-driven signal generator. Given a minimal
// task request, returns a fixed-shape candidate signal payload (or a forced
// rejection), and records the exchange on the audit topic. Nothing here is
// part of the deterministic fabric; it exists only so the validator/bus
// boundary this crate does specify has something to call.
// =============================================================================

use uuid::Uuid;

use crate::bus::{publish, topics, EventBus};
use crate::error::Result;
use crate::model::AuditRecord;

#[derive(Debug, Clone, Copy)]
pub struct TaskRequest {
    pub mid_price_ticks: i64,
    pub stop_ticks: i64,
    pub force_reject: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CodexResponse {
    pub status: String,
    pub response_ts_ms: i64,
    pub entry_price_ticks: Option<i64>,
    pub stop_price_ticks: Option<i64>,
    pub target_price_ticks: Vec<i64>,
    pub confidence_pct: Option<i64>,
}

/// Stub equivalent of `call_codex_generate_display`: a fixed-shape response
/// derived from the task's market/risk state, or a forced rejection.
pub fn call_codex_generate_display<B: EventBus + ?Sized>(bus: &B, req: TaskRequest, ts_ms: i64) -> Result<CodexResponse> {
    let response = if req.force_reject {
        CodexResponse {
            status: "REJECT".to_string(),
            response_ts_ms: ts_ms,
            entry_price_ticks: None,
            stop_price_ticks: None,
            target_price_ticks: vec![],
            confidence_pct: None,
        }
    } else {
        let entry = req.mid_price_ticks;
        let stop = (entry - req.stop_ticks).max(1);
        CodexResponse {
            status: "OK".to_string(),
            response_ts_ms: ts_ms,
            entry_price_ticks: Some(entry),
            stop_price_ticks: Some(stop),
            target_price_ticks: vec![entry + (entry - stop) * 2],
            confidence_pct: Some(60),
        }
    };

    let record = AuditRecord::new(Uuid::new_v4().to_string(), "codex_response", ts_ms, &response);
    publish(bus, topics::AUDIT_RECORDS, &record)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;

    #[test]
    fn forced_reject_short_circuits() {
        let bus = MemoryBus::new();
        let req = TaskRequest { mid_price_ticks: 1000, stop_ticks: 10, force_reject: true };
        let resp = call_codex_generate_display(&bus, req, 0).unwrap();
        assert_eq!(resp.status, "REJECT");
    }

    #[test]
    fn normal_request_derives_entry_and_stop() {
        let bus = MemoryBus::new();
        let req = TaskRequest { mid_price_ticks: 1000, stop_ticks: 10, force_reject: false };
        let resp = call_codex_generate_display(&bus, req, 0).unwrap();
        assert_eq!(resp.status, "OK");
        assert_eq!(resp.entry_price_ticks, Some(1000));
        assert_eq!(resp.stop_price_ticks, Some(990));
    }
}
