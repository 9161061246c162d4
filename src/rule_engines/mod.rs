//! Example rule-engine bodies: stateless readers that emit signals with
//! stable IDs. The framework (stable-ID formula, validator, signal
//! contract) is specified; these three bodies are examples of it.

pub mod day;
pub mod scalp;
pub mod swing;

use sha2::{Digest, Sha256};

/// First 24 hex chars of SHA-256 over
/// `"{symbol}|{signal_type}|{anchor_ts}|{entry}|{stop}"`. Same inputs always
/// produce the same ID — this is how replay idempotence is achieved at the
/// signal layer, without a transactional store.
pub fn stable_signal_id(symbol: &str, signal_type: &str, anchor_ts: i64, entry: i64, stop: i64) -> String {
    let payload = format!("{symbol}|{signal_type}|{anchor_ts}|{entry}|{stop}");
    let digest = Sha256::digest(payload.as_bytes());
    hex::encode(digest)[..24].to_string()
}
