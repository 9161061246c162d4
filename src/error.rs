// =============================================================================
// Pipeline Error Kinds
// =============================================================================
//
// Every component in the fabric surfaces one of these kinds rather than an
// opaque error chain: the worker loop (or the CLI, standing in for one here)
// decides whether a given kind is log-and-continue (`Duplicate`,
// `ValidationRejected`) or fatal-to-the-worker (`BusFailure`). `Starvation`
// is listed for completeness but is not actually raised anywhere —
// insufficient indicator warm-up is not an error, it is a value
// (`None`) flowing through the pipeline.
// =============================================================================

use thiserror::Error;

/// The distinguishable error kinds a pipeline component can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A malformed tick, bar, or signal envelope reached a component that
    /// cannot make sense of it (missing required field, out-of-range value
    /// caught before the central validator runs). No state change occurs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A signal, news item, or fusion plan failed the central validator's
    /// field/range checks. The payload is not forwarded; a rejection audit
    /// record is published instead.
    #[error("validation rejected: {0}")]
    ValidationRejected(String),

    /// A tick was recognized as a duplicate by the aggregator's dedupe map
    /// and silently dropped (after an audit record is emitted).
    #[error("duplicate tick dropped: {0}")]
    Duplicate(String),

    /// An append to the event bus failed. Fatal to the current worker;
    /// partial in-memory state afterward is undefined. The caller owns the
    /// decision to restart.
    #[error("bus append failed for topic {topic}: {source}")]
    BusFailure {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    /// Insufficient warm-up data for an indicator. Not actually raised in
    /// this crate — indicator starvation is represented as `None` values on
    /// `indicators.bar.v1`, not as an error — kept here so every error kind
    /// has a 1:1 type-level counterpart.
    #[error("starvation: {0}")]
    Starvation(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
