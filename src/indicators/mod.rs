// =============================================================================
// Indicator Engine Module
// =============================================================================
//
// Stateful, per-symbol rolling EMA/ATR with crossover-triggered signal
// emission. See `engine` for the incremental implementation.

pub mod engine;

pub use engine::{IndicatorEngine, IndicatorState};
