//! The typed record shapes carried over the event bus. One module per
//! topic family, mirroring the topic catalog.

pub mod audit;
pub mod bar;
pub mod feature;
pub mod fusion;
pub mod news;
pub mod signal;
pub mod tick;

pub use audit::AuditRecord;
pub use bar::{AggregatorCounters, Bar, BarRecord, IndicatorBar, IndicatorValues, MetricsRecord};
pub use feature::{FeatureSnapshot, FeatureValues};
pub use fusion::{Candidate, Contribution, FusionPlan, FusionTrace, Resolution};
pub use news::NewsAnalysis;
pub use signal::{Side, Signal};
pub use tick::Tick;
