pub mod finalizer;
pub mod imputation;
pub mod integrity_checker;
pub mod station_aggregator;

pub use finalizer::Finalizer;
pub use imputation::{fail_soft, ImputationEngine, ImputationOutcome, Stage, StageFailure, STAGES};
pub use integrity_checker::{IntegrityChecker, IntegrityReport, Violation, ViolationType};
pub use station_aggregator::{
    AggregationOutcome, SkippedSource, SourceState, StationAggregator, StationReport,
};
