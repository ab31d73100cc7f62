//! Sales-pipeline coverage: ingest an opportunity export, aggregate it per
//! owner and derive coverage figures against fixed margin targets.

pub mod config;
pub mod fetch;
pub mod metrics;
pub mod plan;
pub mod process;
pub mod snapshot;

pub use config::PipelineConfig;
pub use fetch::{LoadError, Source};
pub use metrics::MetricsError;
pub use plan::{build_report, PlanReport};
pub use snapshot::Snapshot;
