//! PuffScan analysis worker.
//!
//! Orchestrates the reference-time scans: fans one analyzer run out per
//! configured model, joins the results, aggregates them, and writes the
//! JSON report.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod stages;

pub use analyzer::{AnalyzerRun, RunResult};
pub use config::ScanConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::Executor;
pub use logging::ScanLogger;
pub use report::{FailedRun, RunReport, ScanReport};
pub use scanner::{ReferenceTimeScanner, ScanOutcome, ScanParams, ScanStatus};
pub use stages::{canonical_stages, StageSpec};
