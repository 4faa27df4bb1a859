//! Application use cases.

pub mod analyse_code;

pub use analyse_code::{AnalyseCodeUseCase, AnalysisOutcome, ReportedStatus};
