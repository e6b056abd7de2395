//! Source discovery and the parallel extraction pipeline.
//!
//! [`Scanner`] walks a project root honoring .gitignore and the usual build directories;
//! [`Pipeline`] reads, scrubs and extracts every file on a bounded rayon pool, then merges the
//! per-file batches and runs the matcher once.

mod pipeline;
mod scanner;

pub use pipeline::{Analysis, AnalysisSummary, Pipeline, PipelineError};
pub use scanner::{IGNORE_FILE, SKIPPED_DIRS, ScanResult, ScannedFile, Scanner};
