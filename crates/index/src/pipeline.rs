//! Parallel read, scrub and extract over a scanned tree, then a single merge and match.

use jnicheck_core::{
  Config, DeclaredBinding, ImplementedBinding, MatchResult, Matcher, ParseWarning, Side, SourceUnit, Summary,
};
use parser::{Extractor, FileExtraction};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scanner::{ScannedFile, Scanner};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  Core(#[from] jnicheck_core::Error),
  #[error("Failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
  /// The scan root was missing or not a directory
  pub fn is_invalid_root(&self) -> bool {
    matches!(self, PipelineError::Core(jnicheck_core::Error::InvalidRoot { .. }))
  }
}

/// Counts for one analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
  pub declared_files: usize,
  pub implemented_files: usize,
  pub skipped_files: u32,
  pub declared_bindings: usize,
  pub implemented_bindings: usize,
  pub warnings: usize,
  #[serde(flatten)]
  pub results: Summary,
}

/// Everything a report needs: extracted bindings, match results and warnings, all in a stable order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
  pub root: PathBuf,
  pub summary: AnalysisSummary,
  pub declared: Vec<DeclaredBinding>,
  pub implemented: Vec<ImplementedBinding>,
  pub results: Vec<MatchResult>,
  pub warnings: Vec<ParseWarning>,
}

impl Analysis {
  pub fn has_failures(&self, fail_on_orphans: bool) -> bool {
    self.summary.results.has_failures(fail_on_orphans)
  }
}

pub struct Pipeline {
  scanner: Scanner,
  extractor: Extractor,
  matcher: Matcher,
  jobs: usize,
}

impl Pipeline {
  pub fn new(config: &Config) -> Self {
    Self {
      scanner: Scanner::from_config(&config.scan),
      extractor: Extractor::new(config.mangler()),
      matcher: config.matcher(),
      jobs: config.scan.jobs,
    }
  }

  /// Worker threads; 0 uses the available parallelism
  pub fn with_jobs(mut self, jobs: usize) -> Self {
    self.jobs = jobs;
    self
  }

  /// Scan `root` and analyze every discovered source file.
  ///
  /// An invalid root fails before any worker starts. Unreadable files become warnings.
  pub fn run(&self, root: &Path) -> Result<Analysis, PipelineError> {
    let scan = self.scanner.scan(root)?;
    debug!(
      files = scan.files.len(),
      bytes = scan.total_bytes,
      duration_ms = scan.scan_duration.as_millis() as u64,
      "Scanned project"
    );

    let pool = self.pool()?;
    let extractions: Vec<FileExtraction> =
      pool.install(|| scan.files.par_iter().map(|file| self.extract_file(file)).collect());

    let mut analysis = self.assemble(root, extractions, scan.warnings);
    analysis.summary.skipped_files = scan.skipped_count;

    info!(
      declared = analysis.summary.declared_bindings,
      implemented = analysis.summary.implemented_bindings,
      matched = analysis.summary.results.matched,
      missing = analysis.summary.results.missing,
      orphaned = analysis.summary.results.orphaned,
      "Analysis complete"
    );
    Ok(analysis)
  }

  /// Analyze units already in memory, in any order
  pub fn analyze_units(&self, root: &Path, units: &[SourceUnit]) -> Result<Analysis, PipelineError> {
    let pool = self.pool()?;
    let extractions: Vec<FileExtraction> =
      pool.install(|| units.par_iter().map(|unit| self.extractor.extract(unit)).collect());
    Ok(self.assemble(root, extractions, Vec::new()))
  }

  fn pool(&self) -> Result<rayon::ThreadPool, PipelineError> {
    Ok(rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build()?)
  }

  fn extract_file(&self, file: &ScannedFile) -> FileExtraction {
    match std::fs::read(&file.path) {
      Ok(bytes) => {
        let unit = SourceUnit::from_bytes(&file.relative_path, file.language, &bytes);
        let extraction = self.extractor.extract(&unit);
        debug!(
          path = %file.relative_path.display(),
          declared = extraction.declared.len(),
          implemented = extraction.implemented.len(),
          "Extracted file"
        );
        extraction
      }
      Err(e) => {
        warn!(path = %file.path.display(), error = %e, "Failed to read source file");
        let mut extraction = FileExtraction::empty(&file.relative_path, file.side());
        extraction
          .warnings
          .push(ParseWarning::new(&file.relative_path, None, format!("cannot read file: {e}")));
        extraction
      }
    }
  }

  /// Merge per-file batches into one deterministic analysis
  fn assemble(&self, root: &Path, extractions: Vec<FileExtraction>, mut warnings: Vec<ParseWarning>) -> Analysis {
    let mut summary = AnalysisSummary::default();
    let mut declared = Vec::new();
    let mut implemented = Vec::new();

    for extraction in extractions {
      match extraction.side {
        Side::Declared => summary.declared_files += 1,
        Side::Implemented => summary.implemented_files += 1,
      }
      declared.extend(extraction.declared);
      implemented.extend(extraction.implemented);
      warnings.extend(extraction.warnings);
    }

    declared.sort_by(|a: &DeclaredBinding, b: &DeclaredBinding| {
      (&a.origin, &a.owner, &a.method).cmp(&(&b.origin, &b.owner, &b.method))
    });
    implemented.sort_by(|a: &ImplementedBinding, b: &ImplementedBinding| {
      (&a.origin, &a.symbol).cmp(&(&b.origin, &b.symbol))
    });
    warnings.sort();

    let results = self.matcher.run(&declared, &implemented);
    summary.declared_bindings = declared.len();
    summary.implemented_bindings = implemented.len();
    summary.warnings = warnings.len();
    summary.results = Summary::from_results(&results);

    Analysis {
      root: root.to_path_buf(),
      summary,
      declared,
      implemented,
      results,
      warnings,
    }
  }
}
