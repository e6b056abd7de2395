//! Binding extraction for jnicheck
//!
//! This crate pulls bridge bindings out of source files without building an AST:
//! - `native` methods from Java and `external fun` declarations from Kotlin
//! - `Java_*` functions from C and C++ sources and headers
//!
//! Every file is scrubbed first (comments and literal bodies blanked) so that commented-out
//! code and strings never produce bindings.
//!
//! # Example
//! ```ignore
//! use jnicheck_core::{Language, Mangler, SourceUnit};
//! use parser::Extractor;
//!
//! let extractor = Extractor::new(Mangler::default());
//! let unit = SourceUnit::from_text("Bridge.java", Language::Java, source);
//! let extraction = extractor.extract(&unit);
//! ```

mod java;
mod kotlin;
mod lex;
mod native;
mod nesting;
pub mod scrub;
pub mod types;

use std::path::PathBuf;

use jnicheck_core::{DeclaredBinding, ImplementedBinding, Language, Mangler, ParseWarning, Side, SourceUnit};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use scrub::{LineIndex, Scrubbed, scrub};

/// Everything found in one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtraction {
  pub path: PathBuf,
  pub side: Side,
  pub declared: Vec<DeclaredBinding>,
  pub implemented: Vec<ImplementedBinding>,
  pub warnings: Vec<ParseWarning>,
}

impl FileExtraction {
  pub fn empty(path: impl Into<PathBuf>, side: Side) -> Self {
    Self {
      path: path.into(),
      side,
      declared: Vec::new(),
      implemented: Vec::new(),
      warnings: Vec::new(),
    }
  }
}

/// Per-language binding extractor.
///
/// Stateless apart from the mangler, so one instance can be shared across worker threads.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
  mangler: Mangler,
}

impl Extractor {
  pub fn new(mangler: Mangler) -> Self {
    Self { mangler }
  }

  pub fn mangler(&self) -> &Mangler {
    &self.mangler
  }

  /// Scrub and extract one unit. Problems are reported as warnings, never as errors.
  pub fn extract(&self, unit: &SourceUnit) -> FileExtraction {
    let mut out = FileExtraction::empty(&unit.path, unit.side);
    let scrubbed = scrub(&unit.text, unit.language);

    if let Some(open) = scrubbed.unterminated {
      warn!(path = %unit.path.display(), line = open.line, "{}", open);
      out
        .warnings
        .push(ParseWarning::new(&unit.path, Some(open.line), open.to_string()));
    }

    match unit.language {
      Language::Java => java::extract(&unit.path, &scrubbed.text, &mut out),
      Language::Kotlin => kotlin::extract(&unit.path, &unit.text, &scrubbed.text, &mut out),
      Language::C | Language::Cpp => native::extract(&unit.path, &scrubbed.text, &self.mangler, &mut out),
    }

    debug!(
      path = %unit.path.display(),
      declared = out.declared.len(),
      implemented = out.implemented.len(),
      warnings = out.warnings.len(),
      "Extracted bindings"
    );
    out
  }
}
