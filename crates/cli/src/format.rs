//! Report rendering.
//!
//! The text form is meant for people and keeps one section per finding kind. The JSON form is a
//! lossless serialization of the whole [`Analysis`] for tooling.

use chrono::{DateTime, Utc};
use index::Analysis;
use jnicheck_core::{ImplementedBinding, MatchResult, MatchStatus, ReportFormat};
use serde::Serialize;

const RULE_WIDTH: usize = 80;
const SECTION_WIDTH: usize = 50;

// ============================================================================
// Public formatting API
// ============================================================================

/// Render `analysis` in the requested format
pub fn render(format: ReportFormat, analysis: &Analysis, generated_at: DateTime<Utc>) -> serde_json::Result<String> {
  match format {
    ReportFormat::Text => Ok(render_text(analysis, generated_at)),
    ReportFormat::Json => render_json(analysis, generated_at),
  }
}

#[derive(Serialize)]
struct JsonReport<'a> {
  generated_at: String,
  version: &'static str,
  #[serde(flatten)]
  analysis: &'a Analysis,
}

pub fn render_json(analysis: &Analysis, generated_at: DateTime<Utc>) -> serde_json::Result<String> {
  serde_json::to_string_pretty(&JsonReport {
    generated_at: generated_at.to_rfc3339(),
    version: env!("CARGO_PKG_VERSION"),
    analysis,
  })
}

pub fn render_text(analysis: &Analysis, generated_at: DateTime<Utc>) -> String {
  let mut out = String::new();

  out.push_str(&"=".repeat(RULE_WIDTH));
  out.push_str("\nJNI VALIDATION REPORT\n");
  out.push_str(&"=".repeat(RULE_WIDTH));
  out.push('\n');
  out.push_str(&format!("Project: {}\n", analysis.root.display()));
  out.push_str(&format!("Generated: {}\n\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));

  out.push_str(&format_summary(analysis));
  out.push_str(&format_declared(analysis));
  out.push_str(&format_implemented(analysis));

  let missing = with_status(analysis, MatchStatus::MissingImplementation);
  if !missing.is_empty() {
    out.push_str(&section("MISSING IMPLEMENTATIONS"));
    for result in &missing {
      out.push_str(&format_missing(result));
    }
  }

  let ambiguous = with_status(analysis, MatchStatus::Ambiguous);
  if !ambiguous.is_empty() {
    out.push_str(&section("AMBIGUOUS IMPLEMENTATIONS"));
    for result in &ambiguous {
      out.push_str(&format_ambiguous(result));
    }
  }

  let duplicates = with_status(analysis, MatchStatus::DuplicateDeclaration);
  if !duplicates.is_empty() {
    out.push_str(&section("DUPLICATE DECLARATIONS"));
    for result in &duplicates {
      out.push_str(&format_duplicate(result));
    }
  }

  let orphaned = with_status(analysis, MatchStatus::OrphanedImplementation);
  if !orphaned.is_empty() {
    out.push_str(&section("ORPHANED IMPLEMENTATIONS"));
    for result in &orphaned {
      out.push_str(&format_orphan(result));
    }
  }

  if !analysis.warnings.is_empty() {
    out.push_str(&section("PARSE WARNINGS"));
    for warning in &analysis.warnings {
      out.push_str(&format!("  {}\n", warning));
    }
    out.push('\n');
  }

  out.push_str(&format_recommendations(&missing, &ambiguous, &duplicates, &orphaned));
  out
}

// ============================================================================
// Sections
// ============================================================================

fn format_summary(analysis: &Analysis) -> String {
  let s = &analysis.summary;
  let mut out = String::from("SUMMARY:\n");
  out.push_str(&format!("  Managed source files: {}\n", s.declared_files));
  out.push_str(&format!("  Native source files: {}\n", s.implemented_files));
  if s.skipped_files > 0 {
    out.push_str(&format!("  Skipped (too large): {}\n", s.skipped_files));
  }
  out.push_str(&format!("  Native method declarations: {}\n", s.declared_bindings));
  out.push_str(&format!("  Bridge function implementations: {}\n", s.implemented_bindings));
  out.push_str(&format!("  Matched: {}\n", s.results.matched));
  out.push_str(&format!("  Missing implementations: {}\n", s.results.missing));
  out.push_str(&format!("  Ambiguous: {}\n", s.results.ambiguous));
  out.push_str(&format!("  Duplicate declarations: {}\n", s.results.duplicate_declarations));
  out.push_str(&format!("  Orphaned implementations: {}\n", s.results.orphaned));
  out.push_str(&format!("  Parse warnings: {}\n\n", s.warnings));
  out
}

fn format_declared(analysis: &Analysis) -> String {
  let mut out = section("NATIVE METHOD DECLARATIONS");
  if analysis.declared.is_empty() {
    out.push_str("  (none)\n\n");
  }
  for binding in &analysis.declared {
    let owner = binding.owner.join(".");
    let static_marker = if binding.is_static { " [static]" } else { "" };
    out.push_str(&format!("  {}.{}{}\n", owner, binding.display_signature(), static_marker));
    out.push_str(&format!("    Return: {}\n", binding.return_type));
    out.push_str(&format!("    Descriptor: {}\n", binding.method_descriptor()));
    out.push_str(&format!("    File: {}\n\n", binding.origin));
  }
  out
}

fn format_implemented(analysis: &Analysis) -> String {
  let mut out = section("BRIDGE FUNCTION IMPLEMENTATIONS");
  if analysis.implemented.is_empty() {
    out.push_str("  (none)\n\n");
  }
  for binding in &analysis.implemented {
    out.push_str(&format!("  {}\n", binding.symbol));
    out.push_str(&format!("    Kind: {}\n", implementation_kind(binding)));
    out.push_str(&format!("    File: {}\n\n", binding.origin));
  }
  out
}

fn format_missing(result: &MatchResult) -> String {
  let mut out = String::new();
  match &result.declared {
    Some(declared) => {
      out.push_str(&format!("  [X] {}.{}\n", declared.owner.join("."), declared.display_signature()));
      out.push_str(&format!("    Expected JNI function: {}\n", result.key.symbol));
      if let Some(found) = result.implemented.first() {
        out.push_str(&format!("    Only a forward declaration was found at {}\n", found.origin));
      }
      out.push_str(&format!("    File: {}\n", declared.origin));
    }
    None => out.push_str(&format!("  [X] {}\n", result.key.symbol)),
  }
  out.push('\n');
  out
}

fn format_ambiguous(result: &MatchResult) -> String {
  let mut out = String::new();
  if let Some(declared) = &result.declared {
    out.push_str(&format!("  [?] {}.{}\n", declared.owner.join("."), declared.display_signature()));
    out.push_str(&format!("    File: {}\n", declared.origin));
  }
  out.push_str(&format!("    Symbol: {}\n", result.key.symbol));
  out.push_str("    Candidates:\n");
  for candidate in &result.implemented {
    out.push_str(&format!("      - {} ({})\n", candidate.symbol, candidate.origin));
  }
  out.push('\n');
  out
}

fn format_duplicate(result: &MatchResult) -> String {
  match &result.declared {
    Some(declared) => format!(
      "  [!] {}.{}\n    File: {}\n\n",
      declared.owner.join("."),
      declared.display_signature(),
      declared.origin
    ),
    None => format!("  [!] {}\n\n", result.key.symbol),
  }
}

fn format_orphan(result: &MatchResult) -> String {
  let mut out = format!("  [-] {}\n", result.key.symbol);
  let mut decoded = result.key.owner.join(".");
  if !decoded.is_empty() {
    decoded.push('.');
  }
  decoded.push_str(&result.key.method);
  out.push_str(&format!("    Decoded as: {}\n", decoded));
  if result.implemented.len() > 1 {
    out.push_str(&format!("    Duplicate definitions: {}\n", result.implemented.len()));
  }
  for implementation in &result.implemented {
    out.push_str(&format!("    File: {}\n", implementation.origin));
  }
  out.push('\n');
  out
}

fn format_recommendations(
  missing: &[&MatchResult],
  ambiguous: &[&MatchResult],
  duplicates: &[&MatchResult],
  orphaned: &[&MatchResult],
) -> String {
  let mut out = section("RECOMMENDATIONS");
  let mut step = 0;
  let mut next = || {
    step += 1;
    step
  };

  if !missing.is_empty() {
    out.push_str(&format!("{}. Implement missing JNI functions:\n", next()));
    for result in missing {
      out.push_str(&format!("   - {}\n", result.key.symbol));
    }
    out.push('\n');
  }
  if !ambiguous.is_empty() {
    out.push_str(&format!(
      "{}. Keep exactly one definition per bridge symbol, or use the overload form for each overload\n",
      next()
    ));
  }
  if !duplicates.is_empty() {
    out.push_str(&format!("{}. Remove duplicate native method declarations\n", next()));
  }
  if !orphaned.is_empty() {
    out.push_str(&format!(
      "{}. Remove orphaned bridge functions or declare the matching native methods\n",
      next()
    ));
    let redefined: Vec<_> = orphaned.iter().filter(|r| r.implemented.len() > 1).collect();
    if !redefined.is_empty() {
      out.push_str(&format!("{}. Keep one definition of each orphaned bridge function:\n", next()));
      for result in redefined {
        out.push_str(&format!("   - {}\n", result.key.symbol));
      }
    }
  }
  if step == 0 {
    out.push_str("All native methods have implementations\n");
  }
  out
}

// ============================================================================
// Helpers
// ============================================================================

fn section(title: &str) -> String {
  format!("{}:\n{}\n", title, "-".repeat(SECTION_WIDTH))
}

fn with_status(analysis: &Analysis, status: MatchStatus) -> Vec<&MatchResult> {
  analysis.results.iter().filter(|r| r.status == status).collect()
}

fn implementation_kind(binding: &ImplementedBinding) -> String {
  let mut kind = String::from(if binding.is_definition {
    "definition"
  } else {
    "forward declaration"
  });
  if binding.exported {
    kind.push_str(", exported");
  }
  if let Some(suffix) = &binding.overload_suffix {
    kind.push_str(&format!(", overload __{}", suffix));
  }
  kind
}
