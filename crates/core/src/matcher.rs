//! Declared-to-implemented binding matcher.
//!
//! Joins the two binding sets on the exact mangled symbol produced by [`Mangler`]. Every key
//! observed on either side yields one [`MatchResult`]; redundant declarations yield one extra
//! [`MatchStatus::DuplicateDeclaration`] result each. Output order depends only on the keys, never
//! on the order bindings were extracted in.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::mangle::{CanonicalKey, Mangler};
use crate::model::{DeclaredBinding, ImplementedBinding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
  Matched,
  MissingImplementation,
  /// More than one native definition could satisfy the same declaration
  Ambiguous,
  OrphanedImplementation,
  DuplicateDeclaration,
}

impl MatchStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      MatchStatus::Matched => "MATCHED",
      MatchStatus::MissingImplementation => "MISSING_IMPLEMENTATION",
      MatchStatus::Ambiguous => "AMBIGUOUS",
      MatchStatus::OrphanedImplementation => "ORPHANED_IMPLEMENTATION",
      MatchStatus::DuplicateDeclaration => "DUPLICATE_DECLARATION",
    }
  }

  /// Statuses that make a run fail regardless of configuration
  pub fn is_failure(self) -> bool {
    matches!(
      self,
      MatchStatus::MissingImplementation | MatchStatus::Ambiguous | MatchStatus::DuplicateDeclaration
    )
  }
}

impl fmt::Display for MatchStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Classification of one canonical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
  pub key: CanonicalKey,
  pub declared: Option<DeclaredBinding>,
  pub implemented: Vec<ImplementedBinding>,
  pub status: MatchStatus,
}

impl MatchResult {
  /// Implementations that are only forward declarations
  pub fn declaration_only(&self) -> bool {
    !self.implemented.is_empty() && self.implemented.iter().all(|i| !i.is_definition)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
  /// Treat a match satisfied only by forward declarations as missing
  pub require_definitions: bool,
}

/// Collapse per-file implementation batches into the project-wide set.
///
/// For each symbol: definitions win over forward declarations, forward declarations collapse to
/// the first one by origin, and every definition is kept so duplicates surface as findings.
pub fn merge_implementations(mut implemented: Vec<ImplementedBinding>) -> Vec<ImplementedBinding> {
  implemented.sort_by(|a, b| a.symbol.cmp(&b.symbol).then_with(|| a.origin.cmp(&b.origin)));

  let mut merged: Vec<ImplementedBinding> = Vec::with_capacity(implemented.len());
  let mut start = 0;
  while start < implemented.len() {
    let symbol = &implemented[start].symbol;
    let end = implemented[start..]
      .iter()
      .position(|i| &i.symbol != symbol)
      .map_or(implemented.len(), |offset| start + offset);
    let group = &implemented[start..end];

    if group.iter().any(|i| i.is_definition) {
      merged.extend(group.iter().filter(|i| i.is_definition).cloned());
    } else {
      merged.push(group[0].clone());
    }
    start = end;
  }
  merged
}

/// Resolves declared bindings against implemented symbols.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
  mangler: Mangler,
  options: MatchOptions,
}

struct Resolution<'a> {
  binding: &'a DeclaredBinding,
  key: CanonicalKey,
  /// Present symbols satisfying the declaration, long form first
  symbols: Vec<String>,
}

impl Matcher {
  pub fn new(mangler: Mangler, options: MatchOptions) -> Self {
    Self { mangler, options }
  }

  pub fn mangler(&self) -> &Mangler {
    &self.mangler
  }

  /// Classify every declared and implemented binding.
  pub fn run(&self, declared: &[DeclaredBinding], implemented: &[ImplementedBinding]) -> Vec<MatchResult> {
    let implemented = merge_implementations(implemented.to_vec());
    let mut by_symbol: BTreeMap<&str, Vec<&ImplementedBinding>> = BTreeMap::new();
    for binding in &implemented {
      by_symbol.entry(binding.symbol.as_str()).or_default().push(binding);
    }

    let mut sorted: Vec<&DeclaredBinding> = declared.iter().collect();
    sorted.sort_by(|a, b| {
      (&a.owner, &a.method, &a.params, &a.origin).cmp(&(&b.owner, &b.method, &b.params, &b.origin))
    });

    let mut unique: Vec<&DeclaredBinding> = Vec::with_capacity(sorted.len());
    let mut duplicates: Vec<&DeclaredBinding> = Vec::new();
    for binding in sorted {
      match unique.last() {
        Some(prev) if prev.owner == binding.owner && prev.method == binding.method && prev.params == binding.params => {
          duplicates.push(binding)
        }
        _ => unique.push(binding),
      }
    }

    // Short names are injective over (owner, method), so they identify overload groups.
    let mut group_sizes: HashMap<String, usize> = HashMap::new();
    for binding in &unique {
      *group_sizes
        .entry(self.mangler.short_name(&binding.owner, &binding.method))
        .or_default() += 1;
    }
    let is_overloaded = |b: &DeclaredBinding| {
      group_sizes
        .get(&self.mangler.short_name(&b.owner, &b.method))
        .is_some_and(|&n| n > 1)
    };

    // Both the discriminated and the short form can link to the same declaration.
    let resolutions: Vec<Resolution> = unique
      .iter()
      .map(|&binding| {
        let long = self.mangler.long_key(binding);
        let short = self.mangler.short_key(binding);
        let symbols = [&long.symbol, &short.symbol]
          .into_iter()
          .filter(|symbol| by_symbol.contains_key(symbol.as_str()))
          .cloned()
          .collect();
        let key = if is_overloaded(binding) { long } else { short };
        Resolution { binding, key, symbols }
      })
      .collect();

    let mut claims: HashMap<&str, usize> = HashMap::new();
    for resolution in &resolutions {
      for symbol in &resolution.symbols {
        *claims.entry(symbol.as_str()).or_default() += 1;
      }
    }

    let mut results = Vec::with_capacity(resolutions.len() + duplicates.len() + by_symbol.len());
    let mut consumed: HashSet<&str> = HashSet::new();

    for resolution in &resolutions {
      let mut implementations: Vec<ImplementedBinding> = Vec::new();
      let mut contested = false;
      for symbol in &resolution.symbols {
        let Some((&stored, impls)) = by_symbol.get_key_value(symbol.as_str()) else {
          continue;
        };
        consumed.insert(stored);
        contested |= claims.get(stored).is_some_and(|&n| n > 1);
        implementations.extend(impls.iter().map(|&i| i.clone()));
      }
      let status = match implementations.as_slice() {
        [] => MatchStatus::MissingImplementation,
        [only] if !contested => {
          if self.options.require_definitions && !only.is_definition {
            MatchStatus::MissingImplementation
          } else {
            MatchStatus::Matched
          }
        }
        _ => MatchStatus::Ambiguous,
      };
      results.push(MatchResult {
        key: resolution.key.clone(),
        declared: Some(resolution.binding.clone()),
        implemented: implementations,
        status,
      });
    }

    for binding in duplicates {
      results.push(MatchResult {
        key: self.mangler.key(binding, is_overloaded(binding)),
        declared: Some(binding.clone()),
        implemented: Vec::new(),
        status: MatchStatus::DuplicateDeclaration,
      });
    }

    for (symbol, impls) in &by_symbol {
      if consumed.contains(symbol) {
        continue;
      }
      let first = impls[0];
      results.push(MatchResult {
        key: CanonicalKey {
          owner: first.decoded_owner.clone(),
          method: first.decoded_method.clone(),
          discriminant: first.overload_suffix.clone(),
          symbol: symbol.to_string(),
        },
        declared: None,
        implemented: impls.iter().map(|&i| i.clone()).collect(),
        status: MatchStatus::OrphanedImplementation,
      });
    }

    results.sort_by(|a, b| {
      a.key
        .cmp(&b.key)
        .then(a.status.cmp(&b.status))
        .then_with(|| a.declared.as_ref().map(|d| &d.origin).cmp(&b.declared.as_ref().map(|d| &d.origin)))
    });

    debug!(
      declared = declared.len(),
      implemented = implemented.len(),
      results = results.len(),
      "Matching complete"
    );
    results
  }
}

/// Counts per status for one analysis run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub matched: usize,
  pub missing: usize,
  pub ambiguous: usize,
  pub orphaned: usize,
  pub duplicate_declarations: usize,
}

impl Summary {
  pub fn from_results(results: &[MatchResult]) -> Self {
    let mut summary = Self::default();
    for result in results {
      match result.status {
        MatchStatus::Matched => summary.matched += 1,
        MatchStatus::MissingImplementation => summary.missing += 1,
        MatchStatus::Ambiguous => summary.ambiguous += 1,
        MatchStatus::OrphanedImplementation => summary.orphaned += 1,
        MatchStatus::DuplicateDeclaration => summary.duplicate_declarations += 1,
      }
    }
    summary
  }

  pub fn failures(&self) -> usize {
    self.missing + self.ambiguous + self.duplicate_declarations
  }

  pub fn has_failures(&self, fail_on_orphans: bool) -> bool {
    self.failures() > 0 || (fail_on_orphans && self.orphaned > 0)
  }
}
