//! Extraction of `native` method declarations from Java sources.

use std::collections::HashMap;
use std::path::Path;

use jnicheck_core::{DeclaredBinding, Origin, ParseWarning};
use tracing::trace;

use crate::FileExtraction;
use crate::lex::{self, Token};
use crate::nesting::{self, Nesting};
use crate::scrub::LineIndex;
use crate::types::{JavaType, TypeScope, binary_segments};

const MODIFIERS: &[&str] = &[
  "public",
  "protected",
  "private",
  "static",
  "final",
  "synchronized",
  "abstract",
  "strictfp",
  "native",
  "default",
];

pub(crate) fn extract(path: &Path, text: &str, out: &mut FileExtraction) {
  let tokens = lex::tokenize(text);
  let scope = file_scope(&tokens);
  let mut extractor = JavaExtractor {
    path,
    tokens: &tokens,
    lines: LineIndex::new(text),
    scope,
    out,
  };
  extractor.run();
}

/// Package, imports and every type declared in the file
fn file_scope(tokens: &[Token<'_>]) -> TypeScope {
  let mut package = Vec::new();
  let mut imports = HashMap::new();

  let mut i = 0;
  while i < tokens.len() {
    match tokens[i].text {
      "package" if package.is_empty() => {
        let (name, next) = lex::dotted_name(tokens, i + 1);
        package = name;
        i = next;
      }
      "import" if i == 0 || tokens[i - 1].is(";") => {
        let start = if tokens.get(i + 1).is_some_and(|t| t.is("static")) { i + 2 } else { i + 1 };
        let (name, next) = lex::dotted_name(tokens, start);
        // On-demand imports (`a.b.*`) name no single type
        if tokens.get(next).is_some_and(|t| t.is(";"))
          && let Some(simple) = name.last()
        {
          imports.insert(simple.clone(), binary_segments(&name));
        }
        i = next;
      }
      "class" | "interface" | "enum" | "record" | "@" => break,
      _ => i += 1,
    }
  }

  let mut nesting = Nesting::java();
  let mut i = 0;
  while i < tokens.len() {
    i = nesting.advance(tokens, i);
  }

  let mut local_types = HashMap::new();
  for frame in nesting.declared {
    let mut segments = package.clone();
    segments.push(frame.binary);
    local_types.entry(frame.simple).or_insert(segments);
  }

  TypeScope {
    package,
    imports,
    local_types,
  }
}

struct JavaExtractor<'t, 'a, 'o> {
  path: &'t Path,
  tokens: &'t [Token<'a>],
  lines: LineIndex,
  scope: TypeScope,
  out: &'o mut FileExtraction,
}

impl JavaExtractor<'_, '_, '_> {
  fn run(&mut self) {
    let mut nesting = Nesting::java();
    let mut i = 0;
    while i < self.tokens.len() {
      if self.tokens[i].is("native") {
        i = self.native_method(&nesting, i);
      } else {
        i = nesting.advance(self.tokens, i);
      }
    }
  }

  fn warn(&mut self, at: usize, reason: impl Into<String>) {
    let line = self.lines.line(self.tokens[at].start);
    self.out.warnings.push(ParseWarning::new(self.path, Some(line), reason));
  }

  /// Index of the next `;` (past it) or brace (at it) from `from`
  fn recover(&self, from: usize) -> usize {
    match self.tokens[from..].iter().position(|t| t.is(";") || t.is("{") || t.is("}")) {
      Some(offset) if self.tokens[from + offset].is(";") => from + offset + 1,
      Some(offset) => from + offset,
      None => self.tokens.len(),
    }
  }

  /// Parse the method header around the `native` modifier at `at`; returns where to resume.
  fn native_method(&mut self, nesting: &Nesting, at: usize) -> usize {
    let tokens = self.tokens;
    let Some(frame) = nesting.current() else {
      self.warn(at, "`native` outside of a type declaration");
      return self.recover(at);
    };
    if !nesting.at_member_level() {
      self.warn(at, "native method in a local or anonymous class is not supported");
      return self.recover(at);
    }
    let owner_binary = frame.binary.clone();
    let mut type_vars = nesting.type_vars();

    let mut is_static = tokens[..at]
      .iter()
      .rev()
      .take_while(|t| !(t.is(";") || t.is("{") || t.is("}")))
      .any(|t| t.is("static"));

    let mut j = at + 1;
    loop {
      match tokens.get(j) {
        Some(t) if t.is("static") => {
          is_static = true;
          j += 1;
        }
        Some(t) if MODIFIERS.contains(&t.text) => j += 1,
        Some(t) if t.is("@") => match skip_annotation(tokens, j) {
          Some(next) => j = next,
          None => {
            self.warn(at, "unbalanced parentheses in annotation");
            return self.recover(at);
          }
        },
        _ => break,
      }
    }

    if tokens.get(j).is_some_and(|t| t.is("<")) {
      let Some((vars, close)) = nesting::type_params(tokens, j) else {
        self.warn(at, "unbalanced type parameters in native method header");
        return self.recover(at);
      };
      type_vars.extend(vars);
      j = close + 1;
    }

    let Some((mut return_type, after_type)) = parse_type(tokens, j) else {
      self.warn(at, "malformed return type in native method header");
      return self.recover(at);
    };
    j = after_type;

    let Some(name) = tokens.get(j).filter(|t| t.is_ident()).copied() else {
      self.warn(at, "missing method name in native method header");
      return self.recover(at);
    };
    j += 1;

    if !tokens.get(j).is_some_and(|t| t.is("(")) {
      self.warn(at, format!("expected `(` after native method `{}`", name.text));
      return self.recover(at);
    }
    let Some(close) = lex::matching(tokens, j) else {
      self.warn(at, format!("unbalanced parentheses in native method `{}`", name.text));
      return self.recover(at);
    };

    let mut params = Vec::new();
    for part in lex::split_top_level(&tokens[j + 1..close]) {
      match parse_param(part) {
        Ok(Some(ty)) => params.push(self.scope.resolve_java(&ty, &type_vars)),
        // Explicit receiver parameter
        Ok(None) => {}
        Err(reason) => {
          self.warn(at, format!("{} in native method `{}`", reason, name.text));
          return self.recover(close + 1);
        }
      }
    }
    j = close + 1;

    // Legacy `int f()[]` return dimensions
    while tokens.get(j).is_some_and(|t| t.is("[")) && tokens.get(j + 1).is_some_and(|t| t.is("]")) {
      return_type.dims += 1;
      j += 2;
    }

    if tokens.get(j).is_some_and(|t| t.is("throws")) {
      while tokens.get(j).is_some_and(|t| !(t.is(";") || t.is("{") || t.is("}"))) {
        j += 1;
      }
    }

    match tokens.get(j) {
      Some(t) if t.is(";") => {}
      Some(t) if t.is("{") => {
        self.warn(at, format!("native method `{}` declares a body", name.text));
        return j;
      }
      _ => {
        self.warn(at, format!("missing `;` after native method `{}`", name.text));
        return j.min(tokens.len());
      }
    }

    let mut owner = self.scope.package.clone();
    owner.push(owner_binary);
    let binding = DeclaredBinding {
      owner,
      method: name.text.to_string(),
      params,
      return_type: self.scope.resolve_java(&return_type, &type_vars),
      is_static,
      origin: Origin::new(self.path, self.lines.line(name.start)),
    };
    trace!(method = %binding.qualified_name(), "native method");
    self.out.declared.push(binding);
    j + 1
  }
}

/// Skip `@Name`, `@a.b.Name` or `@Name(...)` starting at `at`
pub(crate) fn skip_annotation(tokens: &[Token<'_>], at: usize) -> Option<usize> {
  let (name, mut next) = lex::dotted_name(tokens, at + 1);
  if name.is_empty() {
    return Some(at + 1);
  }
  if tokens.get(next).is_some_and(|t| t.is("(")) {
    next = lex::matching(tokens, next)? + 1;
  }
  Some(next)
}

/// Parse a type at `at`: annotations, dotted name, generic arguments and `[]` dimensions.
fn parse_type(tokens: &[Token<'_>], at: usize) -> Option<(JavaType, usize)> {
  let mut j = at;
  while tokens.get(j).is_some_and(|t| t.is("@")) {
    j = skip_annotation(tokens, j)?;
  }

  let mut name = Vec::new();
  loop {
    let (segments, next) = lex::dotted_name(tokens, j);
    if segments.is_empty() {
      break;
    }
    name.extend(segments);
    j = next;
    if tokens.get(j).is_some_and(|t| t.is("<")) {
      j = lex::matching(tokens, j)? + 1;
    }
    // `Outer<T>.Inner`
    if tokens.get(j).is_some_and(|t| t.is(".")) && tokens.get(j + 1).is_some_and(|t| t.is_ident()) {
      j += 1;
    } else {
      break;
    }
  }
  if name.is_empty() {
    return None;
  }

  let mut dims = 0;
  while tokens.get(j).is_some_and(|t| t.is("[")) && tokens.get(j + 1).is_some_and(|t| t.is("]")) {
    dims += 1;
    j += 2;
  }

  Some((JavaType { name, dims }, j))
}

/// One formal parameter; `Ok(None)` for an explicit `this` receiver
fn parse_param(tokens: &[Token<'_>]) -> Result<Option<JavaType>, &'static str> {
  let mut j = 0;
  loop {
    match tokens.get(j) {
      Some(t) if t.is("final") => j += 1,
      Some(t) if t.is("@") => j = skip_annotation(tokens, j).ok_or("unbalanced annotation")?,
      _ => break,
    }
  }

  let (mut ty, mut j) = parse_type(tokens, j).ok_or("malformed parameter type")?;

  if tokens.get(j).is_some_and(|t| t.is("."))
    && tokens.get(j + 1).is_some_and(|t| t.is("."))
    && tokens.get(j + 2).is_some_and(|t| t.is("."))
  {
    ty.dims += 1;
    j += 3;
  }

  let name = tokens.get(j).filter(|t| t.is_ident()).ok_or("missing parameter name")?;
  j += 1;
  if name.is("this") {
    return Ok(None);
  }

  // C-style `int values[]`
  while tokens.get(j).is_some_and(|t| t.is("[")) && tokens.get(j + 1).is_some_and(|t| t.is("]")) {
    ty.dims += 1;
    j += 2;
  }

  if j != tokens.len() {
    return Err("malformed parameter list");
  }
  Ok(Some(ty))
}
