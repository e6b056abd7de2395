//! Extraction of `external fun` declarations from Kotlin sources.

use std::collections::HashMap;
use std::path::Path;

use jnicheck_core::{DeclaredBinding, Origin, ParseWarning, TypeTag};
use tracing::trace;

use crate::FileExtraction;
use crate::java::skip_annotation;
use crate::lex::{self, Token};
use crate::nesting::{self, FrameKind, Nesting};
use crate::scrub::LineIndex;
use crate::types::{KotlinType, TypeScope, TypeVar, binary_segments};

const MODIFIERS: &[&str] = &[
  "public",
  "private",
  "protected",
  "internal",
  "open",
  "final",
  "abstract",
  "override",
  "suspend",
  "inline",
  "tailrec",
  "operator",
  "infix",
  "external",
  "actual",
  "expect",
];

const PARAM_MODIFIERS: &[&str] = &["vararg", "noinline", "crossinline"];

pub(crate) fn extract(path: &Path, original: &str, scrubbed: &str, out: &mut FileExtraction) {
  let tokens = lex::tokenize(scrubbed);
  let (scope, facade) = file_scope(path, original, &tokens);
  let mut extractor = KotlinExtractor {
    path,
    original,
    tokens: &tokens,
    lines: LineIndex::new(scrubbed),
    scope,
    facade,
    out,
  };
  extractor.run();
}

/// Class holding top-level functions: `foo_bar.kt` compiles to `Foo_barKt`
fn facade_name(path: &Path) -> String {
  let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Main");
  let mut name: String = stem
    .chars()
    .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
    .collect();
  if let Some(first) = name.chars().next() {
    let upper: String = first.to_uppercase().collect();
    name.replace_range(..first.len_utf8(), &upper);
  }
  name.push_str("Kt");
  name
}

fn file_scope(path: &Path, original: &str, tokens: &[Token<'_>]) -> (TypeScope, String) {
  let mut package = Vec::new();
  let mut imports = HashMap::new();
  let mut facade = facade_name(path);

  let mut i = 0;
  while i < tokens.len() {
    match tokens[i].text {
      // @file:JvmName("Name")
      "@" if tokens.get(i + 1).is_some_and(|t| t.is("file"))
        && tokens.get(i + 2).is_some_and(|t| t.is(":"))
        && tokens.get(i + 3).is_some_and(|t| t.is("JvmName")) =>
      {
        if let Some(name) = string_argument(tokens, original, i + 3) {
          facade = name;
        }
        i += 4;
      }
      "package" if package.is_empty() => {
        let (name, next) = lex::dotted_name(tokens, i + 1);
        package = name;
        i = next;
      }
      "import" => {
        let (name, mut next) = lex::dotted_name(tokens, i + 1);
        let alias = if tokens.get(next).is_some_and(|t| t.is("as")) {
          next += 2;
          tokens.get(next - 1).map(|t| t.text.to_string())
        } else {
          None
        };
        if !tokens.get(next).is_some_and(|t| t.is("."))
          && let Some(simple) = alias.or_else(|| name.last().cloned())
        {
          imports.insert(simple, binary_segments(&name));
        }
        i = next;
      }
      "class" | "interface" | "object" | "fun" | "val" | "var" | "typealias" => break,
      _ => i += 1,
    }
  }

  let mut nesting = Nesting::kotlin();
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

  (
    TypeScope {
      package,
      imports,
      local_types,
    },
    facade,
  )
}

/// The string literal in `Name("...")`, where `name` indexes the annotation name token
fn string_argument(tokens: &[Token<'_>], original: &str, name: usize) -> Option<String> {
  if !tokens.get(name + 1)?.is("(") {
    return None;
  }
  let literal = tokens.get(name + 2)?;
  if literal.text.len() < 2 || !literal.text.starts_with('"') {
    return None;
  }
  original
    .get(literal.start + 1..literal.end() - 1)
    .map(str::to_string)
}

/// Name tokens of the annotations directly preceding the modifier run that ends at `at`
fn annotations_before(tokens: &[Token<'_>], at: usize) -> Vec<usize> {
  let mut names = Vec::new();
  let mut k = at;
  while k > 0 {
    let token = tokens[k - 1];
    if token.is_ident() && MODIFIERS.contains(&token.text) {
      k -= 1;
      continue;
    }

    // Step over annotation arguments
    let mut name_end = k;
    if token.is(")") {
      let mut depth = 0usize;
      let mut open = None;
      for p in (0..k).rev() {
        if tokens[p].is(")") {
          depth += 1;
        } else if tokens[p].is("(") {
          depth -= 1;
          if depth == 0 {
            open = Some(p);
            break;
          }
        }
      }
      match open {
        Some(p) => name_end = p,
        None => break,
      }
    }

    // `@a.b.Name`
    let mut p = name_end;
    while p > 0 && tokens[p - 1].is_ident() {
      p -= 1;
      if p > 0 && tokens[p - 1].is(".") {
        p -= 1;
      } else {
        break;
      }
    }
    if p == name_end || p == 0 || !tokens[p - 1].is("@") {
      break;
    }
    names.push(name_end - 1);
    k = p - 1;
  }
  names
}

/// Parse a Kotlin type at `at`; returns it and the index after it.
fn parse_type(tokens: &[Token<'_>], at: usize) -> Option<(KotlinType, usize)> {
  let mut j = at;
  loop {
    match tokens.get(j) {
      Some(t) if t.is("@") => j = skip_annotation(tokens, j)?,
      Some(t) if t.is("suspend") => j += 1,
      _ => break,
    }
  }

  let (mut ty, mut j) = if tokens.get(j)?.is("(") {
    let close = lex::matching(tokens, j)?;
    let arrow = tokens.get(close + 1).is_some_and(|t| t.is("-")) && tokens.get(close + 2).is_some_and(|t| t.is(">"));
    if arrow {
      let arity = lex::split_top_level(&tokens[j + 1..close]).len();
      let (_, after) = parse_type(tokens, close + 3)?;
      let ty = KotlinType {
        function_arity: Some(arity),
        ..KotlinType::named("Function")
      };
      (ty, after)
    } else {
      let (inner, after) = parse_type(tokens, j + 1)?;
      if !tokens.get(after).is_some_and(|t| t.is(")")) {
        return None;
      }
      (inner, after + 1)
    }
  } else {
    let (name, mut next) = lex::dotted_name(tokens, j);
    if name.is_empty() {
      return None;
    }
    let mut args = Vec::new();
    if tokens.get(next).is_some_and(|t| t.is("<")) {
      let close = lex::matching(tokens, next)?;
      for part in lex::split_top_level(&tokens[next + 1..close]) {
        let part = match part.first() {
          Some(t) if t.is("in") || t.is("out") => &part[1..],
          _ => part,
        };
        if part.first().is_some_and(|t| t.is("*")) {
          args.push(KotlinType::star());
        } else {
          args.push(parse_type(part, 0)?.0);
        }
      }
      next = close + 1;
    }
    (
      KotlinType {
        name,
        args,
        nullable: false,
        function_arity: None,
      },
      next,
    )
  };

  while tokens.get(j).is_some_and(|t| t.is("?")) {
    ty.nullable = true;
    j += 1;
  }
  Some((ty, j))
}

struct Param {
  ty: KotlinType,
  vararg: bool,
}

fn parse_param(tokens: &[Token<'_>]) -> Result<Param, &'static str> {
  let mut j = 0;
  let mut vararg = false;
  loop {
    match tokens.get(j) {
      Some(t) if t.is("@") => j = skip_annotation(tokens, j).ok_or("unbalanced annotation")?,
      Some(t) if PARAM_MODIFIERS.contains(&t.text) => {
        vararg |= t.is("vararg");
        j += 1;
      }
      _ => break,
    }
  }

  if !tokens.get(j).is_some_and(|t| t.is_ident()) || !tokens.get(j + 1).is_some_and(|t| t.is(":")) {
    return Err("malformed parameter");
  }
  let (ty, after) = parse_type(tokens, j + 2).ok_or("malformed parameter type")?;
  if after != tokens.len() && !tokens[after].is("=") {
    return Err("malformed parameter list");
  }
  Ok(Param { ty, vararg })
}

struct KotlinExtractor<'t, 'a, 'o> {
  path: &'t Path,
  /// Unscrubbed text, for reading annotation string arguments
  original: &'t str,
  tokens: &'t [Token<'a>],
  lines: LineIndex,
  scope: TypeScope,
  facade: String,
  out: &'o mut FileExtraction,
}

impl KotlinExtractor<'_, '_, '_> {
  fn run(&mut self) {
    let mut nesting = Nesting::kotlin();
    let mut i = 0;
    while i < self.tokens.len() {
      if self.tokens[i].is("external") {
        i = self.external_fun(&mut nesting, i);
      } else {
        i = nesting.advance(self.tokens, i);
      }
    }
  }

  fn warn(&mut self, at: usize, reason: impl Into<String>) {
    let line = self.lines.line(self.tokens[at].start);
    self.out.warnings.push(ParseWarning::new(self.path, Some(line), reason));
  }

  fn resolve_param(&self, param: &Param, type_vars: &[TypeVar]) -> TypeTag {
    if !param.vararg {
      return self.scope.resolve_kotlin(&param.ty, type_vars);
    }
    // `vararg x: Int` is an `IntArray`, `vararg x: T` an `Array<out T>`
    match self.scope.resolve_kotlin(&param.ty, type_vars) {
      tag @ TypeTag::Primitive(_) => tag.array_of(),
      _ => self
        .scope
        .resolve_kotlin(
          &KotlinType {
            args: vec![param.ty.clone()],
            ..KotlinType::named("Array")
          },
          type_vars,
        ),
    }
  }

  /// Parse the function following the `external` modifier at `at`; returns where to resume.
  fn external_fun(&mut self, nesting: &mut Nesting, at: usize) -> usize {
    let tokens = self.tokens;

    let mut annotations = annotations_before(tokens, at);
    let mut j = at + 1;
    loop {
      match tokens.get(j) {
        Some(t) if t.is("@") => {
          let (name, after_name) = lex::dotted_name(tokens, j + 1);
          if !name.is_empty() {
            annotations.push(after_name - 1);
          }
          j = skip_annotation(tokens, j).unwrap_or(j + 1);
        }
        Some(t) if MODIFIERS.contains(&t.text) => j += 1,
        _ => break,
      }
    }
    if !tokens.get(j).is_some_and(|t| t.is("fun")) {
      // `external` on anything else is not a bridge declaration
      return at + 1;
    }
    // A class header still pending here had no body
    nesting.discard_pending();
    j += 1;
    let jvm_static = annotations.iter().any(|&k| tokens[k].is("JvmStatic"));
    let jvm_name = annotations
      .iter()
      .find(|&&k| tokens[k].is("JvmName"))
      .and_then(|&k| string_argument(tokens, self.original, k));

    let (owner_binary, is_static) = if nesting.depth() == 0 {
      (self.facade.clone(), true)
    } else if nesting.at_member_level() {
      match nesting.current() {
        Some(frame) if frame.kind == FrameKind::Companion && jvm_static => match nesting.outer() {
          Some(outer) => (outer.binary.clone(), true),
          None => (frame.binary.clone(), false),
        },
        Some(frame) if frame.kind == FrameKind::Object => (frame.binary.clone(), jvm_static),
        Some(frame) => (frame.binary.clone(), false),
        None => (self.facade.clone(), true),
      }
    } else {
      self.warn(at, "external function in a local scope or anonymous object is not supported");
      return j;
    };

    let mut type_vars = nesting.type_vars();
    if tokens.get(j).is_some_and(|t| t.is("<")) {
      let Some((vars, close)) = nesting::type_params(tokens, j) else {
        self.warn(at, "unbalanced type parameters in external function");
        return j;
      };
      type_vars.extend(vars);
      j = close + 1;
    }

    // Optional receiver type, then the name
    let Some(open) = (j..tokens.len()).find(|&k| tokens[k].is("(") && tokens[k - 1].is_ident()) else {
      self.warn(at, "missing parameter list in external function");
      return j;
    };
    let name = tokens[open - 1];
    let receiver = if open - 1 > j {
      if !tokens[open - 2].is(".") {
        self.warn(at, format!("malformed external function header `{}`", name.text));
        return open;
      }
      match parse_type(&tokens[j..open - 2], 0) {
        Some((ty, end)) if end == open - 2 - j => Some(ty),
        _ => {
          self.warn(at, format!("malformed receiver type on `{}`", name.text));
          return open;
        }
      }
    } else {
      None
    };

    let Some(close) = lex::matching(tokens, open) else {
      self.warn(at, format!("unbalanced parentheses in external function `{}`", name.text));
      return open + 1;
    };

    let mut params: Vec<TypeTag> = receiver
      .iter()
      .map(|ty| self.scope.resolve_kotlin(ty, &type_vars))
      .collect();
    for part in lex::split_top_level(&tokens[open + 1..close]) {
      match parse_param(part) {
        Ok(param) => params.push(self.resolve_param(&param, &type_vars)),
        Err(reason) => {
          self.warn(at, format!("{} in external function `{}`", reason, name.text));
          return close + 1;
        }
      }
    }
    j = close + 1;

    let return_type = if tokens.get(j).is_some_and(|t| t.is(":")) {
      match parse_type(tokens, j + 1) {
        Some((ty, after)) => {
          j = after;
          self.scope.resolve_kotlin_return(&ty, &type_vars)
        }
        None => {
          self.warn(at, format!("malformed return type on `{}`", name.text));
          return j + 1;
        }
      }
    } else {
      self.scope.resolve_kotlin_return(&KotlinType::named("Unit"), &type_vars)
    };

    if tokens.get(j).is_some_and(|t| t.is("{") || t.is("=")) {
      self.warn(at, format!("external function `{}` declares a body", name.text));
      return j;
    }

    let mut owner = self.scope.package.clone();
    owner.push(owner_binary);
    let binding = DeclaredBinding {
      owner,
      method: jvm_name.unwrap_or_else(|| name.text.to_string()),
      params,
      return_type,
      is_static,
      origin: Origin::new(self.path, self.lines.line(name.start)),
    };
    trace!(method = %binding.qualified_name(), "external function");
    self.out.declared.push(binding);
    j
  }
}
