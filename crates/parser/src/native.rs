//! Extraction of bridge functions from C and C++ sources and headers.

use std::path::Path;

use jnicheck_core::{ImplementedBinding, Mangler, Origin, ParseWarning};
use tracing::trace;

use crate::FileExtraction;
use crate::lex::{self, Token};
use crate::scrub::LineIndex;

/// What a `{` opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
  /// `extern "C" { }` and `namespace x { }` keep declaration scope
  Linkage,
  /// Function bodies, class bodies, initializers
  Other,
}

pub(crate) fn extract(path: &Path, text: &str, mangler: &Mangler, out: &mut FileExtraction) {
  let tokens = lex::tokenize(text);
  let lines = LineIndex::new(text);

  let mut blocks: Vec<Block> = Vec::new();
  // First token of the current declaration
  let mut header_start = 0;
  let mut i = 0;

  while i < tokens.len() {
    let token = tokens[i];
    let at_declaration_scope = blocks.iter().all(|b| *b == Block::Linkage);

    match token.text {
      "#" if starts_line(text, token.start) => {
        let end = directive_end(text, token.start);
        while i < tokens.len() && tokens[i].start < end {
          i += 1;
        }
        header_start = i;
        continue;
      }
      "{" => {
        blocks.push(block_kind(&tokens[header_start..i]));
        header_start = i + 1;
      }
      "}" => {
        blocks.pop();
        header_start = i + 1;
      }
      ";" => header_start = i + 1,
      _ if at_declaration_scope
        && token.is_ident()
        && mangler.is_bridge_symbol(token.text)
        && tokens.get(i + 1).is_some_and(|t| t.is("(")) =>
      {
        if let Some(next) = bridge_function(path, &tokens, &lines, mangler, header_start, i, out) {
          i = next;
          continue;
        }
      }
      _ => {}
    }
    i += 1;
  }
}

fn block_kind(header: &[Token<'_>]) -> Block {
  match header {
    [.., extern_kw, literal] if extern_kw.is("extern") && literal.kind == lex::TokenKind::Literal => Block::Linkage,
    _ if header.iter().any(|t| t.is("namespace")) && !header.iter().any(|t| t.is("(") || t.is("=")) => Block::Linkage,
    _ => Block::Other,
  }
}

fn starts_line(text: &str, offset: usize) -> bool {
  text[..offset]
    .bytes()
    .rev()
    .take_while(|&b| b != b'\n')
    .all(|b| b == b' ' || b == b'\t' || b == b'\r')
}

/// Offset just past a preprocessor directive, following `\` line continuations
fn directive_end(text: &str, start: usize) -> usize {
  let bytes = text.as_bytes();
  let mut pos = start;
  while pos < bytes.len() {
    if bytes[pos] == b'\n' {
      let mut back = pos;
      if back > 0 && bytes[back - 1] == b'\r' {
        back -= 1;
      }
      if back == 0 || bytes[back - 1] != b'\\' {
        return pos;
      }
    }
    pos += 1;
  }
  bytes.len()
}

/// Handle a prefixed identifier followed by `(`. Returns the index of the terminating `{` or
/// `;` when the identifier turned out to be a declaration or definition.
fn bridge_function(
  path: &Path,
  tokens: &[Token<'_>],
  lines: &LineIndex,
  mangler: &Mangler,
  header_start: usize,
  at: usize,
  out: &mut FileExtraction,
) -> Option<usize> {
  // A call inside an initializer, not a declaration
  if tokens[header_start.min(at)..at].iter().any(|t| t.is("=")) {
    return None;
  }
  let close = lex::matching(tokens, at + 1)?;

  // Trailing qualifiers such as `noexcept` or `__attribute__((...))`
  let mut j = close + 1;
  let is_definition = loop {
    match tokens.get(j) {
      Some(t) if t.is("{") => break true,
      Some(t) if t.is(";") => break false,
      Some(t) if t.is("(") => j = lex::matching(tokens, j)? + 1,
      Some(t) if t.is_ident() => j += 1,
      _ => return None,
    }
  };

  let symbol = tokens[at].text;
  let line = lines.line(tokens[at].start);
  let exported = tokens[header_start.min(at)..at].iter().any(|t| t.is("JNIEXPORT"));

  match mangler.demangle(symbol) {
    Ok(decoded) => {
      trace!(symbol, is_definition, "bridge function");
      out.implemented.push(ImplementedBinding {
        symbol: symbol.to_string(),
        decoded_owner: decoded.owner,
        decoded_method: decoded.method,
        overload_suffix: decoded.discriminant,
        is_definition,
        exported,
        origin: Origin::new(path, line),
      });
    }
    Err(e) => out.warnings.push(ParseWarning::new(
      path,
      Some(line),
      format!("cannot decode bridge symbol `{symbol}`: {e}"),
    )),
  }

  // Resume at the `{` or `;` so block and header tracking see it
  Some(j)
}
