//! Lexical scrubber: blanks comments and literal bodies so extractors only see code.
//!
//! The output has the same byte length and the same line structure as the input, so any
//! offset found in scrubbed text points at the same place in the original.

use std::fmt;

use jnicheck_core::Language;

/// What kind of span was left open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
  BlockComment,
  String,
  TextBlock,
  RawString,
  CharLiteral,
}

impl SpanKind {
  fn describe(self) -> &'static str {
    match self {
      SpanKind::BlockComment => "block comment",
      SpanKind::String => "string literal",
      SpanKind::TextBlock => "text block",
      SpanKind::RawString => "raw string literal",
      SpanKind::CharLiteral => "character literal",
    }
  }
}

/// An unterminated span; everything from its start to end of file was blanked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unterminated {
  /// 1-based line where the span began
  pub line: u32,
  pub kind: SpanKind,
}

impl fmt::Display for Unterminated {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "unterminated {} starting at line {}; rest of file ignored",
      self.kind.describe(),
      self.line
    )
  }
}

#[derive(Debug, Clone)]
pub struct Scrubbed {
  pub text: String,
  pub unterminated: Option<Unterminated>,
}

/// Blank comment and literal bodies in `text`.
pub fn scrub(text: &str, language: Language) -> Scrubbed {
  Scrubber::new(text.as_bytes(), language).run()
}

/// Byte offset to 1-based line lookup
#[derive(Debug, Clone)]
pub struct LineIndex {
  starts: Vec<usize>,
}

impl LineIndex {
  pub fn new(text: &str) -> Self {
    let mut starts = vec![0];
    starts.extend(text.bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| i + 1));
    Self { starts }
  }

  pub fn line(&self, offset: usize) -> u32 {
    self.starts.partition_point(|&start| start <= offset) as u32
  }
}

struct Open {
  start: usize,
  kind: SpanKind,
}

struct Scrubber<'a> {
  src: &'a [u8],
  out: Vec<u8>,
  pos: usize,
  language: Language,
}

impl<'a> Scrubber<'a> {
  fn new(src: &'a [u8], language: Language) -> Self {
    Self {
      src,
      out: src.to_vec(),
      pos: 0,
      language,
    }
  }

  fn run(mut self) -> Scrubbed {
    let unterminated = match self.code(false) {
      Ok(_) => None,
      Err(open) => {
        self.blank(open.start, self.src.len());
        Some(Unterminated {
          line: self.src[..open.start].iter().filter(|&&b| b == b'\n').count() as u32 + 1,
          kind: open.kind,
        })
      }
    };

    // Spans are only ever blanked between ASCII delimiters, so the buffer stays valid UTF-8
    let text = String::from_utf8(self.out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    Scrubbed { text, unterminated }
  }

  fn peek(&self, ahead: usize) -> Option<u8> {
    self.src.get(self.pos + ahead).copied()
  }

  fn starts_with(&self, pattern: &[u8]) -> bool {
    self.src.get(self.pos..).is_some_and(|rest| rest.starts_with(pattern))
  }

  fn blank(&mut self, from: usize, to: usize) {
    for b in &mut self.out[from..to] {
      if *b != b'\n' && *b != b'\r' {
        *b = b' ';
      }
    }
  }

  fn is_native(&self) -> bool {
    matches!(self.language, Language::C | Language::Cpp)
  }

  /// Scan code until end of input, or until the `}` closing a string template when `nested`.
  /// Returns whether the closing brace was found.
  fn code(&mut self, nested: bool) -> Result<bool, Open> {
    let mut depth = 0usize;
    while let Some(b) = self.peek(0) {
      match b {
        b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
        b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
        b'"' => self.string()?,
        b'#' if self.is_native() && self.at_line_start() => self.directive(),
        b'\'' if self.is_digit_separator() => self.pos += 1,
        b'\'' => self.char_literal()?,
        b'{' if nested => {
          depth += 1;
          self.pos += 1;
        }
        b'}' if nested => {
          self.pos += 1;
          if depth == 0 {
            return Ok(true);
          }
          depth -= 1;
        }
        _ => self.pos += 1,
      }
    }
    Ok(false)
  }

  fn line_comment(&mut self) {
    let start = self.pos;
    while let Some(b) = self.peek(0) {
      if b == b'\n' && !(self.is_native() && self.continues_line()) {
        break;
      }
      self.pos += 1;
    }
    self.blank(start, self.pos);
  }

  fn at_line_start(&self) -> bool {
    self.src[..self.pos]
      .iter()
      .rev()
      .take_while(|&&b| b != b'\n')
      .all(|&b| b == b' ' || b == b'\t')
  }

  /// `#error` and `#warning` carry free text in which an apostrophe opens nothing
  fn directive(&mut self) {
    self.pos += 1;
    while matches!(self.peek(0), Some(b' ' | b'\t')) {
      self.pos += 1;
    }
    let word_start = self.pos;
    while self.peek(0).is_some_and(is_word_byte) {
      self.pos += 1;
    }
    if matches!(&self.src[word_start..self.pos], b"error" | b"warning") {
      self.line_comment();
    }
  }

  /// Whether the newline at `pos` is escaped by a trailing backslash
  fn continues_line(&self) -> bool {
    let mut i = self.pos;
    if i > 0 && self.src[i - 1] == b'\r' {
      i -= 1;
    }
    i > 0 && self.src[i - 1] == b'\\'
  }

  fn block_comment(&mut self) -> Result<(), Open> {
    let start = self.pos;
    let nests = self.language == Language::Kotlin;
    let mut depth = 0usize;
    loop {
      if self.starts_with(b"/*") {
        if depth == 0 || nests {
          depth += 1;
        }
        self.pos += 2;
      } else if self.starts_with(b"*/") {
        self.pos += 2;
        depth -= 1;
        if depth == 0 {
          break;
        }
      } else if self.peek(0).is_some() {
        self.pos += 1;
      } else {
        return Err(Open {
          start,
          kind: SpanKind::BlockComment,
        });
      }
    }
    self.blank(start, self.pos);
    Ok(())
  }

  fn string(&mut self) -> Result<(), Open> {
    let start = self.pos;
    match self.language {
      Language::Java if self.starts_with(b"\"\"\"") => self.text_block(start),
      Language::Kotlin if self.starts_with(b"\"\"\"") => self.kotlin_raw_string(start),
      Language::Kotlin => self.quoted(start, b'"', SpanKind::String, true),
      Language::C | Language::Cpp if self.raw_string_prefix() => self.cpp_raw_string(start),
      _ => self.quoted(start, b'"', SpanKind::String, false),
    }
  }

  /// Ordinary escaped literal that may not span lines
  fn quoted(&mut self, start: usize, quote: u8, kind: SpanKind, templates: bool) -> Result<(), Open> {
    self.pos += 1;
    loop {
      match self.peek(0) {
        None | Some(b'\n') => return Err(Open { start, kind }),
        Some(b'\\') => self.pos += 2,
        Some(b'$') if templates && self.peek(1) == Some(b'{') => {
          self.pos += 2;
          if !self.code(true)? {
            return Err(Open { start, kind });
          }
        }
        Some(b) if b == quote => {
          self.pos += 1;
          break;
        }
        Some(_) => self.pos += 1,
      }
    }
    self.blank(start + 1, self.pos - 1);
    Ok(())
  }

  fn text_block(&mut self, start: usize) -> Result<(), Open> {
    self.pos += 3;
    loop {
      if self.starts_with(b"\"\"\"") {
        self.pos += 3;
        break;
      }
      match self.peek(0) {
        None => {
          return Err(Open {
            start,
            kind: SpanKind::TextBlock,
          });
        }
        Some(b'\\') => self.pos += 2,
        Some(_) => self.pos += 1,
      }
    }
    self.blank(start + 1, self.pos - 1);
    Ok(())
  }

  fn kotlin_raw_string(&mut self, start: usize) -> Result<(), Open> {
    self.pos += 3;
    loop {
      if self.starts_with(b"\"\"\"") {
        // A raw string closes on the last quote of a run of three or more
        while self.peek(0) == Some(b'"') {
          self.pos += 1;
        }
        break;
      }
      match self.peek(0) {
        None => {
          return Err(Open {
            start,
            kind: SpanKind::RawString,
          });
        }
        Some(b'$') if self.peek(1) == Some(b'{') => {
          self.pos += 2;
          if !self.code(true)? {
            return Err(Open {
              start,
              kind: SpanKind::RawString,
            });
          }
        }
        Some(_) => self.pos += 1,
      }
    }
    self.blank(start + 1, self.pos - 1);
    Ok(())
  }

  /// `R"`, `LR"`, `uR"`, `UR"` or `u8R"` directly before the quote
  fn raw_string_prefix(&self) -> bool {
    if self.language != Language::Cpp {
      return false;
    }
    let word_start = self.src[..self.pos]
      .iter()
      .rposition(|&b| !is_word_byte(b))
      .map_or(0, |i| i + 1);
    matches!(&self.src[word_start..self.pos], b"R" | b"LR" | b"uR" | b"UR" | b"u8R")
  }

  fn cpp_raw_string(&mut self, start: usize) -> Result<(), Open> {
    let open = Open {
      start,
      kind: SpanKind::RawString,
    };
    let delim_start = self.pos + 1;
    let Some(paren) = self.src[delim_start..]
      .iter()
      .take(17)
      .position(|&b| b == b'(')
      .map(|i| delim_start + i)
    else {
      return Err(open);
    };
    let delim = &self.src[delim_start..paren];
    if delim.iter().any(|b| matches!(b, b' ' | b')' | b'\\' | b'\t' | b'\n' | b'\r')) {
      return Err(open);
    }

    let mut closing = Vec::with_capacity(delim.len() + 2);
    closing.push(b')');
    closing.extend_from_slice(delim);
    closing.push(b'"');

    let body_start = paren + 1;
    let Some(end) = self.src[body_start..]
      .windows(closing.len())
      .position(|w| w == closing.as_slice())
      .map(|i| body_start + i + closing.len())
    else {
      return Err(open);
    };
    self.pos = end;
    self.blank(start + 1, end - 1);
    Ok(())
  }

  /// C++14 digit separator, as in `1'000'000`
  fn is_digit_separator(&self) -> bool {
    if self.language != Language::Cpp || self.pos == 0 {
      return false;
    }
    let word_start = self.src[..self.pos]
      .iter()
      .rposition(|&b| !(is_word_byte(b) || b == b'\'' || b == b'.'))
      .map_or(0, |i| i + 1);
    word_start < self.pos && self.src[word_start].is_ascii_digit()
  }

  fn char_literal(&mut self) -> Result<(), Open> {
    let start = self.pos;
    self.quoted(start, b'\'', SpanKind::CharLiteral, false)
  }
}

fn is_word_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_'
}
