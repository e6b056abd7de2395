//! Minimal tokenizer over scrubbed text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Ident,
  Number,
  /// A blanked string or char literal, quotes included
  Literal,
  Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
  pub kind: TokenKind,
  pub text: &'a str,
  /// Byte offset into the scrubbed (and original) text
  pub start: usize,
}

impl Token<'_> {
  pub fn is(&self, text: &str) -> bool {
    self.text == text
  }

  pub fn is_ident(&self) -> bool {
    self.kind == TokenKind::Ident
  }

  pub fn end(&self) -> usize {
    self.start + self.text.len()
  }
}

fn is_ident_start(c: char) -> bool {
  c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
  c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split scrubbed text into identifiers, numbers, literals and single-char punctuation.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
  let mut tokens = Vec::new();
  let mut chars = text.char_indices().peekable();

  while let Some((start, c)) = chars.next() {
    if c.is_whitespace() {
      continue;
    }

    let (kind, end) = if is_ident_start(c) {
      let mut end = start + c.len_utf8();
      while let Some(&(i, next)) = chars.peek() {
        if !is_ident_continue(next) {
          break;
        }
        end = i + next.len_utf8();
        chars.next();
      }
      (TokenKind::Ident, end)
    } else if c.is_ascii_digit() {
      let mut end = start + 1;
      while let Some(&(i, next)) = chars.peek() {
        if !(next.is_ascii_alphanumeric() || matches!(next, '_' | '.' | '\'')) {
          break;
        }
        end = i + next.len_utf8();
        chars.next();
      }
      (TokenKind::Number, end)
    } else if c == '"' || c == '\'' {
      // Literal bodies are blank; the next matching quote closes it
      let mut end = text.len();
      for (i, next) in chars.by_ref() {
        if next == c {
          end = i + 1;
          break;
        }
      }
      (TokenKind::Literal, end)
    } else {
      (TokenKind::Punct, start + c.len_utf8())
    };

    tokens.push(Token {
      kind,
      text: &text[start..end],
      start,
    });
  }

  tokens
}

/// Index of the token closing the group opened at `open`, tracking only that bracket pair.
pub fn matching(tokens: &[Token<'_>], open: usize) -> Option<usize> {
  let (open_text, close_text) = match tokens.get(open)?.text {
    "(" => ("(", ")"),
    "[" => ("[", "]"),
    "{" => ("{", "}"),
    "<" => ("<", ">"),
    _ => return None,
  };

  let mut depth = 0usize;
  for (i, token) in tokens.iter().enumerate().skip(open) {
    if is_arrow_head(tokens, i) {
      continue;
    }
    if token.is(open_text) {
      depth += 1;
    } else if token.is(close_text) {
      depth -= 1;
      if depth == 0 {
        return Some(i);
      }
    }
  }
  None
}

/// The `>` of a `->` arrow
fn is_arrow_head(tokens: &[Token<'_>], i: usize) -> bool {
  i > 0 && tokens[i].is(">") && tokens[i - 1].is("-") && tokens[i - 1].end() == tokens[i].start
}

/// Split `tokens` at commas not nested inside `()`, `[]`, `{}` or `<>`.
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
  let mut parts = Vec::new();
  let mut depth = 0i32;
  let mut start = 0;
  for (i, token) in tokens.iter().enumerate() {
    match token.text {
      ">" if is_arrow_head(tokens, i) => {}
      "(" | "[" | "{" | "<" => depth += 1,
      ")" | "]" | "}" | ">" => depth -= 1,
      "," if depth == 0 => {
        parts.push(&tokens[start..i]);
        start = i + 1;
      }
      _ => {}
    }
  }
  if start < tokens.len() {
    parts.push(&tokens[start..]);
  }
  parts
}

/// Collect a dotted name (`a.b.C`) starting at `at`; returns the segments and the index after it.
pub fn dotted_name(tokens: &[Token<'_>], at: usize) -> (Vec<String>, usize) {
  let mut segments = Vec::new();
  let mut i = at;
  while let Some(token) = tokens.get(i) {
    if !token.is_ident() {
      break;
    }
    segments.push(token.text.to_string());
    i += 1;
    if tokens.get(i).is_some_and(|t| t.is(".")) && tokens.get(i + 1).is_some_and(|t| t.is_ident()) {
      i += 1;
    } else {
      break;
    }
  }
  (segments, i)
}
