//! Tracks the stack of enclosing type declarations while walking managed-language tokens.

use crate::lex::{self, Token};
use crate::types::TypeVar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
  Class,
  /// Kotlin `object` declaration
  Object,
  /// Kotlin `companion object`
  Companion,
}

#[derive(Debug, Clone)]
pub struct TypeFrame {
  pub simple: String,
  /// Binary class name without package, e.g. `Outer$Inner`
  pub binary: String,
  pub kind: FrameKind,
  /// Brace depth of the type body
  pub body_depth: usize,
  /// Declared inside a method body, an initializer or an anonymous class
  pub local: bool,
  pub type_vars: Vec<TypeVar>,
  paren_depth: usize,
}

/// Keywords that start a new Kotlin declaration, ending a pending class header
const KOTLIN_DECLARATION_STARTS: &[&str] = &["fun", "val", "var", "typealias", "init", "class", "interface", "object"];

pub struct Nesting {
  kotlin: bool,
  stack: Vec<TypeFrame>,
  pending: Option<TypeFrame>,
  depth: usize,
  parens: usize,
  /// Every named, non-local type seen so far, in declaration order
  pub declared: Vec<TypeFrame>,
}

impl Nesting {
  pub fn java() -> Self {
    Self::new(false)
  }

  pub fn kotlin() -> Self {
    Self::new(true)
  }

  fn new(kotlin: bool) -> Self {
    Self {
      kotlin,
      stack: Vec::new(),
      pending: None,
      depth: 0,
      parens: 0,
      declared: Vec::new(),
    }
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Innermost enclosing type
  pub fn current(&self) -> Option<&TypeFrame> {
    self.stack.last()
  }

  /// The type enclosing the innermost one
  pub fn outer(&self) -> Option<&TypeFrame> {
    self.stack.len().checked_sub(2).and_then(|i| self.stack.get(i))
  }

  /// Whether the current position is directly inside a (non-local) type body
  pub fn at_member_level(&self) -> bool {
    self
      .current()
      .is_some_and(|frame| !frame.local && frame.body_depth == self.depth)
  }

  /// Type variables of every enclosing type
  pub fn type_vars(&self) -> Vec<TypeVar> {
    self.stack.iter().flat_map(|f| f.type_vars.iter().cloned()).collect()
  }

  /// Forget a class header that turned out to have no body
  pub fn discard_pending(&mut self) {
    self.pending = None;
  }

  /// Process the structural meaning of token `i` and return the next index to visit.
  pub fn advance(&mut self, tokens: &[Token<'_>], i: usize) -> usize {
    match tokens[i].text {
      "{" => {
        self.depth += 1;
        if let Some(mut frame) = self.pending.take() {
          frame.body_depth = self.depth;
          if !frame.local {
            self.declared.push(frame.clone());
          }
          self.stack.push(frame);
        }
      }
      "}" => {
        if self.current().is_some_and(|frame| frame.body_depth == self.depth) {
          self.stack.pop();
        }
        self.depth = self.depth.saturating_sub(1);
        self.pending = None;
      }
      "(" => self.parens += 1,
      ")" => self.parens = self.parens.saturating_sub(1),
      text => {
        if let Some((frame, next)) = self.declaration_at(tokens, i) {
          self.pending = Some(frame);
          return next;
        }
        if self.kotlin
          && KOTLIN_DECLARATION_STARTS.contains(&text)
          && self.pending.as_ref().is_some_and(|p| p.paren_depth == self.parens)
        {
          self.pending = None;
        }
      }
    }
    i + 1
  }

  fn declaration_at(&self, tokens: &[Token<'_>], i: usize) -> Option<(TypeFrame, usize)> {
    let token = tokens[i];
    let prev = i.checked_sub(1).map(|p| tokens[p]);
    let next = tokens.get(i + 1);

    // `Foo.class` and `Foo::class` are expressions
    if prev.is_some_and(|p| p.is(".") || (p.is(":") && i >= 2 && tokens[i - 2].is(":"))) {
      return None;
    }

    let (simple, kind, anonymous, after_name) = match token.text {
      "class" | "interface" | "enum" if !self.kotlin => (next?.text, FrameKind::Class, false, i + 2),
      "record" if !self.kotlin => {
        let after = tokens.get(i + 2)?;
        if !(after.is("(") || after.is("<")) {
          return None;
        }
        (next?.text, FrameKind::Class, false, i + 2)
      }
      "class" | "interface" if self.kotlin => (next?.text, FrameKind::Class, false, i + 2),
      "object" if self.kotlin && prev.is_some_and(|p| p.is("companion")) => match next {
        Some(n) if n.is_ident() => (n.text, FrameKind::Companion, false, i + 2),
        _ => ("Companion", FrameKind::Companion, false, i + 1),
      },
      "object" if self.kotlin => match next {
        Some(n) if n.is_ident() => (n.text, FrameKind::Object, false, i + 2),
        _ => ("", FrameKind::Object, true, i + 1),
      },
      _ => return None,
    };

    if !anonymous && !next.is_some_and(|n| n.is_ident()) && kind == FrameKind::Class {
      return None;
    }

    let parent = self.current();
    let local = anonymous
      || match parent {
        Some(p) => p.local || self.depth != p.body_depth,
        None => self.depth > 0,
      };
    let binary = match parent {
      Some(p) => format!("{}${}", p.binary, simple),
      None => simple.to_string(),
    };

    let (type_vars, next_index) = match tokens.get(after_name) {
      Some(t) if t.is("<") => match type_params(tokens, after_name) {
        Some((vars, close)) => (vars, close + 1),
        None => (Vec::new(), after_name),
      },
      _ => (Vec::new(), after_name),
    };

    Some((
      TypeFrame {
        simple: simple.to_string(),
        binary,
        kind,
        body_depth: 0,
        local,
        type_vars,
        paren_depth: self.parens,
      },
      next_index,
    ))
  }
}

/// Variables declared by the type parameter list opened at `open`, and the index of its `>`.
///
/// Only the first bound is kept (`extends` in Java, `:` in Kotlin); `where` clauses are not read.
pub fn type_params(tokens: &[Token<'_>], open: usize) -> Option<(Vec<TypeVar>, usize)> {
  let close = lex::matching(tokens, open)?;
  let mut vars: Vec<TypeVar> = Vec::new();
  let mut expect_name = true;
  let mut in_bound = false;
  let mut annotation = false;
  let mut depth = 0i32;

  for token in &tokens[open + 1..close] {
    match token.text {
      "<" => {
        depth += 1;
        in_bound = false;
      }
      ">" => depth -= 1,
      "," if depth == 0 => {
        expect_name = true;
        in_bound = false;
      }
      "@" => annotation = true,
      "reified" | "in" | "out" => {}
      "extends" | ":" if depth == 0 && !expect_name => {
        in_bound = vars.last().is_some_and(|v| v.bound.is_empty());
      }
      "." if in_bound => {}
      _ if token.is_ident() && annotation => annotation = false,
      _ if token.is_ident() && expect_name && depth == 0 => {
        vars.push(TypeVar::unbounded(token.text));
        expect_name = false;
      }
      _ if token.is_ident() && in_bound => {
        if let Some(var) = vars.last_mut() {
          var.bound.push(token.text.to_string());
        }
      }
      _ => in_bound = false,
    }
  }

  Some((vars, close))
}
