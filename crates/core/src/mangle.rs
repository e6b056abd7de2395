//! Bridge symbol mangling.
//!
//! Maps a declared binding to the flat symbol a native library must export, following the JNI
//! naming scheme:
//!
//! - `Java_` prefix (configurable), owner segments and method joined with `_`
//! - inside identifiers: `_` -> `_1`, any non-alphanumeric code point -> `_0xxxx` per UTF-16 unit
//! - overloaded methods append `__` and the encoded parameter descriptor, where `;` -> `_2`,
//!   `[` -> `_3` and package separators become `_`
//!
//! [`Mangler::demangle`] is the best-effort inverse used for display. Known lossy cases:
//! the package/class boundary is not recoverable (the owner comes back as a flat path), a `$`
//! in a decoded segment may be a nested-type separator or a literal sigil, uppercase hex escapes
//! decode but re-encode in lowercase, and unpaired surrogates decode to U+FFFD.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use thiserror::Error;

use crate::model::{DeclaredBinding, Primitive, TypeTag};

/// Symbol prefix used by the JVM when resolving native methods
pub const DEFAULT_PREFIX: &str = "Java_";

/// Join key between declared and implemented bindings.
///
/// Identity is the mangled `symbol`; the other fields carry the (decoded) parts so results sort by
/// owner, method, then discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey {
  pub owner: Vec<String>,
  pub method: String,
  /// Encoded parameter descriptor, present only for long (overload) names
  pub discriminant: Option<String>,
  pub symbol: String,
}

impl fmt::Display for CanonicalKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.symbol)
  }
}

/// Reason a symbol could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemangleError {
  #[error("symbol does not start with `{0}`")]
  MissingPrefix(String),
  #[error("invalid character {ch:?} at offset {offset}")]
  InvalidCharacter { ch: char, offset: usize },
  #[error("malformed escape at offset {0}")]
  MalformedEscape(usize),
  #[error("empty identifier at offset {0}")]
  EmptySegment(usize),
  #[error("symbol names no method")]
  MissingMethod,
  #[error("malformed signature discriminant at offset {0}")]
  MalformedSignature(usize),
}

/// Result of decoding a mangled symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demangled {
  pub owner: Vec<String>,
  pub method: String,
  pub discriminant: Option<String>,
  pub params: Option<Vec<TypeTag>>,
}

/// Escape one identifier for use inside a mangled symbol.
pub fn escape_identifier(ident: &str) -> String {
  let mut out = String::with_capacity(ident.len());
  push_escaped(&mut out, ident);
  out
}

fn push_escaped(out: &mut String, ident: &str) {
  let mut units = [0u16; 2];
  for c in ident.chars() {
    if c.is_ascii_alphanumeric() {
      out.push(c);
    } else if c == '_' {
      out.push_str("_1");
    } else {
      for unit in c.encode_utf16(&mut units) {
        let _ = write!(out, "_0{:04x}", unit);
      }
    }
  }
}

/// Encode a parameter list as an overload discriminant (without the leading `__`).
pub fn encode_params(params: &[TypeTag]) -> String {
  let mut out = String::new();
  for param in params {
    push_type(&mut out, param);
  }
  out
}

fn push_type(out: &mut String, tag: &TypeTag) {
  match tag {
    TypeTag::Primitive(p) => out.push(p.descriptor()),
    TypeTag::Array(inner) => {
      out.push_str("_3");
      push_type(out, inner);
    }
    TypeTag::Reference(segments) => {
      out.push('L');
      for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
          out.push('_');
        }
        push_escaped(out, segment);
      }
      out.push_str("_2");
    }
  }
}

/// Decode an overload discriminant back into parameter types.
pub fn decode_params(discriminant: &str) -> Result<Vec<TypeTag>, DemangleError> {
  let bytes = discriminant.as_bytes();
  let mut pos = 0;
  let mut params = Vec::new();
  while pos < bytes.len() {
    params.push(decode_type(bytes, &mut pos)?);
  }
  Ok(params)
}

fn decode_type(bytes: &[u8], pos: &mut usize) -> Result<TypeTag, DemangleError> {
  let start = *pos;
  match bytes.get(start) {
    Some(b'_') if bytes.get(start + 1) == Some(&b'3') => {
      *pos += 2;
      Ok(decode_type(bytes, pos)?.array_of())
    }
    Some(b'L') => {
      *pos += 1;
      let mut segments = Vec::new();
      let mut current = Vec::new();
      loop {
        match bytes.get(*pos) {
          Some(b'_') => match bytes.get(*pos + 1) {
            Some(b'2') => {
              *pos += 2;
              break;
            }
            Some(b'1') => {
              current.push(u16::from(b'_'));
              *pos += 2;
            }
            Some(b'0') => {
              current.push(hex_unit(bytes, *pos + 2).ok_or(DemangleError::MalformedEscape(*pos))?);
              *pos += 6;
            }
            Some(_) => {
              if current.is_empty() {
                return Err(DemangleError::EmptySegment(*pos));
              }
              segments.push(String::from_utf16_lossy(&current));
              current.clear();
              *pos += 1;
            }
            None => return Err(DemangleError::MalformedSignature(*pos)),
          },
          Some(&b) if b.is_ascii_alphanumeric() => {
            current.push(u16::from(b));
            *pos += 1;
          }
          _ => return Err(DemangleError::MalformedSignature(*pos)),
        }
      }
      if current.is_empty() {
        return Err(DemangleError::EmptySegment(*pos));
      }
      segments.push(String::from_utf16_lossy(&current));
      Ok(TypeTag::Reference(segments))
    }
    Some(&b) => match Primitive::from_descriptor(b as char) {
      Some(Primitive::Void) | None => Err(DemangleError::MalformedSignature(start)),
      Some(p) => {
        *pos += 1;
        Ok(TypeTag::Primitive(p))
      }
    },
    None => Err(DemangleError::MalformedSignature(start)),
  }
}

fn hex_unit(bytes: &[u8], at: usize) -> Option<u16> {
  let digits = bytes.get(at..at + 4)?;
  let text = std::str::from_utf8(digits).ok()?;
  if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
    return None;
  }
  u16::from_str_radix(text, 16).ok()
}

/// Canonicalizer for one bridge prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mangler {
  prefix: String,
}

impl Default for Mangler {
  fn default() -> Self {
    Self::new(DEFAULT_PREFIX)
  }
}

impl Mangler {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self { prefix: prefix.into() }
  }

  pub fn prefix(&self) -> &str {
    &self.prefix
  }

  /// Symbol without overload discriminant: `Java_com_example_Bridge_nativeInit`
  pub fn short_name(&self, owner: &[String], method: &str) -> String {
    let mut out = self.prefix.clone();
    for segment in owner {
      push_escaped(&mut out, segment);
      out.push('_');
    }
    push_escaped(&mut out, method);
    out
  }

  /// Symbol with overload discriminant: `Java_com_example_Bridge_nativeSend__I`
  pub fn long_name(&self, owner: &[String], method: &str, params: &[TypeTag]) -> String {
    let mut out = self.short_name(owner, method);
    out.push_str("__");
    out.push_str(&encode_params(params));
    out
  }

  /// Key for a declared binding, discriminated only when the method is overloaded.
  pub fn key(&self, binding: &DeclaredBinding, overloaded: bool) -> CanonicalKey {
    if overloaded {
      self.long_key(binding)
    } else {
      self.short_key(binding)
    }
  }

  pub fn short_key(&self, binding: &DeclaredBinding) -> CanonicalKey {
    CanonicalKey {
      owner: binding.owner.clone(),
      method: binding.method.clone(),
      discriminant: None,
      symbol: self.short_name(&binding.owner, &binding.method),
    }
  }

  pub fn long_key(&self, binding: &DeclaredBinding) -> CanonicalKey {
    CanonicalKey {
      owner: binding.owner.clone(),
      method: binding.method.clone(),
      discriminant: Some(encode_params(&binding.params)),
      symbol: self.long_name(&binding.owner, &binding.method, &binding.params),
    }
  }

  /// Whether `symbol` carries this mangler's prefix
  pub fn is_bridge_symbol(&self, symbol: &str) -> bool {
    symbol.len() > self.prefix.len() && symbol.starts_with(&self.prefix)
  }

  /// Decode a symbol into owner path, method and optional discriminant.
  pub fn demangle(&self, symbol: &str) -> Result<Demangled, DemangleError> {
    let body = symbol
      .strip_prefix(self.prefix.as_str())
      .ok_or_else(|| DemangleError::MissingPrefix(self.prefix.clone()))?;
    let base = self.prefix.len();
    let bytes = body.as_bytes();

    let mut segments: Vec<String> = Vec::new();
    let mut current: Vec<u16> = Vec::new();
    let mut discriminant = None;
    let mut pos = 0;

    while pos < bytes.len() {
      let b = bytes[pos];
      if b.is_ascii_alphanumeric() {
        current.push(u16::from(b));
        pos += 1;
        continue;
      }
      if b != b'_' {
        let ch = body[pos..].chars().next().unwrap_or('\u{FFFD}');
        return Err(DemangleError::InvalidCharacter { ch, offset: base + pos });
      }
      match bytes.get(pos + 1) {
        Some(b'1') => {
          current.push(u16::from(b'_'));
          pos += 2;
        }
        Some(b'0') => {
          let unit = hex_unit(bytes, pos + 2).ok_or(DemangleError::MalformedEscape(base + pos))?;
          current.push(unit);
          pos += 6;
        }
        Some(b'2') | Some(b'3') => return Err(DemangleError::MalformedEscape(base + pos)),
        Some(b'_') if !matches!(bytes.get(pos + 2), Some(b'0') | Some(b'1')) => {
          finish_segment(&mut segments, &mut current, base + pos)?;
          discriminant = Some(body[pos + 2..].to_string());
          pos = bytes.len();
        }
        Some(_) => {
          finish_segment(&mut segments, &mut current, base + pos)?;
          pos += 1;
        }
        None => return Err(DemangleError::EmptySegment(base + pos + 1)),
      }
    }
    if discriminant.is_none() {
      finish_segment(&mut segments, &mut current, base + pos)?;
    }

    let method = segments.pop().ok_or(DemangleError::MissingMethod)?;
    if segments.is_empty() {
      return Err(DemangleError::MissingMethod);
    }
    let params = match &discriminant {
      Some(d) => Some(decode_params(d).map_err(|e| shift_offset(e, symbol.len() - d.len()))?),
      None => None,
    };

    Ok(Demangled {
      owner: segments,
      method,
      discriminant,
      params,
    })
  }

  /// Key for an implemented symbol, built from its decoded parts.
  pub fn key_for_symbol(&self, symbol: &str) -> Result<CanonicalKey, DemangleError> {
    let decoded = self.demangle(symbol)?;
    Ok(CanonicalKey {
      owner: decoded.owner,
      method: decoded.method,
      discriminant: decoded.discriminant,
      symbol: symbol.to_string(),
    })
  }
}

fn finish_segment(segments: &mut Vec<String>, current: &mut Vec<u16>, offset: usize) -> Result<(), DemangleError> {
  if current.is_empty() {
    return Err(DemangleError::EmptySegment(offset));
  }
  segments.push(String::from_utf16_lossy(current));
  current.clear();
  Ok(())
}

fn shift_offset(err: DemangleError, by: usize) -> DemangleError {
  match err {
    DemangleError::MalformedEscape(o) => DemangleError::MalformedEscape(o + by),
    DemangleError::EmptySegment(o) => DemangleError::EmptySegment(o + by),
    DemangleError::MalformedSignature(o) => DemangleError::MalformedSignature(o + by),
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Origin;
  use pretty_assertions::assert_eq;
  use std::collections::HashMap;

  fn owner(path: &str) -> Vec<String> {
    path.split('.').map(String::from).collect()
  }

  fn binding(owner_path: &str, method: &str, params: Vec<TypeTag>) -> DeclaredBinding {
    DeclaredBinding {
      owner: owner(owner_path),
      method: method.to_string(),
      params,
      return_type: TypeTag::Primitive(Primitive::Void),
      is_static: false,
      origin: Origin::new("Fixture.java", 1),
    }
  }

  fn int() -> TypeTag {
    TypeTag::Primitive(Primitive::Int)
  }

  // ============================================================================
  // ESCAPING
  // ============================================================================

  #[test]
  fn test_escape_plain_identifier() {
    assert_eq!(escape_identifier("nativeInit"), "nativeInit");
    assert_eq!(escape_identifier("ID2"), "ID2");
  }

  #[test]
  fn test_escape_underscore() {
    assert_eq!(escape_identifier("My_Class"), "My_1Class");
    assert_eq!(escape_identifier("_"), "_1");
  }

  #[test]
  fn test_escape_sigil_and_non_ascii() {
    assert_eq!(escape_identifier("Outer$Inner"), "Outer_00024Inner");
    assert_eq!(escape_identifier("Grüße"), "Gr_000fc_000dfe");
    // Outside the BMP: one escape per UTF-16 unit
    assert_eq!(escape_identifier("a😀"), "a_0d83d_0de00");
  }

  #[test]
  fn test_short_name_default_prefix() {
    let mangler = Mangler::default();
    assert_eq!(
      mangler.short_name(&owner("com.example.Bridge"), "nativeInit"),
      "Java_com_example_Bridge_nativeInit"
    );
  }

  #[test]
  fn test_short_name_underscore_owner_does_not_collide_with_separator() {
    let mangler = Mangler::default();
    let escaped = mangler.short_name(&owner("My_Class"), "run");
    let split = mangler.short_name(&owner("My.Class"), "run");
    assert_eq!(escaped, "Java_My_1Class_run");
    assert_eq!(split, "Java_My_Class_run");
    assert_ne!(escaped, split);
  }

  #[test]
  fn test_custom_prefix() {
    let mangler = Mangler::new("Bridge_");
    assert_eq!(mangler.short_name(&owner("a.B"), "c"), "Bridge_a_B_c");
    assert!(mangler.is_bridge_symbol("Bridge_a_B_c"));
    assert!(!mangler.is_bridge_symbol("Java_a_B_c"));
    assert!(!mangler.is_bridge_symbol("Bridge_"));
  }

  // ============================================================================
  // OVERLOAD DISCRIMINANT
  // ============================================================================

  #[test]
  fn test_long_name_encodes_descriptor() {
    let mangler = Mangler::default();
    let params = vec![
      TypeTag::string(),
      TypeTag::Primitive(Primitive::Long),
      TypeTag::Primitive(Primitive::Byte).array_of(),
      TypeTag::reference(["java", "util", "Map$Entry"]).array_of(),
    ];
    assert_eq!(
      mangler.long_name(&owner("com.example.Bridge"), "nativeSend", &params),
      "Java_com_example_Bridge_nativeSend__Ljava_lang_String_2J_3B_3Ljava_util_Map_00024Entry_2"
    );
  }

  #[test]
  fn test_long_name_without_params() {
    let mangler = Mangler::default();
    assert_eq!(mangler.long_name(&owner("p.C"), "f", &[]), "Java_p_C_f__");
  }

  #[test]
  fn test_key_discriminated_only_when_overloaded() {
    let mangler = Mangler::default();
    let b = binding("com.example.Bridge", "nativeSend", vec![int()]);
    let short = mangler.key(&b, false);
    let long = mangler.key(&b, true);
    assert_eq!(short.symbol, "Java_com_example_Bridge_nativeSend");
    assert_eq!(short.discriminant, None);
    assert_eq!(long.symbol, "Java_com_example_Bridge_nativeSend__I");
    assert_eq!(long.discriminant.as_deref(), Some("I"));
  }

  #[test]
  fn test_decode_params_roundtrip() {
    let params = vec![
      TypeTag::Primitive(Primitive::Boolean),
      TypeTag::reference(["my_pkg", "Thing"]),
      TypeTag::Primitive(Primitive::Double).array_of().array_of(),
    ];
    let encoded = encode_params(&params);
    assert_eq!(encoded, "ZLmy_1pkg_Thing_2_3_3D");
    assert_eq!(decode_params(&encoded).unwrap(), params);
  }

  #[test]
  fn test_decode_params_rejects_garbage() {
    assert!(decode_params("Q").is_err());
    assert!(decode_params("V").is_err());
    assert!(decode_params("Ljava_lang_String").is_err());
    assert!(decode_params("_3").is_err());
  }

  // ============================================================================
  // DETERMINISM AND INJECTIVITY
  // ============================================================================

  fn fixture_set() -> Vec<DeclaredBinding> {
    vec![
      binding("com.example.Bridge", "nativeInit", vec![TypeTag::Primitive(Primitive::Long)]),
      binding("com.example.Bridge", "nativeSend", vec![TypeTag::string()]),
      binding("com.example.Bridge", "nativeSend", vec![int()]),
      binding("com.example.Bridge", "nativeSend", vec![int().array_of()]),
      binding("com.example.Bridge", "nativeSend", vec![]),
      binding("com.example", "Bridge_nativeInit", vec![]),
      binding("com.example_Bridge", "nativeInit", vec![]),
      binding("com_example.Bridge", "nativeInit", vec![]),
      binding("My_Class", "run", vec![]),
      binding("My.Class", "run", vec![]),
      binding("My.Class_run", "x", vec![]),
      binding("Outer$Inner", "run", vec![]),
      binding("Outer.Inner", "run", vec![]),
      binding("Outer_00024Inner", "run", vec![]),
      binding("pkg.Grüße", "run", vec![]),
      binding("pkg.Gr_000fc_000dfe", "run", vec![]),
      binding("a.b", "c", vec![TypeTag::reference(["x", "Y"])]),
      binding("a.b", "c", vec![TypeTag::reference(["x_Y"])]),
    ]
  }

  #[test]
  fn test_mangling_is_deterministic() {
    let mangler = Mangler::default();
    for b in fixture_set() {
      assert_eq!(mangler.long_key(&b), mangler.long_key(&b.clone()));
      assert_eq!(mangler.short_key(&b), mangler.short_key(&b.clone()));
    }
  }

  #[test]
  fn test_long_names_are_injective() {
    let mangler = Mangler::default();
    let mut seen: HashMap<String, DeclaredBinding> = HashMap::new();
    for b in fixture_set() {
      let symbol = mangler.long_key(&b).symbol;
      if let Some(previous) = seen.insert(symbol.clone(), b.clone()) {
        panic!("{symbol} produced by both {previous:?} and {b:?}");
      }
    }
  }

  #[test]
  fn test_short_names_collide_only_within_overload_group() {
    let mangler = Mangler::default();
    let mut seen: HashMap<String, (Vec<String>, String)> = HashMap::new();
    for b in fixture_set() {
      let symbol = mangler.short_key(&b).symbol;
      let identity = (b.owner.clone(), b.method.clone());
      if let Some(previous) = seen.insert(symbol.clone(), identity.clone()) {
        assert_eq!(previous, identity, "{symbol} shared across different methods");
      }
    }
  }

  // ============================================================================
  // DEMANGLING
  // ============================================================================

  #[test]
  fn test_demangle_short_name() {
    let d = Mangler::default().demangle("Java_com_example_Bridge_nativeInit").unwrap();
    assert_eq!(d.owner, owner("com.example.Bridge"));
    assert_eq!(d.method, "nativeInit");
    assert_eq!(d.discriminant, None);
    assert_eq!(d.params, None);
  }

  #[test]
  fn test_demangle_long_name() {
    let d = Mangler::default()
      .demangle("Java_com_example_Bridge_nativeSend__Ljava_lang_String_2I")
      .unwrap();
    assert_eq!(d.method, "nativeSend");
    assert_eq!(d.discriminant.as_deref(), Some("Ljava_lang_String_2I"));
    assert_eq!(d.params, Some(vec![TypeTag::string(), int()]));
  }

  #[test]
  fn test_demangle_empty_discriminant() {
    let d = Mangler::default().demangle("Java_p_C_f__").unwrap();
    assert_eq!(d.discriminant.as_deref(), Some(""));
    assert_eq!(d.params, Some(vec![]));
  }

  #[test]
  fn test_demangle_separator_followed_by_escape() {
    // `_Hidden` after a separator yields `__1Hidden`, which is not a discriminant
    let mangler = Mangler::default();
    let symbol = mangler.short_name(&owner("pkg._Hidden"), "run");
    assert_eq!(symbol, "Java_pkg__1Hidden_run");
    let d = mangler.demangle(&symbol).unwrap();
    assert_eq!(d.owner, owner("pkg._Hidden"));
    assert_eq!(d.discriminant, None);

    let symbol = mangler.short_name(&owner("pkg.$Proxy"), "run");
    let d = mangler.demangle(&symbol).unwrap();
    assert_eq!(d.owner, owner("pkg.$Proxy"));
  }

  #[test]
  fn test_demangle_array_discriminant() {
    let d = Mangler::default().demangle("Java_p_C_f___3I").unwrap();
    assert_eq!(d.params, Some(vec![int().array_of()]));
  }

  #[test]
  fn test_escaping_roundtrip() {
    let mangler = Mangler::default();
    let cases = [
      "com.example.My_Class",
      "com.example.Outer$Inner",
      "com.example.Grüße",
      "émoji.😀Bridge",
      "Bridge",
    ];
    for case in cases {
      let path = owner(case);
      let symbol = mangler.short_name(&path, "native_call");
      let d = mangler.demangle(&symbol).unwrap();
      assert_eq!(d.owner, path, "owner of {symbol}");
      assert_eq!(d.method, "native_call");
      assert_eq!(mangler.short_name(&d.owner, &d.method), symbol);
    }
  }

  #[test]
  fn test_demangle_uppercase_hex_is_lossy_on_reencode() {
    let mangler = Mangler::default();
    let d = mangler.demangle("Java_p_Gr_000FCe_run").unwrap();
    assert_eq!(d.owner, owner("p.Grüe"));
    assert_eq!(mangler.short_name(&d.owner, &d.method), "Java_p_Gr_000fce_run");
  }

  #[test]
  fn test_demangle_unpaired_surrogate_is_replaced() {
    let d = Mangler::default().demangle("Java_p_A_0d83d_run").unwrap();
    assert_eq!(d.owner, vec!["p".to_string(), "A\u{FFFD}".to_string()]);
  }

  #[test]
  fn test_demangle_errors() {
    let mangler = Mangler::default();
    assert_eq!(
      mangler.demangle("JNI_OnLoad"),
      Err(DemangleError::MissingPrefix("Java_".into()))
    );
    assert_eq!(mangler.demangle("Java_run"), Err(DemangleError::MissingMethod));
    assert!(matches!(mangler.demangle("Java_p_C_"), Err(DemangleError::EmptySegment(_))));
    assert!(matches!(mangler.demangle("Java_p_C_0zz_f"), Err(DemangleError::MalformedEscape(_))));
    assert!(matches!(mangler.demangle("Java_p_C_2f"), Err(DemangleError::MalformedEscape(_))));
    assert!(matches!(
      mangler.demangle("Java_p_C_f__Q"),
      Err(DemangleError::MalformedSignature(_))
    ));
    assert!(matches!(
      mangler.demangle("Java_p_C$f"),
      Err(DemangleError::InvalidCharacter { ch: '$', .. })
    ));
  }

  #[test]
  fn test_key_for_symbol() {
    let key = Mangler::default().key_for_symbol("Java_Bridge_orphanMethod").unwrap();
    assert_eq!(key.owner, vec!["Bridge".to_string()]);
    assert_eq!(key.method, "orphanMethod");
    assert_eq!(key.symbol, "Java_Bridge_orphanMethod");
  }
}
