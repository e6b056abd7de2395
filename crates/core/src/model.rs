use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which side of the bridge a source file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  /// Managed-language sources that declare native entry points
  Declared,
  /// Native sources that implement bridge symbols
  Implemented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  Java,
  Kotlin,
  C,
  Cpp,
}

impl Language {
  pub fn from_extension(ext: &str) -> Option<Self> {
    match ext.to_lowercase().as_str() {
      "java" => Some(Language::Java),
      "kt" | "kts" => Some(Language::Kotlin),
      "c" => Some(Language::C),
      "cc" | "cpp" | "cxx" | "c++" | "h" | "hh" | "hpp" | "hxx" => Some(Language::Cpp),
      _ => None,
    }
  }

  pub fn from_path(path: &Path) -> Option<Self> {
    path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
  }

  pub fn side(self) -> Side {
    match self {
      Language::Java | Language::Kotlin => Side::Declared,
      Language::C | Language::Cpp => Side::Implemented,
    }
  }
}

/// One source file, read once and handed to an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
  pub path: PathBuf,
  pub side: Side,
  pub language: Language,
  pub text: String,
}

impl SourceUnit {
  /// Build a unit from raw bytes. Invalid UTF-8 is replaced rather than rejected.
  pub fn from_bytes(path: impl Into<PathBuf>, language: Language, bytes: &[u8]) -> Self {
    Self {
      path: path.into(),
      side: language.side(),
      language,
      text: String::from_utf8_lossy(bytes).into_owned(),
    }
  }

  pub fn from_text(path: impl Into<PathBuf>, language: Language, text: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      side: language.side(),
      language,
      text: text.into(),
    }
  }
}

/// Location of a binding in the scanned tree (1-based line)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin {
  pub path: PathBuf,
  pub line: u32,
}

impl Origin {
  pub fn new(path: impl Into<PathBuf>, line: u32) -> Self {
    Self {
      path: path.into(),
      line,
    }
  }
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.path.display(), self.line)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
  Boolean,
  Byte,
  Char,
  Short,
  Int,
  Long,
  Float,
  Double,
  Void,
}

impl Primitive {
  pub fn from_java(name: &str) -> Option<Self> {
    match name {
      "boolean" => Some(Primitive::Boolean),
      "byte" => Some(Primitive::Byte),
      "char" => Some(Primitive::Char),
      "short" => Some(Primitive::Short),
      "int" => Some(Primitive::Int),
      "long" => Some(Primitive::Long),
      "float" => Some(Primitive::Float),
      "double" => Some(Primitive::Double),
      "void" => Some(Primitive::Void),
      _ => None,
    }
  }

  /// JVM descriptor letter
  pub fn descriptor(self) -> char {
    match self {
      Primitive::Boolean => 'Z',
      Primitive::Byte => 'B',
      Primitive::Char => 'C',
      Primitive::Short => 'S',
      Primitive::Int => 'I',
      Primitive::Long => 'J',
      Primitive::Float => 'F',
      Primitive::Double => 'D',
      Primitive::Void => 'V',
    }
  }

  pub fn from_descriptor(c: char) -> Option<Self> {
    match c {
      'Z' => Some(Primitive::Boolean),
      'B' => Some(Primitive::Byte),
      'C' => Some(Primitive::Char),
      'S' => Some(Primitive::Short),
      'I' => Some(Primitive::Int),
      'J' => Some(Primitive::Long),
      'F' => Some(Primitive::Float),
      'D' => Some(Primitive::Double),
      'V' => Some(Primitive::Void),
      _ => None,
    }
  }

  pub fn java_name(self) -> &'static str {
    match self {
      Primitive::Boolean => "boolean",
      Primitive::Byte => "byte",
      Primitive::Char => "char",
      Primitive::Short => "short",
      Primitive::Int => "int",
      Primitive::Long => "long",
      Primitive::Float => "float",
      Primitive::Double => "double",
      Primitive::Void => "void",
    }
  }
}

/// Semantic type of a parameter or return value, after erasure and name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
  Primitive(Primitive),
  Array(Box<TypeTag>),
  /// Binary name split on package separators, e.g. `["java", "util", "Map$Entry"]`
  Reference(Vec<String>),
}

impl TypeTag {
  pub fn reference<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    TypeTag::Reference(segments.into_iter().map(Into::into).collect())
  }

  pub fn array_of(self) -> Self {
    TypeTag::Array(Box::new(self))
  }

  pub fn object() -> Self {
    TypeTag::reference(["java", "lang", "Object"])
  }

  pub fn string() -> Self {
    TypeTag::reference(["java", "lang", "String"])
  }

  /// JVM field descriptor, e.g. `[Ljava/lang/String;`
  pub fn descriptor(&self) -> String {
    match self {
      TypeTag::Primitive(p) => p.descriptor().to_string(),
      TypeTag::Array(inner) => format!("[{}", inner.descriptor()),
      TypeTag::Reference(segments) => format!("L{};", segments.join("/")),
    }
  }
}

impl fmt::Display for TypeTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypeTag::Primitive(p) => f.write_str(p.java_name()),
      TypeTag::Array(inner) => write!(f, "{inner}[]"),
      TypeTag::Reference(segments) => f.write_str(&segments.join(".")),
    }
  }
}

/// A native method declared on the managed side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclaredBinding {
  /// Package segments followed by the binary class name (`Outer$Inner`)
  pub owner: Vec<String>,
  pub method: String,
  pub params: Vec<TypeTag>,
  pub return_type: TypeTag,
  #[serde(default)]
  pub is_static: bool,
  pub origin: Origin,
}

impl DeclaredBinding {
  /// `com.example.Bridge.nativeInit`
  pub fn qualified_name(&self) -> String {
    let mut name = self.owner.join(".");
    if !name.is_empty() {
      name.push('.');
    }
    name.push_str(&self.method);
    name
  }

  /// `(JLjava/lang/String;)V`
  pub fn method_descriptor(&self) -> String {
    let params: String = self.params.iter().map(TypeTag::descriptor).collect();
    format!("({params}){}", self.return_type.descriptor())
  }

  /// `nativeSend(java.lang.String, int)`
  pub fn display_signature(&self) -> String {
    let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
    format!("{}({})", self.method, params.join(", "))
  }
}

/// A bridge function found on the native side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplementedBinding {
  pub symbol: String,
  /// Best-effort owner path recovered from the symbol; display only
  pub decoded_owner: Vec<String>,
  pub decoded_method: String,
  /// Encoded parameter descriptor following `__`, if the symbol is a long name
  pub overload_suffix: Option<String>,
  /// Has a body (as opposed to a forward declaration)
  pub is_definition: bool,
  /// Carries the `JNIEXPORT` marker
  pub exported: bool,
  pub origin: Origin,
}

/// Non-fatal problem encountered while reading or extracting one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParseWarning {
  pub path: PathBuf,
  pub line: Option<u32>,
  pub reason: String,
}

impl ParseWarning {
  pub fn new(path: impl Into<PathBuf>, line: Option<u32>, reason: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      line,
      reason: reason.into(),
    }
  }
}

impl fmt::Display for ParseWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.line {
      Some(line) => write!(f, "{}:{}: {}", self.path.display(), line, self.reason),
      None => write!(f, "{}: {}", self.path.display(), self.reason),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_language_from_extension() {
    assert_eq!(Language::from_extension("java"), Some(Language::Java));
    assert_eq!(Language::from_extension("KT"), Some(Language::Kotlin));
    assert_eq!(Language::from_extension("c"), Some(Language::C));
    assert_eq!(Language::from_extension("hpp"), Some(Language::Cpp));
    assert_eq!(Language::from_extension("h"), Some(Language::Cpp));
    assert_eq!(Language::from_extension("rs"), None);
  }

  #[test]
  fn test_language_side() {
    assert_eq!(Language::Java.side(), Side::Declared);
    assert_eq!(Language::Kotlin.side(), Side::Declared);
    assert_eq!(Language::C.side(), Side::Implemented);
    assert_eq!(Language::Cpp.side(), Side::Implemented);
  }

  #[test]
  fn test_source_unit_replaces_invalid_utf8() {
    let unit = SourceUnit::from_bytes("a.java", Language::Java, b"class A {\xff}");
    assert_eq!(unit.side, Side::Declared);
    assert!(unit.text.contains('\u{FFFD}'));
  }

  #[test]
  fn test_type_descriptors() {
    assert_eq!(TypeTag::Primitive(Primitive::Long).descriptor(), "J");
    assert_eq!(TypeTag::string().descriptor(), "Ljava/lang/String;");
    assert_eq!(
      TypeTag::Primitive(Primitive::Int).array_of().array_of().descriptor(),
      "[[I"
    );
  }

  #[test]
  fn test_declared_binding_names() {
    let binding = DeclaredBinding {
      owner: vec!["com".into(), "example".into(), "Bridge".into()],
      method: "nativeSend".into(),
      params: vec![TypeTag::string(), TypeTag::Primitive(Primitive::Int)],
      return_type: TypeTag::Primitive(Primitive::Void),
      is_static: true,
      origin: Origin::new("Bridge.java", 3),
    };
    assert_eq!(binding.qualified_name(), "com.example.Bridge.nativeSend");
    assert_eq!(binding.method_descriptor(), "(Ljava/lang/String;I)V");
    assert_eq!(binding.display_signature(), "nativeSend(java.lang.String, int)");
  }
}
