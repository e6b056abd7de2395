//! Resolution of source-level type names to erased JVM type tags.

use std::collections::HashMap;

use jnicheck_core::{Primitive, TypeTag};

/// `java.lang` types that resolve without an import
const JAVA_LANG: &[&str] = &[
  "AutoCloseable",
  "Boolean",
  "Byte",
  "CharSequence",
  "Character",
  "Class",
  "ClassLoader",
  "Cloneable",
  "Comparable",
  "Double",
  "Enum",
  "Error",
  "Exception",
  "Float",
  "IllegalArgumentException",
  "IllegalStateException",
  "Integer",
  "Iterable",
  "Long",
  "Math",
  "Number",
  "Object",
  "Record",
  "Runnable",
  "RuntimeException",
  "Short",
  "String",
  "StringBuffer",
  "StringBuilder",
  "System",
  "Thread",
  "Throwable",
  "Void",
];

/// A type as written in Java source: dotted name plus array dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaType {
  pub name: Vec<String>,
  pub dims: usize,
}

/// A type as written in Kotlin source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KotlinType {
  pub name: Vec<String>,
  pub args: Vec<KotlinType>,
  pub nullable: bool,
  /// Set for function types `(A, B) -> R`
  pub function_arity: Option<usize>,
}

impl KotlinType {
  pub fn named(name: &str) -> Self {
    Self {
      name: vec![name.to_string()],
      args: Vec::new(),
      nullable: false,
      function_arity: None,
    }
  }

  /// Star projection, treated as `Any?`
  pub fn star() -> Self {
    Self {
      nullable: true,
      ..Self::named("Any")
    }
  }

  pub fn is_named(&self, name: &str) -> bool {
    self.function_arity.is_none() && self.simple_name() == Some(name)
  }

  /// Last segment, with any `kotlin.` qualification ignored
  fn simple_name(&self) -> Option<&str> {
    match self.name.as_slice() {
      [single] => Some(single.as_str()),
      [first, .., last] if first == "kotlin" => Some(last.as_str()),
      _ => None,
    }
  }
}

fn kotlin_primitive(name: &str) -> Option<Primitive> {
  match name {
    "Boolean" => Some(Primitive::Boolean),
    "Byte" => Some(Primitive::Byte),
    "Char" => Some(Primitive::Char),
    "Short" => Some(Primitive::Short),
    "Int" => Some(Primitive::Int),
    "Long" => Some(Primitive::Long),
    "Float" => Some(Primitive::Float),
    "Double" => Some(Primitive::Double),
    _ => None,
  }
}

fn kotlin_primitive_array(name: &str) -> Option<Primitive> {
  name.strip_suffix("Array").and_then(kotlin_primitive)
}

/// Box class of a primitive
pub fn boxed(primitive: Primitive) -> TypeTag {
  let name = match primitive {
    Primitive::Boolean => "Boolean",
    Primitive::Byte => "Byte",
    Primitive::Char => "Character",
    Primitive::Short => "Short",
    Primitive::Int => "Integer",
    Primitive::Long => "Long",
    Primitive::Float => "Float",
    Primitive::Double => "Double",
    Primitive::Void => "Void",
  };
  TypeTag::reference(["java", "lang", name])
}

/// Kotlin built-ins that map onto JVM classes
fn kotlin_builtin(name: &str) -> Option<TypeTag> {
  let segments: &[&str] = match name {
    "String" => &["java", "lang", "String"],
    "Any" => &["java", "lang", "Object"],
    "Nothing" => &["java", "lang", "Void"],
    "CharSequence" | "Number" | "Throwable" | "Comparable" | "Enum" => return Some(java_lang(name)),
    "Exception" | "RuntimeException" | "Error" => return Some(java_lang(name)),
    "Iterable" | "MutableIterable" => &["java", "lang", "Iterable"],
    "Collection" | "MutableCollection" => &["java", "util", "Collection"],
    "List" | "MutableList" => &["java", "util", "List"],
    "Set" | "MutableSet" => &["java", "util", "Set"],
    "Map" | "MutableMap" => &["java", "util", "Map"],
    "Iterator" | "MutableIterator" => &["java", "util", "Iterator"],
    _ => return None,
  };
  Some(TypeTag::reference(segments.iter().copied()))
}

fn java_lang(name: &str) -> TypeTag {
  TypeTag::reference(["java", "lang", name])
}

/// A type parameter and the leftmost bound it erases to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVar {
  pub name: String,
  /// Dotted name of the first bound; empty when unbounded
  pub bound: Vec<String>,
}

impl TypeVar {
  pub fn unbounded(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      bound: Vec::new(),
    }
  }

  pub fn bounded(name: impl Into<String>, bound: &[&str]) -> Self {
    Self {
      name: name.into(),
      bound: bound.iter().map(|s| s.to_string()).collect(),
    }
  }
}

/// Turn a qualified source name into binary segments: package segments, then the
/// outermost class with nested classes joined by `$`.
pub fn binary_segments(name: &[String]) -> Vec<String> {
  let class_start = name
    .iter()
    .position(|s| s.chars().next().is_some_and(char::is_uppercase))
    .unwrap_or(name.len().saturating_sub(1));
  let mut segments = name[..class_start].to_vec();
  segments.push(name[class_start..].join("$"));
  segments
}

/// Names visible in one source file
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
  pub package: Vec<String>,
  /// Simple (or aliased) name to binary segments
  pub imports: HashMap<String, Vec<String>>,
  /// Types declared in this file, by simple name
  pub local_types: HashMap<String, Vec<String>>,
}

impl TypeScope {
  fn lookup(&self, simple: &str) -> Option<Vec<String>> {
    self
      .local_types
      .get(simple)
      .or_else(|| self.imports.get(simple))
      .cloned()
  }

  /// Resolve a class name that is not a primitive or type variable
  fn resolve_reference(&self, name: &[String]) -> TypeTag {
    match name {
      [] => TypeTag::object(),
      [simple] => {
        if let Some(segments) = self.lookup(simple) {
          TypeTag::Reference(segments)
        } else if JAVA_LANG.contains(&simple.as_str()) {
          java_lang(simple)
        } else {
          let mut segments = self.package.clone();
          segments.push(simple.clone());
          TypeTag::Reference(segments)
        }
      }
      [first, rest @ ..] => match self.lookup(first) {
        // `Outer.Inner` where `Outer` is already known
        Some(mut segments) => {
          if let Some(last) = segments.last_mut() {
            for nested in rest {
              last.push('$');
              last.push_str(nested);
            }
          }
          TypeTag::Reference(segments)
        }
        None => TypeTag::Reference(binary_segments(name)),
      },
    }
  }

  /// Erasure of the type variable `name`, if one is in scope. Later entries shadow earlier ones.
  fn erase_type_var(&self, name: &str, type_vars: &[TypeVar], kotlin: bool) -> Option<TypeTag> {
    let index = type_vars.iter().rposition(|v| v.name == name)?;
    let bound = &type_vars[index].bound;
    if bound.is_empty() {
      return Some(TypeTag::object());
    }
    // A bound may name another variable; dropping this one stops cycles.
    let rest: Vec<TypeVar> = type_vars
      .iter()
      .enumerate()
      .filter(|&(i, _)| i != index)
      .map(|(_, v)| v.clone())
      .collect();
    Some(if kotlin {
      self.resolve_boxed(
        &KotlinType {
          name: bound.clone(),
          args: Vec::new(),
          nullable: false,
          function_arity: None,
        },
        &rest,
      )
    } else {
      self.resolve_java(
        &JavaType {
          name: bound.clone(),
          dims: 0,
        },
        &rest,
      )
    })
  }

  pub fn resolve_java(&self, ty: &JavaType, type_vars: &[TypeVar]) -> TypeTag {
    let base = match ty.name.as_slice() {
      [single] => match Primitive::from_java(single) {
        Some(primitive) => TypeTag::Primitive(primitive),
        None => self
          .erase_type_var(single, type_vars, false)
          .unwrap_or_else(|| self.resolve_reference(&ty.name)),
      },
      name => self.resolve_reference(name),
    };
    (0..ty.dims).fold(base, |tag, _| tag.array_of())
  }

  /// Resolve a Kotlin parameter type. Use [`TypeScope::resolve_kotlin_return`] for return types.
  pub fn resolve_kotlin(&self, ty: &KotlinType, type_vars: &[TypeVar]) -> TypeTag {
    if let Some(arity) = ty.function_arity {
      return TypeTag::Reference(vec![
        "kotlin".to_string(),
        "jvm".to_string(),
        "functions".to_string(),
        format!("Function{arity}"),
      ]);
    }

    if let Some(simple) = ty.simple_name() {
      if let Some(primitive) = kotlin_primitive(simple) {
        return if ty.nullable {
          boxed(primitive)
        } else {
          TypeTag::Primitive(primitive)
        };
      }
      if let Some(primitive) = kotlin_primitive_array(simple) {
        return TypeTag::Primitive(primitive).array_of();
      }
      if simple == "Array" {
        let element = ty.args.first().map_or_else(TypeTag::object, |arg| self.resolve_boxed(arg, type_vars));
        return element.array_of();
      }
      if simple == "Unit" {
        return TypeTag::reference(["kotlin", "Unit"]);
      }
      if ty.name.len() == 1
        && let Some(tag) = self.erase_type_var(&ty.name[0], type_vars, true)
      {
        return tag;
      }
      if self.lookup(simple).is_none()
        && let Some(tag) = kotlin_builtin(simple)
      {
        return tag;
      }
    }

    self.resolve_reference(&ty.name)
  }

  /// Like [`TypeScope::resolve_kotlin`], but `Unit` becomes `void`
  pub fn resolve_kotlin_return(&self, ty: &KotlinType, type_vars: &[TypeVar]) -> TypeTag {
    if ty.is_named("Unit") && !ty.nullable {
      TypeTag::Primitive(Primitive::Void)
    } else {
      self.resolve_kotlin(ty, type_vars)
    }
  }

  /// Generic arguments are always reference types
  fn resolve_boxed(&self, ty: &KotlinType, type_vars: &[TypeVar]) -> TypeTag {
    match self.resolve_kotlin(ty, type_vars) {
      TypeTag::Primitive(primitive) => boxed(primitive),
      tag => tag,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn names(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
  }

  fn scope() -> TypeScope {
    let mut scope = TypeScope {
      package: names(&["com", "example"]),
      ..Default::default()
    };
    scope
      .imports
      .insert("Buffer".to_string(), names(&["java", "nio", "Buffer"]));
    scope
      .imports
      .insert("Map".to_string(), names(&["java", "util", "Map"]));
    scope
      .local_types
      .insert("Callback".to_string(), names(&["com", "example", "Bridge$Callback"]));
    scope
  }

  fn java(name: &[&str], dims: usize) -> JavaType {
    JavaType { name: names(name), dims }
  }

  #[test]
  fn test_binary_segments() {
    assert_eq!(
      binary_segments(&names(&["java", "util", "Map", "Entry"])),
      names(&["java", "util", "Map$Entry"])
    );
    assert_eq!(binary_segments(&names(&["Bridge"])), names(&["Bridge"]));
  }

  #[test]
  fn test_java_resolution_order() {
    let scope = scope();
    assert_eq!(
      scope.resolve_java(&java(&["int"], 1), &[]),
      TypeTag::Primitive(Primitive::Int).array_of()
    );
    assert_eq!(scope.resolve_java(&java(&["String"], 0), &[]), TypeTag::string());
    assert_eq!(
      scope.resolve_java(&java(&["Buffer"], 0), &[]),
      TypeTag::reference(["java", "nio", "Buffer"])
    );
    assert_eq!(
      scope.resolve_java(&java(&["Callback"], 0), &[]),
      TypeTag::reference(["com", "example", "Bridge$Callback"])
    );
    assert_eq!(
      scope.resolve_java(&java(&["Handle"], 0), &[]),
      TypeTag::reference(["com", "example", "Handle"])
    );
    assert_eq!(
      scope.resolve_java(&java(&["Map", "Entry"], 0), &[]),
      TypeTag::reference(["java", "util", "Map$Entry"])
    );
    assert_eq!(
      scope.resolve_java(&java(&["java", "io", "File"], 0), &[]),
      TypeTag::reference(["java", "io", "File"])
    );
  }

  #[test]
  fn test_type_variables_erase_to_object() {
    let scope = scope();
    let vars = vec![TypeVar::unbounded("T")];
    assert_eq!(scope.resolve_java(&java(&["T"], 0), &vars), TypeTag::object());
    assert_eq!(scope.resolve_java(&java(&["T"], 1), &vars), TypeTag::object().array_of());
  }

  #[test]
  fn test_type_variables_erase_to_leftmost_bound() {
    let scope = scope();
    let vars = vec![
      TypeVar::bounded("T", &["Number"]),
      TypeVar::bounded("U", &["T"]),
      TypeVar::bounded("B", &["Buffer"]),
    ];
    assert_eq!(
      scope.resolve_java(&java(&["T"], 0), &vars),
      TypeTag::reference(["java", "lang", "Number"])
    );
    assert_eq!(
      scope.resolve_java(&java(&["U"], 1), &vars),
      TypeTag::reference(["java", "lang", "Number"]).array_of()
    );
    assert_eq!(
      scope.resolve_java(&java(&["B"], 0), &vars),
      TypeTag::reference(["java", "nio", "Buffer"])
    );

    let cyclic = vec![TypeVar::bounded("T", &["U"]), TypeVar::bounded("U", &["T"])];
    assert_eq!(
      scope.resolve_java(&java(&["T"], 0), &cyclic),
      TypeTag::reference(["com", "example", "T"])
    );

    let kotlin = vec![TypeVar::bounded("N", &["Int"]), TypeVar::bounded("C", &["CharSequence"])];
    assert_eq!(scope.resolve_kotlin(&KotlinType::named("N"), &kotlin), boxed(Primitive::Int));
    assert_eq!(
      scope.resolve_kotlin(&KotlinType::named("C"), &kotlin),
      TypeTag::reference(["java", "lang", "CharSequence"])
    );
  }

  #[test]
  fn test_kotlin_mapping() {
    let scope = scope();
    let int = KotlinType::named("Int");
    assert_eq!(scope.resolve_kotlin(&int, &[]), TypeTag::Primitive(Primitive::Int));

    let nullable_int = KotlinType {
      nullable: true,
      ..KotlinType::named("Int")
    };
    assert_eq!(scope.resolve_kotlin(&nullable_int, &[]), boxed(Primitive::Int));

    assert_eq!(
      scope.resolve_kotlin(&KotlinType::named("ByteArray"), &[]),
      TypeTag::Primitive(Primitive::Byte).array_of()
    );

    let strings = KotlinType {
      args: vec![KotlinType::named("String")],
      ..KotlinType::named("Array")
    };
    assert_eq!(scope.resolve_kotlin(&strings, &[]), TypeTag::string().array_of());

    let boxed_ints = KotlinType {
      args: vec![KotlinType::named("Int")],
      ..KotlinType::named("Array")
    };
    assert_eq!(scope.resolve_kotlin(&boxed_ints, &[]), boxed(Primitive::Int).array_of());

    assert_eq!(scope.resolve_kotlin(&KotlinType::named("Any"), &[]), TypeTag::object());
    assert_eq!(
      scope.resolve_kotlin(&KotlinType::named("List"), &[]),
      TypeTag::reference(["java", "util", "List"])
    );
    assert_eq!(
      scope.resolve_kotlin_return(&KotlinType::named("Unit"), &[]),
      TypeTag::Primitive(Primitive::Void)
    );
  }

  #[test]
  fn test_kotlin_function_types() {
    let callback = KotlinType {
      function_arity: Some(2),
      ..KotlinType::named("")
    };
    assert_eq!(
      scope().resolve_kotlin(&callback, &[]),
      TypeTag::reference(["kotlin", "jvm", "functions", "Function2"])
    );
  }
}
