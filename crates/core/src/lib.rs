//! Core model, symbol mangling and matching for jnicheck.

pub mod config;
pub mod error;
pub mod mangle;
pub mod matcher;
pub mod model;

pub use config::{Config, ReportFormat};
pub use error::{Error, Result};
pub use mangle::{CanonicalKey, DemangleError, Demangled, Mangler};
pub use matcher::{MatchOptions, MatchResult, MatchStatus, Matcher, Summary, merge_implementations};
pub use model::{
  DeclaredBinding, ImplementedBinding, Language, Origin, ParseWarning, Primitive, Side, SourceUnit, TypeTag,
};
