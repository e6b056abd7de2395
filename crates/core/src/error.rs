use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Invalid project root {}: {reason}", path.display())]
  InvalidRoot { path: PathBuf, reason: String },

  #[error("Config {}: {source}", path.display())]
  Config {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("IO: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
    Self::InvalidRoot {
      path: path.into(),
      reason: reason.into(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
