//! Shared fixtures for pipeline integration tests

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write `files` as (relative path, content) pairs under a fresh project root
pub fn create_project(files: &[(&str, &str)]) -> TempDir {
  let dir = TempDir::new().expect("Failed to create temp dir");
  for (relative, content) in files {
    write_file(dir.path(), relative, content);
  }
  dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).expect("Failed to create parent dir");
  }
  fs::write(&path, content).unwrap_or_else(|e| panic!("Failed to write {relative}: {e}"));
}
