use ignore::WalkBuilder;
use jnicheck_core::config::ScanConfig;
use jnicheck_core::{Error, Language, ParseWarning, Result, Side};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Directories skipped anywhere in the tree regardless of .gitignore
pub const SKIPPED_DIRS: &[&str] = &[
  // Version control
  ".git",
  ".hg",
  ".svn",
  // Gradle and Android Studio outputs
  "build",
  "gradle",
  ".gradle",
  ".cxx",
  ".externalNativeBuild",
  ".idea",
  // Other build outputs and dependencies
  "target",
  "node_modules",
  "cmake-build-debug",
  "cmake-build-release",
];

/// Per-directory ignore file honored in addition to .gitignore
pub const IGNORE_FILE: &str = ".jnicheckignore";

/// One discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
  pub path: PathBuf,
  /// Path relative to the scan root, used for reporting
  pub relative_path: PathBuf,
  pub language: Language,
  pub size: u64,
}

impl ScannedFile {
  pub fn side(&self) -> Side {
    self.language.side()
  }
}

/// Result of scanning a directory
#[derive(Debug)]
pub struct ScanResult {
  /// Sorted by relative path
  pub files: Vec<ScannedFile>,
  pub skipped_count: u32,
  pub total_bytes: u64,
  pub scan_duration: Duration,
  /// Entries the walker could not read
  pub warnings: Vec<ParseWarning>,
}

/// Source file scanner with gitignore support
#[derive(Debug, Clone)]
pub struct Scanner {
  max_file_size: u64,
  follow_links: bool,
  respect_gitignore: bool,
  exclude_dirs: Vec<String>,
}

impl Default for Scanner {
  fn default() -> Self {
    Self::new()
  }
}

impl Scanner {
  pub fn new() -> Self {
    Self::from_config(&ScanConfig::default())
  }

  pub fn from_config(config: &ScanConfig) -> Self {
    Self {
      max_file_size: config.max_file_size,
      follow_links: false,
      respect_gitignore: config.respect_gitignore,
      exclude_dirs: config.exclude_dirs.clone(),
    }
  }

  pub fn with_max_file_size(mut self, size: u64) -> Self {
    self.max_file_size = size;
    self
  }

  pub fn with_gitignore(mut self, respect: bool) -> Self {
    self.respect_gitignore = respect;
    self
  }

  pub fn with_excluded_dir(mut self, name: impl Into<String>) -> Self {
    self.exclude_dirs.push(name.into());
    self
  }

  fn is_excluded(&self, name: &str) -> bool {
    SKIPPED_DIRS.contains(&name) || self.exclude_dirs.iter().any(|d| d == name)
  }

  /// Scan `root` for Java, Kotlin, C and C++ sources.
  ///
  /// Fails only when the root itself is unusable; unreadable entries become warnings.
  pub fn scan(&self, root: &Path) -> Result<ScanResult> {
    let metadata = std::fs::metadata(root).map_err(|e| Error::invalid_root(root, e.to_string()))?;
    if !metadata.is_dir() {
      return Err(Error::invalid_root(root, "not a directory"));
    }

    let start = Instant::now();
    let excluded = self.clone();
    let walker = WalkBuilder::new(root)
      .follow_links(self.follow_links)
      .hidden(false)
      .git_ignore(self.respect_gitignore)
      .git_global(self.respect_gitignore)
      .git_exclude(self.respect_gitignore)
      .require_git(false)
      .add_custom_ignore_filename(IGNORE_FILE)
      .filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        !(is_dir && entry.depth() > 0 && entry.file_name().to_str().is_some_and(|n| excluded.is_excluded(n)))
      })
      .build();

    let mut candidates: Vec<(PathBuf, Language)> = Vec::new();
    let mut warnings = Vec::new();
    for entry in walker {
      match entry {
        Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
          if let Some(language) = Language::from_path(entry.path()) {
            candidates.push((entry.into_path(), language));
          }
        }
        Ok(_) => {}
        Err(e) => warnings.push(ParseWarning::new(root, None, format!("cannot walk directory: {e}"))),
      }
    }

    let scanned: Vec<Option<ScannedFile>> = candidates
      .into_par_iter()
      .map(|(path, language)| {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size > self.max_file_size {
          debug!(path = %path.display(), size, "Skipping oversized file");
          return None;
        }

        trace!(path = %path.display(), ?language, "Discovered source file");
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        Some(ScannedFile {
          path,
          relative_path,
          language,
          size,
        })
      })
      .collect();

    let skipped_count = scanned.iter().filter(|f| f.is_none()).count() as u32;
    let mut files: Vec<ScannedFile> = scanned.into_iter().flatten().collect();
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    let total_bytes = files.iter().map(|f| f.size).sum();

    debug!(
      root = %root.display(),
      files = files.len(),
      skipped = skipped_count,
      "Scan complete"
    );

    Ok(ScanResult {
      files,
      skipped_count,
      total_bytes,
      scan_duration: start.elapsed(),
      warnings,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  fn relative_paths(result: &ScanResult) -> Vec<String> {
    result
      .files
      .iter()
      .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
      .collect()
  }

  #[test]
  fn test_scan_filters_by_extension_and_sorts() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/main/java/com/example/Bridge.java", "class Bridge {}");
    write(dir.path(), "src/main/kotlin/Native.kt", "");
    write(dir.path(), "src/main/cpp/bridge.cpp", "");
    write(dir.path(), "src/main/cpp/bridge.h", "");
    write(dir.path(), "src/main/cpp/util.c", "");
    write(dir.path(), "README.md", "# readme");
    write(dir.path(), "src/main/res/layout.xml", "<x/>");

    let result = Scanner::new().scan(dir.path()).unwrap();
    assert_eq!(
      relative_paths(&result),
      vec![
        "src/main/cpp/bridge.cpp",
        "src/main/cpp/bridge.h",
        "src/main/cpp/util.c",
        "src/main/java/com/example/Bridge.java",
        "src/main/kotlin/Native.kt",
      ]
    );
    assert_eq!(result.files[3].language, Language::Java);
    assert_eq!(result.files[3].side(), Side::Declared);
    assert_eq!(result.files[0].side(), Side::Implemented);
  }

  #[test]
  fn test_scan_skips_build_directories() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app/src/Bridge.java", "");
    write(dir.path(), "app/build/generated/Gen.java", "");
    write(dir.path(), "gradle/wrapper/Wrapper.java", "");
    write(dir.path(), ".gradle/cache/Cached.java", "");
    write(dir.path(), "app/.cxx/Debug/jni.cpp", "");

    let result = Scanner::new().scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["app/src/Bridge.java"]);
  }

  #[test]
  fn test_scan_custom_excluded_dir() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/Bridge.java", "");
    write(dir.path(), "third_party/jni.c", "");

    let result = Scanner::new().with_excluded_dir("third_party").scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["src/Bridge.java"]);
  }

  #[test]
  fn test_scan_respects_gitignore() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".gitignore", "generated/\n");
    write(dir.path(), "src/Bridge.java", "");
    write(dir.path(), "generated/Stub.java", "");

    let result = Scanner::new().scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["src/Bridge.java"]);

    let result = Scanner::new().with_gitignore(false).scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["generated/Stub.java", "src/Bridge.java"]);
  }

  #[test]
  fn test_scan_respects_custom_ignore_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), IGNORE_FILE, "legacy.c\n");
    write(dir.path(), "jni/legacy.c", "");
    write(dir.path(), "jni/bridge.c", "");

    let result = Scanner::new().scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["jni/bridge.c"]);
  }

  #[test]
  fn test_scan_skips_oversized_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "small.c", "int x;");
    write(dir.path(), "large.c", &"x".repeat(64));

    let result = Scanner::new().with_max_file_size(32).scan(dir.path()).unwrap();
    assert_eq!(relative_paths(&result), vec!["small.c"]);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.total_bytes, 6);
  }

  #[test]
  fn test_scan_invalid_root() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");
    assert!(matches!(Scanner::new().scan(&missing), Err(Error::InvalidRoot { .. })));

    let file = dir.path().join("file.java");
    fs::write(&file, "").unwrap();
    let err = Scanner::new().scan(&file).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
  }
}
