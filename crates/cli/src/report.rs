//! Persisting the rendered report under the project root

use jnicheck_core::ReportFormat;
use jnicheck_core::config::{DEFAULT_REPORT_FILE, ReportConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the report for `root` is written.
///
/// A JSON report keeps the default base name but switches to a `.json` extension.
pub fn report_path(root: &Path, config: &ReportConfig) -> PathBuf {
  let path = root.join(&config.file);
  if config.format == ReportFormat::Json && config.file == DEFAULT_REPORT_FILE {
    path.with_extension("json")
  } else {
    path
  }
}

/// Write `contents` next to the sources, replacing any previous report
pub fn write_report(path: &Path, contents: &str) -> std::io::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }
  let tmp = path.with_extension("tmp");
  std::fs::write(&tmp, contents)?;
  std::fs::rename(&tmp, path)?;
  debug!(path = %path.display(), bytes = contents.len(), "Wrote report");
  Ok(())
}
