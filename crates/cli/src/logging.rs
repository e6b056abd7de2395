//! Logging setup for the jnicheck binary

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse log level from config string
pub fn parse_log_level(level: &str) -> Level {
  match level.to_lowercase().as_str() {
    "off" | "error" => Level::ERROR,
    "warn" => Level::WARN,
    "info" => Level::INFO,
    "debug" => Level::DEBUG,
    "trace" => Level::TRACE,
    _ => Level::WARN,
  }
}

/// Apply `-v` / `-q` counts to the configured level
pub fn adjust_level(level: Level, verbose: u8, quiet: u8) -> Level {
  const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];
  let current = LEVELS.iter().position(|l| *l == level).unwrap_or(1) as i32;
  let shifted = (current + i32::from(verbose) - i32::from(quiet)).clamp(0, LEVELS.len() as i32 - 1);
  LEVELS[shifted as usize]
}

/// Initialize stderr logging; stdout is reserved for the report.
///
/// `RUST_LOG` directives take precedence over `level`.
pub fn init_logging(level: Level) {
  let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_log_level() {
    assert_eq!(parse_log_level("DEBUG"), Level::DEBUG);
    assert_eq!(parse_log_level("off"), Level::ERROR);
    assert_eq!(parse_log_level("nonsense"), Level::WARN);
  }

  #[test]
  fn test_adjust_level() {
    assert_eq!(adjust_level(Level::WARN, 0, 0), Level::WARN);
    assert_eq!(adjust_level(Level::WARN, 2, 0), Level::DEBUG);
    assert_eq!(adjust_level(Level::WARN, 9, 0), Level::TRACE);
    assert_eq!(adjust_level(Level::WARN, 0, 1), Level::ERROR);
    assert_eq!(adjust_level(Level::INFO, 0, 5), Level::ERROR);
  }
}
