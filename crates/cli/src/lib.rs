//! jnicheck CLI library: logging, report rendering and report persistence

pub mod format;
pub mod logging;
pub mod report;

pub use format::{render, render_json, render_text};
pub use report::{report_path, write_report};
