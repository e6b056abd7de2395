//! jnicheck - verify JNI native method declarations against their bridge implementations

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser};
use cli::{format, logging, report};
use index::Pipeline;
use jnicheck_core::{Config, ReportFormat};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// Findings that fail the run
const EXIT_FINDINGS: u8 = 1;
/// Invalid root, unreadable config, or an I/O failure
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "jnicheck", version)]
#[command(about = "Check that every JNI native method has exactly one matching bridge function")]
#[command(after_help = "\
EXIT CODES:
  0  every declaration is implemented
  1  missing, ambiguous or duplicate bindings were found
  2  the project root is invalid or the run failed

CONFIG:
  <ROOT>/.jnicheck.toml, then ~/.config/jnicheck/config.toml, then defaults")]
struct Cli {
  /// Project root to scan
  root: PathBuf,

  /// Use this config file instead of the project and user config
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Report format: text or json
  #[arg(short, long)]
  format: Option<ReportFormat>,

  /// Worker threads (0 = available parallelism)
  #[arg(short, long)]
  jobs: Option<usize>,

  /// Report file name, relative to the root
  #[arg(short, long, value_name = "FILE")]
  output: Option<String>,

  /// Print the report without saving it under the root
  #[arg(long)]
  no_write: bool,

  /// Treat matches satisfied only by forward declarations as missing
  #[arg(long)]
  require_definitions: bool,

  /// Fail the run when orphaned bridge functions are found
  #[arg(long)]
  fail_on_orphans: bool,

  /// Print the effective config as TOML and exit
  #[arg(long)]
  print_config: bool,

  /// More logging (repeatable)
  #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
  verbose: u8,

  /// Less logging (repeatable)
  #[arg(short, long, action = ArgAction::Count)]
  quiet: u8,
}

impl Cli {
  fn load_config(&self) -> Result<Config> {
    let mut config = match &self.config {
      Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))?,
      None => Config::load_for_project(&self.root),
    };

    if let Some(format) = self.format {
      config.report.format = format;
    }
    if let Some(jobs) = self.jobs {
      config.scan.jobs = jobs;
    }
    if let Some(output) = &self.output {
      config.report.file = output.clone();
    }
    if self.no_write {
      config.report.write = false;
    }
    if self.require_definitions {
      config.check.require_definitions = true;
    }
    if self.fail_on_orphans {
      config.check.fail_on_orphans = true;
    }
    Ok(config)
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  match run(&cli) {
    Ok(code) => code,
    Err(err) => {
      eprintln!("jnicheck: {:#}", err);
      ExitCode::from(EXIT_ERROR)
    }
  }
}

fn run(cli: &Cli) -> Result<ExitCode> {
  let config = cli.load_config()?;
  logging::init_logging(logging::adjust_level(
    logging::parse_log_level(&config.log.level),
    cli.verbose,
    cli.quiet,
  ));

  if cli.print_config {
    print!("{}", config.to_toml());
    return Ok(ExitCode::SUCCESS);
  }

  let analysis = Pipeline::new(&config)
    .run(&cli.root)
    .with_context(|| format!("Failed to analyze {}", cli.root.display()))?;

  let rendered = format::render(config.report.format, &analysis, Utc::now()).context("Failed to render report")?;
  let mut stdout = std::io::stdout().lock();
  writeln!(stdout, "{}", rendered.trim_end()).context("Failed to write report")?;

  if config.report.write {
    let path = report::report_path(&cli.root, &config.report);
    report::write_report(&path, &rendered).with_context(|| format!("Failed to save report to {}", path.display()))?;
    info!(path = %path.display(), "Report saved");
  }

  let summary = &analysis.summary.results;
  if analysis.has_failures(config.check.fail_on_orphans) {
    warn!(
      missing = summary.missing,
      ambiguous = summary.ambiguous,
      duplicates = summary.duplicate_declarations,
      orphaned = summary.orphaned,
      "JNI validation failed"
    );
    return Ok(ExitCode::from(EXIT_FINDINGS));
  }

  info!(matched = summary.matched, "All native methods have implementations");
  Ok(ExitCode::SUCCESS)
}
