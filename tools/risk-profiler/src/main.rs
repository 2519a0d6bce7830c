//! risk-profiler: estimate the regression risk of a pull request and suggest tests.
//!
//! Usage:
//!   risk-profiler                       # score, post PR comment, print on failure
//!   risk-profiler --no-comment          # score and print locally
//!   risk-profiler --format json         # JSON instead of Markdown on stdout
//!
//! Advisory only: exits 0 whenever a report was produced, however degraded.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use risk_engine::{Profiler, PullRequestEvent, Settings, SystemGit, TreeSitterAnalyzer};
use risk_profiler::{
  deliver_with_fallback, Deliver, GithubCommentSink, GithubContext, OutputFormat, StdoutSink,
};

#[derive(Debug, Parser)]
#[command(name = "risk-profiler", version, about)]
struct Cli {
  /// Repository checkout to analyze
  #[arg(long, default_value = ".")]
  repo: PathBuf,

  /// CI event payload (GitHub pull_request event JSON)
  #[arg(long, env = "GITHUB_EVENT_PATH")]
  event_path: Option<PathBuf>,

  /// Prior reference to diff against; repeatable, tried in order.
  /// Replaces `base_refs` from .risk_profiler.yml.
  #[arg(long = "base-ref", value_name = "REF")]
  base_refs: Vec<String>,

  /// Format of the local (stdout) report
  #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
  format: OutputFormat,

  /// Do not post a PR comment; print the report locally
  #[arg(long)]
  no_comment: bool,

  /// Verbose logging
  #[arg(short, long, conflicts_with = "quiet")]
  verbose: bool,

  /// Errors only
  #[arg(short, long)]
  quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
  let filter = if quiet {
    "error"
  } else if verbose {
    "debug"
  } else {
    "warn"
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
    .init();
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  setup_logging(cli.verbose, cli.quiet);

  let mut settings = Settings::load(&cli.repo);
  if !cli.base_refs.is_empty() {
    settings.base_refs = cli.base_refs.clone();
  }

  let event = cli
    .event_path
    .as_deref()
    .and_then(PullRequestEvent::from_path);

  let git = SystemGit::new(&cli.repo);
  let analyzer = TreeSitterAnalyzer;
  let report = Profiler::new(&git, &analyzer, &settings, &cli.repo).profile(event.as_ref());

  let stdout = StdoutSink::new(cli.format);
  if cli.no_comment {
    stdout.deliver(&report)?;
    return Ok(());
  }

  let sink = GithubContext::from_env(event.as_ref()).and_then(GithubCommentSink::new);
  match sink {
    Ok(github) => deliver_with_fallback(&github, &stdout, &report)?,
    Err(e) => {
      tracing::warn!(error = %e, "cannot post PR comment; printing report locally");
      stdout.deliver(&report)?;
    }
  }
  Ok(())
}
