//! PR Risk Engine: rule-based regression risk for a code change; no AI, no DB,
//! no network beyond fetching a missing comparison base.
//!
//! Resolves the change set from git, collects per-file signals (bug-fix history,
//! average cyclomatic complexity, critical-module match, test-path heuristic),
//! folds them into a bounded 0–100 score with a Low/Medium/High level, and maps
//! changed paths to suggested tests.
//!
//! Every degraded path resolves to a best-effort [`RiskReport`]; nothing here
//! returns an error to the caller.

pub mod change_set;
pub mod complexity;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod git;
pub mod history;
pub mod score;
pub mod suggest;
pub mod types;

pub use change_set::{ChangeSetResolver, Strategy};
pub use complexity::{ComplexityAnalyzer, FunctionComplexity, TreeSitterAnalyzer};
pub use config::{CriticalModules, ScoringConfig, Settings, TestMap, WeightTable};
pub use engine::Profiler;
pub use error::{ComplexityError, ConfigError, ScmError};
pub use event::PullRequestEvent;
pub use git::{GitRunner, SystemGit};
pub use types::{ChangeSet, FileContribution, FileSignal, RiskLevel, RiskReport, ScoreTerms};

use chrono::{DateTime, Utc};

/// Score collected signals and assemble the report (no I/O).
pub fn run(change_set: &ChangeSet, signals: &[FileSignal], settings: &Settings) -> RiskReport {
  run_at(change_set, signals, settings, Utc::now())
}

/// [`run`] with an explicit timestamp.
pub fn run_at(
  change_set: &ChangeSet,
  signals: &[FileSignal],
  settings: &Settings,
  generated_at: DateTime<Utc>,
) -> RiskReport {
  let files = score::score_breakdown(change_set, signals, &settings.scoring);
  let score = score::clamp_score(files.iter().map(|c| c.total).sum());
  let level = score::level(score);
  let suggested_tests = suggest::suggest(change_set.files(), &settings.test_map);

  tracing::info!(
    score,
    level = %level,
    files = change_set.len(),
    suggested_tests = suggested_tests.len(),
    "risk scored"
  );

  RiskReport {
    report_id: report_id(change_set.files(), score),
    generated_at: generated_at.to_rfc3339(),
    score,
    level,
    origin: change_set.origin().map(String::from),
    lines_added: change_set.lines_added(),
    lines_deleted: change_set.lines_deleted(),
    changed_files: change_set.files().to_vec(),
    suggested_tests,
    files,
  }
}

/// Stable report id: hash of the sorted changed paths + score.
fn report_id(files: &[String], score: u8) -> String {
  let mut sorted: Vec<&str> = files.iter().map(String::as_str).collect();
  sorted.sort_unstable();

  let mut hasher = blake3::Hasher::new();
  for file in sorted {
    hasher.update(file.as_bytes());
    hasher.update(b"|");
  }
  hasher.update(&[score]);
  let hex = hasher.finalize().to_hex();
  format!("rpt-{}", &hex[..16])
}
