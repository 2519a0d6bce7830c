//! Core types for the risk engine (change set, per-file signals, report contract).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Change set
// ---------------------------------------------------------------------------

/// Paths changed between a base and a head state, plus the aggregate line delta
/// for the whole change (not per file). Built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
  files: Vec<String>,
  lines_added: u64,
  lines_deleted: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  origin: Option<String>,
}

impl ChangeSet {
  /// Build a change set; duplicate and blank paths are dropped, first-seen order kept.
  pub fn new<I, S>(files: I, lines_added: u64, lines_deleted: u64) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      files: dedupe_paths(files),
      lines_added,
      lines_deleted,
      origin: None,
    }
  }

  /// Empty change set with zero line delta.
  pub fn empty() -> Self {
    Self::default()
  }

  /// Record which strategy produced the path list.
  pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
    self.origin = Some(origin.into());
    self
  }

  pub fn files(&self) -> &[String] {
    &self.files
  }

  pub fn lines_added(&self) -> u64 {
    self.lines_added
  }

  pub fn lines_deleted(&self) -> u64 {
    self.lines_deleted
  }

  /// Added + deleted across the whole change.
  pub fn total_lines(&self) -> u64 {
    self.lines_added.saturating_add(self.lines_deleted)
  }

  pub fn origin(&self) -> Option<&str> {
    self.origin.as_deref()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }
}

pub(crate) fn dedupe_paths<I, S>(files: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for file in files {
    let file: String = file.into();
    let file = file.trim();
    if file.is_empty() || !seen.insert(file.to_string()) {
      continue;
    }
    out.push(file.to_string());
  }
  out
}

// ---------------------------------------------------------------------------
// Per-file signals
// ---------------------------------------------------------------------------

/// Signals collected for one changed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSignal {
  pub path: String,
  #[serde(default)]
  pub bug_commit_count: u32,
  /// Mean cyclomatic complexity; `None` when the file could not be analyzed.
  #[serde(default)]
  pub avg_complexity: Option<f64>,
  #[serde(default)]
  pub is_critical_module: bool,
  #[serde(default)]
  pub is_test_file: bool,
}

impl FileSignal {
  /// Signal with no history, no complexity and no critical match.
  pub fn neutral(path: impl Into<String>, is_test_file: bool) -> Self {
    Self {
      path: path.into(),
      bug_commit_count: 0,
      avg_complexity: None,
      is_critical_module: false,
      is_test_file,
    }
  }
}

// ---------------------------------------------------------------------------
// Risk level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  /// Fixed step function: `..=30` Low, `31..=70` Medium, `71..` High.
  pub fn from_score(score: u8) -> Self {
    match score {
      0..=30 => Self::Low,
      31..=70 => Self::Medium,
      _ => Self::High,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "Low",
      Self::Medium => "Medium",
      Self::High => "High",
    }
  }
}

impl fmt::Display for RiskLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Score breakdown
// ---------------------------------------------------------------------------

/// Weighted terms one file added to the raw (unrounded, unclamped) total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreTerms {
  pub file_changed: f64,
  pub lines_changed: f64,
  pub critical_module: f64,
  pub bug_commit: f64,
  pub complexity_increase: f64,
  pub test_file_penalty: f64,
}

impl ScoreTerms {
  pub fn total(&self) -> f64 {
    self.file_changed
      + self.lines_changed
      + self.critical_module
      + self.bug_commit
      + self.complexity_increase
      + self.test_file_penalty
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileContribution {
  #[serde(flatten)]
  pub signal: FileSignal,
  pub terms: ScoreTerms,
  pub total: f64,
}

// ---------------------------------------------------------------------------
// Output (JSON contract consumed by the reporter)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
  pub report_id: String,
  pub generated_at: String,
  pub score: u8,
  pub level: RiskLevel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub origin: Option<String>,
  pub lines_added: u64,
  pub lines_deleted: u64,
  pub changed_files: Vec<String>,
  pub suggested_tests: BTreeSet<String>,
  pub files: Vec<FileContribution>,
}
