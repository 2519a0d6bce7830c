//! Weighted risk score (0–100), per-file breakdown, and risk level.

use std::collections::HashMap;

use crate::config::ScoringConfig;
use crate::types::{ChangeSet, FileContribution, FileSignal, RiskLevel, ScoreTerms};

/// Weighted terms for one file.
///
/// The line term uses the change-wide `total_lines`, applied once per file.
pub fn file_terms(signal: &FileSignal, total_lines: u64, config: &ScoringConfig) -> ScoreTerms {
  let w = &config.weights;
  ScoreTerms {
    file_changed: w.file_changed,
    lines_changed: total_lines as f64 * w.lines_changed,
    critical_module: if signal.is_critical_module {
      w.critical_module
    } else {
      0.0
    },
    bug_commit: f64::from(signal.bug_commit_count) * w.bug_commit,
    complexity_increase: match signal.avg_complexity {
      Some(c) if c > config.complexity_threshold => w.complexity_increase,
      _ => 0.0,
    },
    test_file_penalty: if signal.is_test_file {
      w.test_file_penalty
    } else {
      0.0
    },
  }
}

/// One contribution per changed file, in change-set order. Files without a
/// collected signal are scored with neutral defaults.
pub fn score_breakdown(
  change_set: &ChangeSet,
  signals: &[FileSignal],
  config: &ScoringConfig,
) -> Vec<FileContribution> {
  let by_path: HashMap<&str, &FileSignal> = signals.iter().map(|s| (s.path.as_str(), s)).collect();
  let total_lines = change_set.total_lines();

  change_set
    .files()
    .iter()
    .map(|path| {
      let signal = match by_path.get(path.as_str()) {
        Some(s) => (*s).clone(),
        None => FileSignal::neutral(path.clone(), config.is_test_path(path)),
      };
      let terms = file_terms(&signal, total_lines, config);
      FileContribution {
        total: terms.total(),
        signal,
        terms,
      }
    })
    .collect()
}

/// Round half away from zero, then clamp into [0, 100]. NaN maps to 0.
pub fn clamp_score(total: f64) -> u8 {
  if total.is_nan() {
    return 0;
  }
  total.round().clamp(0.0, 100.0) as u8
}

/// Final bounded score for the change. An empty change set scores 0.
pub fn score(change_set: &ChangeSet, signals: &[FileSignal], config: &ScoringConfig) -> u8 {
  let total: f64 = score_breakdown(change_set, signals, config)
    .iter()
    .map(|c| c.total)
    .sum();
  clamp_score(total)
}

pub fn level(score: u8) -> RiskLevel {
  RiskLevel::from_score(score)
}
