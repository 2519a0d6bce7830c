//! Profiler: resolves the change set, collects per-file signals from the local
//! checkout, and assembles the report.

use std::path::{Component, Path, PathBuf};

use crate::change_set::ChangeSetResolver;
use crate::complexity::{self, ComplexityAnalyzer};
use crate::config::Settings;
use crate::event::PullRequestEvent;
use crate::git::GitRunner;
use crate::history;
use crate::types::{ChangeSet, FileSignal, RiskReport};

pub struct Profiler<'a, G, A: ?Sized> {
  git: &'a G,
  analyzer: &'a A,
  settings: &'a Settings,
  repo_root: PathBuf,
}

impl<'a, G: GitRunner, A: ComplexityAnalyzer + ?Sized> Profiler<'a, G, A> {
  pub fn new(
    git: &'a G,
    analyzer: &'a A,
    settings: &'a Settings,
    repo_root: impl Into<PathBuf>,
  ) -> Self {
    Self {
      git,
      analyzer,
      settings,
      repo_root: repo_root.into(),
    }
  }

  pub fn repo_root(&self) -> &Path {
    &self.repo_root
  }

  /// Full run: change set → signals → score → suggestions. Never fails.
  pub fn profile(&self, event: Option<&PullRequestEvent>) -> RiskReport {
    let change_set = self.resolve_change_set(event);
    self.report(&change_set)
  }

  pub fn resolve_change_set(&self, event: Option<&PullRequestEvent>) -> ChangeSet {
    ChangeSetResolver::new(self.git, event, &self.settings.base_refs).resolve()
  }

  /// Score an already-resolved change set against the local checkout.
  pub fn report(&self, change_set: &ChangeSet) -> RiskReport {
    let signals = self.collect_signals(change_set);
    crate::run(change_set, &signals, self.settings)
  }

  /// One signal per changed file, in change-set order.
  pub fn collect_signals(&self, change_set: &ChangeSet) -> Vec<FileSignal> {
    change_set
      .files()
      .iter()
      .map(|path| self.signal_for(path))
      .collect()
  }

  pub fn signal_for(&self, path: &str) -> FileSignal {
    let scoring = &self.settings.scoring;
    let signal = FileSignal {
      path: path.to_string(),
      bug_commit_count: history::count_bug_commits(self.git, path, scoring),
      avg_complexity: self
        .checkout_path(path)
        .and_then(|full| complexity::avg_complexity(self.analyzer, &full)),
      is_critical_module: self.settings.critical_modules.matches(path),
      is_test_file: scoring.is_test_path(path),
    };
    tracing::debug!(
      path,
      bug_commits = signal.bug_commit_count,
      complexity = ?signal.avg_complexity,
      critical = signal.is_critical_module,
      test = signal.is_test_file,
      "file signal"
    );
    signal
  }

  /// `path` under the repository root. Absolute paths and `..` components
  /// would leave the checkout and are not analyzed.
  fn checkout_path(&self, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path);
    let inside = relative
      .components()
      .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
      tracing::debug!(path, "path escapes the checkout; complexity skipped");
      return None;
    }
    Some(self.repo_root.join(relative))
  }
}
