//! Scoring configuration with sane defaults, plus the optional YAML files that
//! override it from the repository root.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ConfigError;

pub const CRITICAL_MODULES_FILE: &str = ".critical_modules.yml";
pub const TEST_MAP_FILE: &str = ".testmap.yml";
pub const PROFILER_FILE: &str = ".risk_profiler.yml";

/// Per-signal weights. Missing keys in an override file keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeightTable {
  /// Flat cost per changed file.
  pub file_changed: f64,
  /// Multiplier on the change-wide added + deleted line count.
  pub lines_changed: f64,
  pub critical_module: f64,
  /// Multiplier on the file's bug-commit count.
  pub bug_commit: f64,
  pub complexity_increase: f64,
  /// Usually negative: test-only changes lower the score.
  pub test_file_penalty: f64,
}

impl Default for WeightTable {
  fn default() -> Self {
    Self {
      file_changed: 2.0,
      lines_changed: 0.1,
      critical_module: 15.0,
      bug_commit: 3.0,
      complexity_increase: 10.0,
      test_file_penalty: -5.0,
    }
  }
}

/// Everything the scorer and history miner need, as one immutable value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
  pub weights: WeightTable,
  /// Average complexity strictly above this adds `complexity_increase`.
  pub complexity_threshold: f64,
  /// Lower-case substrings marking a commit message as a bug fix.
  pub bug_keywords: Vec<String>,
  /// Lower-case substring marking a path as a test file.
  pub test_marker: String,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self {
      weights: WeightTable::default(),
      complexity_threshold: 10.0,
      bug_keywords: ["fix", "bug", "issue", "hotfix"]
        .into_iter()
        .map(String::from)
        .collect(),
      test_marker: "test".to_string(),
    }
  }
}

impl ScoringConfig {
  pub fn with_weights(weights: WeightTable) -> Self {
    Self {
      weights,
      ..Self::default()
    }
  }

  /// Case-insensitive substring check against the test marker.
  pub fn is_test_path(&self, path: &str) -> bool {
    path.to_lowercase().contains(&self.test_marker.to_lowercase())
  }

  /// True if the message contains any bug keyword (case-insensitive substring).
  pub fn is_bug_message(&self, message: &str) -> bool {
    let msg = message.to_lowercase();
    self
      .bug_keywords
      .iter()
      .any(|k| !k.is_empty() && msg.contains(&k.to_lowercase()))
  }
}

/// Ordered set of high-impact path prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalModules(Vec<String>);

impl CriticalModules {
  pub fn new<I, S>(prefixes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(crate::types::dedupe_paths(prefixes))
  }

  /// A path is critical if any prefix is a string prefix of it.
  pub fn matches(&self, path: &str) -> bool {
    self.0.iter().any(|prefix| path.starts_with(prefix.as_str()))
  }

  pub fn prefixes(&self) -> &[String] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Path prefix → suggested test identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TestMap(BTreeMap<String, BTreeSet<String>>);

impl TestMap {
  pub fn new<I, P, T, S>(entries: I) -> Self
  where
    I: IntoIterator<Item = (P, T)>,
    P: Into<String>,
    T: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (prefix, tests) in entries {
      map
        .entry(prefix.into())
        .or_default()
        .extend(tests.into_iter().map(Into::into));
    }
    Self(map)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
    self.0.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub scoring: ScoringConfig,
  pub critical_modules: CriticalModules,
  pub test_map: TestMap,
  /// Prior references to diff against when the event has no usable revisions.
  pub base_refs: Vec<String>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      scoring: ScoringConfig::default(),
      critical_modules: CriticalModules::default(),
      test_map: TestMap::default(),
      base_refs: vec!["origin/main".to_string(), "HEAD~1".to_string()],
    }
  }
}

// ---------------------------------------------------------------------------
// YAML file shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct CriticalModulesFile {
  #[serde(default)]
  critical_modules: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TestMapFile {
  #[serde(default)]
  mappings: Option<TestMap>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfilerFile {
  weights: Option<WeightTable>,
  complexity_threshold: Option<f64>,
  bug_keywords: Option<Vec<String>>,
  base_refs: Option<Vec<String>>,
}

/// Read a YAML file; a missing, empty or comment-only file yields `T::default()`.
fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
  let raw = match fs::read_to_string(path) {
    Ok(raw) => raw,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
    Err(source) => {
      return Err(ConfigError::Io {
        path: path.to_path_buf(),
        source,
      })
    }
  };
  let has_content = raw
    .lines()
    .map(str::trim)
    .any(|l| !l.is_empty() && !l.starts_with('#') && l != "---");
  if !has_content {
    return Ok(T::default());
  }
  serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
    path: path.to_path_buf(),
    source,
  })
}

pub fn load_critical_modules(path: &Path) -> Result<CriticalModules, ConfigError> {
  let file: CriticalModulesFile = read_yaml(path)?;
  Ok(CriticalModules::new(file.critical_modules.unwrap_or_default()))
}

pub fn load_test_map(path: &Path) -> Result<TestMap, ConfigError> {
  let file: TestMapFile = read_yaml(path)?;
  Ok(file.mappings.unwrap_or_default())
}

/// Apply `.risk_profiler.yml` overrides on top of `base`.
pub fn load_overrides(path: &Path, base: Settings) -> Result<Settings, ConfigError> {
  let file: ProfilerFile = read_yaml(path)?;
  let mut settings = base;
  if let Some(weights) = file.weights {
    settings.scoring.weights = weights;
  }
  if let Some(threshold) = file.complexity_threshold {
    settings.scoring.complexity_threshold = threshold;
  }
  if let Some(keywords) = file.bug_keywords {
    settings.scoring.bug_keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
  }
  if let Some(refs) = file.base_refs {
    settings.base_refs = crate::types::dedupe_paths(refs);
  }
  Ok(settings)
}

impl Settings {
  /// Load all configuration files under `repo_root`. Never fails: an unreadable
  /// or malformed file is logged and its defaults are kept.
  pub fn load(repo_root: &Path) -> Self {
    let mut settings = Settings::default();

    match load_overrides(&repo_root.join(PROFILER_FILE), settings.clone()) {
      Ok(s) => settings = s,
      Err(e) => tracing::warn!(error = %e, "ignoring profiler overrides"),
    }
    match load_critical_modules(&repo_root.join(CRITICAL_MODULES_FILE)) {
      Ok(c) => settings.critical_modules = c,
      Err(e) => tracing::warn!(error = %e, "ignoring critical module list"),
    }
    match load_test_map(&repo_root.join(TEST_MAP_FILE)) {
      Ok(m) => settings.test_map = m,
      Err(e) => tracing::warn!(error = %e, "ignoring test map"),
    }

    tracing::debug!(
      critical_prefixes = settings.critical_modules.prefixes().len(),
      test_map_entries = settings.test_map.iter().count(),
      base_refs = ?settings.base_refs,
      "settings loaded"
    );
    settings
  }
}
