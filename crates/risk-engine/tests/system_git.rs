//! End-to-end against a real temporary repository. Skipped when no `git` binary
//! is available.

use std::fs;
use std::path::Path;
use std::process::Command;

use risk_engine::{
  history, ChangeSetResolver, CriticalModules, Profiler, ScoringConfig, Settings, SystemGit,
  TreeSitterAnalyzer,
};
use tempfile::TempDir;

fn git_available() -> bool {
  Command::new("git")
    .arg("--version")
    .output()
    .map(|o| o.status.success())
    .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
  let status = Command::new("git")
    .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
    .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
    .args(args)
    .current_dir(dir)
    .output()
    .unwrap();
  assert!(
    status.status.success(),
    "git {:?}: {}",
    args,
    String::from_utf8_lossy(&status.stderr)
  );
}

fn commit_file(dir: &Path, path: &str, body: &str, message: &str) {
  let full = dir.join(path);
  fs::create_dir_all(full.parent().unwrap()).unwrap();
  fs::write(full, body).unwrap();
  git(dir, &["add", path]);
  git(dir, &["commit", "-q", "-m", message]);
}

#[test]
fn history_and_prior_reference_from_real_repo() {
  if !git_available() {
    eprintln!("git not available; skipping");
    return;
  }
  let dir = TempDir::new().unwrap();
  let root = dir.path();
  git(root, &["init", "-q"]);

  commit_file(root, "src/core/engine.py", "def run():\n    return 1\n", "initial import");
  commit_file(
    root,
    "src/core/engine.py",
    "def run(x):\n    if x:\n        return 1\n    return 0\n",
    "Fix crash when x is None (issue #4)",
  );
  commit_file(root, "README.md", "# engine\n", "docs: readme");

  let system = SystemGit::new(root);
  let bugs = history::count_bug_commits(&system, "src/core/engine.py", &ScoringConfig::default());
  assert_eq!(bugs, 1);
  assert_eq!(
    history::count_bug_commits(&system, "never/committed.py", &ScoringConfig::default()),
    0
  );

  // No origin remote: the chain falls through to HEAD~1.
  let base_refs = vec!["origin/main".to_string(), "HEAD~1".to_string()];
  let cs = ChangeSetResolver::new(&system, None, &base_refs).resolve();
  assert_eq!(cs.origin(), Some("prior-ref:HEAD~1"));
  assert_eq!(cs.files(), ["README.md"]);
  assert_eq!((cs.lines_added(), cs.lines_deleted()), (1, 0));
}

#[test]
fn working_tree_fallback_from_real_repo() {
  if !git_available() {
    eprintln!("git not available; skipping");
    return;
  }
  let dir = TempDir::new().unwrap();
  let root = dir.path();
  git(root, &["init", "-q"]);
  commit_file(root, "src/app.py", "def main():\n    return 0\n", "initial");

  // Single commit: no HEAD~1, so only the working tree status can answer.
  fs::write(root.join("src/app.py"), "def main():\n    return 1\n").unwrap();
  fs::write(root.join("new_test.py"), "def test_x():\n    assert True\n").unwrap();

  let settings = Settings::default();
  let system = SystemGit::new(root);
  let analyzer = TreeSitterAnalyzer;
  let report = Profiler::new(&system, &analyzer, &settings, root).profile(None);

  assert_eq!(report.origin.as_deref(), Some("working-tree"));
  let mut files = report.changed_files.clone();
  files.sort();
  assert_eq!(files, ["new_test.py", "src/app.py"]);
  assert_eq!(report.lines_added + report.lines_deleted, 0);
  // (2) + (2 - 5) with no line delta or history signals.
  assert_eq!(report.score, 0);
  assert!(report
    .files
    .iter()
    .all(|f| f.signal.avg_complexity == Some(1.0)));
}

#[test]
fn non_ascii_path_keeps_its_identity() {
  if !git_available() {
    eprintln!("git not available; skipping");
    return;
  }
  let dir = TempDir::new().unwrap();
  let root = dir.path();
  git(root, &["init", "-q"]);
  commit_file(root, "README.md", "# app\n", "initial");
  commit_file(
    root,
    "src/core/naïve.py",
    "def run(x):\n    return x or 0\n",
    "fix bug in naive runner",
  );
  commit_file(
    root,
    "src/core/naïve.py",
    "def run(x):\n    return x\n",
    "Add widget\n\nCloses issue #3 from the tracker",
  );

  let settings = Settings {
    critical_modules: CriticalModules::new(["src/core"]),
    base_refs: vec!["HEAD~2".to_string()],
    ..Settings::default()
  };
  let system = SystemGit::new(root);
  let analyzer = TreeSitterAnalyzer;
  let report = Profiler::new(&system, &analyzer, &settings, root).profile(None);

  assert_eq!(report.origin.as_deref(), Some("prior-ref:HEAD~2"));
  assert_eq!(report.changed_files, ["src/core/naïve.py"]);
  let signal = &report.files[0].signal;
  assert!(signal.is_critical_module);
  // Only the subject of the first change mentions a fix.
  assert_eq!(signal.bug_commit_count, 1);
  assert_eq!(signal.avg_complexity, Some(1.0));
}

#[test]
fn untracked_directories_list_every_file() {
  if !git_available() {
    eprintln!("git not available; skipping");
    return;
  }
  let dir = TempDir::new().unwrap();
  let root = dir.path();
  git(root, &["init", "-q"]);
  commit_file(root, "README.md", "# app\n", "initial");

  fs::create_dir_all(root.join("src/newpkg")).unwrap();
  fs::write(root.join("src/newpkg/a.py"), "def a():\n    return 1\n").unwrap();
  fs::write(root.join("src/newpkg/b.py"), "def b():\n    return 2\n").unwrap();
  fs::write(root.join("src/newpkg/ünï.py"), "def c():\n    return 3\n").unwrap();

  let system = SystemGit::new(root);
  let cs = ChangeSetResolver::new(&system, None, &["HEAD~1".to_string()]).resolve();

  assert_eq!(cs.origin(), Some("working-tree"));
  let mut files = cs.files().to_vec();
  files.sort();
  assert_eq!(
    files,
    ["src/newpkg/a.py", "src/newpkg/b.py", "src/newpkg/ünï.py"]
  );
}
