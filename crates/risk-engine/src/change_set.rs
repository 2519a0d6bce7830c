//! Change-set resolution: an ordered chain of named strategies for "what changed",
//! plus the change-wide line delta.
//!
//! Every failure degrades to the next strategy; exhausting the chain yields an
//! empty change set instead of an error.

use crate::error::ScmError;
use crate::event::PullRequestEvent;
use crate::git::GitRunner;
use crate::types::{dedupe_paths, ChangeSet};

/// One way of discovering changed paths, tried in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
  /// Explicit, non-empty path list carried by the CI event.
  EventFileList,
  /// Name-status diff between the event's base and head commits.
  EventRevisions,
  /// Name-only diff of `HEAD` against a named prior reference.
  PriorReference(String),
  /// Uncommitted changes, untracked files listed individually.
  WorkingTree,
}

impl Strategy {
  pub fn name(&self) -> String {
    match self {
      Self::EventFileList => "event-file-list".to_string(),
      Self::EventRevisions => "event-revisions".to_string(),
      Self::PriorReference(r) => format!("prior-ref:{}", r),
      Self::WorkingTree => "working-tree".to_string(),
    }
  }

  /// Run the strategy. An unmet precondition is `ScmError::Unavailable`.
  pub fn changed_paths<G: GitRunner>(
    &self,
    git: &G,
    event: Option<&PullRequestEvent>,
  ) -> Result<Vec<String>, ScmError> {
    match self {
      Self::EventFileList => {
        let files = event.map(PullRequestEvent::file_list).unwrap_or_default();
        if files.is_empty() {
          return Err(ScmError::unavailable("event carries no file list"));
        }
        Ok(dedupe_paths(files))
      }
      Self::EventRevisions => {
        let (base, head) = event
          .and_then(PullRequestEvent::revisions)
          .ok_or_else(|| ScmError::unavailable("event carries no base/head revisions"))?;
        ensure_commit(git, &base);
        ensure_commit(git, &head);
        let range = format!("{}...{}", base, head);
        let out = git.run(&["diff", "--name-status", "-z", &range])?;
        Ok(parse_name_status(&out))
      }
      Self::PriorReference(reference) => {
        let range = format!("{}...HEAD", reference);
        let out = git.run(&["diff", "--name-only", "-z", &range])?;
        Ok(parse_name_only(&out))
      }
      Self::WorkingTree => {
        let out = git.run(&["status", "--porcelain", "-z", "--untracked-files=all"])?;
        Ok(parse_porcelain(&out))
      }
    }
  }
}

/// Default chain: event list, event revisions, each prior reference, working tree.
pub fn default_chain(base_refs: &[String]) -> Vec<Strategy> {
  let mut chain = vec![Strategy::EventFileList, Strategy::EventRevisions];
  chain.extend(base_refs.iter().cloned().map(Strategy::PriorReference));
  chain.push(Strategy::WorkingTree);
  chain
}

/// Fetch a commit from `origin` when the (possibly shallow) clone lacks it.
/// Failure is tolerated; the diff that needs the commit will fail instead.
fn ensure_commit<G: GitRunner>(git: &G, sha: &str) {
  let object = format!("{}^{{commit}}", sha);
  if git.run(&["cat-file", "-e", &object]).is_ok() {
    return;
  }
  if let Err(e) = git.run(&["fetch", "--no-tags", "--quiet", "origin", sha]) {
    tracing::debug!(sha, error = %e, "fetch of missing revision failed");
  }
}

/// Prior references to try: the PR's target branch on `origin` first, then the
/// configured ones, without repeats.
pub fn prior_refs(event: Option<&PullRequestEvent>, base_refs: &[String]) -> Vec<String> {
  let target = event
    .and_then(PullRequestEvent::base_ref)
    .map(|name| format!("origin/{}", name));
  let mut refs: Vec<String> = Vec::with_capacity(base_refs.len() + 1);
  for candidate in target.into_iter().chain(base_refs.iter().cloned()) {
    if !refs.contains(&candidate) {
      refs.push(candidate);
    }
  }
  refs
}

pub struct ChangeSetResolver<'a, G> {
  git: &'a G,
  event: Option<&'a PullRequestEvent>,
  prior_refs: Vec<String>,
  chain: Vec<Strategy>,
}

impl<'a, G: GitRunner> ChangeSetResolver<'a, G> {
  pub fn new(git: &'a G, event: Option<&'a PullRequestEvent>, base_refs: &[String]) -> Self {
    let prior_refs = prior_refs(event, base_refs);
    let chain = default_chain(&prior_refs);
    Self {
      git,
      event,
      prior_refs,
      chain,
    }
  }

  /// Resolve the change set. Never fails.
  pub fn resolve(&self) -> ChangeSet {
    let Some((strategy, paths)) = self.changed_paths() else {
      tracing::warn!("no strategy could determine changed files; using an empty change set");
      return ChangeSet::empty();
    };
    let (added, deleted) = self.line_delta();
    let change_set = ChangeSet::new(paths, added, deleted).with_origin(strategy.name());
    tracing::info!(
      strategy = %strategy.name(),
      files = change_set.len(),
      lines_added = added,
      lines_deleted = deleted,
      "change set resolved"
    );
    change_set
  }

  /// First strategy in the chain that succeeds, with its paths.
  pub fn changed_paths(&self) -> Option<(Strategy, Vec<String>)> {
    for strategy in &self.chain {
      match strategy.changed_paths(self.git, self.event) {
        Ok(paths) => return Some((strategy.clone(), paths)),
        Err(e) => tracing::debug!(strategy = %strategy.name(), error = %e, "strategy failed"),
      }
    }
    None
  }

  /// `(base, head)` pairs to try for the numeric diff, best first.
  pub fn comparisons(&self) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Some(revs) = self.event.and_then(PullRequestEvent::revisions) {
      out.push(revs);
    }
    for reference in &self.prior_refs {
      out.push((reference.clone(), "HEAD".to_string()));
    }
    out
  }

  /// Aggregate added/deleted lines from the first comparison that diffs cleanly;
  /// `(0, 0)` when none does.
  pub fn line_delta(&self) -> (u64, u64) {
    for (base, head) in self.comparisons() {
      if head != "HEAD" {
        ensure_commit(self.git, &base);
        ensure_commit(self.git, &head);
      }
      let range = format!("{}...{}", base, head);
      match self.git.run(&["diff", "--numstat", &range]) {
        Ok(out) => return parse_numstat(&out),
        Err(e) => tracing::debug!(range = %range, error = %e, "numstat diff failed"),
      }
    }
    (0, 0)
  }
}

// The path parsers below read `-z` output: fields are NUL-terminated and paths
// are verbatim, never C-quoted.

fn nul_fields(out: &str) -> impl Iterator<Item = &str> {
  out.split('\0').filter(|f| !f.is_empty())
}

/// Paths from `diff --name-only -z`.
pub fn parse_name_only(out: &str) -> Vec<String> {
  dedupe_paths(nul_fields(out))
}

/// Paths from `diff --name-status -z`. The status field is dropped; renames and
/// copies carry source then destination, and keep the destination.
pub fn parse_name_status(out: &str) -> Vec<String> {
  let mut fields = nul_fields(out);
  let mut paths = Vec::new();
  while let Some(status) = fields.next() {
    let Some(path) = fields.next() else { break };
    if status.starts_with(|c: char| matches!(c, 'R' | 'C')) {
      match fields.next() {
        Some(to) => paths.push(to),
        None => break,
      }
    } else {
      paths.push(path);
    }
  }
  dedupe_paths(paths)
}

/// Paths from `status --porcelain -z` (v1). Entries are `XY <path>`; a rename or
/// copy is followed by a field holding the original path, which is skipped.
pub fn parse_porcelain(out: &str) -> Vec<String> {
  let mut fields = nul_fields(out);
  let mut paths = Vec::new();
  while let Some(entry) = fields.next() {
    let (Some(status), Some(path)) = (entry.get(..2), entry.get(3..)) else {
      tracing::debug!(entry, "skipping malformed status entry");
      continue;
    };
    if status.contains(|c: char| matches!(c, 'R' | 'C')) {
      fields.next();
    }
    if !path.is_empty() {
      paths.push(path);
    }
  }
  dedupe_paths(paths)
}

/// Sum `--numstat` output. Binary entries (`-`) count as zero; malformed lines
/// are skipped.
pub fn parse_numstat(out: &str) -> (u64, u64) {
  let mut added = 0u64;
  let mut deleted = 0u64;
  for line in out.lines().filter(|l| !l.trim().is_empty()) {
    let mut fields = line.splitn(3, '\t');
    let (Some(a), Some(d), Some(_path)) = (fields.next(), fields.next(), fields.next()) else {
      tracing::debug!(line, "skipping malformed numstat line");
      continue;
    };
    match (parse_count(a), parse_count(d)) {
      (Some(a), Some(d)) => {
        added = added.saturating_add(a);
        deleted = deleted.saturating_add(d);
      }
      _ => tracing::debug!(line, "skipping malformed numstat line"),
    }
  }
  (added, deleted)
}

fn parse_count(field: &str) -> Option<u64> {
  match field.trim() {
    "-" => Some(0),
    n => n.parse().ok(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::git::fake::ScriptedGit;
  use pretty_assertions::assert_eq;

  fn pr_event(files: &[&str], revs: Option<(&str, &str)>) -> PullRequestEvent {
    let files: Vec<_> = files
      .iter()
      .map(|f| serde_json::json!({ "filename": f }))
      .collect();
    let mut pr = serde_json::json!({ "number": 7, "files": files });
    if let Some((base, head)) = revs {
      pr["base"] = serde_json::json!({ "sha": base, "ref": "main" });
      pr["head"] = serde_json::json!({ "sha": head });
    }
    serde_json::from_value(serde_json::json!({ "pull_request": pr })).unwrap()
  }

  fn refs(r: &[&str]) -> Vec<String> {
    r.iter().map(|s| s.to_string()).collect()
  }

  const STATUS_CMD: &str = "status --porcelain -z --untracked-files=all";

  #[test]
  fn event_file_list_wins() {
    let git = ScriptedGit::new().ok("diff --numstat origin/main...HEAD", "5\t1\tsrc/a.rs\n");
    let event = pr_event(&["src/a.rs", "src/b.rs", "src/a.rs"], None);
    let base_refs = refs(&["origin/main"]);

    let cs = ChangeSetResolver::new(&git, Some(&event), &base_refs).resolve();
    assert_eq!(cs.files(), ["src/a.rs", "src/b.rs"]);
    assert_eq!(cs.origin(), Some("event-file-list"));
    assert_eq!((cs.lines_added(), cs.lines_deleted()), (5, 1));
    assert!(!git.called(STATUS_CMD));
  }

  #[test]
  fn event_revisions_used_when_no_file_list() {
    let git = ScriptedGit::new()
      .ok("cat-file -e base1^{commit}", "")
      .ok("cat-file -e head1^{commit}", "")
      .ok(
        "diff --name-status -z base1...head1",
        "M\0src/lib.rs\0R087\0src/old.rs\0src/new.rs\0D\0docs/gone.md\0",
      )
      .ok("diff --numstat base1...head1", "10\t2\tsrc/lib.rs\n-\t-\tassets/logo.png\n");
    let event = pr_event(&[], Some(("base1", "head1")));

    let cs = ChangeSetResolver::new(&git, Some(&event), &[]).resolve();
    assert_eq!(cs.files(), ["src/lib.rs", "src/new.rs", "docs/gone.md"]);
    assert_eq!(cs.origin(), Some("event-revisions"));
    assert_eq!((cs.lines_added(), cs.lines_deleted()), (10, 2));
  }

  #[test]
  fn missing_base_is_fetched_before_diffing() {
    let git = ScriptedGit::new()
      .fail("cat-file -e base1^{commit}", "fatal: Not a valid object name")
      .ok("fetch --no-tags --quiet origin base1", "")
      .ok("cat-file -e head1^{commit}", "")
      .ok("diff --name-status -z base1...head1", "A\0src/x.rs\0");
    let event = pr_event(&[], Some(("base1", "head1")));

    let (strategy, paths) = ChangeSetResolver::new(&git, Some(&event), &[])
      .changed_paths()
      .unwrap();
    assert_eq!(strategy, Strategy::EventRevisions);
    assert_eq!(paths, ["src/x.rs"]);
    assert!(git.called("fetch --no-tags --quiet origin base1"));
  }

  #[test]
  fn shallow_clone_degrades_to_prior_reference_then_working_tree() {
    let git = ScriptedGit::new()
      .fail("diff --name-status -z base1...head1", "fatal: no merge base")
      .fail("diff --name-only -z origin/main...HEAD", "fatal: ambiguous argument")
      .fail("diff --name-only -z HEAD~1...HEAD", "fatal: ambiguous argument")
      .ok(STATUS_CMD, " M src/main.rs\0?? notes.txt\0");
    let event = pr_event(&[], Some(("base1", "head1")));
    let base_refs = refs(&["origin/main", "HEAD~1"]);

    let cs = ChangeSetResolver::new(&git, Some(&event), &base_refs).resolve();
    assert_eq!(cs.files(), ["src/main.rs", "notes.txt"]);
    assert_eq!(cs.origin(), Some("working-tree"));
    assert_eq!(cs.total_lines(), 0);
  }

  #[test]
  fn prior_reference_without_event() {
    let git = ScriptedGit::new()
      .fail("diff --name-only -z origin/main...HEAD", "fatal: bad revision")
      .ok("diff --name-only -z HEAD~1...HEAD", "src/a.rs\0src/b.rs\0")
      .ok("diff --numstat HEAD~1...HEAD", "3\t4\tsrc/a.rs\n1\t0\tsrc/b.rs\n");
    let base_refs = refs(&["origin/main", "HEAD~1"]);

    let cs = ChangeSetResolver::new(&git, None, &base_refs).resolve();
    assert_eq!(cs.origin(), Some("prior-ref:HEAD~1"));
    assert_eq!(cs.files(), ["src/a.rs", "src/b.rs"]);
    assert_eq!((cs.lines_added(), cs.lines_deleted()), (4, 4));
  }

  #[test]
  fn all_strategies_failing_yields_empty_change_set() {
    let git = ScriptedGit::new().ok("diff --numstat origin/main...HEAD", "9\t9\tx\n");
    let base_refs = refs(&["origin/main"]);

    let cs = ChangeSetResolver::new(&git, None, &base_refs).resolve();
    assert!(cs.is_empty());
    assert_eq!(cs.total_lines(), 0);
    assert_eq!(cs.origin(), None);
  }

  #[test]
  fn default_chain_order() {
    let chain = default_chain(&refs(&["origin/main", "HEAD~1"]));
    let names: Vec<_> = chain.iter().map(Strategy::name).collect();
    assert_eq!(
      names,
      [
        "event-file-list",
        "event-revisions",
        "prior-ref:origin/main",
        "prior-ref:HEAD~1",
        "working-tree"
      ]
    );
  }

  #[test]
  fn target_branch_is_tried_before_configured_refs() {
    let mut event = pr_event(&[], None);
    event.pull_request.as_mut().unwrap().base = Some(crate::event::GitRef {
      sha: None,
      name: Some("release/2.x".to_string()),
    });
    let git = ScriptedGit::new()
      .ok("diff --name-only -z origin/release/2.x...HEAD", "src/a.rs\0")
      .ok("diff --numstat origin/release/2.x...HEAD", "2\t1\tsrc/a.rs\n");
    let base_refs = refs(&["origin/main", "HEAD~1"]);

    let cs = ChangeSetResolver::new(&git, Some(&event), &base_refs).resolve();
    assert_eq!(cs.origin(), Some("prior-ref:origin/release/2.x"));
    assert_eq!((cs.lines_added(), cs.lines_deleted()), (2, 1));
    assert_eq!(
      prior_refs(Some(&event), &base_refs),
      ["origin/release/2.x", "origin/main", "HEAD~1"]
    );
  }

  #[test]
  fn target_branch_already_configured_is_not_repeated() {
    let event = pr_event(&[], Some(("b", "h")));
    assert_eq!(
      prior_refs(Some(&event), &refs(&["origin/main", "HEAD~1"])),
      ["origin/main", "HEAD~1"]
    );
    assert_eq!(prior_refs(None, &refs(&["HEAD~1"])), ["HEAD~1"]);
  }

  #[test]
  fn paths_with_special_characters_are_verbatim() {
    assert_eq!(
      parse_name_only("src/core/na\u{ef}ve.py\0dir/with space.txt\0"),
      ["src/core/na\u{ef}ve.py", "dir/with space.txt"]
    );
    assert_eq!(
      parse_name_status("A\0src/core/na\u{ef}ve.py\0M\0tab\there.rs\0"),
      ["src/core/na\u{ef}ve.py", "tab\there.rs"]
    );
  }

  #[test]
  fn porcelain_parsing_handles_renames() {
    let out = " M src/a.rs\0R  new/name.rs\0old/name.rs\0?? with space.txt\0A  src/a.rs\0x\0";
    assert_eq!(
      parse_porcelain(out),
      ["src/a.rs", "new/name.rs", "with space.txt"]
    );
  }

  #[test]
  fn numstat_parsing_sums_and_skips_binary() {
    let out = "10\t2\tsrc/a.rs\n-\t-\timg.png\n3\t0\tsrc/b.rs\ngarbage\n";
    assert_eq!(parse_numstat(out), (13, 2));
    assert_eq!(parse_numstat(""), (0, 0));
  }
}
