//! Bug-fix history mining from commit messages.

use crate::config::ScoringConfig;
use crate::error::ScmError;
use crate::git::GitRunner;

/// Record separator placed before every subject.
const RECORD_SEP: char = '\u{1e}';

/// Subject lines of the commits touching `path`, following renames, newest
/// first. Bodies and trailers are not read.
pub fn commit_messages<G: GitRunner>(git: &G, path: &str) -> Result<Vec<String>, ScmError> {
  let out = git.run(&["log", "--follow", "--format=%x1e%s", "--", path])?;
  Ok(
    out
      .split(RECORD_SEP)
      .map(str::trim)
      .filter(|m| !m.is_empty())
      .map(String::from)
      .collect(),
  )
}

/// Number of commits whose message contains any bug keyword. A message with
/// several keywords counts once. No history or a failed lookup is 0.
pub fn count_bug_commits<G: GitRunner>(git: &G, path: &str, config: &ScoringConfig) -> u32 {
  match commit_messages(git, path) {
    Ok(messages) => {
      let count = messages.iter().filter(|m| config.is_bug_message(m)).count();
      u32::try_from(count).unwrap_or(u32::MAX)
    }
    Err(e) => {
      tracing::debug!(path, error = %e, "no commit history");
      0
    }
  }
}
