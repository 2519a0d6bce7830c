//! CI change-event payload (GitHub `pull_request` event). Unknown fields are ignored.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEvent {
  #[serde(default)]
  pub pull_request: Option<PullRequest>,
  #[serde(default)]
  pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
  #[serde(default)]
  pub number: Option<u64>,
  #[serde(default)]
  pub files: Vec<EventFile>,
  #[serde(default)]
  pub base: Option<GitRef>,
  #[serde(default)]
  pub head: Option<GitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventFile {
  pub filename: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitRef {
  #[serde(default)]
  pub sha: Option<String>,
  #[serde(default, rename = "ref")]
  pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
  pub full_name: String,
}

impl PullRequestEvent {
  /// Read the payload; a missing or malformed file means "no event".
  pub fn from_path(path: &Path) -> Option<Self> {
    let raw = match fs::read_to_string(path) {
      Ok(raw) => raw,
      Err(e) => {
        tracing::debug!(path = %path.display(), error = %e, "no event payload");
        return None;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(event) => Some(event),
      Err(e) => {
        tracing::warn!(path = %path.display(), error = %e, "malformed event payload");
        None
      }
    }
  }

  /// Explicit changed-path list, if the payload carries one.
  pub fn file_list(&self) -> Vec<String> {
    self
      .pull_request
      .as_ref()
      .map(|pr| pr.files.iter().map(|f| f.filename.clone()).collect())
      .unwrap_or_default()
  }

  /// `(base, head)` commit ids when both are present and non-empty.
  pub fn revisions(&self) -> Option<(String, String)> {
    let pr = self.pull_request.as_ref()?;
    let base = pr.base.as_ref()?.sha.as_deref()?.trim();
    let head = pr.head.as_ref()?.sha.as_deref()?.trim();
    if base.is_empty() || head.is_empty() {
      return None;
    }
    Some((base.to_string(), head.to_string()))
  }

  /// Branch the PR targets (`base.ref`), if named.
  pub fn base_ref(&self) -> Option<&str> {
    let name = self.pull_request.as_ref()?.base.as_ref()?.name.as_deref()?.trim();
    (!name.is_empty()).then_some(name)
  }

  pub fn number(&self) -> Option<u64> {
    self.pull_request.as_ref()?.number
  }

  pub fn repository(&self) -> Option<&str> {
    self.repository.as_ref().map(|r| r.full_name.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_pull_request_payload() {
    let json = r#"{
      "action": "synchronize",
      "pull_request": {
        "number": 42,
        "files": [{"filename": "src/a.rs"}, {"filename": "src/b.rs"}],
        "base": {"sha": "abc", "ref": "main"},
        "head": {"sha": "def", "ref": "feature"}
      },
      "repository": {"full_name": "acme/widgets"}
    }"#;
    let event: PullRequestEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.number(), Some(42));
    assert_eq!(event.repository(), Some("acme/widgets"));
    assert_eq!(event.file_list(), vec!["src/a.rs", "src/b.rs"]);
    assert_eq!(event.revisions(), Some(("abc".into(), "def".into())));
    assert_eq!(event.base_ref(), Some("main"));
  }

  #[test]
  fn push_event_has_no_revisions_or_files() {
    let event: PullRequestEvent =
      serde_json::from_str(r#"{"ref": "refs/heads/main", "after": "abc"}"#).unwrap();
    assert!(event.file_list().is_empty());
    assert!(event.revisions().is_none());
    assert!(event.number().is_none());
    assert!(event.base_ref().is_none());
  }

  #[test]
  fn missing_payload_file_is_none() {
    assert!(PullRequestEvent::from_path(Path::new("/nonexistent/event.json")).is_none());
  }
}
