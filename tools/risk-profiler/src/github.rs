//! GitHub PR comment delivery.

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use risk_engine::{PullRequestEvent, RiskReport};
use serde::Serialize;
use std::time::Duration;

use crate::deliver::Deliver;
use crate::error::DeliveryError;
use crate::render;

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Where and as whom to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubContext {
  pub token: String,
  pub repository: String,
  pub pr_number: u64,
  pub api_url: String,
}

impl GithubContext {
  /// Read `GITHUB_TOKEN`, `GITHUB_REPOSITORY`, `GITHUB_REF` and `GITHUB_API_URL`.
  pub fn from_env(event: Option<&PullRequestEvent>) -> Result<Self, DeliveryError> {
    Self::resolve(
      std::env::var("GITHUB_TOKEN").ok(),
      event,
      std::env::var("GITHUB_REPOSITORY").ok(),
      std::env::var("GITHUB_REF").ok(),
      std::env::var("GITHUB_API_URL").ok(),
    )
  }

  /// The event payload wins; otherwise fall back to the repository and
  /// `refs/pull/<n>/...` environment values.
  pub fn resolve(
    token: Option<String>,
    event: Option<&PullRequestEvent>,
    repository: Option<String>,
    git_ref: Option<String>,
    api_url: Option<String>,
  ) -> Result<Self, DeliveryError> {
    let token = token
      .filter(|t| !t.trim().is_empty())
      .ok_or(DeliveryError::MissingToken)?;

    let repository = event
      .and_then(PullRequestEvent::repository)
      .map(String::from)
      .or(repository)
      .filter(|r| r.contains('/'))
      .ok_or_else(|| DeliveryError::missing_context("repository (owner/name) unknown"))?;

    let pr_number = event
      .and_then(PullRequestEvent::number)
      .or_else(|| git_ref.as_deref().and_then(pr_from_ref))
      .ok_or_else(|| DeliveryError::missing_context("not a pull request run"))?;

    let api_url = api_url
      .filter(|u| !u.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    Ok(Self {
      token,
      repository,
      pr_number,
      api_url,
    })
  }

  pub fn comments_url(&self) -> String {
    format!(
      "{}/repos/{}/issues/{}/comments",
      self.api_url.trim_end_matches('/'),
      self.repository,
      self.pr_number
    )
  }
}

/// PR number from `refs/pull/<n>/merge` (or `/head`).
fn pr_from_ref(git_ref: &str) -> Option<u64> {
  git_ref
    .strip_prefix("refs/pull/")?
    .split('/')
    .next()?
    .parse()
    .ok()
}

#[derive(Serialize)]
struct NewComment<'a> {
  body: &'a str,
}

/// Posts the Markdown report as an issue comment on the PR.
pub struct GithubCommentSink {
  context: GithubContext,
  client: Client,
}

impl GithubCommentSink {
  pub fn new(context: GithubContext) -> Result<Self, DeliveryError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { context, client })
  }
}

impl Deliver for GithubCommentSink {
  fn name(&self) -> &'static str {
    "github-comment"
  }

  fn deliver(&self, report: &RiskReport) -> Result<(), DeliveryError> {
    let body = render::markdown(report);
    let resp = self
      .client
      .post(self.context.comments_url())
      .bearer_auth(&self.context.token)
      .header(ACCEPT, "application/vnd.github+json")
      .header(USER_AGENT, concat!("risk-profiler/", env!("CARGO_PKG_VERSION")))
      .header("X-GitHub-Api-Version", "2022-11-28")
      .json(&NewComment { body: &body })
      .send()?;

    let status = resp.status();
    if !status.is_success() {
      return Err(DeliveryError::Status {
        status: status.as_u16(),
        body: resp.text().unwrap_or_default(),
      });
    }
    tracing::debug!(
      repository = %self.context.repository,
      pr = self.context.pr_number,
      "comment posted"
    );
    Ok(())
  }
}
