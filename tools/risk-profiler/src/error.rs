//! Delivery errors. Caught at the sink boundary; never fail the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
  #[error("GITHUB_TOKEN is not set")]
  MissingToken,

  #[error("missing context: {0}")]
  MissingContext(String),

  #[error("http: {0}")]
  Http(#[from] reqwest::Error),

  #[error("GitHub responded {status}: {body}")]
  Status { status: u16, body: String },

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl DeliveryError {
  pub fn missing_context(msg: impl Into<String>) -> Self {
    Self::MissingContext(msg.into())
  }
}
