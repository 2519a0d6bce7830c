//! Structured error types for the risk engine.
//!
//! None of these escape the public pipeline: the resolver, signal collection and
//! settings loader absorb them into neutral defaults.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a source-control query or change-set strategy.
#[derive(Debug, Error)]
pub enum ScmError {
  #[error("spawn git: {0}")]
  Spawn(#[from] std::io::Error),

  #[error("`git {command}` failed: {stderr}")]
  Failed { command: String, stderr: String },

  /// The strategy's precondition is not met (e.g. no event payload).
  #[error("unavailable: {0}")]
  Unavailable(String),

  #[error("parse: {0}")]
  Parse(String),
}

impl ScmError {
  pub fn failed(args: &[&str], stderr: impl Into<String>) -> Self {
    Self::Failed {
      command: args.join(" "),
      stderr: stderr.into().trim().to_string(),
    }
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self::Unavailable(reason.into())
  }

  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }
}

/// Failure to measure a file's complexity. Always read as "no signal".
#[derive(Debug, Error)]
pub enum ComplexityError {
  #[error("unsupported file type: {0}")]
  Unsupported(PathBuf),

  #[error("read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("syntax error in {0}")]
  Syntax(PathBuf),

  #[error("language: {0}")]
  Language(String),
}

/// Failure to read or parse a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("yaml {path}: {source}")]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
}
