//! risk-profiler: CI glue around the risk engine.
//!
//! Renders the report and delivers it as a PR comment, printing locally when
//! delivery is not possible.

pub mod deliver;
pub mod error;
pub mod github;
pub mod render;

pub use deliver::{deliver_with_fallback, Deliver, OutputFormat, StdoutSink};
pub use error::DeliveryError;
pub use github::{GithubCommentSink, GithubContext};
