//! Report sinks. Delivery failure is logged once and handed to a fallback sink.

use risk_engine::RiskReport;
use std::io::Write;

use crate::error::DeliveryError;
use crate::render;

/// A delivery target for a finished report.
pub trait Deliver {
  fn name(&self) -> &'static str;
  fn deliver(&self, report: &RiskReport) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
  #[default]
  Markdown,
  Json,
}

/// Writes the report to stdout as Markdown or pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink {
  pub format: OutputFormat,
}

impl StdoutSink {
  pub fn new(format: OutputFormat) -> Self {
    Self { format }
  }

  pub fn write_to<W: Write>(&self, report: &RiskReport, mut out: W) -> Result<(), DeliveryError> {
    match self.format {
      OutputFormat::Markdown => out.write_all(render::markdown(report).as_bytes())?,
      OutputFormat::Json => {
        serde_json::to_writer_pretty(&mut out, report)?;
        writeln!(out)?;
      }
    }
    out.flush()?;
    Ok(())
  }
}

impl Deliver for StdoutSink {
  fn name(&self) -> &'static str {
    "stdout"
  }

  fn deliver(&self, report: &RiskReport) -> Result<(), DeliveryError> {
    let stdout = std::io::stdout();
    self.write_to(report, stdout.lock())
  }
}

/// Try `primary`; on failure log once and use `fallback`. Only the fallback's
/// own error is returned.
pub fn deliver_with_fallback(
  primary: &dyn Deliver,
  fallback: &dyn Deliver,
  report: &RiskReport,
) -> Result<(), DeliveryError> {
  match primary.deliver(report) {
    Ok(()) => {
      tracing::info!(sink = primary.name(), report_id = %report.report_id, "report delivered");
      Ok(())
    }
    Err(e) => {
      tracing::warn!(
        sink = primary.name(),
        fallback = fallback.name(),
        error = %e,
        "delivery failed; falling back"
      );
      fallback.deliver(report)
    }
  }
}
