//! Markdown rendering of a risk report (PR comment body and console output).

use risk_engine::{FileContribution, RiskReport};
use std::fmt::Write;

/// Hidden marker identifying comments posted by this tool.
pub fn marker(report: &RiskReport) -> String {
  format!("<!-- risk-profiler:{} -->", report.report_id)
}

pub fn markdown(report: &RiskReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "🛡 **PR Test Risk Profiler**");
  let _ = writeln!(
    out,
    "Risk Score: **{}/100** → **{} Risk**",
    report.score, report.level
  );
  let _ = writeln!(
    out,
    "Lines changed: +{} / -{}",
    report.lines_added, report.lines_deleted
  );
  out.push('\n');

  out.push_str("**Changed Files:**\n");
  if report.changed_files.is_empty() {
    out.push_str("No files changed\n");
  } else {
    for file in &report.changed_files {
      let _ = writeln!(out, "- {}", file);
    }
  }
  out.push('\n');

  if !report.files.is_empty() {
    out.push_str("<details><summary>Per-file breakdown</summary>\n\n");
    out.push_str("| File | Bug commits | Complexity | Critical | Test | Points |\n");
    out.push_str("|------|------------:|-----------:|:--------:|:----:|-------:|\n");
    for file in &report.files {
      out.push_str(&breakdown_row(file));
    }
    out.push_str("\n</details>\n\n");
  }

  out.push_str("**Suggested Tests:**\n");
  if report.suggested_tests.is_empty() {
    out.push_str("No mapping found\n");
  } else {
    let tests: Vec<&str> = report.suggested_tests.iter().map(String::as_str).collect();
    let _ = writeln!(out, "{}", tests.join(", "));
  }

  out.push_str("\n---\n\n");
  out.push_str("_This analysis is automated by PR Test Risk Profiler._\n");
  let _ = writeln!(out, "{}", marker(report));
  out
}

fn breakdown_row(file: &FileContribution) -> String {
  let s = &file.signal;
  let complexity = match s.avg_complexity {
    Some(c) => format!("{:.1}", c),
    None => "n/a".to_string(),
  };
  format!(
    "| `{}` | {} | {} | {} | {} | {:+.1} |\n",
    s.path,
    s.bug_commit_count,
    complexity,
    if s.is_critical_module { "yes" } else { "" },
    if s.is_test_file { "yes" } else { "" },
    file.total
  )
}
