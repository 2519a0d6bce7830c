//! Thin seam over the `git` binary so strategies and miners can be driven by fakes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ScmError;

/// Runs one git command and returns its stdout. Non-zero exit is an error.
pub trait GitRunner {
  fn run(&self, args: &[&str]) -> Result<String, ScmError>;
}

impl<G: GitRunner + ?Sized> GitRunner for &G {
  fn run(&self, args: &[&str]) -> Result<String, ScmError> {
    (**self).run(args)
  }
}

/// Shells out to the `git` on PATH inside a working directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
  workdir: PathBuf,
}

impl SystemGit {
  pub fn new(workdir: impl Into<PathBuf>) -> Self {
    Self {
      workdir: workdir.into(),
    }
  }

  pub fn workdir(&self) -> &Path {
    &self.workdir
  }
}

impl GitRunner for SystemGit {
  fn run(&self, args: &[&str]) -> Result<String, ScmError> {
    // `-c safe.directory=*` trusts CI workspaces owned by another uid without
    // touching the user's global config. Paths are printed verbatim.
    let output = Command::new("git")
      .args(["-c", "safe.directory=*", "-c", "core.quotePath=false"])
      .args(args)
      .current_dir(&self.workdir)
      .env("GIT_TERMINAL_PROMPT", "0")
      .stdin(Stdio::null())
      .output()?;

    if !output.status.success() {
      return Err(ScmError::failed(
        args,
        String::from_utf8_lossy(&output.stderr),
      ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}
