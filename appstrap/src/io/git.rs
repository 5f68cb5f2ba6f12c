//! Git adapter for the version-control step.
//!
//! A small, explicit wrapper around `git` subprocess calls, routed through a
//! [`ProcessRunner`] so the step can be exercised without a real git.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument};

use crate::error::ProcessError;
use crate::io::process::{CommandOutput, CommandSpec, ProcessRunner};

/// Wrapper for executing git commands in a working directory.
pub struct Git<'a, R: ProcessRunner + ?Sized> {
    runner: &'a R,
    workdir: PathBuf,
    timeout: Duration,
}

impl<'a, R: ProcessRunner + ?Sized> Git<'a, R> {
    pub fn new(runner: &'a R, workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
            timeout,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Create an empty repository in the working directory.
    #[instrument(skip_all)]
    pub fn init(&self) -> Result<(), ProcessError> {
        debug!(workdir = %self.workdir.display(), "initializing repository");
        self.run(&["init", "--quiet"])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<(), ProcessError> {
        self.run(&["add", "-A"])?;
        Ok(())
    }

    /// Commit staged changes with a message.
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str) -> Result<(), ProcessError> {
        debug!("committing staged changes");
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        let spec = CommandSpec::new("git", &self.workdir, self.timeout).args(args.iter().copied());
        self.runner.run(&spec)
    }
}
