//! Error taxonomy for the bootstrap pipeline.
//!
//! Fatal kinds ([`ConfigError`], [`RequirementError`], [`ProcessError`]) unwind to
//! the orchestrator, which runs rollback before reporting. The recoverable kinds
//! ([`ProvisionWarning`], [`RollbackWarning`]) are values, not errors: they are
//! recorded and logged at the step boundary and never abort a run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::steps::StepName;

/// Unreadable, malformed or invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration document not found: {0}")]
    NotFound(PathBuf),

    #[error("read configuration document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse configuration document {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: String, message: String },

    #[error("prompt for `{key}` failed: {message}")]
    Prompt { key: String, message: String },
}

/// A mandatory platform capability or precondition is missing.
#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("invalid project name '{0}' (use letters, digits, '.', '_' or '-')")]
    InvalidProjectName(String),

    #[error("target directory already exists: {0}")]
    TargetExists(PathBuf),

    #[error("working directory does not exist: {0}")]
    WorkdirMissing(PathBuf),

    #[error("required tool `{tool}` is not available: {detail}")]
    MissingTool { tool: String, detail: String },
}

/// An external command could not be spawned, failed, or timed out.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {}: {}", exit_label(.exit_code), .stderr.trim())]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout:?}: {}", .stderr.trim())]
    TimedOut {
        command: String,
        timeout: Duration,
        stderr: String,
    },
}

impl ProcessError {
    /// Captured stderr of the child, if it ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ProcessError::Failed { stderr, .. } | ProcessError::TimedOut { stderr, .. } => {
                Some(stderr)
            }
            ProcessError::Spawn { .. } | ProcessError::Wait { .. } => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Any failure a pipeline step can raise.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Requirement(#[from] RequirementError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize {what}: {message}")]
    Serialize { what: String, message: String },

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl BootstrapError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A best-effort step failed; the pipeline continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionWarning {
    pub step: StepName,
    pub message: String,
}

impl fmt::Display for ProvisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// A rollback action failed; the remaining actions were still attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackWarning {
    pub action: String,
    pub message: String,
}

impl fmt::Display for RollbackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.message)
    }
}
