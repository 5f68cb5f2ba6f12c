//! Step identities, severities and pipeline states.
//!
//! The step sequence is fixed; the orchestrator walks [`StepName::SEQUENCE`] and
//! decides what to do with a failure by inspecting [`StepName::severity`].

use std::fmt;

use serde::Serialize;

use crate::error::ProvisionWarning;

/// How the orchestrator treats a failure of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure aborts the pipeline and triggers rollback.
    Fatal,
    /// Failure is downgraded to a warning and the pipeline continues.
    BestEffort,
}

/// Named units of work, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Requirements,
    Project,
    Configuration,
    Environment,
    Database,
    Docker,
    VersionControl,
    Finalize,
}

impl StepName {
    pub const SEQUENCE: [StepName; 8] = [
        StepName::Requirements,
        StepName::Project,
        StepName::Configuration,
        StepName::Environment,
        StepName::Database,
        StepName::Docker,
        StepName::VersionControl,
        StepName::Finalize,
    ];

    pub fn severity(self) -> Severity {
        match self {
            StepName::Requirements
            | StepName::Project
            | StepName::Configuration
            | StepName::Environment
            | StepName::Docker => Severity::Fatal,
            StepName::Database | StepName::VersionControl | StepName::Finalize => {
                Severity::BestEffort
            }
        }
    }

    /// State the pipeline enters once this step has been handled.
    pub fn completed_state(self) -> PipelineState {
        match self {
            StepName::Requirements => PipelineState::RequirementsChecked,
            StepName::Project => PipelineState::ProjectProvisioned,
            StepName::Configuration => PipelineState::ConfigurationResolved,
            StepName::Environment => PipelineState::EnvironmentWritten,
            StepName::Database => PipelineState::DatabaseHandled,
            StepName::Docker => PipelineState::DockerHandled,
            StepName::VersionControl => PipelineState::VersionControlHandled,
            StepName::Finalize => PipelineState::Finalized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepName::Requirements => "requirements",
            StepName::Project => "project",
            StepName::Configuration => "configuration",
            StepName::Environment => "environment",
            StepName::Database => "database",
            StepName::Docker => "docker",
            StepName::VersionControl => "version-control",
            StepName::Finalize => "finalize",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear pipeline states. `Succeeded` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Created,
    RequirementsChecked,
    ProjectProvisioned,
    ConfigurationResolved,
    EnvironmentWritten,
    DatabaseHandled,
    DockerHandled,
    VersionControlHandled,
    Finalized,
    Succeeded,
    RolledBack,
}

/// Result of a handled step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    /// The step's enabling condition was false.
    Skipped(String),
    /// A best-effort step failed; carries the downgraded error.
    Warned(ProvisionWarning),
}

/// One progress entry per handled step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: StepName,
    pub severity: Severity,
    pub status: StepStatus,
}

impl StepReport {
    pub fn progress_line(&self) -> String {
        match &self.status {
            StepStatus::Completed => format!("[ok]   {}", self.step),
            StepStatus::Skipped(reason) => format!("[skip] {} ({reason})", self.step),
            StepStatus::Warned(warning) => format!("[warn] {} ({})", self.step, warning.message),
        }
    }
}
