//! The bootstrap pipeline: an ordered run of steps with severity-driven failure
//! handling.
//!
//! A fatal step failure rolls back every registered action newest-first and stops
//! the run. A best-effort failure becomes a [`ProvisionWarning`] and the run
//! continues. The run state only ever moves forward through [`PipelineState`].

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use crate::core::config::{Configuration, default_values};
use crate::core::steps::{PipelineState, Severity, StepName, StepReport, StepStatus};
use crate::error::{BootstrapError, ProvisionWarning, RollbackWarning};
use crate::exit_codes;
use crate::io::process::ProcessRunner;
use crate::io::project::Stability;
use crate::io::prompt::AnswerSource;
use crate::io::settings::BootstrapSettings;
use crate::resolve::resolve;
use crate::rollback::RollbackManager;
use crate::steps::{
    StepContext, database, docker, environment, finalize, project, requirements, vcs,
};

/// Inputs to one bootstrap run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub project_name: String,
    /// Directory the project is created in.
    pub workdir: PathBuf,
    /// Optional configuration document.
    pub config_path: Option<PathBuf>,
    pub stability: Option<Stability>,
    pub settings: BootstrapSettings,
}

impl PipelineOptions {
    pub fn new(
        project_name: impl Into<String>,
        workdir: impl Into<PathBuf>,
        settings: BootstrapSettings,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            workdir: workdir.into(),
            config_path: None,
            stability: None,
            settings,
        }
    }

    pub fn project_path(&self) -> PathBuf {
        self.workdir.join(&self.project_name)
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Succeeded {
        project_path: PathBuf,
        configuration: Configuration,
    },
    RolledBack {
        step: StepName,
        error: BootstrapError,
        /// Number of actions that were replayed.
        rollback_actions: usize,
        rollback_warnings: Vec<RollbackWarning>,
    },
}

/// Everything observable about a finished run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Every state the run passed through, starting at `Created`.
    pub states: Vec<PipelineState>,
    pub reports: Vec<StepReport>,
    pub outcome: PipelineOutcome,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, PipelineOutcome::Succeeded { .. })
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            exit_codes::OK
        } else {
            exit_codes::FAILED
        }
    }

    /// Project path of a successful run.
    pub fn project_path(&self) -> Option<&Path> {
        match &self.outcome {
            PipelineOutcome::Succeeded { project_path, .. } => Some(project_path),
            PipelineOutcome::RolledBack { .. } => None,
        }
    }

    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Created)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ProvisionWarning> {
        self.reports.iter().filter_map(|report| match &report.status {
            StepStatus::Warned(warning) => Some(warning),
            _ => None,
        })
    }
}

/// Values that become available as steps commit.
#[derive(Default)]
struct Execution {
    project_path: Option<PathBuf>,
    configuration: Option<Configuration>,
    rollback: RollbackManager,
}

impl Execution {
    fn commit_project_path(&mut self, path: PathBuf) -> Result<(), BootstrapError> {
        if let Some(existing) = &self.project_path {
            return Err(BootstrapError::Internal(format!(
                "project path already set to {}",
                existing.display()
            )));
        }
        self.project_path = Some(path);
        Ok(())
    }
}

/// Run every step in order.
///
/// `on_step` is called with each finished step's report, in order, so callers can
/// print progress as it happens.
#[instrument(skip_all, fields(project = %options.project_name))]
pub fn run_pipeline<R, A, F>(
    options: &PipelineOptions,
    runner: &R,
    answers: &mut A,
    mut on_step: F,
) -> PipelineRun
where
    R: ProcessRunner + ?Sized,
    A: AnswerSource + ?Sized,
    F: FnMut(&StepReport),
{
    let mut states = vec![PipelineState::Created];
    let mut reports = Vec::new();
    let mut execution = Execution::default();

    for step in StepName::SEQUENCE {
        info!(step = %step, "step started");
        let status = match run_step(step, options, runner, answers, &mut execution) {
            Ok(status) => status,
            Err(err) => match step.severity() {
                Severity::BestEffort => {
                    warn!(step = %step, err = %err, "step failed; continuing");
                    StepStatus::Warned(ProvisionWarning {
                        step,
                        message: err.to_string(),
                    })
                }
                Severity::Fatal => {
                    error!(step = %step, err = %err, "step failed; rolling back");
                    let rollback_actions = execution.rollback.len();
                    let rollback_warnings = execution.rollback.execute_all();
                    states.push(PipelineState::RolledBack);
                    return PipelineRun {
                        states,
                        reports,
                        outcome: PipelineOutcome::RolledBack {
                            step,
                            error: err,
                            rollback_actions,
                            rollback_warnings,
                        },
                    };
                }
            },
        };

        let report = StepReport {
            step,
            severity: step.severity(),
            status,
        };
        on_step(&report);
        reports.push(report);
        states.push(step.completed_state());
    }

    let Execution {
        project_path,
        configuration,
        rollback,
    } = execution;
    let (Some(project_path), Some(configuration)) = (project_path, configuration) else {
        // Unreachable while the sequence contains the producing steps.
        let rollback_actions = rollback.len();
        let rollback_warnings = rollback.execute_all();
        states.push(PipelineState::RolledBack);
        return PipelineRun {
            states,
            reports,
            outcome: PipelineOutcome::RolledBack {
                step: StepName::Finalize,
                error: BootstrapError::Internal("run finished without a project".to_string()),
                rollback_actions,
                rollback_warnings,
            },
        };
    };

    rollback.discard();
    states.push(PipelineState::Succeeded);
    info!(path = %project_path.display(), "bootstrap succeeded");
    PipelineRun {
        states,
        reports,
        outcome: PipelineOutcome::Succeeded {
            project_path,
            configuration,
        },
    }
}

fn run_step<R, A>(
    step: StepName,
    options: &PipelineOptions,
    runner: &R,
    answers: &mut A,
    execution: &mut Execution,
) -> Result<StepStatus, BootstrapError>
where
    R: ProcessRunner + ?Sized,
    A: AnswerSource + ?Sized,
{
    match step {
        StepName::Requirements => requirements::check(options, runner),
        StepName::Project => {
            let path = project::provision(options, runner, &mut execution.rollback)?;
            execution.commit_project_path(path)?;
            Ok(StepStatus::Completed)
        }
        StepName::Configuration => {
            let configuration = resolve(
                &options.project_name,
                &default_values(&options.project_name),
                options.config_path.as_deref(),
                answers,
            )?;
            execution.configuration = Some(configuration);
            Ok(StepStatus::Completed)
        }
        StepName::Environment => with_context(options, runner, execution, environment::write),
        StepName::Database => with_context(options, runner, execution, database::provision),
        StepName::Docker => with_context(options, runner, execution, docker::write),
        StepName::VersionControl => with_context(options, runner, execution, vcs::initialize),
        StepName::Finalize => with_context(options, runner, execution, |ctx, _| {
            finalize::finish(ctx)
        }),
    }
}

/// Lend a post-provisioning step the committed project path and configuration.
fn with_context<R, F>(
    options: &PipelineOptions,
    runner: &R,
    execution: &mut Execution,
    step: F,
) -> Result<StepStatus, BootstrapError>
where
    R: ProcessRunner + ?Sized,
    F: FnOnce(&StepContext<'_, R>, &mut RollbackManager) -> Result<StepStatus, BootstrapError>,
{
    let Execution {
        project_path,
        configuration,
        rollback,
    } = execution;
    let ctx = StepContext {
        project: committed(project_path.as_deref(), "project path")?,
        config: committed(configuration.as_ref(), "configuration")?,
        runner,
        settings: &options.settings,
    };
    step(&ctx, rollback)
}

fn committed<'a, T: ?Sized>(value: Option<&'a T>, what: &str) -> Result<&'a T, BootstrapError> {
    value.ok_or_else(|| BootstrapError::Internal(format!("{what} not committed yet")))
}
