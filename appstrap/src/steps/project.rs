//! Project provisioning: create the directory and install the template into it.

use std::fs;
use std::path::PathBuf;

use tracing::{info, instrument};

use crate::error::BootstrapError;
use crate::io::process::ProcessRunner;
use crate::io::project::create_project_command;
use crate::pipeline::PipelineOptions;
use crate::rollback::{RollbackAction, RollbackManager};

/// Returns the absolute project path once the template is installed.
#[instrument(skip_all, fields(project = %options.project_name))]
pub fn provision<R: ProcessRunner + ?Sized>(
    options: &PipelineOptions,
    runner: &R,
    rollback: &mut RollbackManager,
) -> Result<PathBuf, BootstrapError> {
    let path = std::path::absolute(options.project_path())
        .map_err(|err| BootstrapError::io("resolve project path", err))?;
    fs::create_dir(&path)
        .map_err(|err| BootstrapError::io(format!("create {}", path.display()), err))?;
    rollback.register(RollbackAction::RemoveDir(path.clone()));

    let command = create_project_command(
        &options.settings.template_package,
        &path,
        options.stability,
        options.settings.timeouts.create_project(),
    );
    runner.run(&command)?;
    info!(path = %path.display(), "project template installed");
    Ok(path)
}
