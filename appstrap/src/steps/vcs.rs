//! Version-control initialization.

use tracing::instrument;

use crate::core::steps::StepStatus;
use crate::error::BootstrapError;
use crate::io::git::Git;
use crate::io::process::ProcessRunner;
use crate::rollback::{RollbackAction, RollbackManager};
use crate::steps::StepContext;

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

#[instrument(skip_all, fields(project = %ctx.project.display()))]
pub fn initialize<R: ProcessRunner + ?Sized>(
    ctx: &StepContext<'_, R>,
    rollback: &mut RollbackManager,
) -> Result<StepStatus, BootstrapError> {
    if !ctx.config.init_git {
        return Ok(StepStatus::Skipped("git not requested".to_string()));
    }
    let git = Git::new(ctx.runner, ctx.project, ctx.settings.timeouts.git());
    git.init()?;
    rollback.register(RollbackAction::RemoveDir(git.workdir().join(".git")));
    git.add_all()?;
    git.commit(INITIAL_COMMIT_MESSAGE)?;
    Ok(StepStatus::Completed)
}
