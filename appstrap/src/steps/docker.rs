//! Container manifest generation.

use tracing::{instrument, warn};

use crate::core::compose::ComposeManifest;
use crate::core::steps::StepStatus;
use crate::error::BootstrapError;
use crate::io::process::ProcessRunner;
use crate::rollback::RollbackManager;
use crate::steps::{StepContext, write_artifact};

pub const MANIFEST_FILE: &str = "docker-compose.yml";
pub const DOCKERFILE: &str = "Dockerfile";

const DOCKERFILE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/Dockerfile"));

#[instrument(skip_all, fields(project = %ctx.project.display()))]
pub fn write<R: ProcessRunner + ?Sized>(
    ctx: &StepContext<'_, R>,
    rollback: &mut RollbackManager,
) -> Result<StepStatus, BootstrapError> {
    if !ctx.config.with_docker {
        return Ok(StepStatus::Skipped("docker not requested".to_string()));
    }
    if !ctx.config.database.driver().is_network() {
        warn!(
            driver = ctx.config.database.driver().as_str(),
            "no database container for this driver; manifest has the app service only"
        );
    }

    let yaml = ComposeManifest::for_database(&ctx.config.database)
        .to_yaml()
        .map_err(|err| BootstrapError::Serialize {
            what: MANIFEST_FILE.to_string(),
            message: err.to_string(),
        })?;
    write_artifact(ctx.project.join(MANIFEST_FILE), &yaml, rollback)?;
    write_artifact(ctx.project.join(DOCKERFILE), DOCKERFILE_TEMPLATE, rollback)?;
    Ok(StepStatus::Completed)
}
