//! Writes the project's `.env` from its `.env.example`, or from the built-in
//! template when the installed project ships none.

use std::fs;

use tracing::{debug, instrument};

use crate::core::env_template::{env_values, render};
use crate::core::steps::StepStatus;
use crate::error::BootstrapError;
use crate::io::process::ProcessRunner;
use crate::rollback::RollbackManager;
use crate::steps::{StepContext, write_artifact};

pub const TEMPLATE_FILE: &str = ".env.example";
pub const OUTPUT_FILE: &str = ".env";

pub const DEFAULT_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/env.example"));

#[instrument(skip_all, fields(project = %ctx.project.display()))]
pub fn write<R: ProcessRunner + ?Sized>(
    ctx: &StepContext<'_, R>,
    rollback: &mut RollbackManager,
) -> Result<StepStatus, BootstrapError> {
    let template_path = ctx.project.join(TEMPLATE_FILE);
    let template = if template_path.is_file() {
        fs::read_to_string(&template_path)
            .map_err(|err| BootstrapError::io(format!("read {}", template_path.display()), err))?
    } else {
        debug!("no {TEMPLATE_FILE} in project, using built-in template");
        DEFAULT_TEMPLATE.to_string()
    };

    let rendered = render(&template, &env_values(ctx.config));
    write_artifact(ctx.project.join(OUTPUT_FILE), &rendered, rollback)?;
    Ok(StepStatus::Completed)
}
