//! Run completion: the optional telemetry ping.

use tracing::{debug, instrument};

use crate::core::steps::StepStatus;
use crate::error::BootstrapError;
use crate::io::process::ProcessRunner;
use crate::io::telemetry::{send_detached, telemetry_command};
use crate::steps::StepContext;

/// Last step. Only dispatches the telemetry ping, which never blocks or fails the run.
#[instrument(skip_all)]
pub fn finish<R: ProcessRunner + ?Sized>(
    ctx: &StepContext<'_, R>,
) -> Result<StepStatus, BootstrapError> {
    if !ctx.config.telemetry {
        debug!("telemetry disabled");
        return Ok(StepStatus::Completed);
    }
    let command = telemetry_command(
        ctx.config,
        &ctx.settings.telemetry_endpoint,
        ctx.project,
        ctx.settings.timeouts.telemetry(),
    );
    send_detached(ctx.runner, &command);
    Ok(StepStatus::Completed)
}
