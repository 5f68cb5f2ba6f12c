//! Fire-and-forget usage ping.
//!
//! The ping is a detached `curl` child: it is never joined or cancelled, it has
//! no ordering guarantee relative to the end of the run, and its failure cannot
//! be observed by the pipeline.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::core::config::Configuration;
use crate::io::process::{CommandSpec, ProcessRunner};

#[derive(Debug, Serialize)]
struct TelemetryEvent<'a> {
    event: &'a str,
    version: &'a str,
    db_driver: &'a str,
    with_docker: bool,
    init_git: bool,
}

pub fn telemetry_command(
    config: &Configuration,
    endpoint: &str,
    cwd: &Path,
    timeout: Duration,
) -> CommandSpec {
    let event = TelemetryEvent {
        event: "project_created",
        version: env!("CARGO_PKG_VERSION"),
        db_driver: config.database.driver().as_str(),
        with_docker: config.with_docker,
        init_git: config.init_git,
    };
    let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
    CommandSpec::new("curl", cwd, timeout)
        .args(["--silent", "--output", "/dev/null"])
        .arg(format!("--max-time={}", timeout.as_secs()))
        .args(["--header", "Content-Type: application/json"])
        .args(["--data", payload.as_str()])
        .arg(endpoint)
}

/// Start the ping in the background and return immediately.
pub fn send_detached<R: ProcessRunner + ?Sized>(runner: &R, command: &CommandSpec) {
    debug!(command = %command.display(), "sending telemetry ping");
    runner.spawn_detached(command);
}
