//! Preflight checks. Nothing here has side effects, so a failure leaves no trace.

use tracing::{debug, instrument};

use crate::core::steps::StepStatus;
use crate::error::{BootstrapError, ConfigError, RequirementError};
use crate::io::process::ProcessRunner;
use crate::io::project::{REQUIRED_TOOLS, is_valid_project_name, version_check_command};
use crate::pipeline::PipelineOptions;

#[instrument(skip_all, fields(project = %options.project_name))]
pub fn check<R: ProcessRunner + ?Sized>(
    options: &PipelineOptions,
    runner: &R,
) -> Result<StepStatus, BootstrapError> {
    if !is_valid_project_name(&options.project_name) {
        return Err(RequirementError::InvalidProjectName(options.project_name.clone()).into());
    }

    let target = options.project_path();
    if target.symlink_metadata().is_ok() {
        return Err(RequirementError::TargetExists(target).into());
    }
    if !options.workdir.is_dir() {
        return Err(RequirementError::WorkdirMissing(options.workdir.clone()).into());
    }
    if let Some(document) = &options.config_path
        && !document.is_file()
    {
        return Err(ConfigError::NotFound(document.clone()).into());
    }

    for tool in REQUIRED_TOOLS {
        let command = version_check_command(tool, &options.workdir, options.settings.timeouts.check());
        runner
            .run(&command)
            .map_err(|err| RequirementError::MissingTool {
                tool: tool.to_string(),
                detail: err.to_string(),
            })?;
        debug!(tool, "tool available");
    }
    Ok(StepStatus::Completed)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::settings::BootstrapSettings;
    use crate::test_support::{ScriptedRunner, TestWorkspace};

    fn options(ws: &TestWorkspace, name: &str) -> PipelineOptions {
        PipelineOptions::new(name, ws.path(), BootstrapSettings::default())
    }

    #[test]
    fn existing_target_fails_before_any_command() {
        let ws = TestWorkspace::new().expect("workspace");
        fs::create_dir(ws.project_path("shop")).expect("mkdir");
        let runner = ScriptedRunner::new();

        let err = check(&options(&ws, "shop"), &runner).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Requirement(RequirementError::TargetExists(_))
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_tool_is_reported_by_name() {
        let ws = TestWorkspace::new().expect("workspace");
        let runner = ScriptedRunner::new().fail_program("composer", "composer: not found");

        let err = check(&options(&ws, "shop"), &runner).unwrap_err();
        match err {
            BootstrapError::Requirement(RequirementError::MissingTool { tool, .. }) => {
                assert_eq!(tool, "composer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.invocations(), ["php --version", "composer --version"]);
    }

    #[test]
    fn absent_document_is_a_config_error() {
        let ws = TestWorkspace::new().expect("workspace");
        let mut opts = options(&ws, "shop");
        opts.config_path = Some(ws.path().join("missing.json"));

        let err = check(&opts, &ScriptedRunner::new()).unwrap_err();
        assert!(matches!(err, BootstrapError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn invalid_name_is_rejected() {
        let ws = TestWorkspace::new().expect("workspace");
        let err = check(&options(&ws, "a/b"), &ScriptedRunner::new()).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Requirement(RequirementError::InvalidProjectName(_))
        ));
    }
}
