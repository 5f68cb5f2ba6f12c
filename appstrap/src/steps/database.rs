//! Database provisioning. Best-effort: the orchestrator turns any error into a warning.

use tracing::{info, instrument};

use crate::core::config::Database;
use crate::core::steps::StepStatus;
use crate::error::BootstrapError;
use crate::io::database::{
    create_sqlite_file, mysql_create_command, pgsql_create_command, run_client, sqlite_path,
    sqlite_schema_command,
};
use crate::io::process::ProcessRunner;
use crate::rollback::{RollbackAction, RollbackManager};
use crate::steps::StepContext;

#[instrument(skip_all, fields(driver = %ctx.config.database.driver().as_str()))]
pub fn provision<R: ProcessRunner + ?Sized>(
    ctx: &StepContext<'_, R>,
    rollback: &mut RollbackManager,
) -> Result<StepStatus, BootstrapError> {
    if ctx.config.skip_database {
        return Ok(StepStatus::Skipped("database setup skipped".to_string()));
    }
    let timeout = ctx.settings.timeouts.database();

    let command = match &ctx.config.database {
        Database::Skipped => {
            return Ok(StepStatus::Skipped("database setup skipped".to_string()));
        }
        Database::Sqlite => {
            let path = sqlite_path(ctx.project);
            if create_sqlite_file(&path)? {
                rollback.register(RollbackAction::RemoveFile(path));
            }
            sqlite_schema_command(ctx.project, timeout)
        }
        // Remote databases are never dropped on rollback.
        Database::Mysql(_) | Database::Postgres(_) if !ctx.config.create_database => {
            return Ok(StepStatus::Skipped("create_database not requested".to_string()));
        }
        Database::Mysql(conn) => mysql_create_command(conn, ctx.project, timeout),
        Database::Postgres(conn) => pgsql_create_command(conn, ctx.project, timeout),
    };

    run_client(ctx.runner, &command)?;
    info!("database ready");
    Ok(StepStatus::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConfigKey, ConfigValue, Configuration, default_values};
    use crate::io::settings::BootstrapSettings;
    use crate::test_support::{ScriptedRunner, TestWorkspace};

    fn run(
        ws: &TestWorkspace,
        config: &Configuration,
        runner: &ScriptedRunner,
        rollback: &mut RollbackManager,
    ) -> Result<StepStatus, BootstrapError> {
        let settings = BootstrapSettings::default();
        let ctx = StepContext {
            project: ws.path(),
            config,
            runner,
            settings: &settings,
        };
        provision(&ctx, rollback)
    }

    #[test]
    fn sqlite_creates_file_and_schema() {
        let ws = TestWorkspace::new().expect("workspace");
        let config = Configuration::from_raw("shop", &default_values("shop")).expect("config");
        let runner = ScriptedRunner::new();
        let mut rollback = RollbackManager::new();

        let status = run(&ws, &config, &runner, &mut rollback).expect("provision");
        assert_eq!(status, StepStatus::Completed);
        assert!(sqlite_path(ws.path()).is_file());
        assert_eq!(runner.calls()[0].program, "sqlite3");
        assert_eq!(
            rollback.actions(),
            [RollbackAction::RemoveFile(sqlite_path(ws.path()))]
        );
    }

    #[test]
    fn network_driver_without_create_flag_runs_nothing() {
        let ws = TestWorkspace::new().expect("workspace");
        let raw = default_values("shop").with(ConfigKey::DbDriver, ConfigValue::text("pgsql"));
        let config = Configuration::from_raw("shop", &raw).expect("config");
        let runner = ScriptedRunner::new();

        let status = run(&ws, &config, &runner, &mut RollbackManager::new()).expect("provision");
        assert!(matches!(status, StepStatus::Skipped(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn mysql_creation_passes_password_out_of_band() {
        let ws = TestWorkspace::new().expect("workspace");
        let raw = default_values("shop")
            .with(ConfigKey::DbDriver, ConfigValue::text("mysql"))
            .with(ConfigKey::DbPassword, ConfigValue::text("hunter2"))
            .with(ConfigKey::CreateDatabase, ConfigValue::Bool(true));
        let config = Configuration::from_raw("shop", &raw).expect("config");
        let runner = ScriptedRunner::new();
        let mut rollback = RollbackManager::new();

        run(&ws, &config, &runner, &mut rollback).expect("provision");
        let call = &runner.calls()[0];
        assert_eq!(call.program, "mysql");
        assert!(!call.args.iter().any(|a| a.contains("hunter2")));
        assert!(!call.display().contains("hunter2"));
        assert!(rollback.is_empty());
    }

    #[test]
    fn client_failure_surfaces_as_error() {
        let ws = TestWorkspace::new().expect("workspace");
        let raw = default_values("shop")
            .with(ConfigKey::DbDriver, ConfigValue::text("pgsql"))
            .with(ConfigKey::CreateDatabase, ConfigValue::Bool(true));
        let config = Configuration::from_raw("shop", &raw).expect("config");
        let runner = ScriptedRunner::new().fail_program("psql", "connection refused");

        let err = run(&ws, &config, &runner, &mut RollbackManager::new()).unwrap_err();
        assert!(err.to_string().contains("connection refused"), "{err}");
    }
}
