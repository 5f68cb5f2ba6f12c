//! Database client invocations for the database step.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::config::Connection;
use crate::error::{BootstrapError, ProcessError};
use crate::io::process::{CommandSpec, ProcessRunner};

/// Location of the sqlite database relative to the project root.
pub const SQLITE_RELATIVE_PATH: &str = "database/database.sqlite";

/// Schema-version tracking table created in fresh sqlite databases.
pub const MIGRATIONS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS migrations (\
id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \
migration VARCHAR(255) NOT NULL, \
batch INTEGER NOT NULL)";

pub fn sqlite_path(project: &Path) -> PathBuf {
    project.join(SQLITE_RELATIVE_PATH)
}

/// Create an empty database file if absent. Returns true when a file was created.
pub fn create_sqlite_file(path: &Path) -> Result<bool, BootstrapError> {
    if path.exists() {
        debug!(path = %path.display(), "sqlite file already present");
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| BootstrapError::io(format!("create {}", parent.display()), err))?;
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| BootstrapError::io(format!("create {}", path.display()), err))?;
    Ok(true)
}

/// `sqlite3 <file> <CREATE TABLE ...>`
pub fn sqlite_schema_command(project: &Path, timeout: Duration) -> CommandSpec {
    CommandSpec::new("sqlite3", project, timeout)
        .arg(SQLITE_RELATIVE_PATH)
        .arg(MIGRATIONS_TABLE_SQL)
}

/// `mysql ... --execute "CREATE DATABASE IF NOT EXISTS ..."`; password via `MYSQL_PWD`.
pub fn mysql_create_command(conn: &Connection, cwd: &Path, timeout: Duration) -> CommandSpec {
    let sql = format!(
        "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        quote_mysql_identifier(&conn.name)
    );
    CommandSpec::new("mysql", cwd, timeout)
        .arg(format!("--host={}", conn.host))
        .arg(format!("--port={}", conn.port))
        .arg(format!("--user={}", conn.user))
        .arg("--execute")
        .arg(sql)
        .secret_env("MYSQL_PWD", &conn.password)
}

/// `psql ... --command 'CREATE DATABASE "..."'`; password via `PGPASSWORD`.
pub fn pgsql_create_command(conn: &Connection, cwd: &Path, timeout: Duration) -> CommandSpec {
    let sql = format!("CREATE DATABASE {}", quote_pgsql_identifier(&conn.name));
    CommandSpec::new("psql", cwd, timeout)
        .arg(format!("--host={}", conn.host))
        .arg(format!("--port={}", conn.port))
        .arg(format!("--username={}", conn.user))
        .arg("--dbname=postgres")
        .arg("--no-password")
        .arg("--command")
        .arg(sql)
        .secret_env("PGPASSWORD", &conn.password)
}

#[instrument(skip_all, fields(command = %command.program))]
pub fn run_client<R: ProcessRunner + ?Sized>(
    runner: &R,
    command: &CommandSpec,
) -> Result<(), ProcessError> {
    runner.run(command)?;
    Ok(())
}

pub fn quote_mysql_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn quote_pgsql_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
