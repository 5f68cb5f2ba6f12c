//! Configuration model: the raw key/value layer and the validated value built from it.
//!
//! Raw values are merged layer by layer (defaults, document, answers) into a
//! [`RawConfig`]. [`Configuration::from_raw`] validates the merged map once, so
//! steps never deal with missing or mistyped keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

pub const MYSQL_DEFAULT_PORT: u16 = 3306;
pub const PGSQL_DEFAULT_PORT: u16 = 5432;

/// Recognized configuration keys. Anything else in a document is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    DbDriver,
    DbHost,
    DbPort,
    DbName,
    DbUser,
    DbPassword,
    WithDocker,
    Telemetry,
    InitGit,
    CreateDatabase,
    SkipDatabase,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::DbDriver,
        ConfigKey::DbHost,
        ConfigKey::DbPort,
        ConfigKey::DbName,
        ConfigKey::DbUser,
        ConfigKey::DbPassword,
        ConfigKey::WithDocker,
        ConfigKey::Telemetry,
        ConfigKey::InitGit,
        ConfigKey::CreateDatabase,
        ConfigKey::SkipDatabase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::DbDriver => "db_driver",
            ConfigKey::DbHost => "db_host",
            ConfigKey::DbPort => "db_port",
            ConfigKey::DbName => "db_name",
            ConfigKey::DbUser => "db_user",
            ConfigKey::DbPassword => "db_password",
            ConfigKey::WithDocker => "with_docker",
            ConfigKey::Telemetry => "telemetry",
            ConfigKey::InitGit => "init_git",
            ConfigKey::CreateDatabase => "create_database",
            ConfigKey::SkipDatabase => "skip_database",
        }
    }

    pub fn from_name(name: &str) -> Option<ConfigKey> {
        ConfigKey::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primitive value from any configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    pub fn text(value: impl Into<String>) -> Self {
        ConfigValue::Text(value.into())
    }

    fn as_bool(&self, key: ConfigKey) -> Result<bool, ConfigError> {
        match self {
            ConfigValue::Bool(value) => Ok(*value),
            ConfigValue::Text(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" => Ok(false),
                _ => Err(invalid(key, format!("expected a boolean, got '{raw}'"))),
            },
        }
    }

    fn as_text(&self) -> String {
        match self {
            ConfigValue::Bool(value) => value.to_string(),
            ConfigValue::Text(raw) => raw.clone(),
        }
    }
}

/// Merged key/value layer prior to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawConfig {
    values: BTreeMap<ConfigKey, ConfigValue>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ConfigKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) {
        self.values.insert(key, value);
    }

    pub fn with(mut self, key: ConfigKey, value: ConfigValue) -> Self {
        self.set(key, value);
        self
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &RawConfig) {
        for (key, value) in &other.values {
            self.values.insert(*key, value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Driver as currently merged, if it parses.
    pub fn driver(&self) -> Option<DatabaseDriver> {
        self.get(ConfigKey::DbDriver)
            .and_then(|value| value.as_text().parse().ok())
    }

    fn bool_or(&self, key: ConfigKey, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(value) => value.as_bool(key),
            None => Ok(default),
        }
    }

    fn text_or_empty(&self, key: ConfigKey) -> String {
        self.get(key).map(ConfigValue::as_text).unwrap_or_default()
    }
}

/// Database driver names accepted in documents and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Sqlite,
    Mysql,
    Pgsql,
    Skipped,
}

impl DatabaseDriver {
    pub const ALL: [DatabaseDriver; 4] = [
        DatabaseDriver::Sqlite,
        DatabaseDriver::Mysql,
        DatabaseDriver::Pgsql,
        DatabaseDriver::Skipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseDriver::Sqlite => "sqlite",
            DatabaseDriver::Mysql => "mysql",
            DatabaseDriver::Pgsql => "pgsql",
            DatabaseDriver::Skipped => "skipped",
        }
    }

    pub fn is_network(self) -> bool {
        matches!(self, DatabaseDriver::Mysql | DatabaseDriver::Pgsql)
    }

    pub fn default_port(self) -> Option<u16> {
        match self {
            DatabaseDriver::Mysql => Some(MYSQL_DEFAULT_PORT),
            DatabaseDriver::Pgsql => Some(PGSQL_DEFAULT_PORT),
            DatabaseDriver::Sqlite | DatabaseDriver::Skipped => None,
        }
    }
}

impl FromStr for DatabaseDriver {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(DatabaseDriver::Sqlite),
            "mysql" => Ok(DatabaseDriver::Mysql),
            "pgsql" => Ok(DatabaseDriver::Pgsql),
            "skipped" => Ok(DatabaseDriver::Skipped),
            other => Err(format!(
                "unknown driver '{other}' (expected sqlite, mysql, pgsql or skipped)"
            )),
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings of a network database server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

/// Database selection, validated at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum Database {
    Sqlite,
    Mysql(Connection),
    #[serde(rename = "pgsql")]
    Postgres(Connection),
    Skipped,
}

impl Database {
    pub fn driver(&self) -> DatabaseDriver {
        match self {
            Database::Sqlite => DatabaseDriver::Sqlite,
            Database::Mysql(_) => DatabaseDriver::Mysql,
            Database::Postgres(_) => DatabaseDriver::Pgsql,
            Database::Skipped => DatabaseDriver::Skipped,
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        match self {
            Database::Mysql(conn) | Database::Postgres(conn) => Some(conn),
            Database::Sqlite | Database::Skipped => None,
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub project_name: String,
    pub database: Database,
    pub skip_database: bool,
    pub create_database: bool,
    pub with_docker: bool,
    pub telemetry: bool,
    pub init_git: bool,
}

impl Configuration {
    /// Validate a merged raw layer into a typed configuration.
    pub fn from_raw(project_name: &str, raw: &RawConfig) -> Result<Self, ConfigError> {
        let driver = match raw.get(ConfigKey::DbDriver) {
            Some(value) => value
                .as_text()
                .parse::<DatabaseDriver>()
                .map_err(|message| invalid(ConfigKey::DbDriver, message))?,
            None => DatabaseDriver::Sqlite,
        };
        let skip_database = driver == DatabaseDriver::Skipped
            || raw.bool_or(ConfigKey::SkipDatabase, false)?;

        let database = match driver {
            DatabaseDriver::Sqlite => Database::Sqlite,
            DatabaseDriver::Skipped => Database::Skipped,
            DatabaseDriver::Mysql => Database::Mysql(connection(raw, driver, skip_database)?),
            DatabaseDriver::Pgsql => Database::Postgres(connection(raw, driver, skip_database)?),
        };

        Ok(Self {
            project_name: project_name.to_string(),
            database,
            skip_database,
            create_database: raw.bool_or(ConfigKey::CreateDatabase, false)?,
            with_docker: raw.bool_or(ConfigKey::WithDocker, false)?,
            telemetry: raw.bool_or(ConfigKey::Telemetry, false)?,
            init_git: raw.bool_or(ConfigKey::InitGit, true)?,
        })
    }
}

fn connection(
    raw: &RawConfig,
    driver: DatabaseDriver,
    skip_database: bool,
) -> Result<Connection, ConfigError> {
    let port = match raw.get(ConfigKey::DbPort) {
        Some(value) => parse_port(&value.as_text())?,
        None => driver.default_port().unwrap_or(MYSQL_DEFAULT_PORT),
    };
    let host = raw.text_or_empty(ConfigKey::DbHost);
    let name = raw.text_or_empty(ConfigKey::DbName);
    let user = raw.text_or_empty(ConfigKey::DbUser);

    if !skip_database {
        for (key, value) in [
            (ConfigKey::DbHost, &host),
            (ConfigKey::DbName, &name),
            (ConfigKey::DbUser, &user),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(
                    key,
                    format!("required for the {driver} driver unless skip_database is set"),
                ));
            }
        }
    }

    Ok(Connection {
        host,
        port,
        name,
        user,
        password: raw.text_or_empty(ConfigKey::DbPassword),
    })
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(invalid(
            ConfigKey::DbPort,
            format!("expected a port number between 1 and 65535, got '{raw}'"),
        )),
    }
}

fn invalid(key: ConfigKey, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.as_str().to_string(),
        message: message.into(),
    }
}

/// Built-in lowest-precedence layer for a project.
pub fn default_values(project_name: &str) -> RawConfig {
    RawConfig::new()
        .with(ConfigKey::DbDriver, ConfigValue::text("sqlite"))
        .with(ConfigKey::DbHost, ConfigValue::text("127.0.0.1"))
        .with(ConfigKey::DbName, ConfigValue::text(database_slug(project_name)))
        .with(ConfigKey::DbUser, ConfigValue::text("root"))
        .with(ConfigKey::DbPassword, ConfigValue::text(""))
        .with(ConfigKey::WithDocker, ConfigValue::Bool(false))
        .with(ConfigKey::Telemetry, ConfigValue::Bool(false))
        .with(ConfigKey::InitGit, ConfigValue::Bool(true))
        .with(ConfigKey::CreateDatabase, ConfigValue::Bool(false))
        .with(ConfigKey::SkipDatabase, ConfigValue::Bool(false))
}

/// Database name derived from a project name (`my-app.v2` -> `my_app_v2`).
pub fn database_slug(project_name: &str) -> String {
    project_name
        .chars()
        .map(|c| if c == '-' || c == '.' { '_' } else { c })
        .collect()
}
