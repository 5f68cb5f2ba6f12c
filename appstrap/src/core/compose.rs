//! Compose manifest model for the docker step.
//!
//! The manifest is built deterministically from the database driver; everything
//! except the database image and port is a fixed constant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::{Database, DatabaseDriver, MYSQL_DEFAULT_PORT, PGSQL_DEFAULT_PORT};

pub const APP_SERVICE: &str = "app";
pub const DATABASE_SERVICE: &str = "database";
pub const ADMIN_SERVICE: &str = "adminer";

pub const MYSQL_IMAGE: &str = "mysql:8.0";
pub const POSTGRES_IMAGE: &str = "postgres:15";
pub const ADMIN_IMAGE: &str = "adminer:4";

const DB_USER: &str = "app";
const DB_PASSWORD: &str = "secret";
const DB_NAME: &str = "app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeManifest {
    pub services: BTreeMap<String, Service>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ComposeManifest {
    /// Build the manifest for a database selection.
    ///
    /// File-based and skipped drivers get an application-only manifest.
    pub fn for_database(database: &Database) -> Self {
        let mut services = BTreeMap::new();
        let database_service = database_service(database.driver());

        let mut app = Service {
            build: Some(".".to_string()),
            ports: vec!["8000:8000".to_string()],
            environment: env(&[("APP_ENV", "local"), ("APP_DEBUG", "true")]),
            ..Service::default()
        };
        if let Some(db) = database_service {
            app.depends_on.push(DATABASE_SERVICE.to_string());
            services.insert(DATABASE_SERVICE.to_string(), db);
            services.insert(
                ADMIN_SERVICE.to_string(),
                Service {
                    image: Some(ADMIN_IMAGE.to_string()),
                    ports: vec!["8080:8080".to_string()],
                    environment: env(&[("ADMINER_DEFAULT_SERVER", DATABASE_SERVICE)]),
                    depends_on: vec![DATABASE_SERVICE.to_string()],
                    ..Service::default()
                },
            );
        }
        services.insert(APP_SERVICE.to_string(), app);

        Self { services }
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn database_service(driver: DatabaseDriver) -> Option<Service> {
    match driver {
        DatabaseDriver::Mysql => Some(Service {
            image: Some(MYSQL_IMAGE.to_string()),
            ports: vec![format!("{MYSQL_DEFAULT_PORT}:{MYSQL_DEFAULT_PORT}")],
            environment: env(&[
                ("MYSQL_DATABASE", DB_NAME),
                ("MYSQL_USER", DB_USER),
                ("MYSQL_PASSWORD", DB_PASSWORD),
                ("MYSQL_ROOT_PASSWORD", DB_PASSWORD),
            ]),
            ..Service::default()
        }),
        DatabaseDriver::Pgsql => Some(Service {
            image: Some(POSTGRES_IMAGE.to_string()),
            ports: vec![format!("{PGSQL_DEFAULT_PORT}:{PGSQL_DEFAULT_PORT}")],
            environment: env(&[
                ("POSTGRES_DB", DB_NAME),
                ("POSTGRES_USER", DB_USER),
                ("POSTGRES_PASSWORD", DB_PASSWORD),
            ]),
            ..Service::default()
        }),
        DatabaseDriver::Sqlite | DatabaseDriver::Skipped => None,
    }
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
