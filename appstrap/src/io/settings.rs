//! Tool settings (TOML): template package, telemetry endpoint, timeouts.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for the bootstrapper itself, as opposed to the per-project
/// configuration document. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootstrapSettings {
    /// Composer package used as the project template.
    pub template_package: String,

    /// Endpoint receiving the anonymous telemetry ping.
    pub telemetry_endpoint: String,

    /// Truncate captured stdout/stderr of external commands beyond this many bytes.
    pub output_limit_bytes: usize,

    pub timeouts: Timeouts,
}

/// Per-command-class timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    /// Quick capability checks (`php --version`).
    pub check_secs: u64,
    /// `composer create-project`.
    pub create_project_secs: u64,
    pub database_secs: u64,
    pub git_secs: u64,
    pub telemetry_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            check_secs: 10,
            create_project_secs: 15 * 60,
            database_secs: 60,
            git_secs: 60,
            telemetry_secs: 5,
        }
    }
}

impl Timeouts {
    pub fn check(&self) -> Duration {
        Duration::from_secs(self.check_secs)
    }

    pub fn create_project(&self) -> Duration {
        Duration::from_secs(self.create_project_secs)
    }

    pub fn database(&self) -> Duration {
        Duration::from_secs(self.database_secs)
    }

    pub fn git(&self) -> Duration {
        Duration::from_secs(self.git_secs)
    }

    pub fn telemetry(&self) -> Duration {
        Duration::from_secs(self.telemetry_secs)
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            template_package: "laravel/laravel".to_string(),
            telemetry_endpoint: "https://telemetry.appstrap.dev/v1/events".to_string(),
            output_limit_bytes: 100_000,
            timeouts: Timeouts::default(),
        }
    }
}

impl BootstrapSettings {
    pub fn validate(&self) -> Result<()> {
        if self.template_package.trim().is_empty() {
            return Err(anyhow!("template_package must not be empty"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        let t = &self.timeouts;
        for (name, secs) in [
            ("timeouts.check_secs", t.check_secs),
            ("timeouts.create_project_secs", t.create_project_secs),
            ("timeouts.database_secs", t.database_secs),
            ("timeouts.git_secs", t.git_secs),
            ("timeouts.telemetry_secs", t.telemetry_secs),
        ] {
            if secs == 0 {
                return Err(anyhow!("{name} must be > 0"));
            }
        }
        Ok(())
    }
}

/// Load settings from a TOML file.
///
/// If no path is given or the file is missing, returns `BootstrapSettings::default()`.
pub fn load_settings(path: Option<&Path>) -> Result<BootstrapSettings> {
    let Some(path) = path.filter(|p| p.exists()) else {
        debug!("no settings file, using defaults");
        let settings = BootstrapSettings::default();
        settings.validate()?;
        return Ok(settings);
    };
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: BootstrapSettings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}
