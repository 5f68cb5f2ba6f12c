//! Project template installation through composer.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;

use crate::io::process::CommandSpec;

/// Composer minimum-stability hint forwarded to `create-project`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stability {
    Stable,
    #[value(name = "RC")]
    Rc,
    Beta,
    Alpha,
    Dev,
}

impl Stability {
    pub fn as_str(self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Rc => "RC",
            Stability::Beta => "beta",
            Stability::Alpha => "alpha",
            Stability::Dev => "dev",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tools the pipeline cannot run without.
pub const REQUIRED_TOOLS: [&str; 2] = ["php", "composer"];

/// `<tool> --version`, used as a capability check.
pub fn version_check_command(tool: &str, cwd: &Path, timeout: Duration) -> CommandSpec {
    CommandSpec::new(tool, cwd, timeout).arg("--version")
}

/// `composer create-project <package> . --no-interaction --prefer-dist [--stability=..]`,
/// run inside the (empty) project directory.
pub fn create_project_command(
    package: &str,
    project: &Path,
    stability: Option<Stability>,
    timeout: Duration,
) -> CommandSpec {
    let mut spec = CommandSpec::new("composer", project, timeout)
        .arg("create-project")
        .arg(package)
        .arg(".")
        .args(["--no-interaction", "--prefer-dist"]);
    if let Some(stability) = stability {
        spec = spec.arg(format!("--stability={stability}"));
    }
    spec
}

/// Project names become directory names; keep them portable.
pub fn is_valid_project_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
