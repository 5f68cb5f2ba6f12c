//! Pipeline step implementations.
//!
//! Steps after project provisioning receive a [`StepContext`] that lends them the
//! committed project path and the resolved configuration. Side effects that can be
//! reversed register a [`RollbackAction`](crate::rollback::RollbackAction).

pub mod database;
pub mod docker;
pub mod environment;
pub mod finalize;
pub mod project;
pub mod requirements;
pub mod vcs;

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::Configuration;
use crate::error::BootstrapError;
use crate::io::process::ProcessRunner;
use crate::io::settings::BootstrapSettings;
use crate::rollback::{RollbackAction, RollbackManager};

/// Read-only inputs shared by the post-provisioning steps.
pub struct StepContext<'a, R: ProcessRunner + ?Sized> {
    pub project: &'a Path,
    pub config: &'a Configuration,
    pub runner: &'a R,
    pub settings: &'a BootstrapSettings,
}

/// Write a generated file, registering its removal if it did not exist before.
pub(crate) fn write_artifact(
    path: PathBuf,
    contents: &str,
    rollback: &mut RollbackManager,
) -> Result<(), BootstrapError> {
    let existed = path.exists();
    fs::write(&path, contents)
        .map_err(|err| BootstrapError::io(format!("write {}", path.display()), err))?;
    if !existed {
        rollback.register(RollbackAction::RemoveFile(path));
    }
    Ok(())
}
