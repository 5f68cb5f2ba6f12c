//! Reversal bookkeeping for a single run.
//!
//! Actions are registered as side effects commit and replayed newest-first when a
//! fatal step fails. Every action tolerates an absent target, so replaying after a
//! partial or repeated cleanup is safe.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::RollbackWarning;

/// An idempotent reversal of one committed side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackAction {
    /// Remove a directory tree if present.
    RemoveDir(PathBuf),
    /// Remove a single file if present.
    RemoveFile(PathBuf),
}

impl RollbackAction {
    pub fn execute(&self) -> std::io::Result<()> {
        let result = match self {
            RollbackAction::RemoveDir(path) => fs::remove_dir_all(path),
            RollbackAction::RemoveFile(path) => fs::remove_file(path),
        };
        match result {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl fmt::Display for RollbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackAction::RemoveDir(path) => write!(f, "remove directory {}", path.display()),
            RollbackAction::RemoveFile(path) => write!(f, "remove file {}", path.display()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RollbackManager {
    actions: Vec<RollbackAction>,
}

impl RollbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: RollbackAction) {
        debug!(action = %action, "rollback action registered");
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[RollbackAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every action newest-first. A failing action does not stop the rest.
    pub fn execute_all(self) -> Vec<RollbackWarning> {
        info!(actions = self.actions.len(), "rolling back");
        let mut warnings = Vec::new();
        for action in self.actions.into_iter().rev() {
            match action.execute() {
                Ok(()) => debug!(action = %action, "rolled back"),
                Err(err) => {
                    warn!(action = %action, err = %err, "rollback action failed");
                    warnings.push(RollbackWarning {
                        action: action.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        warnings
    }

    /// Drop all actions after a successful run.
    pub fn discard(self) {
        debug!(actions = self.actions.len(), "discarding rollback actions");
    }
}
