//! Side-effecting adapters: processes, files, prompts and external tools.

pub mod database;
pub mod document;
pub mod git;
pub mod process;
pub mod project;
pub mod prompt;
pub mod settings;
pub mod telemetry;
