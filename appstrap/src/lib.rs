//! Bootstrap orchestration for new web application projects.
//!
//! A run is a fixed sequence of steps that installs a project template, resolves
//! its configuration, and provisions the pieces around it (environment file,
//! database, container manifests, repository). The architecture keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (configuration model, env rendering,
//!   manifest building, step states). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (process execution, documents, prompts,
//!   external tools). Every external command goes through
//!   [`io::process::ProcessRunner`] so tests can substitute a fake.
//!
//! [`pipeline`] drives the [`steps`] in order and uses [`rollback`] to undo
//! committed side effects when a fatal step fails.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod resolve;
pub mod rollback;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
