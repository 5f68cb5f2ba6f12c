//! Pure, deterministic logic: configuration model, template rendering, manifest
//! building and step metadata. No I/O.

pub mod compose;
pub mod config;
pub mod env_template;
pub mod steps;
