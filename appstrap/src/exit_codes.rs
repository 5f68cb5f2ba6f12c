//! Stable exit codes for the appstrap CLI.

/// The project was bootstrapped, possibly with warnings.
pub const OK: i32 = 0;
/// A fatal step failed (or the arguments were unusable) and the run was rolled back.
pub const FAILED: i32 = 1;
