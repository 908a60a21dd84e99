//! Stable exit codes for builder CLI commands.

/// Command succeeded; for `builder run`, the delivery status is `success`.
pub const OK: i32 = 0;
/// Invalid config, unknown skill, bad run id or any other setup error.
pub const INVALID: i32 = 1;
/// `builder run` delivered a record with status `fail`.
pub const DELIVERY_FAILED: i32 = 2;
