/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
/// The document does not parse or validate, or names an unknown flow/suite/collection.
pub const VALIDATION_FAILED: i32 = 2;
/// The run finished but failed or was cancelled.
pub const RUN_FAILED: i32 = 3;
pub const RUNTIME_ERROR: i32 = 4;
