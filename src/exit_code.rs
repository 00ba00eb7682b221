//! Process exit codes.

/// Every hand in every file parsed.
pub const SUCCESS: i32 = 0;

/// At least one hand failed to parse, or had warnings under `--deny-warnings`.
pub const PARSE_FAILURE: i32 = 1;

/// A file could not be read or held no hands. Usage errors share this code.
pub const ERROR: i32 = 2;
