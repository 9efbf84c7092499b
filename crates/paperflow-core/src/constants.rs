//! Shared constants for the intake pipeline.

/// Progress floor shown while an execution is running. The startup phase of
/// the remote engine is slow and reports nothing, so the UI never sits at 0%.
pub const PROGRESS_FLOOR: u8 = 25;

/// Progress ceiling while an execution is running. 95-100 is reserved for
/// confirmed completion so the UI never claims done before the engine agrees.
pub const PROGRESS_CEILING: u8 = 95;

/// Typical end-to-end duration of a remote extraction, used to estimate
/// progress when the engine reports no percentage.
pub const TYPICAL_EXECUTION_SECS: u64 = 80;

/// Prefix under which uploaded files are stored.
pub const STORAGE_PREFIX: &str = "uploads";
