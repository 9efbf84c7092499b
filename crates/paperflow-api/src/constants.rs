//! API-level constants.

/// Versioned prefix for all pipeline endpoints.
pub const API_PREFIX: &str = "/api/v0";

/// Default document listing page size.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Hard cap on the document listing page size.
pub const MAX_LIST_LIMIT: i64 = 200;
