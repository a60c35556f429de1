//! Provider Constants
//!
//! Constants specific to backend implementations. Caching semantics
//! (null markers, retry policy) live in `stash_domain::constants`.

// ============================================================================
// MEMORY BACKEND CONSTANTS
// ============================================================================

/// Default entry capacity of the in-memory backend
pub const MEMORY_DEFAULT_MAX_ENTRIES: u64 = 10_000;

// ============================================================================
// FILE BACKEND CONSTANTS
// ============================================================================

/// Extension of envelope files
pub const FILE_ENVELOPE_EXTENSION: &str = "json";

/// Extension of in-progress writes; never read back
pub const FILE_TEMP_EXTENSION: &str = "tmp";

// ============================================================================
// REMOTE BACKEND CONSTANTS
// ============================================================================

/// `COUNT` hint passed to each `SCAN` step
pub const REDIS_SCAN_BATCH: usize = 100;

/// Name reported by the remote backend
pub const REDIS_BACKEND_NAME: &str = "remote";
