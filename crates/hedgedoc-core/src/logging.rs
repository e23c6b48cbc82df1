//! Structured logging field names for the hedgedoc backend.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, request rejected or fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), entity creation/deletion |
//! | DEBUG | Decision points, resolved identifiers, config choices |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "media", "history", "auth", "notes", "users"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "notes", "filesystem"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upload", "delete", "metrics"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User UUID being operated on.
pub const USER_ID: &str = "user_id";

/// Username of the authenticated caller.
pub const USERNAME: &str = "username";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Raw note identifier from a request (id or alias).
pub const NOTE_IDENTIFIER: &str = "note";

/// Media upload id (`<hex>.<ext>`).
pub const MEDIA_ID: &str = "media_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned or affected.
pub const RESULT_COUNT: &str = "result_count";

/// Size of an uploaded payload in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Every field name above, for schema checks.
pub const ALL_FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    USER_ID,
    USERNAME,
    NOTE_ID,
    NOTE_IDENTIFIER,
    MEDIA_ID,
    DURATION_MS,
    RESULT_COUNT,
    SIZE_BYTES,
    POOL_SIZE,
    POOL_IDLE,
    ERROR_MSG,
];
