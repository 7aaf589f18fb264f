//! # Audit Error Types
//!
//! Defines the error contract for the audit pipeline. Every failure a
//! caller may need to distinguish maps to its own variant:
//!
//! | Category | Variant | Recovery |
//! |----------|---------|----------|
//! | Malformed on-chain record or timestamp | `Decode` | fatal, abort run |
//! | HTTP/RPC transport or non-success status | `Fetch` | fatal, except inside history pagination |
//! | Violating identity absent from directory | `MissingMapping` | fatal at render time |
//!
//! Transport errors are mapped into `Fetch` at each collaborator
//! boundary so this crate stays free of HTTP dependencies.

use thiserror::Error;

/// Error type for the audit pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    /// A raw record or field could not be decoded into the domain model.
    #[error("decode error: {0}")]
    Decode(String),

    /// A network collaborator failed (transport error, timeout, or
    /// non-success status).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A violating identity has no entry in the vote-key directory.
    /// The report line cannot be produced without it.
    #[error("identity '{identity}' missing from vote-key directory")]
    MissingMapping {
        /// The identity key that failed to resolve.
        identity: String,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
