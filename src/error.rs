//! Shared error types for the server core.
//!
//! Configuration and store errors live next to their modules (they carry
//! `#[from]` conversions that need those crates in scope); this module
//! holds the errors produced by the in-memory state itself.

use thiserror::Error;

/// Errors from the nickname registry.
///
/// These mirror the registry contract: adding requires a nickname and a
/// free slot; removal must name the exact client currently indexed, so a
/// stale removal can never evict someone else's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("nick missing")]
    NickMissing,
    #[error("nickname in use")]
    NicknameInUse,
    #[error("nickname mismatch")]
    NicknameMismatch,
}
