//! Error Types for Queuehouse
//!
//! One taxonomy shared by every crate in the workspace. The lock-related
//! variants double as stable error codes in acknowledge responses, so their
//! meaning is part of the public contract:
//!
//! - `InvalidArgument`: malformed push payload, empty lock id
//! - `LockNotFound`: acknowledge with no active lock
//! - `InvalidLockId`: acknowledge whose id does not match (lock preserved)
//! - `LockExpired`: acknowledge matched a lock that already expired
//! - `ColdStoreUnavailable`: an offloaded segment could not be read back
//! - `Codec`: metadata or segment blob failed to (de)serialize
//! - `Internal`: anything else; surfaced without committing state
//!
//! All fallible functions return `Result<T>` aliased to `Result<T, Error>`
//! so `?` propagation works throughout.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no active lock found")]
    LockNotFound,

    #[error("invalid lock id")]
    InvalidLockId,

    #[error("lock has expired")]
    LockExpired,

    #[error("cold store unavailable: {0}")]
    ColdStoreUnavailable(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code, used in acknowledge responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::LockNotFound => "LOCK_NOT_FOUND",
            Error::InvalidLockId => "INVALID_LOCK_ID",
            Error::LockExpired => "LOCK_EXPIRED",
            Error::ColdStoreUnavailable(_) => "COLD_STORE_UNAVAILABLE",
            Error::Codec(_) => "CODEC_ERROR",
            Error::Internal(_) => "INTERNAL",
        }
    }
}
