//! Unified error interface, plus the one error that aborts a run.
//!
//! Every error enum in the workspace implements [`ErrorCode`]: a stable,
//! machine-readable UPPER_SNAKE code and a recoverability flag. Codes are
//! an API contract — renderers and batch callers match on them, so they
//! must not change once defined.
//!
//! [`IdentityError`] lives here (rather than in the engine) because
//! account parsing produces it and parsing is a types-level concern.

use thiserror::Error;

/// Machine-readable error-code contract.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE, prefixed with the owning domain
///   (`IDENTITY_`, `ACL_`, `CONFIG_`)
/// - Stable across versions
///
/// # Recoverability
///
/// Recoverable means retrying the same run may succeed (transient
/// directory outage) or the operator can fix the input and re-run.
/// Non-recoverable means the input itself can never resolve.
///
/// # Example
///
/// ```
/// use privgrant_types::{ErrorCode, IdentityError};
///
/// let err = IdentityError::Malformed {
///     input: "@corp".into(),
///     reason: "empty account before '@'".into(),
/// };
/// assert_eq!(err.code(), "IDENTITY_MALFORMED");
/// assert!(!err.is_recoverable());
/// ```
pub trait ErrorCode {
    /// Returns the stable machine-readable code.
    fn code(&self) -> &'static str;

    /// Whether a retry or an operator fix can clear the error.
    fn is_recoverable(&self) -> bool;
}

/// Failure to translate an account string into a canonical id.
///
/// This is the only error class that aborts a whole run: without a
/// canonical id no surface operation can be correctly scoped, so nothing
/// downstream may proceed.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The account string does not match any accepted form.
    #[error("malformed account string '{input}': {reason}")]
    Malformed {
        /// The string as entered.
        input: String,
        /// What made it unparseable.
        reason: String,
    },

    /// The directory has no such account.
    #[error("unknown account '{domain}\\{account}'")]
    UnknownAccount {
        /// Domain or computer name the lookup targeted.
        domain: String,
        /// Account part of the lookup.
        account: String,
    },

    /// The directory for the domain could not be reached.
    #[error("directory for domain '{domain}' unavailable: {reason}")]
    DirectoryUnavailable {
        /// Domain whose directory was unreachable.
        domain: String,
        /// Transport-level detail from the host.
        reason: String,
    },
}

impl ErrorCode for IdentityError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "IDENTITY_MALFORMED",
            Self::UnknownAccount { .. } => "IDENTITY_UNKNOWN_ACCOUNT",
            Self::DirectoryUnavailable { .. } => "IDENTITY_DIRECTORY_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // A fixed input string will never start resolving.
            Self::Malformed { .. } => false,
            // The account may be created, or the typo fixed, and re-run.
            Self::UnknownAccount { .. } => true,
            // Transient by nature.
            Self::DirectoryUnavailable { .. } => true,
        }
    }
}
