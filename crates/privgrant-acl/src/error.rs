//! Surface-step error taxonomy.
//!
//! Every fallible codec or host-seam operation returns [`AclError`]. The
//! orchestrator downgrades these to recorded step failures — only
//! identity resolution (a different error type entirely) may abort a run.

use privgrant_types::ErrorCode;
use thiserror::Error;

/// Errors from surface fetch, encode/decode, validation, and write-back.
#[derive(Debug, Error)]
pub enum AclError {
    /// The target surface does not exist on this host (no such service,
    /// namespace, path, or share). Treated as a warning + skip by
    /// callers, not a failure.
    #[error("surface unavailable: {surface}")]
    Unavailable {
        /// Which surface instance was missing.
        surface: String,
    },

    /// The surface's current state could not be decoded (for example an
    /// unparseable descriptor string).
    #[error("cannot decode current state of {surface}: {detail}")]
    Encoding {
        /// Which surface instance failed to decode.
        surface: String,
        /// What was wrong with the encoding.
        detail: String,
    },

    /// The host refused the write-back. The surface is left unchanged.
    #[error("write-back rejected for {surface}: {reason}")]
    ApplyRejected {
        /// Which surface instance rejected the write.
        surface: String,
        /// Host-supplied reason, typically privilege or concurrent
        /// modification.
        reason: String,
    },

    /// The caller supplied an impossible request (unknown right name,
    /// empty rights mask, ambiguous matcher).
    #[error("invalid request: {detail}")]
    Validation {
        /// What was invalid.
        detail: String,
    },
}

impl AclError {
    /// Convenience constructor for [`AclError::Validation`].
    #[must_use]
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    /// Convenience constructor for [`AclError::Unavailable`].
    #[must_use]
    pub fn unavailable(surface: impl Into<String>) -> Self {
        Self::Unavailable {
            surface: surface.into(),
        }
    }

    /// True when the error means "surface not present", which callers
    /// treat as skip-with-warning rather than failure.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl ErrorCode for AclError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "ACL_SURFACE_UNAVAILABLE",
            Self::Encoding { .. } => "ACL_ENCODING",
            Self::ApplyRejected { .. } => "ACL_APPLY_REJECTED",
            Self::Validation { .. } => "ACL_VALIDATION",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // The surface may be installed later; re-run then.
            Self::Unavailable { .. } => true,
            // Somebody hand-edited the surface into garbage; an operator
            // must repair it first.
            Self::Encoding { .. } => false,
            // Privilege or a concurrent writer; retry can succeed.
            Self::ApplyRejected { .. } => true,
            Self::Validation { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_distinguishable() {
        let err = AclError::unavailable("service 'ghost'");
        assert!(err.is_unavailable());
        assert_eq!(err.code(), "ACL_SURFACE_UNAVAILABLE");
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn validation_is_terminal() {
        let err = AclError::validation("unknown right name 'Fly'");
        assert!(!err.is_recoverable());
        assert_eq!(err.code(), "ACL_VALIDATION");
    }

    #[test]
    fn apply_rejected_names_the_surface() {
        let err = AclError::ApplyRejected {
            surface: "service 'MSSQLSERVER'".into(),
            reason: "access denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("MSSQLSERVER"), "got: {msg}");
        assert!(msg.contains("access denied"), "got: {msg}");
    }
}
