//! The ADD / SKIP / ERROR gate in front of every mutation.
//!
//! [`check`] is a pure function: given a freshly fetched list, a resolved
//! trustee, and a desired grant, it decides whether anything needs to be
//! written. The orchestrator routes every intended mutation through this
//! gate first — that single rule is what makes a run safe to repeat an
//! unbounded number of times with no cumulative effect.
//!
//! # Deny/allow stacking
//!
//! When the list already carries an entry for the trustee with the
//! *opposite* effect, the decision is still [`Convergence::NeedsAdd`]
//! (matching what the host's own tooling does), but its
//! `opposing_effect` field is set so the caller can warn instead of
//! silently stacking a deny next to an allow.

use privgrant_types::{AceEffect, SecurityId};

use crate::codec::{AccessControlCodec, RightsMask};

/// Outcome of a convergence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// The grant is already present; do not write.
    Satisfied,
    /// The grant is absent; append it.
    NeedsAdd {
        /// An entry with the opposite effect exists for this trustee.
        opposing_effect: bool,
    },
    /// The desired grant is unsatisfiable as stated.
    Invalid(String),
}

impl Convergence {
    /// True when nothing needs to be written.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }
}

/// Decides whether the desired grant requires a write.
pub fn check<C: AccessControlCodec>(
    codec: &C,
    list: &C::List,
    trustee: &SecurityId,
    rights: C::Rights,
    effect: AceEffect,
) -> Convergence {
    if rights.is_empty() {
        return Convergence::Invalid("empty rights mask".to_string());
    }
    if codec.contains_grant(list, trustee, rights, effect) {
        return Convergence::Satisfied;
    }
    Convergence::NeedsAdd {
        opposing_effect: codec.has_ace_for(list, trustee, effect.opposite()),
    }
}
