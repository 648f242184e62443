//! The codec capability interface.
//!
//! Text descriptors and binary ACE lists are incompatible encodings of
//! the same operation — "grant this principal these rights". This trait
//! is the single shape the convergence checker and the orchestrator see;
//! each concrete codec keeps its native-token knowledge private.

use privgrant_types::{AceEffect, SecurityId};

use crate::error::AclError;

/// A rights value that can tell whether it asks for anything at all.
///
/// Surfaces with composable masks implement this on their bitflags type;
/// the filesystem surface implements it on its compound grant (which by
/// construction always asks for exactly one right).
pub trait RightsMask: Copy + std::fmt::Debug {
    /// True when the value requests no rights.
    fn is_empty(&self) -> bool;
}

impl RightsMask for privgrant_types::ServiceRights {
    fn is_empty(&self) -> bool {
        privgrant_types::ServiceRights::is_empty(self)
    }
}

impl RightsMask for privgrant_types::NamespaceRights {
    fn is_empty(&self) -> bool {
        privgrant_types::NamespaceRights::is_empty(self)
    }
}

/// Encoder/decoder pair for one surface's access-control representation.
///
/// # Contract
///
/// - [`fetch`](Self::fetch) reads the surface's current list; callers
///   fetch fresh immediately before every check and never cache.
/// - [`contains_grant`](Self::contains_grant) answers "is the desired
///   grant already present" under the surface's own comparison rule
///   (superset for bitmasks, token-superset for text descriptors,
///   exact-match for filesystem rights).
/// - [`with_grant_added`](Self::with_grant_added) returns a new list with
///   one entry appended; it never widens an existing entry in place and
///   never reorders what was already there.
/// - [`with_principal_removed`](Self::with_principal_removed) filters out
///   every entry for the trustee, leaving all other entries untouched.
/// - [`apply`](Self::apply) writes the whole list back atomically; on
///   rejection the surface keeps its previous state.
///
/// Inheritance/propagation flags are folded into the codec's `Rights`
/// type where the surface needs them (the filesystem grant carries its
/// inheritance; the namespace codec applies its fixed container-inherit
/// flag internally; text descriptors carry none).
pub trait AccessControlCodec {
    /// The host seam this codec reads and writes through.
    type Host: ?Sized;
    /// How a surface instance is addressed (service name, namespace
    /// path, filesystem path, share name).
    type SurfaceRef: ?Sized;
    /// The surface's rights representation.
    type Rights: RightsMask;
    /// The decoded access-control list.
    type List;

    /// Reads and decodes the surface's current access-control list.
    fn fetch(&self, host: &Self::Host, surface: &Self::SurfaceRef) -> Result<Self::List, AclError>;

    /// Whether the list already satisfies the desired grant.
    fn contains_grant(
        &self,
        list: &Self::List,
        trustee: &SecurityId,
        rights: Self::Rights,
        effect: AceEffect,
    ) -> bool;

    /// Whether any entry for the trustee with the given effect exists,
    /// regardless of rights. Used to surface deny/allow stacking.
    fn has_ace_for(&self, list: &Self::List, trustee: &SecurityId, effect: AceEffect) -> bool;

    /// Returns a new list with the grant appended.
    fn with_grant_added(
        &self,
        list: &Self::List,
        trustee: &SecurityId,
        rights: Self::Rights,
        effect: AceEffect,
    ) -> Result<Self::List, AclError>;

    /// Returns a new list with every entry for the trustee removed.
    fn with_principal_removed(&self, list: &Self::List, trustee: &SecurityId) -> Self::List;

    /// Encodes and writes the list back to the surface.
    fn apply(
        &self,
        host: &mut Self::Host,
        surface: &Self::SurfaceRef,
        list: &Self::List,
    ) -> Result<(), AclError>;
}
