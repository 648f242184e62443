//! Binary ACL codec for management namespaces.
//!
//! Namespace security is an ordered list of binary access-control
//! entries; rights are a plain bitmask ([`NamespaceRights`]). Evaluation
//! on the host is first-match-wins, but this codec never reorders — it
//! only appends and filters.
//!
//! # Superset, not overlap
//!
//! An existing entry satisfies a request only when
//! `existing & required == required`. A partially overlapping entry
//! (say, Enable alone when Enable + RemoteAccess was asked for) does not
//! count and triggers a fresh additive entry. Entries are never widened
//! in place; a duplicate pair of entries for one trustee is legal and is
//! left for the host to reconcile.
//!
//! # Removal
//!
//! Removing a principal is all-or-nothing: every entry for the trustee
//! goes, whatever its mask, and every other entry survives untouched.

use serde::{Deserialize, Serialize};

use privgrant_types::{AceEffect, NamespaceRights, SecurityId};

use crate::codec::AccessControlCodec;
use crate::error::AclError;
use crate::host::NamespaceSecurity;

/// Propagate-to-child-namespaces flag, set on every entry this codec
/// writes.
pub const CONTAINER_INHERIT: u32 = 0x2;

/// One binary access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceAce {
    /// Canonical id of the principal the entry is about.
    pub trustee: SecurityId,
    /// Granted or denied rights mask.
    pub mask: NamespaceRights,
    /// Whether the mask is granted or denied.
    pub effect: AceEffect,
    /// Raw inheritance/propagation flags, preserved as the host reports
    /// them.
    pub flags: u32,
}

/// The ordered access list of one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceAcl {
    aces: Vec<NamespaceAce>,
}

impl NamespaceAcl {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from entries in host order.
    #[must_use]
    pub fn from_aces(aces: Vec<NamespaceAce>) -> Self {
        Self { aces }
    }

    /// The entries, in host order.
    #[must_use]
    pub fn aces(&self) -> &[NamespaceAce] {
        &self.aces
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aces.len()
    }

    /// True when the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }
}

/// Codec over [`NamespaceSecurity`] for binary namespace ACLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceAclCodec;

impl AccessControlCodec for NamespaceAclCodec {
    type Host = dyn NamespaceSecurity;
    type SurfaceRef = str;
    type Rights = NamespaceRights;
    type List = NamespaceAcl;

    fn fetch(&self, host: &Self::Host, surface: &str) -> Result<NamespaceAcl, AclError> {
        host.namespace_acl(surface)
    }

    fn contains_grant(
        &self,
        list: &NamespaceAcl,
        trustee: &SecurityId,
        rights: NamespaceRights,
        effect: AceEffect,
    ) -> bool {
        list.aces.iter().any(|ace| {
            ace.trustee == *trustee && ace.effect == effect && ace.mask.contains(rights)
        })
    }

    fn has_ace_for(&self, list: &NamespaceAcl, trustee: &SecurityId, effect: AceEffect) -> bool {
        list.aces
            .iter()
            .any(|ace| ace.trustee == *trustee && ace.effect == effect)
    }

    fn with_grant_added(
        &self,
        list: &NamespaceAcl,
        trustee: &SecurityId,
        rights: NamespaceRights,
        effect: AceEffect,
    ) -> Result<NamespaceAcl, AclError> {
        if rights.is_empty() {
            return Err(AclError::validation("empty namespace rights mask"));
        }
        let mut updated = list.clone();
        updated.aces.push(NamespaceAce {
            trustee: trustee.clone(),
            mask: rights,
            effect,
            flags: CONTAINER_INHERIT,
        });
        Ok(updated)
    }

    fn with_principal_removed(&self, list: &NamespaceAcl, trustee: &SecurityId) -> NamespaceAcl {
        NamespaceAcl {
            aces: list
                .aces
                .iter()
                .filter(|ace| ace.trustee != *trustee)
                .cloned()
                .collect(),
        }
    }

    fn apply(&self, host: &mut Self::Host, surface: &str, list: &NamespaceAcl) -> Result<(), AclError> {
        host.set_namespace_acl(surface, list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u32) -> SecurityId {
        SecurityId::new(format!("S-1-5-21-1-2-3-{n}"))
    }

    fn allow(trustee: u32, mask: NamespaceRights) -> NamespaceAce {
        NamespaceAce {
            trustee: sid(trustee),
            mask,
            effect: AceEffect::Allow,
            flags: CONTAINER_INHERIT,
        }
    }

    #[test]
    fn superset_mask_satisfies() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![allow(
            1104,
            NamespaceRights::ENABLE | NamespaceRights::METHOD_EXECUTE | NamespaceRights::REMOTE_ACCESS,
        )]);
        assert!(codec.contains_grant(
            &list,
            &sid(1104),
            NamespaceRights::ENABLE | NamespaceRights::REMOTE_ACCESS,
            AceEffect::Allow
        ));
    }

    #[test]
    fn partial_overlap_does_not_satisfy() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![allow(1104, NamespaceRights::ENABLE)]);
        assert!(!codec.contains_grant(
            &list,
            &sid(1104),
            NamespaceRights::ENABLE | NamespaceRights::REMOTE_ACCESS,
            AceEffect::Allow
        ));
    }

    #[test]
    fn effect_mismatch_does_not_satisfy() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![NamespaceAce {
            trustee: sid(1104),
            mask: NamespaceRights::ENABLE,
            effect: AceEffect::Deny,
            flags: CONTAINER_INHERIT,
        }]);
        assert!(!codec.contains_grant(&list, &sid(1104), NamespaceRights::ENABLE, AceEffect::Allow));
        assert!(codec.has_ace_for(&list, &sid(1104), AceEffect::Deny));
        assert!(!codec.has_ace_for(&list, &sid(1104), AceEffect::Allow));
    }

    #[test]
    fn add_appends_and_never_widens() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![allow(1104, NamespaceRights::ENABLE)]);
        let updated = codec
            .with_grant_added(
                &list,
                &sid(1104),
                NamespaceRights::ENABLE | NamespaceRights::REMOTE_ACCESS,
                AceEffect::Allow,
            )
            .unwrap();
        assert_eq!(updated.len(), 2);
        // The pre-existing entry keeps its original (narrow) mask.
        assert_eq!(updated.aces()[0].mask, NamespaceRights::ENABLE);
        assert_eq!(
            updated.aces()[1].mask,
            NamespaceRights::ENABLE | NamespaceRights::REMOTE_ACCESS
        );
        assert_eq!(updated.aces()[1].flags, CONTAINER_INHERIT);
    }

    #[test]
    fn empty_mask_rejected() {
        let codec = NamespaceAclCodec;
        let err = codec
            .with_grant_added(
                &NamespaceAcl::new(),
                &sid(1),
                NamespaceRights::empty(),
                AceEffect::Allow,
            )
            .unwrap_err();
        assert!(matches!(err, AclError::Validation { .. }));
    }

    #[test]
    fn removal_is_all_or_nothing_per_principal() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![
            allow(1104, NamespaceRights::ENABLE),
            allow(500, NamespaceRights::FULL_WRITE),
            allow(1104, NamespaceRights::REMOTE_ACCESS),
            allow(501, NamespaceRights::READ_SECURITY),
        ]);
        let removed = codec.with_principal_removed(&list, &sid(1104));
        assert_eq!(removed.len(), 2);
        // Survivors are identical to their pre-removal form, in order.
        assert_eq!(removed.aces()[0], list.aces()[1]);
        assert_eq!(removed.aces()[1], list.aces()[3]);
    }

    #[test]
    fn removal_of_absent_principal_is_identity() {
        let codec = NamespaceAclCodec;
        let list = NamespaceAcl::from_aces(vec![allow(500, NamespaceRights::ENABLE)]);
        assert_eq!(codec.with_principal_removed(&list, &sid(1104)), list);
    }

    #[test]
    fn grant_then_regrant_converges_to_one_ace() {
        let codec = NamespaceAclCodec;
        let trustee = sid(1104);
        let rights = NamespaceRights::ENABLE | NamespaceRights::REMOTE_ACCESS;
        let first = codec
            .with_grant_added(&NamespaceAcl::new(), &trustee, rights, AceEffect::Allow)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.aces()[0].mask.bits(), 0x21);
        // Second pass: the gate sees the grant, so nothing gets added.
        assert!(codec.contains_grant(&first, &trustee, rights, AceEffect::Allow));
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let list = NamespaceAcl::from_aces(vec![allow(1104, NamespaceRights::ENABLE)]);
        let json = serde_json::to_string(&list).expect("serialize");
        let parsed: NamespaceAcl = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, list);
    }
}
