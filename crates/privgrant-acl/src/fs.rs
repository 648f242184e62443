//! Filesystem and network-share ACL codec.
//!
//! A thin pass-through to the host's discretionary ACL primitives.
//! Filesystem rights do not compose the way bitmask rights do, so
//! containment here is exact-match: same trustee, same right, same
//! inheritance flags, explicit allow. The directory ACL and the share
//! ACL are distinct surface instances checked and applied independently.

use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use privgrant_types::{AceEffect, SecurityId};

use crate::codec::{AccessControlCodec, RightsMask};
use crate::error::AclError;
use crate::host::{DirectorySecurity, ShareSecurity};

/// A named filesystem/share access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsRight {
    /// Read and list.
    Read,
    /// Read, write, create, delete children.
    Modify,
    /// Everything, including permission changes.
    FullControl,
}

impl std::fmt::Display for FsRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Modify => f.write_str("modify"),
            Self::FullControl => f.write_str("full-control"),
        }
    }
}

bitflags! {
    /// Inheritance flags on a filesystem entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FsInheritance: u8 {
        /// Propagate to subdirectories.
        const CONTAINER_INHERIT = 0x1;
        /// Propagate to files.
        const OBJECT_INHERIT    = 0x2;
    }
}

impl FsInheritance {
    /// This folder, subfolders, and files — the usual directory grant.
    pub const FULL: Self = Self::CONTAINER_INHERIT.union(Self::OBJECT_INHERIT);
}

/// The desired grant on a filesystem or share surface: one right plus
/// the inheritance it must carry. Shares use empty inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsGrant {
    pub right: FsRight,
    pub inheritance: FsInheritance,
}

impl FsGrant {
    /// A directory grant propagating to subfolders and files.
    #[must_use]
    pub fn directory(right: FsRight) -> Self {
        Self {
            right,
            inheritance: FsInheritance::FULL,
        }
    }

    /// A share grant (shares carry no inheritance).
    #[must_use]
    pub fn share(right: FsRight) -> Self {
        Self {
            right,
            inheritance: FsInheritance::empty(),
        }
    }
}

impl RightsMask for FsGrant {
    fn is_empty(&self) -> bool {
        // A grant always names exactly one right.
        false
    }
}

/// One discretionary entry on a directory or share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsAce {
    pub trustee: SecurityId,
    pub right: FsRight,
    pub inheritance: FsInheritance,
    pub effect: AceEffect,
}

/// Ordered discretionary ACL of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAcl {
    entries: Vec<FsAce>,
}

/// Ordered access list of one share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAcl {
    entries: Vec<FsAce>,
}

macro_rules! fs_list_impl {
    ($ty:ident) => {
        impl $ty {
            /// An empty list.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Builds a list from entries in host order.
            #[must_use]
            pub fn from_entries(entries: Vec<FsAce>) -> Self {
                Self { entries }
            }

            /// The entries, in host order.
            #[must_use]
            pub fn entries(&self) -> &[FsAce] {
                &self.entries
            }

            /// Number of entries.
            #[must_use]
            pub fn len(&self) -> usize {
                self.entries.len()
            }

            /// True when the list has no entries.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.entries.is_empty()
            }
        }
    };
}

fs_list_impl!(DirectoryAcl);
fs_list_impl!(ShareAcl);

// The two fs codecs share their comparison rule.
fn fs_contains(entries: &[FsAce], trustee: &SecurityId, grant: FsGrant, effect: AceEffect) -> bool {
    entries.iter().any(|e| {
        e.trustee == *trustee
            && e.right == grant.right
            && e.inheritance == grant.inheritance
            && e.effect == effect
    })
}

fn fs_has_ace(entries: &[FsAce], trustee: &SecurityId, effect: AceEffect) -> bool {
    entries
        .iter()
        .any(|e| e.trustee == *trustee && e.effect == effect)
}

/// Codec over [`DirectorySecurity`] for directory ACLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryAclCodec;

impl AccessControlCodec for DirectoryAclCodec {
    type Host = dyn DirectorySecurity;
    type SurfaceRef = Path;
    type Rights = FsGrant;
    type List = DirectoryAcl;

    fn fetch(&self, host: &Self::Host, surface: &Path) -> Result<DirectoryAcl, AclError> {
        host.directory_acl(surface)
    }

    fn contains_grant(
        &self,
        list: &DirectoryAcl,
        trustee: &SecurityId,
        rights: FsGrant,
        effect: AceEffect,
    ) -> bool {
        fs_contains(&list.entries, trustee, rights, effect)
    }

    fn has_ace_for(&self, list: &DirectoryAcl, trustee: &SecurityId, effect: AceEffect) -> bool {
        fs_has_ace(&list.entries, trustee, effect)
    }

    fn with_grant_added(
        &self,
        list: &DirectoryAcl,
        trustee: &SecurityId,
        rights: FsGrant,
        effect: AceEffect,
    ) -> Result<DirectoryAcl, AclError> {
        let mut updated = list.clone();
        updated.entries.push(FsAce {
            trustee: trustee.clone(),
            right: rights.right,
            inheritance: rights.inheritance,
            effect,
        });
        Ok(updated)
    }

    fn with_principal_removed(&self, list: &DirectoryAcl, trustee: &SecurityId) -> DirectoryAcl {
        DirectoryAcl {
            entries: list
                .entries
                .iter()
                .filter(|e| e.trustee != *trustee)
                .cloned()
                .collect(),
        }
    }

    fn apply(&self, host: &mut Self::Host, surface: &Path, list: &DirectoryAcl) -> Result<(), AclError> {
        host.set_directory_acl(surface, list)
    }
}

/// Codec over [`ShareSecurity`] for share ACLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareAclCodec;

impl AccessControlCodec for ShareAclCodec {
    type Host = dyn ShareSecurity;
    type SurfaceRef = str;
    type Rights = FsGrant;
    type List = ShareAcl;

    fn fetch(&self, host: &Self::Host, surface: &str) -> Result<ShareAcl, AclError> {
        host.share_acl(surface)
    }

    fn contains_grant(
        &self,
        list: &ShareAcl,
        trustee: &SecurityId,
        rights: FsGrant,
        effect: AceEffect,
    ) -> bool {
        fs_contains(&list.entries, trustee, rights, effect)
    }

    fn has_ace_for(&self, list: &ShareAcl, trustee: &SecurityId, effect: AceEffect) -> bool {
        fs_has_ace(&list.entries, trustee, effect)
    }

    fn with_grant_added(
        &self,
        list: &ShareAcl,
        trustee: &SecurityId,
        rights: FsGrant,
        effect: AceEffect,
    ) -> Result<ShareAcl, AclError> {
        let mut updated = list.clone();
        updated.entries.push(FsAce {
            trustee: trustee.clone(),
            right: rights.right,
            inheritance: rights.inheritance,
            effect,
        });
        Ok(updated)
    }

    fn with_principal_removed(&self, list: &ShareAcl, trustee: &SecurityId) -> ShareAcl {
        ShareAcl {
            entries: list
                .entries
                .iter()
                .filter(|e| e.trustee != *trustee)
                .cloned()
                .collect(),
        }
    }

    fn apply(&self, host: &mut Self::Host, surface: &str, list: &ShareAcl) -> Result<(), AclError> {
        host.set_share_acl(surface, list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(n: u32) -> SecurityId {
        SecurityId::new(format!("S-1-5-21-9-8-7-{n}"))
    }

    #[test]
    fn containment_is_exact_match() {
        let codec = DirectoryAclCodec;
        let list = DirectoryAcl::from_entries(vec![FsAce {
            trustee: sid(1104),
            right: FsRight::Modify,
            inheritance: FsInheritance::FULL,
            effect: AceEffect::Allow,
        }]);

        assert!(codec.contains_grant(
            &list,
            &sid(1104),
            FsGrant::directory(FsRight::Modify),
            AceEffect::Allow
        ));
        // Modify does not imply Read on this surface: exact match only.
        assert!(!codec.contains_grant(
            &list,
            &sid(1104),
            FsGrant::directory(FsRight::Read),
            AceEffect::Allow
        ));
        // Same right, different inheritance: no match.
        assert!(!codec.contains_grant(
            &list,
            &sid(1104),
            FsGrant::share(FsRight::Modify),
            AceEffect::Allow
        ));
    }

    #[test]
    fn share_grant_carries_no_inheritance() {
        let grant = FsGrant::share(FsRight::Read);
        assert!(grant.inheritance.is_empty());
        let dir = FsGrant::directory(FsRight::Modify);
        assert_eq!(dir.inheritance, FsInheritance::FULL);
    }

    #[test]
    fn removal_keeps_other_trustees_identical() {
        let codec = ShareAclCodec;
        let everyone = FsAce {
            trustee: SecurityId::world(),
            right: FsRight::FullControl,
            inheritance: FsInheritance::empty(),
            effect: AceEffect::Allow,
        };
        let named = FsAce {
            trustee: sid(1104),
            right: FsRight::Read,
            inheritance: FsInheritance::empty(),
            effect: AceEffect::Allow,
        };
        let list = ShareAcl::from_entries(vec![everyone.clone(), named.clone()]);

        let trimmed = codec.with_principal_removed(&list, &SecurityId::world());
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed.entries()[0], named);
    }

    #[test]
    fn add_appends_in_order() {
        let codec = ShareAclCodec;
        let list = codec
            .with_grant_added(
                &ShareAcl::new(),
                &sid(1104),
                FsGrant::share(FsRight::Read),
                AceEffect::Allow,
            )
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].right, FsRight::Read);
        assert_eq!(list.entries()[0].effect, AceEffect::Allow);
    }
}
