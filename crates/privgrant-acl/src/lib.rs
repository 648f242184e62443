//! Access-control codecs and the convergence gate.
//!
//! Four heterogeneous security surfaces, two incompatible encodings of the
//! same idea ("this principal may do these things"), one capability
//! interface. This crate owns:
//!
//! - [`AccessControlCodec`] — the four-operation capability every surface
//!   codec implements (fetch, contains, add, remove, apply).
//! - [`descriptor`] — the text security-descriptor codec used for service
//!   objects, where rights are fixed letter tokens inside a structured
//!   string.
//! - [`namespace`] — the binary namespace-ACL codec, where rights are a
//!   bitmask and "already granted" means superset, not overlap.
//! - [`fs`] — the filesystem/share codec, a thin pass-through where
//!   comparison is exact-match because filesystem rights do not compose.
//! - [`convergence`] — the pure ADD / SKIP / ERROR decision that gates
//!   every mutation and makes re-runs free of cumulative effect.
//! - [`host`] — the surface seam traits. Trait definitions live here;
//!   implementations live in consumers (the engine's simulation host,
//!   platform adapters out-of-tree).
//!
//! # What deliberately does NOT live here
//!
//! The symbolic-rights-to-native-token tables are private to each concrete
//! codec. The text codec's letter table and the namespace codec's bit
//! values are not exported and must never be shared — the two surfaces
//! merely happen to name some rights alike.

pub mod codec;
pub mod convergence;
pub mod descriptor;
pub mod error;
pub mod fs;
pub mod host;
pub mod namespace;

pub use codec::{AccessControlCodec, RightsMask};
pub use convergence::{check, Convergence};
pub use descriptor::{ServiceDescriptor, ServiceDescriptorCodec};
pub use error::AclError;
pub use fs::{
    DirectoryAcl, DirectoryAclCodec, FsAce, FsGrant, FsInheritance, FsRight, ShareAcl,
    ShareAclCodec,
};
pub use host::{
    AccountDirectory, DirectorySecurity, GroupMembership, Host, NamespaceSecurity,
    ServiceControl, ServiceInfo, ServiceSecurity, ShareSecurity,
};
pub use namespace::{NamespaceAce, NamespaceAcl, NamespaceAclCodec};
