//! Host surface seams.
//!
//! Every security surface the engine mutates is global mutable state
//! owned by the host OS. These traits are the only way the rest of the
//! workspace reaches that state: trait definitions live here, concrete
//! implementations live in consumers (the engine ships a deterministic
//! in-memory host for tests and rehearsal runs; platform adapters
//! implement the same traits out-of-tree).
//!
//! # Scoped access
//!
//! Methods take short-lived `&self`/`&mut self` borrows — the handle
//! discipline (open immediately before use, release immediately after,
//! regardless of outcome) is the implementor's responsibility and must
//! hold per call, never across calls.
//!
//! # Read-modify-write
//!
//! Fetching an ACL and applying a modified copy are separate calls on
//! purpose: the engine re-reads immediately before every check and never
//! caches a list across operations.

use std::path::{Path, PathBuf};

use privgrant_types::{IdentityError, SecurityId};

use crate::error::AclError;
use crate::fs::{DirectoryAcl, ShareAcl};
use crate::namespace::NamespaceAcl;

/// Identity translation facility.
///
/// Lookups must be idempotent and side-effect-free: resolving the same
/// account twice returns the same id and mutates nothing.
pub trait AccountDirectory {
    /// This computer's own name, substituted for local placeholders
    /// during account parsing.
    fn computer_name(&self) -> String;

    /// Translates `domain\account` to its canonical id.
    fn lookup_account(&self, domain: &str, account: &str) -> Result<SecurityId, IdentityError>;
}

/// Local group membership.
pub trait GroupMembership {
    /// Whether the id is currently a member of the named local group.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when the group does not exist.
    fn is_member(&self, group: &str, id: &SecurityId) -> Result<bool, AclError>;

    /// Adds the id to the named local group.
    fn add_member(&mut self, group: &str, id: &SecurityId) -> Result<(), AclError>;
}

/// Management-namespace security storage.
pub trait NamespaceSecurity {
    /// Reads the namespace's current access list.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when the namespace does not exist.
    fn namespace_acl(&self, path: &str) -> Result<NamespaceAcl, AclError>;

    /// Replaces the namespace's access list atomically.
    fn set_namespace_acl(&mut self, path: &str, acl: &NamespaceAcl) -> Result<(), AclError>;
}

/// Directory ACL storage plus host log-directory discovery.
pub trait DirectorySecurity {
    /// The host's configured log directory, used when a run supplies no
    /// override.
    fn default_log_directory(&self) -> Result<PathBuf, AclError>;

    /// Reads the directory's discretionary ACL.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when the path does not exist.
    fn directory_acl(&self, path: &Path) -> Result<DirectoryAcl, AclError>;

    /// Replaces the directory's discretionary ACL atomically.
    fn set_directory_acl(&mut self, path: &Path, acl: &DirectoryAcl) -> Result<(), AclError>;
}

/// Network-share lifecycle and ACL storage.
pub trait ShareSecurity {
    /// The name of an existing share exporting `path`, if any.
    fn share_for_path(&self, path: &Path) -> Result<Option<String>, AclError>;

    /// Creates a share exporting `path`. The host applies its default
    /// (broad) access list; callers are expected to trim it immediately.
    fn create_share(&mut self, name: &str, path: &Path) -> Result<(), AclError>;

    /// Reads the share's access list.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when no such share exists.
    fn share_acl(&self, name: &str) -> Result<ShareAcl, AclError>;

    /// Replaces the share's access list atomically.
    fn set_share_acl(&mut self, name: &str, acl: &ShareAcl) -> Result<(), AclError>;
}

/// Service security-descriptor storage.
///
/// Descriptors travel as the host's structured text form. The service
/// control manager's own descriptor is addressed as the pseudo-service
/// `scmanager`.
pub trait ServiceSecurity {
    /// Reads the service's full security descriptor string.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when the service does not exist.
    fn service_descriptor(&self, service: &str) -> Result<String, AclError>;

    /// Replaces the service's security descriptor atomically. A rejected
    /// write leaves the previous descriptor in force.
    fn set_service_descriptor(&mut self, service: &str, descriptor: &str) -> Result<(), AclError>;
}

/// One service as reported by the service control manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Key name (unique).
    pub name: String,
    /// Human-facing display name.
    pub display_name: String,
    /// Whether the service is currently running.
    pub running: bool,
}

/// Service enumeration, dependency discovery, and start/stop control.
pub trait ServiceControl {
    /// Every installed service.
    fn services(&self) -> Result<Vec<ServiceInfo>, AclError>;

    /// The services that declare a dependency on `service`, in the
    /// host's enumeration order.
    ///
    /// # Errors
    ///
    /// [`AclError::Unavailable`] when the service does not exist.
    fn dependents_of(&self, service: &str) -> Result<Vec<ServiceInfo>, AclError>;

    /// Stops the service. Blocks until stopped or the host gives up.
    fn stop_service(&mut self, service: &str) -> Result<(), AclError>;

    /// Starts the service. Blocks until running or the host gives up.
    fn start_service(&mut self, service: &str) -> Result<(), AclError>;
}

/// The full set of surfaces one orchestrator run talks to.
///
/// Blanket-implemented for any type providing every seam, so hosts never
/// implement it by hand.
pub trait Host:
    AccountDirectory
    + GroupMembership
    + NamespaceSecurity
    + DirectorySecurity
    + ShareSecurity
    + ServiceSecurity
    + ServiceControl
{
}

impl<T> Host for T where
    T: AccountDirectory
        + GroupMembership
        + NamespaceSecurity
        + DirectorySecurity
        + ShareSecurity
        + ServiceSecurity
        + ServiceControl
{
}
