//! Deterministic in-memory host.
//!
//! [`MemoryHost`] implements every surface seam against plain data
//! structures. It backs the test suites and CLI rehearsal runs, and can
//! be seeded from a JSON [`MemorySnapshot`] describing the host state a
//! rehearsal should start from.
//!
//! Fidelity notes, matching the real surfaces where the engine can tell
//! the difference:
//!
//! - name lookups (accounts, groups, namespaces, services, shares) are
//!   case-insensitive;
//! - a freshly created share gets a broad default entry (world, full
//!   control) that callers are expected to trim;
//! - a descriptor write-back that does not parse is rejected and leaves
//!   the stored descriptor unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use privgrant_acl::{
    AccountDirectory, AclError, DirectoryAcl, DirectorySecurity, FsAce, FsInheritance, FsRight,
    GroupMembership, NamespaceAce, NamespaceAcl, NamespaceSecurity, ServiceControl,
    ServiceDescriptor, ServiceInfo, ServiceSecurity, ShareAcl, ShareSecurity,
};
use privgrant_types::{AceEffect, IdentityError, SecurityId};

/// Descriptor a fresh simulated service carries, matching the host's
/// usual stock layout (system + administrators, then an audit segment).
pub const STOCK_DESCRIPTOR: &str = "D:(A;;CCLCSWRPWPDTLOCRRC;;;SY)(A;;CCDCLCSWRPWPDTLOCRSDRCWDWO;;;BA)S:(AU;FA;CCDCLCSWRPWPDTLOCRSDRCWDWO;;;WD)";

#[derive(Debug, Clone)]
struct ServiceRecord {
    info: ServiceInfo,
    dependents: Vec<String>,
    descriptor: String,
}

#[derive(Debug, Clone)]
struct ShareRecord {
    name: String,
    path: PathBuf,
    acl: ShareAcl,
}

/// In-memory implementation of every host surface seam.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    computer: String,
    accounts: HashMap<(String, String), SecurityId>,
    groups: Vec<(String, Vec<SecurityId>)>,
    namespaces: Vec<(String, NamespaceAcl)>,
    directories: Vec<(PathBuf, DirectoryAcl)>,
    shares: Vec<ShareRecord>,
    services: Vec<ServiceRecord>,
    scm_descriptor: String,
    default_log_dir: Option<PathBuf>,
    service_ops: Vec<String>,
}

impl MemoryHost {
    /// An empty host with the given computer name.
    #[must_use]
    pub fn new(computer: impl Into<String>) -> Self {
        Self {
            computer: computer.into(),
            accounts: HashMap::new(),
            groups: Vec::new(),
            namespaces: Vec::new(),
            directories: Vec::new(),
            shares: Vec::new(),
            services: Vec::new(),
            scm_descriptor: STOCK_DESCRIPTOR.to_string(),
            default_log_dir: None,
            service_ops: Vec::new(),
        }
    }

    // ─── Builders ───────────────────────────────────────────────────

    /// Registers an account the directory can resolve.
    #[must_use]
    pub fn with_account(mut self, domain: &str, account: &str, id: SecurityId) -> Self {
        self.accounts
            .insert((domain.to_uppercase(), account.to_lowercase()), id);
        self
    }

    /// Registers an empty local group.
    #[must_use]
    pub fn with_group(mut self, name: &str) -> Self {
        self.groups.push((name.to_string(), Vec::new()));
        self
    }

    /// Registers a namespace with the given access list.
    #[must_use]
    pub fn with_namespace(mut self, path: &str, acl: NamespaceAcl) -> Self {
        self.namespaces.push((path.to_string(), acl));
        self
    }

    /// Registers a directory with the given ACL and, if none is set
    /// yet, makes it the host default log directory.
    #[must_use]
    pub fn with_directory(mut self, path: impl Into<PathBuf>, acl: DirectoryAcl) -> Self {
        let path = path.into();
        if self.default_log_dir.is_none() {
            self.default_log_dir = Some(path.clone());
        }
        self.directories.push((path, acl));
        self
    }

    /// Registers a service with its dependents and the stock descriptor.
    #[must_use]
    pub fn with_service(mut self, name: &str, display_name: &str, running: bool, dependents: &[&str]) -> Self {
        self.services.push(ServiceRecord {
            info: ServiceInfo {
                name: name.to_string(),
                display_name: display_name.to_string(),
                running,
            },
            dependents: dependents.iter().map(|d| (*d).to_string()).collect(),
            descriptor: STOCK_DESCRIPTOR.to_string(),
        });
        self
    }

    /// Stop/start calls made so far, in order (`"stop Winmgmt"`, …).
    #[must_use]
    pub fn service_ops(&self) -> &[String] {
        &self.service_ops
    }

    /// Whether the named service is currently running.
    #[must_use]
    pub fn service_running(&self, name: &str) -> Option<bool> {
        self.find_service(name).map(|s| s.info.running)
    }

    // ─── Lookup helpers ─────────────────────────────────────────────

    fn find_service(&self, name: &str) -> Option<&ServiceRecord> {
        self.services
            .iter()
            .find(|s| s.info.name.eq_ignore_ascii_case(name))
    }

    fn find_service_mut(&mut self, name: &str) -> Option<&mut ServiceRecord> {
        self.services
            .iter_mut()
            .find(|s| s.info.name.eq_ignore_ascii_case(name))
    }

    fn find_group_mut(&mut self, name: &str) -> Option<&mut Vec<SecurityId>> {
        self.groups
            .iter_mut()
            .find(|(g, _)| g.eq_ignore_ascii_case(name))
            .map(|(_, members)| members)
    }
}

// ─── Seam implementations ───────────────────────────────────────────

impl AccountDirectory for MemoryHost {
    fn computer_name(&self) -> String {
        self.computer.clone()
    }

    fn lookup_account(&self, domain: &str, account: &str) -> Result<SecurityId, IdentityError> {
        self.accounts
            .get(&(domain.to_uppercase(), account.to_lowercase()))
            .cloned()
            .ok_or_else(|| IdentityError::UnknownAccount {
                domain: domain.to_string(),
                account: account.to_string(),
            })
    }
}

impl GroupMembership for MemoryHost {
    fn is_member(&self, group: &str, id: &SecurityId) -> Result<bool, AclError> {
        self.groups
            .iter()
            .find(|(g, _)| g.eq_ignore_ascii_case(group))
            .map(|(_, members)| members.contains(id))
            .ok_or_else(|| AclError::unavailable(format!("group '{group}'")))
    }

    fn add_member(&mut self, group: &str, id: &SecurityId) -> Result<(), AclError> {
        let members = self
            .find_group_mut(group)
            .ok_or_else(|| AclError::unavailable(format!("group '{group}'")))?;
        if !members.contains(id) {
            members.push(id.clone());
        }
        Ok(())
    }
}

impl NamespaceSecurity for MemoryHost {
    fn namespace_acl(&self, path: &str) -> Result<NamespaceAcl, AclError> {
        self.namespaces
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(path))
            .map(|(_, acl)| acl.clone())
            .ok_or_else(|| AclError::unavailable(format!("namespace '{path}'")))
    }

    fn set_namespace_acl(&mut self, path: &str, acl: &NamespaceAcl) -> Result<(), AclError> {
        let slot = self
            .namespaces
            .iter_mut()
            .find(|(p, _)| p.eq_ignore_ascii_case(path))
            .ok_or_else(|| AclError::unavailable(format!("namespace '{path}'")))?;
        slot.1 = acl.clone();
        Ok(())
    }
}

impl DirectorySecurity for MemoryHost {
    fn default_log_directory(&self) -> Result<PathBuf, AclError> {
        self.default_log_dir
            .clone()
            .ok_or_else(|| AclError::unavailable("default log directory"))
    }

    fn directory_acl(&self, path: &Path) -> Result<DirectoryAcl, AclError> {
        self.directories
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, acl)| acl.clone())
            .ok_or_else(|| AclError::unavailable(format!("directory '{}'", path.display())))
    }

    fn set_directory_acl(&mut self, path: &Path, acl: &DirectoryAcl) -> Result<(), AclError> {
        let slot = self
            .directories
            .iter_mut()
            .find(|(p, _)| p == path)
            .ok_or_else(|| AclError::unavailable(format!("directory '{}'", path.display())))?;
        slot.1 = acl.clone();
        Ok(())
    }
}

impl ShareSecurity for MemoryHost {
    fn share_for_path(&self, path: &Path) -> Result<Option<String>, AclError> {
        Ok(self
            .shares
            .iter()
            .find(|s| s.path == path)
            .map(|s| s.name.clone()))
    }

    fn create_share(&mut self, name: &str, path: &Path) -> Result<(), AclError> {
        if self.shares.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(AclError::ApplyRejected {
                surface: format!("share '{name}'"),
                reason: "share name already in use".to_string(),
            });
        }
        // Hosts create shares with a broad default entry; trimming it
        // is the caller's job.
        self.shares.push(ShareRecord {
            name: name.to_string(),
            path: path.to_path_buf(),
            acl: ShareAcl::from_entries(vec![FsAce {
                trustee: SecurityId::world(),
                right: FsRight::FullControl,
                inheritance: FsInheritance::empty(),
                effect: AceEffect::Allow,
            }]),
        });
        Ok(())
    }

    fn share_acl(&self, name: &str) -> Result<ShareAcl, AclError> {
        self.shares
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.acl.clone())
            .ok_or_else(|| AclError::unavailable(format!("share '{name}'")))
    }

    fn set_share_acl(&mut self, name: &str, acl: &ShareAcl) -> Result<(), AclError> {
        let share = self
            .shares
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AclError::unavailable(format!("share '{name}'")))?;
        share.acl = acl.clone();
        Ok(())
    }
}

impl ServiceSecurity for MemoryHost {
    fn service_descriptor(&self, service: &str) -> Result<String, AclError> {
        if service.eq_ignore_ascii_case("scmanager") {
            return Ok(self.scm_descriptor.clone());
        }
        self.find_service(service)
            .map(|s| s.descriptor.clone())
            .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))
    }

    fn set_service_descriptor(&mut self, service: &str, descriptor: &str) -> Result<(), AclError> {
        // The host validates before accepting; a malformed descriptor
        // leaves the stored one in force.
        if ServiceDescriptor::parse(descriptor).is_err() {
            return Err(AclError::ApplyRejected {
                surface: format!("service '{service}'"),
                reason: "malformed security descriptor".to_string(),
            });
        }
        if service.eq_ignore_ascii_case("scmanager") {
            self.scm_descriptor = descriptor.to_string();
            return Ok(());
        }
        let record = self
            .find_service_mut(service)
            .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))?;
        record.descriptor = descriptor.to_string();
        Ok(())
    }
}

impl ServiceControl for MemoryHost {
    fn services(&self) -> Result<Vec<ServiceInfo>, AclError> {
        Ok(self.services.iter().map(|s| s.info.clone()).collect())
    }

    fn dependents_of(&self, service: &str) -> Result<Vec<ServiceInfo>, AclError> {
        let record = self
            .find_service(service)
            .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))?;
        Ok(record
            .dependents
            .iter()
            .filter_map(|d| self.find_service(d).map(|s| s.info.clone()))
            .collect())
    }

    fn stop_service(&mut self, service: &str) -> Result<(), AclError> {
        let record = self
            .find_service_mut(service)
            .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))?;
        record.info.running = false;
        let name = record.info.name.clone();
        self.service_ops.push(format!("stop {name}"));
        Ok(())
    }

    fn start_service(&mut self, service: &str) -> Result<(), AclError> {
        let record = self
            .find_service_mut(service)
            .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))?;
        record.info.running = true;
        let name = record.info.name.clone();
        self.service_ops.push(format!("start {name}"));
        Ok(())
    }
}

// ─── Snapshot seeding ───────────────────────────────────────────────

/// JSON-loadable description of a host state for rehearsal runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub computer: String,
    #[serde(default)]
    pub accounts: Vec<SnapshotAccount>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub namespaces: Vec<SnapshotNamespace>,
    #[serde(default)]
    pub directories: Vec<SnapshotDirectory>,
    #[serde(default)]
    pub services: Vec<SnapshotService>,
    #[serde(default)]
    pub default_log_directory: Option<PathBuf>,
}

/// One resolvable account in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAccount {
    pub domain: String,
    pub name: String,
    pub id: SecurityId,
}

/// One namespace in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNamespace {
    pub path: String,
    #[serde(default)]
    pub aces: Vec<NamespaceAce>,
}

/// One directory in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDirectory {
    pub path: PathBuf,
    #[serde(default)]
    pub entries: Vec<FsAce>,
}

/// One service in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotService {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "SnapshotService::default_running")]
    pub running: bool,
    #[serde(default)]
    pub dependents: Vec<String>,
}

impl SnapshotService {
    fn default_running() -> bool {
        true
    }
}

impl MemoryHost {
    /// Builds a host from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &MemorySnapshot) -> Self {
        let mut host = Self::new(snapshot.computer.clone());
        for account in &snapshot.accounts {
            host = host.with_account(&account.domain, &account.name, account.id.clone());
        }
        for group in &snapshot.groups {
            host = host.with_group(group);
        }
        for ns in &snapshot.namespaces {
            host = host.with_namespace(&ns.path, NamespaceAcl::from_aces(ns.aces.clone()));
        }
        for dir in &snapshot.directories {
            host = host.with_directory(&dir.path, DirectoryAcl::from_entries(dir.entries.clone()));
        }
        if let Some(log_dir) = &snapshot.default_log_directory {
            host.default_log_dir = Some(log_dir.clone());
        }
        for svc in &snapshot.services {
            let dependents: Vec<&str> = svc.dependents.iter().map(String::as_str).collect();
            let display = if svc.display_name.is_empty() {
                svc.name.clone()
            } else {
                svc.display_name.clone()
            };
            host = host.with_service(&svc.name, &display, svc.running, &dependents);
        }
        host
    }

    /// A representative rehearsal host: the two monitoring groups, the
    /// default namespace, a log directory, and a small database-engine
    /// service family under the management service.
    #[must_use]
    pub fn rehearsal() -> Self {
        Self::new("HOST01")
            .with_account(
                "HOST01",
                "svc-monitor",
                SecurityId::new("S-1-5-21-1004336348-1177238915-682003330-1104"),
            )
            .with_account(
                "CORP",
                "svc-monitor",
                SecurityId::new("S-1-5-21-2004336348-2177238915-1682003330-2104"),
            )
            .with_group("Performance Monitor Users")
            .with_group("Event Log Readers")
            .with_namespace("root/cimv2", NamespaceAcl::new())
            .with_directory("C:/ProgramData/Monitor/Logs", DirectoryAcl::new())
            .with_service(
                "Winmgmt",
                "Windows Management Instrumentation",
                true,
                &["iphlpsvc"],
            )
            .with_service("iphlpsvc", "IP Helper", true, &[])
            .with_service("MSSQLSERVER", "SQL Server (MSSQLSERVER)", true, &["SQLSERVERAGENT"])
            .with_service("SQLSERVERAGENT", "SQL Server Agent (MSSQLSERVER)", true, &[])
            .with_service("SQLBrowser", "SQL Server Browser", false, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_membership_round_trip() {
        let mut host = MemoryHost::new("HOST01").with_group("Event Log Readers");
        let id = SecurityId::new("S-1-5-21-1-2-3-1104");
        assert!(!host.is_member("event log readers", &id).unwrap());
        host.add_member("Event Log Readers", &id).unwrap();
        assert!(host.is_member("EVENT LOG READERS", &id).unwrap());
    }

    #[test]
    fn missing_group_is_unavailable() {
        let host = MemoryHost::new("HOST01");
        let id = SecurityId::new("S-1-5-21-1-2-3-1104");
        assert!(host.is_member("Ghost Group", &id).unwrap_err().is_unavailable());
    }

    #[test]
    fn created_share_carries_broad_default_entry() {
        let mut host = MemoryHost::new("HOST01");
        host.create_share("Logs", Path::new("C:\\Logs")).unwrap();
        let acl = host.share_acl("Logs").unwrap();
        assert_eq!(acl.len(), 1);
        assert_eq!(acl.entries()[0].trustee, SecurityId::world());
    }

    #[test]
    fn duplicate_share_name_is_rejected() {
        let mut host = MemoryHost::new("HOST01");
        host.create_share("Logs", Path::new("C:\\A")).unwrap();
        let err = host.create_share("logs", Path::new("C:\\B")).unwrap_err();
        assert!(matches!(err, AclError::ApplyRejected { .. }));
    }

    #[test]
    fn malformed_descriptor_write_is_rejected_and_ignored() {
        let mut host = MemoryHost::new("HOST01").with_service("Svc", "Svc", true, &[]);
        let before = host.service_descriptor("Svc").unwrap();
        let err = host.set_service_descriptor("Svc", "garbage").unwrap_err();
        assert!(matches!(err, AclError::ApplyRejected { .. }));
        assert_eq!(host.service_descriptor("Svc").unwrap(), before);
    }

    #[test]
    fn scm_pseudo_service_has_a_descriptor() {
        let host = MemoryHost::new("HOST01");
        assert_eq!(host.service_descriptor("scmanager").unwrap(), STOCK_DESCRIPTOR);
    }

    #[test]
    fn snapshot_round_trip() {
        let json = r#"{
            "computer": "HOST01",
            "accounts": [{"domain": "HOST01", "name": "svc", "id": "S-1-5-21-1-2-3-9"}],
            "groups": ["Performance Monitor Users"],
            "namespaces": [{"path": "root/cimv2"}],
            "directories": [{"path": "C:\\Logs"}],
            "services": [{"name": "Winmgmt", "dependents": []}]
        }"#;
        let snapshot: MemorySnapshot = serde_json::from_str(json).unwrap();
        let host = MemoryHost::from_snapshot(&snapshot);
        assert_eq!(host.computer_name(), "HOST01");
        assert!(host.namespace_acl("root/cimv2").unwrap().is_empty());
        assert_eq!(host.default_log_directory().unwrap(), PathBuf::from("C:\\Logs"));
        assert!(host.service_running("Winmgmt").unwrap());
    }
}
