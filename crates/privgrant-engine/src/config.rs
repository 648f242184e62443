//! Run configuration.
//!
//! Callers describe a run as JSON: one entry per principal, each with
//! per-surface skip flags, an optional restart flag, an optional
//! log-directory override, and an optional service-grant list. The raw
//! serde shapes here are validated into [`PrincipalPlan`]s — pattern
//! compilation, right-name parsing, and matcher-shape checks all happen
//! before any surface is touched, so a bad entry can never half-apply.
//!
//! # Example
//!
//! ```json
//! {
//!   "principals": [{
//!     "account": "CORP\\svc-monitor",
//!     "restartNamespaceService": true,
//!     "logDirectory": "C:\\ProgramData\\Monitor\\Logs",
//!     "services": [
//!       { "name": "scmanager",
//!         "accessFlags": ["QueryStatus", "EnumerateDependents", "ReadControl"] },
//!       { "namePattern": "^MSSQL",
//!         "accessFlags": ["ChangeConfig", "QueryStatus", "QueryConfig", "ReadControl"] }
//!     ]
//!   }]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use privgrant_acl::AclError;
use privgrant_types::{ErrorCode, ServiceRights};

use crate::matcher::{ServiceGrant, ServiceMatcher};

/// Rights granted to every service in the default grant list.
const DEFAULT_SERVICE_RIGHTS: ServiceRights = ServiceRights::CHANGE_CONFIG
    .union(ServiceRights::QUERY_STATUS)
    .union(ServiceRights::QUERY_CONFIG)
    .union(ServiceRights::READ_CONTROL);

/// Configuration loading/validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry failed validation.
    #[error("entry for '{account}': {source}")]
    Entry {
        account: String,
        #[source]
        source: AclError,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Entry { .. } => "CONFIG_ENTRY",
        }
    }

    fn is_recoverable(&self) -> bool {
        // All of these are operator-fixable inputs.
        true
    }
}

/// Per-surface skip flags. `true` means "do not touch this surface".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SurfaceToggles {
    pub groups: bool,
    pub namespace: bool,
    pub filesystem: bool,
    pub services: bool,
}

/// One service entry as written in configuration. Exactly one of
/// `name`/`name_pattern` must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceGrantEntry {
    pub name: Option<String>,
    pub name_pattern: Option<String>,
    pub access_flags: Vec<String>,
}

impl ServiceGrantEntry {
    fn validate(&self) -> Result<ServiceGrant, AclError> {
        let matcher = match (&self.name, &self.name_pattern) {
            (Some(name), None) => {
                if name.is_empty() {
                    return Err(AclError::validation("empty service name"));
                }
                ServiceMatcher::exact(name.clone())
            }
            (None, Some(pattern)) => ServiceMatcher::pattern(pattern)?,
            (Some(_), Some(_)) => {
                return Err(AclError::validation(
                    "service entry has both 'name' and 'namePattern'",
                ))
            }
            (None, None) => {
                return Err(AclError::validation(
                    "service entry has neither 'name' nor 'namePattern'",
                ))
            }
        };

        if self.access_flags.is_empty() {
            return Err(AclError::validation(format!(
                "service entry ({matcher}) has no access flags"
            )));
        }
        let (rights, unknown) = ServiceRights::parse_list_with_all(&self.access_flags);
        if !unknown.is_empty() {
            return Err(AclError::validation(format!(
                "unknown service right name(s): {}",
                unknown.join(", ")
            )));
        }
        Ok(ServiceGrant { matcher, rights })
    }
}

/// One principal entry as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalEntry {
    /// Account string in any accepted form.
    pub account: String,
    /// Per-surface skip flags.
    #[serde(default)]
    pub skip: SurfaceToggles,
    /// Restart the namespace service after an applied namespace change.
    #[serde(default)]
    pub restart_namespace_service: bool,
    /// Overrides the host's default log directory.
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    /// Service grants; the default list applies when absent.
    #[serde(default)]
    pub services: Option<Vec<ServiceGrantEntry>>,
}

impl PrincipalEntry {
    /// Validates the entry into an executable plan.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Entry`] describing the first invalid service
    /// entry (ambiguous matcher shape, bad pattern, unknown right name,
    /// empty flag list).
    pub fn validate(&self) -> Result<PrincipalPlan, ConfigError> {
        let entry_err = |source| ConfigError::Entry {
            account: self.account.clone(),
            source,
        };
        if self.account.is_empty() {
            return Err(entry_err(AclError::validation("empty account string")));
        }

        let service_grants = match &self.services {
            Some(entries) => entries
                .iter()
                .map(ServiceGrantEntry::validate)
                .collect::<Result<Vec<_>, _>>()
                .map_err(entry_err)?,
            None => default_service_grants(),
        };

        Ok(PrincipalPlan {
            account: self.account.clone(),
            skip: self.skip,
            restart_namespace_service: self.restart_namespace_service,
            log_directory: self.log_directory.clone(),
            service_grants,
        })
    }
}

/// A validated, executable per-principal plan.
#[derive(Debug, Clone)]
pub struct PrincipalPlan {
    pub account: String,
    pub skip: SurfaceToggles,
    pub restart_namespace_service: bool,
    pub log_directory: Option<PathBuf>,
    pub service_grants: Vec<ServiceGrant>,
}

/// The default service-grant list: the service control manager plus the
/// database-engine family (default instances by name, named instances by
/// pattern), each with ChangeConfig, QueryStatus, QueryConfig and
/// ReadControl.
#[must_use]
pub fn default_service_grants() -> Vec<ServiceGrant> {
    let grant = |matcher| ServiceGrant {
        matcher,
        rights: DEFAULT_SERVICE_RIGHTS,
    };
    vec![
        grant(ServiceMatcher::exact("scmanager")),
        grant(ServiceMatcher::exact("MSSQLSERVER")),
        grant(ServiceMatcher::exact("SQLSERVERAGENT")),
        grant(ServiceMatcher::pattern(r"^MSSQL\$").expect("literal pattern")),
        grant(ServiceMatcher::pattern(r"^SQLAgent\$").expect("literal pattern")),
    ]
}

/// A whole run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantConfig {
    pub principals: Vec<PrincipalEntry>,
}

impl GrantConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Validates every entry, failing on the first bad one.
    pub fn validate(&self) -> Result<Vec<PrincipalPlan>, ConfigError> {
        self.principals.iter().map(PrincipalEntry::validate).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_entry_gets_default_service_grants() {
        let config = GrantConfig::from_json(r#"{"principals":[{"account":"CORP\\svc"}]}"#).unwrap();
        let plans = config.validate().unwrap();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.account, r"CORP\svc");
        assert!(!plan.restart_namespace_service);
        assert_eq!(plan.service_grants.len(), 5);
        assert_eq!(plan.service_grants[0].rights, DEFAULT_SERVICE_RIGHTS);
    }

    #[test]
    fn full_entry_round_trips() {
        let config = GrantConfig::from_json(
            r#"{
              "principals": [{
                "account": "svc@corp.example.com",
                "skip": { "groups": true },
                "restartNamespaceService": true,
                "logDirectory": "C:\\Logs",
                "services": [
                  { "name": "scmanager", "accessFlags": ["QueryStatus", "ReadControl"] },
                  { "namePattern": "^MSSQL", "accessFlags": ["AllAccess"] }
                ]
              }]
            }"#,
        )
        .unwrap();
        let plan = &config.validate().unwrap()[0];
        assert!(plan.skip.groups);
        assert!(!plan.skip.namespace);
        assert!(plan.restart_namespace_service);
        assert_eq!(plan.log_directory.as_deref(), Some(Path::new("C:\\Logs")));
        assert_eq!(plan.service_grants.len(), 2);
        assert_eq!(plan.service_grants[1].rights, ServiceRights::ALL_ACCESS);
    }

    #[test]
    fn unknown_right_name_fails_validation() {
        let config = GrantConfig::from_json(
            r#"{"principals":[{"account":"svc","services":[
                {"name":"x","accessFlags":["QueryStatus","Levitate"]}]}]}"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ENTRY");
        assert!(err.to_string().contains("Levitate"), "got: {err}");
    }

    #[test]
    fn ambiguous_matcher_shape_fails() {
        let config = GrantConfig::from_json(
            r#"{"principals":[{"account":"svc","services":[
                {"name":"x","namePattern":"^x","accessFlags":["QueryStatus"]}]}]}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = GrantConfig::from_json(
            r#"{"principals":[{"account":"svc","services":[
                {"accessFlags":["QueryStatus"]}]}]}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_access_flags_fail() {
        let config = GrantConfig::from_json(
            r#"{"principals":[{"account":"svc","services":[{"name":"x","accessFlags":[]}]}]}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_pattern_fails() {
        let config = GrantConfig::from_json(
            r#"{"principals":[{"account":"svc","services":[
                {"namePattern":"(","accessFlags":["QueryStatus"]}]}]}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_grants_include_scm_and_engine_family() {
        let grants = default_service_grants();
        let shown: Vec<String> = grants.iter().map(|g| g.matcher.to_string()).collect();
        assert!(shown.iter().any(|s| s.contains("scmanager")), "{shown:?}");
        assert!(shown.iter().any(|s| s.contains("MSSQLSERVER")), "{shown:?}");
        assert!(shown.iter().any(|s| s.contains("MSSQL\\$")), "{shown:?}");
    }
}
