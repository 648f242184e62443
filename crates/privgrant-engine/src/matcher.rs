//! Service matchers.
//!
//! A configured service entry names its targets either exactly or by
//! pattern; which one is decided at validation time, never at mutation
//! time. Matchers expand against the live service list into concrete
//! service names before any descriptor work begins. Zero matches for a
//! pattern is a warning at the call site, not an error here.

use regex::Regex;

use privgrant_acl::{AclError, ServiceInfo};
use privgrant_types::ServiceRights;

/// The service control manager's pseudo-service name. Its descriptor is
/// addressed like any service's, but it never appears in the live
/// service list, so exact matchers special-case it.
pub const SCM_SURFACE: &str = "scmanager";

/// How a configured service entry selects concrete services.
#[derive(Debug, Clone)]
pub enum ServiceMatcher {
    /// Match one service by key name, case-insensitively.
    ExactName(String),
    /// Match every service whose key name or display name matches the
    /// pattern.
    NamePattern(Regex),
}

impl ServiceMatcher {
    /// An exact-name matcher.
    #[must_use]
    pub fn exact(name: impl Into<String>) -> Self {
        Self::ExactName(name.into())
    }

    /// A pattern matcher. The pattern is compiled here, once, so an
    /// unparseable pattern fails validation instead of the apply phase.
    pub fn pattern(pattern: &str) -> Result<Self, AclError> {
        if pattern.is_empty() {
            return Err(AclError::validation("empty service name pattern"));
        }
        let regex = Regex::new(pattern)
            .map_err(|e| AclError::validation(format!("bad service name pattern: {e}")))?;
        Ok(Self::NamePattern(regex))
    }

    /// Expands the matcher against the live service list into concrete
    /// service key names, preserving list order.
    #[must_use]
    pub fn expand(&self, services: &[ServiceInfo]) -> Vec<String> {
        match self {
            Self::ExactName(name) => {
                if let Some(svc) = services
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
                {
                    vec![svc.name.clone()]
                } else if name.eq_ignore_ascii_case(SCM_SURFACE) {
                    vec![SCM_SURFACE.to_string()]
                } else {
                    Vec::new()
                }
            }
            Self::NamePattern(regex) => services
                .iter()
                .filter(|s| regex.is_match(&s.name) || regex.is_match(&s.display_name))
                .map(|s| s.name.clone())
                .collect(),
        }
    }
}

impl std::fmt::Display for ServiceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactName(name) => write!(f, "name '{name}'"),
            Self::NamePattern(regex) => write!(f, "pattern '{}'", regex.as_str()),
        }
    }
}

/// One validated service-grant request: which services, which rights.
#[derive(Debug, Clone)]
pub struct ServiceGrant {
    pub matcher: ServiceMatcher,
    pub rights: ServiceRights,
}
