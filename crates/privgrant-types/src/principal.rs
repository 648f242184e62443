//! Principal (grant target) identity types.
//!
//! An [`AccountName`] is the parsed form of a human-entered account string;
//! a [`SecurityId`] is the canonical identifier that account resolves to.
//! [`PrincipalIdentity`] pairs the two and is the only identity value the
//! rest of the system ever sees.
//!
//! # Design Rationale
//!
//! These types are placed here (not in the engine) because every codec
//! compares trustees by [`SecurityId`], and the codecs must not depend on
//! resolution machinery. Identity is pure data; resolving it against a
//! directory is the engine's job.
//!
//! # Parsing Rules
//!
//! Account strings are accepted in three forms, tried in this order:
//!
//! | Form | Example | Domain part |
//! |------|---------|-------------|
//! | `DOMAIN\name` | `CORP\svc-monitor` | `CORP` (placeholders `.` and `BUILTIN` mean "this computer") |
//! | `name@domain.tld` | `svc-monitor@corp.example.com` | first label before the first dot (`corp`) |
//! | bare `name` | `svc-monitor` | this computer |

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

// ─── SecurityId ─────────────────────────────────────────────────────

/// Canonical, stable identifier for a real-world account (`S-1-…` form).
///
/// A `SecurityId` is only ever produced by a directory lookup. It is
/// compared byte-for-byte; two accounts are the same principal iff their
/// ids are equal, regardless of which string form named them.
///
/// # Example
///
/// ```
/// use privgrant_types::SecurityId;
///
/// let id = SecurityId::new("S-1-5-21-1004336348-1177238915-682003330-1104");
/// assert!(id.as_str().starts_with("S-1-5-21"));
/// assert_eq!(id.to_string(), id.as_str());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityId(String);

impl SecurityId {
    /// Wraps a canonical id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The well-known world/everyone principal (`S-1-1-0`).
    ///
    /// Used when trimming default broad-access entries from freshly
    /// created surfaces.
    #[must_use]
    pub fn world() -> Self {
        Self("S-1-1-0".to_string())
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecurityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── AccountName ────────────────────────────────────────────────────

/// The domain component of a parsed account string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainPart {
    /// The local computer (bare names, `.\name`, `BUILTIN\name`).
    ///
    /// Substituted with the actual computer name at resolution time —
    /// this type carries no knowledge of what that name is.
    Local,
    /// An explicit domain or remote computer name.
    Named(String),
}

/// A human-entered account string, split into domain and account parts.
///
/// Parsing is purely syntactic: no lookup happens here, and a parsed name
/// says nothing about whether the account exists.
///
/// # Example
///
/// ```
/// use privgrant_types::{AccountName, DomainPart};
///
/// let name = AccountName::parse(r"CORP\svc-monitor").unwrap();
/// assert_eq!(name.domain(), &DomainPart::Named("CORP".to_string()));
/// assert_eq!(name.account(), "svc-monitor");
///
/// let upn = AccountName::parse("svc@corp.example.com").unwrap();
/// assert_eq!(upn.domain(), &DomainPart::Named("corp".to_string()));
///
/// let bare = AccountName::parse("svc-monitor").unwrap();
/// assert_eq!(bare.domain(), &DomainPart::Local);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountName {
    raw: String,
    domain: DomainPart,
    account: String,
}

impl AccountName {
    /// Parses an account string into domain and account parts.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Malformed`] when either part is empty
    /// (`\name`, `DOMAIN\`, `@domain`, `name@`, or an empty string).
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let malformed = |reason: &str| IdentityError::Malformed {
            input: raw.to_string(),
            reason: reason.to_string(),
        };

        if let Some((domain, account)) = raw.split_once('\\') {
            if domain.is_empty() {
                return Err(malformed("empty domain before '\\'"));
            }
            if account.is_empty() {
                return Err(malformed("empty account after '\\'"));
            }
            let domain = if domain == "." || domain.eq_ignore_ascii_case("BUILTIN") {
                DomainPart::Local
            } else {
                DomainPart::Named(domain.to_string())
            };
            return Ok(Self {
                raw: raw.to_string(),
                domain,
                account: account.to_string(),
            });
        }

        if let Some((account, suffix)) = raw.split_once('@') {
            if account.is_empty() {
                return Err(malformed("empty account before '@'"));
            }
            // The directory wants the short domain name, which is the
            // first label of the UPN suffix.
            let label = suffix.split('.').next().unwrap_or_default();
            if label.is_empty() {
                return Err(malformed("empty domain after '@'"));
            }
            return Ok(Self {
                raw: raw.to_string(),
                domain: DomainPart::Named(label.to_string()),
                account: account.to_string(),
            });
        }

        if raw.is_empty() {
            return Err(malformed("empty account string"));
        }
        Ok(Self {
            raw: raw.to_string(),
            domain: DomainPart::Local,
            account: raw.to_string(),
        })
    }

    /// The string as originally entered.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed domain component.
    #[must_use]
    pub fn domain(&self) -> &DomainPart {
        &self.domain
    }

    /// The parsed account component.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The domain name to hand to a directory lookup, substituting the
    /// given computer name for the local placeholder.
    #[must_use]
    pub fn domain_for_lookup<'a>(&'a self, computer: &'a str) -> &'a str {
        match &self.domain {
            DomainPart::Local => computer,
            DomainPart::Named(d) => d,
        }
    }
}

impl std::fmt::Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// ─── PrincipalIdentity ──────────────────────────────────────────────

/// A fully resolved principal: the entered name plus its canonical id.
///
/// Created exactly once per run by the identity resolver, then passed by
/// reference to every surface step. Never mutated, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    account: AccountName,
    id: SecurityId,
}

impl PrincipalIdentity {
    /// Pairs a parsed account name with the id it resolved to.
    #[must_use]
    pub fn new(account: AccountName, id: SecurityId) -> Self {
        Self { account, id }
    }

    /// The parsed account name.
    #[must_use]
    pub fn account(&self) -> &AccountName {
        &self.account
    }

    /// The canonical id every surface comparison uses.
    #[must_use]
    pub fn id(&self) -> &SecurityId {
        &self.id
    }
}

impl std::fmt::Display for PrincipalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.account, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn parses_domain_qualified_name() {
        let name = AccountName::parse(r"CORP\svc").unwrap();
        assert_eq!(name.domain(), &DomainPart::Named("CORP".to_string()));
        assert_eq!(name.account(), "svc");
        assert_eq!(name.raw(), r"CORP\svc");
    }

    #[test]
    fn dot_domain_is_local() {
        let name = AccountName::parse(r".\svc").unwrap();
        assert_eq!(name.domain(), &DomainPart::Local);
        assert_eq!(name.account(), "svc");
    }

    #[test]
    fn builtin_domain_is_local_case_insensitive() {
        for raw in [r"BUILTIN\svc", r"builtin\svc", r"Builtin\svc"] {
            let name = AccountName::parse(raw).unwrap();
            assert_eq!(name.domain(), &DomainPart::Local, "input: {raw}");
        }
    }

    #[test]
    fn upn_takes_first_label() {
        let name = AccountName::parse("svc@corp.example.com").unwrap();
        assert_eq!(name.domain(), &DomainPart::Named("corp".to_string()));
        assert_eq!(name.account(), "svc");
    }

    #[test]
    fn upn_without_dots_keeps_whole_suffix() {
        let name = AccountName::parse("svc@corp").unwrap();
        assert_eq!(name.domain(), &DomainPart::Named("corp".to_string()));
    }

    #[test]
    fn bare_name_is_local() {
        let name = AccountName::parse("svc").unwrap();
        assert_eq!(name.domain(), &DomainPart::Local);
        assert_eq!(name.account(), "svc");
    }

    #[test]
    fn backslash_wins_over_at_sign() {
        // A legal sAMAccountName may contain '@'; the '\' form is
        // checked first so the domain comes from the prefix.
        let name = AccountName::parse(r"CORP\svc@odd").unwrap();
        assert_eq!(name.domain(), &DomainPart::Named("CORP".to_string()));
        assert_eq!(name.account(), "svc@odd");
    }

    #[test]
    fn malformed_inputs_rejected() {
        for raw in ["", r"\svc", r"CORP\", "@corp", "svc@"] {
            let err = AccountName::parse(raw).unwrap_err();
            assert_eq!(err.code(), "IDENTITY_MALFORMED", "input: {raw:?}");
        }
    }

    #[test]
    fn domain_for_lookup_substitutes_local() {
        let local = AccountName::parse("svc").unwrap();
        assert_eq!(local.domain_for_lookup("HOST01"), "HOST01");

        let named = AccountName::parse(r"CORP\svc").unwrap();
        assert_eq!(named.domain_for_lookup("HOST01"), "CORP");
    }

    #[test]
    fn identity_display_includes_both_parts() {
        let identity = PrincipalIdentity::new(
            AccountName::parse(r"CORP\svc").unwrap(),
            SecurityId::new("S-1-5-21-1-2-3-1104"),
        );
        let shown = identity.to_string();
        assert!(shown.contains(r"CORP\svc"), "got: {shown}");
        assert!(shown.contains("S-1-5-21-1-2-3-1104"), "got: {shown}");
    }
}
