//! Text security-descriptor codec for service objects.
//!
//! Service security travels as a structured string: an optional verbatim
//! owner/group prefix, a discretionary segment (`D:` + flag characters +
//! parenthesized clauses), and an optional system segment (`S:` onwards,
//! kept verbatim). A discretionary clause has six `;`-separated fields:
//!
//! ```text
//! (type;flags;rights;object-guid;inherit-guid;trustee)
//! (A;;CCLCSWRPWPDTLOCRRC;;;S-1-5-21-…-1104)
//! ```
//!
//! Rights in this encoding are fixed two-letter tokens, not numeric
//! masks. The named-right → token table below is private to this codec:
//! no other surface may reuse it, and an unknown named right can never
//! reach it (name parsing rejects unknowns upstream).
//!
//! # Splice Position
//!
//! New clauses are appended at the end of the discretionary segment,
//! strictly before any system segment. A clause after the system segment
//! is semantically invalid on the host, so the encoder makes that state
//! unrepresentable: the system segment is stored verbatim and always
//! re-emitted last.

use std::collections::HashSet;

use privgrant_types::{AceEffect, SecurityId, ServiceRights};
use thiserror::Error;

use crate::codec::AccessControlCodec;
use crate::error::AclError;
use crate::host::ServiceSecurity;

/// Named right → rights-field token. One name, one token, never shared.
const TOKEN_TABLE: &[(ServiceRights, &str)] = &[
    (ServiceRights::QUERY_CONFIG, "CC"),
    (ServiceRights::CHANGE_CONFIG, "DC"),
    (ServiceRights::QUERY_STATUS, "LC"),
    (ServiceRights::ENUMERATE_DEPENDENTS, "SW"),
    (ServiceRights::START, "RP"),
    (ServiceRights::STOP, "WP"),
    (ServiceRights::PAUSE_CONTINUE, "DT"),
    (ServiceRights::INTERROGATE, "LO"),
    (ServiceRights::USER_DEFINED_CONTROL, "CR"),
    (ServiceRights::DELETE, "SD"),
    (ServiceRights::READ_CONTROL, "RC"),
    (ServiceRights::WRITE_DAC, "WD"),
    (ServiceRights::WRITE_OWNER, "WO"),
];

/// The generic-all token; satisfies any rights requirement.
const GENERIC_ALL: &str = "GA";

/// A descriptor string that could not be decoded.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DescriptorError(String);

/// One parsed discretionary clause, fields kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaclClause {
    /// Entry type code (`A` = allow, `D` = deny, others verbatim).
    pub ace_type: String,
    /// Inheritance/audit flag characters.
    pub flags: String,
    /// Run of two-letter rights tokens.
    pub rights: String,
    /// Object type guid (unused by services, preserved).
    pub object_guid: String,
    /// Inherited object type guid (unused by services, preserved).
    pub inherit_guid: String,
    /// Trustee: canonical id string or a host alias.
    pub trustee: String,
}

impl DaclClause {
    fn encode_into(&self, out: &mut String) {
        out.push('(');
        out.push_str(&self.ace_type);
        out.push(';');
        out.push_str(&self.flags);
        out.push(';');
        out.push_str(&self.rights);
        out.push(';');
        out.push_str(&self.object_guid);
        out.push(';');
        out.push_str(&self.inherit_guid);
        out.push(';');
        out.push_str(&self.trustee);
        out.push(')');
    }

    /// The clause's rights field as a set of two-letter tokens, or
    /// `None` when the field is not a clean token run (then it can
    /// never satisfy a requirement, but it re-encodes untouched).
    fn token_set(&self) -> Option<HashSet<&str>> {
        if self.rights.len() % 2 != 0 {
            return None;
        }
        Some(
            (0..self.rights.len())
                .step_by(2)
                .map(|i| &self.rights[i..i + 2])
                .collect(),
        )
    }
}

/// A decoded service security descriptor.
///
/// Everything not explicitly edited round-trips byte-for-byte: the
/// owner/group prefix, discretionary flag characters, clause fields, and
/// the entire system segment are stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    prefix: String,
    dacl_flags: String,
    clauses: Vec<DaclClause>,
    system: Option<String>,
}

impl ServiceDescriptor {
    /// Decodes a descriptor string.
    ///
    /// # Errors
    ///
    /// Fails when there is no discretionary segment, when a system
    /// segment precedes it, or when a clause does not have exactly six
    /// fields.
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        let dacl_at = text
            .find("D:")
            .ok_or_else(|| DescriptorError("no discretionary segment".to_string()))?;
        let prefix = &text[..dacl_at];
        if prefix.contains("S:") {
            return Err(DescriptorError(
                "system segment precedes discretionary segment".to_string(),
            ));
        }

        let mut rest = &text[dacl_at + 2..];
        let flags_end = rest.find('(').unwrap_or(rest.len());
        let (dacl_flags, tail) = rest.split_at(flags_end);
        if let Some(s_at) = dacl_flags.find("S:") {
            // Flag run ends where the system segment starts; no clauses.
            let system = format!("{}{}", &dacl_flags[s_at..], tail);
            return Ok(Self {
                prefix: prefix.to_string(),
                dacl_flags: dacl_flags[..s_at].to_string(),
                clauses: Vec::new(),
                system: Some(system),
            });
        }
        rest = tail;

        let mut clauses = Vec::new();
        while let Some(body) = rest.strip_prefix('(') {
            let close = body
                .find(')')
                .ok_or_else(|| DescriptorError("unterminated clause".to_string()))?;
            let fields: Vec<&str> = body[..close].split(';').collect();
            if fields.len() != 6 {
                return Err(DescriptorError(format!(
                    "clause has {} fields, expected 6: ({})",
                    fields.len(),
                    &body[..close]
                )));
            }
            clauses.push(DaclClause {
                ace_type: fields[0].to_string(),
                flags: fields[1].to_string(),
                rights: fields[2].to_string(),
                object_guid: fields[3].to_string(),
                inherit_guid: fields[4].to_string(),
                trustee: fields[5].to_string(),
            });
            rest = &body[close + 1..];
        }

        let system = if rest.is_empty() {
            None
        } else if rest.starts_with("S:") {
            Some(rest.to_string())
        } else {
            return Err(DescriptorError(format!(
                "trailing garbage after discretionary segment: '{rest}'"
            )));
        };

        Ok(Self {
            prefix: prefix.to_string(),
            dacl_flags: dacl_flags.to_string(),
            clauses,
            system,
        })
    }

    /// Re-encodes the descriptor to its string form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.prefix);
        out.push_str("D:");
        out.push_str(&self.dacl_flags);
        for clause in &self.clauses {
            clause.encode_into(&mut out);
        }
        if let Some(system) = &self.system {
            out.push_str(system);
        }
        out
    }

    /// The discretionary clauses, in descriptor order.
    #[must_use]
    pub fn clauses(&self) -> &[DaclClause] {
        &self.clauses
    }

    /// The verbatim system segment, if present.
    #[must_use]
    pub fn system_segment(&self) -> Option<&str> {
        self.system.as_deref()
    }
}

fn effect_code(effect: AceEffect) -> &'static str {
    match effect {
        AceEffect::Allow => "A",
        AceEffect::Deny => "D",
    }
}

/// Tokens for a rights mask. The full mask collapses to the generic-all
/// token, matching how the host's own tooling writes it.
fn rights_field(rights: ServiceRights) -> String {
    if rights == ServiceRights::ALL_ACCESS {
        return GENERIC_ALL.to_string();
    }
    let mut field = String::with_capacity(2 * TOKEN_TABLE.len());
    for (flag, token) in TOKEN_TABLE {
        if rights.contains(*flag) {
            field.push_str(token);
        }
    }
    field
}

fn required_tokens(rights: ServiceRights) -> HashSet<&'static str> {
    TOKEN_TABLE
        .iter()
        .filter(|(flag, _)| rights.contains(*flag))
        .map(|(_, token)| *token)
        .collect()
}

/// Codec over [`ServiceSecurity`] for text-form descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceDescriptorCodec;

impl ServiceDescriptorCodec {
    fn surface_label(service: &str) -> String {
        format!("service '{service}'")
    }
}

impl AccessControlCodec for ServiceDescriptorCodec {
    type Host = dyn ServiceSecurity;
    type SurfaceRef = str;
    type Rights = ServiceRights;
    type List = ServiceDescriptor;

    fn fetch(&self, host: &Self::Host, surface: &str) -> Result<ServiceDescriptor, AclError> {
        let text = host.service_descriptor(surface)?;
        ServiceDescriptor::parse(&text).map_err(|e| AclError::Encoding {
            surface: Self::surface_label(surface),
            detail: e.to_string(),
        })
    }

    fn contains_grant(
        &self,
        list: &ServiceDescriptor,
        trustee: &SecurityId,
        rights: ServiceRights,
        effect: AceEffect,
    ) -> bool {
        let required = required_tokens(rights);
        list.clauses
            .iter()
            .filter(|c| c.ace_type == effect_code(effect) && c.trustee == trustee.as_str())
            .filter_map(DaclClause::token_set)
            .any(|have| {
                have.contains(GENERIC_ALL) || required.iter().all(|t| have.contains(t))
            })
    }

    fn has_ace_for(&self, list: &ServiceDescriptor, trustee: &SecurityId, effect: AceEffect) -> bool {
        list.clauses
            .iter()
            .any(|c| c.ace_type == effect_code(effect) && c.trustee == trustee.as_str())
    }

    fn with_grant_added(
        &self,
        list: &ServiceDescriptor,
        trustee: &SecurityId,
        rights: ServiceRights,
        effect: AceEffect,
    ) -> Result<ServiceDescriptor, AclError> {
        if rights.is_empty() {
            return Err(AclError::validation("empty service rights mask"));
        }
        let mut updated = list.clone();
        updated.clauses.push(DaclClause {
            ace_type: effect_code(effect).to_string(),
            flags: String::new(),
            rights: rights_field(rights),
            object_guid: String::new(),
            inherit_guid: String::new(),
            trustee: trustee.as_str().to_string(),
        });
        Ok(updated)
    }

    fn with_principal_removed(
        &self,
        list: &ServiceDescriptor,
        trustee: &SecurityId,
    ) -> ServiceDescriptor {
        let mut updated = list.clone();
        updated.clauses.retain(|c| c.trustee != trustee.as_str());
        updated
    }

    fn apply(
        &self,
        host: &mut Self::Host,
        surface: &str,
        list: &ServiceDescriptor,
    ) -> Result<(), AclError> {
        host.set_service_descriptor(surface, &list.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK: &str = "D:(A;;CCLCSWRPWPDTLOCRRC;;;SY)(A;;CCDCLCSWRPWPDTLOCRSDRCWDWO;;;BA)S:(AU;FA;CCDCLCSWRPWPDTLOCRSDRCWDWO;;;WD)";

    fn sid() -> SecurityId {
        SecurityId::new("S-1-5-21-1004336348-1177238915-682003330-1104")
    }

    fn monitor_rights() -> ServiceRights {
        ServiceRights::CHANGE_CONFIG
            | ServiceRights::QUERY_STATUS
            | ServiceRights::QUERY_CONFIG
            | ServiceRights::READ_CONTROL
    }

    #[test]
    fn round_trips_stock_descriptor() {
        let parsed = ServiceDescriptor::parse(STOCK).unwrap();
        assert_eq!(parsed.clauses().len(), 2);
        assert!(parsed.system_segment().is_some());
        assert_eq!(parsed.encode(), STOCK);
    }

    #[test]
    fn round_trips_owner_prefix_and_flags() {
        let text = "O:SYG:SYD:AI(A;;LC;;;BA)";
        let parsed = ServiceDescriptor::parse(text).unwrap();
        assert_eq!(parsed.encode(), text);
    }

    #[test]
    fn parses_flag_run_followed_by_system_segment() {
        let text = "D:AIS:(AU;FA;GA;;;WD)";
        let parsed = ServiceDescriptor::parse(text).unwrap();
        assert!(parsed.clauses().is_empty());
        assert_eq!(parsed.system_segment(), Some("S:(AU;FA;GA;;;WD)"));
        assert_eq!(parsed.encode(), text);
    }

    #[test]
    fn rejects_descriptor_without_discretionary_segment() {
        assert!(ServiceDescriptor::parse("O:SYG:SY").is_err());
    }

    #[test]
    fn rejects_system_segment_before_discretionary() {
        assert!(ServiceDescriptor::parse("S:(AU;FA;GA;;;WD)D:(A;;LC;;;BA)").is_err());
    }

    #[test]
    fn rejects_malformed_clause() {
        assert!(ServiceDescriptor::parse("D:(A;;LC;;BA)").is_err());
        assert!(ServiceDescriptor::parse("D:(A;;LC;;;BA").is_err());
    }

    #[test]
    fn splice_lands_before_system_segment() {
        let codec = ServiceDescriptorCodec;
        let parsed = ServiceDescriptor::parse(STOCK).unwrap();
        let updated = codec
            .with_grant_added(&parsed, &sid(), monitor_rights(), AceEffect::Allow)
            .unwrap();
        let encoded = updated.encode();

        let clause_at = encoded.find(sid().as_str()).expect("clause present");
        let system_at = encoded.find("S:(AU").expect("system preserved");
        assert!(
            clause_at < system_at,
            "clause must precede system segment: {encoded}"
        );
        // Pre-existing clauses keep their exact form.
        assert!(encoded.starts_with("D:(A;;CCLCSWRPWPDTLOCRRC;;;SY)"));
    }

    #[test]
    fn contains_requires_equal_or_broader_tokens() {
        let codec = ServiceDescriptorCodec;
        let parsed = ServiceDescriptor::parse(STOCK).unwrap();
        let granted = codec
            .with_grant_added(&parsed, &sid(), monitor_rights(), AceEffect::Allow)
            .unwrap();

        assert!(codec.contains_grant(&granted, &sid(), monitor_rights(), AceEffect::Allow));
        // A narrower request is covered by the broader clause.
        assert!(codec.contains_grant(
            &granted,
            &sid(),
            ServiceRights::QUERY_STATUS,
            AceEffect::Allow
        ));
        // A broader request is not.
        assert!(!codec.contains_grant(
            &granted,
            &sid(),
            monitor_rights() | ServiceRights::START,
            AceEffect::Allow
        ));
        // Same rights, other effect: no match.
        assert!(!codec.contains_grant(&granted, &sid(), monitor_rights(), AceEffect::Deny));
    }

    #[test]
    fn generic_all_clause_satisfies_everything() {
        let codec = ServiceDescriptorCodec;
        let text = format!("D:(A;;GA;;;{})", sid());
        let parsed = ServiceDescriptor::parse(&text).unwrap();
        assert!(codec.contains_grant(&parsed, &sid(), ServiceRights::ALL_ACCESS, AceEffect::Allow));
        assert!(codec.contains_grant(&parsed, &sid(), monitor_rights(), AceEffect::Allow));
    }

    #[test]
    fn full_mask_encodes_as_generic_all() {
        assert_eq!(rights_field(ServiceRights::ALL_ACCESS), "GA");
        assert_eq!(
            rights_field(ServiceRights::QUERY_CONFIG | ServiceRights::READ_CONTROL),
            "CCRC"
        );
    }

    #[test]
    fn empty_rights_rejected() {
        let codec = ServiceDescriptorCodec;
        let parsed = ServiceDescriptor::parse(STOCK).unwrap();
        let err = codec
            .with_grant_added(&parsed, &sid(), ServiceRights::empty(), AceEffect::Allow)
            .unwrap_err();
        assert!(matches!(err, AclError::Validation { .. }));
    }

    #[test]
    fn removal_drops_only_the_trustee() {
        let codec = ServiceDescriptorCodec;
        let parsed = ServiceDescriptor::parse(STOCK).unwrap();
        let granted = codec
            .with_grant_added(&parsed, &sid(), monitor_rights(), AceEffect::Allow)
            .unwrap();
        let granted = codec
            .with_grant_added(&granted, &sid(), ServiceRights::START, AceEffect::Allow)
            .unwrap();
        assert_eq!(granted.clauses().len(), 4);

        let removed = codec.with_principal_removed(&granted, &sid());
        assert_eq!(removed.clauses().len(), 2);
        // Untouched clauses are byte-identical after re-encoding.
        assert_eq!(removed.encode(), STOCK);
    }

    #[test]
    fn odd_length_rights_field_never_matches() {
        let codec = ServiceDescriptorCodec;
        let text = format!("D:(A;;CCL;;;{})", sid());
        let parsed = ServiceDescriptor::parse(&text).unwrap();
        assert!(!codec.contains_grant(
            &parsed,
            &sid(),
            ServiceRights::QUERY_CONFIG,
            AceEffect::Allow
        ));
        // But it still round-trips untouched.
        assert_eq!(parsed.encode(), text);
    }
}
