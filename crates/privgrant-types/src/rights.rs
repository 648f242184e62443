//! Symbolic rights vocabulary for the two mask-based surfaces.
//!
//! Both the service surface and the management-namespace surface express
//! access as a mask of named rights. The names below are the fixed,
//! caller-visible vocabulary; the bit values are the host's native ones so
//! a mask round-trips through the host unchanged.
//!
//! Unknown right names are a validation error, never silently dropped —
//! [`ServiceRights::parse_list`] and [`NamespaceRights::parse_list`] hand
//! the unknown names back so callers can fail loudly.
//!
//! How a mask is rendered on the wire is *not* decided here: the text
//! descriptor codec owns its letter-token table and the namespace codec
//! writes raw bits. This module only names the bits.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Whether an access-control entry grants or denies its rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AceEffect {
    /// The entry grants the rights.
    Allow,
    /// The entry denies the rights.
    Deny,
}

impl AceEffect {
    /// The opposite effect.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Allow => Self::Deny,
            Self::Deny => Self::Allow,
        }
    }
}

impl std::fmt::Display for AceEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

bitflags! {
    /// Access rights on a service object (and on the service control
    /// manager itself, addressed as the pseudo-service `scmanager`).
    ///
    /// Bit values match the host's service access mask, so a combined
    /// request is simply the bitwise OR of the requested rights.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ServiceRights: u32 {
        /// Query the service configuration.
        const QUERY_CONFIG         = 0x0000_0001;
        /// Change the service configuration.
        const CHANGE_CONFIG        = 0x0000_0002;
        /// Query the current status.
        const QUERY_STATUS         = 0x0000_0004;
        /// Enumerate dependent services.
        const ENUMERATE_DEPENDENTS = 0x0000_0008;
        /// Start the service.
        const START                = 0x0000_0010;
        /// Stop the service.
        const STOP                 = 0x0000_0020;
        /// Pause or continue the service.
        const PAUSE_CONTINUE       = 0x0000_0040;
        /// Ask the service to report its status immediately.
        const INTERROGATE          = 0x0000_0080;
        /// Send user-defined control codes.
        const USER_DEFINED_CONTROL = 0x0000_0100;
        /// Delete the service.
        const DELETE               = 0x0001_0000;
        /// Read the security descriptor.
        const READ_CONTROL         = 0x0002_0000;
        /// Modify the discretionary access-control list.
        const WRITE_DAC            = 0x0004_0000;
        /// Change the owner.
        const WRITE_OWNER          = 0x0008_0000;
    }
}

bitflags! {
    /// Access rights on a management namespace.
    ///
    /// Bit values match the namespace provider's native mask. A grant is
    /// satisfied only by an entry whose mask is a superset of the request;
    /// partially overlapping masks do not count.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NamespaceRights: u32 {
        /// Connect to the namespace and read objects.
        const ENABLE         = 0x0000_0001;
        /// Execute provider methods.
        const METHOD_EXECUTE = 0x0000_0002;
        /// Full write to repository objects.
        const FULL_WRITE     = 0x0000_0004;
        /// Write to instance data only.
        const PARTIAL_WRITE  = 0x0000_0008;
        /// Write to provider-backed objects.
        const PROVIDER_WRITE = 0x0000_0010;
        /// Connect from a remote machine.
        const REMOTE_ACCESS  = 0x0000_0020;
        /// Read the namespace security descriptor.
        const READ_SECURITY  = 0x0002_0000;
        /// Modify the namespace security descriptor.
        const WRITE_SECURITY = 0x0004_0000;
    }
}

macro_rules! symbolic_names {
    ($ty:ident { $($flag:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            const NAME_TABLE: &'static [($ty, &'static str)] =
                &[$(($ty::$flag, $name)),+];

            /// Returns the symbolic names of every right set in this mask.
            #[must_use]
            pub fn names(self) -> Vec<&'static str> {
                Self::NAME_TABLE
                    .iter()
                    .filter(|(flag, _)| self.contains(*flag))
                    .map(|(_, name)| *name)
                    .collect()
            }

            /// Parses one symbolic right name (case-insensitive).
            ///
            /// Returns `None` for unknown names; callers decide whether
            /// that is a hard error.
            #[must_use]
            pub fn parse(name: &str) -> Option<Self> {
                Self::NAME_TABLE
                    .iter()
                    .find(|(_, n)| n.eq_ignore_ascii_case(name))
                    .map(|(flag, _)| *flag)
            }

            /// Parses a list of symbolic names into a combined mask.
            ///
            /// Returns the combined mask and every name that did not
            /// parse. An empty unknown list means the input was fully
            /// understood.
            #[must_use]
            pub fn parse_list<'a, S: AsRef<str>>(names: &'a [S]) -> (Self, Vec<&'a str>) {
                let mut mask = Self::empty();
                let mut unknown = Vec::new();
                for name in names {
                    match Self::parse(name.as_ref()) {
                        Some(flag) => mask |= flag,
                        None => unknown.push(name.as_ref()),
                    }
                }
                (mask, unknown)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let names = self.names();
                if names.is_empty() {
                    f.write_str("(none)")
                } else {
                    f.write_str(&names.join(" | "))
                }
            }
        }
    };
}

symbolic_names!(ServiceRights {
    QUERY_CONFIG => "QueryConfig",
    CHANGE_CONFIG => "ChangeConfig",
    QUERY_STATUS => "QueryStatus",
    ENUMERATE_DEPENDENTS => "EnumerateDependents",
    START => "Start",
    STOP => "Stop",
    PAUSE_CONTINUE => "PauseContinue",
    INTERROGATE => "Interrogate",
    USER_DEFINED_CONTROL => "UserDefinedControl",
    DELETE => "Delete",
    READ_CONTROL => "ReadControl",
    WRITE_DAC => "WriteDac",
    WRITE_OWNER => "WriteOwner",
});

symbolic_names!(NamespaceRights {
    ENABLE => "Enable",
    METHOD_EXECUTE => "MethodExecute",
    FULL_WRITE => "FullWrite",
    PARTIAL_WRITE => "PartialWrite",
    PROVIDER_WRITE => "ProviderWrite",
    REMOTE_ACCESS => "RemoteAccess",
    READ_SECURITY => "ReadSecurity",
    WRITE_SECURITY => "WriteSecurity",
});

impl ServiceRights {
    /// Every service right, including the standard rights.
    pub const ALL_ACCESS: Self = Self::all();

    /// Parses a list where the extra name `AllAccess` expands to
    /// [`ALL_ACCESS`](Self::ALL_ACCESS).
    ///
    /// `AllAccess` is a request for the full mask, not a distinct bit, so
    /// it lives outside the per-bit name table.
    #[must_use]
    pub fn parse_list_with_all<'a, S: AsRef<str>>(names: &'a [S]) -> (Self, Vec<&'a str>) {
        let mut mask = Self::empty();
        let mut unknown = Vec::new();
        for name in names {
            if name.as_ref().eq_ignore_ascii_case("AllAccess") {
                mask |= Self::ALL_ACCESS;
            } else {
                match Self::parse(name.as_ref()) {
                    Some(flag) => mask |= flag,
                    None => unknown.push(name.as_ref()),
                }
            }
        }
        (mask, unknown)
    }
}
