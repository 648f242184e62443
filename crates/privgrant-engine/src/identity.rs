//! Resolve-once identity resolution.
//!
//! Translation is delegated to the host's [`AccountDirectory`] seam and
//! is idempotent and side-effect-free — but it can still be slow (a
//! domain round-trip), so the orchestrator calls [`resolve`] exactly
//! once per run and hands the [`PrincipalIdentity`] to every surface
//! step by reference. Nothing in this crate re-resolves inside a loop.

use tracing::debug;

use privgrant_acl::AccountDirectory;
use privgrant_types::{AccountName, IdentityError, PrincipalIdentity};

/// Resolves a human-entered account string to a canonical identity.
///
/// Parsing happens first (see [`AccountName::parse`] for the accepted
/// forms); the local-computer and built-in placeholders are substituted
/// with the directory's own computer name before lookup.
///
/// # Errors
///
/// [`IdentityError`] when the string is malformed, the account does not
/// exist, or the domain's directory is unreachable. All of these abort
/// the run: no surface operation can be scoped without a canonical id.
pub fn resolve(
    directory: &dyn AccountDirectory,
    raw: &str,
) -> Result<PrincipalIdentity, IdentityError> {
    let name = AccountName::parse(raw)?;
    let computer = directory.computer_name();
    let domain = name.domain_for_lookup(&computer);
    let id = directory.lookup_account(domain, name.account())?;
    debug!(account = %name, canonical = %id, "resolved principal");
    Ok(PrincipalIdentity::new(name, id))
}
