//! The permission orchestrator.
//!
//! Sequences the four grant surfaces for one principal and aggregates
//! per-step outcomes into a [`RunReport`]. Identity resolves once, up
//! front, and is fatal on failure; every other step downgrades its
//! errors to recorded failures (or skip-with-warning for surfaces that
//! simply aren't there) and the run continues.
//!
//! Every mutation goes through the convergence gate first, so a run that
//! finds the desired state already in place writes nothing and reports
//! `AlreadySatisfied` throughout — re-running is always safe.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use privgrant_acl::{
    check, AccessControlCodec, AclError, Convergence, DirectoryAclCodec, FsGrant, FsRight, Host,
    NamespaceAclCodec, ServiceDescriptorCodec, ShareAclCodec,
};
use privgrant_types::{
    AceEffect, IdentityError, NamespaceRights, RunReport, SecurityId, ServiceRights, StepOutcome,
    Surface,
};

use crate::config::PrincipalPlan;
use crate::identity;
use crate::restart::restart_with_dependents;

/// The two local groups a monitoring principal joins.
pub const MONITOR_GROUPS: [&str; 2] = ["Performance Monitor Users", "Event Log Readers"];

/// The management namespace that receives the ACL grant.
pub const NAMESPACE_PATH: &str = "root/cimv2";

/// Rights granted on [`NAMESPACE_PATH`].
pub const NAMESPACE_RIGHTS: NamespaceRights = NamespaceRights::ENABLE
    .union(NamespaceRights::METHOD_EXECUTE)
    .union(NamespaceRights::REMOTE_ACCESS)
    .union(NamespaceRights::READ_SECURITY);

/// The service cycled (with its dependents) after an applied namespace
/// change, when the plan asks for it.
pub const NAMESPACE_SERVICE: &str = "Winmgmt";

/// Runs the full grant sequence for one principal.
///
/// # Errors
///
/// Only [`IdentityError`]: without a canonical id no surface operation
/// can be scoped, so nothing downstream is attempted. Every other
/// failure lands in the report instead.
pub fn apply<H: Host + 'static>(host: &mut H, plan: &PrincipalPlan) -> Result<RunReport, IdentityError> {
    let identity = identity::resolve(&*host, &plan.account)?;
    let mut report = RunReport::new(&plan.account);
    info!(principal = %identity, "starting grant run");

    // 1. Local group membership.
    if plan.skip.groups {
        report.record(Surface::Groups, StepOutcome::Skipped);
    } else {
        for group in MONITOR_GROUPS {
            let surface = Surface::LocalGroup(group.to_string());
            match group_step(host, group, identity.id()) {
                Ok(outcome) => report.record(surface, outcome),
                Err(e) => record_error(surface, e, &mut report),
            }
        }
    }

    // 2. Namespace ACL, with optional dependent-aware restart — but
    // only when a change was actually written.
    if plan.skip.namespace {
        report.record(Surface::Namespace(NAMESPACE_PATH.to_string()), StepOutcome::Skipped);
    } else {
        let surface = Surface::Namespace(NAMESPACE_PATH.to_string());
        match namespace_step(host, identity.id(), &mut report) {
            Ok((outcome, applied)) => {
                if applied && plan.restart_namespace_service {
                    restart_namespace_service(host, &mut report);
                }
                report.record(surface, outcome);
            }
            Err(e) => record_error(surface, e, &mut report),
        }
    }

    // 3. Log directory ACL, then its share.
    if plan.skip.filesystem {
        report.record(Surface::Filesystem, StepOutcome::Skipped);
    } else {
        filesystem_step(host, identity.id(), plan, &mut report);
    }

    // 4. Service security descriptors.
    if plan.skip.services {
        report.record(Surface::Services, StepOutcome::Skipped);
    } else {
        services_step(host, identity.id(), plan, &mut report);
    }

    info!(
        principal = %identity,
        steps = report.steps().len(),
        failures = report.failures(),
        "grant run finished"
    );
    Ok(report)
}

/// Downgrades a step error: missing surfaces are skip-with-warning,
/// everything else is a recorded failure. The run always continues.
fn record_error(surface: Surface, err: AclError, report: &mut RunReport) {
    if err.is_unavailable() {
        warn!(surface = %surface, error = %err, "surface missing, skipping");
        report.warn(format!("{surface}: {err}"));
        report.record(surface, StepOutcome::Skipped);
    } else {
        warn!(surface = %surface, error = %err, "step failed, continuing");
        report.record(surface, StepOutcome::failed(err));
    }
}

/// Runs a fetched list through the convergence gate. `None` means the
/// grant is already present; `Some` is the updated list to apply.
fn converge_list<C: AccessControlCodec>(
    codec: &C,
    list: &C::List,
    trustee: &SecurityId,
    rights: C::Rights,
    surface: &Surface,
    report: &mut RunReport,
) -> Result<Option<C::List>, AclError> {
    match check(codec, list, trustee, rights, AceEffect::Allow) {
        Convergence::Satisfied => Ok(None),
        Convergence::NeedsAdd { opposing_effect } => {
            if opposing_effect {
                // Observed host behavior is to stack the allow entry
                // next to the deny; surface it rather than hide it.
                warn!(surface = %surface, trustee = %trustee, "opposite-effect entry exists, adding allow entry alongside");
                report.warn(format!(
                    "{surface}: existing deny entry for {trustee} left in place"
                ));
            }
            Ok(Some(codec.with_grant_added(list, trustee, rights, AceEffect::Allow)?))
        }
        Convergence::Invalid(reason) => Err(AclError::validation(reason)),
    }
}

fn group_step<H: Host + 'static>(host: &mut H, group: &str, id: &SecurityId) -> Result<StepOutcome, AclError> {
    if host.is_member(group, id)? {
        return Ok(StepOutcome::AlreadySatisfied);
    }
    host.add_member(group, id)?;
    info!(group, trustee = %id, "added group member");
    Ok(StepOutcome::Applied)
}

fn namespace_step<H: Host + 'static>(
    host: &mut H,
    id: &SecurityId,
    report: &mut RunReport,
) -> Result<(StepOutcome, bool), AclError> {
    let codec = NamespaceAclCodec;
    let surface = Surface::Namespace(NAMESPACE_PATH.to_string());
    let list = codec.fetch(&*host, NAMESPACE_PATH)?;
    match converge_list(&codec, &list, id, NAMESPACE_RIGHTS, &surface, report)? {
        None => Ok((StepOutcome::AlreadySatisfied, false)),
        Some(updated) => {
            codec.apply(&mut *host, NAMESPACE_PATH, &updated)?;
            info!(namespace = NAMESPACE_PATH, trustee = %id, rights = %NAMESPACE_RIGHTS, "granted namespace access");
            Ok((StepOutcome::Applied, true))
        }
    }
}

fn restart_namespace_service<H: Host + 'static>(host: &mut H, report: &mut RunReport) {
    match restart_with_dependents(&mut *host, NAMESPACE_SERVICE) {
        Ok(r) if r.clean() => {
            info!(service = NAMESPACE_SERVICE, cycled = r.stop_order.len(), "restarted namespace service");
        }
        Ok(r) => {
            report.warn(format!(
                "restart of '{NAMESPACE_SERVICE}': {} stop failure(s), {} start failure(s)",
                r.stop_failures.len(),
                r.start_failures.len()
            ));
        }
        Err(e) => {
            report.warn(format!("restart of '{NAMESPACE_SERVICE}' not attempted: {e}"));
        }
    }
}

fn filesystem_step<H: Host + 'static>(host: &mut H, id: &SecurityId, plan: &PrincipalPlan, report: &mut RunReport) {
    let dir: PathBuf = match &plan.log_directory {
        Some(path) => path.clone(),
        None => match host.default_log_directory() {
            Ok(path) => path,
            Err(e) => {
                record_error(Surface::Filesystem, e, report);
                return;
            }
        },
    };

    let dir_surface = Surface::Directory(dir.display().to_string());
    match directory_step(host, id, &dir, &dir_surface, report) {
        Ok(outcome) => report.record(dir_surface, outcome),
        Err(e) => record_error(dir_surface, e, report),
    }

    share_step(host, id, &dir, report);
}

fn directory_step<H: Host + 'static>(
    host: &mut H,
    id: &SecurityId,
    dir: &Path,
    surface: &Surface,
    report: &mut RunReport,
) -> Result<StepOutcome, AclError> {
    let codec = DirectoryAclCodec;
    let list = codec.fetch(&*host, dir)?;
    match converge_list(&codec, &list, id, FsGrant::directory(FsRight::Modify), surface, report)? {
        None => Ok(StepOutcome::AlreadySatisfied),
        Some(updated) => {
            codec.apply(&mut *host, dir, &updated)?;
            info!(directory = %dir.display(), trustee = %id, "granted modify on log directory");
            Ok(StepOutcome::Applied)
        }
    }
}

fn share_step<H: Host + 'static>(host: &mut H, id: &SecurityId, dir: &Path, report: &mut RunReport) {
    let name = match host.share_for_path(dir) {
        Ok(Some(name)) => name,
        Ok(None) => {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Logs".to_string());
            if let Err(e) = create_share_trimmed(host, &name, dir) {
                record_error(Surface::Share(name), e, report);
                return;
            }
            info!(share = %name, path = %dir.display(), "created share, default access revoked");
            name
        }
        Err(e) => {
            record_error(Surface::Filesystem, e, report);
            return;
        }
    };

    let surface = Surface::Share(name.clone());
    match share_grant(host, id, &name, &surface, report) {
        Ok(outcome) => report.record(surface, outcome),
        Err(e) => record_error(surface, e, report),
    }
}

/// Creates the share and immediately revokes the host's default broad
/// entry, before any named grant exists on it.
fn create_share_trimmed<H: Host + 'static>(host: &mut H, name: &str, dir: &Path) -> Result<(), AclError> {
    host.create_share(name, dir)?;
    let codec = ShareAclCodec;
    let list = codec.fetch(&*host, name)?;
    let trimmed = codec.with_principal_removed(&list, &SecurityId::world());
    codec.apply(&mut *host, name, &trimmed)
}

fn share_grant<H: Host + 'static>(
    host: &mut H,
    id: &SecurityId,
    name: &str,
    surface: &Surface,
    report: &mut RunReport,
) -> Result<StepOutcome, AclError> {
    let codec = ShareAclCodec;
    let list = codec.fetch(&*host, name)?;
    match converge_list(&codec, &list, id, FsGrant::share(FsRight::Read), surface, report)? {
        None => Ok(StepOutcome::AlreadySatisfied),
        Some(updated) => {
            codec.apply(&mut *host, name, &updated)?;
            info!(share = name, trustee = %id, "granted read on share");
            Ok(StepOutcome::Applied)
        }
    }
}

fn services_step<H: Host + 'static>(host: &mut H, id: &SecurityId, plan: &PrincipalPlan, report: &mut RunReport) {
    let live = match host.services() {
        Ok(live) => live,
        Err(e) => {
            record_error(Surface::Services, e, report);
            return;
        }
    };

    for grant in &plan.service_grants {
        let matches = grant.matcher.expand(&live);
        if matches.is_empty() {
            warn!(matcher = %grant.matcher, "matched no services");
            report.warn(format!("service matcher {} matched no services", grant.matcher));
            continue;
        }
        for name in matches {
            let surface = Surface::Service(name.clone());
            match service_grant(host, id, &name, grant.rights, &surface, report) {
                Ok(outcome) => report.record(surface, outcome),
                Err(e) => record_error(surface, e, report),
            }
        }
    }
}

fn service_grant<H: Host + 'static>(
    host: &mut H,
    id: &SecurityId,
    name: &str,
    rights: ServiceRights,
    surface: &Surface,
    report: &mut RunReport,
) -> Result<StepOutcome, AclError> {
    let codec = ServiceDescriptorCodec;
    let list = codec.fetch(&*host, name)?;
    match converge_list(&codec, &list, id, rights, surface, report)? {
        None => Ok(StepOutcome::AlreadySatisfied),
        Some(updated) => {
            codec.apply(&mut *host, name, &updated)?;
            info!(service = name, trustee = %id, rights = %rights, "granted service access");
            Ok(StepOutcome::Applied)
        }
    }
}
