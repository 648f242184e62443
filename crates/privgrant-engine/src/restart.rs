//! Dependency-aware service restart.
//!
//! Some namespace-ACL changes only take effect after the owning service
//! is cycled, and that service usually has a tree of dependents that
//! must come down first and go back up afterwards. This module walks the
//! live dependency graph with an explicit worklist (no recursion),
//! computes a bottom-up closure of *running* services, and cycles them.
//!
//! # Ordering Invariants
//!
//! - The closure is deduplicated and bottom-up: a service is appended
//!   only after every one of its running dependents has been appended.
//! - Stop order is the closure, front to back. A stop failure is logged
//!   and processing continues; the failed service stays in the list.
//! - Start order is the exact reverse of the stop order attempted.
//! - Services that were already stopped are skipped during expansion and
//!   are never started as a side effect.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use privgrant_acl::{AclError, ServiceControl};

/// What a restart actually did, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartReport {
    /// Stop order attempted (bottom-up closure of running services).
    pub stop_order: Vec<String>,
    /// Dependents found already stopped and left alone.
    pub skipped_stopped: Vec<String>,
    /// `(service, reason)` for every stop that failed.
    pub stop_failures: Vec<(String, String)>,
    /// `(service, reason)` for every start that failed.
    pub start_failures: Vec<(String, String)>,
}

impl RestartReport {
    /// True when every stop and start succeeded.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.stop_failures.is_empty() && self.start_failures.is_empty()
    }
}

enum Visit {
    Enter(String),
    Append(String),
}

/// Computes the bottom-up closure of `service` and its running
/// dependents, without mutating anything.
///
/// # Errors
///
/// [`AclError::Unavailable`] when the target service does not exist.
pub fn running_closure(
    host: &dyn ServiceControl,
    service: &str,
    skipped_stopped: &mut Vec<String>,
) -> Result<Vec<String>, AclError> {
    let target = host
        .services()?
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(service))
        .ok_or_else(|| AclError::unavailable(format!("service '{service}'")))?;

    if !target.running {
        debug!(service = %target.name, "target already stopped, nothing to cycle");
        return Ok(Vec::new());
    }

    let mut closure = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut work = vec![Visit::Enter(target.name.clone())];

    while let Some(visit) = work.pop() {
        match visit {
            Visit::Enter(name) => {
                if !seen.insert(name.clone()) {
                    continue;
                }
                work.push(Visit::Append(name.clone()));
                // Reversed so dependents pop in the host's declared
                // order and land in the closure that way.
                for dep in host.dependents_of(&name)?.into_iter().rev() {
                    if dep.running {
                        work.push(Visit::Enter(dep.name));
                    } else {
                        debug!(service = %dep.name, "dependent already stopped, leaving it stopped");
                        skipped_stopped.push(dep.name);
                    }
                }
            }
            Visit::Append(name) => closure.push(name),
        }
    }

    Ok(closure)
}

/// Stops `service` and its running dependents bottom-up, then starts
/// them back in reverse order, preserving pre-change run state.
///
/// Stop and start failures are recorded and logged, never fatal: a
/// half-failed cycle still attempts every remaining service so the host
/// ends as close to its original state as it can get.
///
/// # Errors
///
/// Only graph discovery can fail (unknown service, enumeration error);
/// once stopping begins the function always returns a report.
pub fn restart_with_dependents(
    host: &mut dyn ServiceControl,
    service: &str,
) -> Result<RestartReport, AclError> {
    let mut report = RestartReport::default();
    let closure = running_closure(host, service, &mut report.skipped_stopped)?;
    if closure.is_empty() {
        return Ok(report);
    }
    info!(service, closure = ?closure, "restarting service with dependents");

    for name in &closure {
        match host.stop_service(name) {
            Ok(()) => info!(service = %name, "stopped"),
            Err(e) => {
                warn!(service = %name, error = %e, "stop failed, continuing");
                report.stop_failures.push((name.clone(), e.to_string()));
            }
        }
        report.stop_order.push(name.clone());
    }

    // Exact reverse of the order attempted above, failed stops included.
    for name in report.stop_order.iter().rev() {
        match host.start_service(name) {
            Ok(()) => info!(service = %name, "started"),
            Err(e) => {
                warn!(service = %name, error = %e, "start failed, continuing");
                report.start_failures.push((name.clone(), e.to_string()));
            }
        }
    }

    Ok(report)
}
