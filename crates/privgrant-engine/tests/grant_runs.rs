//! End-to-end orchestrator runs against the in-memory host.
//!
//! The central property under test is convergence: a second identical
//! run writes nothing, reports `AlreadySatisfied` everywhere it acted
//! before, and leaves every surface byte-identical.

use privgrant_engine::{
    apply, GrantConfig, MemoryHost, PrincipalPlan, MONITOR_GROUPS, NAMESPACE_PATH,
    NAMESPACE_RIGHTS, NAMESPACE_SERVICE,
};
use privgrant_acl::{GroupMembership, NamespaceSecurity, ServiceSecurity, ShareSecurity};
use privgrant_types::{SecurityId, StepOutcome, Surface};

fn plan_from(json: &str) -> PrincipalPlan {
    GrantConfig::from_json(json)
        .expect("parse")
        .validate()
        .expect("validate")
        .remove(0)
}

fn default_plan() -> PrincipalPlan {
    plan_from(r#"{"principals":[{"account":"HOST01\\svc-monitor","restartNamespaceService":true}]}"#)
}

fn monitor_sid() -> SecurityId {
    SecurityId::new("S-1-5-21-1004336348-1177238915-682003330-1104")
}

fn outcome_for<'r>(report: &'r privgrant_types::RunReport, surface: &Surface) -> &'r StepOutcome {
    &report
        .steps()
        .iter()
        .find(|s| s.surface == *surface)
        .unwrap_or_else(|| panic!("no record for {surface}"))
        .outcome
}

#[test]
fn first_run_applies_everything() {
    let mut host = MemoryHost::rehearsal();
    let report = apply(&mut host, &default_plan()).unwrap();

    assert!(report.succeeded(), "failures: {:?}", report.steps());
    for group in MONITOR_GROUPS {
        assert_eq!(
            outcome_for(&report, &Surface::LocalGroup(group.to_string())),
            &StepOutcome::Applied
        );
        assert!(host.is_member(group, &monitor_sid()).unwrap());
    }
    assert_eq!(
        outcome_for(&report, &Surface::Namespace(NAMESPACE_PATH.to_string())),
        &StepOutcome::Applied
    );
    assert_eq!(
        outcome_for(&report, &Surface::Service("MSSQLSERVER".to_string())),
        &StepOutcome::Applied
    );
    assert_eq!(
        outcome_for(&report, &Surface::Service("scmanager".to_string())),
        &StepOutcome::Applied
    );

    // The namespace grant carries the full requested mask.
    let acl = host.namespace_acl(NAMESPACE_PATH).unwrap();
    assert_eq!(acl.len(), 1);
    assert_eq!(acl.aces()[0].mask, NAMESPACE_RIGHTS);
    assert_eq!(acl.aces()[0].trustee, monitor_sid());
}

#[test]
fn second_run_is_all_already_satisfied_and_writes_nothing() {
    let mut host = MemoryHost::rehearsal();
    apply(&mut host, &default_plan()).unwrap();

    let namespace_before = host.namespace_acl(NAMESPACE_PATH).unwrap();
    let descriptor_before = host.service_descriptor("MSSQLSERVER").unwrap();
    let share_before = host.share_acl("Logs").unwrap();
    let ops_before = host.service_ops().len();

    let report = apply(&mut host, &default_plan()).unwrap();
    assert!(report.succeeded());
    for step in report.steps() {
        assert_eq!(
            step.outcome,
            StepOutcome::AlreadySatisfied,
            "surface {} should be converged",
            step.surface
        );
    }

    // Byte-identical surfaces, and no second restart.
    assert_eq!(host.namespace_acl(NAMESPACE_PATH).unwrap(), namespace_before);
    assert_eq!(host.service_descriptor("MSSQLSERVER").unwrap(), descriptor_before);
    assert_eq!(host.share_acl("Logs").unwrap(), share_before);
    assert_eq!(host.service_ops().len(), ops_before);
}

#[test]
fn restart_runs_only_after_an_applied_namespace_change() {
    let mut host = MemoryHost::rehearsal();
    apply(&mut host, &default_plan()).unwrap();

    // Bottom-up stop, exact-reverse start, dependents included.
    let expected = vec![
        "stop iphlpsvc".to_string(),
        format!("stop {NAMESPACE_SERVICE}"),
        format!("start {NAMESPACE_SERVICE}"),
        "start iphlpsvc".to_string(),
    ];
    assert_eq!(host.service_ops(), expected.as_slice());
    assert_eq!(host.service_running(NAMESPACE_SERVICE), Some(true));
    assert_eq!(host.service_running("iphlpsvc"), Some(true));
}

#[test]
fn no_restart_without_the_flag() {
    let mut host = MemoryHost::rehearsal();
    let plan = plan_from(r#"{"principals":[{"account":"HOST01\\svc-monitor"}]}"#);
    let report = apply(&mut host, &plan).unwrap();
    assert!(report.succeeded());
    assert!(host.service_ops().is_empty());
}

#[test]
fn share_is_created_once_with_default_access_revoked() {
    let mut host = MemoryHost::rehearsal();
    let report = apply(&mut host, &default_plan()).unwrap();

    assert_eq!(
        outcome_for(&report, &Surface::Share("Logs".to_string())),
        &StepOutcome::Applied
    );
    let acl = host.share_acl("Logs").unwrap();
    // Exactly the named read grant; the world entry the host seeded at
    // creation is gone.
    assert_eq!(acl.len(), 1);
    assert_eq!(acl.entries()[0].trustee, monitor_sid());
    assert!(!acl.entries().iter().any(|e| e.trustee == SecurityId::world()));

    // Second run: no re-creation, read grant already satisfied.
    let report = apply(&mut host, &default_plan()).unwrap();
    assert_eq!(
        outcome_for(&report, &Surface::Share("Logs".to_string())),
        &StepOutcome::AlreadySatisfied
    );
    assert_eq!(host.share_acl("Logs").unwrap().len(), 1);
}

#[test]
fn zero_match_pattern_warns_without_failing() {
    let mut host = MemoryHost::rehearsal();
    let plan = plan_from(
        r#"{"principals":[{"account":"HOST01\\svc-monitor","services":[
            {"namePattern":"^Nonexistent.*","accessFlags":["QueryStatus"]}]}]}"#,
    );
    let report = apply(&mut host, &plan).unwrap();

    assert!(report.succeeded());
    assert!(report
        .warnings()
        .iter()
        .any(|w| w.contains("^Nonexistent")), "warnings: {:?}", report.warnings());
    // Zero descriptor records were written for the services step.
    assert!(!report
        .steps()
        .iter()
        .any(|s| matches!(s.surface, Surface::Service(_))));
}

#[test]
fn missing_exact_service_is_skipped_as_a_warning() {
    let mut host = MemoryHost::rehearsal();
    let plan = plan_from(
        r#"{"principals":[{"account":"HOST01\\svc-monitor","services":[
            {"name":"GhostService","accessFlags":["QueryStatus"]}]}]}"#,
    );
    let report = apply(&mut host, &plan).unwrap();
    assert!(report.succeeded());
    assert!(!report.warnings().is_empty());
}

#[test]
fn unknown_principal_aborts_the_whole_run() {
    let mut host = MemoryHost::rehearsal();
    let plan = plan_from(r#"{"principals":[{"account":"HOST01\\ghost"}]}"#);
    let err = apply(&mut host, &plan).unwrap_err();
    assert!(err.to_string().contains("ghost"));

    // Nothing was touched.
    assert!(host.namespace_acl(NAMESPACE_PATH).unwrap().is_empty());
    for group in MONITOR_GROUPS {
        assert!(!host.is_member(group, &monitor_sid()).unwrap());
    }
}

#[test]
fn skip_toggles_skip_whole_surfaces() {
    let mut host = MemoryHost::rehearsal();
    let plan = plan_from(
        r#"{"principals":[{"account":"HOST01\\svc-monitor",
            "skip":{"groups":true,"namespace":true,"filesystem":true,"services":true}}]}"#,
    );
    let report = apply(&mut host, &plan).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.steps().len(), 4);
    assert!(report.steps().iter().all(|s| s.outcome == StepOutcome::Skipped));
    assert!(host.namespace_acl(NAMESPACE_PATH).unwrap().is_empty());
}

#[test]
fn missing_namespace_is_skipped_and_the_run_continues() {
    let mut host = MemoryHost::new("HOST01")
        .with_account("HOST01", "svc-monitor", monitor_sid())
        .with_group(MONITOR_GROUPS[0])
        .with_group(MONITOR_GROUPS[1])
        .with_directory("C:/Logs", privgrant_acl::DirectoryAcl::new())
        .with_service("MSSQLSERVER", "SQL Server (MSSQLSERVER)", true, &[]);
    let plan = plan_from(r#"{"principals":[{"account":"HOST01\\svc-monitor"}]}"#);
    let report = apply(&mut host, &plan).unwrap();

    assert!(report.succeeded(), "steps: {:?}", report.steps());
    assert_eq!(
        outcome_for(&report, &Surface::Namespace(NAMESPACE_PATH.to_string())),
        &StepOutcome::Skipped
    );
    // Later surfaces still ran.
    assert_eq!(
        outcome_for(&report, &Surface::Service("MSSQLSERVER".to_string())),
        &StepOutcome::Applied
    );
}
