//! privgrant - least-privilege grant convergence
//!
//! Validates a grant configuration and, on request, rehearses the full
//! run against a simulated host, printing the per-step report the
//! orchestrator produced. On a target machine the same engine runs
//! against a platform host adapter; the report shape is identical.
//!
//! # Exit Status
//!
//! Zero only when every entry validated and (in `--plan` mode) every
//! non-skipped step converged.
//!
//! # Environment Variables
//!
//! - `PRIVGRANT_LOG`: tracing filter (overrides `--debug`), e.g.
//!   `privgrant_engine=debug`.
//!
//! Log output goes to stderr; the report goes to stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use privgrant_engine::{apply, GrantConfig, MemoryHost, MemorySnapshot, PrincipalPlan};
use privgrant_types::{RunReport, StepOutcome};

/// Grant least-privilege access for monitoring service accounts.
#[derive(Parser, Debug)]
#[command(name = "privgrant")]
#[command(version, about, long_about = None)]
struct Args {
    /// Grant configuration file (JSON)
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,

    /// Rehearse the run against a simulated host and print the report
    #[arg(long)]
    plan: bool,

    /// Host snapshot (JSON) seeding the simulated host; a
    /// representative default is used when omitted
    #[arg(long, value_name = "PATH", requires = "plan")]
    state: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "privgrant=debug,privgrant_engine=debug,privgrant_acl=debug"
    } else {
        "privgrant=info,privgrant_engine=info,privgrant_acl=info"
    };
    let filter =
        EnvFilter::try_from_env("PRIVGRANT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<bool> {
    let config = GrantConfig::from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let plans = config.validate().context("validating configuration")?;

    if !args.plan {
        println!(
            "configuration OK: {} principal entr{}",
            plans.len(),
            if plans.len() == 1 { "y" } else { "ies" }
        );
        return Ok(true);
    }

    let mut host = load_host(args.state.as_deref())?;
    let mut all_ok = true;
    for plan in &plans {
        all_ok &= rehearse(&mut host, plan);
    }
    Ok(all_ok)
}

fn load_host(state: Option<&std::path::Path>) -> Result<MemoryHost> {
    match state {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let snapshot: MemorySnapshot =
                serde_json::from_str(&text).context("parsing host snapshot")?;
            Ok(MemoryHost::from_snapshot(&snapshot))
        }
        None => Ok(MemoryHost::rehearsal()),
    }
}

fn rehearse(host: &mut MemoryHost, plan: &PrincipalPlan) -> bool {
    match apply(host, plan) {
        Ok(report) => {
            render(&report);
            report.succeeded()
        }
        Err(e) => {
            println!("principal {}", plan.account);
            println!("  fatal: {e}");
            println!("result: aborted");
            false
        }
    }
}

fn render(report: &RunReport) {
    println!("principal {}", report.principal());
    for step in report.steps() {
        match &step.outcome {
            StepOutcome::Failed { reason } => {
                println!("  {:<18} {}  ({reason})", "failed", step.surface);
            }
            other => println!("  {:<18} {}", other.status_str(), step.surface),
        }
    }
    for warning in report.warnings() {
        println!("  warning: {warning}");
    }
    println!(
        "result: {} ({} failure(s))",
        if report.succeeded() { "converged" } else { "failed" },
        report.failures()
    );
}
