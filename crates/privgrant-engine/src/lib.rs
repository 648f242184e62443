//! The permission convergence engine.
//!
//! Sequences the four grant surfaces for one principal, converging each
//! toward the desired state without ever granting more than requested or
//! disturbing access already present:
//!
//! 1. local group membership (two fixed monitoring groups),
//! 2. the management-namespace ACL (with an optional dependency-aware
//!    service restart when a change was actually written),
//! 3. the log directory ACL and its network share,
//! 4. service security descriptors for every configured service matcher.
//!
//! # Execution Model
//!
//! One run is strictly sequential and synchronous. Every surface
//! mutation is a read-modify-write against shared host state and must
//! observe its own immediately-prior read, so nothing here is, or may
//! become, concurrent. Distinct (principal, host) runs share no mutable
//! state; whoever runs them in parallel is on their own for locking.
//!
//! # Fault Isolation
//!
//! Only identity resolution aborts a run. Every surface step downgrades
//! its errors to a recorded failure and the run continues; missing
//! surfaces are skip-with-warning, not failures.

pub mod config;
pub mod host;
pub mod identity;
pub mod matcher;
pub mod orchestrator;
pub mod restart;

pub use config::{ConfigError, GrantConfig, PrincipalEntry, PrincipalPlan, SurfaceToggles};
pub use host::memory::{MemoryHost, MemorySnapshot};
pub use identity::resolve;
pub use matcher::{ServiceGrant, ServiceMatcher};
pub use orchestrator::{apply, MONITOR_GROUPS, NAMESPACE_PATH, NAMESPACE_RIGHTS, NAMESPACE_SERVICE};
pub use restart::{restart_with_dependents, RestartReport};
