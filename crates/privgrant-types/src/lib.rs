//! Shared vocabulary for privgrant.
//!
//! This crate sits at the bottom of the dependency graph and carries the
//! types every other crate agrees on:
//!
//! - [`AccountName`] / [`SecurityId`] / [`PrincipalIdentity`] — who a grant
//!   is for, in parsed and canonical form.
//! - [`ServiceRights`] / [`NamespaceRights`] — the fixed symbolic rights
//!   vocabulary, as bitflags over the host's native access-mask values.
//! - [`StepOutcome`] / [`Surface`] / [`RunReport`] — the per-step result
//!   shape a run hands back to its caller.
//! - [`ErrorCode`] — the machine-readable error-code contract implemented
//!   by every error enum in the workspace.
//!
//! # Crate Architecture
//!
//! ```text
//! privgrant-types   (identity, rights, outcomes)  ◄── THIS CRATE
//!       ↑
//! privgrant-acl     (codecs, convergence, host seams)
//!       ↑
//! privgrant-engine  (orchestrator, restart, config, simulation host)
//!       ↑
//! privgrant-cli     (binary)
//! ```
//!
//! No permission logic lives here — only vocabulary. Deciding whether a
//! grant already exists is the business of `privgrant-acl`.

pub mod error;
pub mod outcome;
pub mod principal;
pub mod rights;

pub use error::{ErrorCode, IdentityError};
pub use outcome::{RunReport, StepOutcome, StepRecord, Surface};
pub use principal::{AccountName, DomainPart, PrincipalIdentity, SecurityId};
pub use rights::{AceEffect, NamespaceRights, ServiceRights};
