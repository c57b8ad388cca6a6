//! Admission check controllers for data-operation gating
//!
//! Two reconcilers share one [`Context`]:
//! - [`reconcile_admission_check`] marks AdmissionChecks owned by this
//!   controller as Active
//! - [`reconcile_workload`] holds a Workload's owned admission check in
//!   Pending until the data operation named by its pod-template labels
//!   completes, then commits Ready or Rejected
//!
//! All cluster access goes through the [`KubeClient`] and
//! [`OperationStatusLookup`] traits so both loops can be driven by mocks.

#![deny(missing_docs)]

mod check_controller;
mod client;
mod context;
mod error;
mod gate;
mod operation;
mod workload_controller;

pub use check_controller::reconcile_admission_check;
pub use client::{KubeClient, KubeClientImpl};
pub use context::{Context, GateSettings, MissingGatePolicy};
pub use error::AdmissionError;
pub use gate::{commit_gate_state, find_owned_gate, CommitOutcome, OwnedGate};
pub use operation::{KubeOperationLookup, LookupError, OperationStatusLookup};
pub use workload_controller::{
    decide, error_policy, reconcile_workload, Decision, OPERATION_COMPLETED_MESSAGE,
    OPERATION_FAILED_MESSAGE,
};
