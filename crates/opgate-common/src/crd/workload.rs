//! Kueue Workload model
//!
//! A Workload is one queued unit of work. Kueue appends an
//! [`AdmissionCheckState`] for every AdmissionCheck of the workload's queue
//! before any check controller sees it; opgate only ever edits the state
//! and message of the entry that belongs to its own controller identity.

use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use super::data_operation::OperationReference;
use super::types::condition_is_true;
use super::upsert::Keyed;

/// Workload condition type set by Kueue once every check passed
pub const ADMITTED_CONDITION: &str = "Admitted";

// =============================================================================
// Check state
// =============================================================================

/// Per-gate admission progress recorded on the workload
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum CheckState {
    /// The check has not concluded yet
    #[default]
    Pending,
    /// The check passed
    Ready,
    /// The check asks Kueue to evict and retry (never written by opgate)
    Retry,
    /// The check failed permanently
    Rejected,
}

impl CheckState {
    /// Ready and Rejected are never left once reached
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Rejected)
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Ready => write!(f, "Ready"),
            Self::Retry => write!(f, "Retry"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// State of one admission check on a workload (a "gate state")
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionCheckState {
    /// Name of the referenced AdmissionCheck
    pub name: String,

    /// Current state of the check
    pub state: CheckState,

    /// Human-readable explanation of the state
    #[serde(default)]
    pub message: String,

    /// Last time `state` changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,

    /// Pod set mutations requested by the check controller; opgate never
    /// sets these but must round-trip them untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_set_updates: Option<Vec<serde_json::Value>>,
}

impl AdmissionCheckState {
    /// Copy of `current` moved to `state` with `message`, stamped now.
    ///
    /// The timestamp is reverted to the old one by [`crate::crd::upsert`]
    /// when the state does not actually change.
    pub fn transition(current: &Self, state: CheckState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            last_transition_time: Some(Time(Utc::now())),
            ..current.clone()
        }
    }
}

impl Keyed for AdmissionCheckState {
    fn key(&self) -> &str {
        &self.name
    }

    fn carry_over(&mut self, previous: &Self) {
        if previous.state == self.state {
            self.last_transition_time = previous.last_transition_time.clone();
        }
    }
}

// =============================================================================
// Workload
// =============================================================================

/// A homogeneous group of pods within a workload
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSet {
    /// Pod set name, unique within the workload
    #[serde(default)]
    pub name: String,

    /// Number of pods in the set
    #[serde(default)]
    pub count: i32,

    /// Pod template; its labels carry the data-operation reference
    #[serde(default)]
    pub template: PodTemplateSpec,
}

/// Kueue Workload spec (only the fields opgate reads)
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "kueue.x-k8s.io",
    version = "v1beta1",
    kind = "Workload",
    plural = "workloads",
    namespaced,
    status = "WorkloadStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    /// Pod sets making up the workload
    #[serde(default)]
    pub pod_sets: Vec<PodSet>,

    /// LocalQueue the workload was submitted to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
}

/// Kueue Workload status (only the fields opgate reads or writes)
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    /// Workload conditions (QuotaReserved, Admitted, Finished, ...)
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// One entry per admission check of the workload's queue
    #[serde(default)]
    pub admission_checks: Vec<AdmissionCheckState>,
}

impl Workload {
    /// Whether Kueue has admitted the workload.
    ///
    /// Admission is final from opgate's point of view: nothing on an
    /// admitted workload is ever re-evaluated.
    pub fn is_admitted(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| condition_is_true(&s.conditions, ADMITTED_CONDITION))
            .unwrap_or(false)
    }

    /// The pod template of a single-pod-set workload.
    ///
    /// Returns `None` for zero or several pod sets; those workloads are not
    /// supported by the data-operation gate.
    pub fn single_pod_template(&self) -> Option<&PodTemplateSpec> {
        match self.spec.pod_sets.as_slice() {
            [only] => Some(&only.template),
            _ => None,
        }
    }

    /// Data operation this workload waits on, if it is gated at all.
    ///
    /// `None` when the workload is not a single-pod-set workload or its
    /// template carries no operation-type label.
    pub fn operation_reference(&self) -> Option<OperationReference> {
        let template = self.single_pod_template()?;
        let empty = BTreeMap::new();
        let labels = template
            .metadata
            .as_ref()
            .and_then(|m| m.labels.as_ref())
            .unwrap_or(&empty);
        OperationReference::from_labels(labels)
    }

    /// Admission check states recorded on the workload
    pub fn admission_checks(&self) -> &[AdmissionCheckState] {
        self.status
            .as_ref()
            .map(|s| s.admission_checks.as_slice())
            .unwrap_or_default()
    }
}
