//! Kueue AdmissionCheck model
//!
//! An AdmissionCheck is a named gate that a queue's workloads must pass.
//! `spec.controllerName` decides which controller evaluates it.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

use super::types::{condition_is_true, new_condition, CONDITION_TRUE};

/// Condition type marking a check as served by its controller
pub const ACTIVE_CONDITION: &str = "Active";

/// Reason written on the Active condition
pub const ACTIVE_CONDITION_REASON: &str = "Active";

/// Message written on the Active condition
pub const ACTIVE_CONDITION_MESSAGE: &str = "the admission check is active";

/// Kueue AdmissionCheck spec
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "kueue.x-k8s.io",
    version = "v1beta1",
    kind = "AdmissionCheck",
    plural = "admissionchecks",
    status = "AdmissionCheckStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionCheckSpec {
    /// Identity of the controller that evaluates this check
    pub controller_name: String,

    /// Controller-specific parameters (unused by opgate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,

    /// Delay before a check in Retry state is reset by Kueue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_minutes: Option<i64>,
}

/// Kueue AdmissionCheck status
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionCheckStatus {
    /// Check conditions; opgate maintains `Active`
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl AdmissionCheck {
    /// Whether the check is evaluated by `controller_name`
    pub fn is_owned_by(&self, controller_name: &str) -> bool {
        self.spec.controller_name == controller_name
    }

    /// Whether the Active condition is present and True
    pub fn is_active(&self) -> bool {
        self.status
            .as_ref()
            .map(|s| condition_is_true(&s.conditions, ACTIVE_CONDITION))
            .unwrap_or(false)
    }

    /// The Active=True condition for this check's current generation
    pub fn active_condition(&self) -> Condition {
        new_condition(
            ACTIVE_CONDITION,
            CONDITION_TRUE,
            ACTIVE_CONDITION_REASON,
            ACTIVE_CONDITION_MESSAGE,
            self.metadata.generation,
        )
    }
}
