//! Kubernetes Event recording for opgate controllers.
//!
//! Wraps `kube::runtime::events::Recorder` behind a trait so reconcilers
//! receive the publisher as an injected dependency and tests can capture
//! what was emitted.
//!
//! Events are fire-and-forget: failures are logged as warnings and never
//! propagate. A lost event must never fail a reconcile.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event about `resource_ref`.
    ///
    /// * `type_` - Normal or Warning
    /// * `reason` - machine-readable reason (see [`reasons`])
    /// * `action` - what the controller was doing (see [`actions`])
    /// * `note` - optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                object = ?resource_ref.name,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// Publisher that drops every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Event reason strings, shown under REASON in `kubectl get events`.
pub mod reasons {
    /// The workload's data-operation reference cannot be resolved
    pub const DATA_OPERATION_NOT_VALID: &str = "DataOperationNotValid";
    /// The awaited data operation failed; the workload is rejected
    pub const DATA_OPERATION_FAILED: &str = "DataOperationFailed";
    /// The awaited data operation completed; the workload may run
    pub const DATA_OPERATION_COMPLETED: &str = "DataOperationCompleted";
    /// No admission check state on the workload belongs to this controller
    pub const GATE_STATE_MISSING: &str = "GateStateMissing";
}

/// Event action strings, shown under ACTION in `kubectl get events`.
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
}

/// Notes attached to the admission decision events
pub mod notes {
    /// Note on the rejection event
    pub const REJECT_WORKLOAD: &str = "reject workload";
    /// Note on the admission event
    pub const RUN_WORKLOAD: &str = "run workload";
}
