//! Shared reconciler context and settings

use std::sync::Arc;
use std::time::Duration;

use kube::Client;

use opgate_common::events::{EventPublisher, KubeEventPublisher};
use opgate_common::DEFAULT_CONTROLLER_NAME;

use crate::client::{KubeClient, KubeClientImpl};
use crate::operation::{KubeOperationLookup, OperationStatusLookup};

/// Delay between polls of a data operation that is still running
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Delay before a failed reconcile is retried
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// What to do when a workload has no (or several) admission check states
/// owned by this controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingGatePolicy {
    /// Keep retrying with the error delay until the workload is fixed
    #[default]
    Requeue,
    /// Report once with a Warning event and wait for the workload to change
    Ignore,
}

impl MissingGatePolicy {
    /// Whether an inconsistency under this policy is retried
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Requeue)
    }
}

impl std::fmt::Display for MissingGatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requeue => write!(f, "requeue"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

impl std::str::FromStr for MissingGatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "requeue" => Ok(Self::Requeue),
            "ignore" => Ok(Self::Ignore),
            _ => Err(format!(
                "invalid missing gate policy '{}' (expected requeue or ignore)",
                s
            )),
        }
    }
}

/// Tunables shared by both reconcilers
#[derive(Clone, Debug)]
pub struct GateSettings {
    /// Identity matched against `spec.controllerName` of AdmissionChecks
    pub controller_name: String,
    /// Requeue delay while the awaited operation is still running
    pub poll_interval: Duration,
    /// Requeue delay after a retryable error
    pub error_requeue: Duration,
    /// Handling of workloads without exactly one owned admission check state
    pub missing_gate_policy: MissingGatePolicy,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_requeue: DEFAULT_ERROR_REQUEUE,
            missing_gate_policy: MissingGatePolicy::default(),
        }
    }
}

/// Dependencies injected into both reconcilers
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Data-operation status source
    pub operations: Arc<dyn OperationStatusLookup>,
    /// Kubernetes Event publisher
    pub events: Arc<dyn EventPublisher>,
    /// Controller settings
    pub settings: GateSettings,
}

impl Context {
    /// Create a context from explicit dependencies
    pub fn new(
        kube: Arc<dyn KubeClient>,
        operations: Arc<dyn OperationStatusLookup>,
        events: Arc<dyn EventPublisher>,
        settings: GateSettings,
    ) -> Self {
        Self {
            kube,
            operations,
            events,
            settings,
        }
    }

    /// Create a context backed by a real Kubernetes client
    pub fn from_client(client: Client, settings: GateSettings) -> Self {
        let events = KubeEventPublisher::new(client.clone(), &settings.controller_name);
        Self::new(
            Arc::new(KubeClientImpl::new(client.clone())),
            Arc::new(KubeOperationLookup::new(client)),
            Arc::new(events),
            settings,
        )
    }
}
