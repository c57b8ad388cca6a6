//! Admission controller error types

use thiserror::Error;

use crate::operation::LookupError;

/// Errors returned by the admission reconcilers
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Kubernetes API error (read, status write, conflict)
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The data operation's status could not be read
    #[error("{0}")]
    OperationLookup(#[from] LookupError),

    /// No admission check state on the workload belongs to this controller
    #[error("workload {workload} has no admission check state owned by {controller}")]
    GateStateMissing {
        /// Workload as `namespace/name`
        workload: String,
        /// Controller identity that was searched for
        controller: String,
        /// Whether the configured policy retries this inconsistency
        retryable: bool,
    },

    /// Several admission check states on the workload belong to this controller
    #[error(
        "workload {workload} has several admission check states owned by {controller}: {}",
        .gates.join(", ")
    )]
    GateStateAmbiguous {
        /// Workload as `namespace/name`
        workload: String,
        /// Controller identity that was searched for
        controller: String,
        /// Names of the matching admission checks
        gates: Vec<String>,
        /// Whether the configured policy retries this inconsistency
        retryable: bool,
    },

    /// The reconciled workload carries no namespace
    #[error("workload {0} has no namespace")]
    MissingNamespace(String),
}

impl AdmissionError {
    /// Whether the controller should requeue after this error.
    ///
    /// Malformed requests (400, 422) cannot succeed without the object
    /// changing; every other API error, including 409 Conflict, is retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Kube(kube::Error::Api(ae)) => !matches!(ae.code, 400 | 422),
            Self::Kube(_) => true,
            Self::OperationLookup(e) => e.is_transient(),
            Self::GateStateMissing { retryable, .. }
            | Self::GateStateAmbiguous { retryable, .. } => *retryable,
            Self::MissingNamespace(_) => false,
        }
    }

    /// Whether this error reports a workload whose admission check states do
    /// not match the AdmissionChecks this controller owns
    pub fn is_gate_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::GateStateMissing { .. } | Self::GateStateAmbiguous { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> AdmissionError {
        AdmissionError::Kube(kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    #[test]
    fn conflicts_and_server_errors_are_retried() {
        assert!(api_error(409).is_retryable());
        assert!(api_error(500).is_retryable());
        assert!(api_error(503).is_retryable());
    }

    #[test]
    fn malformed_requests_are_not_retried() {
        assert!(!api_error(400).is_retryable());
        assert!(!api_error(422).is_retryable());
    }

    #[test]
    fn lookup_errors_follow_their_class() {
        let transient = AdmissionError::from(LookupError::Transient {
            reference: "DataLoad/ns1/op1".to_string(),
            message: "timeout".to_string(),
        });
        assert!(transient.is_retryable());

        let invalid = AdmissionError::from(LookupError::Invalid {
            reference: "Dataset/op1".to_string(),
            message: "unsupported".to_string(),
        });
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn gate_inconsistencies_follow_policy() {
        let missing = AdmissionError::GateStateMissing {
            workload: "default/w".to_string(),
            controller: "c".to_string(),
            retryable: true,
        };
        assert!(missing.is_retryable());
        assert!(missing.is_gate_inconsistency());

        let ambiguous = AdmissionError::GateStateAmbiguous {
            workload: "default/w".to_string(),
            controller: "c".to_string(),
            gates: vec!["gate1".to_string(), "gate2".to_string()],
            retryable: false,
        };
        assert!(!ambiguous.is_retryable());
        assert!(ambiguous.is_gate_inconsistency());
        assert!(ambiguous.to_string().ends_with("gate1, gate2"));
    }

    #[test]
    fn missing_namespace_is_terminal() {
        let err = AdmissionError::MissingNamespace("w".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_gate_inconsistency());
        assert_eq!(err.to_string(), "workload w has no namespace");
    }
}
