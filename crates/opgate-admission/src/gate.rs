//! Owned admission check state lookup and commit
//!
//! A workload lists one admission check state per AdmissionCheck of its
//! queue. The state belonging to this controller is found by resolving each
//! entry's AdmissionCheck and comparing `spec.controllerName`.

use kube::ResourceExt;
use tracing::{debug, info};

use opgate_common::crd::{upsert, AdmissionCheckState, CheckState, Workload};

use crate::client::KubeClient;
use crate::context::MissingGatePolicy;
use crate::error::AdmissionError;

/// Result of searching a workload's admission check states for the one
/// owned by a controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnedGate {
    /// Exactly one owned entry, by AdmissionCheck name
    Found(String),
    /// No entry resolves to an AdmissionCheck owned by the controller
    NotFound,
    /// Several entries do
    Ambiguous(Vec<String>),
}

/// Whether a commit wrote the workload status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The owned entry moved to the new state
    Updated,
    /// The owned entry was already terminal; nothing written
    Unchanged,
}

/// Find the admission check state owned by `controller_name`.
///
/// Entries whose AdmissionCheck no longer exists are skipped. Any other
/// error while resolving an entry aborts the scan and is returned as is.
pub async fn find_owned_gate(
    kube: &dyn KubeClient,
    states: &[AdmissionCheckState],
    controller_name: &str,
) -> Result<OwnedGate, AdmissionError> {
    let mut owned = Vec::new();

    for state in states {
        match kube.get_admission_check(&state.name).await? {
            Some(check) if check.is_owned_by(controller_name) => owned.push(state.name.clone()),
            Some(_) => {}
            None => debug!(admission_check = %state.name, "AdmissionCheck not found, skipping"),
        }
    }

    Ok(match owned.len() {
        0 => OwnedGate::NotFound,
        1 => OwnedGate::Found(owned.swap_remove(0)),
        _ => OwnedGate::Ambiguous(owned),
    })
}

/// Move the workload's owned admission check state to `state` and persist.
///
/// Terminal states are never left: if the owned entry is already Ready or
/// Rejected nothing is written.
pub async fn commit_gate_state(
    kube: &dyn KubeClient,
    workload: &Workload,
    controller_name: &str,
    policy: MissingGatePolicy,
    state: CheckState,
    message: &str,
) -> Result<CommitOutcome, AdmissionError> {
    let states = workload.admission_checks();
    let workload_key = format!(
        "{}/{}",
        workload.namespace().unwrap_or_default(),
        workload.name_any()
    );
    let missing = || AdmissionError::GateStateMissing {
        workload: workload_key.clone(),
        controller: controller_name.to_string(),
        retryable: policy.is_retryable(),
    };

    let gate = match find_owned_gate(kube, states, controller_name).await? {
        OwnedGate::Found(name) => name,
        OwnedGate::NotFound => return Err(missing()),
        OwnedGate::Ambiguous(gates) => {
            return Err(AdmissionError::GateStateAmbiguous {
                workload: workload_key.clone(),
                controller: controller_name.to_string(),
                gates,
                retryable: policy.is_retryable(),
            })
        }
    };

    let current = states
        .iter()
        .find(|s| s.name == gate)
        .ok_or_else(missing)?;

    if current.state.is_terminal() {
        debug!(
            workload = %workload_key,
            admission_check = %gate,
            state = %current.state,
            "Admission check state already terminal"
        );
        return Ok(CommitOutcome::Unchanged);
    }

    let admission_checks = upsert(
        states.to_vec(),
        AdmissionCheckState::transition(current, state, message),
    );
    let mut updated = workload.clone();
    updated.status.get_or_insert_with(Default::default).admission_checks = admission_checks;

    kube.update_workload_status(&updated).await?;

    info!(
        workload = %workload_key,
        admission_check = %gate,
        state = %state,
        "Committed admission check state"
    );
    Ok(CommitOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockKubeClient;
    use opgate_common::crd::{AdmissionCheck, AdmissionCheckSpec, WorkloadSpec, WorkloadStatus};
    use std::sync::{Arc, Mutex};

    const OURS: &str = "fluid.io/dataop-admission-controller";

    fn check(name: &str, controller: &str) -> AdmissionCheck {
        AdmissionCheck::new(
            name,
            AdmissionCheckSpec {
                controller_name: controller.to_string(),
                ..Default::default()
            },
        )
    }

    fn state(name: &str, state: CheckState) -> AdmissionCheckState {
        AdmissionCheckState {
            name: name.to_string(),
            state,
            message: String::new(),
            last_transition_time: None,
            pod_set_updates: None,
        }
    }

    fn workload(states: Vec<AdmissionCheckState>) -> Workload {
        let mut wl = Workload::new("w", WorkloadSpec::default());
        wl.metadata.namespace = Some("default".to_string());
        wl.status = Some(WorkloadStatus {
            conditions: vec![],
            admission_checks: states,
        });
        wl
    }

    /// Mock resolving gate names from a fixed table; unknown names are absent
    fn mock_with_checks(checks: Vec<AdmissionCheck>) -> MockKubeClient {
        let mut mock = MockKubeClient::new();
        mock.expect_get_admission_check().returning(move |name| {
            Ok(checks.iter().find(|c| c.name_any() == name).cloned())
        });
        mock
    }

    #[tokio::test]
    async fn finds_the_single_owned_entry() {
        let mock = mock_with_checks(vec![check("quota", "other"), check("gate1", OURS)]);
        let states = vec![state("quota", CheckState::Pending), state("gate1", CheckState::Pending)];

        let owned = find_owned_gate(&mock, &states, OURS).await.unwrap();
        assert_eq!(owned, OwnedGate::Found("gate1".to_string()));
    }

    #[tokio::test]
    async fn deleted_checks_are_skipped() {
        let mock = mock_with_checks(vec![check("gate1", OURS)]);
        let states = vec![state("gone", CheckState::Pending), state("gate1", CheckState::Pending)];

        let owned = find_owned_gate(&mock, &states, OURS).await.unwrap();
        assert_eq!(owned, OwnedGate::Found("gate1".to_string()));
    }

    #[tokio::test]
    async fn no_owned_entry_is_not_found() {
        let mock = mock_with_checks(vec![check("quota", "other")]);
        let states = vec![state("quota", CheckState::Pending)];

        assert_eq!(
            find_owned_gate(&mock, &states, OURS).await.unwrap(),
            OwnedGate::NotFound
        );
        assert_eq!(
            find_owned_gate(&mock, &[], OURS).await.unwrap(),
            OwnedGate::NotFound
        );
    }

    #[tokio::test]
    async fn several_owned_entries_are_ambiguous() {
        let mock = mock_with_checks(vec![check("gate1", OURS), check("gate2", OURS)]);
        let states = vec![state("gate1", CheckState::Pending), state("gate2", CheckState::Pending)];

        assert_eq!(
            find_owned_gate(&mock, &states, OURS).await.unwrap(),
            OwnedGate::Ambiguous(vec!["gate1".to_string(), "gate2".to_string()])
        );
    }

    #[tokio::test]
    async fn fetch_errors_during_scan_are_not_a_missing_gate() {
        let mut mock = MockKubeClient::new();
        mock.expect_get_admission_check().returning(|_| {
            Err(AdmissionError::Kube(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "etcd unavailable".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })))
        });
        let states = vec![state("gate1", CheckState::Pending)];

        let err = find_owned_gate(&mock, &states, OURS).await.unwrap_err();
        assert!(matches!(err, AdmissionError::Kube(_)));
        assert!(!err.is_gate_inconsistency());
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn commit_updates_only_the_owned_entry() {
        let written = Arc::new(Mutex::new(Vec::<Workload>::new()));
        let capture = written.clone();

        let mut mock = mock_with_checks(vec![check("quota", "other"), check("gate1", OURS)]);
        mock.expect_update_workload_status().returning(move |wl| {
            capture.lock().unwrap().push(wl.clone());
            Ok(())
        });

        let wl = workload(vec![
            state("quota", CheckState::Pending),
            state("gate1", CheckState::Pending),
        ]);
        let outcome = commit_gate_state(
            &mock,
            &wl,
            OURS,
            MissingGatePolicy::Requeue,
            CheckState::Ready,
            "done",
        )
        .await
        .unwrap();
        assert_eq!(outcome, CommitOutcome::Updated);

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        let checks = written[0].admission_checks();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0], state("quota", CheckState::Pending));
        assert_eq!(checks[1].name, "gate1");
        assert_eq!(checks[1].state, CheckState::Ready);
        assert_eq!(checks[1].message, "done");
        assert!(checks[1].last_transition_time.is_some());
    }

    #[tokio::test]
    async fn commit_never_leaves_a_terminal_state() {
        // No update expectation: a write would panic the mock
        let mock = mock_with_checks(vec![check("gate1", OURS)]);

        for terminal in [CheckState::Ready, CheckState::Rejected] {
            let wl = workload(vec![state("gate1", terminal)]);
            let outcome = commit_gate_state(
                &mock,
                &wl,
                OURS,
                MissingGatePolicy::Requeue,
                CheckState::Rejected,
                "late",
            )
            .await
            .unwrap();
            assert_eq!(outcome, CommitOutcome::Unchanged);
        }
    }

    #[tokio::test]
    async fn commit_without_owned_entry_follows_policy() {
        let mock = mock_with_checks(vec![check("quota", "other")]);
        let wl = workload(vec![state("quota", CheckState::Pending)]);

        let err = commit_gate_state(
            &mock,
            &wl,
            OURS,
            MissingGatePolicy::Requeue,
            CheckState::Ready,
            "done",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdmissionError::GateStateMissing { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("default/w"));

        let err = commit_gate_state(
            &mock,
            &wl,
            OURS,
            MissingGatePolicy::Ignore,
            CheckState::Ready,
            "done",
        )
        .await
        .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn commit_with_ambiguous_entries_writes_nothing() {
        let mock = mock_with_checks(vec![check("gate1", OURS), check("gate2", OURS)]);
        let wl = workload(vec![
            state("gate1", CheckState::Pending),
            state("gate2", CheckState::Pending),
        ]);

        let err = commit_gate_state(
            &mock,
            &wl,
            OURS,
            MissingGatePolicy::Ignore,
            CheckState::Ready,
            "done",
        )
        .await
        .unwrap_err();
        match err {
            AdmissionError::GateStateAmbiguous { gates, retryable, .. } => {
                assert_eq!(gates, vec!["gate1", "gate2"]);
                assert!(!retryable);
            }
            other => panic!("expected GateStateAmbiguous, got {:?}", other),
        }
    }
}
