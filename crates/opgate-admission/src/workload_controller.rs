//! Workload reconciler
//!
//! Holds a workload's owned admission check in Pending while the data
//! operation named by its pod-template labels runs:
//! - operation `Complete` → state `Ready`, Normal event
//! - operation `Failed` → state `Rejected`, Warning event
//! - anything else → no change, poll again after the poll interval
//!
//! Admitted workloads, workloads with more than one pod set and workloads
//! without the operation-type label are never touched.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use opgate_common::crd::{CheckState, OperationPhase, Workload};
use opgate_common::events::{actions, notes, reasons};
use opgate_common::metrics::{self, decision};

use crate::context::Context;
use crate::error::AdmissionError;
use crate::gate::{commit_gate_state, CommitOutcome};
use crate::operation::LookupError;

/// Admission check message once the awaited operation completed
pub const OPERATION_COMPLETED_MESSAGE: &str = "waited data operation is completed";

/// Admission check message once the awaited operation failed
pub const OPERATION_FAILED_MESSAGE: &str = "waited data operation is failed";

/// What an operation phase means for the gated workload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Operation completed: the workload may run
    Admit,
    /// Operation failed: the workload is rejected
    Reject,
    /// Operation still running: poll again later
    Wait,
}

/// Map an operation phase to an admission decision
pub fn decide(phase: &OperationPhase) -> Decision {
    match phase {
        OperationPhase::Complete => Decision::Admit,
        OperationPhase::Failed => Decision::Reject,
        _ => Decision::Wait,
    }
}

/// Error policy shared by both controllers.
///
/// Retryable errors are requeued after the configured error delay. Terminal
/// ones are logged and parked until the object changes.
pub fn error_policy<K>(obj: Arc<K>, error: &AdmissionError, ctx: Arc<Context>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let retryable = error.is_retryable();
    metrics::record_reconcile_error(&kind, retryable);

    if retryable {
        warn!(
            kind = %kind,
            name = %obj.name_any(),
            error = %error,
            "Reconcile failed, will retry"
        );
        Action::requeue(ctx.settings.error_requeue)
    } else {
        error!(
            kind = %kind,
            name = %obj.name_any(),
            error = %error,
            "Reconcile failed, waiting for the object to change"
        );
        Action::await_change()
    }
}

/// Reconcile a Workload gated on a data operation.
#[instrument(
    skip(workload, ctx),
    fields(workload = %workload.name_any(), namespace = ?workload.namespace())
)]
pub async fn reconcile_workload(
    workload: Arc<Workload>,
    ctx: Arc<Context>,
) -> Result<Action, AdmissionError> {
    let name = workload.name_any();
    let namespace = workload
        .namespace()
        .ok_or_else(|| AdmissionError::MissingNamespace(name.clone()))?;

    let Some(current) = ctx.kube.get_workload(&namespace, &name).await? else {
        debug!("Workload no longer exists");
        return Ok(Action::await_change());
    };

    if current.is_admitted() {
        debug!("Workload already admitted");
        return Ok(Action::await_change());
    }

    if current.single_pod_template().is_none() {
        debug!(
            pod_sets = current.spec.pod_sets.len(),
            "Workload does not have exactly one pod set, skipping"
        );
        return Ok(Action::await_change());
    }

    let Some(reference) = current.operation_reference() else {
        debug!("Workload does not wait on a data operation");
        return Ok(Action::await_change());
    };

    metrics::record_operation_poll(&reference.type_tag);
    let status = match ctx.operations.status(&reference).await {
        Ok(status) => status,
        Err(e @ LookupError::Invalid { .. }) => {
            warn!(operation = %reference, error = %e, "Data operation reference is not valid");
            ctx.events
                .publish(
                    &current.object_ref(&()),
                    EventType::Warning,
                    reasons::DATA_OPERATION_NOT_VALID,
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            metrics::record_decision(decision::INVALID);
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e.into()),
    };

    match decide(&status.phase) {
        Decision::Wait => {
            debug!(operation = %reference, phase = %status.phase, "Data operation still running");
            Ok(Action::requeue(ctx.settings.poll_interval))
        }
        Decision::Reject => {
            settle(
                &current,
                &ctx,
                Verdict {
                    state: CheckState::Rejected,
                    message: OPERATION_FAILED_MESSAGE,
                    event_type: EventType::Warning,
                    reason: reasons::DATA_OPERATION_FAILED,
                    note: notes::REJECT_WORKLOAD,
                    decision: decision::REJECTED,
                },
            )
            .await
        }
        Decision::Admit => {
            settle(
                &current,
                &ctx,
                Verdict {
                    state: CheckState::Ready,
                    message: OPERATION_COMPLETED_MESSAGE,
                    event_type: EventType::Normal,
                    reason: reasons::DATA_OPERATION_COMPLETED,
                    note: notes::RUN_WORKLOAD,
                    decision: decision::READY,
                },
            )
            .await
        }
    }
}

/// A terminal admission decision and how it is announced
struct Verdict {
    state: CheckState,
    message: &'static str,
    event_type: EventType,
    reason: &'static str,
    note: &'static str,
    decision: &'static str,
}

/// Commit a terminal decision, announcing it only when it was written
async fn settle(
    workload: &Workload,
    ctx: &Context,
    verdict: Verdict,
) -> Result<Action, AdmissionError> {
    let outcome = commit_gate_state(
        ctx.kube.as_ref(),
        workload,
        &ctx.settings.controller_name,
        ctx.settings.missing_gate_policy,
        verdict.state,
        verdict.message,
    )
    .await;

    match outcome {
        Ok(CommitOutcome::Updated) => {
            info!(state = %verdict.state, "Workload admission decided");
            ctx.events
                .publish(
                    &workload.object_ref(&()),
                    verdict.event_type,
                    verdict.reason,
                    actions::RECONCILE,
                    Some(verdict.note.to_string()),
                )
                .await;
            metrics::record_decision(verdict.decision);
            Ok(Action::await_change())
        }
        Ok(CommitOutcome::Unchanged) => Ok(Action::await_change()),
        Err(e) if e.is_gate_inconsistency() && !e.is_retryable() => {
            ctx.events
                .publish(
                    &workload.object_ref(&()),
                    EventType::Warning,
                    reasons::GATE_STATE_MISSING,
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            Err(e)
        }
        Err(e) => Err(e),
    }
}
