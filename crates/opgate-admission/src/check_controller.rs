//! AdmissionCheck reconciler
//!
//! Marks every AdmissionCheck owned by this controller with `Active=True`.
//! The condition is only ever written while it is absent or not True.

use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use opgate_common::crd::{upsert, AdmissionCheck, AdmissionCheckStatus};

use crate::context::Context;
use crate::error::AdmissionError;

/// Reconcile an AdmissionCheck.
///
/// Foreign checks and checks that are already active are left untouched.
/// A check deleted since the event was queued is not an error.
#[instrument(skip(check, ctx), fields(admission_check = %check.name_any()))]
pub async fn reconcile_admission_check(
    check: Arc<AdmissionCheck>,
    ctx: Arc<Context>,
) -> Result<Action, AdmissionError> {
    let name = check.name_any();

    let Some(current) = ctx.kube.get_admission_check(&name).await? else {
        debug!("AdmissionCheck no longer exists");
        return Ok(Action::await_change());
    };

    if !current.is_owned_by(&ctx.settings.controller_name) {
        debug!(controller = %current.spec.controller_name, "AdmissionCheck belongs to another controller");
        return Ok(Action::await_change());
    }

    if current.is_active() {
        debug!("AdmissionCheck already active");
        return Ok(Action::await_change());
    }

    let conditions = current
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();
    let mut updated = current.clone();
    updated.status = Some(AdmissionCheckStatus {
        conditions: upsert(conditions, current.active_condition()),
    });

    ctx.kube.update_admission_check_status(&updated).await?;

    info!("AdmissionCheck marked active");
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockKubeClient;
    use crate::context::GateSettings;
    use crate::operation::MockOperationStatusLookup;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
    use opgate_common::crd::{
        new_condition, AdmissionCheckSpec, ACTIVE_CONDITION, CONDITION_FALSE, CONDITION_TRUE,
    };
    use opgate_common::events::NoopEventPublisher;
    use std::sync::Mutex;

    const OURS: &str = "fluid.io/dataop-admission-controller";

    fn check(controller: &str, conditions: Option<Vec<Condition>>) -> AdmissionCheck {
        let mut ac = AdmissionCheck::new(
            "gate1",
            AdmissionCheckSpec {
                controller_name: controller.to_string(),
                ..Default::default()
            },
        );
        ac.metadata.resource_version = Some("7".to_string());
        ac.metadata.generation = Some(1);
        ac.status = conditions.map(|conditions| AdmissionCheckStatus { conditions });
        ac
    }

    fn context(mock: MockKubeClient) -> Arc<Context> {
        Arc::new(Context::new(
            Arc::new(mock),
            Arc::new(MockOperationStatusLookup::new()),
            Arc::new(NoopEventPublisher),
            GateSettings::default(),
        ))
    }

    /// Mock serving `stored` and capturing every status write
    fn capturing_mock(stored: AdmissionCheck) -> (MockKubeClient, Arc<Mutex<Vec<AdmissionCheck>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let capture = writes.clone();

        let mut mock = MockKubeClient::new();
        mock.expect_get_admission_check()
            .returning(move |_| Ok(Some(stored.clone())));
        mock.expect_update_admission_check_status()
            .returning(move |ac| {
                capture.lock().unwrap().push(ac.clone());
                Ok(())
            });
        (mock, writes)
    }

    #[tokio::test]
    async fn owned_check_without_status_is_activated() {
        let ac = check(OURS, None);
        let (mock, writes) = capturing_mock(ac.clone());

        let action = reconcile_admission_check(Arc::new(ac), context(mock))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());

        let writes = writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let written = writes[0].status.as_ref().unwrap();
        assert_eq!(written.conditions.len(), 1);
        let active = &written.conditions[0];
        assert_eq!(active.type_, ACTIVE_CONDITION);
        assert_eq!(active.status, CONDITION_TRUE);
        assert_eq!(active.reason, "Active");
        assert_eq!(active.message, "the admission check is active");
        assert_eq!(writes[0].metadata.resource_version.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn false_condition_is_flipped_in_place() {
        let ac = check(
            OURS,
            Some(vec![
                new_condition("SingleInstanceInClusterQueue", CONDITION_TRUE, "Ok", "", None),
                new_condition(ACTIVE_CONDITION, CONDITION_FALSE, "Inactive", "", None),
            ]),
        );
        let (mock, writes) = capturing_mock(ac.clone());

        reconcile_admission_check(Arc::new(ac), context(mock))
            .await
            .unwrap();

        let writes = writes.lock().unwrap();
        let conditions = &writes[0].status.as_ref().unwrap().conditions;
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, "SingleInstanceInClusterQueue");
        assert_eq!(conditions[1].type_, ACTIVE_CONDITION);
        assert_eq!(conditions[1].status, CONDITION_TRUE);
    }

    #[tokio::test]
    async fn active_check_is_not_written() {
        let mut ac = check(OURS, None);
        ac.status = Some(AdmissionCheckStatus {
            conditions: vec![ac.active_condition()],
        });
        let (mock, writes) = capturing_mock(ac.clone());

        let action = reconcile_admission_check(Arc::new(ac), context(mock))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_check_is_never_written() {
        for conditions in [
            None,
            Some(vec![new_condition(ACTIVE_CONDITION, CONDITION_FALSE, "Inactive", "", None)]),
        ] {
            let ac = check("kueue.x-k8s.io/provisioning-request", conditions);
            let (mock, writes) = capturing_mock(ac.clone());

            reconcile_admission_check(Arc::new(ac), context(mock))
                .await
                .unwrap();
            assert!(writes.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn deleted_check_is_nothing_to_do() {
        let mut mock = MockKubeClient::new();
        mock.expect_get_admission_check().returning(|_| Ok(None));

        let action = reconcile_admission_check(Arc::new(check(OURS, None)), context(mock))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
    }

    #[tokio::test]
    async fn write_conflict_is_surfaced_as_retryable() {
        let ac = check(OURS, None);
        let stored = ac.clone();

        let mut mock = MockKubeClient::new();
        mock.expect_get_admission_check()
            .returning(move |_| Ok(Some(stored.clone())));
        mock.expect_update_admission_check_status().returning(|_| {
            Err(AdmissionError::Kube(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "the object has been modified".to_string(),
                reason: "Conflict".to_string(),
                code: 409,
            })))
        });

        let err = reconcile_admission_check(Arc::new(ac), context(mock))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
