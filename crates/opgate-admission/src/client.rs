//! Object store access for the admission reconcilers

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

use opgate_common::crd::{AdmissionCheck, Workload};
use opgate_common::FIELD_MANAGER;

use crate::error::AdmissionError;

/// Trait abstracting the Kubernetes reads and writes of both reconcilers
///
/// Lets tests drive the reconcilers with mocks instead of an API server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Get a Workload; `None` if it does not exist
    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Workload>, AdmissionError>;

    /// Get a cluster-scoped AdmissionCheck; `None` if it does not exist
    async fn get_admission_check(&self, name: &str)
        -> Result<Option<AdmissionCheck>, AdmissionError>;

    /// Persist `status.admissionChecks` of a Workload.
    ///
    /// Fails with 409 Conflict if the Workload changed since it was read.
    async fn update_workload_status(&self, workload: &Workload) -> Result<(), AdmissionError>;

    /// Persist `status.conditions` of an AdmissionCheck.
    ///
    /// Fails with 409 Conflict if the AdmissionCheck changed since it was read.
    async fn update_admission_check_status(
        &self,
        check: &AdmissionCheck,
    ) -> Result<(), AdmissionError>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Workload>, AdmissionError> {
        let api: Api<Workload> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_admission_check(
        &self,
        name: &str,
    ) -> Result<Option<AdmissionCheck>, AdmissionError> {
        let api: Api<AdmissionCheck> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn update_workload_status(&self, workload: &Workload) -> Result<(), AdmissionError> {
        let name = workload.name_any();
        let namespace = workload
            .namespace()
            .ok_or_else(|| AdmissionError::MissingNamespace(name.clone()))?;
        let api: Api<Workload> = Api::namespaced(self.client.clone(), &namespace);

        let admission_checks = workload
            .status
            .as_ref()
            .map(|s| s.admission_checks.as_slice())
            .unwrap_or_default();
        let patch = status_patch(
            workload.resource_version().as_deref(),
            json!({ "admissionChecks": admission_checks }),
        );

        api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn update_admission_check_status(
        &self,
        check: &AdmissionCheck,
    ) -> Result<(), AdmissionError> {
        let api: Api<AdmissionCheck> = Api::all(self.client.clone());

        let conditions = check
            .status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default();
        let patch = status_patch(
            check.resource_version().as_deref(),
            json!({ "conditions": conditions }),
        );

        api.patch_status(
            &check.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }
}

/// Build a status merge patch.
///
/// Carrying `metadata.resourceVersion` makes the API server reject the
/// write with 409 Conflict when the object moved on since it was read.
fn status_patch(resource_version: Option<&str>, status: Value) -> Value {
    let mut patch = json!({ "status": status });
    if let Some(rv) = resource_version {
        patch["metadata"] = json!({ "resourceVersion": rv });
    }
    patch
}
